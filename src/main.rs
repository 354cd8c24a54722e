use clap::Parser;
use compliant_framework::config::cli::{Cli, Command};
use compliant_framework::core::framework_config::{create_config, GovCloudCredentials};
use compliant_framework::core::nuke::{nuke_core, nuke_environment, NukeReport};
use compliant_framework::core::repository::{create_repository, wait_for_pipeline};
use compliant_framework::domain::model::CleanupResult;
use compliant_framework::domain::ports::{Scope, ServiceProvider};
use compliant_framework::utils::error::{ErrorSeverity, FrameworkError, Result};
use compliant_framework::utils::{logger, validation::Validate};
use compliant_framework::{AwsServiceProvider, FrameworkSettings};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting compliant-framework CLI");
    if cli.verbose {
        tracing::debug!("CLI arguments: {:?}", cli.command);
    }

    if let Err(e) = run(cli).await {
        tracing::error!(
            "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1, // 處理錯誤
            ErrorSeverity::Medium => 2,                    // 重試錯誤
            ErrorSeverity::Critical => 3,                  // 系統錯誤
        };
        std::process::exit(exit_code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // 驗證參數與設定
    cli.validate()?;
    let settings = FrameworkSettings::load(cli.config.as_deref())?;
    settings.validate()?;

    let services = AwsServiceProvider::load(settings.roles.clone()).await;

    match cli.command {
        Command::CreateConfig(args) => {
            let credentials = GovCloudCredentials {
                access_key_id: args.aws_access_key_id,
                secret_access_key: args.aws_secret_access_key,
                region: args.region,
            };
            let document = create_config(&services, &settings, &args.stack_name, &credentials).await?;

            std::fs::write(&args.out_file, serde_json::to_string_pretty(&document)?)?;
            tracing::info!(out_file = %args.out_file.display(), "Framework configuration written");
            println!("✅ Configuration written to {}", args.out_file.display());
        }
        Command::CreateRepository(args) => {
            let codecommit = services.codecommit(&Scope::current()).await?;
            let created =
                create_repository(codecommit.as_ref(), &args.name, &args.branch, &args.source_dir)
                    .await?;
            if created {
                println!("✅ Repository {} created on branch {}", args.name, args.branch);
            } else {
                println!("Repository {} already exists", args.name);
            }
        }
        Command::WaitForPipeline(args) => {
            let codepipeline = services.codepipeline(&Scope::current()).await?;
            wait_for_pipeline(codepipeline.as_ref(), &args.name, settings.waits.pipeline).await?;
            println!("✅ Pipeline {} finished", args.name);
        }
        Command::NukeCore(args) => {
            let report = nuke_core(&services, &settings, &args.into()).await?;
            summarize(&report)?;
        }
        Command::NukeEnvironment(args) => {
            let report = nuke_environment(&services, &settings, &args.into()).await?;
            summarize(&report)?;
        }
    }

    Ok(())
}

/// Print the teardown tally; any failed step makes the run fail.
fn summarize(report: &NukeReport) -> Result<()> {
    println!(
        "Deleted: {}, already gone: {}, skipped: {}, failed: {}",
        report.count(CleanupResult::Deleted),
        report.count(CleanupResult::AlreadyDeleted),
        report.count(CleanupResult::Skipped),
        report.count(CleanupResult::Failed),
    );

    let failed: Vec<&str> = report.failed().map(|step| step.target.as_str()).collect();
    if failed.is_empty() {
        println!("✅ Teardown complete");
        return Ok(());
    }

    for target in &failed {
        eprintln!("❌ {}", target);
    }
    Err(FrameworkError::operation_failed(format!(
        "{} teardown step(s) failed",
        failed.len()
    )))
}
