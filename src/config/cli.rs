use crate::core::nuke::{NukeCoreOptions, NukeEnvironmentOptions};
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_account_id, validate_aws_region, validate_non_empty_string,
    validate_optional_account_id, validate_path, validate_stack_name, Validate,
};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "compliant-framework")]
#[command(about = "Deployment and teardown tooling for the compliant multi-account framework")]
pub struct Cli {
    /// Framework settings TOML; built-in defaults apply when omitted.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write the framework configuration document for an installer stack.
    CreateConfig(CreateConfigArgs),
    /// Create a CodeCommit repository seeded from a local directory.
    CreateRepository(CreateRepositoryArgs),
    /// Block until every stage of a pipeline has succeeded.
    WaitForPipeline(WaitForPipelineArgs),
    /// Tear down the core deployment.
    NukeCore(NukeCoreArgs),
    /// Tear down an environment deployment.
    NukeEnvironment(NukeEnvironmentArgs),
}

#[derive(Debug, Clone, Args)]
pub struct CreateConfigArgs {
    #[arg(long)]
    pub stack_name: String,

    #[arg(long)]
    pub out_file: PathBuf,

    #[arg(long)]
    pub aws_access_key_id: String,

    #[arg(long)]
    pub aws_secret_access_key: String,

    /// GovCloud region of the organization's management account.
    #[arg(long, default_value = "us-gov-west-1")]
    pub region: String,
}

#[derive(Debug, Clone, Args)]
pub struct CreateRepositoryArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub branch: String,

    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,
}

#[derive(Debug, Clone, Args)]
pub struct WaitForPipelineArgs {
    #[arg(long)]
    pub name: String,
}

#[derive(Debug, Clone, Args)]
pub struct NukeCoreArgs {
    #[arg(long)]
    pub logging_id: String,
}

impl From<NukeCoreArgs> for NukeCoreOptions {
    fn from(args: NukeCoreArgs) -> Self {
        Self {
            logging_id: args.logging_id,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct NukeEnvironmentArgs {
    #[arg(long)]
    pub logging_id: String,

    #[arg(long)]
    pub transit_west_id: Option<String>,

    #[arg(long)]
    pub transit_east_id: Option<String>,

    #[arg(long)]
    pub management_west_id: Option<String>,

    #[arg(long)]
    pub management_east_id: Option<String>,

    #[arg(long)]
    pub stage: Option<String>,
}

impl From<NukeEnvironmentArgs> for NukeEnvironmentOptions {
    fn from(args: NukeEnvironmentArgs) -> Self {
        Self {
            logging_id: args.logging_id,
            transit_west_id: args.transit_west_id,
            transit_east_id: args.transit_east_id,
            management_west_id: args.management_west_id,
            management_east_id: args.management_east_id,
            stage: args.stage,
        }
    }
}

impl Validate for Cli {
    fn validate(&self) -> Result<()> {
        if let Some(config) = &self.config {
            validate_path("config", &config.to_string_lossy())?;
        }

        match &self.command {
            Command::CreateConfig(args) => {
                validate_stack_name("stack_name", &args.stack_name)?;
                validate_path("out_file", &args.out_file.to_string_lossy())?;
                validate_non_empty_string("aws_access_key_id", &args.aws_access_key_id)?;
                validate_non_empty_string("aws_secret_access_key", &args.aws_secret_access_key)?;
                validate_aws_region("region", &args.region)?;
            }
            Command::CreateRepository(args) => {
                validate_non_empty_string("name", &args.name)?;
                validate_non_empty_string("branch", &args.branch)?;
                validate_path("source_dir", &args.source_dir.to_string_lossy())?;
            }
            Command::WaitForPipeline(args) => {
                validate_non_empty_string("name", &args.name)?;
            }
            Command::NukeCore(args) => {
                validate_account_id("logging_id", &args.logging_id)?;
            }
            Command::NukeEnvironment(args) => {
                validate_account_id("logging_id", &args.logging_id)?;
                validate_optional_account_id("transit_west_id", args.transit_west_id.as_deref())?;
                validate_optional_account_id("transit_east_id", args.transit_east_id.as_deref())?;
                validate_optional_account_id(
                    "management_west_id",
                    args.management_west_id.as_deref(),
                )?;
                validate_optional_account_id(
                    "management_east_id",
                    args.management_east_id.as_deref(),
                )?;
            }
        }

        tracing::debug!("CLI arguments validation passed");
        Ok(())
    }
}
