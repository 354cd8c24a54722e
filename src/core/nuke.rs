//! Ordered teardown of the core and environment deployments.

use crate::config::settings::FrameworkSettings;
use crate::core::stack_set::delete_stack_set;
use crate::core::teardown::{
    delete_bucket, delete_log_groups, delete_objects, delete_security_hub_members, delete_stack,
    delete_ssm_parameters,
};
use crate::domain::model::CleanupResult;
use crate::domain::ports::{Scope, ServiceProvider};
use crate::utils::error::{FrameworkError, Result};

/// Outcome of one teardown step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupStep {
    pub target: String,
    pub result: CleanupResult,
}

#[derive(Debug, Default)]
pub struct NukeReport {
    pub steps: Vec<CleanupStep>,
}

impl NukeReport {
    fn record(&mut self, target: impl Into<String>, result: CleanupResult) {
        let target = target.into();
        tracing::debug!(target = %target, result = ?result, "Teardown step finished");
        self.steps.push(CleanupStep { target, result });
    }

    pub fn count(&self, result: CleanupResult) -> usize {
        self.steps.iter().filter(|step| step.result == result).count()
    }

    pub fn failed(&self) -> impl Iterator<Item = &CleanupStep> {
        self.steps
            .iter()
            .filter(|step| step.result == CleanupResult::Failed)
    }
}

/// `us-gov-west-1` -> `usgw1`, `us-east-1` -> `use1`.
pub fn region_short_name(region: &str) -> String {
    let parts: Vec<&str> = region.split('-').collect();
    match parts.as_slice() {
        [first, middle @ .., number] => {
            let mut short = first.to_string();
            short.extend(middle.iter().filter_map(|part| part.chars().next()));
            short.push_str(number);
            short
        }
        _ => region.to_string(),
    }
}

struct Teardown<'a> {
    services: &'a dyn ServiceProvider,
    settings: &'a FrameworkSettings,
    report: NukeReport,
}

impl<'a> Teardown<'a> {
    fn new(services: &'a dyn ServiceProvider, settings: &'a FrameworkSettings) -> Self {
        Self {
            services,
            settings,
            report: NukeReport::default(),
        }
    }

    fn central(&self, region: &str) -> Scope {
        Scope::region(region)
    }

    fn member(&self, account_id: &str, region: &str) -> Scope {
        Scope::account(account_id, region).with_role(&self.settings.roles.account_access)
    }

    async fn stack(&mut self, scope: &Scope, stack_name: &str) -> Result<()> {
        let cfn = self.services.cloudformation(scope).await?;
        let result = delete_stack(cfn.as_ref(), stack_name, self.settings.waits.stack_delete).await?;
        self.report.record(format!("stack {}", stack_name), result);
        Ok(())
    }

    async fn stack_set(&mut self, stack_set_name: &str, region: &str) -> Result<()> {
        // StackSets live in the primary region of the central account.
        let scope = self.central(&self.settings.regions.primary);
        let cfn = self.services.cloudformation(&scope).await?;
        let orgs = self.services.organizations(&Scope::current()).await?;
        let ou_name = format!("environment-{}", region_short_name(region));

        let result = match delete_stack_set(
            cfn.as_ref(),
            orgs.as_ref(),
            stack_set_name,
            &ou_name,
            region,
            self.settings.waits.stack_set_operation,
        )
        .await
        {
            Ok(result) => result,
            Err(e @ FrameworkError::Timeout { .. }) => return Err(e),
            Err(e) => {
                tracing::error!(stack_set_name = %stack_set_name, error = %e, "StackSet deletion failed");
                CleanupResult::Failed
            }
        };
        self.report.record(format!("stack set {}", stack_set_name), result);
        Ok(())
    }

    async fn security_hub_members(&mut self, scope: &Scope) -> Result<()> {
        let securityhub = self.services.securityhub(scope).await?;
        let result = delete_security_hub_members(securityhub.as_ref()).await;
        self.report.record("security hub members", result);
        Ok(())
    }

    async fn objects(&mut self, scope: &Scope, buckets: &[String]) -> Result<()> {
        let s3 = self.services.s3(scope).await?;
        for bucket in buckets {
            let result = delete_objects(s3.as_ref(), bucket).await;
            self.report.record(format!("objects in {}", bucket), result);
        }
        Ok(())
    }

    async fn bucket(&mut self, scope: &Scope, bucket: &str) -> Result<()> {
        let s3 = self.services.s3(scope).await?;
        let result = delete_bucket(s3.as_ref(), bucket).await;
        self.report.record(format!("bucket {}", bucket), result);
        Ok(())
    }

    async fn ssm_parameters(&mut self, scope: &Scope) -> Result<()> {
        let ssm = self.services.ssm(scope).await?;
        let deleted = delete_ssm_parameters(ssm.as_ref()).await?;
        let result = if deleted == 0 {
            CleanupResult::Skipped
        } else {
            CleanupResult::Deleted
        };
        self.report.record(format!("{} ssm parameters", deleted), result);
        Ok(())
    }

    async fn log_groups(&mut self, scope: &Scope) -> Result<()> {
        let logs = self.services.logs(scope).await?;
        let result = delete_log_groups(logs.as_ref()).await;
        self.report.record("log groups", result);
        Ok(())
    }

    async fn pipeline_bucket(&mut self, prefix: &str) -> Result<()> {
        let account_id = self.services.caller_account_id().await?;
        let region = self.settings.regions.primary.clone();
        let bucket = format!("{}-{}-{}", prefix, account_id, region);
        let scope = self.central(&region);
        self.bucket(&scope, &bucket).await
    }
}

fn account_buckets(prefixes: &[&str], account_id: &str, region: &str) -> Vec<String> {
    prefixes
        .iter()
        .map(|prefix| format!("{}-{}-{}", prefix, account_id, region))
        .collect()
}

#[derive(Debug, Clone)]
pub struct NukeCoreOptions {
    pub logging_id: String,
}

/// Tear down the core deployment: central and logging stacks, logging
/// buckets, parameters, the core pipeline and log groups.
pub async fn nuke_core(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
    options: &NukeCoreOptions,
) -> Result<NukeReport> {
    let primary = settings.regions.primary.as_str();
    let secondary = settings.regions.secondary.as_str();
    let mut run = Teardown::new(services, settings);

    let central_primary = run.central(primary);
    let central_secondary = run.central(secondary);
    let logging_primary = run.member(&options.logging_id, primary);
    let logging_secondary = run.member(&options.logging_id, secondary);

    tracing::info!(logging_id = %options.logging_id, "Nuking core deployment");

    run.security_hub_members(&central_secondary).await?;
    run.stack(&central_secondary, "central-init").await?;
    run.stack(&logging_secondary, "logging-init").await?;

    run.security_hub_members(&central_primary).await?;
    run.stack(&central_primary, "central-init").await?;

    let buckets = account_buckets(
        &["config", "flow-logs", "cloudtrail", "consolidated-logs"],
        &options.logging_id,
        primary,
    );
    run.objects(&logging_primary, &buckets).await?;
    run.stack(&logging_primary, "logging-init").await?;

    run.ssm_parameters(&logging_secondary).await?;
    run.ssm_parameters(&logging_primary).await?;
    run.ssm_parameters(&central_secondary).await?;
    run.ssm_parameters(&central_primary).await?;

    run.stack(&central_primary, "core-pipeline-stack").await?;
    run.pipeline_bucket("core-pipeline").await?;

    run.log_groups(&logging_primary).await?;
    run.log_groups(&logging_secondary).await?;
    run.log_groups(&central_secondary).await?;
    run.log_groups(&central_primary).await?;

    Ok(run.report)
}

#[derive(Debug, Clone, Default)]
pub struct NukeEnvironmentOptions {
    pub logging_id: String,
    pub transit_west_id: Option<String>,
    pub transit_east_id: Option<String>,
    pub management_west_id: Option<String>,
    pub management_east_id: Option<String>,
    pub stage: Option<String>,
}

pub const ENVIRONMENT_STACK_SETS: [&str; 3] = [
    "federation-stackset",
    "backup-services-stackset",
    "security-baseline-stackset",
];

/// Tear down an environment deployment. Transit and management accounts are
/// only touched when their ids are given.
pub async fn nuke_environment(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
    options: &NukeEnvironmentOptions,
) -> Result<NukeReport> {
    let primary = settings.regions.primary.as_str();
    let secondary = settings.regions.secondary.as_str();
    let mut run = Teardown::new(services, settings);

    let central_primary = run.central(primary);
    let logging_primary = run.member(&options.logging_id, primary);

    // 依區域展開可選帳號
    let transit: Vec<Scope> = [
        (options.transit_west_id.as_deref(), primary),
        (options.transit_east_id.as_deref(), secondary),
    ]
    .into_iter()
    .filter_map(|(id, region)| id.map(|id| run.member(id, region)))
    .collect();
    let management: Vec<(String, String, Scope)> = [
        (options.management_west_id.as_deref(), primary),
        (options.management_east_id.as_deref(), secondary),
    ]
    .into_iter()
    .filter_map(|(id, region)| {
        id.map(|id| (id.to_string(), region.to_string(), run.member(id, region)))
    })
    .collect();

    tracing::info!(logging_id = %options.logging_id, stage = ?options.stage, transit = transit.len(), management = management.len(), "Nuking environment deployment");

    run.stack(&central_primary, "federation-stack").await?;
    run.stack(&logging_primary, "federation-stack").await?;

    for stack_set in ENVIRONMENT_STACK_SETS {
        for region in [primary, secondary] {
            run.stack_set(&format!("{}-{}", stack_set, region), region)
                .await?;
        }
    }

    for scope in &transit {
        run.stack(scope, "transit-gateway-routes").await?;
    }
    for (_, _, scope) in &management {
        run.stack(scope, "management-services-init").await?;
    }
    for scope in &transit {
        run.stack(scope, "transit-init").await?;
    }

    for (account_id, region, scope) in &management {
        let buckets = account_buckets(
            &["environment-assets", "config", "flow-logs", "cloudtrail"],
            account_id,
            region,
        );
        run.objects(scope, &buckets).await?;
        run.stack(scope, "management-services-logging").await?;
    }

    run.stack(&central_primary, "environment-pipeline-stack")
        .await?;
    run.pipeline_bucket("environment-pipeline").await?;

    for scope in transit.iter().chain(management.iter().map(|(_, _, scope)| scope)) {
        run.ssm_parameters(scope).await?;
        run.log_groups(scope).await?;
    }

    Ok(run.report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_short_name() {
        assert_eq!(region_short_name("us-gov-west-1"), "usgw1");
        assert_eq!(region_short_name("us-gov-east-1"), "usge1");
        assert_eq!(region_short_name("us-east-1"), "use1");
        assert_eq!(region_short_name("local"), "local");
    }

    #[test]
    fn test_account_buckets() {
        assert_eq!(
            account_buckets(&["config", "cloudtrail"], "222222222222", "us-gov-west-1"),
            vec![
                "config-222222222222-us-gov-west-1",
                "cloudtrail-222222222222-us-gov-west-1"
            ]
        );
    }
}
