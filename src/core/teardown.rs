//! Best-effort teardown helpers used by the nuke sequences.

use crate::config::settings::WaitPolicy;
use crate::core::stack::wait_for_stack_deletion;
use crate::domain::model::CleanupResult;
use crate::domain::ports::{CloudFormationApi, LogsApi, S3Api, SecurityHubApi, SsmApi};
use crate::utils::error::{FrameworkError, Result};

/// Delete a stack and wait for it to disappear.
///
/// AWS errors are logged and reported as `Failed`; a wait that runs out of
/// attempts is returned so the caller stops.
pub async fn delete_stack(
    cfn: &dyn CloudFormationApi,
    stack_name: &str,
    policy: WaitPolicy,
) -> Result<CleanupResult> {
    match cfn.describe_stacks(stack_name).await {
        Ok(stacks) if stacks.is_empty() => {
            tracing::info!(stack_name = %stack_name, "Stack does not exist");
            return Ok(CleanupResult::AlreadyDeleted);
        }
        Ok(_) => {}
        Err(e) => {
            tracing::info!(stack_name = %stack_name, error = %e, "Stack does not exist");
            return Ok(CleanupResult::AlreadyDeleted);
        }
    }

    tracing::info!(stack_name = %stack_name, "Deleting stack");
    if let Err(e) = cfn.delete_stack(stack_name).await {
        tracing::error!(stack_name = %stack_name, error = %e, "Stack deletion failed");
        return Ok(CleanupResult::Failed);
    }

    match wait_for_stack_deletion(cfn, stack_name, policy).await {
        Ok(()) => Ok(CleanupResult::Deleted),
        Err(e @ FrameworkError::Timeout { .. }) => Err(e),
        Err(e) => {
            tracing::error!(stack_name = %stack_name, error = %e, "Stack deletion failed");
            Ok(CleanupResult::Failed)
        }
    }
}

/// Empty a bucket: every object version, then every current object.
pub async fn delete_objects(s3: &dyn S3Api, bucket: &str) -> CleanupResult {
    tracing::info!(bucket = %bucket, "Emptying bucket");
    let versions = match s3.delete_object_versions(bucket).await {
        Ok(count) => count,
        Err(e) => return swallow(bucket, e),
    };
    match s3.delete_objects_with_prefix(bucket, "").await {
        Ok(objects) => {
            tracing::debug!(bucket = %bucket, versions, objects, "Bucket emptied");
            CleanupResult::Deleted
        }
        Err(e) => swallow(bucket, e),
    }
}

pub async fn delete_bucket(s3: &dyn S3Api, bucket: &str) -> CleanupResult {
    let emptied = delete_objects(s3, bucket).await;
    if emptied != CleanupResult::Deleted {
        return emptied;
    }

    tracing::info!(bucket = %bucket, "Deleting bucket");
    match s3.delete_bucket(bucket).await {
        Ok(()) => CleanupResult::Deleted,
        Err(e) => swallow(bucket, e),
    }
}

fn swallow(bucket: &str, e: FrameworkError) -> CleanupResult {
    if e.is_not_found() {
        tracing::info!(bucket = %bucket, "Bucket does not exist");
        CleanupResult::AlreadyDeleted
    } else {
        tracing::warn!(bucket = %bucket, error = %e, "Ignoring bucket cleanup error");
        CleanupResult::Failed
    }
}

/// Delete every SSM parameter in the account and region. Returns the count.
pub async fn delete_ssm_parameters(ssm: &dyn SsmApi) -> Result<usize> {
    let names = ssm.describe_parameters().await?;
    for name in &names {
        tracing::info!(parameter = %name, "Deleting parameter");
        ssm.delete_parameter(name).await?;
    }
    Ok(names.len())
}

pub async fn delete_security_hub_members(securityhub: &dyn SecurityHubApi) -> CleanupResult {
    let members = match securityhub.list_members().await {
        Ok(members) => members,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list Security Hub members");
            return CleanupResult::Failed;
        }
    };
    if members.is_empty() {
        return CleanupResult::Skipped;
    }

    let account_ids: Vec<String> = members.into_iter().map(|member| member.account_id).collect();
    tracing::info!(members = ?account_ids, "Deleting Security Hub members");
    match securityhub.delete_members(&account_ids).await {
        Ok(()) => CleanupResult::Deleted,
        Err(e) => {
            tracing::warn!(error = %e, "Could not delete Security Hub members");
            CleanupResult::Failed
        }
    }
}

pub async fn delete_log_groups(logs: &dyn LogsApi) -> CleanupResult {
    let names = match logs.describe_log_groups().await {
        Ok(names) => names,
        Err(e) => {
            tracing::warn!(error = %e, "Could not list log groups");
            return CleanupResult::Failed;
        }
    };
    if names.is_empty() {
        return CleanupResult::Skipped;
    }

    for name in &names {
        tracing::info!(log_group = %name, "Deleting log group");
        if let Err(e) = logs.delete_log_group(name).await {
            tracing::warn!(log_group = %name, error = %e, "Could not delete log group");
            return CleanupResult::Failed;
        }
    }
    CleanupResult::Deleted
}
