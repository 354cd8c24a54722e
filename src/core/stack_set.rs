//! StackSet lifecycle: ensure (create or update) and teardown.

use crate::config::settings::WaitPolicy;
use crate::core::job::{Job, PipelineAction};
use crate::core::parameters::{resolve_parameters, OneOrMany};
use crate::core::poller::{advance, LongRunningOperation, OperationState};
use crate::domain::model::{
    classify_stack_set_operation_status, CleanupResult, JobOutcome, OperationPhase,
    StackSetRequest, Tag,
};
use crate::domain::ports::{CloudFormationApi, OrganizationsApi, Scope, ServiceProvider, SsmApi};
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Look up a top-level OU (directly under the first root) by name.
pub async fn resolve_ou_id(orgs: &dyn OrganizationsApi, ou_name: &str) -> Result<Option<String>> {
    let Some(root_id) = orgs.list_roots().await?.into_iter().next() else {
        return Ok(None);
    };
    tracing::debug!(root_id = %root_id, ou_name = %ou_name, "Resolving organizational unit");

    Ok(orgs
        .list_organizational_units_for_parent(&root_id)
        .await?
        .into_iter()
        .find(|ou| ou.name == ou_name)
        .map(|ou| ou.id))
}

/// Create the StackSet and deploy it to `ou_id` in `region`, or update it in
/// place when it already exists. Returns the operation id to poll.
pub async fn ensure_stack_set(
    cfn: &dyn CloudFormationApi,
    request: &StackSetRequest,
    ou_id: &str,
    region: &str,
) -> Result<String> {
    match cfn.describe_stack_set(&request.stack_set_name).await? {
        None => {
            tracing::info!(stack_set_name = %request.stack_set_name, ou_id = %ou_id, region = %region, "Creating StackSet");
            cfn.create_stack_set(request).await?;
            cfn.create_stack_instances(
                &request.stack_set_name,
                &[ou_id.to_string()],
                &[region.to_string()],
            )
            .await
        }
        Some(existing) => {
            tracing::info!(stack_set_name = %existing.stack_set_name, status = ?existing.status, "Updating StackSet");
            cfn.update_stack_set(request).await
        }
    }
}

pub async fn check_stack_set_operation(
    cfn: &dyn CloudFormationApi,
    stack_set_name: &str,
    operation_id: &str,
) -> Result<OperationState> {
    let status = cfn
        .describe_stack_set_operation(stack_set_name, operation_id)
        .await?;
    tracing::info!(stack_set_name = %stack_set_name, operation_id = %operation_id, status = %status, "StackSet operation status");

    Ok(match classify_stack_set_operation_status(&status) {
        OperationPhase::Succeeded => OperationState::Succeeded {
            outputs: Default::default(),
        },
        OperationPhase::Failed => OperationState::Failed {
            message: format!("Operation: {}", status),
        },
        OperationPhase::InProgress => OperationState::InProgress,
    })
}

/// Block until a StackSet operation reaches a terminal status.
pub async fn wait_for_stack_set_operation(
    cfn: &dyn CloudFormationApi,
    stack_set_name: &str,
    operation_id: &str,
    policy: WaitPolicy,
) -> Result<()> {
    for _ in 0..policy.max_attempts {
        match check_stack_set_operation(cfn, stack_set_name, operation_id).await? {
            OperationState::Succeeded { .. } => return Ok(()),
            OperationState::Failed { message } => {
                return Err(FrameworkError::operation_failed(format!(
                    "StackSet {} {}",
                    stack_set_name, message
                )))
            }
            OperationState::InProgress => policy.pause().await,
        }
    }

    Err(FrameworkError::Timeout {
        operation: format!("StackSet {} operation {}", stack_set_name, operation_id),
        attempts: policy.max_attempts,
    })
}

/// Remove the stack instances deployed to `ou_name`/`region`, wait for that,
/// then delete the StackSet definition.
///
/// A missing OU or StackSet means there is nothing to tear down.
pub async fn delete_stack_set(
    cfn: &dyn CloudFormationApi,
    orgs: &dyn OrganizationsApi,
    stack_set_name: &str,
    ou_name: &str,
    region: &str,
    policy: WaitPolicy,
) -> Result<CleanupResult> {
    let Some(ou_id) = resolve_ou_id(orgs, ou_name).await? else {
        tracing::info!(stack_set_name = %stack_set_name, ou_name = %ou_name, "Organizational unit not found, skipping StackSet");
        return Ok(CleanupResult::Skipped);
    };

    tracing::info!(stack_set_name = %stack_set_name, ou_id = %ou_id, region = %region, "Deleting StackSet instances");
    let operation_id = match cfn
        .delete_stack_instances(stack_set_name, &[ou_id], &[region.to_string()], false)
        .await
    {
        Ok(operation_id) => operation_id,
        Err(e) if e.is_not_found() => {
            tracing::info!(stack_set_name = %stack_set_name, "StackSet does not exist");
            return Ok(CleanupResult::AlreadyDeleted);
        }
        Err(e) => return Err(e),
    };

    wait_for_stack_set_operation(cfn, stack_set_name, &operation_id, policy).await?;

    match cfn.delete_stack_set(stack_set_name).await {
        Ok(()) => {
            tracing::info!(stack_set_name = %stack_set_name, "StackSet deleted");
            Ok(CleanupResult::Deleted)
        }
        Err(e) if e.is_not_found() => Ok(CleanupResult::AlreadyDeleted),
        Err(e) => Err(e),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackSetActionParams {
    pub stack_set_name: String,
    pub template_url: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub ssm_parameter_path: Option<String>,
    #[serde(default)]
    pub capabilities: OneOrMany,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub ou_name: String,
    pub region: String,
}

/// Continuation handle: `{"operationId": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackSetHandle {
    #[serde(rename = "operationId")]
    pub operation_id: String,
}

pub struct StackSetOperation<'a> {
    pub cfn: &'a dyn CloudFormationApi,
    pub orgs: &'a dyn OrganizationsApi,
    pub ssm: &'a dyn SsmApi,
    pub params: &'a StackSetActionParams,
}

#[async_trait]
impl LongRunningOperation for StackSetOperation<'_> {
    type Handle = StackSetHandle;

    async fn submit(&self) -> Result<StackSetHandle> {
        let params = self.params;
        let ou_id = resolve_ou_id(self.orgs, &params.ou_name)
            .await?
            .ok_or_else(|| FrameworkError::not_found("OrganizationalUnit", &params.ou_name))?;

        let request = StackSetRequest {
            stack_set_name: params.stack_set_name.clone(),
            template_url: params.template_url.clone(),
            parameters: resolve_parameters(
                self.ssm,
                &params.parameters,
                params.ssm_parameter_path.as_deref(),
            )
            .await?,
            capabilities: params.capabilities.clone().into_vec(),
            tags: params.tags.clone(),
        };

        let operation_id = ensure_stack_set(self.cfn, &request, &ou_id, &params.region).await?;
        tracing::info!(stack_set_name = %params.stack_set_name, operation_id = %operation_id, "StackSet operation started");
        Ok(StackSetHandle { operation_id })
    }

    async fn check(&self, handle: &StackSetHandle) -> Result<OperationState> {
        check_stack_set_operation(self.cfn, &self.params.stack_set_name, &handle.operation_id).await
    }
}

/// `stack-set-action` pipeline action.
pub struct StackSetAction<'a> {
    pub services: &'a dyn ServiceProvider,
}

#[async_trait]
impl PipelineAction for StackSetAction<'_> {
    fn name(&self) -> &'static str {
        "stack-set-action"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: StackSetActionParams = job.user_parameters()?;
        let scope = Scope::current();
        let cfn = self.services.cloudformation(&scope).await?;
        let orgs = self.services.organizations(&scope).await?;
        let ssm = self.services.ssm(&scope).await?;

        let operation = StackSetOperation {
            cfn: cfn.as_ref(),
            orgs: orgs.as_ref(),
            ssm: ssm.as_ref(),
            params: &params,
        };
        advance(&operation, job.continuation_token()).await
    }
}
