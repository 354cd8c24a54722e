//! CloudFormation stack create/update, driven through the poller.

use crate::config::settings::{FrameworkSettings, WaitPolicy};
use crate::core::job::{Job, PipelineAction};
use crate::core::parameters::{resolve_parameters, OneOrMany};
use crate::core::poller::{advance, LongRunningOperation, OperationState};
use crate::domain::model::{classify_stack_status, JobOutcome, OperationPhase, StackRequest};
use crate::domain::ports::{CloudFormationApi, Scope, ServiceProvider, SsmApi};
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackActionParams {
    pub stack_name: String,
    pub template_path: String,
    pub template_prefix: String,
    pub bucket_regional_domain_name: String,
    #[serde(default)]
    pub parameter_overrides: Map<String, Value>,
    #[serde(default)]
    pub ssm_parameter_path: Option<String>,
    #[serde(default)]
    pub capabilities: Option<OneOrMany>,
    pub account: String,
    pub region: String,
}

impl StackActionParams {
    pub fn template_url(&self) -> String {
        format!(
            "https://{}/{}/{}",
            self.bucket_regional_domain_name, self.template_prefix, self.template_path
        )
    }
}

/// Continuation handle: `{"stack_id": .., "stack_name": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackHandle {
    pub stack_id: String,
    pub stack_name: String,
}

/// Poll a stack until it is gone.
///
/// A stack that no longer resolves, or resolves as `DELETE_COMPLETE`, is
/// deleted; `DELETE_FAILED` aborts the wait.
pub async fn wait_for_stack_deletion(
    cfn: &dyn CloudFormationApi,
    stack_name: &str,
    policy: WaitPolicy,
) -> Result<()> {
    for attempt in 1..=policy.max_attempts {
        let stacks = cfn.describe_stacks(stack_name).await?;
        let live: Vec<_> = stacks
            .iter()
            .filter(|stack| stack.status != "DELETE_COMPLETE")
            .collect();

        if live.is_empty() {
            tracing::info!(stack_name = %stack_name, attempt, "Stack deleted");
            return Ok(());
        }
        if let Some(stack) = live.iter().find(|stack| stack.status == "DELETE_FAILED") {
            return Err(FrameworkError::operation_failed(format!(
                "Stack {} could not be deleted: {}",
                stack.stack_name, stack.status
            )));
        }

        tracing::debug!(stack_name = %stack_name, attempt, "Waiting for stack deletion");
        policy.pause().await;
    }

    Err(FrameworkError::Timeout {
        operation: format!("deletion of stack {}", stack_name),
        attempts: policy.max_attempts,
    })
}

/// Create the stack, or update it when it already exists.
///
/// A stack stuck in `ROLLBACK_COMPLETE` cannot be updated, so it is deleted
/// (blocking until gone) and created again.
pub async fn submit_stack(
    cfn: &dyn CloudFormationApi,
    request: &StackRequest,
    delete_wait: WaitPolicy,
) -> Result<StackHandle> {
    let existing = cfn
        .describe_stacks(&request.stack_name)
        .await?
        .into_iter()
        .find(|stack| stack.stack_name == request.stack_name);

    let existing = match existing {
        Some(stack) if stack.status == "ROLLBACK_COMPLETE" => {
            tracing::warn!(stack_name = %request.stack_name, "Stack is in ROLLBACK_COMPLETE, deleting before re-creating");
            cfn.delete_stack(&request.stack_name).await?;
            wait_for_stack_deletion(cfn, &request.stack_name, delete_wait).await?;
            None
        }
        other => other,
    };

    let stack_id = match existing {
        Some(stack) => {
            tracing::info!(stack_name = %request.stack_name, "Stack exists - updating stack");
            match cfn.update_stack(request).await {
                Ok(stack_id) => stack_id,
                Err(FrameworkError::NoUpdates { .. }) => {
                    tracing::info!(stack_name = %request.stack_name, "Stack already up to date");
                    stack.stack_id
                }
                Err(e) => return Err(e),
            }
        }
        None => {
            tracing::info!(stack_name = %request.stack_name, "Stack does not exist - creating stack");
            cfn.create_stack(request).await?
        }
    };

    tracing::info!(stack_name = %request.stack_name, stack_id = %stack_id, "Stack operation submitted");
    Ok(StackHandle {
        stack_id,
        stack_name: request.stack_name.clone(),
    })
}

pub async fn check_stack(cfn: &dyn CloudFormationApi, handle: &StackHandle) -> Result<OperationState> {
    let stacks = cfn.describe_stacks(&handle.stack_name).await?;
    let Some(stack) = stacks.iter().find(|stack| stack.stack_id == handle.stack_id) else {
        return Ok(OperationState::Failed {
            message: format!("Stack {} no longer exists", handle.stack_id),
        });
    };

    tracing::info!(stack_name = %stack.stack_name, status = %stack.status, "Stack status");
    Ok(match classify_stack_status(&stack.status) {
        OperationPhase::Succeeded => OperationState::Succeeded {
            outputs: stack.output_variables(),
        },
        OperationPhase::Failed => OperationState::Failed {
            message: format!("Stack Status: {}", stack.status),
        },
        OperationPhase::InProgress => OperationState::InProgress,
    })
}

pub struct StackOperation<'a> {
    pub cfn: &'a dyn CloudFormationApi,
    pub ssm: &'a dyn SsmApi,
    pub params: &'a StackActionParams,
    pub delete_wait: WaitPolicy,
}

impl StackOperation<'_> {
    pub async fn build_request(&self) -> Result<StackRequest> {
        let parameters = resolve_parameters(
            self.ssm,
            &self.params.parameter_overrides,
            self.params.ssm_parameter_path.as_deref(),
        )
        .await?;

        Ok(StackRequest {
            stack_name: self.params.stack_name.clone(),
            template_url: self.params.template_url(),
            parameters,
            capabilities: self
                .params
                .capabilities
                .clone()
                .map(OneOrMany::into_vec)
                .unwrap_or_default(),
        })
    }
}

#[async_trait]
impl LongRunningOperation for StackOperation<'_> {
    type Handle = StackHandle;

    async fn submit(&self) -> Result<StackHandle> {
        let request = self.build_request().await?;
        tracing::debug!(template_url = %request.template_url, parameters = request.parameters.len(), "Submitting stack");
        submit_stack(self.cfn, &request, self.delete_wait).await
    }

    async fn check(&self, handle: &StackHandle) -> Result<OperationState> {
        check_stack(self.cfn, handle).await
    }
}

/// `create-update-stack` pipeline action: deploy a stack into any account
/// and region, assuming the framework role when the account is not ours.
pub struct CreateUpdateStackAction<'a> {
    pub services: &'a dyn ServiceProvider,
    pub settings: &'a FrameworkSettings,
}

#[async_trait]
impl PipelineAction for CreateUpdateStackAction<'_> {
    fn name(&self) -> &'static str {
        "create-update-stack"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: StackActionParams = job.user_parameters()?;
        tracing::info!(stack_name = %params.stack_name, account = %params.account, region = %params.region, "create-update-stack");

        let scope = Scope::account(&params.account, &params.region);
        let cfn = self.services.cloudformation(&scope).await?;
        let ssm = self.services.ssm(&Scope::current()).await?;

        let operation = StackOperation {
            cfn: cfn.as_ref(),
            ssm: ssm.as_ref(),
            params: &params,
            delete_wait: self.settings.waits.stack_delete,
        };
        advance(&operation, job.continuation_token()).await
    }
}
