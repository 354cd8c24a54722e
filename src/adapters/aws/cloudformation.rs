use super::error::{missing_field, sdk_error, FieldText};
use crate::domain::model::{
    StackDescription, StackOutput, StackParameter, StackRequest, StackSetRequest, StackSetSummary,
};
use crate::domain::ports::CloudFormationApi;
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use aws_sdk_cloudformation::types::{
    AutoDeployment, Capability, DeploymentTargets, Parameter, PermissionModels, Stack, Tag,
};
use aws_sdk_cloudformation::Client;

const SERVICE: &str = "CloudFormation";

pub struct CloudFormationClient {
    client: Client,
}

impl CloudFormationClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn parameters(parameters: &[StackParameter]) -> Vec<Parameter> {
    parameters
        .iter()
        .map(|p| {
            Parameter::builder()
                .parameter_key(&p.key)
                .parameter_value(&p.value)
                .build()
        })
        .collect()
}

fn capabilities(capabilities: &[String]) -> Vec<Capability> {
    capabilities
        .iter()
        .map(|c| Capability::from(c.as_str()))
        .collect()
}

fn describe(stack: &Stack) -> StackDescription {
    StackDescription {
        stack_id: stack.stack_id().text().unwrap_or_default(),
        stack_name: stack.stack_name().text().unwrap_or_default(),
        status: stack.stack_status().text().unwrap_or_default(),
        parameters: stack
            .parameters()
            .iter()
            .filter_map(|p| {
                Some(StackParameter::new(
                    p.parameter_key()?,
                    p.parameter_value().unwrap_or_default(),
                ))
            })
            .collect(),
        outputs: stack
            .outputs()
            .iter()
            .filter_map(|o| {
                Some(StackOutput {
                    key: o.output_key()?.to_string(),
                    value: o.output_value().unwrap_or_default().to_string(),
                })
            })
            .collect(),
    }
}

/// `NoUpdates` is classified without a stack name; attach it here.
fn with_stack_name(error: FrameworkError, stack_name: &str) -> FrameworkError {
    match error {
        FrameworkError::NoUpdates { .. } => FrameworkError::NoUpdates {
            stack_name: stack_name.to_string(),
        },
        other => other,
    }
}

#[async_trait]
impl CloudFormationApi for CloudFormationClient {
    async fn describe_stacks(&self, stack_name: &str) -> Result<Vec<StackDescription>> {
        match self.client.describe_stacks().stack_name(stack_name).send().await {
            Ok(output) => Ok(output.stacks().iter().map(describe).collect()),
            Err(e) => match sdk_error(SERVICE, "DescribeStacks", e) {
                err if err.is_not_found() => Ok(Vec::new()),
                err => Err(err),
            },
        }
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<String> {
        let output = self
            .client
            .create_stack()
            .stack_name(&request.stack_name)
            .template_url(&request.template_url)
            .set_parameters(Some(parameters(&request.parameters)))
            .set_capabilities(Some(capabilities(&request.capabilities)))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateStack", e))?;

        output
            .stack_id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "StackId"))
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<String> {
        let output = self
            .client
            .update_stack()
            .stack_name(&request.stack_name)
            .template_url(&request.template_url)
            .set_parameters(Some(parameters(&request.parameters)))
            .set_capabilities(Some(capabilities(&request.capabilities)))
            .send()
            .await
            .map_err(|e| with_stack_name(sdk_error(SERVICE, "UpdateStack", e), &request.stack_name))?;

        output
            .stack_id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "StackId"))
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        self.client
            .delete_stack()
            .stack_name(stack_name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteStack", e))?;
        Ok(())
    }

    async fn describe_stack_set(&self, stack_set_name: &str) -> Result<Option<StackSetSummary>> {
        let output = match self
            .client
            .describe_stack_set()
            .stack_set_name(stack_set_name)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) => {
                return match sdk_error(SERVICE, "DescribeStackSet", e) {
                    err if err.is_not_found() => Ok(None),
                    err => Err(err),
                }
            }
        };

        Ok(output.stack_set().map(|stack_set| StackSetSummary {
            stack_set_name: stack_set
                .stack_set_name()
                .text()
                .unwrap_or_else(|| stack_set_name.to_string()),
            status: stack_set.status().text(),
        }))
    }

    async fn create_stack_set(&self, request: &StackSetRequest) -> Result<()> {
        let tags = request
            .tags
            .iter()
            .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
            .collect::<Vec<_>>();

        self.client
            .create_stack_set()
            .stack_set_name(&request.stack_set_name)
            .template_url(&request.template_url)
            .set_parameters(Some(parameters(&request.parameters)))
            .set_capabilities(Some(capabilities(&request.capabilities)))
            .set_tags(Some(tags))
            .permission_model(PermissionModels::ServiceManaged)
            .auto_deployment(
                AutoDeployment::builder()
                    .enabled(true)
                    .retain_stacks_on_account_removal(true)
                    .build(),
            )
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateStackSet", e))?;
        Ok(())
    }

    async fn update_stack_set(&self, request: &StackSetRequest) -> Result<String> {
        let tags = request
            .tags
            .iter()
            .map(|t| Tag::builder().key(&t.key).value(&t.value).build())
            .collect::<Vec<_>>();

        let output = self
            .client
            .update_stack_set()
            .stack_set_name(&request.stack_set_name)
            .template_url(&request.template_url)
            .set_parameters(Some(parameters(&request.parameters)))
            .set_capabilities(Some(capabilities(&request.capabilities)))
            .set_tags(Some(tags))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "UpdateStackSet", e))?;

        output
            .operation_id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "OperationId"))
    }

    async fn create_stack_instances(
        &self,
        stack_set_name: &str,
        organizational_unit_ids: &[String],
        regions: &[String],
    ) -> Result<String> {
        let output = self
            .client
            .create_stack_instances()
            .stack_set_name(stack_set_name)
            .deployment_targets(
                DeploymentTargets::builder()
                    .set_organizational_unit_ids(Some(organizational_unit_ids.to_vec()))
                    .build(),
            )
            .set_regions(Some(regions.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateStackInstances", e))?;

        output
            .operation_id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "OperationId"))
    }

    async fn delete_stack_instances(
        &self,
        stack_set_name: &str,
        organizational_unit_ids: &[String],
        regions: &[String],
        retain_stacks: bool,
    ) -> Result<String> {
        let output = self
            .client
            .delete_stack_instances()
            .stack_set_name(stack_set_name)
            .deployment_targets(
                DeploymentTargets::builder()
                    .set_organizational_unit_ids(Some(organizational_unit_ids.to_vec()))
                    .build(),
            )
            .set_regions(Some(regions.to_vec()))
            .retain_stacks(retain_stacks)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteStackInstances", e))?;

        output
            .operation_id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "OperationId"))
    }

    async fn describe_stack_set_operation(
        &self,
        stack_set_name: &str,
        operation_id: &str,
    ) -> Result<String> {
        let output = self
            .client
            .describe_stack_set_operation()
            .stack_set_name(stack_set_name)
            .operation_id(operation_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DescribeStackSetOperation", e))?;

        output
            .stack_set_operation()
            .and_then(|operation| operation.status().text())
            .ok_or_else(|| missing_field(SERVICE, "StackSetOperation.Status"))
    }

    async fn delete_stack_set(&self, stack_set_name: &str) -> Result<()> {
        self.client
            .delete_stack_set()
            .stack_set_name(stack_set_name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteStackSet", e))?;
        Ok(())
    }
}
