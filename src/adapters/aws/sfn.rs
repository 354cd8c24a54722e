use super::error::{missing_field, sdk_error, FieldText};
use crate::domain::ports::StepFunctionsApi;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_sfn::Client;

const SERVICE: &str = "StepFunctions";

pub struct StepFunctionsClient {
    client: Client,
}

impl StepFunctionsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StepFunctionsApi for StepFunctionsClient {
    async fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String> {
        let output = self
            .client
            .start_execution()
            .state_machine_arn(state_machine_arn)
            .input(input)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "StartExecution", e))?;

        output
            .execution_arn()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "ExecutionArn"))
    }
}
