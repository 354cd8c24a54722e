use super::error::{build_error, sdk_error, FieldText};
use crate::domain::model::StageState;
use crate::domain::ports::CodePipelineApi;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_codepipeline::types::{FailureDetails, FailureType};
use aws_sdk_codepipeline::Client;
use std::collections::BTreeMap;

const SERVICE: &str = "CodePipeline";

pub struct CodePipelineClient {
    client: Client,
}

impl CodePipelineClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CodePipelineApi for CodePipelineClient {
    async fn put_job_success_result(
        &self,
        job_id: &str,
        continuation_token: Option<&str>,
        output_variables: &BTreeMap<String, String>,
    ) -> Result<()> {
        let mut request = self
            .client
            .put_job_success_result()
            .job_id(job_id)
            .set_continuation_token(continuation_token.map(str::to_string));

        for (key, value) in output_variables {
            request = request.output_variables(key, value);
        }

        request
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutJobSuccessResult", e))?;
        Ok(())
    }

    async fn put_job_failure_result(&self, job_id: &str, message: &str) -> Result<()> {
        let details = FailureDetails::builder()
            .r#type(FailureType::JobFailed)
            .message(message)
            .build()
            .map_err(|e| build_error(SERVICE, e))?;

        self.client
            .put_job_failure_result()
            .job_id(job_id)
            .failure_details(details)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "PutJobFailureResult", e))?;
        Ok(())
    }

    async fn get_pipeline_state(&self, pipeline_name: &str) -> Result<Vec<StageState>> {
        let output = self
            .client
            .get_pipeline_state()
            .name(pipeline_name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "GetPipelineState", e))?;

        Ok(output
            .stage_states()
            .iter()
            .map(|stage| StageState {
                stage_name: stage.stage_name().text().unwrap_or_default(),
                latest_status: stage
                    .latest_execution()
                    .and_then(|execution| execution.status().text()),
            })
            .collect())
    }
}
