//! CodePipeline custom-action job contract.
//!
//! A job arrives as `{"CodePipeline.job": {"id": .., "data": {..}}}`. The
//! action's `UserParameters` is a JSON document encoded as a string, and a
//! `continuationToken` is present when CodePipeline re-invokes an action that
//! previously asked to be continued.

use crate::domain::model::JobOutcome;
use crate::domain::ports::CodePipelineApi;
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct CodePipelineEvent {
    #[serde(rename = "CodePipeline.job")]
    pub job: Job,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: String,
    #[serde(default, rename = "accountId")]
    pub account_id: Option<String>,
    pub data: JobData,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobData {
    #[serde(default)]
    pub action_configuration: ActionConfiguration,
    #[serde(default)]
    pub input_artifacts: Vec<Artifact>,
    #[serde(default)]
    pub output_artifacts: Vec<Artifact>,
    #[serde(default)]
    pub continuation_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActionConfiguration {
    #[serde(default)]
    pub configuration: Configuration,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Configuration {
    #[serde(rename = "UserParameters", default)]
    pub user_parameters: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub name: Option<String>,
    pub location: ArtifactLocation,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactLocation {
    pub s3_location: S3Location,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct S3Location {
    pub bucket_name: String,
    pub object_key: String,
}

impl Job {
    /// Decode `UserParameters` into the action's parameter type.
    pub fn user_parameters<T: DeserializeOwned>(&self) -> Result<T> {
        let raw = self
            .data
            .action_configuration
            .configuration
            .user_parameters
            .as_deref()
            .ok_or_else(|| FrameworkError::invalid_event("UserParameters is missing"))?;
        Ok(serde_json::from_str(raw)?)
    }

    pub fn continuation_token(&self) -> Option<&str> {
        self.data.continuation_token.as_deref()
    }
}

impl CodePipelineEvent {
    pub fn from_value(event: Value) -> Result<Self> {
        serde_json::from_value(event)
            .map_err(|e| FrameworkError::invalid_event(format!("Not a CodePipeline job: {}", e)))
    }
}

#[async_trait]
pub trait PipelineAction: Send + Sync {
    fn name(&self) -> &'static str;
    async fn execute(&self, job: &Job) -> Result<JobOutcome>;
}

/// Run one action invocation and report its outcome to CodePipeline.
///
/// Any error raised by the action is reported as a job failure carrying the
/// error text; only a failure to talk to CodePipeline itself is returned.
pub async fn run_job(
    codepipeline: &dyn CodePipelineApi,
    action: &dyn PipelineAction,
    event: &CodePipelineEvent,
) -> Result<JobOutcome> {
    let job = &event.job;
    tracing::info!(job_id = %job.id, action = action.name(), continuation = job.continuation_token().is_some(), "Running pipeline job");

    let outcome = match action.execute(job).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(job_id = %job.id, action = action.name(), error = %e, "Function failed due to exception");
            JobOutcome::Failed {
                message: e.to_string(),
            }
        }
    };

    report_outcome(codepipeline, &job.id, &outcome).await?;
    Ok(outcome)
}

pub async fn report_outcome(
    codepipeline: &dyn CodePipelineApi,
    job_id: &str,
    outcome: &JobOutcome,
) -> Result<()> {
    match outcome {
        JobOutcome::Succeeded { output_variables } => {
            tracing::info!(job_id = %job_id, outputs = output_variables.len(), "Job succeeded");
            codepipeline
                .put_job_success_result(job_id, None, output_variables)
                .await
        }
        JobOutcome::Continue { continuation_token } => {
            tracing::info!(job_id = %job_id, "Job still running, asking to be continued");
            codepipeline
                .put_job_success_result(job_id, Some(continuation_token), &Default::default())
                .await
        }
        JobOutcome::Failed { message } => {
            tracing::warn!(job_id = %job_id, message = %message, "Job failed");
            codepipeline.put_job_failure_result(job_id, message).await
        }
    }
}
