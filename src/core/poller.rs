//! Long-running operation poller.
//!
//! Drives an asynchronous AWS operation to completion across several
//! invocations. The first invocation submits the operation and hands back an
//! opaque continuation token; each later invocation decodes the token, checks
//! status once and either finishes or re-emits the token unchanged. There is
//! no sleeping here: CodePipeline's re-invocation cadence is the backoff.

use crate::domain::model::JobOutcome;
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

/// Status of an operation after a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationState {
    Succeeded { outputs: BTreeMap<String, String> },
    Failed { message: String },
    InProgress,
}

#[async_trait]
pub trait LongRunningOperation: Send + Sync {
    /// Handle identifying the submitted operation; serialized as the token.
    type Handle: Serialize + DeserializeOwned + Send + Sync;

    async fn submit(&self) -> Result<Self::Handle>;
    async fn check(&self, handle: &Self::Handle) -> Result<OperationState>;
}

pub fn encode_token<H: Serialize>(handle: &H) -> Result<String> {
    Ok(serde_json::to_string(handle)?)
}

pub fn decode_token<H: DeserializeOwned>(token: &str) -> Result<H> {
    serde_json::from_str(token)
        .map_err(|e| FrameworkError::invalid_event(format!("Malformed continuation token: {}", e)))
}

/// Advance the operation by one invocation.
pub async fn advance<O: LongRunningOperation>(
    operation: &O,
    continuation_token: Option<&str>,
) -> Result<JobOutcome> {
    let Some(token) = continuation_token else {
        let handle = operation.submit().await?;
        let continuation_token = encode_token(&handle)?;
        tracing::info!(token = %continuation_token, "Operation submitted");
        return Ok(JobOutcome::Continue { continuation_token });
    };

    let handle: O::Handle = decode_token(token)?;
    match operation.check(&handle).await? {
        OperationState::Succeeded { outputs } => Ok(JobOutcome::Succeeded {
            output_variables: outputs,
        }),
        OperationState::Failed { message } => Ok(JobOutcome::Failed { message }),
        OperationState::InProgress => {
            tracing::debug!(token = %token, "Operation still in progress");
            Ok(JobOutcome::Continue {
                continuation_token: token.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::Mutex;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Handle {
        id: String,
    }

    struct ScriptedOperation {
        state: OperationState,
        submissions: Mutex<u32>,
    }

    impl ScriptedOperation {
        fn new(state: OperationState) -> Self {
            Self {
                state,
                submissions: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl LongRunningOperation for ScriptedOperation {
        type Handle = Handle;

        async fn submit(&self) -> Result<Handle> {
            *self.submissions.lock().expect("poisoned mutex") += 1;
            Ok(Handle {
                id: "op-1".to_string(),
            })
        }

        async fn check(&self, handle: &Handle) -> Result<OperationState> {
            assert_eq!(handle.id, "op-1");
            Ok(self.state.clone())
        }
    }

    #[tokio::test]
    async fn test_first_invocation_submits_and_continues() {
        let operation = ScriptedOperation::new(OperationState::InProgress);
        let outcome = advance(&operation, None).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Continue {
                continuation_token: "{\"id\":\"op-1\"}".to_string()
            }
        );
        assert_eq!(*operation.submissions.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_in_progress_re_emits_identical_token() {
        let operation = ScriptedOperation::new(OperationState::InProgress);
        // Extra whitespace must survive untouched.
        let token = "{ \"id\": \"op-1\" }";
        let outcome = advance(&operation, Some(token)).await.unwrap();

        assert_eq!(
            outcome,
            JobOutcome::Continue {
                continuation_token: token.to_string()
            }
        );
        assert_eq!(*operation.submissions.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_terminal_states_do_not_continue() {
        let succeeded = ScriptedOperation::new(OperationState::Succeeded {
            outputs: BTreeMap::from([("Foo".to_string(), "bar".to_string())]),
        });
        let outcome = advance(&succeeded, Some("{\"id\":\"op-1\"}")).await.unwrap();
        assert!(outcome.is_terminal());
        assert_eq!(
            outcome,
            JobOutcome::Succeeded {
                output_variables: BTreeMap::from([("Foo".to_string(), "bar".to_string())])
            }
        );

        let failed = ScriptedOperation::new(OperationState::Failed {
            message: "Stack Status: ROLLBACK_COMPLETE".to_string(),
        });
        let outcome = advance(&failed, Some("{\"id\":\"op-1\"}")).await.unwrap();
        assert!(matches!(outcome, JobOutcome::Failed { ref message } if !message.is_empty()));
    }

    #[tokio::test]
    async fn test_malformed_token_is_an_error() {
        let operation = ScriptedOperation::new(OperationState::InProgress);
        let err = advance(&operation, Some("not-json")).await.unwrap_err();
        assert!(matches!(err, FrameworkError::InvalidEvent { .. }));
    }
}
