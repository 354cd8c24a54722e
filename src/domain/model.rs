use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// AWS partition a region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Partition {
    #[serde(rename = "aws")]
    Commercial,
    #[serde(rename = "aws-us-gov")]
    GovCloud,
}

impl Partition {
    pub fn from_region(region: &str) -> Self {
        if region.contains("gov") {
            Partition::GovCloud
        } else {
            Partition::Commercial
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Commercial => "aws",
            Partition::GovCloud => "aws-us-gov",
        }
    }

    pub fn role_arn(&self, account_id: &str, role_name: &str) -> String {
        format!("arn:{}:iam::{}:role/{}", self.as_str(), account_id, role_name)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a long-running operation stands after a status check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    Succeeded,
    Failed,
    InProgress,
}

pub const STACK_SUCCEEDED_STATUSES: &[&str] = &["CREATE_COMPLETE", "UPDATE_COMPLETE"];

pub const STACK_FAILED_STATUSES: &[&str] = &[
    "UPDATE_ROLLBACK_COMPLETE",
    "ROLLBACK_COMPLETE",
    "CREATE_FAILED",
    "ROLLBACK_FAILED",
    "DELETE_FAILED",
    "UPDATE_ROLLBACK_FAILED",
];

pub fn classify_stack_status(status: &str) -> OperationPhase {
    if STACK_SUCCEEDED_STATUSES.contains(&status) {
        OperationPhase::Succeeded
    } else if STACK_FAILED_STATUSES.contains(&status) {
        OperationPhase::Failed
    } else {
        OperationPhase::InProgress
    }
}

/// QUEUED, RUNNING and STOPPING (and anything unknown) keep polling.
pub fn classify_stack_set_operation_status(status: &str) -> OperationPhase {
    match status {
        "SUCCEEDED" => OperationPhase::Succeeded,
        "FAILED" | "STOPPED" => OperationPhase::Failed,
        _ => OperationPhase::InProgress,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackParameter {
    #[serde(rename = "ParameterKey")]
    pub key: String,
    #[serde(rename = "ParameterValue")]
    pub value: String,
}

impl StackParameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    #[serde(rename = "OutputKey")]
    pub key: String,
    #[serde(rename = "OutputValue")]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StackDescription {
    pub stack_id: String,
    pub stack_name: String,
    pub status: String,
    pub parameters: Vec<StackParameter>,
    pub outputs: Vec<StackOutput>,
}

impl StackDescription {
    pub fn output_variables(&self) -> BTreeMap<String, String> {
        self.outputs
            .iter()
            .map(|output| (output.key.clone(), output.value.clone()))
            .collect()
    }

    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|parameter| parameter.key == key)
            .map(|parameter| parameter.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackRequest {
    pub stack_name: String,
    pub template_url: String,
    pub parameters: Vec<StackParameter>,
    pub capabilities: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(rename = "Key")]
    pub key: String,
    #[serde(rename = "Value")]
    pub value: String,
}

/// StackSets are always service-managed with auto-deployment enabled and
/// stacks retained on account removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSetRequest {
    pub stack_set_name: String,
    pub template_url: String,
    pub parameters: Vec<StackParameter>,
    pub capabilities: Vec<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSetSummary {
    pub stack_set_name: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationalUnit {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Organization {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateAccountStatus {
    pub request_id: String,
    pub state: String,
    pub account_id: Option<String>,
    pub govcloud_account_id: Option<String>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageState {
    pub stage_name: String,
    pub latest_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHubMember {
    pub account_id: String,
    pub master_id: Option<String>,
    pub member_status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityHubInvitation {
    pub account_id: String,
    pub invitation_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRef {
    pub path: String,
    pub blob_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutObject {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
    pub content_type: Option<String>,
    pub kms_key_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFile {
    pub path: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialCommit {
    pub repository_name: String,
    pub branch_name: String,
    pub author_name: String,
    pub email: String,
    pub message: String,
    pub files: Vec<CommitFile>,
}

/// Result reported back to CodePipeline for one job invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded {
        output_variables: BTreeMap<String, String>,
    },
    Continue {
        continuation_token: String,
    },
    Failed {
        message: String,
    },
}

impl JobOutcome {
    pub fn succeeded() -> Self {
        JobOutcome::Succeeded {
            output_variables: BTreeMap::new(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::Continue { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupResult {
    /// Resource was successfully deleted
    Deleted,
    /// Resource was already deleted (not found)
    AlreadyDeleted,
    /// Cleanup failed with error
    Failed,
    /// Nothing to do for this target
    Skipped,
}
