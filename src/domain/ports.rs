use crate::domain::model::{
    Account, BlobRef, CreateAccountStatus, InitialCommit, Organization, OrganizationalUnit,
    Partition, PutObject, SecurityHubInvitation, SecurityHubMember, StackDescription,
    StackRequest, StackSetRequest, StackSetSummary, StageState,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait CloudFormationApi: Send + Sync {
    /// Empty when the stack does not exist.
    async fn describe_stacks(&self, stack_name: &str) -> Result<Vec<StackDescription>>;
    /// Returns the stack id.
    async fn create_stack(&self, request: &StackRequest) -> Result<String>;
    /// Returns the stack id, or `FrameworkError::NoUpdates`.
    async fn update_stack(&self, request: &StackRequest) -> Result<String>;
    async fn delete_stack(&self, stack_name: &str) -> Result<()>;

    async fn describe_stack_set(&self, stack_set_name: &str) -> Result<Option<StackSetSummary>>;
    async fn create_stack_set(&self, request: &StackSetRequest) -> Result<()>;
    /// Returns the operation id.
    async fn update_stack_set(&self, request: &StackSetRequest) -> Result<String>;
    async fn create_stack_instances(
        &self,
        stack_set_name: &str,
        organizational_unit_ids: &[String],
        regions: &[String],
    ) -> Result<String>;
    async fn delete_stack_instances(
        &self,
        stack_set_name: &str,
        organizational_unit_ids: &[String],
        regions: &[String],
        retain_stacks: bool,
    ) -> Result<String>;
    /// Returns the raw operation status (`RUNNING`, `SUCCEEDED`, ...).
    async fn describe_stack_set_operation(
        &self,
        stack_set_name: &str,
        operation_id: &str,
    ) -> Result<String>;
    async fn delete_stack_set(&self, stack_set_name: &str) -> Result<()>;
}

#[async_trait]
pub trait OrganizationsApi: Send + Sync {
    async fn list_roots(&self) -> Result<Vec<String>>;
    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
    ) -> Result<Vec<OrganizationalUnit>>;
    async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<OrganizationalUnit>;
    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<()>;
    /// `None` when the caller is not part of an organization.
    async fn describe_organization(&self) -> Result<Option<Organization>>;
    async fn create_organization(&self) -> Result<Organization>;
    async fn list_accounts(&self) -> Result<Vec<Account>>;
    async fn create_gov_cloud_account(
        &self,
        email: &str,
        account_name: &str,
        role_name: &str,
    ) -> Result<CreateAccountStatus>;
    async fn describe_create_account_status(&self, request_id: &str)
        -> Result<CreateAccountStatus>;
    /// Returns the handshake id.
    async fn invite_account_to_organization(&self, account_id: &str) -> Result<String>;
    async fn accept_handshake(&self, handshake_id: &str) -> Result<()>;
}

#[async_trait]
pub trait SsmApi: Send + Sync {
    async fn get_parameter(&self, name: &str, with_decryption: bool) -> Result<String>;
    async fn put_parameter(&self, name: &str, value: &str) -> Result<()>;
    /// Names of every parameter, all pages.
    async fn describe_parameters(&self) -> Result<Vec<String>>;
    async fn delete_parameter(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait CodePipelineApi: Send + Sync {
    async fn put_job_success_result(
        &self,
        job_id: &str,
        continuation_token: Option<&str>,
        output_variables: &BTreeMap<String, String>,
    ) -> Result<()>;
    async fn put_job_failure_result(&self, job_id: &str, message: &str) -> Result<()>;
    async fn get_pipeline_state(&self, pipeline_name: &str) -> Result<Vec<StageState>>;
}

#[async_trait]
pub trait S3Api: Send + Sync {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
    async fn put_object(&self, object: PutObject) -> Result<()>;
    async fn delete_objects_with_prefix(&self, bucket: &str, prefix: &str) -> Result<usize>;
    async fn delete_object_versions(&self, bucket: &str) -> Result<usize>;
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;
}

#[async_trait]
pub trait CodeCommitApi: Send + Sync {
    async fn list_repositories(&self) -> Result<Vec<String>>;
    async fn create_repository(&self, repository_name: &str) -> Result<()>;
    /// Returns the commit id.
    async fn create_commit(&self, commit: &InitialCommit) -> Result<String>;
    async fn create_branch(
        &self,
        repository_name: &str,
        branch_name: &str,
        commit_id: &str,
    ) -> Result<()>;
    /// Every blob reachable from `after_commit_specifier`, all pages.
    async fn get_differences(
        &self,
        repository_name: &str,
        after_commit_specifier: &str,
    ) -> Result<Vec<BlobRef>>;
    async fn get_blob(&self, repository_name: &str, blob_id: &str) -> Result<Vec<u8>>;
}

#[async_trait]
pub trait SecurityHubApi: Send + Sync {
    async fn list_members(&self) -> Result<Vec<SecurityHubMember>>;
    async fn create_members(&self, account_ids: &[String]) -> Result<()>;
    async fn invite_members(&self, account_ids: &[String]) -> Result<()>;
    async fn list_invitations(&self) -> Result<Vec<SecurityHubInvitation>>;
    async fn accept_invitation(&self, master_id: &str, invitation_id: &str) -> Result<()>;
    async fn delete_members(&self, account_ids: &[String]) -> Result<()>;
}

#[async_trait]
pub trait LogsApi: Send + Sync {
    /// Names of every log group, all pages.
    async fn describe_log_groups(&self) -> Result<Vec<String>>;
    async fn delete_log_group(&self, log_group_name: &str) -> Result<()>;
}

#[async_trait]
pub trait StepFunctionsApi: Send + Sync {
    /// Returns the execution ARN.
    async fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String>;
}

/// Account and region a client is scoped to. `None` means "the caller's".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub account_id: Option<String>,
    pub region: Option<String>,
    pub role_name: Option<String>,
}

impl Scope {
    pub fn current() -> Self {
        Self::default()
    }

    pub fn region(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..Self::default()
        }
    }

    pub fn account(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            region: Some(region.into()),
            role_name: None,
        }
    }

    pub fn with_role(mut self, role_name: impl Into<String>) -> Self {
        self.role_name = Some(role_name.into());
        self
    }
}

/// Hands out service clients scoped to an account and region, assuming a
/// role in the target account when it is not the caller's own.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    fn partition(&self) -> Partition;
    async fn caller_account_id(&self) -> Result<String>;

    /// A provider authenticated with long-lived access keys, used to reach
    /// the GovCloud partition from a commercial account.
    async fn with_access_keys(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
    ) -> Result<Box<dyn ServiceProvider>>;

    async fn cloudformation(&self, scope: &Scope) -> Result<Box<dyn CloudFormationApi>>;
    async fn organizations(&self, scope: &Scope) -> Result<Box<dyn OrganizationsApi>>;
    async fn ssm(&self, scope: &Scope) -> Result<Box<dyn SsmApi>>;
    async fn codepipeline(&self, scope: &Scope) -> Result<Box<dyn CodePipelineApi>>;
    async fn s3(&self, scope: &Scope) -> Result<Box<dyn S3Api>>;
    async fn codecommit(&self, scope: &Scope) -> Result<Box<dyn CodeCommitApi>>;
    async fn securityhub(&self, scope: &Scope) -> Result<Box<dyn SecurityHubApi>>;
    async fn logs(&self, scope: &Scope) -> Result<Box<dyn LogsApi>>;
    async fn step_functions(&self, scope: &Scope) -> Result<Box<dyn StepFunctionsApi>>;
}
