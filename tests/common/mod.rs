// In-memory fakes of the service ports shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use compliant_framework::core::job::CodePipelineEvent;
use compliant_framework::domain::model::{
    Account, BlobRef, CreateAccountStatus, InitialCommit, Organization, OrganizationalUnit,
    Partition, PutObject, SecurityHubInvitation, SecurityHubMember, StackDescription, StackOutput,
    StackRequest, StackSetRequest, StackSetSummary, StageState,
};
use compliant_framework::domain::ports::{
    CloudFormationApi, CodeCommitApi, CodePipelineApi, LogsApi, OrganizationsApi, S3Api, Scope,
    SecurityHubApi, ServiceProvider, SsmApi, StepFunctionsApi,
};
use compliant_framework::utils::error::{FrameworkError, Result};
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};

pub const CALLER_ACCOUNT: &str = "111111111111";

pub fn job_event(user_parameters: Value, continuation_token: Option<&str>) -> CodePipelineEvent {
    let mut data = json!({
        "actionConfiguration": {
            "configuration": {"UserParameters": user_parameters.to_string()}
        },
        "inputArtifacts": [],
        "outputArtifacts": []
    });
    if let Some(token) = continuation_token {
        data["continuationToken"] = json!(token);
    }

    CodePipelineEvent::from_value(json!({
        "CodePipeline.job": {"id": "job-1", "accountId": CALLER_ACCOUNT, "data": data}
    }))
    .unwrap()
}

// ---------------------------------------------------------------- CloudFormation

#[derive(Default)]
pub struct CfnState {
    pub stacks: BTreeMap<String, StackDescription>,
    /// Statuses a stack moves through, one per describe call.
    pub status_script: HashMap<String, VecDeque<String>>,
    pub stack_sets: BTreeMap<String, StackSetSummary>,
    /// Answers to `describe_stack_set_operation`; `SUCCEEDED` once drained.
    pub operation_statuses: VecDeque<String>,
    pub no_updates: bool,
    pub calls: Vec<String>,
    next_id: u32,
}

#[derive(Clone, Default)]
pub struct FakeCloudFormation {
    pub state: Arc<Mutex<CfnState>>,
}

impl FakeCloudFormation {
    pub fn add_stack(&self, name: &str, status: &str, outputs: &[(&str, &str)]) -> String {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let stack_id = stack_id(name, state.next_id);
        state.stacks.insert(
            name.to_string(),
            StackDescription {
                stack_id: stack_id.clone(),
                stack_name: name.to_string(),
                status: status.to_string(),
                parameters: vec![],
                outputs: outputs
                    .iter()
                    .map(|(key, value)| StackOutput {
                        key: key.to_string(),
                        value: value.to_string(),
                    })
                    .collect(),
            },
        );
        stack_id
    }

    pub fn script_statuses(&self, name: &str, statuses: &[&str]) {
        self.state.lock().unwrap().status_script.insert(
            name.to_string(),
            statuses.iter().map(|s| s.to_string()).collect(),
        );
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

fn stack_id(name: &str, n: u32) -> String {
    format!(
        "arn:aws-us-gov:cloudformation:us-gov-west-1:{}:stack/{}/{}",
        CALLER_ACCOUNT, name, n
    )
}

#[async_trait]
impl CloudFormationApi for FakeCloudFormation {
    async fn describe_stacks(&self, stack_name: &str) -> Result<Vec<StackDescription>> {
        let mut state = self.state.lock().unwrap();
        let next = state
            .status_script
            .get_mut(stack_name)
            .and_then(|script| script.pop_front());
        if let (Some(status), Some(stack)) = (next, state.stacks.get_mut(stack_name)) {
            stack.status = status;
        }
        Ok(state.stacks.get(stack_name).cloned().into_iter().collect())
    }

    async fn create_stack(&self, request: &StackRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("CreateStack:{}", request.stack_name));
        state.next_id += 1;
        let stack_id = stack_id(&request.stack_name, state.next_id);
        state.stacks.insert(
            request.stack_name.clone(),
            StackDescription {
                stack_id: stack_id.clone(),
                stack_name: request.stack_name.clone(),
                status: "CREATE_IN_PROGRESS".to_string(),
                parameters: request.parameters.clone(),
                outputs: vec![],
            },
        );
        Ok(stack_id)
    }

    async fn update_stack(&self, request: &StackRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("UpdateStack:{}", request.stack_name));
        if state.no_updates {
            return Err(FrameworkError::NoUpdates {
                stack_name: request.stack_name.clone(),
            });
        }
        let stack = state
            .stacks
            .get_mut(&request.stack_name)
            .ok_or_else(|| FrameworkError::not_found("CloudFormation", &request.stack_name))?;
        stack.status = "UPDATE_IN_PROGRESS".to_string();
        stack.parameters = request.parameters.clone();
        Ok(stack.stack_id.clone())
    }

    async fn delete_stack(&self, stack_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("DeleteStack:{}", stack_name));
        state.stacks.remove(stack_name);
        Ok(())
    }

    async fn describe_stack_set(&self, stack_set_name: &str) -> Result<Option<StackSetSummary>> {
        Ok(self.state.lock().unwrap().stack_sets.get(stack_set_name).cloned())
    }

    async fn create_stack_set(&self, request: &StackSetRequest) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("CreateStackSet:{}", request.stack_set_name));
        state.stack_sets.insert(
            request.stack_set_name.clone(),
            StackSetSummary {
                stack_set_name: request.stack_set_name.clone(),
                status: Some("ACTIVE".to_string()),
            },
        );
        Ok(())
    }

    async fn update_stack_set(&self, request: &StackSetRequest) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("UpdateStackSet:{}", request.stack_set_name));
        state.next_id += 1;
        Ok(format!("op-{}", state.next_id))
    }

    async fn create_stack_instances(
        &self,
        stack_set_name: &str,
        organizational_unit_ids: &[String],
        regions: &[String],
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!(
            "CreateStackInstances:{}:{}:{}",
            stack_set_name,
            organizational_unit_ids.join(","),
            regions.join(",")
        ));
        state.next_id += 1;
        Ok(format!("op-{}", state.next_id))
    }

    async fn delete_stack_instances(
        &self,
        stack_set_name: &str,
        organizational_unit_ids: &[String],
        regions: &[String],
        _retain_stacks: bool,
    ) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        if !state.stack_sets.contains_key(stack_set_name) {
            return Err(FrameworkError::not_found("CloudFormation", stack_set_name));
        }
        state.calls.push(format!(
            "DeleteStackInstances:{}:{}:{}",
            stack_set_name,
            organizational_unit_ids.join(","),
            regions.join(",")
        ));
        state.next_id += 1;
        Ok(format!("op-{}", state.next_id))
    }

    async fn describe_stack_set_operation(
        &self,
        _stack_set_name: &str,
        _operation_id: &str,
    ) -> Result<String> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .operation_statuses
            .pop_front()
            .unwrap_or_else(|| "SUCCEEDED".to_string()))
    }

    async fn delete_stack_set(&self, stack_set_name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("DeleteStackSet:{}", stack_set_name));
        state.stack_sets.remove(stack_set_name);
        Ok(())
    }
}

// ---------------------------------------------------------------- Organizations

pub struct OrgState {
    pub roots: Vec<String>,
    /// `(parent id, unit)`
    pub ous: Vec<(String, OrganizationalUnit)>,
    pub accounts: Vec<Account>,
    pub organization: Option<Organization>,
    /// Answers to `describe_create_account_status`, in order.
    pub account_statuses: VecDeque<CreateAccountStatus>,
    pub calls: Vec<String>,
    next_id: u32,
}

impl Default for OrgState {
    fn default() -> Self {
        Self {
            roots: vec!["r-root".to_string()],
            ous: vec![],
            accounts: vec![],
            organization: None,
            account_statuses: VecDeque::new(),
            calls: vec![],
            next_id: 0,
        }
    }
}

#[derive(Clone, Default)]
pub struct FakeOrganizations {
    pub state: Arc<Mutex<OrgState>>,
}

impl FakeOrganizations {
    pub fn add_ou(&self, parent_id: &str, id: &str, name: &str) {
        self.state.lock().unwrap().ous.push((
            parent_id.to_string(),
            OrganizationalUnit {
                id: id.to_string(),
                name: name.to_string(),
            },
        ));
    }

    pub fn add_account(&self, id: &str, email: &str) {
        self.state.lock().unwrap().accounts.push(Account {
            id: id.to_string(),
            name: None,
            email: Some(email.to_string()),
        });
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl OrganizationsApi for FakeOrganizations {
    async fn list_roots(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().roots.clone())
    }

    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
    ) -> Result<Vec<OrganizationalUnit>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .ous
            .iter()
            .filter(|(parent, _)| parent == parent_id)
            .map(|(_, ou)| ou.clone())
            .collect())
    }

    async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<OrganizationalUnit> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("CreateOrganizationalUnit:{}:{}", parent_id, name));
        state.next_id += 1;
        let ou = OrganizationalUnit {
            id: format!("ou-{}", state.next_id),
            name: name.to_string(),
        };
        state.ous.push((parent_id.to_string(), ou.clone()));
        Ok(ou)
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.accounts.iter().any(|account| account.id == account_id) {
            return Err(FrameworkError::not_found("Organizations", account_id));
        }
        state.calls.push(format!(
            "MoveAccount:{}:{}:{}",
            account_id, source_parent_id, destination_parent_id
        ));
        Ok(())
    }

    async fn describe_organization(&self) -> Result<Option<Organization>> {
        Ok(self.state.lock().unwrap().organization.clone())
    }

    async fn create_organization(&self) -> Result<Organization> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("CreateOrganization".to_string());
        let organization = Organization {
            id: "o-created".to_string(),
        };
        state.organization = Some(organization.clone());
        Ok(organization)
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        Ok(self.state.lock().unwrap().accounts.clone())
    }

    async fn create_gov_cloud_account(
        &self,
        email: &str,
        account_name: &str,
        _role_name: &str,
    ) -> Result<CreateAccountStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("CreateGovCloudAccount:{}:{}", account_name, email));
        state.next_id += 1;
        Ok(CreateAccountStatus {
            request_id: format!("car-{}", state.next_id),
            state: "IN_PROGRESS".to_string(),
            account_id: None,
            govcloud_account_id: None,
            failure_reason: None,
        })
    }

    async fn describe_create_account_status(
        &self,
        request_id: &str,
    ) -> Result<CreateAccountStatus> {
        let mut state = self.state.lock().unwrap();
        Ok(state
            .account_statuses
            .pop_front()
            .unwrap_or_else(|| CreateAccountStatus {
                request_id: request_id.to_string(),
                state: "SUCCEEDED".to_string(),
                account_id: Some("333333333333".to_string()),
                govcloud_account_id: Some("444444444444".to_string()),
                failure_reason: None,
            }))
    }

    async fn invite_account_to_organization(&self, account_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("InviteAccountToOrganization:{}", account_id));
        Ok(format!("h-{}", account_id))
    }

    async fn accept_handshake(&self, handshake_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("AcceptHandshake:{}", handshake_id));
        Ok(())
    }
}

// ---------------------------------------------------------------- SSM

#[derive(Clone, Default)]
pub struct FakeSsm {
    pub parameters: Arc<Mutex<BTreeMap<String, String>>>,
}

impl FakeSsm {
    pub fn put(&self, name: &str, value: &str) {
        self.parameters
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.parameters.lock().unwrap().get(name).cloned()
    }
}

#[async_trait]
impl SsmApi for FakeSsm {
    async fn get_parameter(&self, name: &str, _with_decryption: bool) -> Result<String> {
        self.get(name)
            .ok_or_else(|| FrameworkError::not_found("SSM", name))
    }

    async fn put_parameter(&self, name: &str, value: &str) -> Result<()> {
        self.put(name, value);
        Ok(())
    }

    async fn describe_parameters(&self) -> Result<Vec<String>> {
        Ok(self.parameters.lock().unwrap().keys().cloned().collect())
    }

    async fn delete_parameter(&self, name: &str) -> Result<()> {
        self.parameters.lock().unwrap().remove(name);
        Ok(())
    }
}

// ---------------------------------------------------------------- CodePipeline

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobResult {
    Success {
        job_id: String,
        continuation_token: Option<String>,
        output_variables: BTreeMap<String, String>,
    },
    Failure {
        job_id: String,
        message: String,
    },
}

#[derive(Clone, Default)]
pub struct FakeCodePipeline {
    pub results: Arc<Mutex<Vec<JobResult>>>,
    /// Pipeline states, one per poll; the last one repeats.
    pub states: Arc<Mutex<VecDeque<Vec<StageState>>>>,
}

impl FakeCodePipeline {
    pub fn results(&self) -> Vec<JobResult> {
        self.results.lock().unwrap().clone()
    }

    pub fn push_state(&self, stages: &[(&str, Option<&str>)]) {
        self.states.lock().unwrap().push_back(
            stages
                .iter()
                .map(|(name, status)| StageState {
                    stage_name: name.to_string(),
                    latest_status: status.map(str::to_string),
                })
                .collect(),
        );
    }
}

#[async_trait]
impl CodePipelineApi for FakeCodePipeline {
    async fn put_job_success_result(
        &self,
        job_id: &str,
        continuation_token: Option<&str>,
        output_variables: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.results.lock().unwrap().push(JobResult::Success {
            job_id: job_id.to_string(),
            continuation_token: continuation_token.map(str::to_string),
            output_variables: output_variables.clone(),
        });
        Ok(())
    }

    async fn put_job_failure_result(&self, job_id: &str, message: &str) -> Result<()> {
        self.results.lock().unwrap().push(JobResult::Failure {
            job_id: job_id.to_string(),
            message: message.to_string(),
        });
        Ok(())
    }

    async fn get_pipeline_state(&self, _pipeline_name: &str) -> Result<Vec<StageState>> {
        let mut states = self.states.lock().unwrap();
        if states.len() > 1 {
            Ok(states.pop_front().unwrap_or_default())
        } else {
            Ok(states.front().cloned().unwrap_or_default())
        }
    }
}

// ---------------------------------------------------------------- S3

#[derive(Default)]
pub struct S3State {
    /// bucket -> key -> body
    pub buckets: BTreeMap<String, BTreeMap<String, Vec<u8>>>,
    pub puts: Vec<PutObject>,
    pub deleted_buckets: Vec<String>,
    /// Buckets whose version listing fails with an access error.
    pub denied_buckets: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeS3 {
    pub state: Arc<Mutex<S3State>>,
}

impl FakeS3 {
    pub fn add_object(&self, bucket: &str, key: &str, body: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), body.to_vec());
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn puts(&self) -> Vec<PutObject> {
        self.state.lock().unwrap().puts.clone()
    }
}

#[async_trait]
impl S3Api for FakeS3 {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .cloned()
            .ok_or_else(|| FrameworkError::not_found("S3", format!("{}/{}", bucket, key)))
    }

    async fn put_object(&self, object: PutObject) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .buckets
            .entry(object.bucket.clone())
            .or_default()
            .insert(object.key.clone(), object.body.clone());
        state.puts.push(object);
        Ok(())
    }

    async fn delete_objects_with_prefix(&self, bucket: &str, prefix: &str) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let objects = state
            .buckets
            .get_mut(bucket)
            .ok_or_else(|| FrameworkError::not_found("S3", bucket))?;
        let before = objects.len();
        objects.retain(|key, _| !key.starts_with(prefix));
        Ok(before - objects.len())
    }

    async fn delete_object_versions(&self, bucket: &str) -> Result<usize> {
        let state = self.state.lock().unwrap();
        if state.denied_buckets.iter().any(|denied| denied == bucket) {
            return Err(FrameworkError::Aws {
                service: "S3",
                operation: "ListObjectVersions",
                code: Some("AccessDenied".to_string()),
                message: "Access Denied".to_string(),
            });
        }
        if state.buckets.contains_key(bucket) {
            Ok(0)
        } else {
            Err(FrameworkError::not_found("S3", bucket))
        }
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .buckets
            .remove(bucket)
            .ok_or_else(|| FrameworkError::not_found("S3", bucket))?;
        state.deleted_buckets.push(bucket.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------- CodeCommit

#[derive(Default)]
pub struct CodeCommitState {
    pub repositories: Vec<String>,
    pub commits: Vec<InitialCommit>,
    /// `(repository, branch, commit id)`
    pub branches: Vec<(String, String, String)>,
    /// repository -> blobs on the requested commit
    pub blobs: BTreeMap<String, Vec<(BlobRef, Vec<u8>)>>,
}

#[derive(Clone, Default)]
pub struct FakeCodeCommit {
    pub state: Arc<Mutex<CodeCommitState>>,
}

impl FakeCodeCommit {
    pub fn add_blob(&self, repository: &str, path: &str, content: &[u8]) {
        let mut state = self.state.lock().unwrap();
        let blobs = state.blobs.entry(repository.to_string()).or_default();
        let blob_id = format!("blob-{}", blobs.len() + 1);
        blobs.push((
            BlobRef {
                path: path.to_string(),
                blob_id,
            },
            content.to_vec(),
        ));
    }
}

#[async_trait]
impl CodeCommitApi for FakeCodeCommit {
    async fn list_repositories(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().unwrap().repositories.clone())
    }

    async fn create_repository(&self, repository_name: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .repositories
            .push(repository_name.to_string());
        Ok(())
    }

    async fn create_commit(&self, commit: &InitialCommit) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.commits.push(commit.clone());
        Ok(format!("commit-{}", state.commits.len()))
    }

    async fn create_branch(
        &self,
        repository_name: &str,
        branch_name: &str,
        commit_id: &str,
    ) -> Result<()> {
        self.state.lock().unwrap().branches.push((
            repository_name.to_string(),
            branch_name.to_string(),
            commit_id.to_string(),
        ));
        Ok(())
    }

    async fn get_differences(
        &self,
        repository_name: &str,
        _after_commit_specifier: &str,
    ) -> Result<Vec<BlobRef>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .blobs
            .get(repository_name)
            .map(|blobs| blobs.iter().map(|(blob, _)| blob.clone()).collect())
            .unwrap_or_default())
    }

    async fn get_blob(&self, repository_name: &str, blob_id: &str) -> Result<Vec<u8>> {
        self.state
            .lock()
            .unwrap()
            .blobs
            .get(repository_name)
            .and_then(|blobs| blobs.iter().find(|(blob, _)| blob.blob_id == blob_id))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| FrameworkError::not_found("CodeCommit", blob_id))
    }
}

// ---------------------------------------------------------------- Security Hub

#[derive(Default)]
pub struct SecurityHubState {
    pub members: Vec<SecurityHubMember>,
    pub invitations: Vec<SecurityHubInvitation>,
    pub calls: Vec<String>,
}

#[derive(Clone, Default)]
pub struct FakeSecurityHub {
    pub state: Arc<Mutex<SecurityHubState>>,
}

impl FakeSecurityHub {
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl SecurityHubApi for FakeSecurityHub {
    async fn list_members(&self) -> Result<Vec<SecurityHubMember>> {
        Ok(self.state.lock().unwrap().members.clone())
    }

    async fn create_members(&self, account_ids: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("CreateMembers:{}", account_ids.join(",")));
        for account_id in account_ids {
            state.members.push(SecurityHubMember {
                account_id: account_id.clone(),
                master_id: Some(CALLER_ACCOUNT.to_string()),
                member_status: Some("Created".to_string()),
            });
        }
        Ok(())
    }

    async fn invite_members(&self, account_ids: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("InviteMembers:{}", account_ids.join(",")));
        for member in state
            .members
            .iter_mut()
            .filter(|member| account_ids.contains(&member.account_id))
        {
            member.member_status = Some("Invited".to_string());
        }
        Ok(())
    }

    async fn list_invitations(&self) -> Result<Vec<SecurityHubInvitation>> {
        Ok(self.state.lock().unwrap().invitations.clone())
    }

    async fn accept_invitation(&self, master_id: &str, invitation_id: &str) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .calls
            .push(format!("AcceptInvitation:{}:{}", master_id, invitation_id));
        Ok(())
    }

    async fn delete_members(&self, account_ids: &[String]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("DeleteMembers:{}", account_ids.join(",")));
        state
            .members
            .retain(|member| !account_ids.contains(&member.account_id));
        Ok(())
    }
}

// ---------------------------------------------------------------- Logs / Step Functions

#[derive(Clone, Default)]
pub struct FakeLogs {
    pub groups: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LogsApi for FakeLogs {
    async fn describe_log_groups(&self) -> Result<Vec<String>> {
        Ok(self.groups.lock().unwrap().clone())
    }

    async fn delete_log_group(&self, log_group_name: &str) -> Result<()> {
        self.groups
            .lock()
            .unwrap()
            .retain(|name| name != log_group_name);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakeStepFunctions {
    /// `(state machine arn, input)`
    pub executions: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl StepFunctionsApi for FakeStepFunctions {
    async fn start_execution(&self, state_machine_arn: &str, input: &str) -> Result<String> {
        let mut executions = self.executions.lock().unwrap();
        executions.push((state_machine_arn.to_string(), input.to_string()));
        Ok(format!("{}:execution-{}", state_machine_arn, executions.len()))
    }
}

// ---------------------------------------------------------------- provider

/// Every scope resolves to the same fakes; the requested scopes are recorded.
#[derive(Clone, Default)]
pub struct FakeServiceProvider {
    pub cfn: FakeCloudFormation,
    pub orgs: FakeOrganizations,
    pub ssm: FakeSsm,
    pub codepipeline: FakeCodePipeline,
    pub s3: FakeS3,
    pub codecommit: FakeCodeCommit,
    pub securityhub: FakeSecurityHub,
    pub logs: FakeLogs,
    pub sfn: FakeStepFunctions,
    pub scopes: Arc<Mutex<Vec<(&'static str, Scope)>>>,
}

impl FakeServiceProvider {
    fn record(&self, service: &'static str, scope: &Scope) {
        self.scopes.lock().unwrap().push((service, scope.clone()));
    }

    pub fn scopes_for(&self, service: &str) -> Vec<Scope> {
        self.scopes
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == service)
            .map(|(_, scope)| scope.clone())
            .collect()
    }
}

#[async_trait]
impl ServiceProvider for FakeServiceProvider {
    fn partition(&self) -> Partition {
        Partition::GovCloud
    }

    async fn caller_account_id(&self) -> Result<String> {
        Ok(CALLER_ACCOUNT.to_string())
    }

    async fn with_access_keys(
        &self,
        access_key_id: &str,
        _secret_access_key: &str,
        region: &str,
    ) -> Result<Box<dyn ServiceProvider>> {
        self.record("access-keys", &Scope::region(region).with_role(access_key_id));
        Ok(Box::new(self.clone()))
    }

    async fn cloudformation(&self, scope: &Scope) -> Result<Box<dyn CloudFormationApi>> {
        self.record("cloudformation", scope);
        Ok(Box::new(self.cfn.clone()))
    }

    async fn organizations(&self, scope: &Scope) -> Result<Box<dyn OrganizationsApi>> {
        self.record("organizations", scope);
        Ok(Box::new(self.orgs.clone()))
    }

    async fn ssm(&self, scope: &Scope) -> Result<Box<dyn SsmApi>> {
        self.record("ssm", scope);
        Ok(Box::new(self.ssm.clone()))
    }

    async fn codepipeline(&self, scope: &Scope) -> Result<Box<dyn CodePipelineApi>> {
        self.record("codepipeline", scope);
        Ok(Box::new(self.codepipeline.clone()))
    }

    async fn s3(&self, scope: &Scope) -> Result<Box<dyn S3Api>> {
        self.record("s3", scope);
        Ok(Box::new(self.s3.clone()))
    }

    async fn codecommit(&self, scope: &Scope) -> Result<Box<dyn CodeCommitApi>> {
        self.record("codecommit", scope);
        Ok(Box::new(self.codecommit.clone()))
    }

    async fn securityhub(&self, scope: &Scope) -> Result<Box<dyn SecurityHubApi>> {
        self.record("securityhub", scope);
        Ok(Box::new(self.securityhub.clone()))
    }

    async fn logs(&self, scope: &Scope) -> Result<Box<dyn LogsApi>> {
        self.record("logs", scope);
        Ok(Box::new(self.logs.clone()))
    }

    async fn step_functions(&self, scope: &Scope) -> Result<Box<dyn StepFunctionsApi>> {
        self.record("step_functions", scope);
        Ok(Box::new(self.sfn.clone()))
    }
}
