//! CloudFormation custom resources (account vending and installer kick-off).
//!
//! CloudFormation waits for a JSON document PUT to the pre-signed
//! `ResponseURL`. Every invocation answers exactly once, including on failure.

use crate::config::settings::FrameworkSettings;
use crate::core::organization::{
    create_govcloud_account, find_ou_path, govcloud_services, invite_account, root_id,
    AccountCreation,
};
use crate::domain::ports::{Scope, ServiceProvider};
use crate::utils::error::{FrameworkError, Result};
use crate::utils::validation::validate_url;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    #[serde(default)]
    pub parameters: Vec<KeyValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyValue {
    pub key: String,
    pub value: Value,
}

impl CustomResourceEvent {
    pub fn from_value(event: Value) -> Result<Self> {
        let event: Self = serde_json::from_value(event).map_err(|e| {
            FrameworkError::invalid_event(format!("Not a CloudFormation custom resource event: {}", e))
        })?;
        validate_url("ResponseURL", &event.response_url)?;
        Ok(event)
    }

    /// `ResourceProperties.Parameters` as a map; non-string values are
    /// JSON-encoded.
    pub fn parameters(&self) -> BTreeMap<String, String> {
        self.resource_properties
            .parameters
            .iter()
            .map(|parameter| {
                let value = match &parameter.value {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                (parameter.key.clone(), value)
            })
            .collect()
    }

    pub fn parameter(&self, key: &str) -> Result<String> {
        self.parameters()
            .remove(key)
            .ok_or_else(|| FrameworkError::invalid_event(format!("Missing resource parameter {}", key)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub no_echo: bool,
    pub data: BTreeMap<String, String>,
}

/// What a handler produced for one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceResult {
    pub data: BTreeMap<String, String>,
    pub physical_resource_id: Option<String>,
}

impl ResourceResult {
    pub fn with_data<K: Into<String>, V: Into<String>>(
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        Self {
            data: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
            physical_resource_id: None,
        }
    }
}

#[async_trait]
pub trait ResponseSender: Send + Sync {
    async fn send(&self, response_url: &str, response: &CustomResourceResponse) -> Result<()>;
}

/// Sends the response with `reqwest`. The pre-signed URL is signed for an
/// empty content type, so none is set.
pub struct HttpResponseSender {
    client: reqwest::Client,
}

impl HttpResponseSender {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpResponseSender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseSender for HttpResponseSender {
    async fn send(&self, response_url: &str, response: &CustomResourceResponse) -> Result<()> {
        let body = serde_json::to_vec(response)?;
        tracing::debug!(status = ?response.status, bytes = body.len(), "Sending custom resource response");

        let reply = self
            .client
            .put(response_url)
            .header(reqwest::header::CONTENT_TYPE, "")
            .body(body)
            .send()
            .await?
            .error_for_status()?;

        tracing::info!(status_code = %reply.status(), "Custom resource response sent");
        Ok(())
    }
}

#[async_trait]
pub trait CustomResourceHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Request types that do work; anything else succeeds untouched.
    fn acts_on(&self, request_type: RequestType) -> bool {
        request_type == RequestType::Create
    }

    async fn handle(&self, event: &CustomResourceEvent) -> Result<ResourceResult>;
}

/// Run a handler and answer CloudFormation. Only a failure to deliver the
/// response is returned as an error.
pub async fn run_custom_resource(
    sender: &dyn ResponseSender,
    handler: &dyn CustomResourceHandler,
    event: &CustomResourceEvent,
    log_stream_name: &str,
) -> Result<CustomResourceResponse> {
    tracing::info!(handler = handler.name(), request_type = ?event.request_type, logical_resource_id = %event.logical_resource_id, "Custom resource request");

    let (status, result) = if handler.acts_on(event.request_type) {
        match handler.handle(event).await {
            Ok(result) => (ResponseStatus::Success, result),
            Err(e) => {
                tracing::error!(handler = handler.name(), error = %e, "Custom resource failed");
                (ResponseStatus::Failed, ResourceResult::default())
            }
        }
    } else {
        tracing::info!(handler = handler.name(), request_type = ?event.request_type, "Nothing to do for this request type, allowing it to succeed");
        (ResponseStatus::Success, ResourceResult::default())
    };

    let response = CustomResourceResponse {
        status,
        reason: format!(
            "See the details in CloudWatch Log Stream: {}",
            log_stream_name
        ),
        physical_resource_id: result
            .physical_resource_id
            .unwrap_or_else(|| log_stream_name.to_string()),
        stack_id: event.stack_id.clone(),
        request_id: event.request_id.clone(),
        logical_resource_id: event.logical_resource_id.clone(),
        no_echo: false,
        data: result.data,
    };

    sender.send(&event.response_url, &response).await?;
    Ok(response)
}

/// `avm-get-ou`: resolve `ou_path` from the GovCloud root.
pub struct GetOuHandler<'a> {
    pub services: &'a dyn ServiceProvider,
    pub settings: &'a FrameworkSettings,
}

#[async_trait]
impl CustomResourceHandler for GetOuHandler<'_> {
    fn name(&self) -> &'static str {
        "avm-get-ou"
    }

    async fn handle(&self, event: &CustomResourceEvent) -> Result<ResourceResult> {
        let path = event.parameter("ou_path")?;
        let govcloud = avm_services(self.services, self.settings).await?;
        let orgs = govcloud
            .organizations(&Scope::region(&self.settings.regions.govcloud))
            .await?;

        let root = root_id(orgs.as_ref()).await?;
        let ou_id = find_ou_path(orgs.as_ref(), &root, &path).await?;
        tracing::info!(root_id = %root, ou_id = %ou_id, "Resolved OU path");

        Ok(ResourceResult::with_data([
            ("current_parent_id", root),
            ("new_ou_id", ou_id),
        ]))
    }
}

/// `avm-create-govcloud-account`: vend a new GovCloud account.
pub struct CreateGovCloudAccountHandler<'a> {
    pub services: &'a dyn ServiceProvider,
    pub settings: &'a FrameworkSettings,
}

#[async_trait]
impl CustomResourceHandler for CreateGovCloudAccountHandler<'_> {
    fn name(&self) -> &'static str {
        "avm-create-govcloud-account"
    }

    async fn handle(&self, event: &CustomResourceEvent) -> Result<ResourceResult> {
        let account_name = event.parameter("account_name")?;
        let email = event.parameter("email")?;
        let orgs = self.services.organizations(&Scope::current()).await?;

        match create_govcloud_account(
            orgs.as_ref(),
            &email,
            &account_name,
            &self.settings.roles.account_access,
            self.settings.waits.govcloud_account,
        )
        .await?
        {
            AccountCreation::Created(ids) => Ok(ResourceResult::with_data([
                ("govcloud_account_id", ids.govcloud_account_id),
                ("commercial_account_id", ids.commercial_account_id),
            ])),
            AccountCreation::Existing(_) => Err(FrameworkError::AlreadyExists {
                resource_type: "Account",
                resource_id: email,
            }),
        }
    }
}

/// `avm-invite-govcloud-account`: bring a vended account into the GovCloud
/// organization.
pub struct InviteGovCloudAccountHandler<'a> {
    pub services: &'a dyn ServiceProvider,
    pub settings: &'a FrameworkSettings,
}

#[async_trait]
impl CustomResourceHandler for InviteGovCloudAccountHandler<'_> {
    fn name(&self) -> &'static str {
        "avm-invite-govcloud-account"
    }

    async fn handle(&self, event: &CustomResourceEvent) -> Result<ResourceResult> {
        let account_id = event.parameter("govcloud_account_id")?;
        let govcloud = avm_services(self.services, self.settings).await?;

        invite_account(
            govcloud.as_ref(),
            &account_id,
            &self.settings.regions.govcloud,
            &self.settings.roles.account_access,
        )
        .await?;
        Ok(ResourceResult::default())
    }
}

/// `avm-move-account`: move a GovCloud account into its target OU.
pub struct MoveAccountHandler<'a> {
    pub services: &'a dyn ServiceProvider,
    pub settings: &'a FrameworkSettings,
}

#[async_trait]
impl CustomResourceHandler for MoveAccountHandler<'_> {
    fn name(&self) -> &'static str {
        "avm-move-account"
    }

    async fn handle(&self, event: &CustomResourceEvent) -> Result<ResourceResult> {
        let current_parent_id = event.parameter("current_parent_id")?;
        let new_ou_id = event.parameter("new_ou_id")?;
        let account_id = event.parameter("account_id")?;

        if current_parent_id == new_ou_id {
            tracing::info!(account_id = %account_id, "New OU is the current parent, no move needed");
            return Ok(ResourceResult::default());
        }

        let govcloud = avm_services(self.services, self.settings).await?;
        let orgs = govcloud
            .organizations(&Scope::region(&self.settings.regions.govcloud))
            .await?;
        orgs.move_account(&account_id, &current_parent_id, &new_ou_id)
            .await?;
        tracing::info!(account_id = %account_id, new_ou_id = %new_ou_id, "Moved account");
        Ok(ResourceResult::default())
    }
}

/// `execute-state-machine`: start the installer state machine.
pub struct ExecuteStateMachineHandler<'a> {
    pub services: &'a dyn ServiceProvider,
    pub state_machine_arn: &'a str,
}

#[async_trait]
impl CustomResourceHandler for ExecuteStateMachineHandler<'_> {
    fn name(&self) -> &'static str {
        "execute-state-machine"
    }

    fn acts_on(&self, request_type: RequestType) -> bool {
        matches!(request_type, RequestType::Create | RequestType::Update)
    }

    async fn handle(&self, event: &CustomResourceEvent) -> Result<ResourceResult> {
        let sfn = self.services.step_functions(&Scope::current()).await?;
        let execution_arn = sfn.start_execution(self.state_machine_arn, "{}").await?;
        tracing::info!(execution_arn = %execution_arn, "Started state machine");

        // Updates keep the id CloudFormation already knows.
        let physical_resource_id = event
            .physical_resource_id
            .clone()
            .unwrap_or_else(new_physical_resource_id);

        Ok(ResourceResult {
            data: BTreeMap::new(),
            physical_resource_id: Some(physical_resource_id),
        })
    }
}

/// `custom-` followed by 12 lowercase hex digits.
pub fn new_physical_resource_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("custom-{}", &hex[..12])
}

async fn avm_services(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
) -> Result<Box<dyn ServiceProvider>> {
    govcloud_services(
        services,
        &settings.ssm.avm_access_key_id,
        &settings.ssm.avm_secret_access_key,
        &settings.regions.govcloud,
    )
    .await
}
