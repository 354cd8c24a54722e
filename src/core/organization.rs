//! AWS Organizations helpers shared by the pipeline actions, the account
//! vending custom resources and the installer tasks.

use crate::config::settings::WaitPolicy;
use crate::domain::model::{Account, OrganizationalUnit};
use crate::domain::ports::{OrganizationsApi, Scope, ServiceProvider};
use crate::utils::error::{FrameworkError, Result};

/// Build a GovCloud provider from the access keys stored in SSM under
/// `access_key_path` / `secret_key_path`.
pub async fn govcloud_services(
    services: &dyn ServiceProvider,
    access_key_path: &str,
    secret_key_path: &str,
    region: &str,
) -> Result<Box<dyn ServiceProvider>> {
    let ssm = services.ssm(&Scope::current()).await?;
    let access_key_id = ssm.get_parameter(access_key_path, true).await?;
    let secret_access_key = ssm.get_parameter(secret_key_path, true).await?;
    tracing::debug!(region = %region, "Using GovCloud access keys");
    services
        .with_access_keys(&access_key_id, &secret_access_key, region)
        .await
}

pub async fn root_id(orgs: &dyn OrganizationsApi) -> Result<String> {
    orgs.list_roots()
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| FrameworkError::not_found("OrganizationRoot", "root"))
}

pub async fn find_child_ou(
    orgs: &dyn OrganizationsApi,
    parent_id: &str,
    name: &str,
) -> Result<Option<OrganizationalUnit>> {
    Ok(orgs
        .list_organizational_units_for_parent(parent_id)
        .await?
        .into_iter()
        .find(|ou| ou.name == name))
}

/// Return the id of OU `name` under `parent_id`, creating it when missing.
pub async fn ensure_ou(orgs: &dyn OrganizationsApi, parent_id: &str, name: &str) -> Result<String> {
    if let Some(ou) = find_child_ou(orgs, parent_id, name).await? {
        tracing::debug!(ou_name = %name, ou_id = %ou.id, "Organizational unit exists");
        return Ok(ou.id);
    }

    let ou = orgs.create_organizational_unit(parent_id, name).await?;
    tracing::info!(ou_name = %name, ou_id = %ou.id, parent_id = %parent_id, "Created organizational unit");
    Ok(ou.id)
}

/// Walk a `/`-separated OU path (`workloads/prod`) down from `parent_id`.
pub async fn find_ou_path(orgs: &dyn OrganizationsApi, parent_id: &str, path: &str) -> Result<String> {
    let mut current = parent_id.to_string();
    for segment in path.split('/').filter(|segment| !segment.is_empty()) {
        current = find_child_ou(orgs, &current, segment)
            .await?
            .map(|ou| ou.id)
            .ok_or_else(|| FrameworkError::not_found("OrganizationalUnitPath", path))?;
    }
    Ok(current)
}

/// Move an account between parents; an account that is not in the
/// organization is ignored. Returns whether a move happened.
pub async fn move_account_if_present(
    orgs: &dyn OrganizationsApi,
    account_id: &str,
    source_parent_id: &str,
    destination_parent_id: &str,
) -> Result<bool> {
    if source_parent_id == destination_parent_id {
        tracing::info!(account_id = %account_id, "Account already under destination parent, no move needed");
        return Ok(false);
    }

    match orgs
        .move_account(account_id, source_parent_id, destination_parent_id)
        .await
    {
        Ok(()) => {
            tracing::info!(account_id = %account_id, destination = %destination_parent_id, "Moved account");
            Ok(true)
        }
        Err(e) if e.is_not_found() => {
            tracing::warn!(account_id = %account_id, "Account not found, skipping move");
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

/// Create the organization if the caller has none, then make sure OU
/// `ou_name` exists under its root. Returns the organization id.
pub async fn ensure_organization(orgs: &dyn OrganizationsApi, ou_name: &str) -> Result<String> {
    let organization = match orgs.describe_organization().await? {
        Some(organization) => organization,
        None => {
            tracing::info!("Creating organization with all features");
            orgs.create_organization().await?
        }
    };

    let root = root_id(orgs).await?;
    ensure_ou(orgs, &root, ou_name).await?;
    Ok(organization.id)
}

/// Ids of a freshly created GovCloud account pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GovCloudAccountIds {
    pub govcloud_account_id: String,
    pub commercial_account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountCreation {
    Created(GovCloudAccountIds),
    /// An account with this email is already in the organization.
    Existing(Account),
}

/// Create a GovCloud account (with its commercial twin) and poll the
/// creation request until it settles.
pub async fn create_govcloud_account(
    orgs: &dyn OrganizationsApi,
    email: &str,
    account_name: &str,
    role_name: &str,
    policy: WaitPolicy,
) -> Result<AccountCreation> {
    let accounts = orgs.list_accounts().await?;
    if let Some(account) = accounts
        .into_iter()
        .find(|account| account.email.as_deref() == Some(email))
    {
        tracing::info!(email = %email, account_id = %account.id, "Account already created");
        return Ok(AccountCreation::Existing(account));
    }

    let status = orgs
        .create_gov_cloud_account(email, account_name, role_name)
        .await?;
    tracing::info!(account_name = %account_name, request_id = %status.request_id, state = %status.state, "Requested GovCloud account");

    if !matches!(status.state.as_str(), "IN_PROGRESS" | "SUCCEEDED") {
        return Err(FrameworkError::operation_failed(format!(
            "Account creation for {} was rejected: {}",
            account_name,
            status.failure_reason.as_deref().unwrap_or(&status.state)
        )));
    }

    for attempt in 1..=policy.max_attempts {
        let status = orgs.describe_create_account_status(&status.request_id).await?;
        tracing::debug!(request_id = %status.request_id, state = %status.state, attempt, "Create account status");

        match status.state.as_str() {
            "SUCCEEDED" => {
                let (Some(govcloud_account_id), Some(commercial_account_id)) =
                    (status.govcloud_account_id, status.account_id)
                else {
                    return Err(FrameworkError::operation_failed(format!(
                        "Account creation for {} succeeded without account ids",
                        account_name
                    )));
                };
                tracing::info!(govcloud_account_id = %govcloud_account_id, commercial_account_id = %commercial_account_id, "GovCloud account created");
                return Ok(AccountCreation::Created(GovCloudAccountIds {
                    govcloud_account_id,
                    commercial_account_id,
                }));
            }
            "FAILED" => {
                return Err(FrameworkError::operation_failed(format!(
                    "Account creation failed: {}",
                    status.failure_reason.unwrap_or_else(|| "unknown".to_string())
                )))
            }
            _ => policy.pause().await,
        }
    }

    Err(FrameworkError::Timeout {
        operation: format!("creation of account {}", account_name),
        attempts: policy.max_attempts,
    })
}

/// Invite `account_id` into the organization behind `services` and accept the
/// handshake from inside the account. Returns `false` when it is already a
/// member.
pub async fn invite_account(
    services: &dyn ServiceProvider,
    account_id: &str,
    region: &str,
    role_name: &str,
) -> Result<bool> {
    let orgs = services.organizations(&Scope::region(region)).await?;
    if orgs
        .list_accounts()
        .await?
        .iter()
        .any(|account| account.id == account_id)
    {
        tracing::info!(account_id = %account_id, "Account already part of organization");
        return Ok(false);
    }

    let handshake_id = orgs.invite_account_to_organization(account_id).await?;
    tracing::info!(account_id = %account_id, handshake_id = %handshake_id, "Invited account");

    let member_scope = Scope::account(account_id, region).with_role(role_name);
    let member_orgs = services.organizations(&member_scope).await?;
    member_orgs.accept_handshake(&handshake_id).await?;
    tracing::info!(account_id = %account_id, "Accepted handshake");
    Ok(true)
}
