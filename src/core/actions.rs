//! Short-lived CodePipeline custom actions that finish in one invocation.

use crate::config::settings::FrameworkSettings;
use crate::core::job::{Job, PipelineAction};
use crate::core::organization::{ensure_ou, move_account_if_present, root_id};
use crate::domain::model::JobOutcome;
use crate::domain::ports::{OrganizationsApi, Scope, SecurityHubApi, ServiceProvider, SsmApi};
use crate::utils::error::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Deserialize)]
pub struct SsmOutputItem {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "OutputVariable")]
    pub output_variable: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetSsmParametersParams {
    #[serde(rename = "Items")]
    pub items: Vec<SsmOutputItem>,
}

pub async fn read_output_variables(
    ssm: &dyn SsmApi,
    items: &[SsmOutputItem],
) -> Result<BTreeMap<String, String>> {
    let mut output_variables = BTreeMap::new();
    for item in items {
        let value = ssm.get_parameter(&item.name, false).await?;
        output_variables.insert(item.output_variable.clone(), value);
    }
    Ok(output_variables)
}

/// `get-ssm-parameters`: expose SSM parameter values as pipeline variables.
pub struct GetSsmParametersAction<'a> {
    pub services: &'a dyn ServiceProvider,
}

#[async_trait]
impl PipelineAction for GetSsmParametersAction<'_> {
    fn name(&self) -> &'static str {
        "get-ssm-parameters"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: GetSsmParametersParams = job.user_parameters()?;
        let ssm = self.services.ssm(&Scope::current()).await?;

        let output_variables = read_output_variables(ssm.as_ref(), &params.items).await?;
        tracing::info!(variables = ?output_variables.keys().collect::<Vec<_>>(), "Resolved output variables");
        Ok(JobOutcome::Succeeded { output_variables })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalUnitsParams {
    pub ou_name: String,
    #[serde(default)]
    pub core_accounts: Vec<String>,
    #[serde(default)]
    pub tenant_accounts: Vec<String>,
}

/// Ids of the environment OU and its tenants OU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentOus {
    pub environment_ou_id: String,
    pub tenant_ou_id: String,
}

/// Ensure `{ou}` under the root and `{ou}-tenants` under it, then move the
/// core and tenant accounts out of the root into them.
pub async fn initialize_organizational_units(
    orgs: &dyn OrganizationsApi,
    params: &OrganizationalUnitsParams,
) -> Result<EnvironmentOus> {
    let root = root_id(orgs).await?;
    let environment_ou_id = ensure_ou(orgs, &root, &params.ou_name).await?;
    let tenant_ou_id =
        ensure_ou(orgs, &environment_ou_id, &format!("{}-tenants", params.ou_name)).await?;

    for account_id in &params.core_accounts {
        move_account_if_present(orgs, account_id, &root, &environment_ou_id).await?;
    }
    for account_id in &params.tenant_accounts {
        move_account_if_present(orgs, account_id, &root, &tenant_ou_id).await?;
    }

    Ok(EnvironmentOus {
        environment_ou_id,
        tenant_ou_id,
    })
}

pub struct InitializeOrganizationalUnitsAction<'a> {
    pub services: &'a dyn ServiceProvider,
}

#[async_trait]
impl PipelineAction for InitializeOrganizationalUnitsAction<'_> {
    fn name(&self) -> &'static str {
        "initialize-organizational-units"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: OrganizationalUnitsParams = job.user_parameters()?;
        let orgs = self.services.organizations(&Scope::current()).await?;

        let ous = initialize_organizational_units(orgs.as_ref(), &params).await?;
        tracing::info!(environment_ou_id = %ous.environment_ou_id, tenant_ou_id = %ous.tenant_ou_id, "Organizational units ready");
        Ok(JobOutcome::succeeded())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityHubInviteParams {
    pub region: String,
    pub account_ids: Vec<String>,
}

/// Create and invite the accounts that are not members yet. Returns the
/// accounts that were invited.
pub async fn invite_missing_members(
    securityhub: &dyn SecurityHubApi,
    account_ids: &[String],
) -> Result<Vec<String>> {
    let members = securityhub.list_members().await?;
    let to_invite: Vec<String> = account_ids
        .iter()
        .filter(|account_id| !members.iter().any(|member| &member.account_id == *account_id))
        .cloned()
        .collect();

    if !to_invite.is_empty() {
        tracing::info!(accounts = ?to_invite, "Inviting Security Hub members");
        securityhub.create_members(&to_invite).await?;
        securityhub.invite_members(&to_invite).await?;
    }
    Ok(to_invite)
}

/// `security-hub-invite-members`: invite new members, then accept every
/// outstanding invitation from inside the member account.
pub struct SecurityHubInviteMembersAction<'a> {
    pub services: &'a dyn ServiceProvider,
    pub settings: &'a FrameworkSettings,
}

#[async_trait]
impl PipelineAction for SecurityHubInviteMembersAction<'_> {
    fn name(&self) -> &'static str {
        "security-hub-invite-members"
    }

    async fn execute(&self, job: &Job) -> Result<JobOutcome> {
        let params: SecurityHubInviteParams = job.user_parameters()?;
        let securityhub = self.services.securityhub(&Scope::region(&params.region)).await?;

        invite_missing_members(securityhub.as_ref(), &params.account_ids).await?;

        for member in securityhub.list_members().await? {
            if member.member_status.as_deref() != Some("Invited") {
                continue;
            }
            let Some(master_id) = member.master_id.as_deref() else {
                continue;
            };
            tracing::info!(account_id = %member.account_id, "Need to accept invite");

            let scope = Scope::account(&member.account_id, &params.region)
                .with_role(&self.settings.roles.security_hub_access);
            let member_hub = self.services.securityhub(&scope).await?;

            let invitation = member_hub
                .list_invitations()
                .await?
                .into_iter()
                .find(|invitation| invitation.account_id == master_id);
            if let Some(invitation) = invitation {
                member_hub
                    .accept_invitation(master_id, &invitation.invitation_id)
                    .await?;
                tracing::info!(account_id = %member.account_id, master_id = %master_id, "Accepted invitation");
            }
        }

        Ok(JobOutcome::succeeded())
    }
}
