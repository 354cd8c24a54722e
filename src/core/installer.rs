//! Installer state machine tasks.
//!
//! Each task takes the state input and returns `{}`; Step Functions treats a
//! returned error as a failed state.

use crate::config::settings::FrameworkSettings;
use crate::core::organization::{
    create_govcloud_account, ensure_organization, govcloud_services, invite_account,
    AccountCreation,
};
use crate::domain::model::Partition;
use crate::domain::ports::{Scope, ServiceProvider};
use crate::utils::error::Result;
use serde::Deserialize;

pub const GOVCLOUD_ACCOUNTS_OU: &str = "govcloud-accounts";
pub const CORE_ACCOUNTS_OU: &str = "core-accounts";

/// Accounts the installer vends, as `(environment, name)`.
pub const INSTALLER_ACCOUNTS: [(&str, &str); 3] = [
    ("core", "logging"),
    ("prod", "management-services"),
    ("prod", "transit"),
];

/// Fails when any of the GovCloud central parameters is missing.
pub async fn verify_govcloud_api_keys(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
) -> Result<()> {
    let ssm = services.ssm(&Scope::current()).await?;
    ssm.get_parameter(&settings.ssm.govcloud_central_account_id, false)
        .await?;
    ssm.get_parameter(&settings.ssm.govcloud_access_key_id, false)
        .await?;
    ssm.get_parameter(&settings.ssm.govcloud_secret_access_key, true)
        .await?;
    tracing::info!("GovCloud API keys present");
    Ok(())
}

async fn central_govcloud_services(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
) -> Result<Box<dyn ServiceProvider>> {
    govcloud_services(
        services,
        &settings.ssm.govcloud_access_key_id,
        &settings.ssm.govcloud_secret_access_key,
        &settings.regions.govcloud,
    )
    .await
}

/// Ensure both organizations exist with their account OUs, and record the
/// GovCloud organization id in GovCloud SSM.
pub async fn initialize_organization(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
) -> Result<String> {
    let govcloud = central_govcloud_services(services, settings).await?;
    let govcloud_scope = Scope::region(&settings.regions.govcloud);

    tracing::info!("Initialize Commercial Organization");
    let commercial_orgs = services.organizations(&Scope::current()).await?;
    ensure_organization(commercial_orgs.as_ref(), GOVCLOUD_ACCOUNTS_OU).await?;

    tracing::info!("Initialize GovCloud Organization");
    let govcloud_orgs = govcloud.organizations(&govcloud_scope).await?;
    let organization_id = ensure_organization(govcloud_orgs.as_ref(), CORE_ACCOUNTS_OU).await?;

    let govcloud_ssm = govcloud.ssm(&govcloud_scope).await?;
    govcloud_ssm
        .put_parameter(&settings.ssm.organization_id, &organization_id)
        .await?;
    tracing::info!(organization_id = %organization_id, "Recorded GovCloud organization id");
    Ok(organization_id)
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAccountsInput {
    pub logging_account_email: String,
    pub management_services_account_email: String,
    pub transit_account_email: String,
}

impl CreateAccountsInput {
    fn email_for(&self, name: &str) -> &str {
        match name {
            "logging" => &self.logging_account_email,
            "management-services" => &self.management_services_account_email,
            _ => &self.transit_account_email,
        }
    }
}

/// Create the logging, management-services and transit accounts and record
/// both partition ids of each in SSM. Accounts that already exist are left
/// alone.
pub async fn create_accounts(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
    input: &CreateAccountsInput,
) -> Result<()> {
    let scope = Scope::current();
    let orgs = services.organizations(&scope).await?;
    let ssm = services.ssm(&scope).await?;

    for (environment, name) in INSTALLER_ACCOUNTS {
        let account_name = format!("{}-{}", environment, name);
        let creation = create_govcloud_account(
            orgs.as_ref(),
            input.email_for(name),
            &account_name,
            &settings.roles.account_access,
            settings.waits.installer_account,
        )
        .await?;

        let AccountCreation::Created(ids) = creation else {
            tracing::info!(account_name = %account_name, "Account already created");
            continue;
        };

        ssm.put_parameter(
            &settings
                .ssm
                .account_id(environment, name, Partition::Commercial.as_str()),
            &ids.commercial_account_id,
        )
        .await?;
        ssm.put_parameter(
            &settings
                .ssm
                .account_id(environment, name, Partition::GovCloud.as_str()),
            &ids.govcloud_account_id,
        )
        .await?;
    }

    Ok(())
}

/// Invite the vended GovCloud accounts into the GovCloud organization.
pub async fn invite_accounts(
    services: &dyn ServiceProvider,
    settings: &FrameworkSettings,
) -> Result<()> {
    let ssm = services.ssm(&Scope::current()).await?;
    let govcloud = central_govcloud_services(services, settings).await?;

    for (environment, name) in INSTALLER_ACCOUNTS {
        let path = settings
            .ssm
            .account_id(environment, name, Partition::GovCloud.as_str());
        let account_id = ssm.get_parameter(&path, false).await?;

        invite_account(
            govcloud.as_ref(),
            &account_id,
            &settings.regions.govcloud,
            &settings.roles.account_access,
        )
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_accounts_input() {
        let input: CreateAccountsInput = serde_json::from_value(json!({
            "LoggingAccountEmail": "logging@example.com",
            "ManagementServicesAccountEmail": "ms@example.com",
            "TransitAccountEmail": "transit@example.com"
        }))
        .unwrap();

        assert_eq!(input.email_for("logging"), "logging@example.com");
        assert_eq!(input.email_for("management-services"), "ms@example.com");
        assert_eq!(input.email_for("transit"), "transit@example.com");
    }
}
