use super::error::{build_error, missing_field, sdk_error, FieldText};
use crate::domain::model::{Account, CreateAccountStatus, Organization, OrganizationalUnit};
use crate::domain::ports::OrganizationsApi;
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use aws_sdk_organizations::types::{HandshakeParty, HandshakePartyType, OrganizationFeatureSet};
use aws_sdk_organizations::Client;

const SERVICE: &str = "Organizations";

pub struct OrganizationsClient {
    client: Client,
}

impl OrganizationsClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn account_status(status: &aws_sdk_organizations::types::CreateAccountStatus) -> Result<CreateAccountStatus> {
    Ok(CreateAccountStatus {
        request_id: status
            .id()
            .text()
            .ok_or_else(|| missing_field(SERVICE, "CreateAccountStatus.Id"))?,
        state: status.state().text().unwrap_or_default(),
        account_id: status.account_id().text(),
        govcloud_account_id: status.gov_cloud_account_id().text(),
        failure_reason: status.failure_reason().text(),
    })
}

#[async_trait]
impl OrganizationsApi for OrganizationsClient {
    async fn list_roots(&self) -> Result<Vec<String>> {
        let mut roots = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_roots()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListRoots", e))?;

            roots.extend(output.roots().iter().filter_map(|root| root.id().text()));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(roots)
    }

    async fn list_organizational_units_for_parent(
        &self,
        parent_id: &str,
    ) -> Result<Vec<OrganizationalUnit>> {
        let mut units = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_organizational_units_for_parent()
                .parent_id(parent_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListOrganizationalUnitsForParent", e))?;

            units.extend(output.organizational_units().iter().filter_map(|ou| {
                Some(OrganizationalUnit {
                    id: ou.id().text()?,
                    name: ou.name().text().unwrap_or_default(),
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(units)
    }

    async fn create_organizational_unit(
        &self,
        parent_id: &str,
        name: &str,
    ) -> Result<OrganizationalUnit> {
        let output = self
            .client
            .create_organizational_unit()
            .parent_id(parent_id)
            .name(name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateOrganizationalUnit", e))?;

        let ou = output
            .organizational_unit()
            .ok_or_else(|| missing_field(SERVICE, "OrganizationalUnit"))?;
        Ok(OrganizationalUnit {
            id: ou
                .id()
                .text()
                .ok_or_else(|| missing_field(SERVICE, "OrganizationalUnit.Id"))?,
            name: ou.name().text().unwrap_or_else(|| name.to_string()),
        })
    }

    async fn move_account(
        &self,
        account_id: &str,
        source_parent_id: &str,
        destination_parent_id: &str,
    ) -> Result<()> {
        self.client
            .move_account()
            .account_id(account_id)
            .source_parent_id(source_parent_id)
            .destination_parent_id(destination_parent_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "MoveAccount", e))?;
        Ok(())
    }

    async fn describe_organization(&self) -> Result<Option<Organization>> {
        match self.client.describe_organization().send().await {
            Ok(output) => Ok(output
                .organization()
                .and_then(|org| org.id().text())
                .map(|id| Organization { id })),
            Err(e) => {
                let err = sdk_error(SERVICE, "DescribeOrganization", e);
                match &err {
                    FrameworkError::Aws { code, .. }
                        if code.as_deref() == Some("AWSOrganizationsNotInUseException") =>
                    {
                        Ok(None)
                    }
                    _ => Err(err),
                }
            }
        }
    }

    async fn create_organization(&self) -> Result<Organization> {
        let output = self
            .client
            .create_organization()
            .feature_set(OrganizationFeatureSet::All)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateOrganization", e))?;

        output
            .organization()
            .and_then(|org| org.id().text())
            .map(|id| Organization { id })
            .ok_or_else(|| missing_field(SERVICE, "Organization.Id"))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let mut accounts = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_accounts()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListAccounts", e))?;

            accounts.extend(output.accounts().iter().filter_map(|account| {
                Some(Account {
                    id: account.id().text()?,
                    name: account.name().text(),
                    email: account.email().text(),
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(accounts)
    }

    async fn create_gov_cloud_account(
        &self,
        email: &str,
        account_name: &str,
        role_name: &str,
    ) -> Result<CreateAccountStatus> {
        let output = self
            .client
            .create_gov_cloud_account()
            .email(email)
            .account_name(account_name)
            .role_name(role_name)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateGovCloudAccount", e))?;

        account_status(
            output
                .create_account_status()
                .ok_or_else(|| missing_field(SERVICE, "CreateAccountStatus"))?,
        )
    }

    async fn describe_create_account_status(
        &self,
        request_id: &str,
    ) -> Result<CreateAccountStatus> {
        let output = self
            .client
            .describe_create_account_status()
            .create_account_request_id(request_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DescribeCreateAccountStatus", e))?;

        account_status(
            output
                .create_account_status()
                .ok_or_else(|| missing_field(SERVICE, "CreateAccountStatus"))?,
        )
    }

    async fn invite_account_to_organization(&self, account_id: &str) -> Result<String> {
        let target = HandshakeParty::builder()
            .id(account_id)
            .r#type(HandshakePartyType::Account)
            .build()
            .map_err(|e| build_error(SERVICE, e))?;

        let output = self
            .client
            .invite_account_to_organization()
            .target(target)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "InviteAccountToOrganization", e))?;

        output
            .handshake()
            .and_then(|handshake| handshake.id().text())
            .ok_or_else(|| missing_field(SERVICE, "Handshake.Id"))
    }

    async fn accept_handshake(&self, handshake_id: &str) -> Result<()> {
        self.client
            .accept_handshake()
            .handshake_id(handshake_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "AcceptHandshake", e))?;
        Ok(())
    }
}
