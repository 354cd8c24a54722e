use super::error::{sdk_error, FieldText};
use crate::domain::model::{SecurityHubInvitation, SecurityHubMember};
use crate::domain::ports::SecurityHubApi;
use crate::utils::error::Result;
use async_trait::async_trait;
use aws_sdk_securityhub::types::AccountDetails;
use aws_sdk_securityhub::Client;

const SERVICE: &str = "SecurityHub";

pub struct SecurityHubClient {
    client: Client,
}

impl SecurityHubClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecurityHubApi for SecurityHubClient {
    async fn list_members(&self) -> Result<Vec<SecurityHubMember>> {
        let mut members = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_members()
                .only_associated(false)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListMembers", e))?;

            members.extend(output.members().iter().filter_map(|member| {
                Some(SecurityHubMember {
                    account_id: member.account_id().text()?,
                    master_id: member.administrator_id().text(),
                    member_status: member.member_status().text(),
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(members)
    }

    async fn create_members(&self, account_ids: &[String]) -> Result<()> {
        let details = account_ids
            .iter()
            .map(|id| AccountDetails::builder().account_id(id).build())
            .collect::<Vec<_>>();

        self.client
            .create_members()
            .set_account_details(Some(details))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "CreateMembers", e))?;
        Ok(())
    }

    async fn invite_members(&self, account_ids: &[String]) -> Result<()> {
        self.client
            .invite_members()
            .set_account_ids(Some(account_ids.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "InviteMembers", e))?;
        Ok(())
    }

    async fn list_invitations(&self) -> Result<Vec<SecurityHubInvitation>> {
        let mut invitations = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_invitations()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| sdk_error(SERVICE, "ListInvitations", e))?;

            invitations.extend(output.invitations().iter().filter_map(|invitation| {
                Some(SecurityHubInvitation {
                    account_id: invitation.account_id().text()?,
                    invitation_id: invitation.invitation_id().text()?,
                })
            }));

            match output.next_token() {
                Some(token) => next_token = Some(token.to_string()),
                None => break,
            }
        }

        Ok(invitations)
    }

    async fn accept_invitation(&self, master_id: &str, invitation_id: &str) -> Result<()> {
        self.client
            .accept_administrator_invitation()
            .administrator_id(master_id)
            .invitation_id(invitation_id)
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "AcceptAdministratorInvitation", e))?;
        Ok(())
    }

    async fn delete_members(&self, account_ids: &[String]) -> Result<()> {
        self.client
            .delete_members()
            .set_account_ids(Some(account_ids.to_vec()))
            .send()
            .await
            .map_err(|e| sdk_error(SERVICE, "DeleteMembers", e))?;
        Ok(())
    }
}
