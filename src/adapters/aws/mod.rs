//! AWS SDK implementations of the service ports.
//!
//! `AwsServiceProvider` loads the shared SDK configuration once and derives a
//! per-scope configuration for every client it hands out: the region is
//! overridden when the scope names one, and credentials come from STS
//! `AssumeRole` when the scope targets an account other than the caller's.

mod cloudformation;
mod codecommit;
mod codepipeline;
pub mod error;
mod logs;
mod organizations;
mod s3;
mod securityhub;
mod sfn;
mod ssm;

pub use cloudformation::CloudFormationClient;
pub use codecommit::CodeCommitClient;
pub use codepipeline::CodePipelineClient;
pub use logs::LogsClient;
pub use organizations::OrganizationsClient;
pub use s3::S3Client;
pub use securityhub::SecurityHubClient;
pub use sfn::StepFunctionsClient;
pub use ssm::SsmClient;

use crate::config::settings::RoleSettings;
use crate::domain::model::Partition;
use crate::domain::ports::{
    CloudFormationApi, CodeCommitApi, CodePipelineApi, LogsApi, OrganizationsApi, S3Api, Scope,
    SecurityHubApi, ServiceProvider, SsmApi, StepFunctionsApi,
};
use crate::utils::error::{FrameworkError, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::SharedCredentialsProvider;
use aws_credential_types::Credentials;
use error::{missing_field, sdk_error, FieldText};
use std::sync::Arc;
use std::time::SystemTime;
use tokio::sync::OnceCell;

#[derive(Clone)]
pub struct AwsServiceProvider {
    config: Arc<SdkConfig>,
    roles: RoleSettings,
    caller_account_id: Arc<OnceCell<String>>,
}

impl AwsServiceProvider {
    /// Load the default credential chain and region.
    pub async fn load(roles: RoleSettings) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::from_config(config, roles)
    }

    /// Load the default credential chain pinned to `region`.
    pub async fn load_in_region(region: &str, roles: RoleSettings) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_config(config, roles)
    }

    pub fn from_config(config: SdkConfig, roles: RoleSettings) -> Self {
        Self {
            config: Arc::new(config),
            roles,
            caller_account_id: Arc::new(OnceCell::new()),
        }
    }

    pub fn region(&self) -> Option<&str> {
        self.config.region().map(|region| region.as_ref())
    }

    async fn assume_role(&self, role_arn: &str) -> Result<Credentials> {
        tracing::debug!(role_arn = %role_arn, "Assuming role");
        let sts = aws_sdk_sts::Client::new(&self.config);
        let output = sts
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(&self.roles.session_name)
            .send()
            .await
            .map_err(|e| sdk_error("STS", "AssumeRole", e))?;

        let credentials = output
            .credentials()
            .ok_or_else(|| missing_field("STS", "Credentials"))?;
        let expiration = SystemTime::try_from(credentials.expiration().clone()).ok();

        Ok(Credentials::new(
            credentials.access_key_id(),
            credentials.secret_access_key(),
            Some(credentials.session_token().to_string()),
            expiration,
            "AssumeRole",
        ))
    }

    /// SDK configuration for `scope`.
    async fn config_for(&self, scope: &Scope) -> Result<SdkConfig> {
        let mut builder = self.config.to_builder();

        if let Some(region) = &scope.region {
            builder = builder.region(Region::new(region.clone()));
        }

        if let Some(account_id) = &scope.account_id {
            if *account_id != self.caller_account_id().await? {
                let partition = scope
                    .region
                    .as_deref()
                    .or(self.region())
                    .map(Partition::from_region)
                    .unwrap_or_else(|| self.partition());
                let role_name = scope
                    .role_name
                    .as_deref()
                    .unwrap_or(&self.roles.account_access);
                let credentials = self
                    .assume_role(&partition.role_arn(account_id, role_name))
                    .await?;
                builder = builder.credentials_provider(SharedCredentialsProvider::new(credentials));
            }
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl ServiceProvider for AwsServiceProvider {
    fn partition(&self) -> Partition {
        self.region()
            .map(Partition::from_region)
            .unwrap_or(Partition::Commercial)
    }

    async fn caller_account_id(&self) -> Result<String> {
        self.caller_account_id
            .get_or_try_init(|| async {
                let sts = aws_sdk_sts::Client::new(&self.config);
                let identity = sts
                    .get_caller_identity()
                    .send()
                    .await
                    .map_err(|e| sdk_error("STS", "GetCallerIdentity", e))?;
                identity
                    .account()
                    .text()
                    .ok_or_else(|| missing_field("STS", "Account"))
            })
            .await
            .cloned()
    }

    async fn with_access_keys(
        &self,
        access_key_id: &str,
        secret_access_key: &str,
        region: &str,
    ) -> Result<Box<dyn ServiceProvider>> {
        if access_key_id.is_empty() || secret_access_key.is_empty() {
            return Err(FrameworkError::ConfigError {
                message: "Static access keys must not be empty".to_string(),
            });
        }

        let credentials = Credentials::new(
            access_key_id,
            secret_access_key,
            None,
            None,
            "FrameworkAccessKeys",
        );
        let config = self
            .config
            .to_builder()
            .region(Region::new(region.to_string()))
            .credentials_provider(SharedCredentialsProvider::new(credentials))
            .build();

        Ok(Box::new(Self::from_config(config, self.roles.clone())))
    }

    async fn cloudformation(&self, scope: &Scope) -> Result<Box<dyn CloudFormationApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(CloudFormationClient::new(
            aws_sdk_cloudformation::Client::new(&config),
        )))
    }

    async fn organizations(&self, scope: &Scope) -> Result<Box<dyn OrganizationsApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(OrganizationsClient::new(
            aws_sdk_organizations::Client::new(&config),
        )))
    }

    async fn ssm(&self, scope: &Scope) -> Result<Box<dyn SsmApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(SsmClient::new(aws_sdk_ssm::Client::new(&config))))
    }

    async fn codepipeline(&self, scope: &Scope) -> Result<Box<dyn CodePipelineApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(CodePipelineClient::new(
            aws_sdk_codepipeline::Client::new(&config),
        )))
    }

    async fn s3(&self, scope: &Scope) -> Result<Box<dyn S3Api>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(S3Client::new(aws_sdk_s3::Client::new(&config))))
    }

    async fn codecommit(&self, scope: &Scope) -> Result<Box<dyn CodeCommitApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(CodeCommitClient::new(
            aws_sdk_codecommit::Client::new(&config),
        )))
    }

    async fn securityhub(&self, scope: &Scope) -> Result<Box<dyn SecurityHubApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(SecurityHubClient::new(
            aws_sdk_securityhub::Client::new(&config),
        )))
    }

    async fn logs(&self, scope: &Scope) -> Result<Box<dyn LogsApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(LogsClient::new(aws_sdk_cloudwatchlogs::Client::new(
            &config,
        ))))
    }

    async fn step_functions(&self, scope: &Scope) -> Result<Box<dyn StepFunctionsApi>> {
        let config = self.config_for(scope).await?;
        Ok(Box::new(StepFunctionsClient::new(aws_sdk_sfn::Client::new(
            &config,
        ))))
    }
}
