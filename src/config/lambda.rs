use crate::config::settings::FrameworkSettings;
use crate::domain::model::Partition;
use crate::utils::error::{FrameworkError, Result};
use crate::utils::validation::{validate_aws_region, validate_non_empty_string, Validate};
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Which entry point a Lambda deployment of the `lambda` binary serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    // CodePipeline custom actions
    CreateUpdateStack,
    StackSetAction,
    GetSsmParameters,
    CopyCodeCommitRepositoriesToS3,
    UpdateArtifactAcl,
    ExpandS3Sources,
    InitializeOrganizationalUnits,
    SecurityHubInviteMembers,
    // CloudFormation custom resources
    AvmGetOu,
    AvmCreateGovCloudAccount,
    AvmInviteGovCloudAccount,
    AvmMoveAccount,
    ExecuteStateMachine,
    // Step Functions tasks
    VerifyGovCloudApiKeys,
    InitializeOrganization,
    CreateAccounts,
    InviteAccounts,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 17] = [
        HandlerKind::CreateUpdateStack,
        HandlerKind::StackSetAction,
        HandlerKind::GetSsmParameters,
        HandlerKind::CopyCodeCommitRepositoriesToS3,
        HandlerKind::UpdateArtifactAcl,
        HandlerKind::ExpandS3Sources,
        HandlerKind::InitializeOrganizationalUnits,
        HandlerKind::SecurityHubInviteMembers,
        HandlerKind::AvmGetOu,
        HandlerKind::AvmCreateGovCloudAccount,
        HandlerKind::AvmInviteGovCloudAccount,
        HandlerKind::AvmMoveAccount,
        HandlerKind::ExecuteStateMachine,
        HandlerKind::VerifyGovCloudApiKeys,
        HandlerKind::InitializeOrganization,
        HandlerKind::CreateAccounts,
        HandlerKind::InviteAccounts,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HandlerKind::CreateUpdateStack => "create-update-stack",
            HandlerKind::StackSetAction => "stack-set-action",
            HandlerKind::GetSsmParameters => "get-ssm-parameters",
            HandlerKind::CopyCodeCommitRepositoriesToS3 => "copy-codecommit-repositories-to-s3",
            HandlerKind::UpdateArtifactAcl => "update-artifact-acl",
            HandlerKind::ExpandS3Sources => "expand-s3-sources",
            HandlerKind::InitializeOrganizationalUnits => "initialize-organizational-units",
            HandlerKind::SecurityHubInviteMembers => "security-hub-invite-members",
            HandlerKind::AvmGetOu => "avm-get-ou",
            HandlerKind::AvmCreateGovCloudAccount => "avm-create-govcloud-account",
            HandlerKind::AvmInviteGovCloudAccount => "avm-invite-govcloud-account",
            HandlerKind::AvmMoveAccount => "avm-move-account",
            HandlerKind::ExecuteStateMachine => "execute-state-machine",
            HandlerKind::VerifyGovCloudApiKeys => "verify-govcloud-api-keys",
            HandlerKind::InitializeOrganization => "initialize-organization",
            HandlerKind::CreateAccounts => "create-accounts",
            HandlerKind::InviteAccounts => "invite-accounts",
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = FrameworkError;

    fn from_str(s: &str) -> Result<Self> {
        HandlerKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| FrameworkError::InvalidConfigValueError {
                field: "FRAMEWORK_HANDLER".to_string(),
                value: s.to_string(),
                reason: "Unknown handler".to_string(),
            })
    }
}

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub handler: HandlerKind,
    pub region: String,
    pub state_machine_arn: Option<String>,
    pub settings_path: Option<PathBuf>,
}

impl LambdaConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any variable source; `from_env` reads the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let handler = lookup("FRAMEWORK_HANDLER")
            .ok_or_else(|| FrameworkError::MissingConfigError {
                field: "FRAMEWORK_HANDLER".to_string(),
            })?
            .parse()?;

        Ok(Self {
            handler,
            region: lookup("AWS_REGION").unwrap_or_else(|| "us-gov-west-1".to_string()),
            state_machine_arn: lookup("STATE_MACHINE_ARN").filter(|arn| !arn.is_empty()),
            settings_path: lookup("FRAMEWORK_SETTINGS")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        })
    }

    pub fn partition(&self) -> Partition {
        Partition::from_region(&self.region)
    }

    pub fn load_settings(&self) -> Result<FrameworkSettings> {
        let settings = FrameworkSettings::load(self.settings_path.as_deref())?;
        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for LambdaConfig {
    fn validate(&self) -> Result<()> {
        validate_aws_region("AWS_REGION", &self.region)?;

        if self.handler == HandlerKind::ExecuteStateMachine {
            let arn = self.state_machine_arn.as_deref().ok_or_else(|| {
                FrameworkError::MissingConfigError {
                    field: "STATE_MACHINE_ARN".to_string(),
                }
            })?;
            validate_non_empty_string("STATE_MACHINE_ARN", arn)?;
        }

        tracing::info!(handler = %self.handler, "Lambda configuration validation passed");
        Ok(())
    }
}
