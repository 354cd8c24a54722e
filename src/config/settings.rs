use crate::utils::error::{FrameworkError, Result};
use crate::utils::validation::{
    validate_aws_region, validate_non_empty_string, validate_range, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameworkSettings {
    pub roles: RoleSettings,
    pub regions: RegionSettings,
    pub ssm: SsmPaths,
    pub waits: WaitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoleSettings {
    pub account_access: String,
    pub security_hub_access: String,
    pub session_name: String,
}

impl Default for RoleSettings {
    fn default() -> Self {
        Self {
            account_access: "CompliantFrameworkAccountAccessRole".to_string(),
            security_hub_access: "SecurityHubAccessRole".to_string(),
            session_name: "CompliantFramework".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSettings {
    pub primary: String,
    pub secondary: String,
    pub govcloud: String,
}

impl Default for RegionSettings {
    fn default() -> Self {
        Self {
            primary: "us-gov-west-1".to_string(),
            secondary: "us-gov-east-1".to_string(),
            govcloud: "us-gov-west-1".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SsmPaths {
    pub govcloud_access_key_id: String,
    pub govcloud_secret_access_key: String,
    pub govcloud_central_account_id: String,
    pub avm_access_key_id: String,
    pub avm_secret_access_key: String,
    pub organization_id: String,
    pub accounts_prefix: String,
}

impl Default for SsmPaths {
    fn default() -> Self {
        Self {
            govcloud_access_key_id: "/compliant/framework/central/aws-us-gov/access-key-id"
                .to_string(),
            govcloud_secret_access_key:
                "/compliant/framework/central/aws-us-gov/secret-access-key".to_string(),
            govcloud_central_account_id: "/compliant/framework/central/aws-us-gov/id".to_string(),
            avm_access_key_id: "/compliant/framework/central-avm/aws-us-gov/access-key-id"
                .to_string(),
            avm_secret_access_key:
                "/compliant/framework/central-avm/aws-us-gov/secret-access-key".to_string(),
            organization_id: "/compliant/framework/organization/id".to_string(),
            accounts_prefix: "/compliant/framework/accounts".to_string(),
        }
    }
}

impl SsmPaths {
    /// `/compliant/framework/accounts/{environment}/{name}/{partition}/id`
    pub fn account_id(&self, environment: &str, name: &str, partition: &str) -> String {
        format!(
            "{}/{}/{}/{}/id",
            self.accounts_prefix, environment, name, partition
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitPolicy {
    pub delay_seconds: u64,
    pub max_attempts: u32,
}

impl WaitPolicy {
    pub const fn new(delay_seconds: u64, max_attempts: u32) -> Self {
        Self {
            delay_seconds,
            max_attempts,
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_seconds)
    }

    pub async fn pause(&self) {
        if self.delay_seconds > 0 {
            tokio::time::sleep(self.delay()).await;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitSettings {
    pub stack_delete: WaitPolicy,
    pub stack_set_operation: WaitPolicy,
    pub govcloud_account: WaitPolicy,
    pub installer_account: WaitPolicy,
    pub pipeline: WaitPolicy,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            stack_delete: WaitPolicy::new(30, 20),
            stack_set_operation: WaitPolicy::new(2, 1800),
            govcloud_account: WaitPolicy::new(30, 10),
            installer_account: WaitPolicy::new(20, 10),
            pipeline: WaitPolicy::new(60, 60),
        }
    }
}

impl FrameworkSettings {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(FrameworkError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${LOGGING_ACCOUNT_ID})
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| FrameworkError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

impl Validate for FrameworkSettings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("roles.account_access", &self.roles.account_access)?;
        validate_non_empty_string("roles.security_hub_access", &self.roles.security_hub_access)?;
        validate_non_empty_string("roles.session_name", &self.roles.session_name)?;

        validate_aws_region("regions.primary", &self.regions.primary)?;
        validate_aws_region("regions.secondary", &self.regions.secondary)?;
        validate_aws_region("regions.govcloud", &self.regions.govcloud)?;

        for (field, policy) in [
            ("waits.stack_delete", &self.waits.stack_delete),
            ("waits.stack_set_operation", &self.waits.stack_set_operation),
            ("waits.govcloud_account", &self.waits.govcloud_account),
            ("waits.installer_account", &self.waits.installer_account),
            ("waits.pipeline", &self.waits.pipeline),
        ] {
            validate_range(field, policy.max_attempts, 1, 100_000)?;
        }

        tracing::debug!("Framework settings validation passed");
        Ok(())
    }
}
