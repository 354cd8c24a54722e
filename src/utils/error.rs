use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameworkError {
    #[error("{service} {operation} failed: {message}")]
    Aws {
        service: &'static str,
        operation: &'static str,
        code: Option<String>,
        message: String,
    },

    #[error("{resource_type} not found: {resource_id}")]
    NotFound {
        resource_type: &'static str,
        resource_id: String,
    },

    #[error("{resource_type} already exists: {resource_id}")]
    AlreadyExists {
        resource_type: &'static str,
        resource_id: String,
    },

    #[error("No updates are to be performed on stack {stack_name}")]
    NoUpdates { stack_name: String },

    #[error("Invalid event: {message}")]
    InvalidEvent { message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{message}")]
    OperationFailed { message: String },

    #[error("Timed out waiting for {operation} after {attempts} attempts")]
    Timeout { operation: String, attempts: u32 },

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, FrameworkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Aws,
    Configuration,
    Input,
    Operation,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl FrameworkError {
    pub fn not_found(resource_type: &'static str, resource_id: impl Into<String>) -> Self {
        Self::NotFound {
            resource_type,
            resource_id: resource_id.into(),
        }
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent {
            message: message.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Aws { .. }
            | Self::NotFound { .. }
            | Self::AlreadyExists { .. }
            | Self::NoUpdates { .. } => ErrorCategory::Aws,
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => ErrorCategory::Configuration,
            Self::InvalidEvent { .. } | Self::SerializationError(_) => ErrorCategory::Input,
            Self::OperationFailed { .. } | Self::Timeout { .. } => ErrorCategory::Operation,
            Self::HttpError(_) | Self::ZipError(_) | Self::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NotFound { .. } | Self::AlreadyExists { .. } | Self::NoUpdates { .. } => {
                ErrorSeverity::Low
            }
            Self::Timeout { .. } | Self::HttpError(_) => ErrorSeverity::Medium,
            Self::IoError(_) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            Self::Aws { code: Some(code), .. } if code.contains("AccessDenied") => {
                "Check that the caller can assume the framework access role in the target account"
                    .to_string()
            }
            Self::Aws { .. } => "Check AWS credentials, region and service quotas".to_string(),
            Self::NotFound { resource_type, .. } => {
                format!("Verify that the {} exists in the target account and region", resource_type)
            }
            Self::AlreadyExists { .. } => "The resource is already in place, nothing to do".to_string(),
            Self::NoUpdates { .. } => "The stack already matches the requested template".to_string(),
            Self::InvalidEvent { .. } | Self::SerializationError(_) => {
                "Check the action's UserParameters and the invoking event payload".to_string()
            }
            Self::ConfigError { .. }
            | Self::MissingConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_) => "Review the command-line flags and the settings file".to_string(),
            Self::OperationFailed { .. } => {
                "Inspect the CloudFormation events of the failed stack or StackSet".to_string()
            }
            Self::Timeout { .. } => "Re-run the command once the in-flight operation settles".to_string(),
            Self::HttpError(_) => "Check network access to the response endpoint".to_string(),
            Self::ZipError(_) => "Verify the source artifact is a valid zip archive".to_string(),
            Self::IoError(_) => "Check file paths and permissions".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Aws {
                service, operation, ..
            } => format!("AWS call {}:{} failed: {}", service, operation, self),
            Self::Timeout { operation, .. } => format!("Gave up waiting for {}", operation),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_drives_exit_code_buckets() {
        let timeout = FrameworkError::Timeout {
            operation: "pipeline core-pipeline".to_string(),
            attempts: 60,
        };
        assert_eq!(timeout.severity(), ErrorSeverity::Medium);
        assert_eq!(timeout.category(), ErrorCategory::Operation);

        let missing = FrameworkError::not_found("stack set", "federation-stackset");
        assert!(missing.is_not_found());
        assert_eq!(missing.severity(), ErrorSeverity::Low);
    }

    #[test]
    fn test_aws_error_message_includes_operation() {
        let err = FrameworkError::Aws {
            service: "cloudformation",
            operation: "CreateStack",
            code: Some("AccessDenied".to_string()),
            message: "not authorized".to_string(),
        };
        assert_eq!(err.to_string(), "cloudformation CreateStack failed: not authorized");
        assert!(err.recovery_suggestion().contains("assume"));
    }
}
