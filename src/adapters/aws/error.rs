//! AWS SDK error classification.
//!
//! Errors are classified by the service error code (`ProvideErrorMetadata`)
//! rather than by matching on their `Debug` output.

use crate::utils::error::FrameworkError;
use aws_sdk_cloudformation::error::{BuildError, DisplayErrorContext, ProvideErrorMetadata, SdkError};

/// Service error codes meaning the target does not exist.
const NOT_FOUND_CODES: &[&str] = &[
    "StackSetNotFoundException",
    "StackInstanceNotFoundException",
    "OperationNotFoundException",
    "ParameterNotFound",
    "AccountNotFoundException",
    "OrganizationalUnitNotFoundException",
    "ParentNotFoundException",
    "SourceParentNotFoundException",
    "DestinationParentNotFoundException",
    "HandshakeNotFoundException",
    "RepositoryDoesNotExistException",
    "ResourceNotFoundException",
    "StateMachineDoesNotExist",
    "NoSuchBucket",
    "NoSuchKey",
];

/// Service error codes meaning the target is already there.
const ALREADY_EXISTS_CODES: &[&str] = &[
    "AlreadyExistsException",
    "NameAlreadyExistsException",
    "DuplicateOrganizationalUnitException",
    "DuplicateAccountException",
    "AlreadyInOrganizationException",
    "RepositoryNameExistsException",
    "BranchNameExistsException",
    "ParameterAlreadyExists",
    "ResourceConflictException",
    "BucketAlreadyOwnedByYou",
];

/// Classify a service error code and message.
pub fn classify_aws_error(
    service: &'static str,
    operation: &'static str,
    code: Option<&str>,
    message: &str,
) -> FrameworkError {
    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => FrameworkError::NotFound {
            resource_type: service,
            resource_id: message.to_string(),
        },
        Some(c) if ALREADY_EXISTS_CODES.contains(&c) => FrameworkError::AlreadyExists {
            resource_type: service,
            resource_id: message.to_string(),
        },
        // CloudFormation reports both of these as a generic ValidationError.
        Some("ValidationError") if message.contains("does not exist") => FrameworkError::NotFound {
            resource_type: service,
            resource_id: message.to_string(),
        },
        Some("ValidationError") if message.contains("No updates are to be performed") => {
            FrameworkError::NoUpdates {
                stack_name: String::new(),
            }
        }
        _ => FrameworkError::Aws {
            service,
            operation,
            code: code.map(str::to_string),
            message: message.to_string(),
        },
    }
}

/// Convert an SDK operation error into a `FrameworkError`.
pub fn sdk_error<E, R>(service: &'static str, operation: &'static str, error: SdkError<E, R>) -> FrameworkError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let code = error.code().map(str::to_string);
    let message = error
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| DisplayErrorContext(&error).to_string());

    tracing::debug!(service, operation, code = ?code, message = %message, "AWS call failed");
    classify_aws_error(service, operation, code.as_deref(), &message)
}

pub fn build_error(service: &'static str, error: BuildError) -> FrameworkError {
    FrameworkError::operation_failed(format!("Invalid {} request: {}", service, error))
}

/// Required members of SDK shapes come back as `&T`, optional ones as
/// `Option<&T>`; both read the same way here.
pub trait FieldText {
    fn text(self) -> Option<String>;
}

impl<T: AsRef<str> + ?Sized> FieldText for &T {
    fn text(self) -> Option<String> {
        Some(self.as_ref().to_string())
    }
}

impl<T: AsRef<str> + ?Sized> FieldText for Option<&T> {
    fn text(self) -> Option<String> {
        self.map(|value| value.as_ref().to_string())
    }
}

/// Byte payloads, read the same way as [`FieldText`].
pub trait FieldBytes {
    fn bytes(self) -> Option<Vec<u8>>;
}

impl<T: AsRef<[u8]> + ?Sized> FieldBytes for &T {
    fn bytes(self) -> Option<Vec<u8>> {
        Some(self.as_ref().to_vec())
    }
}

impl<T: AsRef<[u8]> + ?Sized> FieldBytes for Option<&T> {
    fn bytes(self) -> Option<Vec<u8>> {
        self.map(|value| value.as_ref().to_vec())
    }
}

pub fn missing_field(service: &'static str, field: &'static str) -> FrameworkError {
    FrameworkError::operation_failed(format!("{} response is missing {}", service, field))
}
