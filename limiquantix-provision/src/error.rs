//! Error types for the provisioning configuration layer.

use thiserror::Error;

/// Failure reported by a backend SDK call.
///
/// Both API generations report their failures through this type so the
/// strategies can wrap them uniformly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SdkError {
    /// The management system could not be reached or the session dropped.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The backend rejected the request content.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The credentials in use are not allowed to perform the call.
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Any other fault returned by the backend.
    #[error("backend fault: {0}")]
    Fault(String),
}

/// Errors that can occur while configuring a VM during provisioning.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// A referenced template, host or VM does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// No strategy matches the API versions the management system supports.
    #[error("Unsupported backend: {0}")]
    UnsupportedBackend(String),

    /// The selected strategy does not implement the operation.
    #[error("Operation '{operation}' is not supported by the {strategy} strategy")]
    UnsupportedOperation {
        operation: &'static str,
        strategy: &'static str,
    },

    /// A backend call failed.
    #[error("Backend operation '{operation}' failed: {source}")]
    BackendOperation {
        operation: &'static str,
        #[source]
        source: SdkError,
    },

    /// A payload violates its construction rules.
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl ProvisionError {
    /// Wrap an SDK failure for the named backend operation.
    pub fn backend(operation: &'static str, source: SdkError) -> Self {
        Self::BackendOperation { operation, source }
    }
}

/// Result type alias for provisioning operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
