//! Service-level error type.

use bifrost_core::DatabaseError;
use bifrost_crypto::CryptoError;

use crate::service::bundle::BundleError;

/// Errors surfaced by the identity service components.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    #[error("Storage failure: {0}")]
    Storage(DatabaseError),

    #[error("Signing failure: {0}")]
    Signing(CryptoError),

    #[error("Provisioning failure: {0}")]
    Provisioning(CryptoError),

    #[error("Bundle failure: {0}")]
    Bundle(#[from] BundleError),
}

impl ServiceError {
    /// Whether this is a collaborator or integrity failure rather than a
    /// problem with the caller's request.
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::IntegrityViolation(_)
                | Self::Storage(_)
                | Self::Signing(_)
                | Self::Provisioning(_)
                | Self::Bundle(_)
        )
    }
}

impl From<DatabaseError> for ServiceError {
    fn from(e: DatabaseError) -> Self {
        match e {
            DatabaseError::NotFound(msg) => Self::NotFound(msg),
            DatabaseError::Conflict(msg) => Self::Conflict(msg),
            DatabaseError::Integrity(msg) => Self::IntegrityViolation(msg),
            other => Self::Storage(other),
        }
    }
}
