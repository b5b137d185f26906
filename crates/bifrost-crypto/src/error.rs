//! Collaborator error types.

/// Errors from the signing and provisioning collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Failed to load certificate authority: {0}")]
    AuthorityLoad(String),

    #[error("Certificate generation error: {0}")]
    Generation(String),

    #[error("Invalid validity period: {0}")]
    Validity(String),

    #[error("TOTP provisioning failed: {0}")]
    Provisioning(String),

    #[error("QR rendering failed: {0}")]
    QrRender(String),
}
