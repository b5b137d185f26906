//! `Bifrost` collaborator library.
//!
//! The identity service composes two external collaborators, both defined
//! here behind small traits so the service can be exercised against fakes:
//!
//! - **Signing**: a private client CA that issues x509 client certificates
//!   ([`ClientCertSigner`], implemented by [`Authority`] on top of `rcgen`)
//! - **Provisioning**: TOTP secret and QR enrollment material
//!   ([`OtpProvisioner`], implemented by [`TotpProvisioner`])

pub mod certs;
pub mod error;
pub mod serial;
pub mod totp;

pub use certs::{Authority, ClientCertSigner, ClientSubject, IssuedCertificate, fingerprint_der};
pub use error::CryptoError;
pub use serial::CertSerial;
pub use totp::{OtpEnrollment, OtpProvisioner, TotpProvisioner};

/// Compare two secrets without leaking the position of the first mismatch.
pub fn constant_time_str_eq(a: &str, b: &str) -> bool {
    use subtle::ConstantTimeEq;
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}
