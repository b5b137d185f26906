//! Client certificate issuance for VPN identities.
//!
//! [`Authority`] wraps a private CA loaded from PEM (or generated for
//! development) and signs short-lived client certificates whose subject is
//! `O=<service name>, CN=<email>`. The certificate fingerprint, not the
//! serial, is the stable identifier handed back to the caller.

use std::fmt;
use std::path::Path;

use rcgen::{
    BasicConstraints, CertificateParams, DnType, ExtendedKeyUsagePurpose, IsCa, Issuer, KeyPair,
    KeyUsagePurpose, SerialNumber,
};
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::info;

use crate::error::CryptoError;
use crate::serial::CertSerial;

/// Subject of an issued client certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSubject {
    pub organization: String,
    pub common_name: String,
}

/// PEM-encoded material of a freshly signed client certificate.
pub struct IssuedCertificate {
    /// PEM-encoded client certificate.
    pub cert_pem: String,
    /// PEM-encoded client private key. Never persisted.
    pub key_pem: String,
    /// Lowercase hex SHA-256 of the certificate DER.
    pub fingerprint: String,
    /// Serial the certificate was signed with.
    pub serial: CertSerial,
}

impl fmt::Debug for IssuedCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedCertificate")
            .field("fingerprint", &self.fingerprint)
            .field("serial", &self.serial)
            .field("key_pem", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// The signing collaborator used by the certificate ledger.
pub trait ClientCertSigner: Send + Sync {
    /// Generate a client keypair and sign its certificate, valid from now
    /// for `duration_days` days.
    fn issue_client_certificate(
        &self,
        duration_days: u32,
        subject: &ClientSubject,
        serial: CertSerial,
    ) -> Result<IssuedCertificate, CryptoError>;

    /// PEM chain clients need to trust the issuing CA.
    fn chain_pem(&self) -> &str;
}

/// PEM-encoded CA produced by [`generate_ca`].
pub struct GeneratedCa {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Generate a self-signed CA suitable for signing client certificates.
pub fn generate_ca(org_name: &str) -> Result<GeneratedCa, CryptoError> {
    let mut params = CertificateParams::default();
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
        .distinguished_name
        .push(DnType::CommonName, format!("{org_name} CA"));
    params
        .distinguished_name
        .push(DnType::OrganizationName, org_name);
    params.key_usages.push(KeyUsagePurpose::KeyCertSign);
    params.key_usages.push(KeyUsagePurpose::CrlSign);

    let key_pair = KeyPair::generate().map_err(|e| CryptoError::Generation(e.to_string()))?;
    let ca_cert = params
        .self_signed(&key_pair)
        .map_err(|e| CryptoError::Generation(e.to_string()))?;

    Ok(GeneratedCa {
        cert_pem: ca_cert.pem(),
        key_pem: key_pair.serialize_pem(),
    })
}

/// Lowercase hex SHA-256 over a DER-encoded certificate.
pub fn fingerprint_der(der: &[u8]) -> String {
    hex::encode(Sha256::digest(der))
}

/// A private certificate authority able to sign client certificates.
pub struct Authority {
    issuer: Issuer<'static, KeyPair>,
    chain_pem: String,
}

impl Authority {
    /// Build from a PEM certificate (chain) and a PKCS#8 PEM private key.
    ///
    /// When `cert_pem` holds a chain, the first certificate is the signer
    /// and the whole text is exported as the client trust chain.
    pub fn from_pem(cert_pem: &str, key_pem: &str) -> Result<Self, CryptoError> {
        let key_pair =
            KeyPair::from_pem(key_pem).map_err(|e| CryptoError::AuthorityLoad(e.to_string()))?;
        let issuer = Issuer::from_ca_cert_pem(cert_pem, key_pair)
            .map_err(|e| CryptoError::AuthorityLoad(e.to_string()))?;

        Ok(Self {
            issuer,
            chain_pem: cert_pem.to_string(),
        })
    }

    /// Load the CA certificate and key from PEM files.
    pub fn load(cert_path: &Path, key_path: &Path) -> Result<Self, CryptoError> {
        let cert_pem = std::fs::read_to_string(cert_path).map_err(|e| {
            CryptoError::AuthorityLoad(format!("Failed to read {}: {e}", cert_path.display()))
        })?;
        let key_pem = std::fs::read_to_string(key_path).map_err(|e| {
            CryptoError::AuthorityLoad(format!("Failed to read {}: {e}", key_path.display()))
        })?;

        let authority = Self::from_pem(&cert_pem, &key_pem)?;
        info!(cert = %cert_path.display(), "Certificate authority loaded");
        Ok(authority)
    }

    /// Generate an ephemeral CA. Development only: every restart yields a
    /// new CA, invalidating previously issued bundles.
    pub fn generate(org_name: &str) -> Result<Self, CryptoError> {
        let ca = generate_ca(org_name)?;
        Self::from_pem(&ca.cert_pem, &ca.key_pem)
    }
}

impl ClientCertSigner for Authority {
    fn issue_client_certificate(
        &self,
        duration_days: u32,
        subject: &ClientSubject,
        serial: CertSerial,
    ) -> Result<IssuedCertificate, CryptoError> {
        if duration_days == 0 {
            return Err(CryptoError::Validity(
                "duration must be at least one day".into(),
            ));
        }

        let not_before = OffsetDateTime::now_utc();
        let not_after = not_before
            .checked_add(time::Duration::days(i64::from(duration_days)))
            .ok_or_else(|| CryptoError::Validity(format!("{duration_days} days overflows")))?;

        let mut params = CertificateParams::default();
        params
            .distinguished_name
            .push(DnType::OrganizationName, subject.organization.as_str());
        params
            .distinguished_name
            .push(DnType::CommonName, subject.common_name.as_str());
        params.serial_number = Some(SerialNumber::from_slice(&serial.to_be_bytes_minimal()));
        params.not_before = not_before;
        params.not_after = not_after;
        params.key_usages.push(KeyUsagePurpose::DigitalSignature);
        params
            .extended_key_usages
            .push(ExtendedKeyUsagePurpose::ClientAuth);

        let client_key = KeyPair::generate().map_err(|e| CryptoError::Generation(e.to_string()))?;
        let client_cert = params
            .signed_by(&client_key, &self.issuer)
            .map_err(|e| CryptoError::Generation(e.to_string()))?;

        Ok(IssuedCertificate {
            fingerprint: fingerprint_der(client_cert.der()),
            cert_pem: client_cert.pem(),
            key_pem: client_key.serialize_pem(),
            serial,
        })
    }

    fn chain_pem(&self) -> &str {
        &self.chain_pem
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::needless_pass_by_value
)]
mod tests {
    use super::*;
    use x509_parser::pem::parse_x509_pem;

    fn alice() -> ClientSubject {
        ClientSubject {
            organization: "Bifrost Test".into(),
            common_name: "alice@example.com".into(),
        }
    }

    #[test]
    fn generate_ca_produces_valid_pem() {
        let ca = generate_ca("Bifrost Test").unwrap();
        assert!(ca.cert_pem.contains("BEGIN CERTIFICATE"));
        assert!(ca.key_pem.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn issued_certificate_carries_subject_serial_and_validity() {
        let authority = Authority::generate("Bifrost Test").unwrap();
        let serial = CertSerial::allocate();
        let issued = authority
            .issue_client_certificate(90, &alice(), serial)
            .unwrap();

        let (_, pem) = parse_x509_pem(issued.cert_pem.as_bytes()).unwrap();
        let cert = pem.parse_x509().unwrap();

        let cn = cert.subject().iter_common_name().next().unwrap();
        assert_eq!(cn.as_str().unwrap(), "alice@example.com");
        let org = cert.subject().iter_organization().next().unwrap();
        assert_eq!(org.as_str().unwrap(), "Bifrost Test");

        let validity = cert.validity();
        let span = validity.not_after.timestamp() - validity.not_before.timestamp();
        assert_eq!(span, 90 * 86_400);

        let raw = cert.raw_serial();
        let trimmed: Vec<u8> = raw.iter().copied().skip_while(|&b| b == 0).collect();
        let expected: Vec<u8> = serial
            .to_be_bytes_minimal()
            .into_iter()
            .skip_while(|&b| b == 0)
            .collect();
        assert_eq!(trimmed, expected);

        assert_eq!(issued.fingerprint, fingerprint_der(&pem.contents));
        assert_eq!(issued.fingerprint.len(), 64);
        assert!(issued.key_pem.contains("BEGIN PRIVATE KEY"));
    }

    #[test]
    fn issued_certificate_is_signed_by_the_authority() {
        let ca = generate_ca("Bifrost Test").unwrap();
        let authority = Authority::from_pem(&ca.cert_pem, &ca.key_pem).unwrap();
        let issued = authority
            .issue_client_certificate(1, &alice(), CertSerial::allocate())
            .unwrap();

        let (_, ca_pem) = parse_x509_pem(ca.cert_pem.as_bytes()).unwrap();
        let ca_cert = ca_pem.parse_x509().unwrap();
        let (_, client_pem) = parse_x509_pem(issued.cert_pem.as_bytes()).unwrap();
        let client_cert = client_pem.parse_x509().unwrap();

        assert_eq!(client_cert.issuer(), ca_cert.subject());
        client_cert
            .verify_signature(Some(ca_cert.public_key()))
            .unwrap();
        assert_eq!(authority.chain_pem(), ca.cert_pem);
    }

    #[test]
    fn each_issue_yields_a_new_fingerprint() {
        let authority = Authority::generate("Bifrost Test").unwrap();
        let a = authority
            .issue_client_certificate(30, &alice(), CertSerial::allocate())
            .unwrap();
        let b = authority
            .issue_client_certificate(30, &alice(), CertSerial::allocate())
            .unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
        assert_ne!(a.key_pem, b.key_pem);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let authority = Authority::generate("Bifrost Test").unwrap();
        let err = authority
            .issue_client_certificate(0, &alice(), CertSerial::allocate())
            .unwrap_err();
        assert!(matches!(err, CryptoError::Validity(_)));
    }

    #[test]
    fn load_reads_pem_files() {
        let dir = tempfile::tempdir().unwrap();
        let ca = generate_ca("Bifrost Test").unwrap();
        let cert_path = dir.path().join("ca.crt");
        let key_path = dir.path().join("ca.key");
        std::fs::write(&cert_path, &ca.cert_pem).unwrap();
        std::fs::write(&key_path, &ca.key_pem).unwrap();

        let authority = Authority::load(&cert_path, &key_path).unwrap();
        assert_eq!(authority.chain_pem(), ca.cert_pem);
    }

    #[test]
    fn load_missing_files_fails() {
        let err = Authority::load(
            Path::new("/nonexistent/ca.crt"),
            Path::new("/nonexistent/ca.key"),
        )
        .err()
        .unwrap();
        assert!(matches!(err, CryptoError::AuthorityLoad(_)));
    }

    #[test]
    fn garbage_key_fails() {
        let ca = generate_ca("Bifrost Test").unwrap();
        assert!(Authority::from_pem(&ca.cert_pem, "not a key").is_err());
    }
}
