//! Identity registry.
//!
//! An identity is an email plus its TOTP seed. Enrollment creates or
//! rotates the seed; removal revokes every active certificate the email
//! owns before deleting the identity.

use std::fmt;
use std::sync::Arc;

use bifrost_crypto::OtpProvisioner;
use tracing::{info, instrument};

use super::ledger::CertificateSet;
use super::settings::SettingsStore;
use crate::error::ServiceError;
use crate::storage::{Database, IdentitySummary};

/// Edge length, in pixels, of the enrollment QR image.
pub const QR_SIZE: u32 = 200;

/// Result of enrolling or rotating an identity.
pub struct Enrollment {
    /// `true` when the identity did not exist before.
    pub created: bool,
    /// Base32 TOTP secret.
    pub secret: String,
    /// `otpauth://` provisioning URI.
    pub uri: String,
    /// PNG QR code of `uri`.
    pub qr_png: Vec<u8>,
}

impl fmt::Debug for Enrollment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Enrollment")
            .field("created", &self.created)
            .field("secret", &"[REDACTED]")
            .field("uri", &"[REDACTED]")
            .field("qr_png_len", &self.qr_png.len())
            .finish()
    }
}

/// An identity and the certificates it owns.
#[derive(Debug, Clone)]
pub struct IdentityDetail {
    pub email: String,
    pub created: i64,
    pub certificates: CertificateSet,
}

#[derive(Clone)]
pub struct IdentityRegistry {
    db: Database,
    provisioner: Arc<dyn OtpProvisioner>,
    settings: SettingsStore,
}

impl IdentityRegistry {
    pub fn new(db: Database, provisioner: Arc<dyn OtpProvisioner>) -> Self {
        Self {
            settings: SettingsStore::new(db.clone()),
            db,
            provisioner,
        }
    }

    /// Generate a fresh TOTP secret for `email`, creating the identity if
    /// needed. The secret is scoped to the configured service name.
    #[instrument(skip(self))]
    pub async fn enroll_or_rotate(&self, email: &str) -> Result<Enrollment, ServiceError> {
        let settings = self.settings.load().await?;

        let enrollment = self
            .provisioner
            .generate(&settings.service_name, email)
            .map_err(ServiceError::Provisioning)?;
        let qr_png = self
            .provisioner
            .render_qr(&enrollment.uri, QR_SIZE, QR_SIZE)
            .map_err(ServiceError::Provisioning)?;

        let created = self
            .db
            .upsert_identity_seed(email, &enrollment.secret)
            .await?;

        if created {
            info!(email, "Identity enrolled");
        } else {
            info!(email, "TOTP seed rotated");
        }

        Ok(Enrollment {
            created,
            secret: enrollment.secret,
            uri: enrollment.uri,
            qr_png,
        })
    }

    /// Revoke every active certificate of `email` and delete the identity.
    ///
    /// Returns every fingerprint the email owns, including certificates
    /// revoked before the removal.
    #[instrument(skip(self))]
    pub async fn remove(&self, email: &str) -> Result<Vec<String>, ServiceError> {
        let revoked = self.db.remove_identity(email).await?;
        info!(email, revoked = revoked.len(), "Identity removed");
        Ok(revoked)
    }

    pub async fn exists(&self, email: &str) -> Result<bool, ServiceError> {
        Ok(self.db.identity_exists(email).await?)
    }

    /// The identity and its certificates, or `NotFound`.
    pub async fn describe(&self, email: &str) -> Result<IdentityDetail, ServiceError> {
        let identity = self
            .db
            .get_identity(email)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("identity {email}")))?;
        let certs = self.db.list_certificates_for_email(email).await?;

        Ok(IdentityDetail {
            email: identity.email,
            created: identity.created,
            certificates: CertificateSet::from_records(certs),
        })
    }

    /// Every identity with its active and revoked certificate counts.
    pub async fn list_summaries(&self) -> Result<Vec<IdentitySummary>, ServiceError> {
        Ok(self.db.list_identity_summaries().await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bifrost_crypto::{CryptoError, OtpEnrollment, TotpProvisioner};

    use super::*;
    use crate::storage::{EventWindow, NewCertificate};

    async fn registry() -> (Database, IdentityRegistry) {
        let db = Database::open_in_memory().await.unwrap();
        let registry = IdentityRegistry::new(db.clone(), Arc::new(TotpProvisioner));
        (db, registry)
    }

    struct BrokenProvisioner;

    impl OtpProvisioner for BrokenProvisioner {
        fn generate(&self, _issuer: &str, _account: &str) -> Result<OtpEnrollment, CryptoError> {
            Err(CryptoError::Provisioning("entropy unavailable".into()))
        }

        fn render_qr(&self, _uri: &str, _w: u32, _h: u32) -> Result<Vec<u8>, CryptoError> {
            Err(CryptoError::QrRender("unreachable".into()))
        }
    }

    #[tokio::test]
    async fn new_identity_describes_with_no_certificates() {
        let (_, registry) = registry().await;

        let enrollment = registry.enroll_or_rotate("alice@example.com").await.unwrap();
        assert!(enrollment.created);
        assert!(enrollment.uri.starts_with("otpauth://totp/"));
        assert!(enrollment.uri.contains("Bif"));
        assert!(enrollment.qr_png.starts_with(b"\x89PNG"));

        let detail = registry.describe("alice@example.com").await.unwrap();
        assert!(detail.certificates.active.is_empty());
        assert!(detail.certificates.revoked.is_empty());
    }

    #[tokio::test]
    async fn rotation_changes_secret_and_keeps_identity() {
        let (db, registry) = registry().await;

        let first = registry.enroll_or_rotate("alice@example.com").await.unwrap();
        let second = registry.enroll_or_rotate("alice@example.com").await.unwrap();
        assert!(!second.created);
        assert_ne!(first.secret, second.secret);

        let stored = db.get_identity("alice@example.com").await.unwrap().unwrap();
        assert_eq!(stored.seed, second.secret);
    }

    #[tokio::test]
    async fn provisioning_failure_writes_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let registry = IdentityRegistry::new(db.clone(), Arc::new(BrokenProvisioner));

        let err = registry.enroll_or_rotate("alice@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::Provisioning(_)));
        assert!(!db.identity_exists("alice@example.com").await.unwrap());
        assert_eq!(db.count_events().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn describe_unknown_is_not_found() {
        let (_, registry) = registry().await;
        let err = registry.describe("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn remove_revokes_and_keeps_certificates_queryable() {
        let (db, registry) = registry().await;
        registry.enroll_or_rotate("alice@example.com").await.unwrap();
        for (fp, desc) in [("f1", "laptop"), ("f2", "phone")] {
            db.insert_certificate(&NewCertificate {
                fingerprint: fp,
                email: "alice@example.com",
                description: desc,
                created: 1,
                expires: 2,
            })
            .await
            .unwrap();
        }

        let revoked = registry.remove("alice@example.com").await.unwrap();
        assert_eq!(revoked, vec!["f1", "f2"]);
        assert!(matches!(
            registry.describe("alice@example.com").await,
            Err(ServiceError::NotFound(_))
        ));

        let cert = db.get_certificate("f1").await.unwrap().unwrap();
        assert!(cert.is_revoked());

        let latest = db.list_events(EventWindow::Latest { limit: 1 }).await.unwrap();
        assert_eq!(latest[0].event, "user deleted");
        assert_eq!(latest[0].value, "2 certs revoked");
    }

    #[tokio::test]
    async fn remove_reports_certificates_revoked_earlier() {
        let (db, registry) = registry().await;
        registry.enroll_or_rotate("alice@example.com").await.unwrap();
        for fp in ["f1", "f2"] {
            db.insert_certificate(&NewCertificate {
                fingerprint: fp,
                email: "alice@example.com",
                description: fp,
                created: 1,
                expires: 2,
            })
            .await
            .unwrap();
        }
        db.revoke_certificate("f1").await.unwrap();

        let revoked = registry.remove("alice@example.com").await.unwrap();
        assert_eq!(revoked, vec!["f1", "f2"]);

        let latest = db.list_events(EventWindow::Latest { limit: 1 }).await.unwrap();
        assert_eq!(latest[0].value, "2 certs revoked");
    }

    #[test]
    fn enrollment_debug_hides_secret() {
        let enrollment = Enrollment {
            created: true,
            secret: "JBSWY3DPEHPK3PXP".into(),
            uri: "otpauth://totp/x?secret=JBSWY3DPEHPK3PXP".into(),
            qr_png: vec![0; 4],
        };
        assert!(!format!("{enrollment:?}").contains("JBSWY3DPEHPK3PXP"));
    }

    #[tokio::test]
    async fn remove_of_unknown_identity_is_a_no_op() {
        let (_, registry) = registry().await;
        assert!(registry.remove("ghost@example.com").await.unwrap().is_empty());
        assert!(!registry.exists("ghost@example.com").await.unwrap());
    }
}
