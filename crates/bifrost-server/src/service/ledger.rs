//! Certificate ledger.
//!
//! Issues client certificates through the signing collaborator, records
//! them by fingerprint, and revokes them. The private key of an issued
//! certificate only ever leaves in the returned bundle.

use std::fmt;
use std::sync::Arc;

use bifrost_core::unix_timestamp;
use bifrost_crypto::{CertSerial, ClientCertSigner, ClientSubject};
use tracing::{info, instrument, warn};

use super::bundle::BundleSources;
use super::settings::SettingsStore;
use crate::error::ServiceError;
use crate::storage::{CertificateRecord, Database, NewCertificate, Revocation};

const SECONDS_PER_DAY: i64 = 86_400;

/// Certificates split by revocation state, each side in ledger order
/// (description ascending).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateSet {
    pub active: Vec<CertificateRecord>,
    pub revoked: Vec<CertificateRecord>,
}

impl CertificateSet {
    pub fn from_records(records: impl IntoIterator<Item = CertificateRecord>) -> Self {
        let (revoked, active): (Vec<_>, Vec<_>) =
            records.into_iter().partition(CertificateRecord::is_revoked);
        Self { active, revoked }
    }
}

/// Certificates grouped under their owning email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerCertificates {
    pub email: String,
    /// Creation time of the owning identity, `None` once it was removed.
    pub identity_created: Option<i64>,
    pub certificates: CertificateSet,
}

/// A freshly issued certificate and its client bundle.
pub struct IssuedBundle {
    pub fingerprint: String,
    /// Rendered client configuration, including the private key.
    pub bundle: String,
}

impl fmt::Debug for IssuedBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedBundle")
            .field("fingerprint", &self.fingerprint)
            .field("bundle", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone)]
pub struct CertificateLedger {
    db: Database,
    signer: Arc<dyn ClientCertSigner>,
    settings: SettingsStore,
    bundles: BundleSources,
}

impl CertificateLedger {
    pub fn new(db: Database, signer: Arc<dyn ClientCertSigner>, bundles: BundleSources) -> Self {
        Self {
            settings: SettingsStore::new(db.clone()),
            db,
            signer,
            bundles,
        }
    }

    /// Sign a new client certificate for an enrolled `email` and render
    /// its bundle.
    ///
    /// Nothing is recorded unless signing and rendering both succeed, and
    /// the identity still exists when the certificate is recorded.
    #[instrument(skip(self))]
    pub async fn issue(&self, email: &str, description: &str) -> Result<IssuedBundle, ServiceError> {
        if description.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "certificate description must not be empty".into(),
            ));
        }
        if !self.db.identity_exists(email).await? {
            return Err(ServiceError::NotFound(format!("identity {email}")));
        }

        let settings = self.settings.load().await?;
        let active = self.db.count_active_certificates(email).await?;
        if active >= settings.client_limit {
            warn!(
                email,
                active,
                limit = settings.client_limit,
                "Identity is at its client limit; issuing anyway"
            );
        }

        let duration_days = u32::try_from(settings.issued_cert_duration).map_err(|_| {
            ServiceError::IntegrityViolation(format!(
                "IssuedCertDuration out of range: {}",
                settings.issued_cert_duration
            ))
        })?;

        let subject = ClientSubject {
            organization: settings.service_name,
            common_name: email.to_string(),
        };
        let issued = self
            .signer
            .issue_client_certificate(duration_days, &subject, CertSerial::allocate())
            .map_err(ServiceError::Signing)?;

        let bundle = self
            .bundles
            .assemble(self.signer.chain_pem(), &issued.cert_pem, &issued.key_pem)
            .await?;

        let created = unix_timestamp();
        self.db
            .insert_certificate(&NewCertificate {
                fingerprint: &issued.fingerprint,
                email,
                description,
                created,
                expires: created + i64::from(duration_days) * SECONDS_PER_DAY,
            })
            .await?;

        info!(
            email,
            fingerprint = %issued.fingerprint,
            serial = %issued.serial,
            "Certificate issued"
        );

        Ok(IssuedBundle {
            fingerprint: issued.fingerprint,
            bundle,
        })
    }

    /// Revoke the certificate with `fingerprint`. Unknown and already
    /// revoked certificates are reported, not treated as errors.
    #[instrument(skip(self))]
    pub async fn revoke(&self, fingerprint: &str) -> Result<Revocation, ServiceError> {
        let outcome = self.db.revoke_certificate(fingerprint).await?;
        match &outcome {
            Revocation::Revoked(cert) => {
                info!(fingerprint, email = %cert.email, "Certificate revoked");
            }
            Revocation::AlreadyRevoked(_) => {
                info!(fingerprint, "Certificate was already revoked");
            }
            Revocation::Unknown => warn!(fingerprint, "Attempt to revoke unknown certificate"),
        }
        Ok(outcome)
    }

    pub async fn describe(&self, fingerprint: &str) -> Result<CertificateRecord, ServiceError> {
        self.db
            .get_certificate(fingerprint)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("certificate {fingerprint}")))
    }

    /// Every certificate `email` owns, including those that outlived the
    /// identity. `NotFound` when there is neither an identity nor a
    /// certificate for the email.
    pub async fn list_for_user(&self, email: &str) -> Result<OwnerCertificates, ServiceError> {
        let identity = self.db.get_identity(email).await?;
        let certs = self.db.list_certificates_for_email(email).await?;

        if identity.is_none() && certs.is_empty() {
            return Err(ServiceError::NotFound(format!("identity {email}")));
        }

        Ok(OwnerCertificates {
            email: email.to_string(),
            identity_created: identity.map(|i| i.created),
            certificates: CertificateSet::from_records(certs),
        })
    }

    /// Certificates of every live identity, grouped by email ascending.
    pub async fn list_all(&self) -> Result<Vec<OwnerCertificates>, ServiceError> {
        let rows = self.db.list_fleet_certificates().await?;

        let mut groups: Vec<(String, i64, Vec<CertificateRecord>)> = Vec::new();
        for row in rows {
            if let Some((_, _, certs)) = groups
                .last_mut()
                .filter(|(email, _, _)| *email == row.certificate.email)
            {
                certs.push(row.certificate);
                continue;
            }
            groups.push((
                row.certificate.email.clone(),
                row.identity_created,
                vec![row.certificate],
            ));
        }

        Ok(groups
            .into_iter()
            .map(|(email, created, certs)| OwnerCertificates {
                email,
                identity_created: Some(created),
                certificates: CertificateSet::from_records(certs),
            })
            .collect())
    }
}
