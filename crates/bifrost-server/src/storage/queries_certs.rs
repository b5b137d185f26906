//! Certificate ledger queries.
//!
//! The fingerprint is the ledger key. Revocation only ever moves a row
//! from active to revoked, never back and never twice.

use bifrost_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{CertificateRecord, EventKind, FleetCertificateRow, Revocation};
use super::queries_events::insert_event;

/// Parameters for recording an issued certificate.
#[derive(Debug, Clone, Copy)]
pub struct NewCertificate<'a> {
    pub fingerprint: &'a str,
    pub email: &'a str,
    pub description: &'a str,
    pub created: i64,
    pub expires: i64,
}

impl Database {
    /// Record an issued certificate and its "certificate issued" event in
    /// one transaction.
    ///
    /// The row is only written while the owning identity exists; otherwise
    /// this fails with `NotFound` and nothing is recorded. A duplicate
    /// fingerprint fails with `Conflict`.
    pub async fn insert_certificate(
        &self,
        cert: &NewCertificate<'_>,
    ) -> Result<CertificateRecord, DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO certificates (fingerprint, email, description, created, expires) \
             SELECT ?, ?, ?, ?, ? WHERE EXISTS (SELECT 1 FROM identities WHERE email = ?)",
        )
        .bind(cert.fingerprint)
        .bind(cert.email)
        .bind(cert.description)
        .bind(cert.created)
        .bind(cert.expires)
        .bind(cert.email)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if inserted == 0 {
            return Err(DatabaseError::NotFound(format!("identity {}", cert.email)));
        }

        insert_event(
            &mut *tx,
            EventKind::CertificateIssued,
            cert.email,
            &format!("{} - {}", cert.fingerprint, cert.description),
            cert.created,
        )
        .await?;

        tx.commit().await?;

        Ok(CertificateRecord {
            fingerprint: cert.fingerprint.to_string(),
            email: cert.email.to_string(),
            description: cert.description.to_string(),
            created: cert.created,
            expires: cert.expires,
            revoked: None,
        })
    }

    /// Look up a certificate by fingerprint.
    pub async fn get_certificate(
        &self,
        fingerprint: &str,
    ) -> Result<Option<CertificateRecord>, DatabaseError> {
        let mut rows =
            sqlx::query_as::<_, CertificateRecord>("SELECT * FROM certificates WHERE fingerprint = ?")
                .bind(fingerprint)
                .fetch_all(self.pool())
                .await?;

        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(DatabaseError::Integrity(format!(
                "{n} certificate rows for fingerprint {fingerprint}"
            ))),
        }
    }

    /// Revoke a single certificate.
    ///
    /// Only an active certificate is touched; the event is appended in the
    /// same transaction and only when the row actually changed, so repeated
    /// calls leave exactly one "certificate revoked" entry.
    pub async fn revoke_certificate(&self, fingerprint: &str) -> Result<Revocation, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let changed = sqlx::query_as::<_, CertificateRecord>(
            "UPDATE certificates SET revoked = ? WHERE fingerprint = ? AND revoked IS NULL \
             RETURNING *",
        )
        .bind(now)
        .bind(fingerprint)
        .fetch_optional(&mut *tx)
        .await?;

        let outcome = if let Some(record) = changed {
            insert_event(
                &mut *tx,
                EventKind::CertificateRevoked,
                &record.email,
                fingerprint,
                now,
            )
            .await?;
            Revocation::Revoked(record)
        } else {
            sqlx::query_as::<_, CertificateRecord>("SELECT * FROM certificates WHERE fingerprint = ?")
                .bind(fingerprint)
                .fetch_optional(&mut *tx)
                .await?
                .map_or(Revocation::Unknown, Revocation::AlreadyRevoked)
        };

        tx.commit().await?;

        Ok(outcome)
    }

    /// All certificates owned by `email`, whether or not the identity still
    /// exists, ordered by description.
    pub async fn list_certificates_for_email(
        &self,
        email: &str,
    ) -> Result<Vec<CertificateRecord>, DatabaseError> {
        let certs = sqlx::query_as::<_, CertificateRecord>(
            "SELECT * FROM certificates WHERE email = ? ORDER BY description, fingerprint",
        )
        .bind(email)
        .fetch_all(self.pool())
        .await?;

        Ok(certs)
    }

    /// Certificates whose owner still has an identity row, ordered by
    /// email then description. Orphaned certificates are left out.
    pub async fn list_fleet_certificates(&self) -> Result<Vec<FleetCertificateRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, FleetCertificateRow>(
            "SELECT i.created AS identity_created, c.fingerprint, c.email, c.description, \
                    c.created, c.expires, c.revoked \
             FROM certificates AS c \
             INNER JOIN identities AS i ON i.email = c.email \
             ORDER BY c.email, c.description, c.fingerprint",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows)
    }

    /// Number of unrevoked certificates owned by `email`.
    pub async fn count_active_certificates(&self, email: &str) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM certificates WHERE email = ? AND revoked IS NULL",
        )
        .bind(email)
        .fetch_one(self.pool())
        .await?;
        Ok(row.0)
    }
}
