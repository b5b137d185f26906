//! Identity queries.

use bifrost_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::{EventKind, Identity, IdentitySummary};
use super::queries_events::insert_event;

impl Database {
    /// Store a fresh TOTP seed for `email`, creating the identity if needed,
    /// and record a "TOTP set" event in the same transaction.
    ///
    /// `created` survives re-enrollment; `updated` is refreshed.
    /// Returns `true` when the identity did not exist before.
    pub async fn upsert_identity_seed(&self, email: &str, seed: &str) -> Result<bool, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let inserted = sqlx::query(
            "INSERT INTO identities (email, seed, created, updated) VALUES (?, ?, ?, ?) \
             ON CONFLICT(email) DO NOTHING",
        )
        .bind(email)
        .bind(seed)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            sqlx::query("UPDATE identities SET seed = ?, updated = ? WHERE email = ?")
                .bind(seed)
                .bind(now)
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }

        insert_event(&mut *tx, EventKind::TotpSet, email, "", now).await?;

        tx.commit().await?;

        Ok(inserted)
    }

    /// Look up an identity by email.
    ///
    /// More than one row for an email is reported as an integrity violation
    /// instead of picking one.
    pub async fn get_identity(&self, email: &str) -> Result<Option<Identity>, DatabaseError> {
        let mut rows = sqlx::query_as::<_, Identity>("SELECT * FROM identities WHERE email = ?")
            .bind(email)
            .fetch_all(self.pool())
            .await?;

        match rows.len() {
            0 => Ok(None),
            1 => Ok(rows.pop()),
            n => Err(DatabaseError::Integrity(format!(
                "{n} identity rows for {email}"
            ))),
        }
    }

    /// Whether an identity row exists for `email`.
    pub async fn identity_exists(&self, email: &str) -> Result<bool, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM identities WHERE email = ?")
            .bind(email)
            .fetch_one(self.pool())
            .await?;
        Ok(row.0 > 0)
    }

    /// Every identity with its active and revoked certificate counts,
    /// ordered by email.
    pub async fn list_identity_summaries(&self) -> Result<Vec<IdentitySummary>, DatabaseError> {
        let summaries = sqlx::query_as::<_, IdentitySummary>(
            "SELECT i.email AS email, \
                COALESCE(SUM(CASE WHEN c.fingerprint IS NOT NULL AND c.revoked IS NULL THEN 1 ELSE 0 END), 0) AS active_certs, \
                COALESCE(SUM(CASE WHEN c.revoked IS NOT NULL THEN 1 ELSE 0 END), 0) AS revoked_certs \
             FROM identities AS i \
             LEFT JOIN certificates AS c ON c.email = i.email \
             GROUP BY i.email \
             ORDER BY i.email",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(summaries)
    }

    /// Remove an identity, revoking its active certificates first.
    ///
    /// Revocation, deletion and the "user deleted" event share one
    /// transaction. Removing an unknown email deletes nothing but is still
    /// recorded. Returns every fingerprint the email owns, sorted, whether
    /// it was revoked by this call or earlier.
    pub async fn remove_identity(&self, email: &str) -> Result<Vec<String>, DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        let fingerprints: Vec<String> = sqlx::query_scalar(
            "SELECT fingerprint FROM certificates WHERE email = ? ORDER BY fingerprint",
        )
        .bind(email)
        .fetch_all(&mut *tx)
        .await?;

        if !fingerprints.is_empty() {
            sqlx::query("UPDATE certificates SET revoked = ? WHERE email = ? AND revoked IS NULL")
                .bind(now)
                .bind(email)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM identities WHERE email = ?")
            .bind(email)
            .execute(&mut *tx)
            .await?;

        insert_event(
            &mut *tx,
            EventKind::UserDeleted,
            email,
            &format!("{} certs revoked", fingerprints.len()),
            now,
        )
        .await?;

        tx.commit().await?;

        Ok(fingerprints)
    }
}
