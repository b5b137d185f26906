//! Whitelist queries.

use bifrost_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::WhitelistEntry;

impl Database {
    /// Every whitelisted email, ordered.
    pub async fn list_whitelist(&self) -> Result<Vec<WhitelistEntry>, DatabaseError> {
        let entries =
            sqlx::query_as::<_, WhitelistEntry>("SELECT * FROM whitelist ORDER BY email")
                .fetch_all(self.pool())
                .await?;
        Ok(entries)
    }

    /// Add `email` to the whitelist. Re-adding refreshes `modified`.
    pub async fn add_whitelisted(&self, email: &str) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO whitelist (email, modified) VALUES (?, ?) \
             ON CONFLICT(email) DO UPDATE SET modified = excluded.modified",
        )
        .bind(email)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Remove `email` from the whitelist. Returns whether a row was removed.
    pub async fn remove_whitelisted(&self, email: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM whitelist WHERE email = ?")
            .bind(email)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
