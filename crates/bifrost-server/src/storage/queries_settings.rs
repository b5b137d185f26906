//! Settings queries.
//!
//! Settings are plain key/value rows; typing and validation live in the
//! service layer.

use bifrost_core::db::unix_timestamp;

use super::db::{Database, DatabaseError};
use super::models::SettingRow;

impl Database {
    /// Every stored setting row, ordered by key.
    pub async fn list_settings(&self) -> Result<Vec<SettingRow>, DatabaseError> {
        let rows = sqlx::query_as::<_, SettingRow>("SELECT * FROM settings ORDER BY key")
            .fetch_all(self.pool())
            .await?;
        Ok(rows)
    }

    /// Write a batch of settings in one transaction.
    pub async fn put_settings(&self, entries: &[(&str, String)]) -> Result<(), DatabaseError> {
        let now = unix_timestamp();
        let mut tx = self.pool().begin().await?;

        for (key, value) in entries {
            sqlx::query(
                "INSERT INTO settings (key, value, modified) VALUES (?, ?, ?) \
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, modified = excluded.modified",
            )
            .bind(*key)
            .bind(value.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
