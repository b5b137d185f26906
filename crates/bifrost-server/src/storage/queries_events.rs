//! Audit trail queries.
//!
//! Events are insert-only; the only destructive operation is a full clear,
//! which always leaves a reset marker behind.

use bifrost_core::db::unix_timestamp;
use sqlx::SqliteConnection;

use super::db::{Database, DatabaseError};
use super::models::{EventKind, EventRecord, EventWindow};

/// Append an event on an open connection, so callers can make the audit
/// entry part of their own transaction.
pub(super) async fn insert_event(
    conn: &mut SqliteConnection,
    kind: EventKind,
    email: &str,
    value: &str,
    ts: i64,
) -> Result<(), DatabaseError> {
    sqlx::query("INSERT INTO events (event, email, value, ts) VALUES (?, ?, ?, ?)")
        .bind(kind.as_str())
        .bind(email)
        .bind(value)
        .bind(ts)
        .execute(conn)
        .await?;
    Ok(())
}

async fn select_events(
    conn: &mut SqliteConnection,
    window: EventWindow,
) -> Result<Vec<EventRecord>, DatabaseError> {
    let events = match window {
        EventWindow::Latest { limit } => {
            sqlx::query_as::<_, EventRecord>(
                "SELECT * FROM events ORDER BY ts DESC, id DESC LIMIT ?",
            )
            .bind(limit)
            .fetch_all(conn)
            .await?
        }
        EventWindow::Before { before, limit } => {
            sqlx::query_as::<_, EventRecord>(
                "SELECT * FROM events WHERE ts < ? ORDER BY ts DESC, id DESC LIMIT ?",
            )
            .bind(before)
            .bind(limit)
            .fetch_all(conn)
            .await?
        }
        EventWindow::All => {
            sqlx::query_as::<_, EventRecord>("SELECT * FROM events ORDER BY ts DESC, id DESC")
                .fetch_all(conn)
                .await?
        }
    };
    Ok(events)
}

impl Database {
    /// Append a single event stamped with the current time.
    pub async fn append_event(
        &self,
        kind: EventKind,
        email: &str,
        value: &str,
    ) -> Result<(), DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        insert_event(&mut conn, kind, email, value, unix_timestamp()).await
    }

    /// Read a window of the trail, newest first.
    pub async fn list_events(&self, window: EventWindow) -> Result<Vec<EventRecord>, DatabaseError> {
        let mut conn = self.pool().acquire().await?;
        select_events(&mut conn, window).await
    }

    /// Read `window`, delete every event, and append an
    /// "events log reset" marker recording how many rows were removed.
    ///
    /// Returns the listing taken before the delete and the number of
    /// events cleared.
    pub async fn clear_events(
        &self,
        window: EventWindow,
    ) -> Result<(Vec<EventRecord>, u64), DatabaseError> {
        let mut tx = self.pool().begin().await?;

        let listing = select_events(&mut *tx, window).await?;
        let cleared = sqlx::query("DELETE FROM events")
            .execute(&mut *tx)
            .await?
            .rows_affected();
        insert_event(
            &mut *tx,
            EventKind::EventsLogReset,
            "",
            &format!("{cleared} events cleared"),
            unix_timestamp(),
        )
        .await?;

        tx.commit().await?;

        Ok((listing, cleared))
    }

    /// Count all stored events.
    pub async fn count_events(&self) -> Result<i64, DatabaseError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(self.pool())
            .await?;
        Ok(row.0)
    }
}
