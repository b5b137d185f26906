//! Audit log reads and resets.
//!
//! Appends happen inside the storage transactions of the operations being
//! audited; this component only pages through and clears the trail.

use bifrost_core::time::parse_timestamp;
use tracing::{info, instrument};

use crate::error::ServiceError;
use crate::storage::{Database, EventRecord, EventWindow};

/// Events returned per page when a listing is bounded.
pub const PAGE_SIZE: i64 = 25;

/// Cursor value that selects the whole trail.
pub const ALL_EVENTS: &str = "all";

/// Interpret a `before` cursor.
///
/// Absent or empty selects the newest page, `"all"` the whole trail, and a
/// `YYYY-MM-DDTHH:MM:SSZ` timestamp the page strictly older than it.
pub fn window_for(before: Option<&str>) -> Result<EventWindow, ServiceError> {
    match before {
        None | Some("") => Ok(EventWindow::Latest { limit: PAGE_SIZE }),
        Some(ALL_EVENTS) => Ok(EventWindow::All),
        Some(cursor) => parse_timestamp(cursor)
            .map(|before| EventWindow::Before {
                before,
                limit: PAGE_SIZE,
            })
            .ok_or_else(|| ServiceError::InvalidArgument(format!("malformed cursor {cursor:?}"))),
    }
}

#[derive(Clone)]
pub struct AuditLog {
    db: Database,
}

impl AuditLog {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Events newest first, windowed by `before`.
    pub async fn list(&self, before: Option<&str>) -> Result<Vec<EventRecord>, ServiceError> {
        let window = window_for(before)?;
        Ok(self.db.list_events(window).await?)
    }

    /// Clear the trail, returning the listing taken just before.
    ///
    /// A malformed cursor fails before anything is deleted.
    #[instrument(skip(self))]
    pub async fn clear(&self, before: Option<&str>) -> Result<Vec<EventRecord>, ServiceError> {
        let window = window_for(before)?;
        let (listing, cleared) = self.db.clear_events(window).await?;
        info!(cleared, "Event log cleared");
        Ok(listing)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::storage::EventKind;

    #[test]
    fn cursor_parsing() {
        assert_eq!(window_for(None).unwrap(), EventWindow::Latest { limit: 25 });
        assert_eq!(window_for(Some("")).unwrap(), EventWindow::Latest { limit: 25 });
        assert_eq!(window_for(Some("all")).unwrap(), EventWindow::All);
        assert_eq!(
            window_for(Some("1970-01-01T00:01:40Z")).unwrap(),
            EventWindow::Before {
                before: 100,
                limit: 25
            }
        );
        assert!(matches!(
            window_for(Some("yesterday")),
            Err(ServiceError::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn latest_page_is_capped() {
        let db = Database::open_in_memory().await.unwrap();
        for i in 0..30 {
            db.append_event(EventKind::TotpSet, &format!("u{i}@example.com"), "")
                .await
                .unwrap();
        }
        let log = AuditLog::new(db);

        let page = log.list(None).await.unwrap();
        assert_eq!(page.len(), 25);
        assert_eq!(page[0].email, "u29@example.com");
        assert_eq!(log.list(Some("all")).await.unwrap().len(), 30);
    }

    #[tokio::test]
    async fn malformed_cursor_does_not_clear() {
        let db = Database::open_in_memory().await.unwrap();
        db.append_event(EventKind::TotpSet, "ann@example.com", "").await.unwrap();
        let log = AuditLog::new(db.clone());

        assert!(log.clear(Some("not-a-time")).await.is_err());
        assert_eq!(db.count_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn clear_returns_pre_clear_listing() {
        let db = Database::open_in_memory().await.unwrap();
        db.append_event(EventKind::TotpSet, "ann@example.com", "").await.unwrap();
        let log = AuditLog::new(db);

        let listing = log.clear(None).await.unwrap();
        assert_eq!(listing.len(), 1);
        assert_eq!(listing[0].event, "TOTP set");

        let after = log.list(None).await.unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].value, "1 events cleared");
    }
}
