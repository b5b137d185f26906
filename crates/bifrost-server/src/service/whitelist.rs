//! Whitelist gate.
//!
//! Records which emails are eligible for enrollment. Mutations are
//! idempotent and not audited.

use tracing::{info, instrument};

use crate::error::ServiceError;
use crate::storage::Database;

#[derive(Clone)]
pub struct WhitelistGate {
    db: Database,
}

impl WhitelistGate {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Whitelisted emails, ascending.
    pub async fn list(&self) -> Result<Vec<String>, ServiceError> {
        let entries = self.db.list_whitelist().await?;
        Ok(entries.into_iter().map(|e| e.email).collect())
    }

    #[instrument(skip(self))]
    pub async fn add(&self, email: &str) -> Result<(), ServiceError> {
        self.db.add_whitelisted(email).await?;
        info!(email, "Added to whitelist");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove(&self, email: &str) -> Result<(), ServiceError> {
        if self.db.remove_whitelisted(email).await? {
            info!(email, "Removed from whitelist");
        }
        Ok(())
    }
}
