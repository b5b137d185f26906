//! Settings store.
//!
//! Settings are flat key/value rows, except `WhitelistedUsers`, which is
//! always derived from the whitelist table and never written here.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::ServiceError;
use crate::storage::Database;

pub const DEFAULT_SERVICE_NAME: &str = "Bifröst VPN";
pub const DEFAULT_CLIENT_LIMIT: i64 = 2;
pub const DEFAULT_CERT_DURATION_DAYS: i64 = 90;

const KEY_SERVICE_NAME: &str = "ServiceName";
const KEY_CLIENT_LIMIT: &str = "ClientLimit";
const KEY_CERT_DURATION: &str = "IssuedCertDuration";
const KEY_DOMAINS: &str = "WhitelistedDomains";

/// A fully populated settings snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub service_name: String,
    pub client_limit: i64,
    /// Validity of issued certificates, in days.
    pub issued_cert_duration: i64,
    pub whitelisted_domains: BTreeSet<String>,
    #[serde(default)]
    pub whitelisted_users: BTreeSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            client_limit: DEFAULT_CLIENT_LIMIT,
            issued_cert_duration: DEFAULT_CERT_DURATION_DAYS,
            whitelisted_domains: BTreeSet::new(),
            whitelisted_users: BTreeSet::new(),
        }
    }
}

impl Settings {
    /// Check the writable fields.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.service_name.trim().is_empty() {
            return Err(ServiceError::InvalidArgument(
                "ServiceName must not be empty".into(),
            ));
        }
        // The name is the TOTP issuer, which cannot carry a colon.
        if self.service_name.contains(':') {
            return Err(ServiceError::InvalidArgument(format!(
                "ServiceName must not contain ':', got {:?}",
                self.service_name
            )));
        }
        if self.client_limit < 0 {
            return Err(ServiceError::InvalidArgument(format!(
                "ClientLimit must not be negative, got {}",
                self.client_limit
            )));
        }
        if self.issued_cert_duration < 1 {
            return Err(ServiceError::InvalidArgument(format!(
                "IssuedCertDuration must be at least one day, got {}",
                self.issued_cert_duration
            )));
        }
        if let Some(bad) = self
            .whitelisted_domains
            .iter()
            .find(|d| d.is_empty() || d.chars().any(char::is_whitespace))
        {
            return Err(ServiceError::InvalidArgument(format!(
                "invalid whitelisted domain {bad:?}"
            )));
        }
        Ok(())
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64, ServiceError> {
    value.trim().parse().map_err(|_| {
        ServiceError::IntegrityViolation(format!("stored {key} is not an integer: {value:?}"))
    })
}

/// Reads and writes the settings snapshot.
#[derive(Clone)]
pub struct SettingsStore {
    db: Database,
}

impl SettingsStore {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }

    /// Load the current snapshot, backfilling defaults for absent keys.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<Settings, ServiceError> {
        let stored: BTreeMap<String, String> = self
            .db
            .list_settings()
            .await?
            .into_iter()
            .map(|row| (row.key, row.value))
            .collect();

        let mut settings = Settings::default();
        if let Some(name) = stored.get(KEY_SERVICE_NAME) {
            settings.service_name.clone_from(name);
        }
        if let Some(limit) = stored.get(KEY_CLIENT_LIMIT) {
            settings.client_limit = parse_int(KEY_CLIENT_LIMIT, limit)?;
        }
        if let Some(days) = stored.get(KEY_CERT_DURATION) {
            settings.issued_cert_duration = parse_int(KEY_CERT_DURATION, days)?;
        }
        if let Some(domains) = stored.get(KEY_DOMAINS) {
            settings.whitelisted_domains = domains
                .split(' ')
                .filter(|d| !d.is_empty())
                .map(str::to_string)
                .collect();
        }

        settings.whitelisted_users = self
            .db
            .list_whitelist()
            .await?
            .into_iter()
            .map(|entry| entry.email)
            .filter(|email| !email.is_empty())
            .collect();

        Ok(settings)
    }

    /// Validate and persist the writable fields of `settings`.
    ///
    /// `whitelisted_users` is ignored.
    #[instrument(skip(self, settings))]
    pub async fn store(&self, settings: &Settings) -> Result<(), ServiceError> {
        settings.validate()?;

        let domains = settings
            .whitelisted_domains
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        self.db
            .put_settings(&[
                (KEY_SERVICE_NAME, settings.service_name.clone()),
                (KEY_CLIENT_LIMIT, settings.client_limit.to_string()),
                (KEY_CERT_DURATION, settings.issued_cert_duration.to_string()),
                (KEY_DOMAINS, domains),
            ])
            .await?;

        info!(
            service_name = %settings.service_name,
            client_limit = settings.client_limit,
            duration_days = settings.issued_cert_duration,
            "Settings updated"
        );
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn store() -> (Database, SettingsStore) {
        let db = Database::open_in_memory().await.unwrap();
        (db.clone(), SettingsStore::new(db))
    }

    fn domains(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|d| (*d).to_string()).collect()
    }

    #[tokio::test]
    async fn empty_store_loads_defaults() {
        let (_, store) = store().await;
        let settings = store.load().await.unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.service_name, "Bifröst VPN");
    }

    #[tokio::test]
    async fn store_then_load_round_trips_except_users() {
        let (db, store) = store().await;
        db.add_whitelisted("carol@example.com").await.unwrap();

        let written = Settings {
            service_name: "Corp VPN".into(),
            client_limit: 5,
            issued_cert_duration: 30,
            whitelisted_domains: domains(&["example.com", "corp.example"]),
            whitelisted_users: domains(&["ignored@example.com"]),
        };
        store.store(&written).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.service_name, written.service_name);
        assert_eq!(loaded.client_limit, 5);
        assert_eq!(loaded.issued_cert_duration, 30);
        assert_eq!(loaded.whitelisted_domains, written.whitelisted_domains);
        assert_eq!(loaded.whitelisted_users, domains(&["carol@example.com"]));
    }

    #[tokio::test]
    async fn stored_domains_drop_empty_tokens() {
        let (db, store) = store().await;
        db.put_settings(&[(KEY_DOMAINS, "  b.example  a.example ".into())])
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.whitelisted_domains, domains(&["a.example", "b.example"]));
    }

    #[tokio::test]
    async fn unparsable_integer_is_integrity_violation() {
        let (db, store) = store().await;
        db.put_settings(&[(KEY_CLIENT_LIMIT, "lots".into())]).await.unwrap();

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, ServiceError::IntegrityViolation(_)));
    }

    #[tokio::test]
    async fn invalid_settings_are_rejected_without_writing() {
        let (db, store) = store().await;
        let cases = [
            Settings {
                service_name: String::new(),
                ..Settings::default()
            },
            Settings {
                service_name: "Acme: VPN".into(),
                ..Settings::default()
            },
            Settings {
                client_limit: -1,
                ..Settings::default()
            },
            Settings {
                issued_cert_duration: 0,
                ..Settings::default()
            },
            Settings {
                whitelisted_domains: domains(&["two words"]),
                ..Settings::default()
            },
        ];

        for case in &cases {
            let err = store.store(case).await.unwrap_err();
            assert!(matches!(err, ServiceError::InvalidArgument(_)), "{case:?}");
        }
        assert!(db.list_settings().await.unwrap().is_empty());
    }

    #[test]
    fn json_uses_pascal_case_and_defaults_users() {
        let parsed: Settings = serde_json::from_str(
            r#"{"ServiceName":"X","ClientLimit":1,"IssuedCertDuration":7,"WhitelistedDomains":["b","a"]}"#,
        )
        .unwrap();
        assert!(parsed.whitelisted_users.is_empty());
        assert_eq!(
            serde_json::to_value(&parsed).unwrap()["WhitelistedDomains"],
            serde_json::json!(["a", "b"])
        );
    }
}
