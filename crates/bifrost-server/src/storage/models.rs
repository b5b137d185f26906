//! Data models for Bifrost storage.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub email: String,
    pub seed: String,
    pub created: i64,
    pub updated: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CertificateRecord {
    pub fingerprint: String,
    pub email: String,
    pub description: String,
    pub created: i64,
    pub expires: i64,
    pub revoked: Option<i64>,
}

impl CertificateRecord {
    pub const fn is_revoked(&self) -> bool {
        self.revoked.is_some()
    }
}

/// A certificate joined with the `created` timestamp of its live identity.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct FleetCertificateRow {
    pub identity_created: i64,
    #[sqlx(flatten)]
    pub certificate: CertificateRecord,
}

/// Per-identity certificate counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct IdentitySummary {
    pub email: String,
    pub active_certs: i64,
    pub revoked_certs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WhitelistEntry {
    pub email: String,
    pub modified: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SettingRow {
    pub key: String,
    pub value: String,
    pub modified: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EventRecord {
    pub id: i64,
    pub event: String,
    pub email: String,
    pub value: String,
    pub ts: i64,
}

/// The fixed audit vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    TotpSet,
    UserDeleted,
    CertificateIssued,
    CertificateRevoked,
    EventsLogReset,
}

impl EventKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotpSet => "TOTP set",
            Self::UserDeleted => "user deleted",
            Self::CertificateIssued => "certificate issued",
            Self::CertificateRevoked => "certificate revoked",
            Self::EventsLogReset => "events log reset",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which slice of the audit trail to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventWindow {
    /// The newest `limit` events.
    Latest { limit: i64 },
    /// Up to `limit` events strictly older than `before` (Unix seconds).
    Before { before: i64, limit: i64 },
    /// The whole trail.
    All,
}

/// Outcome of a single-certificate revocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Revocation {
    /// The certificate was active and is now revoked.
    Revoked(CertificateRecord),
    /// The certificate was already revoked; nothing changed.
    AlreadyRevoked(CertificateRecord),
    /// No certificate has this fingerprint.
    Unknown,
}
