//! `SQLite` storage for the identity service.
//!
//! Persists identities, the certificate ledger, the whitelist, settings and
//! the audit trail. Every mutation that must be audited writes its event in
//! the same transaction as the change itself.

mod db;
mod models;
mod queries_certs;
mod queries_events;
mod queries_identities;
mod queries_settings;
mod queries_whitelist;

#[cfg(test)]
mod tests;

pub use db::{Database, DatabaseError};
pub use models::*;
pub use queries_certs::NewCertificate;
