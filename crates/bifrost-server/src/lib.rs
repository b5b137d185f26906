//! `Bifrost` identity service.
//!
//! Enrolls VPN users with TOTP secrets, issues and revokes their x509
//! client certificates, and keeps an audit trail of every change.
//!
//! - [`storage`]: `SQLite` persistence
//! - [`service`]: identity registry, certificate ledger, whitelist,
//!   settings and audit log
//! - [`api`]: the HTTP surface

pub mod api;
pub mod config;
pub mod error;
pub mod service;
pub mod storage;

pub use error::ServiceError;
