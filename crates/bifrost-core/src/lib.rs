//! `Bifrost` Core Library
//!
//! Shared functionality for `Bifrost` components:
//! - `SQLite` pool setup, migrations and the shared `DatabaseError`
//! - Timestamp helpers for the wire format
//! - Tracing initialisation

pub mod db;
pub mod time;
pub mod tracing_init;

pub use db::{DatabaseError, unix_timestamp};
