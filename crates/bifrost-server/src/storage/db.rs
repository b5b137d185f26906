//! Database connection and initialization.

pub use bifrost_core::db::DatabaseError;

bifrost_core::define_database!(Database, "Database migrations complete");
