//! `sqlx` implementations of the `pgbootstrap-core` backend traits for
//! PostgreSQL.
pub mod postgres;

pub use postgres::{SqlxPgAdmin, SqlxPgBackend, SqlxPgMigrator};
