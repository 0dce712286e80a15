//! PostgreSQL through single, unpooled `sqlx::PgConnection`s.
//!
//! Each phase opens one connection, runs a bounded sequence of statements on
//! it and closes it before the next phase connects.
use pgbootstrap_core::{Credentials, LogLevel, ServerAddress};

use log::LevelFilter;
use sqlx::ConnectOptions;
use sqlx::postgres::PgConnectOptions;

pub mod admin;
mod classify;
pub mod migrate;

pub use admin::{SqlxPgAdmin, SqlxPgBackend};
pub use classify::is_auth_failure;
pub use migrate::{DEFAULT_BASELINE_VERSION, DEFAULT_MIGRATIONS_DIR, SqlxPgMigrator};

/// The administrative database every server has.
pub const ADMIN_DATABASE: &str = "postgres";
/// Reported to the server as `application_name`.
pub const APPLICATION_NAME: &str = "pgbootstrap";

/// Connect options for `database` on `server`.
///
/// Only the host and port of the address are used; its scheme was only
/// validated.
pub(crate) fn connect_options(
    server: &ServerAddress,
    credentials: &Credentials,
    database: &str,
    statements: LevelFilter,
) -> PgConnectOptions {
    let host = server.host().trim_start_matches('[').trim_end_matches(']');

    PgConnectOptions::new_without_pgpass()
        .host(host)
        .port(server.port())
        .username(credentials.username())
        .password(credentials.password().expose())
        .database(database)
        .application_name(APPLICATION_NAME)
        .log_statements(statements)
}

/// Level for statement logging by `sqlx` given the configured verbosity.
///
/// Statements are noise at `INFO`, so they are only shown when running at
/// `DEBUG`.
pub fn statement_log_level(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Debug => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}
