//! The seams between the bootstrap sequence and the database.
//!
//! [`AdminConnector`] opens the server-level session used for the existence
//! check and DDL.  [`MigrationEngine`] is the single hand-off to whatever
//! applies versioned migrations.
//!
//! The returned futures are not required to be `Send`; drive them on the
//! calling task.
use crate::connection::{Collation, DatabaseName, SchemaName, ServerAddress};
use crate::credentials::Credentials;
use crate::error::BootstrapResult;

use serde::Serialize;
use std::future::Future;

/// Opens a connection to the server's administrative database.
pub trait AdminConnector {
    type Session: AdminSession;

    /// Connect to the server (not to the target database, which may not
    /// exist).  A failure here is an authentication/connectivity failure.
    fn connect_admin(
        &self,
        server: &ServerAddress,
        credentials: &Credentials,
    ) -> impl Future<Output = BootstrapResult<Self::Session>>;
}

/// A server-level session.
///
/// Every statement runs against the administrative database.  The session is
/// consumed by [`AdminSession::close`] so it is released before the migration
/// connection is opened.
pub trait AdminSession {
    /// Look up a database by name, ignoring case.
    ///
    /// Returns the name as it is stored in the catalog.
    fn find_database(
        &mut self,
        name: &DatabaseName,
    ) -> impl Future<Output = BootstrapResult<Option<String>>>;

    /// Whether a database by that name exists, ignoring case.
    fn database_exists(
        &mut self,
        name: &DatabaseName,
    ) -> impl Future<Output = BootstrapResult<bool>> {
        async move { Ok(self.find_database(name).await?.is_some()) }
    }

    /// `CREATE DATABASE`, with the locale of `collation` unless it is the
    /// server default.
    fn create_database(
        &mut self,
        name: &DatabaseName,
        collation: Collation,
    ) -> impl Future<Output = BootstrapResult<()>>;

    /// `DROP DATABASE` by its catalog name.
    fn drop_database(
        &mut self,
        name: &DatabaseName,
    ) -> impl Future<Output = BootstrapResult<()>>;

    /// Close the session.
    fn close(self) -> impl Future<Output = BootstrapResult<()>>;
}

/// Where the migration engine should run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationTarget {
    pub server: ServerAddress,
    /// The database as it is named on the server.
    pub database: DatabaseName,
    /// Default schema for the engine's history table and the scripts.  `None`
    /// uses the server's default.
    pub schema: Option<SchemaName>,
}

impl MigrationTarget {
    /// The database-scoped URL.
    pub fn url(&self) -> String {
        self.server.database_url(&self.database)
    }
}

/// What the migration engine did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    /// Migrations applied by this run.
    pub applied: usize,
    /// Whether existing, untracked schema state was recorded as the baseline.
    pub baselined: bool,
}

/// The external migration engine.
pub trait MigrationEngine {
    /// Bring `target` to the latest version.  Called exactly once per run,
    /// after the database is known to exist.
    fn migrate(
        &self,
        target: &MigrationTarget,
        credentials: &Credentials,
    ) -> impl Future<Output = BootstrapResult<MigrationSummary>>;
}
