//! The server-level session: existence check and `CREATE`/`DROP DATABASE`.
//!
//! Database names and locales never get spliced into DDL on this side.  The
//! statement text is produced by the server's `format()` with `%I` (identifier)
//! and `%L` (literal) quoting from bound parameters, then executed as is.
use super::classify::AdminResult as _;
use super::{ADMIN_DATABASE, connect_options, statement_log_level};

use pgbootstrap_core::{
    AdminConnector, AdminSession, BootstrapResult, Collation, Credentials, DatabaseName, LogLevel,
    Operation, ServerAddress,
};

use log::LevelFilter;
use sqlx::{Connection, PgConnection};

/// Exact-case matches win when names differ only by case.
pub(crate) const FIND_DATABASE: &str = "
SELECT datname::text
FROM pg_catalog.pg_database
WHERE lower(datname::text) = lower($1::text)
ORDER BY datname::text = $1::text DESC, datname
LIMIT 1;
";

pub(crate) const FORMAT_CREATE_DATABASE: &str = "SELECT format('CREATE DATABASE %I', $1::text);";

pub(crate) const FORMAT_CREATE_DATABASE_WITH_LOCALE: &str = "
SELECT format(
  'CREATE DATABASE %I TEMPLATE template0 LC_COLLATE=%L LC_CTYPE=%L',
  $1::text,
  $2::text,
  $2::text
);
";

pub(crate) const FORMAT_DROP_DATABASE: &str = "SELECT format('DROP DATABASE %I', $1::text);";

/// Connects server-level sessions with `sqlx`.
#[derive(Debug, Clone)]
pub struct SqlxPgBackend {
    statements: LevelFilter,
}

impl Default for SqlxPgBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlxPgBackend {
    pub fn new() -> Self {
        Self {
            statements: statement_log_level(LogLevel::default()),
        }
    }

    /// Log executed statements according to `level`.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.statements = statement_log_level(level);
        self
    }
}

impl AdminConnector for SqlxPgBackend {
    type Session = SqlxPgAdmin;

    async fn connect_admin(
        &self,
        server: &ServerAddress,
        credentials: &Credentials,
    ) -> BootstrapResult<SqlxPgAdmin> {
        log::debug!(
            target: "pgbootstrap",
            "connecting to {server}{ADMIN_DATABASE} as {}",
            credentials.username()
        );
        let options = connect_options(server, credentials, ADMIN_DATABASE, self.statements);
        let conn = PgConnection::connect_with(&options)
            .await
            .admin_result(Operation::ExistenceCheck, ADMIN_DATABASE)?;

        Ok(SqlxPgAdmin { conn })
    }
}

/// A server-level `sqlx::PgConnection`.
pub struct SqlxPgAdmin {
    conn: PgConnection,
}

impl SqlxPgAdmin {
    /// Have the server quote the arguments into a DDL statement.
    async fn format_ddl(
        &mut self,
        template: &str,
        args: &[&str],
        operation: Operation,
        database: &str,
    ) -> BootstrapResult<String> {
        let mut query = sqlx::query_scalar::<_, String>(template);
        for arg in args {
            query = query.bind(*arg);
        }

        query
            .fetch_one(&mut self.conn)
            .await
            .admin_result(operation, database)
    }

    async fn execute_ddl(
        &mut self,
        ddl: &str,
        operation: Operation,
        database: &str,
    ) -> BootstrapResult<()> {
        log::debug!(target: "pgbootstrap", "executing `{ddl}`");
        sqlx::raw_sql(ddl)
            .execute(&mut self.conn)
            .await
            .admin_result(operation, database)?;

        Ok(())
    }
}

impl AdminSession for SqlxPgAdmin {
    async fn find_database(&mut self, name: &DatabaseName) -> BootstrapResult<Option<String>> {
        let found = sqlx::query_scalar::<_, String>(FIND_DATABASE)
            .bind(name.as_str())
            .fetch_optional(&mut self.conn)
            .await
            .admin_result(Operation::ExistenceCheck, name.as_str())?;

        log::info!(target: "pgbootstrap", "database {name} exists: {}", found.is_some());
        Ok(found)
    }

    async fn create_database(
        &mut self,
        name: &DatabaseName,
        collation: Collation,
    ) -> BootstrapResult<()> {
        let db = name.as_str();
        let ddl = match collation.locale() {
            Some(locale) => {
                self.format_ddl(
                    FORMAT_CREATE_DATABASE_WITH_LOCALE,
                    &[db, locale],
                    Operation::CreateDatabase,
                    db,
                )
                .await?
            }
            None => {
                self.format_ddl(FORMAT_CREATE_DATABASE, &[db], Operation::CreateDatabase, db)
                    .await?
            }
        };
        self.execute_ddl(&ddl, Operation::CreateDatabase, db).await?;

        log::info!(target: "pgbootstrap", "created new database {name} (collation {collation})");
        Ok(())
    }

    async fn drop_database(&mut self, name: &DatabaseName) -> BootstrapResult<()> {
        let db = name.as_str();
        let ddl = self
            .format_ddl(FORMAT_DROP_DATABASE, &[db], Operation::DropDatabase, db)
            .await?;
        self.execute_ddl(&ddl, Operation::DropDatabase, db).await?;

        log::info!(target: "pgbootstrap", "deleted database {name}");
        Ok(())
    }

    async fn close(self) -> BootstrapResult<()> {
        // The socket is gone either way; a failed goodbye is not worth
        // failing the run for.
        if let Err(e) = self.conn.close().await {
            log::warn!(target: "pgbootstrap", "closing the server-level connection: {e}");
        }

        Ok(())
    }
}
