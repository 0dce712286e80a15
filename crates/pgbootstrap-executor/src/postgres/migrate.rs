//! The hand-off to `sqlx::migrate::Migrator`.
//!
//! The engine runs on a database-scoped connection.  When a schema is
//! configured it is created if missing and becomes the only entry in
//! `search_path`, so the history table `_sqlx_migrations` and every
//! unqualified object in the scripts land there.
use super::{connect_options, statement_log_level};

use pgbootstrap_core::error::ProvisionError as _;
use pgbootstrap_core::{
    BootstrapResult, Credentials, Error, LogLevel, MigrationEngine, MigrationSummary,
    MigrationTarget, SchemaName,
};

use log::LevelFilter;
use sqlx::migrate::{Migration, Migrator};
use sqlx::{Connection, PgConnection};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Default directory of versioned scripts.
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
/// Default highest version recorded as applied when baselining.
pub const DEFAULT_BASELINE_VERSION: i64 = 1;

const FORMAT_CREATE_SCHEMA: &str = "SELECT format('CREATE SCHEMA IF NOT EXISTS %I', $1::text);";

const SET_SEARCH_PATH: &str = "SELECT set_config('search_path', quote_ident($1::text), false);";

const HISTORY_EXISTS: &str = "
SELECT EXISTS (
  SELECT 1
  FROM pg_catalog.pg_tables
  WHERE schemaname = current_schema()
    AND tablename = '_sqlx_migrations'
);
";

/// Any relation (table, view, sequence, index...), type or routine in the
/// current schema.
const SCHEMA_HAS_OBJECTS: &str = "
WITH ns AS (
  SELECT oid FROM pg_catalog.pg_namespace WHERE nspname = current_schema()
)
SELECT EXISTS (SELECT 1 FROM pg_catalog.pg_class c JOIN ns ON c.relnamespace = ns.oid)
    OR EXISTS (SELECT 1 FROM pg_catalog.pg_type t JOIN ns ON t.typnamespace = ns.oid)
    OR EXISTS (SELECT 1 FROM pg_catalog.pg_proc p JOIN ns ON p.pronamespace = ns.oid);
";

/// The same table `sqlx` creates on first run.
const CREATE_HISTORY: &str = "
CREATE TABLE IF NOT EXISTS _sqlx_migrations (
  version BIGINT PRIMARY KEY,
  description TEXT NOT NULL,
  installed_on TIMESTAMPTZ NOT NULL DEFAULT now(),
  success BOOLEAN NOT NULL,
  checksum BYTEA NOT NULL,
  execution_time BIGINT NOT NULL
);
";

const INSERT_BASELINE: &str = "
INSERT INTO _sqlx_migrations (version, description, success, checksum, execution_time)
VALUES ($1, $2, TRUE, $3, 0)
ON CONFLICT (version) DO NOTHING;
";

const SELECT_APPLIED: &str =
    "SELECT version, checksum FROM _sqlx_migrations WHERE success ORDER BY version;";

/// Runs the scripts in a directory with `sqlx`'s migrator.
#[derive(Debug, Clone)]
pub struct SqlxPgMigrator {
    migrations_dir: PathBuf,
    baseline_version: i64,
    statements: LevelFilter,
}

impl Default for SqlxPgMigrator {
    fn default() -> Self {
        Self::new(DEFAULT_MIGRATIONS_DIR)
    }
}

impl SqlxPgMigrator {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            baseline_version: DEFAULT_BASELINE_VERSION,
            statements: statement_log_level(LogLevel::default()),
        }
    }

    /// Record migrations up through `version` as applied when baselining a
    /// schema that already has objects but no history.
    pub fn with_baseline_version(mut self, version: i64) -> Self {
        self.baseline_version = version;
        self
    }

    /// Log executed statements according to `level`.
    pub fn with_log_level(mut self, level: LogLevel) -> Self {
        self.statements = statement_log_level(level);
        self
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn baseline_version(&self) -> i64 {
        self.baseline_version
    }

    async fn use_schema(
        &self,
        conn: &mut PgConnection,
        schema: &SchemaName,
        database: &str,
    ) -> BootstrapResult<()> {
        let ddl = sqlx::query_scalar::<_, String>(FORMAT_CREATE_SCHEMA)
            .bind(schema.as_str())
            .fetch_one(&mut *conn)
            .await
            .engine_result(database)?;
        sqlx::raw_sql(&ddl)
            .execute(&mut *conn)
            .await
            .engine_result(database)?;

        sqlx::query_scalar::<_, String>(SET_SEARCH_PATH)
            .bind(schema.as_str())
            .fetch_one(&mut *conn)
            .await
            .engine_result(database)?;

        log::debug!(target: "pgbootstrap", "using schema {schema} in {database}");
        Ok(())
    }

    /// Initialize the history from existing schema state, if that is needed.
    async fn baseline(
        &self,
        conn: &mut PgConnection,
        migrator: &Migrator,
        database: &str,
    ) -> BootstrapResult<bool> {
        let has_history = sqlx::query_scalar::<_, bool>(HISTORY_EXISTS)
            .fetch_one(&mut *conn)
            .await
            .engine_result(database)?;
        if has_history {
            return Ok(false);
        }

        let has_objects = sqlx::query_scalar::<_, bool>(SCHEMA_HAS_OBJECTS)
            .fetch_one(&mut *conn)
            .await
            .engine_result(database)?;
        if !has_objects {
            return Ok(false);
        }

        let baselined = baseline_set(migrator.iter(), self.baseline_version);
        log::info!(
            target: "pgbootstrap",
            "baselining {database} at version {} ({} migrations recorded)",
            self.baseline_version,
            baselined.len()
        );

        let mut tx = conn.begin().await.engine_result(database)?;
        sqlx::raw_sql(CREATE_HISTORY)
            .execute(&mut *tx)
            .await
            .engine_result(database)?;
        for migration in baselined {
            sqlx::query(INSERT_BASELINE)
                .bind(migration.version)
                .bind(&*migration.description)
                .bind(&*migration.checksum)
                .execute(&mut *tx)
                .await
                .engine_result(database)?;
        }
        tx.commit().await.engine_result(database)?;

        Ok(true)
    }

    async fn applied(
        &self,
        conn: &mut PgConnection,
        database: &str,
    ) -> BootstrapResult<HashMap<i64, Vec<u8>>> {
        let has_history = sqlx::query_scalar::<_, bool>(HISTORY_EXISTS)
            .fetch_one(&mut *conn)
            .await
            .engine_result(database)?;
        if !has_history {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, (i64, Vec<u8>)>(SELECT_APPLIED)
            .fetch_all(&mut *conn)
            .await
            .engine_result(database)?;

        Ok(rows.into_iter().collect())
    }
}

impl MigrationEngine for SqlxPgMigrator {
    async fn migrate(
        &self,
        target: &MigrationTarget,
        credentials: &Credentials,
    ) -> BootstrapResult<MigrationSummary> {
        let database = target.database.as_str();
        let migrator = Migrator::new(self.migrations_dir.as_path())
            .await
            .engine_result(database)?;
        log::debug!(
            target: "pgbootstrap",
            "loaded {} migrations from {}",
            migrator.iter().count(),
            self.migrations_dir.display()
        );

        let options = connect_options(&target.server, credentials, database, self.statements);
        let mut conn = PgConnection::connect_with(&options)
            .await
            .engine_result(database)?;

        if let Some(schema) = target.schema.as_ref() {
            self.use_schema(&mut conn, schema, database).await?;
        }

        let baselined = self.baseline(&mut conn, &migrator, database).await?;
        let before = self.applied(&mut conn, database).await?;
        let applied = pending(migrator.iter(), &before);

        log::info!(target: "pgbootstrap", "running {applied} pending migrations on {database}");
        migrator.run(&mut conn).await.engine_result(database)?;

        let after = self.applied(&mut conn, database).await?;
        if let Err(e) = unapplied(migrator.iter(), &after) {
            conn.close().await.ok();
            return Err(Error::MigrationEngine {
                database: database.to_string(),
                source: Error::message(e),
            });
        }

        if let Err(e) = conn.close().await {
            log::warn!(target: "pgbootstrap", "closing the connection to {database}: {e}");
        }

        log::info!(target: "pgbootstrap", "database {database} is up to date");
        Ok(MigrationSummary { applied, baselined })
    }
}

fn up_migrations<'a>(
    migrations: impl Iterator<Item = &'a Migration>,
) -> impl Iterator<Item = &'a Migration> {
    migrations.filter(|m| !m.migration_type.is_down_migration())
}

/// Up migrations recorded as applied when baselining at `version`.
fn baseline_set<'a>(
    migrations: impl Iterator<Item = &'a Migration>,
    version: i64,
) -> Vec<&'a Migration> {
    up_migrations(migrations)
        .filter(|m| m.version <= version)
        .collect()
}

/// Number of up migrations missing from `applied`.
fn pending<'a>(
    migrations: impl Iterator<Item = &'a Migration>,
    applied: &HashMap<i64, Vec<u8>>,
) -> usize {
    up_migrations(migrations)
        .filter(|m| !applied.contains_key(&m.version))
        .count()
}

/// Check that every up migration was applied with the checksum of its
/// source.
fn unapplied<'a>(
    migrations: impl Iterator<Item = &'a Migration>,
    applied: &HashMap<i64, Vec<u8>>,
) -> Result<(), String> {
    for migration in up_migrations(migrations) {
        match applied.get(&migration.version) {
            None => {
                return Err(format!(
                    "migration {} ({}) is not recorded as applied",
                    migration.version, migration.description
                ));
            }
            Some(checksum) if checksum.as_slice() != &*migration.checksum => {
                return Err(format!(
                    "migration {} ({}) was applied with a different checksum",
                    migration.version, migration.description
                ));
            }
            Some(_) => {}
        }
    }

    Ok(())
}
