use self::runner::{MIGRATIONS, SERVER, TestServer};

use pgbootstrap::executor::{SqlxPgBackend, SqlxPgMigrator};
use pgbootstrap::{
    AdminConnector, AdminSession, BootstrapResult, Collation, Credentials, DatabaseName,
    EnvSecretSource, ErrorKind, Installer, MigrationEngine, MigrationOutcome, MigrationSummary,
    MigrationTarget, Password, PasswordSource, ProvisionAction,
};
use std::sync::{Arc, Mutex};

pub mod runner;

macro_rules! server_or_skip {
    () => {
        match SERVER.as_ref() {
            Some(server) => server,
            None => {
                eprintln!("DATABASE_URL is not set, skipping");
                return;
            }
        }
    };
}

/// Notes whether the history table exists when the engine is handed the
/// database, then runs the real migrator.
struct HistoryCheck {
    server: &'static TestServer,
    engine: SqlxPgMigrator,
    seen: Arc<Mutex<Vec<bool>>>,
}

impl HistoryCheck {
    fn new(server: &'static TestServer) -> Self {
        Self {
            server,
            engine: SqlxPgMigrator::new(MIGRATIONS),
            seen: Arc::default(),
        }
    }
}

impl MigrationEngine for HistoryCheck {
    async fn migrate(
        &self,
        target: &MigrationTarget,
        credentials: &Credentials,
    ) -> BootstrapResult<MigrationSummary> {
        let present = self.server.has_history(target.database.as_str()).await;
        self.seen.lock().unwrap().push(present);
        self.engine.migrate(target, credentials).await
    }
}

fn baselining_at(version: i64) -> Installer<SqlxPgBackend, SqlxPgMigrator> {
    Installer::new(
        SqlxPgBackend::new(),
        SqlxPgMigrator::new(MIGRATIONS).with_baseline_version(version),
    )
}

#[tokio::test]
async fn pgtest_create_then_skip() {
    let server = server_or_skip!();
    let name = "pgbootstrap_scenario";
    server.drop_database(name).await;

    let installer = server.installer();
    let config = server.config(name);

    let first = installer.run(&config, &EnvSecretSource).await.unwrap();
    assert_eq!(first.action(), ProvisionAction::Created);
    assert_eq!(first.migrations_applied(), 2);
    assert_eq!(server.count_users(name).await, 0);

    let second = installer.run(&config, &EnvSecretSource).await.unwrap();
    assert_eq!(second.action(), ProvisionAction::Skipped);
    assert_eq!(second.migrations_applied(), 0);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_existence_ignores_case() {
    let server = server_or_skip!();
    let stored = "PgBootstrap_Case";
    server.drop_database(stored).await;
    server.create_database(stored).await;

    let backend = SqlxPgBackend::new();
    let address = server.config(stored).descriptor().unwrap().server().clone();
    let credentials = server.config(stored).credentials(&EnvSecretSource).unwrap();
    let mut session = backend.connect_admin(&address, &credentials).await.unwrap();
    let found = session
        .find_database(&DatabaseName::new("pgbootstrap_case").unwrap())
        .await
        .unwrap();
    let exists = session
        .database_exists(&DatabaseName::new("PGBOOTSTRAP_CASE").unwrap())
        .await
        .unwrap();
    let missing = session
        .database_exists(&DatabaseName::new("pgbootstrap_case_missing").unwrap())
        .await
        .unwrap();
    session.close().await.unwrap();

    assert_eq!(found.as_deref(), Some(stored));
    assert!(exists);
    assert!(!missing);

    let report = server
        .installer()
        .run(&server.config("PGBOOTSTRAP_CASE"), &EnvSecretSource)
        .await
        .unwrap();
    assert_eq!(report.action(), ProvisionAction::Skipped);
    assert_eq!(report.database().as_str(), stored);
    assert_eq!(server.catalog_names("pgbootstrap_case").await, vec![stored]);

    server.drop_database(stored).await;
}

#[tokio::test]
async fn pgtest_injection_attempt_is_created_literally() {
    let server = server_or_skip!();
    let name = "pgb\"; DROP DATABASE postgres; --";
    server.drop_database(name).await;

    let report = server
        .installer()
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();

    assert_eq!(report.database().as_str(), name);
    assert_eq!(server.catalog_names(&name.to_lowercase()).await, vec![name]);
    assert_eq!(server.catalog_names("postgres").await, vec!["postgres"]);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_collation_c() {
    let server = server_or_skip!();
    let name = "pgbootstrap_collation_c";
    server.drop_database(name).await;

    let config = server.config(name).with_collation(Collation::C);
    server
        .installer()
        .run(&config, &EnvSecretSource)
        .await
        .unwrap();

    assert_eq!(server.collation_of(name).await, "C");

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_force_deletion_empties_the_database() {
    let server = server_or_skip!();
    let name = "pgbootstrap_force";
    server.drop_database(name).await;

    let installer = server.installer();
    installer
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();
    server
        .execute(name, "INSERT INTO users (name, email) VALUES ('ada', 'ada@example.com');")
        .await;
    assert_eq!(server.count_users(name).await, 1);

    let config = server.config(name).allow_deletion(true);
    let report = installer.run(&config, &EnvSecretSource).await.unwrap();

    assert_eq!(report.action(), ProvisionAction::Recreated);
    assert_eq!(report.migrations_applied(), 2);
    assert_eq!(server.count_users(name).await, 0);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_recreated_database_has_no_history_before_migrating() {
    let server = server_or_skip!();
    let name = "pgbootstrap_force_history";
    server.drop_database(name).await;

    let engine = HistoryCheck::new(server);
    let seen = Arc::clone(&engine.seen);
    let installer = Installer::new(SqlxPgBackend::new(), engine);
    installer
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();
    installer
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();
    let config = server.config(name).allow_deletion(true);
    let report = installer.run(&config, &EnvSecretSource).await.unwrap();

    assert_eq!(report.action(), ProvisionAction::Recreated);
    assert_eq!(report.migrations_applied(), 2);
    assert_eq!(seen.lock().unwrap().as_slice(), [false, true, false]);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_existing_tables_are_baselined() {
    let server = server_or_skip!();
    let name = "pgbootstrap_baseline";
    server.drop_database(name).await;
    server.create_database(name).await;
    server
        .execute(name, "CREATE TABLE users (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL);")
        .await;

    let report = server
        .installer()
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();

    assert_eq!(report.action(), ProvisionAction::Skipped);
    assert!(report.baselined());
    assert_eq!(report.migrations_applied(), 1);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_existing_view_is_baselined() {
    let server = server_or_skip!();
    let name = "pgbootstrap_baseline_view";
    server.drop_database(name).await;
    server.create_database(name).await;
    server
        .execute(name, "CREATE VIEW users AS SELECT 1::bigint AS id, 'x'::text AS name;")
        .await;

    let report = baselining_at(2)
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();

    assert!(report.baselined());
    assert_eq!(report.migrations_applied(), 0);
    assert!(server.has_history(name).await);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_existing_function_is_baselined() {
    let server = server_or_skip!();
    let name = "pgbootstrap_baseline_function";
    server.drop_database(name).await;
    server.create_database(name).await;
    server
        .execute(
            name,
            "CREATE FUNCTION legacy_answer() RETURNS int LANGUAGE sql AS 'SELECT 42';",
        )
        .await;

    let report = baselining_at(2)
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();

    assert!(report.baselined());
    assert_eq!(report.migrations_applied(), 0);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_empty_database_is_not_baselined() {
    let server = server_or_skip!();
    let name = "pgbootstrap_baseline_empty";
    server.drop_database(name).await;
    server.create_database(name).await;

    let report = baselining_at(2)
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap();

    assert!(!report.baselined());
    assert_eq!(report.migrations_applied(), 2);

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_schema_is_created_for_the_engine() {
    let server = server_or_skip!();
    let name = "pgbootstrap_schema";
    server.drop_database(name).await;

    let config = server.config(name).with_schema("billing");
    let report = server
        .installer()
        .run(&config, &EnvSecretSource)
        .await
        .unwrap();
    assert_eq!(report.migrations_applied(), 2);

    server
        .execute(name, "SELECT count(*) FROM billing.users, billing._sqlx_migrations;")
        .await;

    server.drop_database(name).await;
}

#[tokio::test]
async fn pgtest_wrong_password_is_an_authentication_failure() {
    let server = server_or_skip!();
    let mut config = server.config("pgbootstrap_never_created");
    config.password = PasswordSource::Literal(Password::new("definitely-not-the-password"));

    let (outcome, result) = server
        .installer()
        .run_outcome(&config, &EnvSecretSource)
        .await;

    // Servers trusting local connections accept any password.
    if outcome.is_success() {
        server.drop_database("pgbootstrap_never_created").await;
        return;
    }
    assert_eq!(outcome, MigrationOutcome::AuthenticationFailure);
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(result.unwrap_err().kind(), ErrorKind::AuthenticationFailure);
}

#[tokio::test]
async fn pgtest_missing_migrations_dir_is_an_engine_failure() {
    let server = server_or_skip!();
    let name = "pgbootstrap_no_migrations";
    server.drop_database(name).await;

    let installer = Installer::new(
        SqlxPgBackend::new(),
        SqlxPgMigrator::new("/nonexistent/pgbootstrap/migrations"),
    );
    let err = installer
        .run(&server.config(name), &EnvSecretSource)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MigrationEngineFailure);

    server.drop_database(name).await;
}
