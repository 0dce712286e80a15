//! Make sure a PostgreSQL database exists, creating or (when explicitly
//! allowed) recreating it, then bring it up to date with its migrations.
//!
//! The sequence lives in [`Installer`], which is generic over the two seams
//! defined in `pgbootstrap-core`: an [`AdminConnector`] for the server-level
//! work and a [`MigrationEngine`] for the single hand-off to the migrations.
//! The
//! [`executor`] crate implements both with `sqlx`.
//!
//! ```no_run
//! use pgbootstrap::executor::{SqlxPgBackend, SqlxPgMigrator};
//! use pgbootstrap::{ConnectionInput, EnvSecretSource, InstallConfig, Installer, PasswordSource};
//!
//! # async fn run() -> pgbootstrap::BootstrapResult<()> {
//! let config = InstallConfig::new(
//!     ConnectionInput::ServerUrl("postgresql://localhost:5432/".into()),
//!     "orders",
//!     "app",
//!     PasswordSource::SecretKeys(vec!["ORDERS_DB_PASS".into()]),
//! );
//! let installer = Installer::new(SqlxPgBackend::new(), SqlxPgMigrator::new("migrations"));
//! let report = installer.run(&config, &EnvSecretSource).await?;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```
pub mod app;
pub use app::{InstallReport, Installer, ProvisionAction, ProvisionPlan};

pub use pgbootstrap_executor as executor;

pub use pgbootstrap_core::{
    AdminConnector, AdminSession, BootstrapResult, Collation, ConnectionDescriptor,
    ConnectionInput, Credentials, DatabaseName, EnvSecretSource, Error, ErrorKind, InstallConfig,
    LogLevel, MigrationEngine, MigrationOutcome, MigrationSummary, MigrationTarget, Operation,
    Password, PasswordSource, SchemaName, SecretSource, ServerAddress,
};

#[cfg(feature = "cli")]
pub use pgbootstrap_cli as cli;
