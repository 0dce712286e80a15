//! Core types and interfaces for bootstrapping a database before migrating
//! it.
pub mod backend;
pub mod config;
pub mod connection;
pub mod credentials;
pub mod error;
pub mod outcome;

pub use backend::{
    AdminConnector, AdminSession, MigrationEngine, MigrationSummary, MigrationTarget,
};
pub use config::{InstallConfig, LogLevel};
pub use connection::{
    Collation, ConnectionDescriptor, ConnectionInput, DatabaseName, SchemaName, ServerAddress,
};
pub use credentials::{Credentials, EnvSecretSource, Password, PasswordSource, SecretSource};
pub use error::{BootstrapResult, Error, ErrorKind, Operation};
pub use outcome::MigrationOutcome;
