//! Inputs for one bootstrap run.
use crate::connection::{Collation, ConnectionDescriptor, ConnectionInput};
use crate::credentials::{Credentials, PasswordSource, SecretSource};
use crate::error::{BootstrapResult, Error};

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Raw settings for a run, before validation.
///
/// [`InstallConfig::descriptor`] and [`InstallConfig::credentials`] turn these
/// into validated values.  Neither touches the network.
#[derive(Debug, Clone)]
pub struct InstallConfig {
    pub connection: ConnectionInput,
    /// Name of the database to create or update.  Optional only when
    /// `connection` is a [`ConnectionInput::DatabaseUrl`].
    pub database: Option<String>,
    pub schema: Option<String>,
    pub collation: Collation,
    pub username: String,
    pub password: PasswordSource,
    /// Drop and recreate the database if it already exists.
    pub allow_deletion: bool,
}

impl InstallConfig {
    /// Start a configuration with the required settings and defaults for the
    /// rest.
    pub fn new(
        connection: ConnectionInput,
        database: impl Into<String>,
        username: impl Into<String>,
        password: PasswordSource,
    ) -> Self {
        Self {
            connection,
            database: Some(database.into()),
            schema: None,
            collation: Collation::default(),
            username: username.into(),
            password,
            allow_deletion: false,
        }
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = collation;
        self
    }

    /// Authorize dropping an existing database before creating it again.
    pub fn allow_deletion(mut self, allow: bool) -> Self {
        self.allow_deletion = allow;
        self
    }

    pub fn descriptor(&self) -> BootstrapResult<ConnectionDescriptor> {
        ConnectionDescriptor::new(
            &self.connection,
            self.database.as_deref(),
            self.schema.as_deref(),
            self.collation,
        )
    }

    pub fn credentials<S: SecretSource + ?Sized>(&self, secrets: &S) -> BootstrapResult<Credentials> {
        let password = self.password.resolve(secrets)?;
        Credentials::new(self.username.clone(), password)
    }
}

/// Verbosity of the bootstrap logs.
///
/// This is handed to whatever installs the logger and to the driver's
/// statement logging; nothing in the library changes the global log level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
    Off,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
            Self::Off => log::LevelFilter::Off,
        }
    }
}

impl FromStr for LogLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" | "WARNING" => Ok(Self::Warning),
            "ERROR" => Ok(Self::Error),
            "OFF" => Ok(Self::Off),
            other => Err(Error::invalid(format!(
                "unknown log level `{other}`, expected one of DEBUG, INFO, WARNING, ERROR, OFF"
            ))),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Off => write!(f, "OFF"),
        }
    }
}
