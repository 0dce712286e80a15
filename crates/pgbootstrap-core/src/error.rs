use std::error::Error as StdError;
use std::fmt;

/// Alias for a result whose error type is [`Error`].
pub type BootstrapResult<T> = Result<T, Error>;
type BoxDynError = Box<dyn StdError + Send + Sync + 'static>;

/// All the ways a bootstrap run can end in failure.
///
/// The underlying driver error, when there is one, is only reachable through
/// [`std::error::Error::source`]. Callers are expected to branch on
/// [`Error::kind`] and nothing finer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Malformed or contradictory input, found before any network call.
    #[error("invalid configuration: {0}")]
    Invalid(String),
    /// Credentials were rejected, or the server could not be reached.
    #[error("could not authenticate with the database server: {0}")]
    Authentication(#[source] BoxDynError),
    /// The existence check or a `CREATE`/`DROP DATABASE` statement failed.
    #[error("{operation} failed for database {database}: {source}")]
    Provisioning {
        operation: Operation,
        database: String,
        #[source]
        source: BoxDynError,
    },
    /// The migration engine could not apply the migration set.
    #[error("migrating database {database} failed: {source}")]
    MigrationEngine {
        database: String,
        #[source]
        source: BoxDynError,
    },
}

impl Error {
    /// The closed classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Invalid(_) => ErrorKind::InvalidConfiguration,
            Self::Authentication(_) => ErrorKind::AuthenticationFailure,
            Self::Provisioning { .. } => ErrorKind::ProvisioningFailure,
            Self::MigrationEngine { .. } => ErrorKind::MigrationEngineFailure,
        }
    }

    /// Shorthand for building an [`Error::Invalid`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }

    /// An error raised by this crate rather than by a driver, in a context
    /// that would otherwise need a boxed source.
    pub fn message(msg: impl Into<String>) -> BoxDynError {
        msg.into().into()
    }
}

/// Kinds of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidConfiguration,
    AuthenticationFailure,
    ProvisioningFailure,
    MigrationEngineFailure,
}

/// The provisioning step an [`Error::Provisioning`] happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ExistenceCheck,
    CreateDatabase,
    DropDatabase,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExistenceCheck => write!(f, "existence check"),
            Self::CreateDatabase => write!(f, "create database"),
            Self::DropDatabase => write!(f, "drop database"),
        }
    }
}

/// Converting a result with a generic `std::error::Error` to one with this
/// crate's error type.
pub trait ProvisionError<T> {
    fn auth_result(self) -> BootstrapResult<T>;
    fn provision_result(self, operation: Operation, database: &str) -> BootstrapResult<T>;
    fn engine_result(self, database: &str) -> BootstrapResult<T>;
}

impl<T, E> ProvisionError<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn auth_result(self) -> BootstrapResult<T> {
        self.map_err(|e| Error::Authentication(Box::new(e)))
    }

    fn provision_result(self, operation: Operation, database: &str) -> BootstrapResult<T> {
        self.map_err(|e| Error::Provisioning {
            operation,
            database: database.to_string(),
            source: Box::new(e),
        })
    }

    fn engine_result(self, database: &str) -> BootstrapResult<T> {
        self.map_err(|e| Error::MigrationEngine {
            database: database.to_string(),
            source: Box::new(e),
        })
    }
}
