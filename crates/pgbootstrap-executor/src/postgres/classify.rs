use pgbootstrap_core::error::ProvisionError as _;
use pgbootstrap_core::{BootstrapResult, Operation};

/// Fragments of server or driver messages that mean the credentials were
/// refused or the server was never reached.  Used when no SQLSTATE is
/// available.
const AUTH_HINTS: &[&str] = &[
    "password authentication failed",
    "no pg_hba.conf entry",
    "authentication failed",
    "connection refused",
    "timed out",
];

/// Whether `err` means the credentials were rejected or the server could not
/// be reached, rather than a failure of the statement itself.
///
/// SQLSTATE class `28` is "invalid authorization specification".
pub fn is_auth_failure(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut => true,
        sqlx::Error::Database(db) => match db.code() {
            Some(code) => code.starts_with("28"),
            None => has_auth_hint(db.message()),
        },
        other => has_auth_hint(&other.to_string()),
    }
}

fn has_auth_hint(message: &str) -> bool {
    let message = message.to_lowercase();
    AUTH_HINTS.iter().any(|hint| message.contains(hint))
}

/// Sort a driver error from the server-level session into an authentication
/// or a provisioning failure.
pub(crate) trait AdminResult<T> {
    fn admin_result(self, operation: Operation, database: &str) -> BootstrapResult<T>;
}

impl<T> AdminResult<T> for Result<T, sqlx::Error> {
    fn admin_result(self, operation: Operation, database: &str) -> BootstrapResult<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) if is_auth_failure(&e) => Err(e).auth_result(),
            Err(e) => Err(e).provision_result(operation, database),
        }
    }
}
