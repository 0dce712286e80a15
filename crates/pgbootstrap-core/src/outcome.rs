use crate::error::{BootstrapResult, Error, ErrorKind};

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// How a bootstrap run ended, for picking the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MigrationOutcome {
    Success,
    AuthenticationFailure,
    ProvisioningFailure,
    MigrationEngineFailure,
    InvalidConfiguration,
}

impl MigrationOutcome {
    pub fn from_result<T>(result: &BootstrapResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) => Self::from(e),
        }
    }

    /// `0` on success, `1` when the server could not be reached or refused
    /// the credentials, `2` for everything else.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Success => 0,
            Self::AuthenticationFailure => 1,
            Self::ProvisioningFailure
            | Self::MigrationEngineFailure
            | Self::InvalidConfiguration => 2,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<ErrorKind> for MigrationOutcome {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::InvalidConfiguration => Self::InvalidConfiguration,
            ErrorKind::AuthenticationFailure => Self::AuthenticationFailure,
            ErrorKind::ProvisioningFailure => Self::ProvisioningFailure,
            ErrorKind::MigrationEngineFailure => Self::MigrationEngineFailure,
        }
    }
}

impl From<&Error> for MigrationOutcome {
    fn from(error: &Error) -> Self {
        Self::from(error.kind())
    }
}

impl Display for MigrationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::AuthenticationFailure => write!(f, "authentication failure"),
            Self::ProvisioningFailure => write!(f, "provisioning failure"),
            Self::MigrationEngineFailure => write!(f, "migration engine failure"),
            Self::InvalidConfiguration => write!(f, "invalid configuration"),
        }
    }
}
