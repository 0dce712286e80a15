//! Credentials for the server, and resolving a password from a secret store.
use crate::error::{BootstrapResult, Error};

use std::fmt::{self, Debug, Display, Formatter};
use std::path::PathBuf;

/// A password that never prints its value.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret itself, for handing to the driver.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("Password(***)")
    }
}

impl Display for Password {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Username and password for both the server-level and the database-scoped
/// connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: Password,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: Password) -> BootstrapResult<Self> {
        let username = username.into();
        if username.trim().is_empty() {
            return Err(Error::invalid("a database username is required"));
        }

        Ok(Self { username, password })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &Password {
        &self.password
    }
}

/// Where the password comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PasswordSource {
    Literal(Password),
    /// Candidate secret identifiers, tried in order.
    SecretKeys(Vec<String>),
}

impl PasswordSource {
    /// Produce the password, consulting `secrets` for
    /// [`PasswordSource::SecretKeys`].
    pub fn resolve<S: SecretSource + ?Sized>(&self, secrets: &S) -> BootstrapResult<Password> {
        match self {
            Self::Literal(password) => Ok(password.clone()),
            Self::SecretKeys(keys) => resolve_secret(secrets, keys.as_slice()),
        }
    }
}

/// A store that can look up a secret by its identifier.
pub trait SecretSource {
    /// The value of `key`, `Ok(None)` if the store has nothing for it.
    fn lookup(&self, key: &str) -> BootstrapResult<Option<String>>;
}

/// Resolve the first key with a non-empty value.
pub fn resolve_secret<S, K>(secrets: &S, keys: &[K]) -> BootstrapResult<Password>
where
    S: SecretSource + ?Sized,
    K: AsRef<str>,
{
    let keys: Vec<&str> = keys
        .iter()
        .map(|k| k.as_ref().trim())
        .filter(|k| !k.is_empty())
        .collect();
    if keys.is_empty() {
        return Err(Error::invalid("no secret keys were supplied for the database password"));
    }

    for key in &keys {
        match secrets.lookup(key)? {
            Some(value) if !value.is_empty() => {
                log::debug!(target: "pgbootstrap", "database password resolved from secret `{key}`");
                return Ok(Password::new(value));
            }
            _ => log::trace!(target: "pgbootstrap", "secret `{key}` has no value"),
        }
    }

    Err(Error::invalid(format!(
        "none of the secret keys [{}] resolved to a non-empty value",
        keys.join(", ")
    )))
}

/// Secrets from the process environment.
///
/// For a key `K` this reads the variable `K`, and if that is unset or empty,
/// the contents of the file named by `K_FILE` (the convention used for
/// mounted container secrets).  One trailing line break is removed from file
/// contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretSource;

impl SecretSource for EnvSecretSource {
    fn lookup(&self, key: &str) -> BootstrapResult<Option<String>> {
        if let Some(value) = std::env::var(key).ok().filter(|v| !v.is_empty()) {
            return Ok(Some(value));
        }

        let Some(path) = std::env::var_os(format!("{key}_FILE")).map(PathBuf::from) else {
            return Ok(None);
        };
        let content = std::fs::read_to_string(&path).map_err(|e| {
            Error::invalid(format!(
                "could not read secret `{key}` from {}: {e}",
                path.display()
            ))
        })?;
        let value = content
            .strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(content.as_str());

        Ok(Some(value.to_string()))
    }
}
