//! How to reach the server, and which database (and schema) on it to
//! bootstrap.
//!
//! Everything in here is a pure function of its inputs.  Input that cannot be
//! turned into a [`ConnectionDescriptor`] fails with [`Error::Invalid`] before
//! anything touches the network.
use crate::error::{BootstrapResult, Error};

use regex::Regex;
use serde::Serialize;
use std::fmt::{self, Display, Formatter};
use std::sync::OnceLock;

/// Scheme used when the server is given as a discrete host and port.
pub const DEFAULT_SCHEME: &str = "postgresql";
/// Schema the server puts unqualified objects in when none is configured.
pub const DEFAULT_SCHEMA: &str = "public";
/// Longest identifier the server keeps without truncating (`NAMEDATALEN - 1`).
pub const MAX_IDENTIFIER_LEN: usize = 63;

const EXAMPLE_URL: &str = "postgresql://localhost:5432/";

fn server_url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-:]*)://(?P<host>[^/\s@]+):(?P<port>\d+)/")
            .expect("server url regex is valid")
    })
}

/// A base address for the server, with no database segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerAddress {
    scheme: String,
    host: String,
    port: u16,
}

impl ServerAddress {
    /// Build the address from a discrete host and port.
    pub fn from_host_port(host: &str, port: u16) -> BootstrapResult<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(Error::invalid("the database host must not be empty"));
        }
        if port == 0 {
            return Err(Error::invalid("the database port must be a positive integer"));
        }

        Ok(Self {
            scheme: DEFAULT_SCHEME.to_string(),
            host: host.to_string(),
            port,
        })
    }

    /// Parse `<scheme>://<host>:<port>/`, discarding anything that follows the
    /// separator after the port.
    ///
    /// Backslashes are read as forward slashes.
    pub fn parse(raw: &str) -> BootstrapResult<Self> {
        let (address, _) = Self::parse_with_rest(raw)?;
        Ok(address)
    }

    fn parse_with_rest(raw: &str) -> BootstrapResult<(Self, String)> {
        let normalized = raw.trim().replace('\\', "/");
        let invalid = || {
            Error::invalid(format!(
                "the connection string is invalid: {}. \
                 Here is an example of a valid format: {EXAMPLE_URL}",
                redact_userinfo(raw)
            ))
        };

        let captures = server_url_re().captures(&normalized).ok_or_else(invalid)?;
        let port = captures["port"]
            .parse::<u16>()
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(invalid)?;
        let end = captures.get(0).map(|m| m.end()).ok_or_else(invalid)?;

        let address = Self {
            scheme: captures["scheme"].to_string(),
            host: captures["host"].to_string(),
            port,
        };

        Ok((address, normalized[end..].to_string()))
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `<scheme>://<host>:<port>/`.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}/", self.scheme, self.host, self.port)
    }

    /// The base URL followed by the database segment.
    pub fn database_url(&self, database: &DatabaseName) -> String {
        format!("{}{}", self.base_url(), database.as_str())
    }
}

impl Display for ServerAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url())
    }
}

/// The accepted ways of telling us where the server is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionInput {
    /// Discrete host and port.
    HostPort { host: String, port: u16 },
    /// `<scheme>://<host>:<port>/`.
    ServerUrl(String),
    /// `<scheme>://<host>:<port>/<database>[?params]`.  The database segment
    /// names the target when no name is given explicitly.
    DatabaseUrl(String),
}

impl ConnectionInput {
    /// Resolve the server address, and a database name if the input carried
    /// one.
    pub fn normalize(&self) -> BootstrapResult<(ServerAddress, Option<String>)> {
        match self {
            Self::HostPort { host, port } => {
                Ok((ServerAddress::from_host_port(host, *port)?, None))
            }
            Self::ServerUrl(raw) => {
                let (address, rest) = ServerAddress::parse_with_rest(raw)?;
                if !rest.is_empty() {
                    log::debug!(
                        target: "pgbootstrap",
                        "ignoring trailing `{}` after server address {address}",
                        rest.split('?').next().unwrap_or_default()
                    );
                }
                Ok((address, None))
            }
            Self::DatabaseUrl(raw) => {
                let (address, rest) = ServerAddress::parse_with_rest(raw)?;
                let database = rest
                    .split('?')
                    .next()
                    .map(|s| s.trim_end_matches('/'))
                    .filter(|s| !s.is_empty() && !s.contains('/'))
                    .map(str::to_string);
                Ok((address, database))
            }
        }
    }
}

/// Mask anything that looks like `user:password@` so a rejected connection
/// string can be echoed back safely.
fn redact_userinfo(raw: &str) -> String {
    match (raw.find("://"), raw.rfind('@')) {
        (Some(start), Some(at)) if at > start => {
            format!("{}://***{}", &raw[..start], &raw[at..])
        }
        (None, Some(at)) => format!("***{}", &raw[at..]),
        _ => raw.to_string(),
    }
}

fn validate_identifier(what: &str, value: &str) -> BootstrapResult<()> {
    if value.is_empty() {
        return Err(Error::invalid(format!("the {what} name must not be empty")));
    }
    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(Error::invalid(format!(
            "the {what} name `{value}` is longer than {MAX_IDENTIFIER_LEN} bytes"
        )));
    }
    if value.contains('\0') {
        return Err(Error::invalid(format!(
            "the {what} name must not contain a NUL character"
        )));
    }

    Ok(())
}

/// Name of the target database, exactly as the user spelled it.
///
/// Any other character is allowed: names only ever reach DDL through the
/// server's own identifier quoting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DatabaseName(String);

impl DatabaseName {
    pub fn new(name: impl Into<String>) -> BootstrapResult<Self> {
        let name = name.into();
        validate_identifier("database", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison, matching how the existence check looks
    /// names up.
    pub fn matches(&self, other: &str) -> bool {
        self.0.to_lowercase() == other.to_lowercase()
    }
}

impl Display for DatabaseName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Default schema for the migration engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SchemaName(String);

impl SchemaName {
    pub fn new(name: impl Into<String>) -> BootstrapResult<Self> {
        let name = name.into();
        validate_identifier("schema", &name)?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SchemaName {
    fn default() -> Self {
        Self(DEFAULT_SCHEMA.to_string())
    }
}

impl Display for SchemaName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collation (and character classification) of a newly created database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum Collation {
    /// Whatever the server's template database uses.
    #[default]
    Default,
    /// The `C` locale: byte order comparison.
    C,
    /// `en_US.UTF-8`.
    Utf8,
}

impl Collation {
    /// The locale name for `LC_COLLATE`/`LC_CTYPE`, `None` for the server
    /// default.
    pub fn locale(&self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::C => Some("C"),
            Self::Utf8 => Some("en_US.UTF-8"),
        }
    }
}

impl Display for Collation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.locale() {
            Some(locale) => f.write_str(locale),
            None => f.write_str("default"),
        }
    }
}

/// Everything needed to reach the target database, validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    server: ServerAddress,
    database: DatabaseName,
    schema: Option<SchemaName>,
    collation: Collation,
}

impl ConnectionDescriptor {
    /// Normalize `input` and combine it with the target names.
    ///
    /// An explicit, non-empty `database` wins over one carried by a
    /// [`ConnectionInput::DatabaseUrl`].
    pub fn new(
        input: &ConnectionInput,
        database: Option<&str>,
        schema: Option<&str>,
        collation: Collation,
    ) -> BootstrapResult<Self> {
        let (server, from_url) = input.normalize()?;
        let database = database
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or(from_url)
            .ok_or_else(|| Error::invalid("a database name is required"))?;
        let database = DatabaseName::new(database)?;
        let schema = schema
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(SchemaName::new)
            .transpose()?;

        Ok(Self {
            server,
            database,
            schema,
            collation,
        })
    }

    pub fn server(&self) -> &ServerAddress {
        &self.server
    }

    pub fn database(&self) -> &DatabaseName {
        &self.database
    }

    /// The schema given, if any.
    pub fn schema(&self) -> Option<&SchemaName> {
        self.schema.as_ref()
    }

    /// The schema given, or the server's conventional default.
    pub fn schema_or_default(&self) -> SchemaName {
        self.schema.clone().unwrap_or_default()
    }

    pub fn collation(&self) -> Collation {
        self.collation
    }

    /// The database-scoped URL.
    pub fn database_url(&self) -> String {
        self.server.database_url(&self.database)
    }
}
