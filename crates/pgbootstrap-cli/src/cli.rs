use pgbootstrap_core::{
    BootstrapResult, Collation, ConnectionInput, Error, InstallConfig, LogLevel, Password,
    PasswordSource,
};

use clap::{ArgGroup, Parser, ValueEnum};
use std::convert::Infallible;
use std::path::PathBuf;

/// Create (or recreate) a PostgreSQL database if needed, then run its
/// migrations.
///
/// Every option can also be set from the environment, and a `.env` file in
/// the working directory is read first.
#[derive(Debug, Parser)]
#[command(version, about)]
#[command(group(
    ArgGroup::new("server")
        .required(true)
        .args(["db_host", "db_connection", "db_connection_url"]),
))]
#[command(group(
    ArgGroup::new("password")
        .required(true)
        .args(["db_pass", "db_secret_keys"]),
))]
pub struct CliOpts {
    /// Host name of the database server; requires `--db-port`
    #[arg(long, env = "DB_HOST", requires = "db_port")]
    pub db_host: Option<String>,
    /// Port of the database server; requires `--db-host`
    #[arg(
        long,
        env = "DB_PORT",
        requires = "db_host",
        value_parser = clap::value_parser!(u16).range(1..),
    )]
    pub db_port: Option<u16>,
    /// Server address in the form `<scheme>://<host>:<port>/`
    #[arg(long, env = "DB_CONNECTION")]
    pub db_connection: Option<String>,
    /// Database URL in the form `<scheme>://<host>:<port>/<database>`; the
    /// database segment is used when `--db-name` is absent
    #[arg(long, env = "DB_CONNECTION_URL")]
    pub db_connection_url: Option<String>,
    /// User to connect as
    #[arg(long, env = "DB_USER")]
    pub db_user: String,
    /// Password of the user
    #[arg(long, env = "DB_PASS", hide_env_values = true, value_parser = parse_password)]
    pub db_pass: Option<Password>,
    /// Comma separated secret names holding the password; the first with a
    /// value wins
    #[arg(long, env = "DB_SECRET_KEYS", value_delimiter = ',')]
    pub db_secret_keys: Vec<String>,
    /// Name of the database to create or update
    #[arg(long, env = "DB_NAME", required_unless_present = "db_connection_url")]
    pub db_name: Option<String>,
    /// Drop and recreate the database if it already exists
    #[arg(long = "force-deletion", visible_alias = "fd", env = "DB_FORCE_DELETION")]
    pub force_deletion: bool,
    /// Verbosity of the logs; `RUST_LOG` is used when absent
    #[arg(long, env = "LOG_LEVEL", value_enum, ignore_case = true)]
    pub log_level: Option<LogLevelArg>,
    /// Default schema for the migrations and their history table
    #[arg(long, env = "DB_SCHEMA")]
    pub schema: Option<String>,
    /// Collation of a newly created database
    #[arg(long, env = "DB_COLLATION", value_enum, ignore_case = true, default_value_t)]
    pub collation: CollationArg,
    /// Directory of versioned migration scripts
    #[arg(long, env = "MIGRATIONS_DIR", default_value = "migrations")]
    pub migrations: PathBuf,
    /// When the schema has objects but no migration history, record the
    /// migrations up through this version as already applied
    #[arg(long, env = "BASELINE_VERSION", default_value_t = 1)]
    pub baseline_version: i64,
}

impl CliOpts {
    /// Parse the options from the command line and environment.
    pub fn new() -> Self {
        Self::parse()
    }

    /// Convert to the library configuration.
    ///
    /// This only rearranges what was given; names and addresses are validated
    /// when the run starts.
    pub fn settings(&self) -> BootstrapResult<Settings> {
        let connection = self.connection_input()?;
        let password = match (&self.db_pass, self.db_secret_keys.as_slice()) {
            (Some(pass), []) => PasswordSource::Literal(pass.clone()),
            (None, keys) if !keys.is_empty() => PasswordSource::SecretKeys(keys.to_vec()),
            (Some(_), _) => {
                return Err(Error::invalid(
                    "give either a password or secret keys, not both",
                ));
            }
            (None, _) => return Err(Error::invalid("a password or secret keys are required")),
        };

        let mut config = InstallConfig::new(
            connection,
            self.db_name.clone().unwrap_or_default(),
            self.db_user.clone(),
            password,
        )
        .with_collation(self.collation.into())
        .allow_deletion(self.force_deletion);
        // A database URL may carry the name instead.
        config.database = self.db_name.clone();
        if let Some(schema) = self.schema.as_ref() {
            config = config.with_schema(schema.clone());
        }

        log::debug!(
            target: "pgbootstrap",
            "configured {} server input, collation {}, force deletion {}",
            self.connection_form(),
            config.collation,
            config.allow_deletion
        );
        Ok(Settings {
            config,
            log_level: self.log_level.map(Into::into),
            migrations_dir: self.migrations.clone(),
            baseline_version: self.baseline_version,
        })
    }

    fn connection_form(&self) -> &'static str {
        if self.db_connection_url.is_some() {
            "database url"
        } else if self.db_connection.is_some() {
            "server url"
        } else {
            "host/port"
        }
    }

    fn connection_input(&self) -> BootstrapResult<ConnectionInput> {
        match (
            self.db_host.as_ref(),
            self.db_port,
            self.db_connection.as_ref(),
            self.db_connection_url.as_ref(),
        ) {
            (Some(host), Some(port), None, None) => Ok(ConnectionInput::HostPort {
                host: host.clone(),
                port,
            }),
            (None, None, Some(url), None) => Ok(ConnectionInput::ServerUrl(url.clone())),
            (None, None, None, Some(url)) => Ok(ConnectionInput::DatabaseUrl(url.clone())),
            (Some(_), None, _, _) | (None, Some(_), _, _) => Err(Error::invalid(
                "--db-host and --db-port must be given together",
            )),
            (None, None, None, None) => Err(Error::invalid(
                "one of --db-host/--db-port, --db-connection or --db-connection-url is required",
            )),
            _ => Err(Error::invalid(
                "give only one of --db-host/--db-port, --db-connection or --db-connection-url",
            )),
        }
    }
}

fn parse_password(value: &str) -> Result<Password, Infallible> {
    Ok(Password::new(value))
}

/// Everything the binary needs for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: InstallConfig,
    /// `None` leaves the filter to `RUST_LOG`.
    pub log_level: Option<LogLevel>,
    pub migrations_dir: PathBuf,
    pub baseline_version: i64,
}

impl Settings {
    /// The level handed to the backends' statement logging.
    pub fn effective_log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum LogLevelArg {
    Debug,
    Info,
    #[value(alias = "WARN")]
    Warning,
    Error,
    Off,
}

impl From<LogLevelArg> for LogLevel {
    fn from(value: LogLevelArg) -> Self {
        match value {
            LogLevelArg::Debug => LogLevel::Debug,
            LogLevelArg::Info => LogLevel::Info,
            LogLevelArg::Warning => LogLevel::Warning,
            LogLevelArg::Error => LogLevel::Error,
            LogLevelArg::Off => LogLevel::Off,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum CollationArg {
    /// The server default
    #[default]
    Default,
    /// Byte order (`C`)
    C,
    /// `en_US.UTF-8`
    Utf8,
}

impl From<CollationArg> for Collation {
    fn from(value: CollationArg) -> Self {
        match value {
            CollationArg::Default => Collation::Default,
            CollationArg::C => Collation::C,
            CollationArg::Utf8 => Collation::Utf8,
        }
    }
}
