use pgbootstrap::cli::{CliOpts, failure_line, success_line};
use pgbootstrap::executor::{SqlxPgBackend, SqlxPgMigrator};
use pgbootstrap::{EnvSecretSource, Error, Installer, MigrationOutcome};

use anyhow::Context;
use std::process::ExitCode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A missing `.env` is not an error.
    dotenvy::dotenv().ok();
    let opts = CliOpts::new();

    let mut env = env_logger::Builder::from_default_env();
    match opts.log_level {
        Some(level) => {
            env.filter(None, pgbootstrap::LogLevel::from(level).to_level_filter());
        }
        None if std::env::var_os("RUST_LOG").is_none() => {
            env.filter(None, log::LevelFilter::Info);
        }
        None => {}
    }
    env.init();

    match run(&opts).await {
        Ok(code) => code,
        Err(e) => {
            log::error!(target: "pgbootstrap", "{e:#}");
            match e.downcast_ref::<Error>() {
                Some(err) => {
                    eprintln!("{}", failure_line(err));
                    ExitCode::from(MigrationOutcome::from(err).exit_code())
                }
                None => ExitCode::from(MigrationOutcome::InvalidConfiguration.exit_code()),
            }
        }
    }
}

/// Run the installer; only option errors come back as `Err`.
async fn run(opts: &CliOpts) -> anyhow::Result<ExitCode> {
    let settings = opts.settings().context("reading options")?;
    let level = settings.effective_log_level();

    let admin = SqlxPgBackend::new().with_log_level(level);
    let engine = SqlxPgMigrator::new(&settings.migrations_dir)
        .with_baseline_version(settings.baseline_version)
        .with_log_level(level);

    let (outcome, result) = Installer::new(admin, engine)
        .run_outcome(&settings.config, &EnvSecretSource)
        .await;
    match result {
        Ok(report) => println!(
            "{}",
            success_line(report.database().as_str(), report.migrations_applied())
        ),
        Err(e) => eprintln!("{}", failure_line(&e)),
    }

    Ok(ExitCode::from(outcome.exit_code()))
}
