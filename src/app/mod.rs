use chrono::Utc;
use pgbootstrap_core::{
    AdminConnector, AdminSession, BootstrapResult, InstallConfig, MigrationEngine,
    MigrationOutcome, MigrationTarget, SecretSource,
};
use std::time::Instant;

mod provision;
pub use provision::{ProvisionAction, ProvisionPlan};

mod report;
pub use report::InstallReport;

/// `Installer` runs the whole bootstrap sequence against a server: check for
/// the database, create or recreate it, then hand off to the migration engine
/// exactly once.
#[derive(Debug, Clone)]
pub struct Installer<A, M> {
    admin: A,
    engine: M,
}

impl<A, M> Installer<A, M>
where
    A: AdminConnector,
    M: MigrationEngine,
{
    pub fn new(admin: A, engine: M) -> Self {
        Self { admin, engine }
    }

    /// Run the bootstrap sequence for `config`, resolving a secret password
    /// through `secrets`.
    ///
    /// Configuration is validated before anything connects.  The server-level
    /// session is closed before the migration engine connects, whether or not
    /// provisioning succeeded.
    pub async fn run<S>(&self, config: &InstallConfig, secrets: &S) -> BootstrapResult<InstallReport>
    where
        S: SecretSource + ?Sized,
    {
        let started_at = Utc::now();
        let timer = Instant::now();

        let descriptor = config.descriptor()?;
        let credentials = config.credentials(secrets)?;
        log::info!(
            target: "pgbootstrap",
            "bootstrapping database {} on {} as {}",
            descriptor.database(),
            descriptor.server(),
            credentials.username()
        );

        let mut session = self
            .admin
            .connect_admin(descriptor.server(), &credentials)
            .await?;
        let provisioned =
            provision::provision(&mut session, &descriptor, config.allow_deletion).await;
        session.close().await?;
        let (action, database) = provisioned?;

        let target = MigrationTarget {
            server: descriptor.server().clone(),
            database,
            schema: descriptor.schema().cloned(),
        };
        log::info!(target: "pgbootstrap", "migrating {}", target.url());
        let summary = self.engine.migrate(&target, &credentials).await?;

        let report = InstallReport::new(
            &descriptor,
            target.database,
            action,
            summary,
            started_at,
            timer.elapsed(),
        );

        Ok(report)
    }

    /// [`Installer::run`], logging how it ended and pairing the result with
    /// the outcome that picks the exit code.
    pub async fn run_outcome<S>(
        &self,
        config: &InstallConfig,
        secrets: &S,
    ) -> (MigrationOutcome, BootstrapResult<InstallReport>)
    where
        S: SecretSource + ?Sized,
    {
        let result = self.run(config, secrets).await;
        let outcome = match &result {
            Ok(report) => {
                log::info!(target: "pgbootstrap", "{report}");
                MigrationOutcome::Success
            }
            Err(e) => {
                let outcome = MigrationOutcome::from(e);
                log::error!(target: "pgbootstrap", "{outcome}: {e}");
                outcome
            }
        };

        (outcome, result)
    }
}
