use pgbootstrap_core::{AdminSession, BootstrapResult, ConnectionDescriptor, DatabaseName};

use serde::Serialize;
use std::fmt::{self, Display, Formatter};

/// What to do with the target database given what the existence check found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPlan {
    /// Not there yet.
    Create,
    /// Already there, and deletion was not authorized.
    Skip,
    /// Already there, and deletion was authorized.
    DropThenCreate,
}

impl ProvisionPlan {
    pub fn decide(exists: bool, allow_deletion: bool) -> Self {
        match (exists, allow_deletion) {
            (false, _) => Self::Create,
            (true, false) => Self::Skip,
            (true, true) => Self::DropThenCreate,
        }
    }
}

/// What provisioning did, as recorded in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProvisionAction {
    Created,
    Recreated,
    Skipped,
}

impl Display for ProvisionAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Recreated => write!(f, "recreated"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Check for the database and create or recreate it as needed.
///
/// Returns the action taken and the name to migrate: the catalog's spelling
/// when an existing database was kept, the requested one otherwise.
pub(crate) async fn provision<S: AdminSession>(
    session: &mut S,
    descriptor: &ConnectionDescriptor,
    allow_deletion: bool,
) -> BootstrapResult<(ProvisionAction, DatabaseName)> {
    let requested = descriptor.database();
    let found = session.find_database(requested).await?;
    let plan = ProvisionPlan::decide(found.is_some(), allow_deletion);
    log::debug!(target: "pgbootstrap", "provisioning plan for {requested}: {plan:?}");

    match (plan, found) {
        (ProvisionPlan::Skip, Some(existing)) => {
            if existing != requested.as_str() {
                log::info!(
                    target: "pgbootstrap",
                    "database {requested} exists as {existing}, using that name"
                );
            }
            Ok((ProvisionAction::Skipped, DatabaseName::new(existing)?))
        }
        (ProvisionPlan::DropThenCreate, Some(existing)) => {
            log::warn!(target: "pgbootstrap", "force deletion is set, dropping database {existing}");
            session.drop_database(&DatabaseName::new(existing)?).await?;
            session
                .create_database(requested, descriptor.collation())
                .await?;
            Ok((ProvisionAction::Recreated, requested.clone()))
        }
        _ => {
            session
                .create_database(requested, descriptor.collation())
                .await?;
            Ok((ProvisionAction::Created, requested.clone()))
        }
    }
}
