use super::provision::ProvisionAction;

use pgbootstrap_core::{
    Collation, ConnectionDescriptor, DatabaseName, MigrationSummary, SchemaName,
};

use chrono::{DateTime, Utc};
use display_json::{DebugAsJson, DisplayAsJsonPretty};
use serde::Serialize;
use std::time::Duration;

/// Summary of a clean run.
#[derive(Clone, Serialize, DebugAsJson, DisplayAsJsonPretty)]
pub struct InstallReport {
    server: String,
    requested_database: DatabaseName,
    database: DatabaseName,
    schema: SchemaName,
    collation: Collation,
    action: ProvisionAction,
    baselined: bool,
    migrations_applied: usize,
    started_at: DateTime<Utc>,
    duration_ms: u64,
}

impl InstallReport {
    pub(super) fn new(
        descriptor: &ConnectionDescriptor,
        database: DatabaseName,
        action: ProvisionAction,
        summary: MigrationSummary,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        Self {
            server: descriptor.server().base_url(),
            requested_database: descriptor.database().clone(),
            database,
            schema: descriptor.schema_or_default(),
            collation: descriptor.collation(),
            action,
            baselined: summary.baselined,
            migrations_applied: summary.applied,
            started_at,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// The database as it is named on the server.
    pub fn database(&self) -> &DatabaseName {
        &self.database
    }

    pub fn requested_database(&self) -> &DatabaseName {
        &self.requested_database
    }

    pub fn action(&self) -> ProvisionAction {
        self.action
    }

    pub fn baselined(&self) -> bool {
        self.baselined
    }

    pub fn migrations_applied(&self) -> usize {
        self.migrations_applied
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}
