//! Migration payloads. Migration events are logged and published only.

use super::{impl_capabilities, impl_event_data};
use crate::definition::EventDefinition;
use sqlmodel_core::{ConnectionId, ContextId};

/// The migrator is about to run against a connection.
#[derive(Debug, Clone)]
pub struct MigratorConnectionEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub database: String,
    pub data_source: String,
}

/// A single migration is being applied or reverted.
#[derive(Debug, Clone)]
pub struct MigrationEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub migration_id: String,
}

/// The migrator finished without doing anything.
#[derive(Debug, Clone)]
pub struct MigratorEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    /// Migration the run was asked to reach, if any.
    pub target_migration: Option<String>,
    /// Where migrations were looked up.
    pub location: Option<String>,
}

impl_event_data!(MigratorConnectionEventData, connection);
impl_capabilities!(MigratorConnectionEventData: connection);

impl_event_data!(MigrationEventData);
impl_capabilities!(MigrationEventData: context);

impl_event_data!(MigratorEventData);
impl_capabilities!(MigratorEventData: context);
