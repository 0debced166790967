//! Migration events.

use crate::event_data::{MigrationEventData, MigratorConnectionEventData, MigratorEventData};
use crate::event_id::EventId;
use crate::logger::DiagnosticsLogger;
use sqlmodel_core::{DbConnection, Result};

impl DiagnosticsLogger {
    /// The migrator is about to run against `connection`.
    pub fn migrate_using_connection(&self, connection: &DbConnection) -> Result<()> {
        self.dispatch_log_only(EventId::MigrateUsingConnection, |definition| {
            MigratorConnectionEventData {
                definition,
                message: |e| {
                    format!(
                        "Migrating using database '{}' on server '{}'.",
                        e.database, e.data_source
                    )
                },
                context: self.context(),
                connection_id: connection.id(),
                database: connection.database().to_string(),
                data_source: connection.data_source().to_string(),
            }
        })
    }

    pub fn migration_applying(&self, migration_id: &str) -> Result<()> {
        self.dispatch_log_only(EventId::MigrationApplying, |definition| MigrationEventData {
            definition,
            message: |e| format!("Applying migration '{}'.", e.migration_id),
            context: self.context(),
            migration_id: migration_id.to_string(),
        })
    }

    pub fn migration_reverting(&self, migration_id: &str) -> Result<()> {
        self.dispatch_log_only(EventId::MigrationReverting, |definition| MigrationEventData {
            definition,
            message: |e| format!("Reverting migration '{}'.", e.migration_id),
            context: self.context(),
            migration_id: migration_id.to_string(),
        })
    }

    /// The database was already at `target_migration` (or at the latest).
    pub fn migrations_not_applied(&self, target_migration: Option<&str>) -> Result<()> {
        self.dispatch_log_only(EventId::MigrationsNotApplied, |definition| {
            MigratorEventData {
                definition,
                message: |_| {
                    "No migrations were applied. The database is already up to date.".to_string()
                },
                context: self.context(),
                target_migration: target_migration.map(str::to_string),
                location: None,
            }
        })
    }

    /// No migrations exist at `location`.
    pub fn migrations_not_found(&self, location: &str) -> Result<()> {
        self.dispatch_log_only(EventId::MigrationsNotFound, |definition| MigratorEventData {
            definition,
            message: |e| {
                format!(
                    "No migrations were found in '{}'.",
                    e.location.as_deref().unwrap_or_default()
                )
            },
            context: self.context(),
            target_migration: None,
            location: Some(location.to_string()),
        })
    }
}
