//! Event identifiers and logger categories.
//!
//! Every diagnostics event has a stable [`EventId`]. The id determines the
//! event's category, its default level, and the dotted name under which the
//! payload is published on the [`DiagnosticListener`](crate::DiagnosticListener).

use crate::level::LogLevel;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Groups events the way log filters see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoggerCategory {
    /// Opening, closing and failing connections.
    Connection,
    /// Creating and executing commands, reading results.
    Command,
    /// Beginning, committing and rolling back transactions.
    Transaction,
    /// Applying and reverting migrations.
    Migrations,
    /// Batching of pending changes.
    Update,
    /// Warnings raised while validating the model.
    ModelValidation,
}

impl LoggerCategory {
    /// Dotted category name, used as the `category` field of log records.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            LoggerCategory::Connection => "sqlmodel.database.connection",
            LoggerCategory::Command => "sqlmodel.database.command",
            LoggerCategory::Transaction => "sqlmodel.database.transaction",
            LoggerCategory::Migrations => "sqlmodel.migrations",
            LoggerCategory::Update => "sqlmodel.update",
            LoggerCategory::ModelValidation => "sqlmodel.model.validation",
        }
    }
}

impl fmt::Display for LoggerCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Identifies one kind of diagnostics event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventId {
    // Connection events
    ConnectionOpening,
    ConnectionOpened,
    ConnectionClosing,
    ConnectionClosed,
    ConnectionError,

    // Command events
    CommandCreating,
    CommandCreated,
    CommandInitialized,
    CommandExecuting,
    CommandExecuted,
    CommandError,
    CommandCanceled,
    DataReaderClosing,
    DataReaderDisposing,

    // Transaction events
    TransactionStarting,
    TransactionStarted,
    TransactionUsed,
    TransactionCommitting,
    TransactionCommitted,
    TransactionRollingBack,
    TransactionRolledBack,
    TransactionDisposed,
    TransactionError,

    // Migration events
    MigrateUsingConnection,
    MigrationApplying,
    MigrationReverting,
    MigrationsNotApplied,
    MigrationsNotFound,

    // Update events
    BatchReadyForExecution,
    BatchSmallerThanMinBatchSize,

    // Model validation warnings
    KeyDefaultValueWarning,
    BoolWithDefaultWarning,
}

impl EventId {
    /// All event ids, in declaration order.
    pub const ALL: [EventId; 32] = [
        EventId::ConnectionOpening,
        EventId::ConnectionOpened,
        EventId::ConnectionClosing,
        EventId::ConnectionClosed,
        EventId::ConnectionError,
        EventId::CommandCreating,
        EventId::CommandCreated,
        EventId::CommandInitialized,
        EventId::CommandExecuting,
        EventId::CommandExecuted,
        EventId::CommandError,
        EventId::CommandCanceled,
        EventId::DataReaderClosing,
        EventId::DataReaderDisposing,
        EventId::TransactionStarting,
        EventId::TransactionStarted,
        EventId::TransactionUsed,
        EventId::TransactionCommitting,
        EventId::TransactionCommitted,
        EventId::TransactionRollingBack,
        EventId::TransactionRolledBack,
        EventId::TransactionDisposed,
        EventId::TransactionError,
        EventId::MigrateUsingConnection,
        EventId::MigrationApplying,
        EventId::MigrationReverting,
        EventId::MigrationsNotApplied,
        EventId::MigrationsNotFound,
        EventId::BatchReadyForExecution,
        EventId::BatchSmallerThanMinBatchSize,
        EventId::KeyDefaultValueWarning,
        EventId::BoolWithDefaultWarning,
    ];

    #[must_use]
    pub const fn category(&self) -> LoggerCategory {
        match self {
            EventId::ConnectionOpening
            | EventId::ConnectionOpened
            | EventId::ConnectionClosing
            | EventId::ConnectionClosed
            | EventId::ConnectionError => LoggerCategory::Connection,
            EventId::CommandCreating
            | EventId::CommandCreated
            | EventId::CommandInitialized
            | EventId::CommandExecuting
            | EventId::CommandExecuted
            | EventId::CommandError
            | EventId::CommandCanceled
            | EventId::DataReaderClosing
            | EventId::DataReaderDisposing => LoggerCategory::Command,
            EventId::TransactionStarting
            | EventId::TransactionStarted
            | EventId::TransactionUsed
            | EventId::TransactionCommitting
            | EventId::TransactionCommitted
            | EventId::TransactionRollingBack
            | EventId::TransactionRolledBack
            | EventId::TransactionDisposed
            | EventId::TransactionError => LoggerCategory::Transaction,
            EventId::MigrateUsingConnection
            | EventId::MigrationApplying
            | EventId::MigrationReverting
            | EventId::MigrationsNotApplied
            | EventId::MigrationsNotFound => LoggerCategory::Migrations,
            EventId::BatchReadyForExecution | EventId::BatchSmallerThanMinBatchSize => {
                LoggerCategory::Update
            }
            EventId::KeyDefaultValueWarning | EventId::BoolWithDefaultWarning => {
                LoggerCategory::ModelValidation
            }
        }
    }

    /// Level used when no override is configured.
    #[must_use]
    pub const fn default_level(&self) -> LogLevel {
        match self {
            EventId::CommandExecuted
            | EventId::MigrateUsingConnection
            | EventId::MigrationApplying
            | EventId::MigrationReverting
            | EventId::MigrationsNotApplied
            | EventId::MigrationsNotFound => LogLevel::Info,
            EventId::KeyDefaultValueWarning | EventId::BoolWithDefaultWarning => LogLevel::Warn,
            EventId::ConnectionError | EventId::CommandError | EventId::TransactionError => {
                LogLevel::Error
            }
            _ => LogLevel::Debug,
        }
    }

    /// Whether this event is a warning, i.e. subject to the default warning behavior.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.default_level(), LogLevel::Warn)
    }

    /// Stable dotted name; the key events are published under.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            EventId::ConnectionOpening => "sqlmodel.database.connection.opening",
            EventId::ConnectionOpened => "sqlmodel.database.connection.opened",
            EventId::ConnectionClosing => "sqlmodel.database.connection.closing",
            EventId::ConnectionClosed => "sqlmodel.database.connection.closed",
            EventId::ConnectionError => "sqlmodel.database.connection.error",
            EventId::CommandCreating => "sqlmodel.database.command.creating",
            EventId::CommandCreated => "sqlmodel.database.command.created",
            EventId::CommandInitialized => "sqlmodel.database.command.initialized",
            EventId::CommandExecuting => "sqlmodel.database.command.executing",
            EventId::CommandExecuted => "sqlmodel.database.command.executed",
            EventId::CommandError => "sqlmodel.database.command.error",
            EventId::CommandCanceled => "sqlmodel.database.command.canceled",
            EventId::DataReaderClosing => "sqlmodel.database.command.data_reader_closing",
            EventId::DataReaderDisposing => "sqlmodel.database.command.data_reader_disposing",
            EventId::TransactionStarting => "sqlmodel.database.transaction.starting",
            EventId::TransactionStarted => "sqlmodel.database.transaction.started",
            EventId::TransactionUsed => "sqlmodel.database.transaction.used",
            EventId::TransactionCommitting => "sqlmodel.database.transaction.committing",
            EventId::TransactionCommitted => "sqlmodel.database.transaction.committed",
            EventId::TransactionRollingBack => "sqlmodel.database.transaction.rolling_back",
            EventId::TransactionRolledBack => "sqlmodel.database.transaction.rolled_back",
            EventId::TransactionDisposed => "sqlmodel.database.transaction.disposed",
            EventId::TransactionError => "sqlmodel.database.transaction.error",
            EventId::MigrateUsingConnection => "sqlmodel.migrations.migrate_using_connection",
            EventId::MigrationApplying => "sqlmodel.migrations.applying",
            EventId::MigrationReverting => "sqlmodel.migrations.reverting",
            EventId::MigrationsNotApplied => "sqlmodel.migrations.not_applied",
            EventId::MigrationsNotFound => "sqlmodel.migrations.not_found",
            EventId::BatchReadyForExecution => "sqlmodel.update.batch_ready_for_execution",
            EventId::BatchSmallerThanMinBatchSize => {
                "sqlmodel.update.batch_smaller_than_min_batch_size"
            }
            EventId::KeyDefaultValueWarning => "sqlmodel.model.validation.key_default_value",
            EventId::BoolWithDefaultWarning => "sqlmodel.model.validation.bool_with_default",
        }
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn names_are_unique_and_prefixed_by_category() {
        let mut seen = HashSet::new();
        for id in EventId::ALL {
            assert!(seen.insert(id.name()), "duplicate name {}", id.name());
            assert!(
                id.name().starts_with(id.category().name()),
                "{} is not under {}",
                id.name(),
                id.category()
            );
        }
    }

    #[test]
    fn default_levels() {
        assert_eq!(EventId::CommandExecuting.default_level(), LogLevel::Debug);
        assert_eq!(EventId::CommandExecuted.default_level(), LogLevel::Info);
        assert_eq!(EventId::CommandError.default_level(), LogLevel::Error);
        assert!(EventId::BoolWithDefaultWarning.is_warning());
        assert!(!EventId::ConnectionOpening.is_warning());
    }

    #[test]
    fn serde_names_are_snake_case() {
        let json = serde_json::to_string(&EventId::BatchReadyForExecution).unwrap();
        assert_eq!(json, "\"batch_ready_for_execution\"");
        let id: EventId = serde_json::from_str("\"transaction_rolled_back\"").unwrap();
        assert_eq!(id, EventId::TransactionRolledBack);
    }
}
