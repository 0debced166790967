//! Database handles seen by interceptors.
//!
//! These are the "subjects" of interception: the connection being opened, the
//! command being executed, the transaction being committed and the result
//! reader produced by a query. They carry the correlation ids used by event
//! payloads and are deliberately driver-agnostic.
//!
//! - [`DbConnection`] - A logical connection to a database
//! - [`DbCommand`] - SQL text plus parameters, bound to a connection
//! - [`DbTransaction`] - An active transaction on a connection
//! - [`DataReader`] - Materialized rows returned by a reader command

use crate::correlation::{CommandId, ConnectionId, TransactionId};
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Transaction isolation level.
///
/// Defines the degree to which one transaction must be isolated from
/// resource or data modifications made by other concurrent transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IsolationLevel {
    /// Let the database pick its default level.
    Unspecified,
    /// Dirty reads, non-repeatable reads, and phantoms possible.
    ReadUncommitted,
    /// Only committed changes are visible. Default for PostgreSQL.
    #[default]
    ReadCommitted,
    /// Consistent snapshot of rows already read.
    RepeatableRead,
    /// Transactions appear to execute sequentially.
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL syntax for this isolation level.
    #[must_use]
    pub const fn as_sql(&self) -> Option<&'static str> {
        match self {
            IsolationLevel::Unspecified => None,
            IsolationLevel::ReadUncommitted => Some("READ UNCOMMITTED"),
            IsolationLevel::ReadCommitted => Some("READ COMMITTED"),
            IsolationLevel::RepeatableRead => Some("REPEATABLE READ"),
            IsolationLevel::Serializable => Some("SERIALIZABLE"),
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql().unwrap_or("UNSPECIFIED"))
    }
}

/// Which execute method a command is (or will be) run with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandMethod {
    /// Returns rows affected.
    NonQuery,
    /// Returns the first column of the first row.
    Scalar,
    /// Returns a [`DataReader`].
    Reader,
}

impl fmt::Display for CommandMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CommandMethod::NonQuery => "ExecuteNonQuery",
            CommandMethod::Scalar => "ExecuteScalar",
            CommandMethod::Reader => "ExecuteReader",
        })
    }
}

/// The part of the framework that produced a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandSource {
    #[default]
    Unknown,
    /// A query built with the query builder.
    Query,
    /// Pending changes being flushed by a session.
    SaveChanges,
    /// A schema migration.
    Migrations,
    /// Raw SQL supplied by the application.
    RawSql,
    /// A set-based UPDATE issued without loading entities.
    BulkUpdate,
    /// A set-based DELETE issued without loading entities.
    BulkDelete,
}

/// How the command text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CommandType {
    #[default]
    Text,
    StoredProcedure,
}

/// Lifecycle state of a [`DbConnection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Closed,
    Open,
    Broken,
}

/// A logical database connection.
#[derive(Debug, Clone)]
pub struct DbConnection {
    id: ConnectionId,
    database: String,
    data_source: String,
    state: ConnectionState,
}

impl DbConnection {
    /// Describe a (closed) connection to `database` on `data_source`.
    pub fn new(database: impl Into<String>, data_source: impl Into<String>) -> Self {
        Self {
            id: ConnectionId::new(),
            database: database.into(),
            data_source: data_source.into(),
            state: ConnectionState::Closed,
        }
    }

    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Database name, e.g. `heroes`.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Server / file the database lives on, e.g. `localhost:5432`.
    #[must_use]
    pub fn data_source(&self) -> &str {
        &self.data_source
    }

    #[must_use]
    pub const fn state(&self) -> ConnectionState {
        self.state
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.state, ConnectionState::Open)
    }

    /// Record a state transition. Called by the connection owner only.
    pub fn set_state(&mut self, state: ConnectionState) {
        self.state = state;
    }
}

/// A command ready to be executed against a connection.
///
/// Interceptors receive `&mut DbCommand` while a command is about to execute,
/// so they may rewrite the SQL or parameters before it reaches the driver.
#[derive(Debug, Clone, PartialEq)]
pub struct DbCommand {
    id: CommandId,
    connection_id: ConnectionId,
    pub sql: String,
    pub params: Vec<Value>,
    pub command_type: CommandType,
    pub timeout: Option<Duration>,
}

impl DbCommand {
    /// Create a text command bound to `connection_id`.
    pub fn new(connection_id: ConnectionId, sql: impl Into<String>) -> Self {
        Self::with_id(CommandId::new(), connection_id, sql)
    }

    /// Create a command whose id was reserved before it was built.
    pub fn with_id(id: CommandId, connection_id: ConnectionId, sql: impl Into<String>) -> Self {
        Self {
            id,
            connection_id,
            sql: sql.into(),
            params: Vec::new(),
            command_type: CommandType::Text,
            timeout: None,
        }
    }

    /// Set the parameters (builder pattern).
    #[must_use]
    pub fn with_params(mut self, params: Vec<Value>) -> Self {
        self.params = params;
        self
    }

    /// Set the command timeout (builder pattern).
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub const fn id(&self) -> CommandId {
        self.id
    }

    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

/// An active transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DbTransaction {
    id: TransactionId,
    connection_id: ConnectionId,
    isolation_level: IsolationLevel,
}

impl DbTransaction {
    pub fn new(connection_id: ConnectionId, isolation_level: IsolationLevel) -> Self {
        Self::with_id(TransactionId::new(), connection_id, isolation_level)
    }

    /// Handle for a transaction whose id was reserved before it began.
    #[must_use]
    pub const fn with_id(
        id: TransactionId,
        connection_id: ConnectionId,
        isolation_level: IsolationLevel,
    ) -> Self {
        Self {
            id,
            connection_id,
            isolation_level,
        }
    }

    #[must_use]
    pub const fn id(&self) -> TransactionId {
        self.id
    }

    #[must_use]
    pub const fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }

    #[must_use]
    pub const fn isolation_level(&self) -> IsolationLevel {
        self.isolation_level
    }
}

/// Materialized result of a reader command.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataReader {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    records_affected: i64,
}

impl DataReader {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            records_affected: -1,
        }
    }

    /// An empty reader with no columns.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rows affected by the statement; `-1` for plain SELECTs.
    #[must_use]
    pub fn with_records_affected(mut self, records_affected: i64) -> Self {
        self.records_affected = records_affected;
        self
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub const fn records_affected(&self) -> i64 {
        self.records_affected
    }

    /// First column of the first row, if any.
    #[must_use]
    pub fn first_value(&self) -> Option<&Value> {
        self.rows.first().and_then(|row| row.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolation_level_default() {
        assert_eq!(IsolationLevel::default(), IsolationLevel::ReadCommitted);
    }

    #[test]
    fn test_isolation_level_as_sql() {
        assert_eq!(IsolationLevel::Unspecified.as_sql(), None);
        assert_eq!(IsolationLevel::ReadUncommitted.as_sql(), Some("READ UNCOMMITTED"));
        assert_eq!(IsolationLevel::Serializable.to_string(), "SERIALIZABLE");
        assert_eq!(IsolationLevel::Unspecified.to_string(), "UNSPECIFIED");
    }

    #[test]
    fn test_command_binds_connection() {
        let conn = DbConnection::new("heroes", "localhost:5432");
        let cmd = DbCommand::new(conn.id(), "SELECT 1")
            .with_params(vec![Value::BigInt(1)])
            .with_timeout(Duration::from_secs(5));

        assert_eq!(cmd.connection_id(), conn.id());
        assert_eq!(cmd.params.len(), 1);
        assert_eq!(cmd.timeout, Some(Duration::from_secs(5)));
        assert_ne!(cmd.id(), DbCommand::new(conn.id(), "SELECT 1").id());
    }

    #[test]
    fn test_connection_state() {
        let mut conn = DbConnection::new("heroes", "localhost");
        assert!(!conn.is_open());
        conn.set_state(ConnectionState::Open);
        assert!(conn.is_open());
        assert_eq!(conn.database(), "heroes");
        assert_eq!(conn.data_source(), "localhost");
    }

    #[test]
    fn test_data_reader_accessors() {
        let reader = DataReader::new(
            vec!["id".to_string(), "name".to_string()],
            vec![vec![Value::BigInt(1), Value::Text("Deadpond".into())]],
        );
        assert_eq!(reader.row_count(), 1);
        assert_eq!(reader.records_affected(), -1);
        assert_eq!(reader.first_value(), Some(&Value::BigInt(1)));
        assert_eq!(DataReader::empty().first_value(), None);
    }

    #[test]
    fn test_command_method_display() {
        assert_eq!(CommandMethod::Reader.to_string(), "ExecuteReader");
        assert_eq!(CommandMethod::NonQuery.to_string(), "ExecuteNonQuery");
    }
}
