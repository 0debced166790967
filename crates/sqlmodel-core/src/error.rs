//! Error types for SQLModel diagnostics and interception.

use std::fmt;

/// The primary error type for all intercepted database operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (connect, disconnect, timeout)
    Connection(ConnectionError),
    /// Command execution errors
    Query(QueryError),
    /// Transaction errors
    Transaction(TransactionError),
    /// Configuration errors, including interceptor misconfiguration
    Config(ConfigError),
    /// An interceptor failed while handling an event
    Interceptor(InterceptorError),
    /// A warning event configured to be raised as an error
    Warning(WarningError),
    /// I/O errors
    Io(std::io::Error),
    /// Operation timed out
    Timeout,
    /// Operation was cancelled via asupersync
    Cancelled,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Authentication failed
    Authentication,
    /// Connection lost during operation
    Disconnected,
    /// Connection refused
    Refused,
    /// Operation requires an open connection
    NotOpen,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub sqlstate: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Deadlock detected
    Deadlock,
    /// Serialization failure (retry may succeed)
    Serialization,
    /// Statement timeout
    Timeout,
    /// Cancelled
    Cancelled,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// Already committed
    AlreadyCommitted,
    /// Already rolled back
    AlreadyRolledBack,
    /// No transaction is active on the connection
    NoActiveTransaction,
    /// Nested transaction not supported
    NestedNotSupported,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// Raised by an interceptor that wants the intercepted operation to fail.
#[derive(Debug)]
pub struct InterceptorError {
    /// Name of the interceptor that raised the error
    pub interceptor: String,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

/// A warning event whose configured behavior is to throw.
#[derive(Debug, Clone)]
pub struct WarningError {
    /// Dotted name of the event that was raised
    pub event: &'static str,
    pub message: String,
}

impl Error {
    /// Is this a retryable error (deadlock, serialization, timeouts)?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query(q) => matches!(
                q.kind,
                QueryErrorKind::Deadlock | QueryErrorKind::Serialization | QueryErrorKind::Timeout
            ),
            Error::Timeout => true,
            _ => false,
        }
    }

    /// Is this a connection error that likely requires reconnection?
    pub fn is_connection_error(&self) -> bool {
        match self {
            Error::Connection(c) => !matches!(c.kind, ConnectionErrorKind::NotOpen),
            Error::Io(_) => true,
            _ => false,
        }
    }

    /// Was the operation cancelled (either by the runtime or the server)?
    pub fn is_cancellation(&self) -> bool {
        match self {
            Error::Cancelled => true,
            Error::Query(q) => q.kind == QueryErrorKind::Cancelled,
            _ => false,
        }
    }

    /// Get SQLSTATE if available (e.g., "23505" for unique violation)
    pub fn sqlstate(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sqlstate.as_deref(),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }

    /// Shorthand for an interceptor failure without an underlying source.
    pub fn interceptor(interceptor: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Interceptor(InterceptorError {
            interceptor: interceptor.into(),
            message: message.into(),
            source: None,
        })
    }

    /// Shorthand for a configuration failure without an underlying source.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            message: message.into(),
            source: None,
        })
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => {
                if let Some(sqlstate) = &e.sqlstate {
                    write!(f, "Query error (SQLSTATE {}): {}", sqlstate, e.message)
                } else {
                    write!(f, "Query error: {}", e.message)
                }
            }
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Interceptor(e) => write!(f, "Interceptor '{}' failed: {}", e.interceptor, e.message),
            Error::Warning(e) => write!(f, "Warning '{}' raised as error: {}", e.event, e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Cancelled => write!(f, "Operation cancelled"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Interceptor(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sqlstate) = &self.sqlstate {
            write!(f, "{} (SQLSTATE {})", self.message, sqlstate)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for InterceptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.interceptor, self.message)
    }
}

impl fmt::Display for WarningError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.event, self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<InterceptorError> for Error {
    fn from(err: InterceptorError) -> Self {
        Error::Interceptor(err)
    }
}

impl From<WarningError> for Error {
    fn from(err: WarningError) -> Self {
        Error::Warning(err)
    }
}

/// Result type alias for SQLModel operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlstate_helpers() {
        let err = Error::Query(QueryError {
            kind: QueryErrorKind::Constraint,
            sql: Some("INSERT INTO t VALUES (1)".to_string()),
            sqlstate: Some("23505".to_string()),
            message: "unique violation".to_string(),
            source: None,
        });

        assert_eq!(err.sqlstate(), Some("23505"));
        assert_eq!(err.sql(), Some("INSERT INTO t VALUES (1)"));
        assert_eq!(
            err.to_string(),
            "Query error (SQLSTATE 23505): unique violation"
        );
    }

    #[test]
    fn retryable_and_connection_flags() {
        let deadlock = Error::Query(QueryError {
            kind: QueryErrorKind::Deadlock,
            sql: None,
            sqlstate: None,
            message: "deadlock detected".to_string(),
            source: None,
        });
        assert!(deadlock.is_retryable());
        assert!(Error::Timeout.is_retryable());
        assert!(!Error::Cancelled.is_retryable());

        let lost = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::Disconnected,
            message: "lost connection".to_string(),
            source: None,
        });
        assert!(lost.is_connection_error());

        let not_open = Error::Connection(ConnectionError {
            kind: ConnectionErrorKind::NotOpen,
            message: "connection is closed".to_string(),
            source: None,
        });
        assert!(!not_open.is_connection_error());
    }

    #[test]
    fn cancellation_detection() {
        assert!(Error::Cancelled.is_cancellation());
        let server_cancel = Error::Query(QueryError {
            kind: QueryErrorKind::Cancelled,
            sql: None,
            sqlstate: Some("57014".to_string()),
            message: "canceling statement due to user request".to_string(),
            source: None,
        });
        assert!(server_cancel.is_cancellation());
        assert!(!Error::Timeout.is_cancellation());
    }

    #[test]
    fn interceptor_and_warning_display() {
        let err = Error::interceptor("audit", "refusing DELETE without WHERE");
        assert_eq!(
            err.to_string(),
            "Interceptor 'audit' failed: refusing DELETE without WHERE"
        );

        let warning: Error = WarningError {
            event: "sqlmodel.model.validation.bool_with_default",
            message: "column has a default".to_string(),
        }
        .into();
        assert!(matches!(warning, Error::Warning(_)));
        assert!(warning.to_string().contains("bool_with_default"));
    }
}
