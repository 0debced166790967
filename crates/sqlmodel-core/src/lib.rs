//! Core types for the SQLModel Rust diagnostics layer.
//!
//! This crate provides the shared vocabulary used by interceptors, loggers
//! and the relational connection:
//!
//! - `Error` / `Result` for every fallible operation
//! - `Value` for command parameters and scalar results
//! - Database handles (`DbConnection`, `DbCommand`, `DbTransaction`, `DataReader`)
//! - Correlation ids tying "about to" and "completed" events together
//! - `Outcome` re-export from asupersync for cancel-correct operations
//! - `Cx` context for structured concurrency

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Budget, Cx, Outcome, RegionId, TaskId};

pub mod connection;
pub mod correlation;
pub mod error;
pub mod value;

pub use connection::{
    CommandMethod, CommandSource, CommandType, ConnectionState, DataReader, DbCommand,
    DbConnection, DbTransaction, IsolationLevel,
};
pub use correlation::{CommandId, ConnectionId, ContextId, TransactionId};
pub use error::{
    ConfigError, ConnectionError, ConnectionErrorKind, Error, InterceptorError, QueryError,
    QueryErrorKind, Result, TransactionError, TransactionErrorKind, WarningError,
};
pub use value::Value;

/// Unwrap an `Outcome::Ok`, returning early from the enclosing async block
/// with any other variant.
///
/// ```rust,ignore
/// let reader = try_outcome!(driver.execute_reader_async(cx, &command).await);
/// ```
#[macro_export]
macro_rules! try_outcome {
    ($expr:expr) => {
        match $expr {
            $crate::Outcome::Ok(value) => value,
            $crate::Outcome::Err(e) => return $crate::Outcome::Err(e),
            $crate::Outcome::Cancelled(r) => return $crate::Outcome::Cancelled(r),
            $crate::Outcome::Panicked(p) => return $crate::Outcome::Panicked(p),
        }
    };
}
