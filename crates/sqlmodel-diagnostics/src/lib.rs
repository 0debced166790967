//! Interceptors and diagnostics events for SQLModel Rust.
//!
//! Every database operation performed through a session passes a set of
//! interception points ("about to open", "executed", "failed", ...). At each
//! point the [`DiagnosticsLogger`] does three things, in order:
//!
//! 1. writes a log entry to its [`LogSink`] (filtered by level and by the
//!    configured [`WarningBehavior`]),
//! 2. publishes the strongly typed payload on the [`DiagnosticListener`],
//! 3. runs the interceptor resolved for the current scope.
//!
//! "About to" interceptor methods receive an [`InterceptionResult`] and may
//! suppress the operation, optionally supplying the value it would have
//! produced. "Completed" methods receive the produced value and return it,
//! possibly replaced.
//!
//! # Example
//!
//! ```ignore
//! use sqlmodel_diagnostics::{
//!     CommandInterceptor, DiagnosticsLogger, InterceptionResult, Interceptor,
//!     InterceptorRegistry, Interceptors,
//! };
//!
//! struct CacheHit(DataReader);
//!
//! impl CommandInterceptor for CacheHit {
//!     fn reader_executing(
//!         &self,
//!         _command: &mut DbCommand,
//!         _event: &CommandEventData,
//!         _result: InterceptionResult<DataReader>,
//!     ) -> Result<InterceptionResult<DataReader>> {
//!         Ok(InterceptionResult::suppress_with_result(self.0.clone()))
//!     }
//! }
//!
//! let registry = InterceptorRegistry::new().with(Interceptor::command(CacheHit(reader)));
//! let interceptors = Interceptors::new(Arc::new(registry), None);
//! let logger = DiagnosticsLogger::builder().interceptors(Arc::new(interceptors)).build();
//! ```

pub mod definition;
mod dispatch;
pub mod event_data;
pub mod event_id;
pub mod interception;
pub mod interceptor;
pub mod level;
pub mod listener;
pub mod logger;
pub mod options;
pub mod sink;

pub use definition::{EventDefinition, WarningBehavior};
pub use event_data::EventData;
pub use event_id::{EventId, LoggerCategory};
pub use interception::InterceptionResult;
pub use interceptor::{
    BoxFuture, CommandInterceptor, CommandInterceptorChain, ConnectionInterceptor,
    ConnectionInterceptorChain, Interceptor, InterceptorRegistry, InterceptorSource, Interceptors,
    TransactionInterceptor, TransactionInterceptorChain,
};
pub use level::LogLevel;
pub use listener::{DiagnosticListener, DiagnosticObserver, SubscriptionId};
pub use logger::{DiagnosticsLogger, DiagnosticsLoggerBuilder};
pub use options::{DiagnosticsOptions, WarningsConfig};
pub use sink::{LogRecord, LogSink, MemorySink, TracingSink};
