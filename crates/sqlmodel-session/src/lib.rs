//! Session scope for SQLModel Rust diagnostics.
//!
//! `sqlmodel-session` is the **caller side** of the interception layer. A
//! [`Session`] is one logical unit of work: it owns a [`DiagnosticsLogger`]
//! bound to its own [`ContextId`] and the [`Interceptors`] resolved for it,
//! and drives every database operation through a [`RelationalConnection`].
//!
//! # Role In The Architecture
//!
//! - **Scope**: interceptors are resolved at most once per session and every
//!   event carries the session's context id.
//! - **State machine**: each operation is announced, executed (unless
//!   suppressed), then reported as completed or failed.
//! - **I/O boundary**: the [`Driver`] trait is the only place real database
//!   work happens.
//!
//! # Example
//!
//! ```ignore
//! let root = Arc::new(
//!     DiagnosticsLogger::builder()
//!         .options(DiagnosticsOptions::from_env())
//!         .build(),
//! );
//! let registry = InterceptorRegistry::new().with(Interceptor::command(SlowQueryLog));
//!
//! let mut session = Session::builder(driver, DbConnection::new("heroes", "localhost:5432"))
//!     .logger(root)
//!     .source(Arc::new(registry))
//!     .build();
//!
//! session.open()?;
//! let heroes = session
//!     .connection()
//!     .execute_reader("SELECT * FROM heroes", &[], CommandSource::Query)?;
//! ```

pub mod connection;
pub mod driver;

pub use connection::RelationalConnection;
pub use driver::Driver;

use sqlmodel_core::{ContextId, DbConnection, Result};
use sqlmodel_diagnostics::{
    DiagnosticsLogger, Interceptor, InterceptorRegistry, InterceptorSource, Interceptors,
};
use std::sync::Arc;

/// One unit of work against one connection.
pub struct Session<D: Driver> {
    context: ContextId,
    root: Arc<DiagnosticsLogger>,
    source: Arc<dyn InterceptorSource>,
    configured: Option<Interceptor>,
    interceptors: Arc<Interceptors>,
    connection: RelationalConnection<D>,
}

impl<D: Driver> Session<D> {
    /// A session with a default logger and no interceptors.
    pub fn new(driver: D, connection: DbConnection) -> Self {
        Self::builder(driver, connection).build()
    }

    pub fn builder(driver: D, connection: DbConnection) -> SessionBuilder<D> {
        SessionBuilder {
            driver,
            connection,
            root: None,
            source: None,
            configured: None,
        }
    }

    /// Context id stamped on every event raised by this session.
    pub const fn context(&self) -> ContextId {
        self.context
    }

    /// The scoped logger.
    pub fn logger(&self) -> &Arc<DiagnosticsLogger> {
        self.connection.logger()
    }

    pub fn interceptors(&self) -> &Arc<Interceptors> {
        &self.interceptors
    }

    pub fn connection(&self) -> &RelationalConnection<D> {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut RelationalConnection<D> {
        &mut self.connection
    }

    pub fn open(&mut self) -> Result<()> {
        self.connection.open()
    }

    pub fn close(&mut self) -> Result<()> {
        self.connection.close()
    }

    /// Hand the session out again as a new lease of the same instance.
    ///
    /// Interceptors are resolved afresh for the new lease.
    #[tracing::instrument(level = "debug", skip(self), fields(context = %self.context))]
    pub fn reset(&mut self) {
        self.context = self.context.next_lease();
        self.interceptors = Arc::new(Interceptors::new(
            Arc::clone(&self.source),
            self.configured.clone(),
        ));
        let logger = self
            .root
            .for_scope(self.context, Arc::clone(&self.interceptors));
        self.connection.set_logger(Arc::new(logger));
        tracing::debug!(lease = self.context.lease, "Session reset");
    }
}

impl<D: Driver> std::fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context)
            .field("connection", self.connection.connection())
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Session`].
pub struct SessionBuilder<D: Driver> {
    driver: D,
    connection: DbConnection,
    root: Option<Arc<DiagnosticsLogger>>,
    source: Option<Arc<dyn InterceptorSource>>,
    configured: Option<Interceptor>,
}

impl<D: Driver> SessionBuilder<D> {
    /// Share options, sink and listener with `root`.
    pub fn logger(mut self, root: Arc<DiagnosticsLogger>) -> Self {
        self.root = Some(root);
        self
    }

    /// Where registered interceptors come from.
    pub fn source(mut self, source: Arc<dyn InterceptorSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// An interceptor set directly on this session. It runs after every
    /// registered interceptor of its role.
    pub fn interceptor(mut self, interceptor: Interceptor) -> Self {
        self.configured = Some(interceptor);
        self
    }

    pub fn build(self) -> Session<D> {
        let context = ContextId::new();
        let root = self.root.unwrap_or_default();
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(InterceptorRegistry::new()));
        let interceptors = Arc::new(Interceptors::new(
            Arc::clone(&source),
            self.configured.clone(),
        ));
        let logger = Arc::new(root.for_scope(context, Arc::clone(&interceptors)));
        tracing::debug!(
            context = %context,
            database = self.connection.database(),
            configured = self.configured.is_some(),
            "Session created"
        );

        Session {
            context,
            root,
            source,
            configured: self.configured,
            interceptors,
            connection: RelationalConnection::new(self.driver, self.connection, logger),
        }
    }
}
