//! A database connection whose every operation passes through diagnostics.
//!
//! Each operation runs the same state machine:
//!
//! 1. **Announced**: the "about to" event is dispatched. Interceptors may
//!    rewrite the command or suppress the operation.
//! 2. **Executing**: the driver runs, unless the operation was suppressed.
//! 3. **Completed** or **Failed**: the matching event is dispatched. A
//!    suppressed operation still completes, with the substitute result.
//!
//! Interceptor errors abort the operation and surface unchanged.

use crate::driver::Driver;
use asupersync::{Cx, Outcome};
use chrono::{DateTime, Utc};
use sqlmodel_core::{
    CommandId, CommandMethod, CommandSource, ConnectionError, ConnectionErrorKind,
    ConnectionState, DataReader, DbCommand, DbConnection, DbTransaction, Error, IsolationLevel,
    Result, TransactionError, TransactionErrorKind, TransactionId, Value, try_outcome,
};
use sqlmodel_diagnostics::{DiagnosticsLogger, InterceptionResult};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Wall-clock start of an operation plus a monotonic timer for its duration.
#[derive(Debug, Clone, Copy)]
struct Timing {
    start_time: DateTime<Utc>,
    started: Instant,
}

impl Timing {
    fn start() -> Self {
        Self {
            start_time: Utc::now(),
            started: Instant::now(),
        }
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// What a command is for, carried through its events.
#[derive(Debug, Clone, Copy)]
struct CommandKind {
    method: CommandMethod,
    source: CommandSource,
}

/// An operation that stopped after its "about to" announcement.
struct Failure<T> {
    /// What the failed or canceled event carries.
    error: Error,
    /// Set when the operation was cancelled or panicked. It is returned in
    /// place of the error once the failure has been announced.
    interrupted: Option<Outcome<T, Error>>,
}

impl<T> Failure<T> {
    fn from_outcome(outcome: Outcome<T, Error>) -> std::result::Result<T, Self> {
        match outcome {
            Outcome::Ok(value) => Ok(value),
            Outcome::Err(error) => Err(Self {
                error,
                interrupted: None,
            }),
            Outcome::Cancelled(reason) => Err(Self {
                error: Error::Cancelled,
                interrupted: Some(Outcome::Cancelled(reason)),
            }),
            Outcome::Panicked(payload) => Err(Self {
                error: Error::Custom(format!("operation panicked: {payload:?}")),
                interrupted: Some(Outcome::Panicked(payload)),
            }),
        }
    }
}

/// Drives a [`Driver`] through the diagnostics logger of its scope.
pub struct RelationalConnection<D: Driver> {
    driver: D,
    connection: DbConnection,
    logger: Arc<DiagnosticsLogger>,
    transaction: Option<DbTransaction>,
}

impl<D: Driver> RelationalConnection<D> {
    pub fn new(driver: D, connection: DbConnection, logger: Arc<DiagnosticsLogger>) -> Self {
        Self {
            driver,
            connection,
            logger,
            transaction: None,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn connection(&self) -> &DbConnection {
        &self.connection
    }

    pub fn logger(&self) -> &Arc<DiagnosticsLogger> {
        &self.logger
    }

    /// The transaction currently in effect, if any.
    pub fn transaction(&self) -> Option<&DbTransaction> {
        self.transaction.as_ref()
    }

    pub(crate) fn set_logger(&mut self, logger: Arc<DiagnosticsLogger>) {
        self.logger = logger;
    }

    // ========================================================================
    // Open / Close
    // ========================================================================

    /// Open the connection. Does nothing if it is already open.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn open(&mut self) -> Result<()> {
        if self.connection.is_open() {
            return Ok(());
        }
        let timing = Timing::start();
        let interception = self
            .logger
            .connection_opening(&self.connection, timing.start_time)?;
        if interception.has_result() {
            tracing::debug!("Connection open suppressed by interceptor");
        } else if let Err(error) = self.driver.open(&self.connection) {
            self.connection.set_state(ConnectionState::Broken);
            return Err(self.logger.connection_failed(
                &self.connection,
                error,
                timing.start_time,
                timing.elapsed(),
            )?);
        }
        self.connection.set_state(ConnectionState::Open);
        self.logger
            .connection_opened(&self.connection, timing.start_time, timing.elapsed())
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn open_async(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if self.connection.is_open() {
            return Outcome::Ok(());
        }
        let timing = Timing::start();
        let interception = try_outcome!(
            self.logger
                .connection_opening_async(cx, &self.connection, timing.start_time)
                .await
        );
        if interception.has_result() {
            tracing::debug!("Connection open suppressed by interceptor");
        } else {
            let outcome = match cx.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => self.driver.open_async(cx, &self.connection).await,
            };
            if let Err(failure) = Failure::from_outcome(outcome) {
                return self.announce_connection_failure(cx, timing, failure).await;
            }
        }
        self.connection.set_state(ConnectionState::Open);
        self.logger
            .connection_opened_async(cx, &self.connection, timing.start_time, timing.elapsed())
            .await
    }

    /// Close the connection. Does nothing if it is already closed.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn close(&mut self) -> Result<()> {
        if !self.connection.is_open() {
            return Ok(());
        }
        let timing = Timing::start();
        let interception = self
            .logger
            .connection_closing(&self.connection, timing.start_time)?;
        if interception.has_result() {
            tracing::debug!("Connection close suppressed by interceptor");
        } else if let Err(error) = self.driver.close(&self.connection) {
            self.connection.set_state(ConnectionState::Broken);
            return Err(self.logger.connection_failed(
                &self.connection,
                error,
                timing.start_time,
                timing.elapsed(),
            )?);
        }
        self.connection.set_state(ConnectionState::Closed);
        self.logger
            .connection_closed(&self.connection, timing.start_time, timing.elapsed())
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn close_async(&mut self, cx: &Cx) -> Outcome<(), Error> {
        if !self.connection.is_open() {
            return Outcome::Ok(());
        }
        let timing = Timing::start();
        let interception = try_outcome!(
            self.logger
                .connection_closing_async(cx, &self.connection, timing.start_time)
                .await
        );
        if interception.has_result() {
            tracing::debug!("Connection close suppressed by interceptor");
        } else {
            // A close still runs when cancellation was requested.
            let outcome = self.driver.close_async(cx, &self.connection).await;
            if let Err(failure) = Failure::from_outcome(outcome) {
                return self.announce_connection_failure(cx, timing, failure).await;
            }
        }
        self.connection.set_state(ConnectionState::Closed);
        self.logger
            .connection_closed_async(cx, &self.connection, timing.start_time, timing.elapsed())
            .await
    }

    /// Mark the connection broken and announce why opening or closing it
    /// failed.
    async fn announce_connection_failure(
        &mut self,
        cx: &Cx,
        timing: Timing,
        failure: Failure<()>,
    ) -> Outcome<(), Error> {
        self.connection.set_state(ConnectionState::Broken);
        let Failure { error, interrupted } = failure;
        let error = try_outcome!(
            self.logger
                .connection_failed_async(
                    cx,
                    &self.connection,
                    error,
                    timing.start_time,
                    timing.elapsed(),
                )
                .await
        );
        interrupted.unwrap_or(Outcome::Err(error))
    }

    // ========================================================================
    // Commands
    // ========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.connection.is_open() {
            Ok(())
        } else {
            Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::NotOpen,
                message: format!(
                    "connection to '{}' is not open",
                    self.connection.database()
                ),
                source: None,
            }))
        }
    }

    /// Create a command and bind `sql` and `params` to it.
    ///
    /// The creating and created announcements are both skipped while the
    /// logger's cache window says nobody is listening.
    fn create_command(&self, kind: CommandKind, sql: &str, params: &[Value]) -> Result<DbCommand> {
        let timing = Timing::start();
        let command_id = CommandId::new();
        let blank = || DbCommand::with_id(command_id, self.connection.id(), "");
        let mut command = if self.logger.should_log_command_create(timing.start_time) {
            let command = self
                .logger
                .command_creating(
                    self.connection.id(),
                    command_id,
                    kind.method,
                    kind.source,
                    timing.start_time,
                )?
                .into_result()
                .unwrap_or_else(blank);
            self.logger.command_created(
                command,
                kind.method,
                kind.source,
                timing.start_time,
                timing.elapsed(),
            )?
        } else {
            blank()
        };

        command.sql = sql.to_string();
        command.params = params.to_vec();
        self.logger.command_initialized(
            command,
            kind.method,
            kind.source,
            timing.start_time,
            timing.elapsed(),
        )
    }

    /// Announce that a driver call failed or was canceled and hand its error
    /// back.
    fn settle<T>(
        &self,
        command: &DbCommand,
        kind: CommandKind,
        timing: Timing,
        result: Result<T>,
    ) -> Result<T> {
        let error = match result {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };
        if error.is_cancellation() {
            self.logger.command_canceled(
                command,
                kind.method,
                kind.source,
                timing.start_time,
                timing.elapsed(),
            )?;
            return Err(error);
        }
        Err(self.logger.command_failed(
            command,
            kind.method,
            kind.source,
            error,
            timing.start_time,
            timing.elapsed(),
        )?)
    }

    /// Announce that a driver call failed, was canceled or panicked, passing
    /// the outcome through.
    async fn settle_async<T>(
        &self,
        cx: &Cx,
        command: &DbCommand,
        kind: CommandKind,
        timing: Timing,
        outcome: Outcome<T, Error>,
    ) -> Outcome<T, Error> {
        let Failure { error, interrupted } = match Failure::from_outcome(outcome) {
            Ok(value) => return Outcome::Ok(value),
            Err(failure) => failure,
        };
        if error.is_cancellation() {
            try_outcome!(
                self.logger
                    .command_canceled_async(
                        cx,
                        command,
                        kind.method,
                        kind.source,
                        timing.start_time,
                        timing.elapsed(),
                    )
                    .await
            );
            return interrupted.unwrap_or(Outcome::Err(error));
        }
        let error = try_outcome!(
            self.logger
                .command_failed_async(
                    cx,
                    command,
                    kind.method,
                    kind.source,
                    error,
                    timing.start_time,
                    timing.elapsed(),
                )
                .await
        );
        interrupted.unwrap_or(Outcome::Err(error))
    }

    /// Announce closing and disposal of a reader the caller is done with.
    fn close_reader(&self, command: &DbCommand, reader: &DataReader) -> Result<()> {
        let timing = Timing::start();
        if self.logger.should_log_data_reader_close(timing.start_time) {
            let closing = self.logger.data_reader_closing(
                command,
                reader.records_affected(),
                reader.row_count(),
                timing.start_time,
            )?;
            if closing.has_result() {
                tracing::trace!(command = %command.id(), "Reader close suppressed by interceptor");
            }
        }
        self.dispose_reader(command, reader, timing)
    }

    async fn close_reader_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        reader: &DataReader,
    ) -> Outcome<(), Error> {
        let timing = Timing::start();
        if self.logger.should_log_data_reader_close(timing.start_time) {
            let closing = try_outcome!(
                self.logger
                    .data_reader_closing_async(
                        cx,
                        command,
                        reader.records_affected(),
                        reader.row_count(),
                        timing.start_time,
                    )
                    .await
            );
            if closing.has_result() {
                tracing::trace!(command = %command.id(), "Reader close suppressed by interceptor");
            }
        }
        // Disposal has no async form.
        match self.dispose_reader(command, reader, timing) {
            Ok(()) => Outcome::Ok(()),
            Err(e) => Outcome::Err(e),
        }
    }

    fn dispose_reader(
        &self,
        command: &DbCommand,
        reader: &DataReader,
        timing: Timing,
    ) -> Result<()> {
        if self.logger.should_log_data_reader_dispose(timing.start_time) {
            let disposing = self.logger.data_reader_disposing(
                command,
                reader.records_affected(),
                reader.row_count(),
                timing.start_time,
                timing.elapsed(),
            )?;
            if disposing.has_result() {
                tracing::trace!(command = %command.id(), "Reader dispose suppressed by interceptor");
            }
        }
        Ok(())
    }

    /// Run a query and return its rows.
    pub fn execute_reader(
        &self,
        sql: &str,
        params: &[Value],
        source: CommandSource,
    ) -> Result<DataReader> {
        self.ensure_open()?;
        let kind = CommandKind {
            method: CommandMethod::Reader,
            source,
        };
        let mut command = self.create_command(kind, sql, params)?;
        let timing = Timing::start();
        let interception = if self.logger.should_log_command_execute(timing.start_time) {
            self.logger
                .reader_executing(&mut command, source, timing.start_time)?
        } else {
            InterceptionResult::none()
        };
        let reader = if interception.has_result() {
            tracing::debug!(command = %command.id(), "Reader execution suppressed by interceptor");
            interception.into_result().unwrap_or_default()
        } else {
            self.settle(&command, kind, timing, self.driver.execute_reader(&command))?
        };
        let reader =
            self.logger
                .reader_executed(&command, source, reader, timing.start_time, timing.elapsed())?;
        self.close_reader(&command, &reader)?;
        Ok(reader)
    }

    pub async fn execute_reader_async(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
        source: CommandSource,
    ) -> Outcome<DataReader, Error> {
        if let Err(e) = self.ensure_open() {
            return Outcome::Err(e);
        }
        let kind = CommandKind {
            method: CommandMethod::Reader,
            source,
        };
        let mut command = match self.create_command(kind, sql, params) {
            Ok(command) => command,
            Err(e) => return Outcome::Err(e),
        };
        let timing = Timing::start();
        let interception = if self.logger.should_log_command_execute(timing.start_time) {
            try_outcome!(
                self.logger
                    .reader_executing_async(cx, &mut command, source, timing.start_time)
                    .await
            )
        } else {
            InterceptionResult::none()
        };
        let reader = if interception.has_result() {
            tracing::debug!(command = %command.id(), "Reader execution suppressed by interceptor");
            interception.into_result().unwrap_or_default()
        } else {
            let outcome = match cx.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => self.driver.execute_reader_async(cx, &command).await,
            };
            try_outcome!(self.settle_async(cx, &command, kind, timing, outcome).await)
        };
        let reader = try_outcome!(
            self.logger
                .reader_executed_async(
                    cx,
                    &command,
                    source,
                    reader,
                    timing.start_time,
                    timing.elapsed(),
                )
                .await
        );
        try_outcome!(self.close_reader_async(cx, &command, &reader).await);
        Outcome::Ok(reader)
    }

    /// Run a query and return the first column of its first row.
    pub fn execute_scalar(&self, sql: &str, params: &[Value], source: CommandSource) -> Result<Value> {
        self.ensure_open()?;
        let kind = CommandKind {
            method: CommandMethod::Scalar,
            source,
        };
        let mut command = self.create_command(kind, sql, params)?;
        let timing = Timing::start();
        let interception = if self.logger.should_log_command_execute(timing.start_time) {
            self.logger
                .scalar_executing(&mut command, source, timing.start_time)?
        } else {
            InterceptionResult::none()
        };
        let value = if interception.has_result() {
            tracing::debug!(command = %command.id(), "Scalar execution suppressed by interceptor");
            interception.into_result().unwrap_or_default()
        } else {
            self.settle(&command, kind, timing, self.driver.execute_scalar(&command))?
        };
        self.logger
            .scalar_executed(&command, source, value, timing.start_time, timing.elapsed())
    }

    pub async fn execute_scalar_async(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
        source: CommandSource,
    ) -> Outcome<Value, Error> {
        if let Err(e) = self.ensure_open() {
            return Outcome::Err(e);
        }
        let kind = CommandKind {
            method: CommandMethod::Scalar,
            source,
        };
        let mut command = match self.create_command(kind, sql, params) {
            Ok(command) => command,
            Err(e) => return Outcome::Err(e),
        };
        let timing = Timing::start();
        let interception = if self.logger.should_log_command_execute(timing.start_time) {
            try_outcome!(
                self.logger
                    .scalar_executing_async(cx, &mut command, source, timing.start_time)
                    .await
            )
        } else {
            InterceptionResult::none()
        };
        let value = if interception.has_result() {
            tracing::debug!(command = %command.id(), "Scalar execution suppressed by interceptor");
            interception.into_result().unwrap_or_default()
        } else {
            let outcome = match cx.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => self.driver.execute_scalar_async(cx, &command).await,
            };
            try_outcome!(self.settle_async(cx, &command, kind, timing, outcome).await)
        };
        self.logger
            .scalar_executed_async(cx, &command, source, value, timing.start_time, timing.elapsed())
            .await
    }

    /// Run a statement and return the number of rows it affected.
    pub fn execute_non_query(
        &self,
        sql: &str,
        params: &[Value],
        source: CommandSource,
    ) -> Result<u64> {
        self.ensure_open()?;
        let kind = CommandKind {
            method: CommandMethod::NonQuery,
            source,
        };
        let mut command = self.create_command(kind, sql, params)?;
        let timing = Timing::start();
        let interception = if self.logger.should_log_command_execute(timing.start_time) {
            self.logger
                .non_query_executing(&mut command, source, timing.start_time)?
        } else {
            InterceptionResult::none()
        };
        let rows_affected = if interception.has_result() {
            tracing::debug!(command = %command.id(), "Statement suppressed by interceptor");
            interception.into_result().unwrap_or_default()
        } else {
            self.settle(&command, kind, timing, self.driver.execute_non_query(&command))?
        };
        self.logger.non_query_executed(
            &command,
            source,
            rows_affected,
            timing.start_time,
            timing.elapsed(),
        )
    }

    pub async fn execute_non_query_async(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
        source: CommandSource,
    ) -> Outcome<u64, Error> {
        if let Err(e) = self.ensure_open() {
            return Outcome::Err(e);
        }
        let kind = CommandKind {
            method: CommandMethod::NonQuery,
            source,
        };
        let mut command = match self.create_command(kind, sql, params) {
            Ok(command) => command,
            Err(e) => return Outcome::Err(e),
        };
        let timing = Timing::start();
        let interception = if self.logger.should_log_command_execute(timing.start_time) {
            try_outcome!(
                self.logger
                    .non_query_executing_async(cx, &mut command, source, timing.start_time)
                    .await
            )
        } else {
            InterceptionResult::none()
        };
        let rows_affected = if interception.has_result() {
            tracing::debug!(command = %command.id(), "Statement suppressed by interceptor");
            interception.into_result().unwrap_or_default()
        } else {
            let outcome = match cx.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => self.driver.execute_non_query_async(cx, &command).await,
            };
            try_outcome!(self.settle_async(cx, &command, kind, timing, outcome).await)
        };
        self.logger
            .non_query_executed_async(
                cx,
                &command,
                source,
                rows_affected,
                timing.start_time,
                timing.elapsed(),
            )
            .await
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    fn no_active_transaction() -> Error {
        Error::Transaction(TransactionError {
            kind: TransactionErrorKind::NoActiveTransaction,
            message: "no transaction is active on this connection".to_string(),
        })
    }

    fn check_no_transaction(&self) -> Result<()> {
        if self.transaction.is_some() {
            return Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NestedNotSupported,
                message: "a transaction is already active on this connection".to_string(),
            }));
        }
        self.ensure_open()
    }

    /// Begin a transaction at `isolation_level`.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn begin_transaction(&mut self, isolation_level: IsolationLevel) -> Result<DbTransaction> {
        self.check_no_transaction()?;
        let timing = Timing::start();
        let transaction_id = TransactionId::new();
        let interception = self.logger.transaction_starting(
            &self.connection,
            transaction_id,
            isolation_level,
            timing.start_time,
        )?;
        let pending = DbTransaction::with_id(transaction_id, self.connection.id(), isolation_level);
        let transaction = if interception.has_result() {
            tracing::debug!("Transaction begin suppressed by interceptor");
            interception.into_result().unwrap_or(pending)
        } else {
            if let Err(error) = self.driver.begin(&self.connection, isolation_level) {
                return Err(self.logger.transaction_failed(
                    &pending,
                    "begin",
                    error,
                    timing.start_time,
                    timing.elapsed(),
                )?);
            }
            pending
        };
        let transaction = self.logger.transaction_started(
            &self.connection,
            transaction,
            timing.start_time,
            timing.elapsed(),
        )?;
        self.transaction = Some(transaction);
        Ok(transaction)
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn begin_transaction_async(
        &mut self,
        cx: &Cx,
        isolation_level: IsolationLevel,
    ) -> Outcome<DbTransaction, Error> {
        if let Err(e) = self.check_no_transaction() {
            return Outcome::Err(e);
        }
        let timing = Timing::start();
        let transaction_id = TransactionId::new();
        let interception = try_outcome!(
            self.logger
                .transaction_starting_async(
                    cx,
                    &self.connection,
                    transaction_id,
                    isolation_level,
                    timing.start_time,
                )
                .await
        );
        let pending = DbTransaction::with_id(transaction_id, self.connection.id(), isolation_level);
        let transaction = if interception.has_result() {
            tracing::debug!("Transaction begin suppressed by interceptor");
            interception.into_result().unwrap_or(pending)
        } else {
            let outcome = match cx.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => match self
                    .driver
                    .begin_async(cx, &self.connection, isolation_level)
                    .await
                {
                    Outcome::Ok(()) => Outcome::Ok(pending),
                    Outcome::Err(e) => Outcome::Err(e),
                    Outcome::Cancelled(r) => Outcome::Cancelled(r),
                    Outcome::Panicked(p) => Outcome::Panicked(p),
                },
            };
            match Failure::from_outcome(outcome) {
                Ok(transaction) => transaction,
                Err(failure) => {
                    return self
                        .announce_transaction_failure(cx, &pending, "begin", timing, failure)
                        .await;
                }
            }
        };
        let transaction = try_outcome!(
            self.logger
                .transaction_started_async(
                    cx,
                    &self.connection,
                    transaction,
                    timing.start_time,
                    timing.elapsed(),
                )
                .await
        );
        self.transaction = Some(transaction);
        Outcome::Ok(transaction)
    }

    /// Adopt a transaction that was started outside this connection.
    pub fn use_transaction(&mut self, transaction: DbTransaction) -> Result<DbTransaction> {
        self.check_no_transaction()?;
        let transaction =
            self.logger
                .transaction_used(&self.connection, transaction, Utc::now())?;
        self.transaction = Some(transaction);
        Ok(transaction)
    }

    pub async fn use_transaction_async(
        &mut self,
        cx: &Cx,
        transaction: DbTransaction,
    ) -> Outcome<DbTransaction, Error> {
        if let Err(e) = self.check_no_transaction() {
            return Outcome::Err(e);
        }
        let transaction = try_outcome!(
            self.logger
                .transaction_used_async(cx, &self.connection, transaction, Utc::now())
                .await
        );
        self.transaction = Some(transaction);
        Outcome::Ok(transaction)
    }

    /// Announce why `action` on `transaction` did not complete.
    async fn announce_transaction_failure<T>(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
        action: &'static str,
        timing: Timing,
        failure: Failure<T>,
    ) -> Outcome<T, Error> {
        let Failure { error, interrupted } = failure;
        let error = try_outcome!(
            self.logger
                .transaction_failed_async(
                    cx,
                    transaction,
                    action,
                    error,
                    timing.start_time,
                    timing.elapsed(),
                )
                .await
        );
        interrupted.unwrap_or(Outcome::Err(error))
    }

    /// Commit the active transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn commit(&mut self) -> Result<()> {
        let transaction = self.transaction.ok_or_else(Self::no_active_transaction)?;
        let timing = Timing::start();
        let interception = self
            .logger
            .transaction_committing(&transaction, timing.start_time)?;
        if interception.has_result() {
            tracing::debug!("Commit suppressed by interceptor");
        } else if let Err(error) = self.driver.commit(&transaction) {
            return Err(self.logger.transaction_failed(
                &transaction,
                "commit",
                error,
                timing.start_time,
                timing.elapsed(),
            )?);
        }
        self.transaction = None;
        self.logger
            .transaction_committed(&transaction, timing.start_time, timing.elapsed())?;
        self.logger
            .transaction_disposed(&transaction, timing.start_time)
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn commit_async(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let Some(transaction) = self.transaction else {
            return Outcome::Err(Self::no_active_transaction());
        };
        let timing = Timing::start();
        let interception = try_outcome!(
            self.logger
                .transaction_committing_async(cx, &transaction, timing.start_time)
                .await
        );
        if interception.has_result() {
            tracing::debug!("Commit suppressed by interceptor");
        } else {
            let outcome = match cx.cancel_reason() {
                Some(reason) => Outcome::Cancelled(reason),
                None => self.driver.commit_async(cx, &transaction).await,
            };
            if let Err(failure) = Failure::from_outcome(outcome) {
                return self
                    .announce_transaction_failure(cx, &transaction, "commit", timing, failure)
                    .await;
            }
        }
        self.transaction = None;
        try_outcome!(
            self.logger
                .transaction_committed_async(cx, &transaction, timing.start_time, timing.elapsed())
                .await
        );
        match self.logger.transaction_disposed(&transaction, timing.start_time) {
            Ok(()) => Outcome::Ok(()),
            Err(e) => Outcome::Err(e),
        }
    }

    /// Roll back the active transaction.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn rollback(&mut self) -> Result<()> {
        let transaction = self.transaction.ok_or_else(Self::no_active_transaction)?;
        let timing = Timing::start();
        let interception = self
            .logger
            .transaction_rolling_back(&transaction, timing.start_time)?;
        if interception.has_result() {
            tracing::debug!("Rollback suppressed by interceptor");
        } else if let Err(error) = self.driver.rollback(&transaction) {
            return Err(self.logger.transaction_failed(
                &transaction,
                "rollback",
                error,
                timing.start_time,
                timing.elapsed(),
            )?);
        }
        self.transaction = None;
        self.logger
            .transaction_rolled_back(&transaction, timing.start_time, timing.elapsed())?;
        self.logger
            .transaction_disposed(&transaction, timing.start_time)
    }

    #[tracing::instrument(level = "debug", skip(self, cx))]
    pub async fn rollback_async(&mut self, cx: &Cx) -> Outcome<(), Error> {
        let Some(transaction) = self.transaction else {
            return Outcome::Err(Self::no_active_transaction());
        };
        let timing = Timing::start();
        let interception = try_outcome!(
            self.logger
                .transaction_rolling_back_async(cx, &transaction, timing.start_time)
                .await
        );
        if interception.has_result() {
            tracing::debug!("Rollback suppressed by interceptor");
        } else {
            // A rollback still runs when cancellation was requested.
            let outcome = self.driver.rollback_async(cx, &transaction).await;
            if let Err(failure) = Failure::from_outcome(outcome) {
                return self
                    .announce_transaction_failure(cx, &transaction, "rollback", timing, failure)
                    .await;
            }
        }
        self.transaction = None;
        try_outcome!(
            self.logger
                .transaction_rolled_back_async(
                    cx,
                    &transaction,
                    timing.start_time,
                    timing.elapsed(),
                )
                .await
        );
        match self.logger.transaction_disposed(&transaction, timing.start_time) {
            Ok(()) => Outcome::Ok(()),
            Err(e) => Outcome::Err(e),
        }
    }
}

impl<D: Driver + std::fmt::Debug> std::fmt::Debug for RelationalConnection<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelationalConnection")
            .field("driver", &self.driver)
            .field("connection", &self.connection)
            .field("transaction", &self.transaction)
            .finish_non_exhaustive()
    }
}
