//! Transaction events.

use crate::event_data::{
    TransactionEndEventData, TransactionErrorEventData, TransactionEventData,
    TransactionStartingEventData,
};
use crate::event_id::EventId;
use crate::interception::InterceptionResult;
use crate::interceptor::TransactionInterceptor;
use crate::logger::{DiagnosticsLogger, try_result};
use chrono::{DateTime, Utc};
use sqlmodel_core::{
    Cx, DbConnection, DbTransaction, Error, IsolationLevel, Outcome, Result, TransactionId,
    try_outcome,
};
use std::sync::Arc;
use std::time::Duration;

type Prepared<P> = Option<(P, Option<Arc<dyn TransactionInterceptor>>)>;

/// `Err` hands the error back untouched when nobody observes the failure.
type PreparedFailure<P> =
    std::result::Result<(P, Option<Arc<dyn TransactionInterceptor>>), Error>;

fn starting_message(e: &TransactionStartingEventData) -> String {
    format!(
        "Beginning transaction with isolation level '{}'.",
        e.isolation_level
    )
}

fn started_message(e: &TransactionEndEventData) -> String {
    format!("Began transaction {}.", e.transaction_id)
}

fn used_message(e: &TransactionEndEventData) -> String {
    format!("Using an existing transaction {}.", e.transaction_id)
}

fn committing_message(e: &TransactionEventData) -> String {
    format!("Committing transaction {}.", e.transaction_id)
}

fn committed_message(e: &TransactionEndEventData) -> String {
    format!(
        "Committed transaction {} ({}ms).",
        e.transaction_id,
        e.duration.as_millis()
    )
}

fn rolling_back_message(e: &TransactionEventData) -> String {
    format!("Rolling back transaction {}.", e.transaction_id)
}

fn rolled_back_message(e: &TransactionEndEventData) -> String {
    format!(
        "Rolled back transaction {} ({}ms).",
        e.transaction_id,
        e.duration.as_millis()
    )
}

fn disposed_message(e: &TransactionEventData) -> String {
    format!("Disposing transaction {}.", e.transaction_id)
}

fn error_message(e: &TransactionErrorEventData) -> String {
    format!(
        "An error occurred during transaction {} of {}: {}",
        e.action, e.transaction_id, e.error
    )
}

impl DiagnosticsLogger {
    fn transaction_event(
        &self,
        id: EventId,
        message: fn(&TransactionEventData) -> String,
        transaction: &DbTransaction,
        is_async: bool,
        start_time: DateTime<Utc>,
    ) -> Result<Prepared<TransactionEventData>> {
        let observed = self.observe(id, self.interceptors().transaction()?);
        if !observed.any() {
            return Ok(None);
        }
        let event = TransactionEventData {
            definition: observed.definition,
            message,
            context: self.context(),
            connection_id: transaction.connection_id(),
            transaction_id: transaction.id(),
            is_async,
            start_time,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn transaction_end(
        &self,
        id: EventId,
        message: fn(&TransactionEndEventData) -> String,
        transaction: &DbTransaction,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Prepared<TransactionEndEventData>> {
        let observed = self.observe(id, self.interceptors().transaction()?);
        if !observed.any() {
            return Ok(None);
        }
        let event = TransactionEndEventData {
            definition: observed.definition,
            message,
            context: self.context(),
            connection_id: transaction.connection_id(),
            transaction_id: transaction.id(),
            is_async,
            start_time,
            duration,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn transaction_starting_event(
        &self,
        connection: &DbConnection,
        transaction_id: TransactionId,
        isolation_level: IsolationLevel,
        is_async: bool,
        start_time: DateTime<Utc>,
    ) -> Result<Prepared<TransactionStartingEventData>> {
        let observed = self.observe(
            EventId::TransactionStarting,
            self.interceptors().transaction()?,
        );
        if !observed.any() {
            return Ok(None);
        }
        let event = TransactionStartingEventData {
            definition: observed.definition,
            message: starting_message,
            context: self.context(),
            connection_id: connection.id(),
            transaction_id,
            isolation_level,
            is_async,
            start_time,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn transaction_error(
        &self,
        transaction: &DbTransaction,
        action: &'static str,
        error: Error,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<PreparedFailure<TransactionErrorEventData>> {
        let observed = self.observe(EventId::TransactionError, self.interceptors().transaction()?);
        if !observed.any() {
            return Ok(Err(error));
        }
        let event = TransactionErrorEventData {
            definition: observed.definition,
            message: error_message,
            context: self.context(),
            connection_id: transaction.connection_id(),
            transaction_id: transaction.id(),
            action,
            is_async,
            start_time,
            duration,
            error,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Ok((event, observed.interceptor)))
    }

    /// A transaction is about to begin on `connection`.
    ///
    /// `transaction_id` is reserved by the caller. A suppressed result
    /// supplies the transaction handle and skips the driver.
    pub fn transaction_starting(
        &self,
        connection: &DbConnection,
        transaction_id: TransactionId,
        isolation_level: IsolationLevel,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult<DbTransaction>> {
        match self.transaction_starting_event(
            connection,
            transaction_id,
            isolation_level,
            false,
            start_time,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.transaction_starting(connection, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn transaction_starting_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        transaction_id: TransactionId,
        isolation_level: IsolationLevel,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult<DbTransaction>, Error> {
        match try_result!(self.transaction_starting_event(
            connection,
            transaction_id,
            isolation_level,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_starting_async(cx, connection, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    /// A transaction began. Returns the handle the caller should use.
    pub fn transaction_started(
        &self,
        connection: &DbConnection,
        transaction: DbTransaction,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<DbTransaction> {
        match self.transaction_end(
            EventId::TransactionStarted,
            started_message,
            &transaction,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.transaction_started(connection, &event, transaction)
            }
            _ => Ok(transaction),
        }
    }

    pub async fn transaction_started_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        transaction: DbTransaction,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<DbTransaction, Error> {
        match try_result!(self.transaction_end(
            EventId::TransactionStarted,
            started_message,
            &transaction,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_started_async(cx, connection, &event, transaction)
                    .await
            }
            _ => Outcome::Ok(transaction),
        }
    }

    /// An externally started transaction was handed to `connection`.
    pub fn transaction_used(
        &self,
        connection: &DbConnection,
        transaction: DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Result<DbTransaction> {
        match self.transaction_end(
            EventId::TransactionUsed,
            used_message,
            &transaction,
            false,
            start_time,
            Duration::ZERO,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.transaction_used(connection, &event, transaction)
            }
            _ => Ok(transaction),
        }
    }

    pub async fn transaction_used_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        transaction: DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Outcome<DbTransaction, Error> {
        match try_result!(self.transaction_end(
            EventId::TransactionUsed,
            used_message,
            &transaction,
            true,
            start_time,
            Duration::ZERO
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_used_async(cx, connection, &event, transaction)
                    .await
            }
            _ => Outcome::Ok(transaction),
        }
    }

    pub fn transaction_committing(
        &self,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult> {
        match self.transaction_event(
            EventId::TransactionCommitting,
            committing_message,
            transaction,
            false,
            start_time,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.transaction_committing(transaction, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn transaction_committing_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult, Error> {
        match try_result!(self.transaction_event(
            EventId::TransactionCommitting,
            committing_message,
            transaction,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_committing_async(
                        cx,
                        transaction,
                        &event,
                        InterceptionResult::none(),
                    )
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    pub fn transaction_committed(
        &self,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<()> {
        match self.transaction_end(
            EventId::TransactionCommitted,
            committed_message,
            transaction,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.transaction_committed(transaction, &event)
            }
            _ => Ok(()),
        }
    }

    pub async fn transaction_committed_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<(), Error> {
        match try_result!(self.transaction_end(
            EventId::TransactionCommitted,
            committed_message,
            transaction,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_committed_async(cx, transaction, &event)
                    .await
            }
            _ => Outcome::Ok(()),
        }
    }

    pub fn transaction_rolling_back(
        &self,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult> {
        match self.transaction_event(
            EventId::TransactionRollingBack,
            rolling_back_message,
            transaction,
            false,
            start_time,
        )? {
            Some((event, Some(interceptor))) => interceptor.transaction_rolling_back(
                transaction,
                &event,
                InterceptionResult::none(),
            ),
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn transaction_rolling_back_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult, Error> {
        match try_result!(self.transaction_event(
            EventId::TransactionRollingBack,
            rolling_back_message,
            transaction,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_rolling_back_async(
                        cx,
                        transaction,
                        &event,
                        InterceptionResult::none(),
                    )
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    pub fn transaction_rolled_back(
        &self,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<()> {
        match self.transaction_end(
            EventId::TransactionRolledBack,
            rolled_back_message,
            transaction,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.transaction_rolled_back(transaction, &event)
            }
            _ => Ok(()),
        }
    }

    pub async fn transaction_rolled_back_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<(), Error> {
        match try_result!(self.transaction_end(
            EventId::TransactionRolledBack,
            rolled_back_message,
            transaction,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .transaction_rolled_back_async(cx, transaction, &event)
                    .await
            }
            _ => Outcome::Ok(()),
        }
    }

    /// Begin, commit or rollback failed.
    ///
    /// Returns the original error for the caller to propagate; `Err` means an
    /// interceptor (or a throwing log definition) failed instead.
    pub fn transaction_failed(
        &self,
        transaction: &DbTransaction,
        action: &'static str,
        error: Error,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Error> {
        match self.transaction_error(transaction, action, error, false, start_time, duration)? {
            Err(error) => Ok(error),
            Ok((event, interceptor)) => {
                if let Some(interceptor) = interceptor {
                    interceptor.transaction_failed(transaction, &event)?;
                }
                Ok(event.error)
            }
        }
    }

    pub async fn transaction_failed_async(
        &self,
        cx: &Cx,
        transaction: &DbTransaction,
        action: &'static str,
        error: Error,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<Error, Error> {
        match try_result!(self.transaction_error(
            transaction,
            action,
            error,
            true,
            start_time,
            duration
        )) {
            Err(error) => Outcome::Ok(error),
            Ok((event, interceptor)) => {
                if let Some(interceptor) = interceptor {
                    try_outcome!(
                        interceptor
                            .transaction_failed_async(cx, transaction, &event)
                            .await
                    );
                }
                Outcome::Ok(event.error)
            }
        }
    }

    /// The transaction handle was released. Logged and published only.
    pub fn transaction_disposed(
        &self,
        transaction: &DbTransaction,
        start_time: DateTime<Utc>,
    ) -> Result<()> {
        let context = self.context();
        self.dispatch_log_only(EventId::TransactionDisposed, |definition| {
            TransactionEventData {
                definition,
                message: disposed_message,
                context,
                connection_id: transaction.connection_id(),
                transaction_id: transaction.id(),
                is_async: false,
                start_time,
            }
        })
    }
}
