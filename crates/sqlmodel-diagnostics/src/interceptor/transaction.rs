//! Transaction interception.

use super::{BoxFuture, ready};
use crate::event_data::{
    TransactionEndEventData, TransactionErrorEventData, TransactionEventData,
    TransactionStartingEventData,
};
use crate::interception::InterceptionResult;
use sqlmodel_core::{Cx, DbConnection, DbTransaction, Error, Outcome, Result, try_outcome};
use std::sync::Arc;

/// Observes, replaces or vetoes transaction operations.
///
/// Suppressing `transaction_starting` supplies the transaction handle without
/// calling the driver. `transaction_started` and `transaction_used` may swap
/// the handle the caller receives.
#[allow(unused_variables)]
pub trait TransactionInterceptor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn transaction_starting(
        &self,
        connection: &DbConnection,
        event: &TransactionStartingEventData,
        result: InterceptionResult<DbTransaction>,
    ) -> Result<InterceptionResult<DbTransaction>> {
        Ok(result)
    }

    fn transaction_starting_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a TransactionStartingEventData,
        result: InterceptionResult<DbTransaction>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<DbTransaction>, Error>> {
        ready(Outcome::Ok(result))
    }

    fn transaction_started(
        &self,
        connection: &DbConnection,
        event: &TransactionEndEventData,
        result: DbTransaction,
    ) -> Result<DbTransaction> {
        Ok(result)
    }

    fn transaction_started_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a TransactionEndEventData,
        result: DbTransaction,
    ) -> BoxFuture<'a, Outcome<DbTransaction, Error>> {
        ready(Outcome::Ok(result))
    }

    /// An externally started transaction was handed to the connection.
    fn transaction_used(
        &self,
        connection: &DbConnection,
        event: &TransactionEndEventData,
        result: DbTransaction,
    ) -> Result<DbTransaction> {
        Ok(result)
    }

    fn transaction_used_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a TransactionEndEventData,
        result: DbTransaction,
    ) -> BoxFuture<'a, Outcome<DbTransaction, Error>> {
        ready(Outcome::Ok(result))
    }

    fn transaction_committing(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        Ok(result)
    }

    fn transaction_committing_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEventData,
        result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        ready(Outcome::Ok(result))
    }

    fn transaction_committed(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEndEventData,
    ) -> Result<()> {
        Ok(())
    }

    fn transaction_committed_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }

    fn transaction_rolling_back(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        Ok(result)
    }

    fn transaction_rolling_back_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEventData,
        result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        ready(Outcome::Ok(result))
    }

    fn transaction_rolled_back(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEndEventData,
    ) -> Result<()> {
        Ok(())
    }

    fn transaction_rolled_back_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }

    /// Begin, commit or rollback failed; `event.action` says which.
    fn transaction_failed(
        &self,
        transaction: &DbTransaction,
        event: &TransactionErrorEventData,
    ) -> Result<()> {
        Ok(())
    }

    fn transaction_failed_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionErrorEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }
}

/// Several transaction interceptors acting as one, in registration order.
#[derive(Clone)]
pub struct TransactionInterceptorChain {
    interceptors: Vec<Arc<dyn TransactionInterceptor>>,
}

impl TransactionInterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn TransactionInterceptor>>) -> Self {
        Self { interceptors }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl TransactionInterceptor for TransactionInterceptorChain {
    fn name(&self) -> &'static str {
        "TransactionInterceptorChain"
    }

    fn transaction_starting(
        &self,
        connection: &DbConnection,
        event: &TransactionStartingEventData,
        mut result: InterceptionResult<DbTransaction>,
    ) -> Result<InterceptionResult<DbTransaction>> {
        for interceptor in &self.interceptors {
            result = interceptor.transaction_starting(connection, event, result)?;
        }
        Ok(result)
    }

    fn transaction_starting_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a TransactionStartingEventData,
        mut result: InterceptionResult<DbTransaction>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<DbTransaction>, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .transaction_starting_async(cx, connection, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn transaction_started(
        &self,
        connection: &DbConnection,
        event: &TransactionEndEventData,
        mut result: DbTransaction,
    ) -> Result<DbTransaction> {
        for interceptor in &self.interceptors {
            result = interceptor.transaction_started(connection, event, result)?;
        }
        Ok(result)
    }

    fn transaction_started_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a TransactionEndEventData,
        mut result: DbTransaction,
    ) -> BoxFuture<'a, Outcome<DbTransaction, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .transaction_started_async(cx, connection, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn transaction_used(
        &self,
        connection: &DbConnection,
        event: &TransactionEndEventData,
        mut result: DbTransaction,
    ) -> Result<DbTransaction> {
        for interceptor in &self.interceptors {
            result = interceptor.transaction_used(connection, event, result)?;
        }
        Ok(result)
    }

    fn transaction_used_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a TransactionEndEventData,
        mut result: DbTransaction,
    ) -> BoxFuture<'a, Outcome<DbTransaction, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .transaction_used_async(cx, connection, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn transaction_committing(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEventData,
        mut result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        for interceptor in &self.interceptors {
            result = interceptor.transaction_committing(transaction, event, result)?;
        }
        Ok(result)
    }

    fn transaction_committing_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEventData,
        mut result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .transaction_committing_async(cx, transaction, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn transaction_committed(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEndEventData,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.transaction_committed(transaction, event)?;
        }
        Ok(())
    }

    fn transaction_committed_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(
                    interceptor
                        .transaction_committed_async(cx, transaction, event)
                        .await
                );
            }
            Outcome::Ok(())
        })
    }

    fn transaction_rolling_back(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEventData,
        mut result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        for interceptor in &self.interceptors {
            result = interceptor.transaction_rolling_back(transaction, event, result)?;
        }
        Ok(result)
    }

    fn transaction_rolling_back_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEventData,
        mut result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .transaction_rolling_back_async(cx, transaction, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn transaction_rolled_back(
        &self,
        transaction: &DbTransaction,
        event: &TransactionEndEventData,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.transaction_rolled_back(transaction, event)?;
        }
        Ok(())
    }

    fn transaction_rolled_back_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(
                    interceptor
                        .transaction_rolled_back_async(cx, transaction, event)
                        .await
                );
            }
            Outcome::Ok(())
        })
    }

    fn transaction_failed(
        &self,
        transaction: &DbTransaction,
        event: &TransactionErrorEventData,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.transaction_failed(transaction, event)?;
        }
        Ok(())
    }

    fn transaction_failed_async<'a>(
        &'a self,
        cx: &'a Cx,
        transaction: &'a DbTransaction,
        event: &'a TransactionErrorEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(
                    interceptor
                        .transaction_failed_async(cx, transaction, event)
                        .await
                );
            }
            Outcome::Ok(())
        })
    }
}
