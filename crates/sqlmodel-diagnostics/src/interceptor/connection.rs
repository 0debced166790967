//! Connection interception.

use super::{BoxFuture, ready};
use crate::event_data::{ConnectionEndEventData, ConnectionErrorEventData, ConnectionEventData};
use crate::interception::InterceptionResult;
use sqlmodel_core::{Cx, DbConnection, Error, Outcome, Result, try_outcome};
use std::sync::Arc;

/// Observes opening and closing of connections.
///
/// Suppressing `connection_opening` means the interceptor has taken care of
/// opening the connection itself; the driver is not called.
#[allow(unused_variables)]
pub trait ConnectionInterceptor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    fn connection_opening(
        &self,
        connection: &DbConnection,
        event: &ConnectionEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        Ok(result)
    }

    fn connection_opening_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEventData,
        result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        ready(Outcome::Ok(result))
    }

    fn connection_opened(
        &self,
        connection: &DbConnection,
        event: &ConnectionEndEventData,
    ) -> Result<()> {
        Ok(())
    }

    fn connection_opened_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }

    fn connection_closing(
        &self,
        connection: &DbConnection,
        event: &ConnectionEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        Ok(result)
    }

    fn connection_closing_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEventData,
        result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        ready(Outcome::Ok(result))
    }

    fn connection_closed(
        &self,
        connection: &DbConnection,
        event: &ConnectionEndEventData,
    ) -> Result<()> {
        Ok(())
    }

    fn connection_closed_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }

    fn connection_failed(
        &self,
        connection: &DbConnection,
        event: &ConnectionErrorEventData,
    ) -> Result<()> {
        Ok(())
    }

    fn connection_failed_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionErrorEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }
}

/// Several connection interceptors acting as one, in registration order.
#[derive(Clone)]
pub struct ConnectionInterceptorChain {
    interceptors: Vec<Arc<dyn ConnectionInterceptor>>,
}

impl ConnectionInterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn ConnectionInterceptor>>) -> Self {
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

impl ConnectionInterceptor for ConnectionInterceptorChain {
    fn name(&self) -> &'static str {
        "ConnectionInterceptorChain"
    }

    fn connection_opening(
        &self,
        connection: &DbConnection,
        event: &ConnectionEventData,
        mut result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        for interceptor in &self.interceptors {
            result = interceptor.connection_opening(connection, event, result)?;
        }
        Ok(result)
    }

    fn connection_opening_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEventData,
        mut result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .connection_opening_async(cx, connection, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn connection_opened(
        &self,
        connection: &DbConnection,
        event: &ConnectionEndEventData,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.connection_opened(connection, event)?;
        }
        Ok(())
    }

    fn connection_opened_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(
                    interceptor
                        .connection_opened_async(cx, connection, event)
                        .await
                );
            }
            Outcome::Ok(())
        })
    }

    fn connection_closing(
        &self,
        connection: &DbConnection,
        event: &ConnectionEventData,
        mut result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        for interceptor in &self.interceptors {
            result = interceptor.connection_closing(connection, event, result)?;
        }
        Ok(result)
    }

    fn connection_closing_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEventData,
        mut result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .connection_closing_async(cx, connection, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn connection_closed(
        &self,
        connection: &DbConnection,
        event: &ConnectionEndEventData,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.connection_closed(connection, event)?;
        }
        Ok(())
    }

    fn connection_closed_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(
                    interceptor
                        .connection_closed_async(cx, connection, event)
                        .await
                );
            }
            Outcome::Ok(())
        })
    }

    fn connection_failed(
        &self,
        connection: &DbConnection,
        event: &ConnectionErrorEventData,
    ) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.connection_failed(connection, event)?;
        }
        Ok(())
    }

    fn connection_failed_async<'a>(
        &'a self,
        cx: &'a Cx,
        connection: &'a DbConnection,
        event: &'a ConnectionErrorEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(
                    interceptor
                        .connection_failed_async(cx, connection, event)
                        .await
                );
            }
            Outcome::Ok(())
        })
    }
}
