//! Connection events.

use crate::event_data::{ConnectionEndEventData, ConnectionErrorEventData, ConnectionEventData};
use crate::event_id::EventId;
use crate::interception::InterceptionResult;
use crate::interceptor::ConnectionInterceptor;
use crate::logger::{DiagnosticsLogger, try_result};
use chrono::{DateTime, Utc};
use sqlmodel_core::{Cx, DbConnection, Error, Outcome, Result, try_outcome};
use std::sync::Arc;
use std::time::Duration;

type Prepared<P> = Option<(P, Option<Arc<dyn ConnectionInterceptor>>)>;

/// `Err` hands the error back untouched when nobody observes the failure.
type PreparedFailure<P> = std::result::Result<(P, Option<Arc<dyn ConnectionInterceptor>>), Error>;

fn opening_message(e: &ConnectionEventData) -> String {
    format!(
        "Opening connection to database '{}' on server '{}'.",
        e.database, e.data_source
    )
}

fn closing_message(e: &ConnectionEventData) -> String {
    format!(
        "Closing connection to database '{}' on server '{}'.",
        e.database, e.data_source
    )
}

fn opened_message(e: &ConnectionEndEventData) -> String {
    format!(
        "Opened connection to database '{}' on server '{}'.",
        e.database, e.data_source
    )
}

fn closed_message(e: &ConnectionEndEventData) -> String {
    format!(
        "Closed connection to database '{}' on server '{}' ({}ms).",
        e.database,
        e.data_source,
        e.duration.as_millis()
    )
}

fn error_message(e: &ConnectionErrorEventData) -> String {
    format!(
        "An error occurred using the connection to database '{}' on server '{}': {}",
        e.database, e.data_source, e.error
    )
}

impl DiagnosticsLogger {
    fn connection_start(
        &self,
        id: EventId,
        message: fn(&ConnectionEventData) -> String,
        connection: &DbConnection,
        is_async: bool,
        start_time: DateTime<Utc>,
    ) -> Result<Prepared<ConnectionEventData>> {
        let observed = self.observe(id, self.interceptors().connection()?);
        if !observed.any() {
            return Ok(None);
        }
        let event = ConnectionEventData {
            definition: observed.definition,
            message,
            context: self.context(),
            connection_id: connection.id(),
            database: connection.database().to_string(),
            data_source: connection.data_source().to_string(),
            is_async,
            start_time,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn connection_end(
        &self,
        id: EventId,
        message: fn(&ConnectionEndEventData) -> String,
        connection: &DbConnection,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Prepared<ConnectionEndEventData>> {
        let observed = self.observe(id, self.interceptors().connection()?);
        if !observed.any() {
            return Ok(None);
        }
        let event = ConnectionEndEventData {
            definition: observed.definition,
            message,
            context: self.context(),
            connection_id: connection.id(),
            database: connection.database().to_string(),
            data_source: connection.data_source().to_string(),
            is_async,
            start_time,
            duration,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn connection_error(
        &self,
        connection: &DbConnection,
        error: Error,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<PreparedFailure<ConnectionErrorEventData>> {
        let observed = self.observe(EventId::ConnectionError, self.interceptors().connection()?);
        if !observed.any() {
            return Ok(Err(error));
        }
        let event = ConnectionErrorEventData {
            definition: observed.definition,
            message: error_message,
            context: self.context(),
            connection_id: connection.id(),
            database: connection.database().to_string(),
            data_source: connection.data_source().to_string(),
            is_async,
            start_time,
            duration,
            error,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Ok((event, observed.interceptor)))
    }

    /// A connection is about to open. A suppressed result skips the driver.
    pub fn connection_opening(
        &self,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult> {
        match self.connection_start(
            EventId::ConnectionOpening,
            opening_message,
            connection,
            false,
            start_time,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.connection_opening(connection, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn connection_opening_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult, Error> {
        match try_result!(self.connection_start(
            EventId::ConnectionOpening,
            opening_message,
            connection,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .connection_opening_async(cx, connection, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    pub fn connection_opened(
        &self,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<()> {
        match self.connection_end(
            EventId::ConnectionOpened,
            opened_message,
            connection,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => interceptor.connection_opened(connection, &event),
            _ => Ok(()),
        }
    }

    pub async fn connection_opened_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<(), Error> {
        match try_result!(self.connection_end(
            EventId::ConnectionOpened,
            opened_message,
            connection,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .connection_opened_async(cx, connection, &event)
                    .await
            }
            _ => Outcome::Ok(()),
        }
    }

    /// A connection is about to close. A suppressed result skips the driver.
    pub fn connection_closing(
        &self,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult> {
        match self.connection_start(
            EventId::ConnectionClosing,
            closing_message,
            connection,
            false,
            start_time,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.connection_closing(connection, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn connection_closing_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult, Error> {
        match try_result!(self.connection_start(
            EventId::ConnectionClosing,
            closing_message,
            connection,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .connection_closing_async(cx, connection, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    pub fn connection_closed(
        &self,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<()> {
        match self.connection_end(
            EventId::ConnectionClosed,
            closed_message,
            connection,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => interceptor.connection_closed(connection, &event),
            _ => Ok(()),
        }
    }

    pub async fn connection_closed_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<(), Error> {
        match try_result!(self.connection_end(
            EventId::ConnectionClosed,
            closed_message,
            connection,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .connection_closed_async(cx, connection, &event)
                    .await
            }
            _ => Outcome::Ok(()),
        }
    }

    /// Opening or closing failed.
    ///
    /// Returns the original error for the caller to propagate; `Err` means an
    /// interceptor (or a throwing log definition) failed instead.
    pub fn connection_failed(
        &self,
        connection: &DbConnection,
        error: Error,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Error> {
        match self.connection_error(connection, error, false, start_time, duration)? {
            Err(error) => Ok(error),
            Ok((event, interceptor)) => {
                if let Some(interceptor) = interceptor {
                    interceptor.connection_failed(connection, &event)?;
                }
                Ok(event.error)
            }
        }
    }

    pub async fn connection_failed_async(
        &self,
        cx: &Cx,
        connection: &DbConnection,
        error: Error,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<Error, Error> {
        match try_result!(self.connection_error(connection, error, true, start_time, duration)) {
            Err(error) => Outcome::Ok(error),
            Ok((event, interceptor)) => {
                if let Some(interceptor) = interceptor {
                    try_outcome!(
                        interceptor
                            .connection_failed_async(cx, connection, &event)
                            .await
                    );
                }
                Outcome::Ok(event.error)
            }
        }
    }
}
