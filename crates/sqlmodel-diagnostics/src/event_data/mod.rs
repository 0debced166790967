//! Event payloads.
//!
//! A payload is an immutable snapshot built just before an event is announced
//! and handed to the log sink, the [`DiagnosticListener`](crate::DiagnosticListener)
//! and the resolved interceptors. Payloads are composed from plain fields; the
//! capability traits below answer the "is-a" questions consumers ask of a
//! `&dyn EventData` (is this an error event? which connection is it about?).
//!
//! Every payload carries a `message` generator. The text is only produced when
//! the event is actually written to a log sink.

mod command;
mod connection;
mod migration;
mod model;
mod transaction;
mod update;

pub use command::{
    CommandCorrelatedEventData, CommandEndEventData, CommandErrorEventData, CommandEventData,
    CommandExecutedEventData, DataReaderClosingEventData, DataReaderDisposingEventData,
    ExecutionResult,
};
pub use connection::{ConnectionEndEventData, ConnectionErrorEventData, ConnectionEventData};
pub use migration::{MigrationEventData, MigratorConnectionEventData, MigratorEventData};
pub use model::PropertyEventData;
pub use transaction::{
    TransactionEndEventData, TransactionErrorEventData, TransactionEventData,
    TransactionStartingEventData,
};
pub use update::BatchEventData;

use crate::definition::EventDefinition;
use crate::event_id::EventId;
use chrono::{DateTime, Utc};
use sqlmodel_core::{CommandId, ConnectionId, ContextId, Error, TransactionId};
use std::any::Any;
use std::fmt::Debug;
use std::time::Duration;

/// Base capability of every payload.
pub trait EventData: Any + Send + Sync + Debug {
    fn definition(&self) -> &EventDefinition;

    /// Render the log message for this event.
    fn message(&self) -> String;

    fn as_any(&self) -> &dyn Any;

    fn event_id(&self) -> EventId {
        self.definition().id
    }

    /// `Some` for payloads describing a failure.
    fn as_error(&self) -> Option<&dyn ErrorEvent> {
        None
    }

    /// `Some` for payloads tied to a connection.
    fn as_connection_correlated(&self) -> Option<&dyn ConnectionCorrelated> {
        None
    }
}

impl dyn EventData {
    /// Downcast to a concrete payload type.
    pub fn downcast_ref<P: EventData>(&self) -> Option<&P> {
        self.as_any().downcast_ref::<P>()
    }
}

/// Payload owned by a logical scope (a session).
pub trait ContextEvent: EventData {
    /// `None` when the event was raised outside any scope.
    fn context(&self) -> Option<ContextId>;
}

pub trait ConnectionCorrelated: ContextEvent {
    fn connection_id(&self) -> ConnectionId;
}

pub trait CommandCorrelated: ConnectionCorrelated {
    fn command_id(&self) -> CommandId;
}

pub trait TransactionCorrelated: ConnectionCorrelated {
    fn transaction_id(&self) -> TransactionId;
}

/// Payload of an operation that started at a known time.
pub trait StartEvent: EventData {
    fn start_time(&self) -> DateTime<Utc>;

    /// Whether the operation runs on the async path.
    fn is_async(&self) -> bool;
}

pub trait EndEvent: StartEvent {
    fn duration(&self) -> Duration;
}

pub trait ErrorEvent: EndEvent {
    fn error(&self) -> &Error;
}

/// Implements [`EventData`] for a payload with `definition` and `message` fields.
macro_rules! impl_event_data {
    ($ty:ty) => {
        impl $crate::event_data::EventData for $ty {
            fn definition(&self) -> &$crate::definition::EventDefinition {
                &self.definition
            }

            fn message(&self) -> String {
                (self.message)(self)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }
        }
    };
    ($ty:ty, connection) => {
        impl $crate::event_data::EventData for $ty {
            fn definition(&self) -> &$crate::definition::EventDefinition {
                &self.definition
            }

            fn message(&self) -> String {
                (self.message)(self)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_connection_correlated(
                &self,
            ) -> Option<&dyn $crate::event_data::ConnectionCorrelated> {
                Some(self)
            }
        }
    };
    ($ty:ty, error) => {
        impl $crate::event_data::EventData for $ty {
            fn definition(&self) -> &$crate::definition::EventDefinition {
                &self.definition
            }

            fn message(&self) -> String {
                (self.message)(self)
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_error(&self) -> Option<&dyn $crate::event_data::ErrorEvent> {
                Some(self)
            }

            fn as_connection_correlated(
                &self,
            ) -> Option<&dyn $crate::event_data::ConnectionCorrelated> {
                Some(self)
            }
        }

        impl $crate::event_data::ErrorEvent for $ty {
            fn error(&self) -> &sqlmodel_core::Error {
                &self.error
            }
        }
    };
}

/// Implements the context/connection/timing capabilities from same-named fields.
macro_rules! impl_capabilities {
    ($ty:ty: context) => {
        impl $crate::event_data::ContextEvent for $ty {
            fn context(&self) -> Option<sqlmodel_core::ContextId> {
                self.context
            }
        }
    };
    ($ty:ty: connection) => {
        impl_capabilities!($ty: context);

        impl $crate::event_data::ConnectionCorrelated for $ty {
            fn connection_id(&self) -> sqlmodel_core::ConnectionId {
                self.connection_id
            }
        }
    };
    ($ty:ty: command) => {
        impl_capabilities!($ty: connection);

        impl $crate::event_data::CommandCorrelated for $ty {
            fn command_id(&self) -> sqlmodel_core::CommandId {
                self.command_id
            }
        }
    };
    ($ty:ty: transaction) => {
        impl_capabilities!($ty: connection);

        impl $crate::event_data::TransactionCorrelated for $ty {
            fn transaction_id(&self) -> sqlmodel_core::TransactionId {
                self.transaction_id
            }
        }
    };
    ($ty:ty: start) => {
        impl $crate::event_data::StartEvent for $ty {
            fn start_time(&self) -> chrono::DateTime<chrono::Utc> {
                self.start_time
            }

            fn is_async(&self) -> bool {
                self.is_async
            }
        }
    };
    ($ty:ty: end) => {
        impl_capabilities!($ty: start);

        impl $crate::event_data::EndEvent for $ty {
            fn duration(&self) -> std::time::Duration {
                self.duration
            }
        }
    };
}

pub(crate) use impl_capabilities;
pub(crate) use impl_event_data;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::EventDefinition;
    use sqlmodel_core::{ConnectionErrorKind, DbConnection};

    fn opened(conn: &DbConnection) -> ConnectionEndEventData {
        ConnectionEndEventData {
            definition: EventDefinition::new(EventId::ConnectionOpened),
            message: |e| format!("Opened connection to '{}'", e.database),
            context: None,
            connection_id: conn.id(),
            database: conn.database().to_string(),
            data_source: conn.data_source().to_string(),
            is_async: false,
            start_time: Utc::now(),
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn capability_queries_through_dyn() {
        let conn = DbConnection::new("heroes", "localhost");
        let event = opened(&conn);
        let dynamic: &dyn EventData = &event;

        assert_eq!(dynamic.event_id(), EventId::ConnectionOpened);
        assert!(dynamic.as_error().is_none());
        assert_eq!(
            dynamic.as_connection_correlated().map(|c| c.connection_id()),
            Some(conn.id())
        );
        assert_eq!(dynamic.message(), "Opened connection to 'heroes'");
        assert!(dynamic.downcast_ref::<ConnectionEndEventData>().is_some());
        assert!(dynamic.downcast_ref::<ConnectionEventData>().is_none());
    }

    #[test]
    fn error_events_expose_the_error() {
        let conn = DbConnection::new("heroes", "localhost");
        let event = ConnectionErrorEventData {
            definition: EventDefinition::new(EventId::ConnectionError),
            message: |e| format!("Failed: {}", e.error),
            context: Some(ContextId::new()),
            connection_id: conn.id(),
            database: conn.database().to_string(),
            data_source: conn.data_source().to_string(),
            is_async: true,
            start_time: Utc::now(),
            duration: Duration::ZERO,
            error: Error::Connection(sqlmodel_core::ConnectionError {
                kind: ConnectionErrorKind::Refused,
                message: "refused".to_string(),
                source: None,
            }),
        };

        let dynamic: &dyn EventData = &event;
        let error = dynamic.as_error().expect("error capability");
        assert!(error.error().is_connection_error());
        assert!(error.is_async());
        assert_eq!(error.duration(), Duration::ZERO);
    }
}
