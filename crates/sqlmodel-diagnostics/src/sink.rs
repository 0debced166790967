//! Log sinks.
//!
//! The diagnostics logger writes rendered event messages to a [`LogSink`].
//! [`TracingSink`] forwards them to `tracing`; [`MemorySink`] keeps them in
//! memory for tests.

use crate::definition::EventDefinition;
use crate::event_id::{EventId, LoggerCategory};
use crate::level::LogLevel;
use std::sync::{Mutex, PoisonError};

/// Destination for rendered diagnostics messages.
pub trait LogSink: Send + Sync {
    /// Cheap pre-check made before any payload is built.
    fn is_enabled(&self, category: LoggerCategory, level: LogLevel) -> bool;

    fn log(&self, definition: &EventDefinition, message: &str);
}

/// Emits each event as a `tracing` event with `event_id` and `category` fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn is_enabled(&self, _category: LoggerCategory, level: LogLevel) -> bool {
        match level {
            LogLevel::Trace => tracing::enabled!(tracing::Level::TRACE),
            LogLevel::Debug => tracing::enabled!(tracing::Level::DEBUG),
            LogLevel::Info => tracing::enabled!(tracing::Level::INFO),
            LogLevel::Warn => tracing::enabled!(tracing::Level::WARN),
            LogLevel::Error => tracing::enabled!(tracing::Level::ERROR),
            LogLevel::Off => false,
        }
    }

    fn log(&self, definition: &EventDefinition, message: &str) {
        let event_id = definition.name();
        let category = definition.category().name();
        match definition.level {
            LogLevel::Trace => tracing::trace!(event_id, category, "{message}"),
            LogLevel::Debug => tracing::debug!(event_id, category, "{message}"),
            LogLevel::Info => tracing::info!(event_id, category, "{message}"),
            LogLevel::Warn => tracing::warn!(event_id, category, "{message}"),
            LogLevel::Error => tracing::error!(event_id, category, "{message}"),
            LogLevel::Off => {}
        }
    }
}

/// A message captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub event_id: EventId,
    pub level: LogLevel,
    pub message: String,
}

/// Keeps every message in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything logged so far.
    #[must_use]
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Ids of the logged events, in order.
    #[must_use]
    pub fn event_ids(&self) -> Vec<EventId> {
        self.records().into_iter().map(|r| r.event_id).collect()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl LogSink for MemorySink {
    fn is_enabled(&self, _category: LoggerCategory, level: LogLevel) -> bool {
        level != LogLevel::Off
    }

    fn log(&self, definition: &EventDefinition, message: &str) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogRecord {
                event_id: definition.id,
                level: definition.level,
                message: message.to_string(),
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_records_in_order() {
        let sink = MemorySink::new();
        sink.log(&EventDefinition::new(EventId::ConnectionOpening), "opening");
        sink.log(&EventDefinition::new(EventId::ConnectionOpened), "opened");

        assert_eq!(
            sink.event_ids(),
            vec![EventId::ConnectionOpening, EventId::ConnectionOpened]
        );
        assert_eq!(sink.records()[1].message, "opened");
        sink.clear();
        assert!(sink.records().is_empty());
    }

    #[test]
    fn tracing_sink_never_enables_off() {
        assert!(!TracingSink.is_enabled(LoggerCategory::Command, LogLevel::Off));
        TracingSink.log(&EventDefinition::new(EventId::CommandExecuting), "no subscriber");
    }
}
