//! Resolved event definitions.

use crate::event_id::{EventId, LoggerCategory};
use crate::level::LogLevel;
use serde::{Deserialize, Serialize};

/// What happens when an event is logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningBehavior {
    /// Write the event to the log sink.
    #[default]
    Log,
    /// Do not log the event. Interceptors and listeners still see it.
    Ignore,
    /// Raise the event as [`Error::Warning`](sqlmodel_core::Error::Warning).
    Throw,
}

/// An [`EventId`] with its configured level and behavior applied.
///
/// Definitions are cheap copies produced by
/// [`DiagnosticsOptions::definition`](crate::DiagnosticsOptions::definition)
/// and carried by every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventDefinition {
    pub id: EventId,
    pub level: LogLevel,
    pub behavior: WarningBehavior,
}

impl EventDefinition {
    /// Definition with the event's defaults.
    #[must_use]
    pub const fn new(id: EventId) -> Self {
        Self {
            id,
            level: id.default_level(),
            behavior: WarningBehavior::Log,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.id.name()
    }

    #[must_use]
    pub const fn category(&self) -> LoggerCategory {
        self.id.category()
    }
}
