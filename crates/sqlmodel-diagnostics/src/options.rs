//! Configuration for diagnostics logging.
//!
//! Options can be built in code, loaded from JSON, or read from the
//! environment:
//!
//! - `SQLMODEL_LOG_LEVEL=trace|debug|info|warn|error|off` - minimum level
//! - `SQLMODEL_LOG_SENSITIVE=1` - include parameter values in messages
//! - `SQLMODEL_LOG_CACHE_MS=1000` - logging cache window in milliseconds

use crate::definition::{EventDefinition, WarningBehavior};
use crate::event_id::EventId;
use crate::level::LogLevel;
use serde::{Deserialize, Serialize};
use sqlmodel_core::{ConfigError, Error, Result};
use std::collections::HashMap;
use std::env;
use std::time::Duration;

/// Per-event overrides of behavior and level.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarningsConfig {
    /// Behavior for warning-level events without an explicit override.
    pub default_behavior: WarningBehavior,
    /// Explicit behavior per event.
    pub behaviors: HashMap<EventId, WarningBehavior>,
    /// Explicit level per event.
    pub levels: HashMap<EventId, LogLevel>,
}

/// Options controlling what the diagnostics logger writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsOptions {
    /// Events below this level are not written to the log sink.
    pub min_level: LogLevel,
    /// Include parameter values in command messages.
    pub sensitive_data_logging: bool,
    /// How long an unobserved "about to" announcement lets callers skip the next one.
    pub logging_cache_time_ms: u64,
    pub warnings: WarningsConfig,
}

impl Default for DiagnosticsOptions {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            sensitive_data_logging: false,
            logging_cache_time_ms: 1_000,
            warnings: WarningsConfig::default(),
        }
    }
}

impl DiagnosticsOptions {
    /// Create options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read options from `SQLMODEL_LOG_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read options through an arbitrary key lookup.
    ///
    /// Unparseable values are ignored with a warning and the default is kept.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut options = Self::default();

        if let Some(raw) = lookup("SQLMODEL_LOG_LEVEL") {
            match LogLevel::parse(&raw) {
                Some(level) => options.min_level = level,
                None => tracing::warn!(value = %raw, "Ignoring invalid SQLMODEL_LOG_LEVEL"),
            }
        }

        if let Some(raw) = lookup("SQLMODEL_LOG_SENSITIVE") {
            let v = raw.to_lowercase();
            options.sensitive_data_logging = v == "1" || v == "true" || v == "yes" || v == "on";
        }

        if let Some(raw) = lookup("SQLMODEL_LOG_CACHE_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => options.logging_cache_time_ms = ms,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid SQLMODEL_LOG_CACHE_MS"),
            }
        }

        options
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid diagnostics options: {e}"),
                source: Some(Box::new(e)),
            })
        })
    }

    /// Set the minimum level.
    pub fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Enable/disable logging of parameter values.
    pub fn sensitive_data_logging(mut self, enabled: bool) -> Self {
        self.sensitive_data_logging = enabled;
        self
    }

    /// Set the logging cache window.
    pub fn logging_cache_time(mut self, window: Duration) -> Self {
        self.logging_cache_time_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the behavior of warnings without an explicit override.
    pub fn default_warning_behavior(mut self, behavior: WarningBehavior) -> Self {
        self.warnings.default_behavior = behavior;
        self
    }

    /// Override the behavior of one event.
    pub fn warning(mut self, id: EventId, behavior: WarningBehavior) -> Self {
        self.warnings.behaviors.insert(id, behavior);
        self
    }

    /// Override the level of one event.
    pub fn event_level(mut self, id: EventId, level: LogLevel) -> Self {
        self.warnings.levels.insert(id, level);
        self
    }

    #[must_use]
    pub fn logging_cache_window(&self) -> Duration {
        Duration::from_millis(self.logging_cache_time_ms)
    }

    /// Resolve the level and behavior for `id`.
    #[must_use]
    pub fn definition(&self, id: EventId) -> EventDefinition {
        let level = self
            .warnings
            .levels
            .get(&id)
            .copied()
            .unwrap_or_else(|| id.default_level());
        let behavior = self.warnings.behaviors.get(&id).copied().unwrap_or(
            if level == LogLevel::Warn {
                self.warnings.default_behavior
            } else {
                WarningBehavior::Log
            },
        );
        EventDefinition { id, level, behavior }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = DiagnosticsOptions::default();
        assert_eq!(options.min_level, LogLevel::Info);
        assert!(!options.sensitive_data_logging);
        assert_eq!(options.logging_cache_window(), Duration::from_secs(1));
    }

    #[test]
    fn definition_uses_event_defaults() {
        let options = DiagnosticsOptions::default();
        let def = options.definition(EventId::CommandExecuting);
        assert_eq!(def.level, LogLevel::Debug);
        assert_eq!(def.behavior, WarningBehavior::Log);
    }

    #[test]
    fn default_warning_behavior_applies_to_warnings_only() {
        let options = DiagnosticsOptions::new().default_warning_behavior(WarningBehavior::Throw);
        assert_eq!(
            options.definition(EventId::BoolWithDefaultWarning).behavior,
            WarningBehavior::Throw
        );
        assert_eq!(
            options.definition(EventId::CommandError).behavior,
            WarningBehavior::Log
        );
    }

    #[test]
    fn explicit_overrides_win() {
        let options = DiagnosticsOptions::new()
            .default_warning_behavior(WarningBehavior::Throw)
            .warning(EventId::KeyDefaultValueWarning, WarningBehavior::Ignore)
            .event_level(EventId::ConnectionOpened, LogLevel::Info);

        assert_eq!(
            options.definition(EventId::KeyDefaultValueWarning).behavior,
            WarningBehavior::Ignore
        );
        assert_eq!(
            options.definition(EventId::ConnectionOpened).level,
            LogLevel::Info
        );
    }

    #[test]
    fn lowering_an_event_to_warn_makes_it_a_warning() {
        let options = DiagnosticsOptions::new()
            .default_warning_behavior(WarningBehavior::Ignore)
            .event_level(EventId::TransactionUsed, LogLevel::Warn);
        assert_eq!(
            options.definition(EventId::TransactionUsed).behavior,
            WarningBehavior::Ignore
        );
    }

    #[test]
    fn from_lookup_parses_values() {
        let options = DiagnosticsOptions::from_lookup(|key| match key {
            "SQLMODEL_LOG_LEVEL" => Some("debug".to_string()),
            "SQLMODEL_LOG_SENSITIVE" => Some("yes".to_string()),
            "SQLMODEL_LOG_CACHE_MS" => Some("250".to_string()),
            _ => None,
        });
        assert_eq!(options.min_level, LogLevel::Debug);
        assert!(options.sensitive_data_logging);
        assert_eq!(options.logging_cache_time_ms, 250);
    }

    #[test]
    fn from_lookup_ignores_garbage() {
        let options = DiagnosticsOptions::from_lookup(|key| match key {
            "SQLMODEL_LOG_LEVEL" => Some("chatty".to_string()),
            "SQLMODEL_LOG_CACHE_MS" => Some("soon".to_string()),
            _ => None,
        });
        assert_eq!(options, DiagnosticsOptions::default());
    }

    #[test]
    fn from_json_with_partial_fields() {
        let options = DiagnosticsOptions::from_json(
            r#"{
                "min_level": "trace",
                "warnings": {
                    "default_behavior": "throw",
                    "behaviors": { "bool_with_default_warning": "log" }
                }
            }"#,
        )
        .unwrap();
        assert_eq!(options.min_level, LogLevel::Trace);
        assert_eq!(options.logging_cache_time_ms, 1_000);
        assert_eq!(
            options.definition(EventId::BoolWithDefaultWarning).behavior,
            WarningBehavior::Log
        );
        assert_eq!(
            options.definition(EventId::KeyDefaultValueWarning).behavior,
            WarningBehavior::Throw
        );
    }

    #[test]
    fn from_json_rejects_bad_input() {
        let err = DiagnosticsOptions::from_json(r#"{ "min_level": 3 }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
