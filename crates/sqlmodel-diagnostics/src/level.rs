//! Log levels for diagnostics events.

use serde::{Deserialize, Serialize};

/// Severity of a diagnostics event.
///
/// Ordered from most to least verbose so `level >= min_level` decides whether
/// an event is logged.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LogLevel {
    /// Detailed trace information (most verbose).
    Trace = 0,
    /// Debug information for development.
    Debug = 1,
    /// General information about operations.
    #[default]
    Info = 2,
    /// Warnings about potential issues.
    Warn = 3,
    /// Errors that occurred during operations.
    Error = 4,
    /// No logging (disabled).
    Off = 5,
}

impl LogLevel {
    /// Parse a log level from a string.
    ///
    /// Accepts: "trace", "debug", "info", "warn", "error", "off" (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" | "information" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "off" | "none" => Some(Self::Off),
            _ => None,
        }
    }

    /// Get the level name as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Off => "OFF",
        }
    }

    /// The matching `tracing` level; `None` for [`LogLevel::Off`].
    #[must_use]
    pub const fn to_tracing(self) -> Option<tracing::Level> {
        match self {
            Self::Trace => Some(tracing::Level::TRACE),
            Self::Debug => Some(tracing::Level::DEBUG),
            Self::Info => Some(tracing::Level::INFO),
            Self::Warn => Some(tracing::Level::WARN),
            Self::Error => Some(tracing::Level::ERROR),
            Self::Off => None,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(LogLevel::parse("TRACE"), Some(LogLevel::Trace));
        assert_eq!(LogLevel::parse(" warning "), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("none"), Some(LogLevel::Off));
        assert_eq!(LogLevel::parse("loud"), None);
    }

    #[test]
    fn test_ordering() {
        assert!(LogLevel::Trace < LogLevel::Debug);
        assert!(LogLevel::Error < LogLevel::Off);
        assert!(LogLevel::Warn >= LogLevel::Info);
    }

    #[test]
    fn test_tracing_mapping() {
        assert_eq!(LogLevel::Info.to_tracing(), Some(tracing::Level::INFO));
        assert_eq!(LogLevel::Off.to_tracing(), None);
    }

    #[test]
    fn test_serde_lowercase() {
        let level: LogLevel = serde_json::from_str("\"debug\"").unwrap();
        assert_eq!(level, LogLevel::Debug);
        assert_eq!(serde_json::to_string(&LogLevel::Warn).unwrap(), "\"warn\"");
    }
}
