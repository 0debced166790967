//! The diagnostics logger: one entry point per interception point.
//!
//! Each dispatch helper follows the same steps:
//!
//! 1. Decide cheaply whether anyone observes the event: the log sink (after
//!    level and behavior filtering), the [`DiagnosticListener`], or a resolved
//!    interceptor. If nobody does, return the default result immediately.
//! 2. Build the payload.
//! 3. Write it to the log sink and publish it on the listener.
//! 4. Run the resolved interceptor with a fresh [`InterceptionResult`]
//!    ("about to" events) or the value produced by the operation ("completed"
//!    events). "Failed" helpers hand the error back to the caller.
//!
//! The helpers live in the `dispatch` modules, grouped by logger category.
//!
//! [`InterceptionResult`]: crate::InterceptionResult

use crate::definition::{EventDefinition, WarningBehavior};
use crate::event_data::EventData;
use crate::event_id::EventId;
use crate::interceptor::Interceptors;
use crate::listener::DiagnosticListener;
use crate::options::DiagnosticsOptions;
use crate::sink::{LogSink, TracingSink};
use chrono::{DateTime, Utc};
use sqlmodel_core::{ContextId, Error, Result, Value, WarningError};
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

/// Return early from an `Outcome`-returning async fn on `Err`.
macro_rules! try_result {
    ($expr:expr) => {
        match $expr {
            Ok(value) => value,
            Err(e) => return sqlmodel_core::Outcome::Err(e),
        }
    };
}

pub(crate) use try_result;

/// Who observes one occurrence of an event.
pub(crate) struct Observed<I: ?Sized> {
    pub definition: EventDefinition,
    pub log: bool,
    pub publish: bool,
    pub interceptor: Option<Arc<I>>,
}

impl<I: ?Sized> Observed<I> {
    pub fn any(&self) -> bool {
        self.log || self.publish || self.interceptor.is_some()
    }
}

/// Expiry timestamps (µs since the epoch) of the logging cache windows.
///
/// When an "about to" announcement is observed by nobody, the matching window
/// is opened until `start_time + logging_cache_time`; callers consult the
/// `should_log_*` checks and may skip announcing at all while it is open.
/// Any observed announcement closes the window again.
#[derive(Debug)]
struct LoggingCache {
    command_create: AtomicI64,
    command_execute: AtomicI64,
    data_reader_close: AtomicI64,
    data_reader_dispose: AtomicI64,
}

impl LoggingCache {
    fn new() -> Self {
        Self {
            command_create: AtomicI64::new(i64::MIN),
            command_execute: AtomicI64::new(i64::MIN),
            data_reader_close: AtomicI64::new(i64::MIN),
            data_reader_dispose: AtomicI64::new(i64::MIN),
        }
    }
}

/// Which logging cache window an announcement belongs to.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CacheWindow {
    CommandCreate,
    CommandExecute,
    DataReaderClose,
    DataReaderDispose,
}

/// Writes diagnostics events to a log sink and a listener, and runs the
/// interceptors of its scope.
pub struct DiagnosticsLogger {
    options: Arc<DiagnosticsOptions>,
    sink: Arc<dyn LogSink>,
    listener: Arc<DiagnosticListener>,
    interceptors: Arc<Interceptors>,
    context: Option<ContextId>,
    cache: LoggingCache,
}

impl DiagnosticsLogger {
    /// Logger with default options, a [`TracingSink`] and no interceptors.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    #[must_use]
    pub fn builder() -> DiagnosticsLoggerBuilder {
        DiagnosticsLoggerBuilder::default()
    }

    /// A logger for another scope sharing this logger's options, sink and listener.
    #[must_use]
    pub fn for_scope(&self, context: ContextId, interceptors: Arc<Interceptors>) -> Self {
        Self {
            options: Arc::clone(&self.options),
            sink: Arc::clone(&self.sink),
            listener: Arc::clone(&self.listener),
            interceptors,
            context: Some(context),
            cache: LoggingCache::new(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &DiagnosticsOptions {
        &self.options
    }

    #[must_use]
    pub fn listener(&self) -> &Arc<DiagnosticListener> {
        &self.listener
    }

    #[must_use]
    pub fn interceptors(&self) -> &Arc<Interceptors> {
        &self.interceptors
    }

    #[must_use]
    pub const fn context(&self) -> Option<ContextId> {
        self.context
    }

    /// Definition of `id` under this logger's options.
    #[must_use]
    pub fn definition(&self, id: EventId) -> EventDefinition {
        self.options.definition(id)
    }

    /// Whether an event with this definition is written to the log sink.
    #[must_use]
    pub fn should_log(&self, definition: &EventDefinition) -> bool {
        match definition.behavior {
            WarningBehavior::Ignore => false,
            WarningBehavior::Throw => true,
            WarningBehavior::Log => {
                definition.level >= self.options.min_level
                    && self
                        .sink
                        .is_enabled(definition.category(), definition.level)
            }
        }
    }

    /// Whether "command creating" should be announced at `now`.
    #[must_use]
    pub fn should_log_command_create(&self, now: DateTime<Utc>) -> bool {
        self.window_closed(CacheWindow::CommandCreate, now)
    }

    /// Whether "command executing" should be announced at `now`.
    #[must_use]
    pub fn should_log_command_execute(&self, now: DateTime<Utc>) -> bool {
        self.window_closed(CacheWindow::CommandExecute, now)
    }

    /// Whether "data reader closing" should be announced at `now`.
    #[must_use]
    pub fn should_log_data_reader_close(&self, now: DateTime<Utc>) -> bool {
        self.window_closed(CacheWindow::DataReaderClose, now)
    }

    /// Whether "data reader disposing" should be announced at `now`.
    #[must_use]
    pub fn should_log_data_reader_dispose(&self, now: DateTime<Utc>) -> bool {
        self.window_closed(CacheWindow::DataReaderDispose, now)
    }

    /// Render parameters as `@p0='1', @p1=NULL`; values become `'?'` unless
    /// sensitive data logging is enabled.
    #[must_use]
    pub fn format_parameters(params: &[Value], log_values: bool) -> String {
        let mut out = String::new();
        for (i, value) in params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "@p{i}=");
            if !log_values {
                out.push_str("'?'");
            } else if value.is_null() {
                out.push_str("NULL");
            } else {
                let _ = write!(out, "'{value}'");
            }
        }
        out
    }

    fn cache_slot(&self, window: CacheWindow) -> &AtomicI64 {
        match window {
            CacheWindow::CommandCreate => &self.cache.command_create,
            CacheWindow::CommandExecute => &self.cache.command_execute,
            CacheWindow::DataReaderClose => &self.cache.data_reader_close,
            CacheWindow::DataReaderDispose => &self.cache.data_reader_dispose,
        }
    }

    fn window_closed(&self, window: CacheWindow, now: DateTime<Utc>) -> bool {
        now.timestamp_micros() > self.cache_slot(window).load(Ordering::Relaxed)
    }

    /// Open or close a logging cache window for an announcement made at `start_time`.
    pub(crate) fn update_window(
        &self,
        window: CacheWindow,
        start_time: DateTime<Utc>,
        observed: bool,
    ) {
        let slot = self.cache_slot(window);
        if observed {
            slot.store(i64::MIN, Ordering::Relaxed);
        } else {
            let cache_micros =
                i64::try_from(self.options.logging_cache_window().as_micros()).unwrap_or(i64::MAX);
            slot.store(
                start_time.timestamp_micros().saturating_add(cache_micros),
                Ordering::Relaxed,
            );
        }
    }

    /// Decide who observes event `id`.
    pub(crate) fn observe<I: ?Sized>(
        &self,
        id: EventId,
        interceptor: Option<Arc<I>>,
    ) -> Observed<I> {
        let definition = self.definition(id);
        Observed {
            log: self.should_log(&definition),
            publish: self.listener.is_enabled(definition.name()),
            interceptor,
            definition,
        }
    }

    /// Write `payload` to the sink and publish it on the listener.
    pub(crate) fn emit<P: EventData>(&self, log: bool, publish: bool, payload: &P) -> Result<()> {
        if log {
            self.write(payload)?;
        }
        if publish {
            self.listener.publish(payload.definition().name(), payload);
        }
        Ok(())
    }

    fn write(&self, payload: &dyn EventData) -> Result<()> {
        let definition = payload.definition();
        let message = payload.message();
        if definition.behavior == WarningBehavior::Throw {
            return Err(Error::Warning(WarningError {
                event: definition.name(),
                message,
            }));
        }
        self.sink.log(definition, &message);
        Ok(())
    }

    /// Log and publish an event that has no interceptor.
    pub(crate) fn dispatch_log_only<P: EventData>(
        &self,
        id: EventId,
        build: impl FnOnce(EventDefinition) -> P,
    ) -> Result<()> {
        let observed = self.observe::<()>(id, None);
        if !observed.any() {
            return Ok(());
        }
        let payload = build(observed.definition);
        self.emit(observed.log, observed.publish, &payload)
    }
}

impl Default for DiagnosticsLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DiagnosticsLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagnosticsLogger")
            .field("options", &self.options)
            .field("listener", &self.listener)
            .field("interceptors", &self.interceptors)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DiagnosticsLogger`].
#[derive(Default)]
pub struct DiagnosticsLoggerBuilder {
    options: Option<DiagnosticsOptions>,
    sink: Option<Arc<dyn LogSink>>,
    listener: Option<Arc<DiagnosticListener>>,
    interceptors: Option<Arc<Interceptors>>,
    context: Option<ContextId>,
}

impl DiagnosticsLoggerBuilder {
    pub fn options(mut self, options: DiagnosticsOptions) -> Self {
        self.options = Some(options);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn listener(mut self, listener: Arc<DiagnosticListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn interceptors(mut self, interceptors: Arc<Interceptors>) -> Self {
        self.interceptors = Some(interceptors);
        self
    }

    pub fn context(mut self, context: ContextId) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn build(self) -> DiagnosticsLogger {
        DiagnosticsLogger {
            options: Arc::new(self.options.unwrap_or_default()),
            sink: self.sink.unwrap_or_else(|| Arc::new(TracingSink)),
            listener: self.listener.unwrap_or_default(),
            interceptors: self.interceptors.unwrap_or_default(),
            context: self.context,
            cache: LoggingCache::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::LogLevel;
    use crate::sink::MemorySink;
    use std::time::Duration;

    fn logger_with(options: DiagnosticsOptions) -> (DiagnosticsLogger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let logger = DiagnosticsLogger::builder()
            .options(options)
            .sink(sink.clone())
            .build();
        (logger, sink)
    }

    #[test]
    fn should_log_respects_min_level() {
        let (logger, _) = logger_with(DiagnosticsOptions::new().min_level(LogLevel::Info));
        assert!(!logger.should_log(&logger.definition(EventId::CommandExecuting)));
        assert!(logger.should_log(&logger.definition(EventId::CommandExecuted)));
    }

    #[test]
    fn ignore_and_throw_bypass_level() {
        let (logger, _) = logger_with(
            DiagnosticsOptions::new()
                .min_level(LogLevel::Off)
                .warning(EventId::BoolWithDefaultWarning, WarningBehavior::Throw)
                .warning(EventId::CommandError, WarningBehavior::Ignore),
        );
        assert!(logger.should_log(&logger.definition(EventId::BoolWithDefaultWarning)));
        assert!(!logger.should_log(&logger.definition(EventId::CommandError)));
    }

    #[test]
    fn format_parameters_hides_values_by_default() {
        let params = vec![Value::BigInt(1), Value::Null, Value::Text("Deadpond".into())];
        assert_eq!(
            DiagnosticsLogger::format_parameters(&params, false),
            "@p0='?', @p1='?', @p2='?'"
        );
        assert_eq!(
            DiagnosticsLogger::format_parameters(&params, true),
            "@p0='1', @p1=NULL, @p2='Deadpond'"
        );
        assert_eq!(DiagnosticsLogger::format_parameters(&[], true), "");
    }

    #[test]
    fn cache_window_opens_and_closes() {
        let (logger, _) = logger_with(
            DiagnosticsOptions::new().logging_cache_time(Duration::from_millis(500)),
        );
        let start = Utc::now();
        assert!(logger.should_log_command_execute(start));

        logger.update_window(CacheWindow::CommandExecute, start, false);
        assert!(!logger.should_log_command_execute(start));
        assert!(!logger.should_log_command_execute(start + chrono::Duration::milliseconds(400)));
        assert!(logger.should_log_command_execute(start + chrono::Duration::milliseconds(600)));
        assert!(logger.should_log_command_create(start));

        logger.update_window(CacheWindow::CommandExecute, start, true);
        assert!(logger.should_log_command_execute(start));
    }

    #[test]
    fn throw_behavior_raises_warning_error() {
        let (logger, sink) = logger_with(
            DiagnosticsOptions::new().default_warning_behavior(WarningBehavior::Throw),
        );
        let err = logger
            .bool_with_default_warning("heroes", "is_active")
            .unwrap_err();
        match err {
            Error::Warning(w) => {
                assert_eq!(w.event, EventId::BoolWithDefaultWarning.name());
                assert!(w.message.contains("is_active"));
            }
            other => panic!("expected warning error, got {other:?}"),
        }
        assert!(sink.records().is_empty());
    }

    #[test]
    fn for_scope_shares_sink_and_sets_context() {
        let (logger, sink) = logger_with(DiagnosticsOptions::new());
        let context = ContextId::new();
        let scoped = logger.for_scope(context, Arc::new(Interceptors::empty()));
        assert_eq!(scoped.context(), Some(context));

        scoped.migration_applying("001_create_heroes").unwrap();
        assert_eq!(sink.event_ids(), vec![EventId::MigrationApplying]);
    }
}
