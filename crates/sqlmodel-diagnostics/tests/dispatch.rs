use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};
use chrono::Utc;
use sqlmodel_core::{
    CommandMethod, CommandSource, DataReader, DbCommand, DbConnection, DbTransaction, Error,
    IsolationLevel, QueryError, QueryErrorKind, Result, Value,
};
use sqlmodel_diagnostics::event_data::{
    CommandErrorEventData, CommandExecutedEventData, ConnectionEndEventData, ExecutionResult,
};
use sqlmodel_diagnostics::{
    CommandInterceptor, DiagnosticListener, DiagnosticObserver, DiagnosticsLogger,
    DiagnosticsOptions, EventData, EventId, Interceptor, InterceptorRegistry, Interceptors, LogLevel,
    MemorySink, WarningBehavior,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

struct Harness {
    logger: DiagnosticsLogger,
    sink: Arc<MemorySink>,
    listener: Arc<DiagnosticListener>,
}

fn harness(options: DiagnosticsOptions, interceptors: Vec<Interceptor>) -> Harness {
    let sink = Arc::new(MemorySink::new());
    let listener = Arc::new(DiagnosticListener::default());
    let registry = interceptors
        .into_iter()
        .fold(InterceptorRegistry::new(), InterceptorRegistry::with);
    let logger = DiagnosticsLogger::builder()
        .options(options)
        .sink(sink.clone())
        .listener(listener.clone())
        .interceptors(Arc::new(Interceptors::new(Arc::new(registry), None)))
        .build();
    Harness {
        logger,
        sink,
        listener,
    }
}

fn syntax_error(sql: &str) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Syntax,
        sql: Some(sql.to_string()),
        sqlstate: Some("42601".to_string()),
        message: "syntax error at or near \"SELEC\"".to_string(),
        source: None,
    })
}

#[test]
fn unobserved_events_take_the_fast_path() {
    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Off), Vec::new());
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT 1");
    let start = Utc::now();

    let result = h
        .logger
        .reader_executing(&mut command, CommandSource::Query, start)
        .unwrap();
    assert!(!result.has_result());
    assert!(h.sink.records().is_empty());

    // Nobody listened, so repeat announcements may be skipped for a while.
    assert!(!h.logger.should_log_command_execute(start));
}

#[test]
fn observed_announcement_keeps_cache_window_closed() {
    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Debug), Vec::new());
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT 1");
    let start = Utc::now();

    h.logger
        .reader_executing(&mut command, CommandSource::Query, start)
        .unwrap();
    assert_eq!(h.sink.event_ids(), vec![EventId::CommandExecuting]);
    assert!(h.logger.should_log_command_execute(start));
}

#[test]
fn executed_event_is_logged_with_hidden_parameters() {
    let h = harness(DiagnosticsOptions::new(), Vec::new());
    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELECT * FROM heroes WHERE name = ?")
        .with_params(vec![Value::Text("Deadpond".to_string())]);

    h.logger
        .reader_executed(
            &command,
            CommandSource::Query,
            DataReader::empty(),
            Utc::now(),
            Duration::from_millis(12),
        )
        .unwrap();

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_id, EventId::CommandExecuted);
    assert_eq!(records[0].level, LogLevel::Info);
    assert!(records[0].message.contains("12ms"));
    assert!(records[0].message.contains("@p0='?'"));
    assert!(!records[0].message.contains("Deadpond"));
}

#[test]
fn sensitive_data_logging_shows_parameter_values() {
    let h = harness(
        DiagnosticsOptions::new().sensitive_data_logging(true),
        Vec::new(),
    );
    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELECT * FROM heroes WHERE name = ?")
        .with_params(vec![Value::Text("Deadpond".to_string())]);

    h.logger
        .reader_executed(
            &command,
            CommandSource::Query,
            DataReader::empty(),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();

    assert!(h.sink.records()[0].message.contains("@p0='Deadpond'"));
}

#[test]
fn listener_receives_typed_payloads_even_when_not_logged() {
    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Off), Vec::new());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let _ = h.listener
        .subscribe_to::<CommandExecutedEventData, _>(move |name, event| {
            sink.lock()
                .expect("lock poisoned")
                .push((name.to_string(), event.result.clone()));
        });

    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "UPDATE heroes SET age = age + 1");
    let rows = h
        .logger
        .non_query_executed(&command, CommandSource::RawSql, 3, Utc::now(), Duration::ZERO)
        .unwrap();

    assert_eq!(rows, 3);
    assert!(h.sink.records().is_empty());
    assert_eq!(
        *seen.lock().expect("lock poisoned"),
        vec![(
            EventId::CommandExecuted.name().to_string(),
            ExecutionResult::NonQuery(3)
        )]
    );
}

/// Only interested in connection events.
struct ConnectionWatcher {
    seen: Mutex<Vec<String>>,
}

impl DiagnosticObserver for ConnectionWatcher {
    fn is_enabled(&self, name: &str) -> bool {
        name.starts_with("sqlmodel.database.connection")
    }

    fn on_event(&self, name: &str, payload: &dyn EventData) {
        let connection = payload
            .as_connection_correlated()
            .map(|c| c.connection_id().to_string());
        self.seen
            .lock()
            .expect("lock poisoned")
            .push(format!("{name} {}", connection.unwrap_or_default()));
        assert!(payload.downcast_ref::<ConnectionEndEventData>().is_some());
    }
}

#[test]
fn observer_filters_by_event_name() {
    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Off), Vec::new());
    let watcher = Arc::new(ConnectionWatcher {
        seen: Mutex::new(Vec::new()),
    });
    let subscription = h.listener.subscribe(watcher.clone());

    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELECT 1");
    h.logger
        .connection_opened(&connection, Utc::now(), Duration::ZERO)
        .unwrap();
    h.logger
        .scalar_executed(
            &command,
            CommandSource::Query,
            Value::BigInt(1),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();

    assert_eq!(
        *watcher.seen.lock().expect("lock poisoned"),
        vec![format!(
            "{} {}",
            EventId::ConnectionOpened.name(),
            connection.id()
        )]
    );

    assert!(h.listener.unsubscribe(subscription));
    assert!(!h.listener.is_enabled(EventId::ConnectionOpened.name()));
}

/// Remembers the message of every failure it sees.
#[derive(Default)]
struct FailureLog {
    errors: Mutex<Vec<String>>,
}

impl CommandInterceptor for FailureLog {
    fn command_failed(&self, _command: &DbCommand, event: &CommandErrorEventData) -> Result<()> {
        self.errors
            .lock()
            .expect("lock poisoned")
            .push(event.error.to_string());
        Ok(())
    }
}

#[test]
fn failure_hands_original_error_back() {
    let failures = Arc::new(FailureLog::default());
    let h = harness(
        DiagnosticsOptions::new(),
        vec![Interceptor::Command(failures.clone())],
    );
    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELEC 1");

    let error = h
        .logger
        .command_failed(
            &command,
            CommandMethod::Reader,
            CommandSource::RawSql,
            syntax_error("SELEC 1"),
            Utc::now(),
            Duration::from_millis(1),
        )
        .unwrap();

    assert_eq!(error.sqlstate(), Some("42601"));
    assert_eq!(failures.errors.lock().expect("lock poisoned").len(), 1);
    let records = h.sink.records();
    assert_eq!(records[0].event_id, EventId::CommandError);
    assert_eq!(records[0].level, LogLevel::Error);
}

#[test]
fn unobserved_failure_still_returns_error() {
    let h = harness(
        DiagnosticsOptions::new().warning(EventId::CommandError, WarningBehavior::Ignore),
        Vec::new(),
    );
    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELEC 1");

    let error = h
        .logger
        .command_failed(
            &command,
            CommandMethod::Reader,
            CommandSource::RawSql,
            syntax_error("SELEC 1"),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();
    assert!(matches!(error, Error::Query(_)));
    assert!(h.sink.records().is_empty());
}

#[test]
fn transaction_lifecycle_is_logged_in_order() {
    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Trace), Vec::new());
    let connection = DbConnection::new("heroes", "memory");
    let tx = DbTransaction::new(connection.id(), IsolationLevel::ReadCommitted);
    let start = Utc::now();

    h.logger
        .transaction_starting(&connection, tx.id(), tx.isolation_level(), start)
        .unwrap();
    let tx = h
        .logger
        .transaction_started(&connection, tx, start, Duration::ZERO)
        .unwrap();
    h.logger.transaction_committing(&tx, start).unwrap();
    h.logger
        .transaction_committed(&tx, start, Duration::ZERO)
        .unwrap();
    h.logger.transaction_disposed(&tx, start).unwrap();

    assert_eq!(
        h.sink.event_ids(),
        vec![
            EventId::TransactionStarting,
            EventId::TransactionStarted,
            EventId::TransactionCommitting,
            EventId::TransactionCommitted,
            EventId::TransactionDisposed,
        ]
    );
}

#[test]
fn warnings_follow_configured_behavior() {
    let h = harness(
        DiagnosticsOptions::new().warning(EventId::KeyDefaultValueWarning, WarningBehavior::Ignore),
        Vec::new(),
    );

    h.logger
        .key_default_value_warning("heroes", "id")
        .unwrap();
    h.logger
        .bool_with_default_warning("heroes", "is_active")
        .unwrap();

    let records = h.sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_id, EventId::BoolWithDefaultWarning);
    assert_eq!(records[0].level, LogLevel::Warn);
    assert!(records[0].message.contains("'is_active'"));
}

#[test]
fn batch_and_migration_events_render_messages() {
    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Debug), Vec::new());
    let connection = DbConnection::new("heroes", "localhost:5432");
    let tables = vec!["heroes".to_string(), "teams".to_string()];

    h.logger.migrate_using_connection(&connection).unwrap();
    h.logger.migration_applying("001_create_heroes").unwrap();
    h.logger.migrations_not_applied(None).unwrap();
    h.logger.batch_ready_for_execution(&tables, 4).unwrap();
    h.logger
        .batch_smaller_than_min_batch_size(&tables, 1, 4)
        .unwrap();

    let messages: Vec<String> = h.sink.records().into_iter().map(|r| r.message).collect();
    assert_eq!(
        messages[0],
        "Migrating using database 'heroes' on server 'localhost:5432'."
    );
    assert_eq!(messages[1], "Applying migration '001_create_heroes'.");
    assert_eq!(
        messages[2],
        "No migrations were applied. The database is already up to date."
    );
    assert_eq!(messages[3], "Executing 4 update commands as a batch.");
    assert!(messages[4].contains("(1)"));
}

#[test]
fn async_dispatch_marks_payload_async() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    let h = harness(DiagnosticsOptions::new().min_level(LogLevel::Off), Vec::new());
    let flags = Arc::new(Mutex::new(Vec::new()));
    let sink = flags.clone();
    let _ = h.listener
        .subscribe_to::<CommandExecutedEventData, _>(move |_, event| {
            sink.lock().expect("lock poisoned").push(event.is_async);
        });
    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELECT 1");

    h.logger
        .scalar_executed(
            &command,
            CommandSource::Query,
            Value::BigInt(1),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();
    rt.block_on(async {
        let value = unwrap_outcome(
            h.logger
                .scalar_executed_async(
                    &cx,
                    &command,
                    CommandSource::Query,
                    Value::BigInt(1),
                    Utc::now(),
                    Duration::ZERO,
                )
                .await,
        );
        assert_eq!(value, Value::BigInt(1));
    });

    assert_eq!(*flags.lock().expect("lock poisoned"), vec![false, true]);
}
