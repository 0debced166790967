use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};
use chrono::Utc;
use sqlmodel_core::{
    CommandSource, DataReader, DbCommand, DbConnection, DbTransaction, Error, IsolationLevel,
    Result, TransactionId, Value,
};
use sqlmodel_diagnostics::event_data::{
    CommandEventData, CommandExecutedEventData, ConnectionEventData, TransactionStartingEventData,
};
use sqlmodel_diagnostics::{
    BoxFuture, CommandInterceptor, ConnectionInterceptor, DiagnosticsLogger, InterceptionResult,
    Interceptor, InterceptorRegistry, InterceptorSource, Interceptors, TransactionInterceptor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
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

fn reader(rows: &[i64]) -> DataReader {
    DataReader::new(
        vec!["id".to_string()],
        rows.iter().map(|id| vec![Value::BigInt(*id)]).collect(),
    )
}

fn logger_with(interceptors: Vec<Interceptor>) -> DiagnosticsLogger {
    let registry = interceptors
        .into_iter()
        .fold(InterceptorRegistry::new(), InterceptorRegistry::with);
    DiagnosticsLogger::builder()
        .interceptors(Arc::new(Interceptors::new(Arc::new(registry), None)))
        .build()
}

type Journal = Arc<Mutex<Vec<String>>>;

/// Passes everything through and notes what it saw.
struct Recorder {
    tag: &'static str,
    journal: Journal,
}

impl Recorder {
    fn note(&self, what: String) {
        self.journal
            .lock()
            .expect("lock poisoned")
            .push(format!("{}:{what}", self.tag));
    }
}

impl CommandInterceptor for Recorder {
    fn reader_executing(
        &self,
        _command: &mut DbCommand,
        _event: &CommandEventData,
        result: InterceptionResult<DataReader>,
    ) -> Result<InterceptionResult<DataReader>> {
        self.note(format!("executing suppressed={}", result.has_result()));
        Ok(result)
    }

    fn reader_executing_async<'a>(
        &'a self,
        _cx: &'a Cx,
        _command: &'a mut DbCommand,
        _event: &'a CommandEventData,
        result: InterceptionResult<DataReader>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<DataReader>, Error>> {
        self.note(format!("executing_async suppressed={}", result.has_result()));
        Box::pin(async move { Outcome::Ok(result) })
    }

    fn reader_executed(
        &self,
        _command: &DbCommand,
        _event: &CommandExecutedEventData,
        result: DataReader,
    ) -> Result<DataReader> {
        self.note(format!("executed rows={}", result.row_count()));
        Ok(result)
    }
}

/// Suppresses reader execution with a canned reader.
struct Canned(DataReader);

impl CommandInterceptor for Canned {
    fn reader_executing(
        &self,
        _command: &mut DbCommand,
        _event: &CommandEventData,
        _result: InterceptionResult<DataReader>,
    ) -> Result<InterceptionResult<DataReader>> {
        Ok(InterceptionResult::suppress_with_result(self.0.clone()))
    }

    fn reader_executing_async<'a>(
        &'a self,
        _cx: &'a Cx,
        _command: &'a mut DbCommand,
        _event: &'a CommandEventData,
        _result: InterceptionResult<DataReader>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<DataReader>, Error>> {
        let reader = self.0.clone();
        Box::pin(async move { Outcome::Ok(InterceptionResult::suppress_with_result(reader)) })
    }
}

/// Replaces whatever reader was produced.
struct Replace(DataReader);

impl CommandInterceptor for Replace {
    fn reader_executed(
        &self,
        _command: &DbCommand,
        _event: &CommandExecutedEventData,
        _result: DataReader,
    ) -> Result<DataReader> {
        Ok(self.0.clone())
    }
}

#[test]
fn chain_runs_in_registration_order() {
    let journal = Journal::default();
    let logger = logger_with(vec![
        Interceptor::command(Recorder {
            tag: "a",
            journal: journal.clone(),
        }),
        Interceptor::command(Recorder {
            tag: "b",
            journal: journal.clone(),
        }),
    ]);
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let result = logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert!(!result.has_result());
    logger
        .reader_executed(
            &command,
            CommandSource::Query,
            reader(&[1, 2]),
            Utc::now(),
            Duration::from_millis(3),
        )
        .unwrap();

    assert_eq!(
        *journal.lock().expect("lock poisoned"),
        vec![
            "a:executing suppressed=false",
            "b:executing suppressed=false",
            "a:executed rows=2",
            "b:executed rows=2",
        ]
    );
}

#[test]
fn suppression_is_visible_to_later_interceptors() {
    let journal = Journal::default();
    let canned = reader(&[42]);
    let logger = logger_with(vec![
        Interceptor::command(Recorder {
            tag: "a",
            journal: journal.clone(),
        }),
        Interceptor::command(Canned(canned.clone())),
        Interceptor::command(Recorder {
            tag: "c",
            journal: journal.clone(),
        }),
    ]);
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let result = logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert!(result.has_result());
    assert_eq!(result.into_result(), Some(canned));
    assert_eq!(
        *journal.lock().expect("lock poisoned"),
        vec!["a:executing suppressed=false", "c:executing suppressed=true"]
    );
}

#[test]
fn identity_then_suppress_then_executed_passes_value_through() {
    let journal = Journal::default();
    let canned = reader(&[7]);
    let logger = logger_with(vec![
        Interceptor::command(Recorder {
            tag: "a",
            journal: journal.clone(),
        }),
        Interceptor::command(Canned(canned.clone())),
    ]);
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let result = logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert_eq!(result, InterceptionResult::suppress_with_result(canned));

    let produced = reader(&[1, 2, 3]);
    let seen = logger
        .reader_executed(
            &command,
            CommandSource::Query,
            produced.clone(),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();
    assert_eq!(seen, produced);
}

#[test]
fn last_suppressing_interceptor_wins() {
    let logger = logger_with(vec![
        Interceptor::command(Canned(reader(&[1]))),
        Interceptor::command(Canned(reader(&[2]))),
    ]);
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let result = logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert_eq!(result.into_result(), Some(reader(&[2])));
}

#[test]
fn last_replacement_wins_for_completed_events() {
    let logger = logger_with(vec![
        Interceptor::command(Replace(reader(&[1]))),
        Interceptor::command(Replace(reader(&[2, 2]))),
    ]);
    let connection = DbConnection::new("heroes", "memory");
    let command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let seen = logger
        .reader_executed(
            &command,
            CommandSource::Query,
            reader(&[]),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();
    assert_eq!(seen.row_count(), 2);
}

#[test]
fn no_interceptors_is_identity() {
    let logger = logger_with(Vec::new());
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let result = logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert_eq!(result, InterceptionResult::none());

    let produced = reader(&[5]);
    let seen = logger
        .reader_executed(
            &command,
            CommandSource::Query,
            produced.clone(),
            Utc::now(),
            Duration::ZERO,
        )
        .unwrap();
    assert_eq!(seen, produced);
}

#[test]
fn async_chain_matches_sync_chain() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    let journal = Journal::default();
    let canned = reader(&[9]);
    let logger = logger_with(vec![
        Interceptor::command(Recorder {
            tag: "a",
            journal: journal.clone(),
        }),
        Interceptor::command(Canned(canned.clone())),
        Interceptor::command(Recorder {
            tag: "c",
            journal: journal.clone(),
        }),
    ]);
    let connection = DbConnection::new("heroes", "memory");

    rt.block_on(async {
        let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");
        let result = unwrap_outcome(
            logger
                .reader_executing_async(&cx, &mut command, CommandSource::Query, Utc::now())
                .await,
        );
        assert_eq!(result.into_result(), Some(canned));
    });

    assert_eq!(
        *journal.lock().expect("lock poisoned"),
        vec![
            "a:executing_async suppressed=false",
            "c:executing_async suppressed=true",
        ]
    );
}

/// Appends a comment to every reader command.
struct Tagger;

impl CommandInterceptor for Tagger {
    fn reader_executing(
        &self,
        command: &mut DbCommand,
        _event: &CommandEventData,
        result: InterceptionResult<DataReader>,
    ) -> Result<InterceptionResult<DataReader>> {
        command.sql.push_str(" -- tagged");
        Ok(result)
    }
}

#[test]
fn executing_interceptor_can_rewrite_command() {
    let logger = logger_with(vec![Interceptor::command(Tagger)]);
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT id FROM heroes");

    let result = logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert!(!result.has_result());
    assert_eq!(command.sql, "SELECT id FROM heroes -- tagged");
}

/// Refuses to open connections to a given database.
struct Offline(&'static str);

impl ConnectionInterceptor for Offline {
    fn connection_opening(
        &self,
        _connection: &DbConnection,
        event: &ConnectionEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        if event.database == self.0 {
            return Ok(InterceptionResult::suppress());
        }
        Ok(result)
    }
}

#[test]
fn connection_opening_can_be_suppressed() {
    let logger = logger_with(vec![Interceptor::connection(Offline("archive"))]);

    let archive = DbConnection::new("archive", "memory");
    assert!(
        logger
            .connection_opening(&archive, Utc::now())
            .unwrap()
            .has_result()
    );

    let heroes = DbConnection::new("heroes", "memory");
    assert!(
        !logger
            .connection_opening(&heroes, Utc::now())
            .unwrap()
            .has_result()
    );
}

/// Supplies the transaction handle instead of beginning one.
struct Ambient;

impl TransactionInterceptor for Ambient {
    fn transaction_starting(
        &self,
        _connection: &DbConnection,
        event: &TransactionStartingEventData,
        _result: InterceptionResult<DbTransaction>,
    ) -> Result<InterceptionResult<DbTransaction>> {
        Ok(InterceptionResult::suppress_with_result(DbTransaction::with_id(
            event.transaction_id,
            event.connection_id,
            event.isolation_level,
        )))
    }
}

#[test]
fn transaction_starting_can_supply_handle() {
    let logger = logger_with(vec![Interceptor::transaction(Ambient)]);
    let connection = DbConnection::new("heroes", "memory");
    let reserved = TransactionId::new();

    let result = logger
        .transaction_starting(&connection, reserved, IsolationLevel::Serializable, Utc::now())
        .unwrap();
    let tx = result.into_result().expect("handle supplied");
    assert_eq!(tx.id(), reserved);
    assert_eq!(tx.connection_id(), connection.id());
    assert_eq!(tx.isolation_level(), IsolationLevel::Serializable);
}

/// Counts how often it is asked; fails from the second time on.
struct AskOnce {
    asked: AtomicUsize,
}

impl InterceptorSource for AskOnce {
    fn interceptors(&self) -> Result<Vec<Interceptor>> {
        if self.asked.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(Error::Custom("asked twice".to_string()));
        }
        Ok(vec![Interceptor::command(Tagger)])
    }
}

#[test]
fn resolution_happens_once_per_scope() {
    let source = Arc::new(AskOnce {
        asked: AtomicUsize::new(0),
    });
    let interceptors = Arc::new(Interceptors::new(source.clone(), None));
    let logger = DiagnosticsLogger::builder()
        .interceptors(interceptors.clone())
        .build();
    assert!(!interceptors.is_resolved());

    let connection = DbConnection::new("heroes", "memory");
    for _ in 0..3 {
        let mut command = DbCommand::new(connection.id(), "SELECT 1");
        logger
            .reader_executing(&mut command, CommandSource::Query, Utc::now())
            .unwrap();
        assert!(command.sql.ends_with("-- tagged"));
    }
    logger.connection_opening(&connection, Utc::now()).unwrap();

    assert!(interceptors.is_resolved());
    assert_eq!(source.asked.load(Ordering::SeqCst), 1);
}

struct Broken;

impl InterceptorSource for Broken {
    fn interceptors(&self) -> Result<Vec<Interceptor>> {
        Err(Error::Custom("registry unavailable".to_string()))
    }
}

#[test]
fn resolution_failure_surfaces_as_config_error() {
    let logger = DiagnosticsLogger::builder()
        .interceptors(Arc::new(Interceptors::new(Arc::new(Broken), None)))
        .build();
    let connection = DbConnection::new("heroes", "memory");

    let err = logger
        .connection_opening(&connection, Utc::now())
        .unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {err:?}");
}

#[test]
fn configured_interceptor_runs_after_registered_ones() {
    let journal = Journal::default();
    let registry = InterceptorRegistry::new().with(Interceptor::command(Recorder {
        tag: "registered",
        journal: journal.clone(),
    }));
    let configured = Interceptor::command(Recorder {
        tag: "configured",
        journal: journal.clone(),
    });
    let logger = DiagnosticsLogger::builder()
        .interceptors(Arc::new(Interceptors::new(
            Arc::new(registry),
            Some(configured),
        )))
        .build();
    let connection = DbConnection::new("heroes", "memory");
    let mut command = DbCommand::new(connection.id(), "SELECT 1");

    logger
        .reader_executing(&mut command, CommandSource::Query, Utc::now())
        .unwrap();
    assert_eq!(
        *journal.lock().expect("lock poisoned"),
        vec![
            "registered:executing suppressed=false",
            "configured:executing suppressed=false",
        ]
    );
}
