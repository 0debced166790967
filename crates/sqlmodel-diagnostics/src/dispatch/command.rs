//! Command and data reader events.

use crate::event_data::{
    CommandCorrelatedEventData, CommandEndEventData, CommandErrorEventData, CommandEventData,
    CommandExecutedEventData, DataReaderClosingEventData, DataReaderDisposingEventData,
    ExecutionResult,
};
use crate::event_id::EventId;
use crate::interception::InterceptionResult;
use crate::interceptor::CommandInterceptor;
use crate::logger::{CacheWindow, DiagnosticsLogger, try_result};
use chrono::{DateTime, Utc};
use sqlmodel_core::{
    CommandId, CommandMethod, CommandSource, ConnectionId, Cx, DataReader, DbCommand, Error,
    Outcome, Result, Value, try_outcome,
};
use std::sync::Arc;
use std::time::Duration;

type Prepared<P> = Option<(P, Option<Arc<dyn CommandInterceptor>>)>;

/// `Err` hands the error back untouched when nobody observes the failure.
type PreparedFailure<P> = std::result::Result<(P, Option<Arc<dyn CommandInterceptor>>), Error>;

fn parameters(params: &[Value], log_values: bool) -> String {
    DiagnosticsLogger::format_parameters(params, log_values)
}

fn creating_message(e: &CommandCorrelatedEventData) -> String {
    format!("Creating DbCommand for '{}'.", e.method)
}

fn created_message(e: &CommandEndEventData) -> String {
    format!(
        "Created DbCommand for '{}' ({}ms).",
        e.method,
        e.duration.as_millis()
    )
}

fn initialized_message(e: &CommandEndEventData) -> String {
    format!(
        "Initialized DbCommand for '{}' ({}ms).",
        e.method,
        e.duration.as_millis()
    )
}

fn executing_message(e: &CommandEventData) -> String {
    format!(
        "Executing {} [Parameters=[{}]]\n{}",
        e.method,
        parameters(&e.parameters, e.log_parameter_values),
        e.command_text
    )
}

fn executed_message(e: &CommandExecutedEventData) -> String {
    format!(
        "Executed {} ({}ms) [Parameters=[{}]]\n{}",
        e.method,
        e.duration.as_millis(),
        parameters(&e.parameters, e.log_parameter_values),
        e.command_text
    )
}

fn error_message(e: &CommandErrorEventData) -> String {
    format!(
        "Failed executing {} ({}ms) [Parameters=[{}]]\n{}\n{}",
        e.method,
        e.duration.as_millis(),
        parameters(&e.parameters, e.log_parameter_values),
        e.command_text,
        e.error
    )
}

fn canceled_message(e: &CommandEndEventData) -> String {
    format!(
        "Canceled {} ({}ms) [Parameters=[{}]]\n{}",
        e.method,
        e.duration.as_millis(),
        parameters(&e.parameters, e.log_parameter_values),
        e.command_text
    )
}

fn closing_message(e: &DataReaderClosingEventData) -> String {
    format!(
        "Closing data reader for command {} after reading {} rows.",
        e.command_id, e.read_count
    )
}

fn disposing_message(e: &DataReaderDisposingEventData) -> String {
    format!(
        "A data reader for command {} was disposed after reading {} rows ({}ms).",
        e.command_id,
        e.read_count,
        e.duration.as_millis()
    )
}

impl DiagnosticsLogger {
    fn command_end(
        &self,
        id: EventId,
        message: fn(&CommandEndEventData) -> String,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Prepared<CommandEndEventData>> {
        let observed = self.observe(id, self.interceptors().command()?);
        if !observed.any() {
            return Ok(None);
        }
        let event = CommandEndEventData {
            definition: observed.definition,
            message,
            context: self.context(),
            connection_id: command.connection_id(),
            command_id: command.id(),
            command_text: command.sql.clone(),
            parameters: command.params.clone(),
            log_parameter_values: self.options().sensitive_data_logging,
            method,
            source,
            is_async,
            start_time,
            duration,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn command_executing(
        &self,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        is_async: bool,
        start_time: DateTime<Utc>,
    ) -> Result<Prepared<CommandEventData>> {
        let observed = self.observe(EventId::CommandExecuting, self.interceptors().command()?);
        self.update_window(CacheWindow::CommandExecute, start_time, observed.any());
        if !observed.any() {
            return Ok(None);
        }
        let event = CommandEventData {
            definition: observed.definition,
            message: executing_message,
            context: self.context(),
            connection_id: command.connection_id(),
            command_id: command.id(),
            command_text: command.sql.clone(),
            parameters: command.params.clone(),
            log_parameter_values: self.options().sensitive_data_logging,
            method,
            source,
            is_async,
            start_time,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn command_executed(
        &self,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        result: ExecutionResult,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Prepared<CommandExecutedEventData>> {
        let observed = self.observe(EventId::CommandExecuted, self.interceptors().command()?);
        if !observed.any() {
            return Ok(None);
        }
        let event = CommandExecutedEventData {
            definition: observed.definition,
            message: executed_message,
            context: self.context(),
            connection_id: command.connection_id(),
            command_id: command.id(),
            command_text: command.sql.clone(),
            parameters: command.params.clone(),
            log_parameter_values: self.options().sensitive_data_logging,
            method,
            source,
            is_async,
            start_time,
            duration,
            result,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    fn command_error(
        &self,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        error: Error,
        is_async: bool,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<PreparedFailure<CommandErrorEventData>> {
        let observed = self.observe(EventId::CommandError, self.interceptors().command()?);
        if !observed.any() {
            return Ok(Err(error));
        }
        let event = CommandErrorEventData {
            definition: observed.definition,
            message: error_message,
            context: self.context(),
            connection_id: command.connection_id(),
            command_id: command.id(),
            command_text: command.sql.clone(),
            parameters: command.params.clone(),
            log_parameter_values: self.options().sensitive_data_logging,
            method,
            source,
            is_async,
            start_time,
            duration,
            error,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Ok((event, observed.interceptor)))
    }

    fn reader_closing_event(
        &self,
        command: &DbCommand,
        records_affected: i64,
        read_count: usize,
        is_async: bool,
        start_time: DateTime<Utc>,
    ) -> Result<Prepared<DataReaderClosingEventData>> {
        let observed = self.observe(EventId::DataReaderClosing, self.interceptors().command()?);
        self.update_window(CacheWindow::DataReaderClose, start_time, observed.any());
        if !observed.any() {
            return Ok(None);
        }
        let event = DataReaderClosingEventData {
            definition: observed.definition,
            message: closing_message,
            context: self.context(),
            connection_id: command.connection_id(),
            command_id: command.id(),
            records_affected,
            read_count,
            is_async,
            start_time,
        };
        self.emit(observed.log, observed.publish, &event)?;
        Ok(Some((event, observed.interceptor)))
    }

    /// A command is about to be created for `method`.
    ///
    /// `command_id` is reserved by the caller so the created command can carry
    /// the same id. A suppressed result supplies the command to use.
    pub fn command_creating(
        &self,
        connection_id: ConnectionId,
        command_id: CommandId,
        method: CommandMethod,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult<DbCommand>> {
        let observed = self.observe(EventId::CommandCreating, self.interceptors().command()?);
        self.update_window(CacheWindow::CommandCreate, start_time, observed.any());
        if !observed.any() {
            return Ok(InterceptionResult::none());
        }
        let event = CommandCorrelatedEventData {
            definition: observed.definition,
            message: creating_message,
            context: self.context(),
            connection_id,
            command_id,
            method,
            source,
            is_async: false,
            start_time,
        };
        self.emit(observed.log, observed.publish, &event)?;
        match observed.interceptor {
            Some(interceptor) => interceptor.command_creating(&event, InterceptionResult::none()),
            None => Ok(InterceptionResult::none()),
        }
    }

    /// A command was created. Returns the command the caller should use.
    pub fn command_created(
        &self,
        command: DbCommand,
        method: CommandMethod,
        source: CommandSource,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<DbCommand> {
        match self.command_end(
            EventId::CommandCreated,
            created_message,
            &command,
            method,
            source,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => interceptor.command_created(&event, command),
            _ => Ok(command),
        }
    }

    /// Text and parameters were bound. Returns the command the caller should use.
    pub fn command_initialized(
        &self,
        command: DbCommand,
        method: CommandMethod,
        source: CommandSource,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<DbCommand> {
        match self.command_end(
            EventId::CommandInitialized,
            initialized_message,
            &command,
            method,
            source,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => interceptor.command_initialized(&event, command),
            _ => Ok(command),
        }
    }

    pub fn reader_executing(
        &self,
        command: &mut DbCommand,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult<DataReader>> {
        match self.command_executing(command, CommandMethod::Reader, source, false, start_time)? {
            Some((event, Some(interceptor))) => {
                interceptor.reader_executing(command, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn reader_executing_async(
        &self,
        cx: &Cx,
        command: &mut DbCommand,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult<DataReader>, Error> {
        match try_result!(self.command_executing(
            command,
            CommandMethod::Reader,
            source,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .reader_executing_async(cx, command, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    pub fn scalar_executing(
        &self,
        command: &mut DbCommand,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult<Value>> {
        match self.command_executing(command, CommandMethod::Scalar, source, false, start_time)? {
            Some((event, Some(interceptor))) => {
                interceptor.scalar_executing(command, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn scalar_executing_async(
        &self,
        cx: &Cx,
        command: &mut DbCommand,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult<Value>, Error> {
        match try_result!(self.command_executing(
            command,
            CommandMethod::Scalar,
            source,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .scalar_executing_async(cx, command, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    pub fn non_query_executing(
        &self,
        command: &mut DbCommand,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult<u64>> {
        match self.command_executing(command, CommandMethod::NonQuery, source, false, start_time)? {
            Some((event, Some(interceptor))) => {
                interceptor.non_query_executing(command, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn non_query_executing_async(
        &self,
        cx: &Cx,
        command: &mut DbCommand,
        source: CommandSource,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult<u64>, Error> {
        match try_result!(self.command_executing(
            command,
            CommandMethod::NonQuery,
            source,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .non_query_executing_async(cx, command, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    /// The reader command completed. Returns the reader the caller should use.
    pub fn reader_executed(
        &self,
        command: &DbCommand,
        source: CommandSource,
        reader: DataReader,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<DataReader> {
        let summary = ExecutionResult::Reader {
            rows: reader.row_count(),
        };
        match self.command_executed(
            command,
            CommandMethod::Reader,
            source,
            summary,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.reader_executed(command, &event, reader)
            }
            _ => Ok(reader),
        }
    }

    pub async fn reader_executed_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        source: CommandSource,
        reader: DataReader,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<DataReader, Error> {
        let summary = ExecutionResult::Reader {
            rows: reader.row_count(),
        };
        match try_result!(self.command_executed(
            command,
            CommandMethod::Reader,
            source,
            summary,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .reader_executed_async(cx, command, &event, reader)
                    .await
            }
            _ => Outcome::Ok(reader),
        }
    }

    pub fn scalar_executed(
        &self,
        command: &DbCommand,
        source: CommandSource,
        value: Value,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Value> {
        match self.command_executed(
            command,
            CommandMethod::Scalar,
            source,
            ExecutionResult::Scalar(value.clone()),
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => interceptor.scalar_executed(command, &event, value),
            _ => Ok(value),
        }
    }

    pub async fn scalar_executed_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        source: CommandSource,
        value: Value,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<Value, Error> {
        match try_result!(self.command_executed(
            command,
            CommandMethod::Scalar,
            source,
            ExecutionResult::Scalar(value.clone()),
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .scalar_executed_async(cx, command, &event, value)
                    .await
            }
            _ => Outcome::Ok(value),
        }
    }

    pub fn non_query_executed(
        &self,
        command: &DbCommand,
        source: CommandSource,
        rows_affected: u64,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<u64> {
        match self.command_executed(
            command,
            CommandMethod::NonQuery,
            source,
            ExecutionResult::NonQuery(rows_affected),
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => {
                interceptor.non_query_executed(command, &event, rows_affected)
            }
            _ => Ok(rows_affected),
        }
    }

    pub async fn non_query_executed_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        source: CommandSource,
        rows_affected: u64,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<u64, Error> {
        match try_result!(self.command_executed(
            command,
            CommandMethod::NonQuery,
            source,
            ExecutionResult::NonQuery(rows_affected),
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .non_query_executed_async(cx, command, &event, rows_affected)
                    .await
            }
            _ => Outcome::Ok(rows_affected),
        }
    }

    /// The command failed.
    ///
    /// Returns the original error for the caller to propagate; `Err` means an
    /// interceptor (or a throwing log definition) failed instead.
    pub fn command_failed(
        &self,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        error: Error,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<Error> {
        match self.command_error(command, method, source, error, false, start_time, duration)? {
            Err(error) => Ok(error),
            Ok((event, interceptor)) => {
                if let Some(interceptor) = interceptor {
                    interceptor.command_failed(command, &event)?;
                }
                Ok(event.error)
            }
        }
    }

    pub async fn command_failed_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        error: Error,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<Error, Error> {
        match try_result!(self.command_error(
            command, method, source, error, true, start_time, duration
        )) {
            Err(error) => Outcome::Ok(error),
            Ok((event, interceptor)) => {
                if let Some(interceptor) = interceptor {
                    try_outcome!(interceptor.command_failed_async(cx, command, &event).await);
                }
                Outcome::Ok(event.error)
            }
        }
    }

    /// The command was canceled before it completed.
    pub fn command_canceled(
        &self,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<()> {
        match self.command_end(
            EventId::CommandCanceled,
            canceled_message,
            command,
            method,
            source,
            false,
            start_time,
            duration,
        )? {
            Some((event, Some(interceptor))) => interceptor.command_canceled(command, &event),
            _ => Ok(()),
        }
    }

    pub async fn command_canceled_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        method: CommandMethod,
        source: CommandSource,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Outcome<(), Error> {
        match try_result!(self.command_end(
            EventId::CommandCanceled,
            canceled_message,
            command,
            method,
            source,
            true,
            start_time,
            duration
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .command_canceled_async(cx, command, &event)
                    .await
            }
            _ => Outcome::Ok(()),
        }
    }

    /// A reader produced by `command` is about to be closed.
    pub fn data_reader_closing(
        &self,
        command: &DbCommand,
        records_affected: i64,
        read_count: usize,
        start_time: DateTime<Utc>,
    ) -> Result<InterceptionResult> {
        match self.reader_closing_event(command, records_affected, read_count, false, start_time)? {
            Some((event, Some(interceptor))) => {
                interceptor.data_reader_closing(command, &event, InterceptionResult::none())
            }
            _ => Ok(InterceptionResult::none()),
        }
    }

    pub async fn data_reader_closing_async(
        &self,
        cx: &Cx,
        command: &DbCommand,
        records_affected: i64,
        read_count: usize,
        start_time: DateTime<Utc>,
    ) -> Outcome<InterceptionResult, Error> {
        match try_result!(self.reader_closing_event(
            command,
            records_affected,
            read_count,
            true,
            start_time
        )) {
            Some((event, Some(interceptor))) => {
                interceptor
                    .data_reader_closing_async(cx, command, &event, InterceptionResult::none())
                    .await
            }
            _ => Outcome::Ok(InterceptionResult::none()),
        }
    }

    /// A reader produced by `command` is being dropped.
    pub fn data_reader_disposing(
        &self,
        command: &DbCommand,
        records_affected: i64,
        read_count: usize,
        start_time: DateTime<Utc>,
        duration: Duration,
    ) -> Result<InterceptionResult> {
        let observed = self.observe(EventId::DataReaderDisposing, self.interceptors().command()?);
        self.update_window(CacheWindow::DataReaderDispose, start_time, observed.any());
        if !observed.any() {
            return Ok(InterceptionResult::none());
        }
        let event = DataReaderDisposingEventData {
            definition: observed.definition,
            message: disposing_message,
            context: self.context(),
            connection_id: command.connection_id(),
            command_id: command.id(),
            records_affected,
            read_count,
            is_async: false,
            start_time,
            duration,
        };
        self.emit(observed.log, observed.publish, &event)?;
        match observed.interceptor {
            Some(interceptor) => {
                interceptor.data_reader_disposing(command, &event, InterceptionResult::none())
            }
            None => Ok(InterceptionResult::none()),
        }
    }
}
