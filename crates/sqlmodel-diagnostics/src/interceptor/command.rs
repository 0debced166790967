//! Command interception.

use super::{BoxFuture, ready};
use crate::event_data::{
    CommandCorrelatedEventData, CommandEndEventData, CommandErrorEventData, CommandEventData,
    CommandExecutedEventData, DataReaderClosingEventData, DataReaderDisposingEventData,
};
use crate::interception::InterceptionResult;
use sqlmodel_core::{Cx, DataReader, DbCommand, Error, Outcome, Result, Value, try_outcome};
use std::sync::Arc;

/// Observes, rewrites or replaces database commands.
///
/// "Executing" methods receive the command mutably, so an interceptor may
/// rewrite the SQL or parameters before the driver sees them, and return
/// [`InterceptionResult::suppress_with_result`] to skip the driver entirely.
/// "Executed" methods receive the value actually produced (by the driver or
/// by a suppressing interceptor) and return the value the caller will see.
///
/// ```rust,ignore
/// struct Tagger;
///
/// impl CommandInterceptor for Tagger {
///     fn reader_executing(
///         &self,
///         command: &mut DbCommand,
///         _event: &CommandEventData,
///         result: InterceptionResult<DataReader>,
///     ) -> Result<InterceptionResult<DataReader>> {
///         command.sql = format!("-- tagged\n{}", command.sql);
///         Ok(result)
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait CommandInterceptor: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// A command is about to be created. A suppressed result supplies the command.
    fn command_creating(
        &self,
        event: &CommandCorrelatedEventData,
        result: InterceptionResult<DbCommand>,
    ) -> Result<InterceptionResult<DbCommand>> {
        Ok(result)
    }

    /// A command was created. The returned command is used from here on.
    fn command_created(&self, event: &CommandEndEventData, command: DbCommand) -> Result<DbCommand> {
        Ok(command)
    }

    /// Text and parameters were bound to the command.
    fn command_initialized(
        &self,
        event: &CommandEndEventData,
        command: DbCommand,
    ) -> Result<DbCommand> {
        Ok(command)
    }

    fn reader_executing(
        &self,
        command: &mut DbCommand,
        event: &CommandEventData,
        result: InterceptionResult<DataReader>,
    ) -> Result<InterceptionResult<DataReader>> {
        Ok(result)
    }

    fn reader_executing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a mut DbCommand,
        event: &'a CommandEventData,
        result: InterceptionResult<DataReader>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<DataReader>, Error>> {
        ready(Outcome::Ok(result))
    }

    fn scalar_executing(
        &self,
        command: &mut DbCommand,
        event: &CommandEventData,
        result: InterceptionResult<Value>,
    ) -> Result<InterceptionResult<Value>> {
        Ok(result)
    }

    fn scalar_executing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a mut DbCommand,
        event: &'a CommandEventData,
        result: InterceptionResult<Value>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<Value>, Error>> {
        ready(Outcome::Ok(result))
    }

    fn non_query_executing(
        &self,
        command: &mut DbCommand,
        event: &CommandEventData,
        result: InterceptionResult<u64>,
    ) -> Result<InterceptionResult<u64>> {
        Ok(result)
    }

    fn non_query_executing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a mut DbCommand,
        event: &'a CommandEventData,
        result: InterceptionResult<u64>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<u64>, Error>> {
        ready(Outcome::Ok(result))
    }

    fn reader_executed(
        &self,
        command: &DbCommand,
        event: &CommandExecutedEventData,
        result: DataReader,
    ) -> Result<DataReader> {
        Ok(result)
    }

    fn reader_executed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandExecutedEventData,
        result: DataReader,
    ) -> BoxFuture<'a, Outcome<DataReader, Error>> {
        ready(Outcome::Ok(result))
    }

    fn scalar_executed(
        &self,
        command: &DbCommand,
        event: &CommandExecutedEventData,
        result: Value,
    ) -> Result<Value> {
        Ok(result)
    }

    fn scalar_executed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandExecutedEventData,
        result: Value,
    ) -> BoxFuture<'a, Outcome<Value, Error>> {
        ready(Outcome::Ok(result))
    }

    fn non_query_executed(
        &self,
        command: &DbCommand,
        event: &CommandExecutedEventData,
        result: u64,
    ) -> Result<u64> {
        Ok(result)
    }

    fn non_query_executed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandExecutedEventData,
        result: u64,
    ) -> BoxFuture<'a, Outcome<u64, Error>> {
        ready(Outcome::Ok(result))
    }

    /// The command failed. The error travels in the payload.
    fn command_failed(&self, command: &DbCommand, event: &CommandErrorEventData) -> Result<()> {
        Ok(())
    }

    fn command_failed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandErrorEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }

    /// The command was canceled before it completed.
    fn command_canceled(&self, command: &DbCommand, event: &CommandEndEventData) -> Result<()> {
        Ok(())
    }

    fn command_canceled_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        ready(Outcome::Ok(()))
    }

    /// A reader is about to be closed. Suppressing skips the close call.
    fn data_reader_closing(
        &self,
        command: &DbCommand,
        event: &DataReaderClosingEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        Ok(result)
    }

    fn data_reader_closing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a DataReaderClosingEventData,
        result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        ready(Outcome::Ok(result))
    }

    /// A reader is being dropped. Suppressing skips releasing it.
    fn data_reader_disposing(
        &self,
        command: &DbCommand,
        event: &DataReaderDisposingEventData,
        result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        Ok(result)
    }
}

/// Several command interceptors acting as one, in registration order.
#[derive(Clone)]
pub struct CommandInterceptorChain {
    interceptors: Vec<Arc<dyn CommandInterceptor>>,
}

impl CommandInterceptorChain {
    pub fn new(interceptors: Vec<Arc<dyn CommandInterceptor>>) -> Self {
        Self { interceptors }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}

impl CommandInterceptor for CommandInterceptorChain {
    fn name(&self) -> &'static str {
        "CommandInterceptorChain"
    }

    fn command_creating(
        &self,
        event: &CommandCorrelatedEventData,
        mut result: InterceptionResult<DbCommand>,
    ) -> Result<InterceptionResult<DbCommand>> {
        for interceptor in &self.interceptors {
            result = interceptor.command_creating(event, result)?;
        }
        Ok(result)
    }

    fn command_created(
        &self,
        event: &CommandEndEventData,
        mut command: DbCommand,
    ) -> Result<DbCommand> {
        for interceptor in &self.interceptors {
            command = interceptor.command_created(event, command)?;
        }
        Ok(command)
    }

    fn command_initialized(
        &self,
        event: &CommandEndEventData,
        mut command: DbCommand,
    ) -> Result<DbCommand> {
        for interceptor in &self.interceptors {
            command = interceptor.command_initialized(event, command)?;
        }
        Ok(command)
    }

    fn reader_executing(
        &self,
        command: &mut DbCommand,
        event: &CommandEventData,
        mut result: InterceptionResult<DataReader>,
    ) -> Result<InterceptionResult<DataReader>> {
        for interceptor in &self.interceptors {
            result = interceptor.reader_executing(command, event, result)?;
        }
        Ok(result)
    }

    fn reader_executing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a mut DbCommand,
        event: &'a CommandEventData,
        mut result: InterceptionResult<DataReader>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<DataReader>, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .reader_executing_async(cx, &mut *command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn scalar_executing(
        &self,
        command: &mut DbCommand,
        event: &CommandEventData,
        mut result: InterceptionResult<Value>,
    ) -> Result<InterceptionResult<Value>> {
        for interceptor in &self.interceptors {
            result = interceptor.scalar_executing(command, event, result)?;
        }
        Ok(result)
    }

    fn scalar_executing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a mut DbCommand,
        event: &'a CommandEventData,
        mut result: InterceptionResult<Value>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<Value>, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .scalar_executing_async(cx, &mut *command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn non_query_executing(
        &self,
        command: &mut DbCommand,
        event: &CommandEventData,
        mut result: InterceptionResult<u64>,
    ) -> Result<InterceptionResult<u64>> {
        for interceptor in &self.interceptors {
            result = interceptor.non_query_executing(command, event, result)?;
        }
        Ok(result)
    }

    fn non_query_executing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a mut DbCommand,
        event: &'a CommandEventData,
        mut result: InterceptionResult<u64>,
    ) -> BoxFuture<'a, Outcome<InterceptionResult<u64>, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .non_query_executing_async(cx, &mut *command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn reader_executed(
        &self,
        command: &DbCommand,
        event: &CommandExecutedEventData,
        mut result: DataReader,
    ) -> Result<DataReader> {
        for interceptor in &self.interceptors {
            result = interceptor.reader_executed(command, event, result)?;
        }
        Ok(result)
    }

    fn reader_executed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandExecutedEventData,
        mut result: DataReader,
    ) -> BoxFuture<'a, Outcome<DataReader, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .reader_executed_async(cx, command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn scalar_executed(
        &self,
        command: &DbCommand,
        event: &CommandExecutedEventData,
        mut result: Value,
    ) -> Result<Value> {
        for interceptor in &self.interceptors {
            result = interceptor.scalar_executed(command, event, result)?;
        }
        Ok(result)
    }

    fn scalar_executed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandExecutedEventData,
        mut result: Value,
    ) -> BoxFuture<'a, Outcome<Value, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .scalar_executed_async(cx, command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn non_query_executed(
        &self,
        command: &DbCommand,
        event: &CommandExecutedEventData,
        mut result: u64,
    ) -> Result<u64> {
        for interceptor in &self.interceptors {
            result = interceptor.non_query_executed(command, event, result)?;
        }
        Ok(result)
    }

    fn non_query_executed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandExecutedEventData,
        mut result: u64,
    ) -> BoxFuture<'a, Outcome<u64, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .non_query_executed_async(cx, command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn command_failed(&self, command: &DbCommand, event: &CommandErrorEventData) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.command_failed(command, event)?;
        }
        Ok(())
    }

    fn command_failed_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandErrorEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(interceptor.command_failed_async(cx, command, event).await);
            }
            Outcome::Ok(())
        })
    }

    fn command_canceled(&self, command: &DbCommand, event: &CommandEndEventData) -> Result<()> {
        for interceptor in &self.interceptors {
            interceptor.command_canceled(command, event)?;
        }
        Ok(())
    }

    fn command_canceled_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a CommandEndEventData,
    ) -> BoxFuture<'a, Outcome<(), Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                try_outcome!(interceptor.command_canceled_async(cx, command, event).await);
            }
            Outcome::Ok(())
        })
    }

    fn data_reader_closing(
        &self,
        command: &DbCommand,
        event: &DataReaderClosingEventData,
        mut result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        for interceptor in &self.interceptors {
            result = interceptor.data_reader_closing(command, event, result)?;
        }
        Ok(result)
    }

    fn data_reader_closing_async<'a>(
        &'a self,
        cx: &'a Cx,
        command: &'a DbCommand,
        event: &'a DataReaderClosingEventData,
        mut result: InterceptionResult,
    ) -> BoxFuture<'a, Outcome<InterceptionResult, Error>> {
        Box::pin(async move {
            for interceptor in &self.interceptors {
                result = try_outcome!(
                    interceptor
                        .data_reader_closing_async(cx, command, event, result)
                        .await
                );
            }
            Outcome::Ok(result)
        })
    }

    fn data_reader_disposing(
        &self,
        command: &DbCommand,
        event: &DataReaderDisposingEventData,
        mut result: InterceptionResult,
    ) -> Result<InterceptionResult> {
        for interceptor in &self.interceptors {
            result = interceptor.data_reader_disposing(command, event, result)?;
        }
        Ok(result)
    }
}
