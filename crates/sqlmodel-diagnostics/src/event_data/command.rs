//! Command and data reader payloads.
//!
//! Command payloads snapshot the SQL text and parameters at the time the event
//! is raised. An interceptor that rewrites the command while it is about to
//! execute does not change the payload it was handed.

use super::{impl_capabilities, impl_event_data};
use crate::definition::EventDefinition;
use chrono::{DateTime, Utc};
use sqlmodel_core::{
    CommandId, CommandMethod, CommandSource, ConnectionId, ContextId, Error, Value,
};
use std::time::Duration;

/// A command is about to be created. No SQL exists yet.
#[derive(Debug, Clone)]
pub struct CommandCorrelatedEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    pub method: CommandMethod,
    pub source: CommandSource,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
}

/// A command is about to execute.
#[derive(Debug, Clone)]
pub struct CommandEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    pub command_text: String,
    pub parameters: Vec<Value>,
    /// Whether messages may include parameter values.
    pub log_parameter_values: bool,
    pub method: CommandMethod,
    pub source: CommandSource,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
}

/// A command was created or initialized, or was canceled while executing.
#[derive(Debug, Clone)]
pub struct CommandEndEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    pub command_text: String,
    pub parameters: Vec<Value>,
    pub log_parameter_values: bool,
    pub method: CommandMethod,
    pub source: CommandSource,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
}

/// Summary of what an executed command returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResult {
    /// A reader with this many rows.
    Reader { rows: usize },
    Scalar(Value),
    /// Rows affected.
    NonQuery(u64),
}

/// A command finished executing.
#[derive(Debug, Clone)]
pub struct CommandExecutedEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    pub command_text: String,
    pub parameters: Vec<Value>,
    pub log_parameter_values: bool,
    pub method: CommandMethod,
    pub source: CommandSource,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub result: ExecutionResult,
}

/// A command failed.
#[derive(Debug)]
pub struct CommandErrorEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    pub command_text: String,
    pub parameters: Vec<Value>,
    pub log_parameter_values: bool,
    pub method: CommandMethod,
    pub source: CommandSource,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub error: Error,
}

/// A data reader is about to be closed.
#[derive(Debug, Clone)]
pub struct DataReaderClosingEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    /// Rows affected as reported by the reader; `-1` for queries.
    pub records_affected: i64,
    /// Rows the caller consumed.
    pub read_count: usize,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
}

/// A data reader was disposed.
#[derive(Debug, Clone)]
pub struct DataReaderDisposingEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub command_id: CommandId,
    pub records_affected: i64,
    pub read_count: usize,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
}

impl_event_data!(CommandCorrelatedEventData, connection);
impl_capabilities!(CommandCorrelatedEventData: command);
impl_capabilities!(CommandCorrelatedEventData: start);

impl_event_data!(CommandEventData, connection);
impl_capabilities!(CommandEventData: command);
impl_capabilities!(CommandEventData: start);

impl_event_data!(CommandEndEventData, connection);
impl_capabilities!(CommandEndEventData: command);
impl_capabilities!(CommandEndEventData: end);

impl_event_data!(CommandExecutedEventData, connection);
impl_capabilities!(CommandExecutedEventData: command);
impl_capabilities!(CommandExecutedEventData: end);

impl_event_data!(CommandErrorEventData, error);
impl_capabilities!(CommandErrorEventData: command);
impl_capabilities!(CommandErrorEventData: end);

impl_event_data!(DataReaderClosingEventData, connection);
impl_capabilities!(DataReaderClosingEventData: command);
impl_capabilities!(DataReaderClosingEventData: start);

impl_event_data!(DataReaderDisposingEventData, connection);
impl_capabilities!(DataReaderDisposingEventData: command);
impl_capabilities!(DataReaderDisposingEventData: end);
