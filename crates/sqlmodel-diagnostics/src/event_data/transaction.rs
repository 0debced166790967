//! Transaction payloads.

use super::{impl_capabilities, impl_event_data};
use crate::definition::EventDefinition;
use chrono::{DateTime, Utc};
use sqlmodel_core::{ConnectionId, ContextId, Error, IsolationLevel, TransactionId};
use std::time::Duration;

/// A transaction is about to begin.
///
/// `transaction_id` is reserved up front so "starting" and "started" can be
/// correlated; the handle returned by the driver carries its own id.
#[derive(Debug, Clone)]
pub struct TransactionStartingEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub isolation_level: IsolationLevel,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
}

/// A transaction is about to commit or roll back, or has been disposed.
#[derive(Debug, Clone)]
pub struct TransactionEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
}

/// A transaction started, was adopted, committed or rolled back.
#[derive(Debug, Clone)]
pub struct TransactionEndEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
}

/// A transaction operation failed.
#[derive(Debug)]
pub struct TransactionErrorEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub transaction_id: TransactionId,
    /// What was being attempted: `begin`, `commit` or `rollback`.
    pub action: &'static str,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub error: Error,
}

impl_event_data!(TransactionStartingEventData, connection);
impl_capabilities!(TransactionStartingEventData: transaction);
impl_capabilities!(TransactionStartingEventData: start);

impl_event_data!(TransactionEventData, connection);
impl_capabilities!(TransactionEventData: transaction);
impl_capabilities!(TransactionEventData: start);

impl_event_data!(TransactionEndEventData, connection);
impl_capabilities!(TransactionEndEventData: transaction);
impl_capabilities!(TransactionEndEventData: end);

impl_event_data!(TransactionErrorEventData, error);
impl_capabilities!(TransactionErrorEventData: transaction);
impl_capabilities!(TransactionErrorEventData: end);
