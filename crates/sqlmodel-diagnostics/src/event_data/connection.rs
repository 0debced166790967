//! Connection payloads.

use super::{impl_capabilities, impl_event_data};
use crate::definition::EventDefinition;
use chrono::{DateTime, Utc};
use sqlmodel_core::{ConnectionId, ContextId, Error};
use std::time::Duration;

/// A connection is about to open or close.
#[derive(Debug, Clone)]
pub struct ConnectionEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub database: String,
    pub data_source: String,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
}

/// A connection opened or closed.
#[derive(Debug, Clone)]
pub struct ConnectionEndEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub database: String,
    pub data_source: String,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
}

/// Opening or closing a connection failed.
#[derive(Debug)]
pub struct ConnectionErrorEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    pub connection_id: ConnectionId,
    pub database: String,
    pub data_source: String,
    pub is_async: bool,
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub error: Error,
}

impl_event_data!(ConnectionEventData, connection);
impl_capabilities!(ConnectionEventData: connection);
impl_capabilities!(ConnectionEventData: start);

impl_event_data!(ConnectionEndEventData, connection);
impl_capabilities!(ConnectionEndEventData: connection);
impl_capabilities!(ConnectionEndEventData: end);

impl_event_data!(ConnectionErrorEventData, error);
impl_capabilities!(ConnectionErrorEventData: connection);
impl_capabilities!(ConnectionErrorEventData: end);
