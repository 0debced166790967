//! Batching payloads raised while flushing pending changes.

use super::{impl_capabilities, impl_event_data};
use crate::definition::EventDefinition;
use sqlmodel_core::ContextId;

#[derive(Debug, Clone)]
pub struct BatchEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub context: Option<ContextId>,
    /// Tables touched by the batched commands.
    pub tables: Vec<String>,
    pub command_count: usize,
    /// Set when the batch fell under the configured minimum size.
    pub min_batch_size: Option<usize>,
}

impl_event_data!(BatchEventData);
impl_capabilities!(BatchEventData: context);
