//! Model validation warnings.

use super::impl_event_data;
use crate::definition::EventDefinition;

/// A warning about one column of one model.
#[derive(Debug, Clone)]
pub struct PropertyEventData {
    pub definition: EventDefinition,
    pub message: fn(&Self) -> String,
    pub table: String,
    pub column: String,
}

impl_event_data!(PropertyEventData);
