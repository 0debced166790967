//! Model validation warnings.

use crate::event_data::PropertyEventData;
use crate::event_id::EventId;
use crate::logger::DiagnosticsLogger;
use sqlmodel_core::Result;

impl DiagnosticsLogger {
    /// A key column has a database default, so new rows never use the
    /// application's value.
    pub fn key_default_value_warning(&self, table: &str, column: &str) -> Result<()> {
        self.dispatch_log_only(EventId::KeyDefaultValueWarning, |definition| {
            PropertyEventData {
                definition,
                message: |e| {
                    format!(
                        "The key column '{}' on table '{}' is configured with a database default. \
                         The default will be used for every inserted row, since the key is never unset.",
                        e.column, e.table
                    )
                },
                table: table.to_string(),
                column: column.to_string(),
            }
        })
    }

    /// A boolean column has a database default, so `false` can never be inserted
    /// explicitly.
    pub fn bool_with_default_warning(&self, table: &str, column: &str) -> Result<()> {
        self.dispatch_log_only(EventId::BoolWithDefaultWarning, |definition| {
            PropertyEventData {
                definition,
                message: |e| {
                    format!(
                        "The boolean column '{}' on table '{}' is configured with a database default. \
                         The default will be used whenever the value is 'false', since that is the \
                         unset value for booleans.",
                        e.column, e.table
                    )
                },
                table: table.to_string(),
                column: column.to_string(),
            }
        })
    }
}
