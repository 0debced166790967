//! Batching events raised while flushing pending changes.

use crate::event_data::BatchEventData;
use crate::event_id::EventId;
use crate::logger::DiagnosticsLogger;
use sqlmodel_core::Result;

impl DiagnosticsLogger {
    /// `command_count` commands touching `tables` will run as one batch.
    pub fn batch_ready_for_execution(&self, tables: &[String], command_count: usize) -> Result<()> {
        self.dispatch_log_only(EventId::BatchReadyForExecution, |definition| BatchEventData {
            definition,
            message: |e| format!("Executing {} update commands as a batch.", e.command_count),
            context: self.context(),
            tables: tables.to_vec(),
            command_count,
            min_batch_size: None,
        })
    }

    /// The batch is below `min_batch_size`; commands run one at a time.
    pub fn batch_smaller_than_min_batch_size(
        &self,
        tables: &[String],
        command_count: usize,
        min_batch_size: usize,
    ) -> Result<()> {
        self.dispatch_log_only(EventId::BatchSmallerThanMinBatchSize, |definition| {
            BatchEventData {
                definition,
                message: |e| {
                    format!(
                        "Executing update commands individually as the number of batchable \
                         commands ({}) is smaller than the minimum batch size ({}).",
                        e.command_count,
                        e.min_batch_size.unwrap_or_default()
                    )
                },
                context: self.context(),
                tables: tables.to_vec(),
                command_count,
                min_batch_size: Some(min_batch_size),
            }
        })
    }
}
