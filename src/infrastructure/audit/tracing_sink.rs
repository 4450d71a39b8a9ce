use tracing::info;

use crate::domain::pipeline::{AuditRecord, AuditSink};

/// Writes audit records to the log under the `audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, record: AuditRecord) {
        info!(
            target: "audit",
            request_id = %record.request_id,
            stage = %record.stage,
            outcome = record.outcome.as_str(),
            entered_at = %record.entered_at,
            exited_at = %record.exited_at,
            "Stage transition"
        );
    }
}
