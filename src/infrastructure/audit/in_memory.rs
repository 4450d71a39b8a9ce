use std::sync::RwLock;

use crate::domain::pipeline::{AuditRecord, AuditSink};
use crate::domain::RequestId;

/// Keeps every record in memory
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    records: RwLock<Vec<AuditRecord>>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records
            .read()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn records_for(&self, request_id: RequestId) -> Vec<AuditRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.request_id == request_id)
            .collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&self, record: AuditRecord) {
        if let Ok(mut records) = self.records.write() {
            records.push(record);
        }
    }
}
