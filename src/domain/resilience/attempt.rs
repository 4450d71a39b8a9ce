//! Per-attempt observations emitted by the generation client

use std::fmt::Debug;
use std::sync::Mutex;
use std::time::Duration;

use serde::Serialize;

use crate::domain::envelope::StageName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Transient,
    Permanent,
    CircuitOpen,
    Cancelled,
}

impl AttemptOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Transient => "transient",
            Self::Permanent => "permanent",
            Self::CircuitOpen => "circuit_open",
            Self::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub stage: StageName,
    /// 1-based attempt number
    pub attempt: u32,
    pub latency: Duration,
    pub outcome: AttemptOutcome,
    /// Delay scheduled before the next attempt, if any
    pub backoff: Option<Duration>,
}

/// Sink for attempt records. Must not block or fail.
pub trait AttemptRecorder: Send + Sync + Debug {
    fn record(&self, record: &AttemptRecord);

    /// Called when a failure opens the circuit
    fn circuit_opened(&self) {}
}

/// Keeps every record; used by tests and the CLI
#[derive(Debug, Default)]
pub struct InMemoryAttemptRecorder {
    records: Mutex<Vec<AttemptRecord>>,
    circuit_opened: Mutex<u32>,
}

impl InMemoryAttemptRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AttemptRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn records_for(&self, stage: StageName) -> Vec<AttemptRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.stage == stage)
            .collect()
    }

    pub fn circuit_open_count(&self) -> u32 {
        self.circuit_opened.lock().map(|c| *c).unwrap_or_default()
    }
}

impl AttemptRecorder for InMemoryAttemptRecorder {
    fn record(&self, record: &AttemptRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record.clone());
        }
    }

    fn circuit_opened(&self) {
        if let Ok(mut count) = self.circuit_opened.lock() {
            *count += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_recorder_filters_by_stage() {
        let recorder = InMemoryAttemptRecorder::new();

        for (stage, attempt) in [(StageName::Parse, 1), (StageName::Design, 1), (StageName::Parse, 2)] {
            recorder.record(&AttemptRecord {
                stage,
                attempt,
                latency: Duration::from_millis(5),
                outcome: AttemptOutcome::Transient,
                backoff: None,
            });
        }
        recorder.circuit_opened();

        assert_eq!(recorder.records().len(), 3);
        assert_eq!(recorder.records_for(StageName::Parse).len(), 2);
        assert_eq!(recorder.circuit_open_count(), 1);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(AttemptOutcome::CircuitOpen.as_str(), "circuit_open");
        assert_eq!(
            serde_json::to_string(&AttemptOutcome::Success).unwrap(),
            "\"success\""
        );
    }
}
