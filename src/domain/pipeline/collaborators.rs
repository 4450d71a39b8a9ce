//! Audit and delivery collaborator contracts

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use mockall::automock;

use crate::domain::envelope::{RequestId, StageName, TerminalSnapshot};
use crate::domain::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    Completed,
    /// Completed, but appended non-fatal errors
    Degraded,
    Halted,
}

impl StageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Degraded => "degraded",
            Self::Halted => "halted",
        }
    }
}

/// Append-only record of one stage transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub request_id: RequestId,
    pub stage: StageName,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub outcome: StageOutcome,
}

/// Fire-and-forget audit trail; implementations must not block or fail
pub trait AuditSink: Send + Sync + Debug {
    fn record(&self, record: AuditRecord);
}

/// Receives the terminal snapshot of every request
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn deliver(&self, snapshot: &TerminalSnapshot) -> Result<(), DomainError>;
}
