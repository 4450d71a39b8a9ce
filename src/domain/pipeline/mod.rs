//! Pipeline domain - orchestrator state machine, stage contract and the
//! collaborators notified along the way

mod collaborators;
mod stage;
mod state;

pub use collaborators::{AuditRecord, AuditSink, DeliverySink, StageOutcome};
pub use stage::{Orchestrator, Stage, StageContext};
pub use state::PipelineState;

#[cfg(test)]
pub use collaborators::MockDeliverySink;
