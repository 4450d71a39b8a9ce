//! Stage and orchestrator contracts

use std::fmt::Debug;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::envelope::{Envelope, StageName};

/// Request-scoped context shared by every stage of one run
#[derive(Debug, Clone, Default)]
pub struct StageContext {
    cancel: CancellationToken,
}

impl StageContext {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { cancel }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// One step of the pipeline.
///
/// A stage takes the envelope by value and hands back the extended one. It
/// records its own output and errors; it never fails outside the envelope.
#[async_trait]
pub trait Stage: Send + Sync + Debug {
    fn name(&self) -> StageName;

    async fn run(&self, envelope: Envelope, ctx: &StageContext) -> Envelope;
}

/// Drives an envelope through the stage sequence
#[async_trait]
pub trait Orchestrator: Send + Sync {
    async fn execute(&self, envelope: Envelope, ctx: &StageContext) -> Envelope;
}
