//! Stage orchestrator

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::domain::pipeline::{AuditRecord, AuditSink, Orchestrator, PipelineState, Stage, StageOutcome};
use crate::domain::{DomainError, Envelope, ErrorKind, StageContext, StageError, StageName};
use crate::infrastructure::observability;

/// Runs the stages in fixed order, halting on the first fatal error
#[derive(Debug)]
pub struct StageOrchestrator {
    stages: Vec<Arc<dyn Stage>>,
    audit: Arc<dyn AuditSink>,
    min_brief_len: usize,
}

impl StageOrchestrator {
    /// Stages must be given in strictly increasing pipeline order
    pub fn new(
        stages: Vec<Arc<dyn Stage>>,
        audit: Arc<dyn AuditSink>,
        min_brief_len: usize,
    ) -> Result<Self, DomainError> {
        if stages.is_empty() {
            return Err(DomainError::configuration("pipeline has no stages"));
        }

        if stages.iter().any(|s| s.name() == StageName::Intake) {
            return Err(DomainError::configuration("intake is not a runnable stage"));
        }

        if let Some(pair) = stages.windows(2).find(|pair| pair[0].name() >= pair[1].name()) {
            return Err(DomainError::configuration(format!(
                "stage '{}' cannot run after '{}'",
                pair[1].name(),
                pair[0].name()
            )));
        }

        Ok(Self {
            stages,
            audit,
            min_brief_len,
        })
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run the pipeline and report the final state machine position
    pub async fn run(&self, envelope: Envelope, ctx: &StageContext) -> (Envelope, PipelineState) {
        let span = info_span!("pipeline", request_id = %envelope.request_id());

        async move {
            let (envelope, state) = self.drive(envelope, ctx).await;

            info!(
                state = ?state,
                errors = envelope.errors().len(),
                total_latency_ms = envelope.total_latency_ms(),
                "Pipeline finished"
            );

            (envelope, state)
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, mut envelope: Envelope, ctx: &StageContext) -> (Envelope, PipelineState) {
        let mut state = PipelineState::Pending;

        envelope.enter_stage(StageName::Intake);
        let intake = envelope.raw_request().check(self.min_brief_len);
        envelope.exit_stage(StageName::Intake);

        if let Err(reason) = intake {
            warn!(reason = %reason, "Request rejected at intake");
            envelope.push_error(StageError::fatal(
                StageName::Intake,
                ErrorKind::ValidationInput,
                reason,
            ));
            self.audit_stage(&envelope, StageName::Intake, StageOutcome::Halted);
            return (envelope, state.halt());
        }

        self.audit_stage(&envelope, StageName::Intake, StageOutcome::Completed);

        for stage in &self.stages {
            let name = stage.name();

            if ctx.is_cancelled() {
                warn!(stage = %name, "Run cancelled before stage");
                envelope.push_error(StageError::fatal(
                    name,
                    ErrorKind::Cancelled,
                    "request cancelled or deadline exceeded",
                ));
                state = state.enter(name).halt();
                break;
            }

            state = state.enter(name);
            debug!(stage = %name, "Entering stage");

            let errors_before = envelope.errors().len();
            let started = Instant::now();

            envelope.enter_stage(name);
            envelope = stage.run(envelope, ctx).await;
            envelope.exit_stage(name);

            let added = &envelope.errors()[errors_before..];
            let outcome = if added.iter().any(|e| e.fatal) {
                StageOutcome::Halted
            } else if !added.is_empty() {
                StageOutcome::Degraded
            } else {
                StageOutcome::Completed
            };

            observability::record_stage(name, outcome, started.elapsed());
            self.audit_stage(&envelope, name, outcome);

            if outcome == StageOutcome::Halted {
                if let Some(error) = envelope.fatal_error() {
                    warn!(stage = %name, kind = error.kind.as_str(), message = %error.message, "Pipeline halted");
                }
                state = state.halt();
                break;
            }
        }

        (envelope, state.complete())
    }

    fn audit_stage(&self, envelope: &Envelope, stage: StageName, outcome: StageOutcome) {
        let timing = envelope.timestamps().iter().rev().find(|t| t.stage == stage);
        let entered_at = timing.map(|t| t.entered_at).unwrap_or_else(Utc::now);
        let exited_at = timing.and_then(|t| t.exited_at).unwrap_or(entered_at);

        self.audit.record(AuditRecord {
            request_id: envelope.request_id(),
            stage,
            entered_at,
            exited_at,
            outcome,
        });
    }
}

#[async_trait]
impl Orchestrator for StageOrchestrator {
    async fn execute(&self, envelope: Envelope, ctx: &StageContext) -> Envelope {
        self.run(envelope, ctx).await.0
    }
}
