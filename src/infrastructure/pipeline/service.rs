//! Request-level entry point: submission, deadlines, cancellation, delivery

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::orchestrator::StageOrchestrator;
use crate::config::PipelineConfig;
use crate::domain::pipeline::{DeliverySink, Orchestrator};
use crate::domain::{
    CircuitState, Envelope, GenerationClient, KnowledgeValidator, RawRequest, RequestId,
    StageContext, TerminalSnapshot,
};
use crate::infrastructure::delivery::{InMemoryRequestStore, RequestStatus};
use crate::infrastructure::observability;

/// Runs requests through the orchestrator, each under its own deadline
#[derive(Clone)]
pub struct PipelineService {
    orchestrator: Arc<StageOrchestrator>,
    generation: Arc<dyn GenerationClient>,
    validator: KnowledgeValidator,
    store: Arc<InMemoryRequestStore>,
    delivery: Arc<dyn DeliverySink>,
    permits: Arc<Semaphore>,
    deadline: Duration,
    running: Arc<RwLock<HashMap<RequestId, CancellationToken>>>,
}

impl fmt::Debug for PipelineService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineService")
            .field("orchestrator", &self.orchestrator)
            .field("deadline", &self.deadline)
            .field("available_permits", &self.permits.available_permits())
            .finish_non_exhaustive()
    }
}

impl PipelineService {
    pub fn new(
        orchestrator: Arc<StageOrchestrator>,
        generation: Arc<dyn GenerationClient>,
        validator: KnowledgeValidator,
        store: Arc<InMemoryRequestStore>,
        delivery: Arc<dyn DeliverySink>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            orchestrator,
            generation,
            validator,
            store,
            delivery,
            permits: Arc::new(Semaphore::new(config.max_concurrent_requests.max(1))),
            deadline: config.request_deadline(),
            running: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Accept a request and run it in the background
    pub fn submit(&self, raw: RawRequest) -> RequestId {
        let request_id = RequestId::new();
        let cancel = self.track(request_id);
        self.store.mark_running(request_id);

        info!(request_id = %request_id, priority = ?raw.priority, "Request submitted");

        let service = self.clone();
        tokio::spawn(async move {
            let Ok(_permit) = service.permits.clone().acquire_owned().await else {
                warn!(request_id = %request_id, "Pipeline is shutting down; request dropped");
                return;
            };

            let envelope = service.execute(request_id, raw, cancel).await;
            service.finish(&envelope).await;
        });

        request_id
    }

    /// Run a request to completion on the caller's task
    pub async fn run(&self, raw: RawRequest) -> Envelope {
        let request_id = RequestId::new();
        let cancel = self.track(request_id);
        self.store.mark_running(request_id);

        let _permit = self.permits.acquire().await.ok();
        let envelope = self.execute(request_id, raw, cancel).await;
        self.finish(&envelope).await;

        envelope
    }

    /// Abort a running request; false when it is unknown or already finished
    pub fn cancel(&self, request_id: RequestId) -> bool {
        let token = self
            .running
            .read()
            .ok()
            .and_then(|running| running.get(&request_id).cloned());

        match token {
            Some(token) => {
                info!(request_id = %request_id, "Cancelling request");
                token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn status(&self, request_id: RequestId) -> Option<RequestStatus> {
        self.store.status(request_id)
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.generation.circuit_state()
    }

    pub fn validator(&self) -> &KnowledgeValidator {
        &self.validator
    }

    pub fn in_flight(&self) -> usize {
        self.running.read().map(|r| r.len()).unwrap_or_default()
    }

    fn track(&self, request_id: RequestId) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut running) = self.running.write() {
            running.insert(request_id, token.clone());
        }
        token
    }

    fn untrack(&self, request_id: RequestId) {
        if let Ok(mut running) = self.running.write() {
            running.remove(&request_id);
        }
    }

    async fn execute(&self, request_id: RequestId, raw: RawRequest, cancel: CancellationToken) -> Envelope {
        let envelope = Envelope::new(request_id, raw);
        let ctx = StageContext::new(cancel.clone());

        let deadline = self.deadline;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(request_id = %request_id, deadline_ms = deadline.as_millis() as u64, "Request deadline exceeded");
            cancel.cancel();
        });

        let envelope = self.orchestrator.execute(envelope, &ctx).await;

        timer.abort();
        self.untrack(request_id);

        envelope
    }

    async fn finish(&self, envelope: &Envelope) {
        let snapshot = TerminalSnapshot::from(envelope);
        observability::record_pipeline_run(snapshot.outcome);

        if let Err(e) = self.delivery.deliver(&snapshot).await {
            warn!(request_id = %snapshot.request_id, error = %e, "Snapshot delivery failed");
        }
    }
}
