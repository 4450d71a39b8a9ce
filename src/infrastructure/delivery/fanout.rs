use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::warn;

use crate::domain::pipeline::DeliverySink;
use crate::domain::{DomainError, TerminalSnapshot};

/// Delivers to every inner sink, even when an earlier one fails
#[derive(Default, Clone)]
pub struct FanoutDeliverySink {
    sinks: Vec<Arc<dyn DeliverySink>>,
}

impl std::fmt::Debug for FanoutDeliverySink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutDeliverySink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl FanoutDeliverySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sink(mut self, sink: Arc<dyn DeliverySink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

#[async_trait]
impl DeliverySink for FanoutDeliverySink {
    /// Delivers concurrently; returns the first failure in sink order
    async fn deliver(&self, snapshot: &TerminalSnapshot) -> Result<(), DomainError> {
        let results = join_all(self.sinks.iter().map(|sink| sink.deliver(snapshot))).await;

        let mut first_error = None;
        for e in results.into_iter().filter_map(Result::err) {
            warn!(request_id = %snapshot.request_id, error = %e, "Delivery sink failed");
            first_error.get_or_insert(e);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
