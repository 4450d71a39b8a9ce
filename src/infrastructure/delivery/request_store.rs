use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::pipeline::DeliverySink;
use crate::domain::{DomainError, RequestId, TerminalSnapshot};

/// What a status query sees for one request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RequestStatus {
    Running,
    Finished { snapshot: Box<TerminalSnapshot> },
}

/// Remembers submitted requests and their terminal snapshots
#[derive(Debug, Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<RequestId, RequestStatus>>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_running(&self, request_id: RequestId) {
        if let Ok(mut requests) = self.requests.write() {
            requests.insert(request_id, RequestStatus::Running);
        }
    }

    pub fn status(&self, request_id: RequestId) -> Option<RequestStatus> {
        self.requests
            .read()
            .ok()
            .and_then(|requests| requests.get(&request_id).cloned())
    }

    pub fn snapshot(&self, request_id: RequestId) -> Option<TerminalSnapshot> {
        match self.status(request_id)? {
            RequestStatus::Finished { snapshot } => Some(*snapshot),
            RequestStatus::Running => None,
        }
    }

    pub fn len(&self) -> usize {
        self.requests.read().map(|r| r.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DeliverySink for InMemoryRequestStore {
    async fn deliver(&self, snapshot: &TerminalSnapshot) -> Result<(), DomainError> {
        let mut requests = self
            .requests
            .write()
            .map_err(|_| DomainError::internal("request store lock poisoned"))?;

        requests.insert(
            snapshot.request_id,
            RequestStatus::Finished {
                snapshot: Box::new(snapshot.clone()),
            },
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Envelope, RawRequest};

    #[tokio::test]
    async fn test_running_then_finished() {
        let store = InMemoryRequestStore::new();
        let id = RequestId::new();

        assert!(store.status(id).is_none());

        store.mark_running(id);
        assert_eq!(store.status(id), Some(RequestStatus::Running));
        assert!(store.snapshot(id).is_none());

        let envelope = Envelope::new(id, RawRequest::new("build X please", "a@b.io"));
        let snapshot = TerminalSnapshot::from(&envelope);
        store.deliver(&snapshot).await.unwrap();

        assert_eq!(store.snapshot(id), Some(snapshot));
        assert_eq!(store.len(), 1);
    }
}
