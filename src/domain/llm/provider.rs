use async_trait::async_trait;
use std::fmt::Debug;

use super::{LlmRequest, LlmResponse};
use crate::domain::DomainError;

/// Trait for LLM providers (OpenAI, Anthropic, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug {
    /// Send a chat completion request
    async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError>;

    /// Get the provider name
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use crate::domain::llm::{FinishReason, Message};

    /// Scripted provider.
    ///
    /// Queued outcomes are consumed first, in order. Once the queue is empty the
    /// first routing rule whose needle appears in the user message answers.
    #[derive(Debug)]
    pub struct MockLlmProvider {
        name: &'static str,
        queue: Mutex<VecDeque<Result<String, DomainError>>>,
        routes: Vec<(String, String)>,
        fallback: Option<String>,
        delay: Option<Duration>,
        calls: AtomicUsize,
        prompts: Mutex<Vec<String>>,
    }

    impl MockLlmProvider {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                queue: Mutex::new(VecDeque::new()),
                routes: Vec::new(),
                fallback: None,
                delay: None,
                calls: AtomicUsize::new(0),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn with_response(self, content: impl Into<String>) -> Self {
            self.queue.lock().unwrap().push_back(Ok(content.into()));
            self
        }

        pub fn with_error(self, error: DomainError) -> Self {
            self.queue.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn with_route(mut self, needle: impl Into<String>, content: impl Into<String>) -> Self {
            self.routes.push((needle.into(), content.into()));
            self
        }

        pub fn with_fallback(mut self, content: impl Into<String>) -> Self {
            self.fallback = Some(content.into());
            self
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = Some(delay);
            self
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        /// User messages seen so far
        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }

        fn next_outcome(&self, prompt: &str) -> Result<String, DomainError> {
            if let Some(outcome) = self.queue.lock().unwrap().pop_front() {
                return outcome;
            }

            self.routes
                .iter()
                .find(|(needle, _)| prompt.contains(needle.as_str()))
                .map(|(_, content)| content.clone())
                .or_else(|| self.fallback.clone())
                .ok_or_else(|| DomainError::provider(self.name, "No mock response configured"))
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlmProvider {
        async fn chat(&self, model: &str, request: LlmRequest) -> Result<LlmResponse, DomainError> {
            self.calls.fetch_add(1, Ordering::SeqCst);

            let prompt = request
                .messages
                .iter()
                .filter(|m| !m.is_system())
                .map(|m| m.content_text())
                .collect::<Vec<_>>()
                .join("\n");
            self.prompts.lock().unwrap().push(prompt.clone());

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let content = self.next_outcome(&prompt)?;

            Ok(LlmResponse::new(
                format!("mock-{}", self.calls()),
                model.to_string(),
                Message::assistant(content),
            )
            .with_finish_reason(FinishReason::Stop))
        }

        fn provider_name(&self) -> &'static str {
            self.name
        }
    }
}
