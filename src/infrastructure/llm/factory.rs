use std::sync::Arc;

use tracing::info;

use super::http_client::HttpClient;
use super::{AnthropicProvider, OpenAiProvider};
use crate::config::{GenerationConfig, ProviderKind};
use crate::domain::{DomainError, LlmProvider};

/// Factory for creating LLM providers
#[derive(Debug)]
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Build the configured provider, reading its API key from the environment
    pub fn create(config: &GenerationConfig) -> Result<Arc<dyn LlmProvider>, DomainError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "API key environment variable '{}' is not set",
                    config.api_key_env
                ))
            })?;

        let provider = Self::create_with_key(config, api_key);

        info!(
            provider = provider.provider_name(),
            model = %config.model,
            "Generation provider configured"
        );

        Ok(provider)
    }

    /// Build the configured provider with an explicit key
    pub fn create_with_key(
        config: &GenerationConfig,
        api_key: impl Into<String>,
    ) -> Arc<dyn LlmProvider> {
        let http_client = HttpClient::new();

        match (config.provider, &config.base_url) {
            (ProviderKind::OpenAi, Some(base_url)) => Arc::new(OpenAiProvider::with_base_url(
                http_client,
                api_key,
                base_url,
            )),
            (ProviderKind::OpenAi, None) => Arc::new(OpenAiProvider::new(http_client, api_key)),
            (ProviderKind::Anthropic, Some(base_url)) => Arc::new(
                AnthropicProvider::with_base_url(http_client, api_key, base_url),
            ),
            (ProviderKind::Anthropic, None) => {
                Arc::new(AnthropicProvider::new(http_client, api_key))
            }
        }
    }
}
