//! LLM provider implementations

mod anthropic;
mod factory;
mod http_client;
mod openai;

pub use anthropic::AnthropicProvider;
pub use factory::LlmProviderFactory;
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;
