use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;

use crate::domain::DomainError;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 512;

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    /// POST a JSON body. Non-2xx answers become [`DomainError::Http`] with the
    /// status code and any integer `retry-after` hint.
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    timeout: Option<Duration>,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::configuration(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout: Some(timeout),
        })
    }

    fn map_send_error(&self, error: reqwest::Error) -> DomainError {
        match self.timeout {
            Some(timeout) if error.is_timeout() => DomainError::timeout(timeout),
            _ => DomainError::transport(format!("Request failed: {}", error)),
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Integer seconds only; HTTP-date hints are ignored
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

fn truncate(mut text: String) -> String {
    if text.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        text.truncate(end);
    }
    text
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, DomainError> {
        let mut request = self.client.post(url);

        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request
            .json(body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let error_body = truncate(response.text().await.unwrap_or_default());

            return Err(DomainError::Http {
                status: status.as_u16(),
                message: error_body,
                retry_after,
            });
        }

        response
            .json()
            .await
            .map_err(|e| DomainError::malformed_response("http", format!("Failed to parse response: {}", e)))
    }
}
