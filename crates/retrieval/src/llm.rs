//! `LlmClient` — a thin collaborator seam over an external LLM service, not
//! this crate's responsibility to implement providers for. A `NoopLlmClient`
//! test double and a reqwest-based HTTP implementation are both provided.

use async_trait::async_trait;
use hybridrag_core::error::{RagError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub context: String,
    pub query: String,
    pub provider: Option<String>,
    pub model: Option<String>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<String>;
}

/// Test double: echoes back a fixed answer, recording the last request it
/// received for assertions.
pub struct NoopLlmClient {
    pub fixed_answer: String,
}

#[async_trait]
impl LlmClient for NoopLlmClient {
    async fn complete(&self, _request: LlmRequest) -> Result<String> {
        Ok(self.fixed_answer.clone())
    }
}

#[derive(Serialize)]
struct CompletionRequestBody<'a> {
    context: &'a str,
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
}

#[derive(Deserialize)]
struct CompletionResponseBody {
    answer: String,
}

/// Calls an external LLM-service HTTP endpoint with a `{context, query}`
/// body plus optional `provider`/`model` overrides.
pub struct HttpLlmClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpLlmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }
}

#[async_trait]
impl LlmClient for HttpLlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<String> {
        debug!(provider = ?request.provider, model = ?request.model, "calling llm service");

        let body = CompletionRequestBody {
            context: &request.context,
            query: &request.query,
            provider: request.provider.as_deref(),
            model: request.model.as_deref(),
        };

        let response = self
            .client
            .post(format!("{}/v1/complete", self.base_url))
            .json(&body)
            .timeout(std::time::Duration::from_secs(hybridrag_core::config::get_settings().request_timeout_secs))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "llm request failed");
                RagError::Llm { provider: request.provider.clone().unwrap_or_default(), message: format!("request failed: {e}") }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagError::Llm { provider: request.provider.unwrap_or_default(), message: format!("llm service returned {status}: {body}") });
        }

        let parsed: CompletionResponseBody = response
            .json()
            .await
            .map_err(|e| RagError::Llm { provider: request.provider.unwrap_or_default(), message: format!("failed to parse response: {e}") })?;

        Ok(parsed.answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn noop_client_returns_fixed_answer() {
        let client = NoopLlmClient { fixed_answer: "42".to_string() };
        let answer = client.complete(LlmRequest { context: "ctx".to_string(), query: "q".to_string(), provider: None, model: None }).await.unwrap();
        assert_eq!(answer, "42");
    }
}
