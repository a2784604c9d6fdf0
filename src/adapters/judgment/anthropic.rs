//! Anthropic Messages API judgment capability.
//!
//! One request per judgment call, no streaming. Transient failures (429,
//! 5xx, network errors) are retried with exponential backoff inside a
//! bounded time budget; anything else fails immediately. Every failure
//! surfaces as `DomainError::JudgmentUnavailable`.

use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::JudgmentConfig;
use crate::domain::ports::{JudgmentCapability, JudgmentRequest};

const API_VERSION: &str = "2023-06-01";

/// Configuration for the Anthropic judgment adapter.
#[derive(Debug, Clone)]
pub struct AnthropicJudgmentConfig {
    /// API key (read from ANTHROPIC_API_KEY when not set).
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub retry_budget_secs: u64,
}

impl From<&JudgmentConfig> for AnthropicJudgmentConfig {
    fn from(config: &JudgmentConfig) -> Self {
        Self {
            api_key: None,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
            retry_budget_secs: config.retry_budget_secs,
        }
    }
}

impl AnthropicJudgmentConfig {
    /// Get API key from config or environment.
    pub fn get_api_key(&self) -> Option<String> {
        self.api_key.clone().or_else(|| std::env::var("ANTHROPIC_API_KEY").ok())
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(other)]
    Other,
}

/// Judgment capability backed by the Anthropic Messages API.
pub struct AnthropicJudgment {
    client: Client,
    config: AnthropicJudgmentConfig,
    api_key: String,
}

impl AnthropicJudgment {
    /// Build the adapter. Fails when no API key is available.
    pub fn new(config: AnthropicJudgmentConfig) -> DomainResult<Self> {
        let api_key = config.get_api_key().ok_or_else(|| {
            DomainError::JudgmentUnavailable("ANTHROPIC_API_KEY is not set".to_string())
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::JudgmentUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            config,
            api_key,
        })
    }

    async fn send_once(&self, request: &JudgmentRequest) -> Result<String, backoff::Error<DomainError>> {
        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            system: &request.instruction,
            messages: vec![Message {
                role: "user",
                content: &request.input,
            }],
            temperature: request.mode.temperature(),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.config.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| backoff::Error::transient(DomainError::JudgmentUnavailable(e.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let err = DomainError::JudgmentUnavailable(format!("HTTP {status}: {detail}"));
            return Err(if is_transient(status) {
                backoff::Error::transient(err)
            } else {
                backoff::Error::permanent(err)
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| backoff::Error::permanent(DomainError::JudgmentUnavailable(e.to_string())))?;

        Ok(parsed
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .collect::<Vec<_>>()
            .join(""))
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() || status.as_u16() == 529
}

#[async_trait]
impl JudgmentCapability for AnthropicJudgment {
    async fn judge(&self, request: JudgmentRequest) -> DomainResult<String> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(Duration::from_millis(500))
            .with_max_elapsed_time(Some(Duration::from_secs(self.config.retry_budget_secs)))
            .build();

        let task = request.task.as_str();
        tracing::debug!(task, mode = ?request.mode, "Sending judgment request");
        backoff::future::retry_notify(
            policy,
            || self.send_once(&request),
            |err: DomainError, wait: Duration| {
                tracing::warn!(task, error = %err, wait_ms = wait.as_millis() as u64, "Retrying judgment request");
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::JudgmentTask;

    fn config(base_url: String) -> AnthropicJudgmentConfig {
        AnthropicJudgmentConfig {
            api_key: Some("test-key".to_string()),
            base_url,
            model: "test-model".to_string(),
            max_tokens: 64,
            timeout_secs: 5,
            retry_budget_secs: 1,
        }
    }

    #[tokio::test]
    async fn test_judge_returns_text_blocks() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .match_header("x-api-key", "test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"content":[{"type":"text","text":"0.7"}]}"#)
            .create_async()
            .await;

        let judgment = AnthropicJudgment::new(config(server.url())).unwrap();
        let out = judgment
            .judge(JudgmentRequest::deterministic(JudgmentTask::SpecificityCheck, "rate", "x"))
            .await
            .unwrap();
        assert_eq!(out, "0.7");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/messages")
            .with_status(401)
            .with_body("unauthorized")
            .expect(1)
            .create_async()
            .await;

        let judgment = AnthropicJudgment::new(config(server.url())).unwrap();
        let err = judgment
            .judge(JudgmentRequest::deterministic(JudgmentTask::SpecificityCheck, "rate", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::JudgmentUnavailable(_)));
        mock.assert_async().await;
    }

    #[test]
    fn test_transient_statuses() {
        assert!(is_transient(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_transient(StatusCode::BAD_GATEWAY));
        assert!(!is_transient(StatusCode::BAD_REQUEST));
    }
}
