//! HTTP quantum random number source.
//!
//! Expects the ANU-style JSON shape `{"data": [u16, ...], "success": true}`
//! and maps the first value onto `[0, 1)`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RandomDraw;
use crate::domain::ports::RandomSource;

#[derive(Debug, Deserialize)]
struct QrngResponse {
    #[serde(default)]
    data: Vec<u16>,
    #[serde(default)]
    success: bool,
}

/// External random source queried over HTTP.
pub struct QrngRandomSource {
    client: Client,
    endpoint: String,
}

impl QrngRandomSource {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::RandomSourceUnavailable(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RandomSource for QrngRandomSource {
    async fn draw(&self) -> DomainResult<RandomDraw> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(|e| DomainError::RandomSourceUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::RandomSourceUnavailable(format!("HTTP {status}")));
        }

        let body: QrngResponse = response
            .json()
            .await
            .map_err(|e| DomainError::RandomSourceUnavailable(format!("malformed response: {e}")))?;

        match body.data.first() {
            Some(value) if body.success => Ok(RandomDraw::external(f64::from(*value) / 65_536.0)),
            _ => Err(DomainError::RandomSourceUnavailable(
                "response carried no random data".to_string(),
            )),
        }
    }
}
