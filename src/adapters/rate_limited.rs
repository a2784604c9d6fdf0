//! Rate-limited decorators over the outbound capability ports.

use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::DomainResult;
use crate::domain::models::RandomDraw;
use crate::domain::ports::{JudgmentCapability, JudgmentRequest, RandomSource};
use crate::infrastructure::rate_limiter::RateLimiter;

/// Judgment capability that waits on a shared limiter before every call.
pub struct RateLimitedJudgment {
    inner: Arc<dyn JudgmentCapability>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedJudgment {
    pub fn new(inner: Arc<dyn JudgmentCapability>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl JudgmentCapability for RateLimitedJudgment {
    async fn judge(&self, request: JudgmentRequest) -> DomainResult<String> {
        self.limiter.acquire().await;
        self.inner.judge(request).await
    }
}

/// Random source that waits on a shared limiter before every draw.
pub struct RateLimitedRandom {
    inner: Arc<dyn RandomSource>,
    limiter: Arc<RateLimiter>,
}

impl RateLimitedRandom {
    pub fn new(inner: Arc<dyn RandomSource>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl RandomSource for RateLimitedRandom {
    async fn draw(&self) -> DomainResult<RandomDraw> {
        self.limiter.acquire().await;
        self.inner.draw().await
    }
}
