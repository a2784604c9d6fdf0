//! Random source port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::RandomDraw;

/// Source of uniformly distributed values in `[0, 1)`.
///
/// Implementations report whether a value came from the primary external
/// source or from a fallback generator.
#[async_trait]
pub trait RandomSource: Send + Sync {
    async fn draw(&self) -> DomainResult<RandomDraw>;
}
