//! Operating-system CSPRNG source.

use async_trait::async_trait;
use rand::rngs::OsRng;
use rand::Rng;

use crate::domain::errors::DomainResult;
use crate::domain::models::RandomDraw;
use crate::domain::ports::RandomSource;

/// Local cryptographically strong generator. Every draw is tagged as a
/// fallback draw.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomSource;

impl OsRandomSource {
    pub fn sample() -> f64 {
        OsRng.gen_range(0.0..1.0)
    }
}

#[async_trait]
impl RandomSource for OsRandomSource {
    async fn draw(&self) -> DomainResult<RandomDraw> {
        Ok(RandomDraw::fallback(Self::sample()))
    }
}
