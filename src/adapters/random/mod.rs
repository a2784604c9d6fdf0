//! Random source adapters.
//!
//! `FallbackRandomSource` wraps a primary external source and falls back
//! to the OS CSPRNG on any failure, so selection never stalls on an
//! unavailable provider. The draw's `source` flag records which one
//! produced it.

pub mod os;
pub mod qrng;

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::RandomDraw;
use crate::domain::ports::RandomSource;

pub use os::OsRandomSource;
pub use qrng::QrngRandomSource;

/// Primary source with a transparent local fallback.
pub struct FallbackRandomSource {
    primary: Option<Arc<dyn RandomSource>>,
}

impl FallbackRandomSource {
    pub fn new(primary: Arc<dyn RandomSource>) -> Self {
        Self {
            primary: Some(primary),
        }
    }

    /// No external source configured: every draw is a fallback draw.
    pub fn local_only() -> Self {
        Self { primary: None }
    }
}

#[async_trait]
impl RandomSource for FallbackRandomSource {
    async fn draw(&self) -> DomainResult<RandomDraw> {
        if let Some(primary) = &self.primary {
            match primary.draw().await {
                Ok(draw) if draw.is_valid() => return Ok(draw),
                Ok(draw) => {
                    tracing::warn!(value = draw.value, "External random value out of range, using fallback");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "External random source unavailable, using fallback");
                }
            }
        }
        OsRandomSource.draw().await
    }
}

/// Replays fixed values, for deterministic tests and reproductions.
///
/// Values are consumed in order; the last one repeats.
pub struct FixedRandomSource {
    values: Mutex<Vec<RandomDraw>>,
}

impl FixedRandomSource {
    pub fn new(draws: Vec<RandomDraw>) -> Self {
        let mut values = draws;
        values.reverse();
        Self {
            values: Mutex::new(values),
        }
    }

    /// A single external draw of `value`.
    pub fn external(value: f64) -> Self {
        Self::new(vec![RandomDraw::external(value)])
    }
}

#[async_trait]
impl RandomSource for FixedRandomSource {
    async fn draw(&self) -> DomainResult<RandomDraw> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let draw = if values.len() > 1 { values.pop() } else { values.last().copied() };
        draw.ok_or_else(|| DomainError::RandomSourceUnavailable("no fixed values left".to_string()))
    }
}

/// A source that is always down.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRandomSource;

#[async_trait]
impl RandomSource for UnavailableRandomSource {
    async fn draw(&self) -> DomainResult<RandomDraw> {
        Err(DomainError::RandomSourceUnavailable("source offline".to_string()))
    }
}
