//! Weighted random selection among admitted candidates.
//!
//! The collapse algorithm is fixed: normalize intensities, build the
//! cumulative distribution, take one draw `t` and pick the first
//! candidate whose cumulative probability exceeds it. No configuration
//! reaches into this module.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Candidate, Counterfactual, RandomDraw, SelectionEntry, SelectionRecord};
use crate::domain::ports::RandomSource;

/// Outcome of resolving one cycle's admitted set.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub winner: Candidate,
    /// Present only when two or more candidates competed.
    pub record: Option<SelectionRecord>,
}

/// Collapses a set of admitted candidates to one winner.
pub struct SelectionResolver {
    random: Arc<dyn RandomSource>,
}

impl SelectionResolver {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self { random }
    }

    /// Pick one winner. A single candidate wins without a draw and without
    /// a record.
    pub async fn resolve(&self, mut candidates: Vec<Candidate>) -> DomainResult<Resolution> {
        match candidates.len() {
            0 => Err(DomainError::ValidationFailed(
                "selection requires at least one candidate".to_string(),
            )),
            1 => Ok(Resolution {
                winner: candidates.remove(0),
                record: None,
            }),
            _ => {
                let draw = self.random.draw().await?;
                let record = collapse(&candidates, draw)?;
                let index = record
                    .entries
                    .iter()
                    .position(|e| e.selected)
                    .ok_or_else(|| DomainError::ValidationFailed("collapse selected nothing".to_string()))?;
                tracing::info!(
                    winner = %record.entries[index].description,
                    t = record.threshold,
                    entropy = record.entropy,
                    source = record.source.as_str(),
                    "Selection collapsed"
                );
                Ok(Resolution {
                    winner: candidates.swap_remove(index),
                    record: Some(record),
                })
            }
        }
    }
}

/// Normalize intensities into a probability vector.
pub fn normalize(intensities: &[f64]) -> DomainResult<Vec<f64>> {
    if intensities.iter().any(|w| !w.is_finite() || *w <= 0.0) {
        return Err(DomainError::ValidationFailed(
            "intensities must be positive and finite".to_string(),
        ));
    }
    // Scale by the largest weight first so the sum cannot overflow.
    let max = intensities.iter().copied().fold(0.0, f64::max);
    let scaled: Vec<f64> = intensities.iter().map(|w| w / max).collect();
    let total: f64 = scaled.iter().sum();
    Ok(scaled.iter().map(|w| w / total).collect())
}

/// Normalized Shannon entropy `-Σ p log2 p / log2 n`, in `[0, 1]`.
///
/// Zero-probability terms contribute nothing. A single outcome has zero
/// entropy.
pub fn normalized_entropy(probabilities: &[f64]) -> f64 {
    let n = probabilities.len();
    if n < 2 {
        return 0.0;
    }
    let h: f64 = probabilities
        .iter()
        .filter(|p| **p > 0.0)
        .map(|p| -p * p.log2())
        .sum();
    (h / (n as f64).log2()).clamp(0.0, 1.0)
}

/// Second-highest probability; zero for fewer than two entries.
pub fn runner_up(probabilities: &[f64]) -> f64 {
    let mut sorted = probabilities.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    sorted.get(1).copied().unwrap_or(0.0)
}

/// Deterministic collapse of `candidates` under draw `t`.
pub fn collapse(candidates: &[Candidate], draw: RandomDraw) -> DomainResult<SelectionRecord> {
    if !draw.is_valid() {
        return Err(DomainError::ValidationFailed(format!(
            "random draw {} is outside [0, 1)",
            draw.value
        )));
    }
    let intensities: Vec<f64> = candidates.iter().map(|c| c.intensity).collect();
    let probabilities = normalize(&intensities)?;

    let mut intervals = Vec::with_capacity(probabilities.len());
    let mut lower = 0.0;
    for (i, p) in probabilities.iter().enumerate() {
        let upper = if i + 1 == probabilities.len() { 1.0 } else { lower + p };
        intervals.push((lower, upper));
        lower = upper;
    }

    let t = draw.value;
    let selected = intervals
        .iter()
        .position(|(_, upper)| *upper > t)
        .unwrap_or(intervals.len() - 1);

    let entries: Vec<SelectionEntry> = candidates
        .iter()
        .zip(probabilities.iter().zip(&intervals))
        .enumerate()
        .map(|(i, (c, (p, interval)))| SelectionEntry {
            candidate_id: c.id,
            description: c.description.clone(),
            probability: *p,
            interval: *interval,
            selected: i == selected,
        })
        .collect();

    let counterfactuals = entries
        .iter()
        .filter(|e| !e.selected)
        .map(|e| Counterfactual {
            candidate_id: e.candidate_id,
            description: e.description.clone(),
            lower: e.interval.0,
            upper: e.interval.1,
        })
        .collect();

    Ok(SelectionRecord {
        id: Uuid::new_v4(),
        entropy: normalized_entropy(&probabilities),
        runner_up_probability: runner_up(&probabilities),
        entries,
        threshold: t,
        source: draw.source,
        counterfactuals,
        created_at: Utc::now(),
    })
}
