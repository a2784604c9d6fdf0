//! Selection (collapse) records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which generator produced a random draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawSource {
    ExternalRandom,
    FallbackRandom,
}

impl DrawSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExternalRandom => "external_random",
            Self::FallbackRandom => "fallback_random",
        }
    }
}

/// A single uniformly distributed value in `[0, 1)` with its origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RandomDraw {
    pub value: f64,
    pub source: DrawSource,
}

impl RandomDraw {
    pub fn external(value: f64) -> Self {
        Self {
            value,
            source: DrawSource::ExternalRandom,
        }
    }

    pub fn fallback(value: f64) -> Self {
        Self {
            value,
            source: DrawSource::FallbackRandom,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && (0.0..1.0).contains(&self.value)
    }
}

/// One competing candidate inside a selection record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub candidate_id: Uuid,
    pub description: String,
    pub probability: f64,
    /// Half-open interval of the cumulative distribution owned by this entry.
    pub interval: (f64, f64),
    pub selected: bool,
}

/// "Had t been in [lower, upper), this candidate would have won."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterfactual {
    pub candidate_id: Uuid,
    pub description: String,
    pub lower: f64,
    pub upper: f64,
}

impl Counterfactual {
    pub fn statement(&self) -> String {
        format!(
            "had t been in [{:.3}, {:.3}), \"{}\" would have won",
            self.lower, self.upper, self.description
        )
    }
}

/// Immutable audit record of one collapse event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRecord {
    pub id: Uuid,
    /// Entries in the order the candidates were presented.
    pub entries: Vec<SelectionEntry>,
    /// The random draw `t`.
    pub threshold: f64,
    /// Normalized Shannon entropy of the probability vector, in `[0, 1]`.
    pub entropy: f64,
    pub runner_up_probability: f64,
    pub source: DrawSource,
    pub counterfactuals: Vec<Counterfactual>,
    pub created_at: DateTime<Utc>,
}

impl SelectionRecord {
    pub fn winner(&self) -> Option<&SelectionEntry> {
        self.entries.iter().find(|e| e.selected)
    }

    pub fn probabilities(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.probability).collect()
    }
}
