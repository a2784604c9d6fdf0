//! Practice domains and classification results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::domain::errors::DomainError;

/// Practice category. Only `Code`, `Math` and `Logic` permit practice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PracticeDomain {
    Code,
    Math,
    Logic,
    Creative,
    Ambiguous,
}

impl PracticeDomain {
    /// Domains that carry a scoring vocabulary, in tie-break order.
    pub const SCORED: [PracticeDomain; 4] = [Self::Code, Self::Math, Self::Logic, Self::Creative];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => "code",
            Self::Math => "math",
            Self::Logic => "logic",
            Self::Creative => "creative",
            Self::Ambiguous => "ambiguous",
        }
    }

    /// Whether verifiable practice may be attempted in this domain.
    pub fn permits_practice(&self) -> bool {
        matches!(self, Self::Code | Self::Math | Self::Logic)
    }
}

impl fmt::Display for PracticeDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PracticeDomain {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(Self::Code),
            "math" => Ok(Self::Math),
            "logic" => Ok(Self::Logic),
            "creative" => Ok(Self::Creative),
            "ambiguous" => Ok(Self::Ambiguous),
            other => Err(DomainError::ValidationFailed(format!(
                "unknown practice domain: {other}"
            ))),
        }
    }
}

/// Normalized score of one domain vocabulary against a description.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DomainScore {
    pub domain: PracticeDomain,
    pub score: f64,
}

/// Routing decision for an accepted candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainClassification {
    pub primary_domain: PracticeDomain,
    pub primary_confidence: f64,
    pub secondary_domain: Option<PracticeDomain>,
    /// Per-vocabulary scores, kept for recalibration.
    pub scores: Vec<DomainScore>,
}

impl DomainClassification {
    pub fn permits_practice(&self) -> bool {
        self.primary_domain.permits_practice()
    }
}

/// What happened after a classification was acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationOutcome {
    Blocked,
    GenerationFailed,
    PracticeSucceeded,
    PracticeFailed,
}

impl CalibrationOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocked => "blocked",
            Self::GenerationFailed => "generation_failed",
            Self::PracticeSucceeded => "practice_succeeded",
            Self::PracticeFailed => "practice_failed",
        }
    }
}

/// Predicted domain versus practice outcome, kept for offline
/// recalibration of the classifier's keyword weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSignal {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub description: String,
    pub predicted_domain: PracticeDomain,
    pub confidence: f64,
    pub outcome: CalibrationOutcome,
    /// Outcomes that suggest the vocabulary routed the candidate wrongly:
    /// an oracle that never became valid, or a practice run scoring zero.
    pub suspected_misclassification: bool,
    pub recorded_at: DateTime<Utc>,
}
