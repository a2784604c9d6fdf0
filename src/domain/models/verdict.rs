//! Emergence gate verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How the specificity score was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecificityPath {
    /// Fast path: short, disposition-only description.
    FastGeneric,
    /// Fast path: names a capability and a qualifier.
    FastConcrete,
    /// Ambiguous; scored by the judgment capability.
    Escalated,
    /// Ambiguous; scored by the deterministic phrase model.
    PhraseModel,
}

/// Why a candidate was not admitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Provenance was the weaker of the two sub-scores.
    WeakProvenance { score: f64 },
    /// Specificity was the weaker of the two sub-scores.
    WeakSpecificity { score: f64 },
    /// The candidate violated its structural contract.
    InvalidCandidate { message: String },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WeakProvenance { score } => write!(f, "provenance too weak ({score:.2})"),
            Self::WeakSpecificity { score } => write!(f, "specificity too weak ({score:.2})"),
            Self::InvalidCandidate { message } => write!(f, "invalid candidate: {message}"),
        }
    }
}

/// Admit/reject decision for one candidate. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergenceVerdict {
    pub candidate_id: Uuid,
    pub provenance_score: f64,
    pub specificity_score: f64,
    pub combined_score: f64,
    pub threshold: f64,
    pub passed: bool,
    pub rejection_reason: Option<RejectionReason>,
    pub specificity_path: Option<SpecificityPath>,
    pub evaluated_at: DateTime<Utc>,
}

impl EmergenceVerdict {
    /// Verdict for a candidate that failed validation before scoring.
    pub fn invalid(candidate_id: Uuid, threshold: f64, message: impl Into<String>) -> Self {
        Self {
            candidate_id,
            provenance_score: 0.0,
            specificity_score: 0.0,
            combined_score: 0.0,
            threshold,
            passed: false,
            rejection_reason: Some(RejectionReason::InvalidCandidate {
                message: message.into(),
            }),
            specificity_path: None,
            evaluated_at: Utc::now(),
        }
    }
}
