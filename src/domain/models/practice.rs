//! Practice problems, oracles and outcomes.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::classification::PracticeDomain;
use crate::domain::errors::DomainError;

/// Strength of the evidence behind a practice result.
///
/// The two tiers are never merged: low divergence across re-derivations
/// does not imply correctness the way an executable oracle does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationTier {
    /// Validated by repeated re-derivation agreeing with itself.
    Consistency,
    /// Validated by an executable oracle generated before the solution.
    Oracle,
}

impl VerificationTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Consistency => "consistency",
            Self::Oracle => "oracle",
        }
    }
}

impl FromStr for VerificationTier {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "consistency" => Ok(Self::Consistency),
            "oracle" => Ok(Self::Oracle),
            other => Err(DomainError::SerializationError(format!(
                "unknown verification tier: {other}"
            ))),
        }
    }
}

/// Verification artifact attached to a practice problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Oracle {
    /// Executable test code; prints `ORACLE PASS` / `ORACLE FAIL` lines.
    TestSuite { code: String },
    /// Re-derive the answer `runs` times and require mean pairwise
    /// divergence at or below `divergence_threshold`.
    Consistency { runs: u32, divergence_threshold: f64 },
}

impl Oracle {
    pub fn tier(&self) -> VerificationTier {
        match self {
            Self::TestSuite { .. } => VerificationTier::Oracle,
            Self::Consistency { .. } => VerificationTier::Consistency,
        }
    }
}

/// A generated problem together with its oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeProblem {
    pub id: Uuid,
    pub domain: PracticeDomain,
    pub difficulty: u8,
    pub specification: String,
    pub oracle: Oracle,
}

/// Result of running one solution against a test-suite oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleReport {
    pub passed: u32,
    pub total: u32,
    pub timed_out: bool,
    pub detail: String,
}

impl OracleReport {
    pub fn timed_out(limit_secs: u64) -> Self {
        Self {
            passed: 0,
            total: 0,
            timed_out: true,
            detail: format!("solution exceeded the {limit_secs}s execution bound"),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            passed: 0,
            total: 0,
            timed_out: false,
            detail: detail.into(),
        }
    }

    /// Fraction of checks that passed; zero when no check ran.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.passed) / f64::from(self.total)
        }
    }

    pub fn all_passed(&self) -> bool {
        !self.timed_out && self.total > 0 && self.passed == self.total
    }
}

/// A practice run that reached the solution stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedPractice {
    pub problem: PracticeProblem,
    pub solution: String,
    pub success: bool,
    /// Fraction of oracle checks passed (or `1 - divergence` for logic).
    pub partial_score: f64,
    pub verification: VerificationTier,
    pub solution_attempts: u32,
    /// Mean pairwise divergence for consistency-validated runs.
    pub divergence: Option<f64>,
}

/// What the practice runner produced for one accepted candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PracticeOutcome {
    Completed(CompletedPractice),
    /// No verification oracle exists for this domain.
    Blocked { domain: PracticeDomain, reason: String },
    /// Problem or oracle generation never produced a valid artifact.
    GenerationFailed {
        domain: PracticeDomain,
        attempts: u32,
        last_error: String,
    },
}

pub const NO_ORACLE_REASON: &str = "no verification oracle available";
