//! Improvement cycle state machine and per-cycle results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::classification::PracticeDomain;
use super::practice::VerificationTier;

/// Phases of one improvement cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    Idle,
    Verifying,
    Selecting,
    Routing,
    Practicing,
    Recording,
    Crystallizing,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Verifying => "verifying",
            Self::Selecting => "selecting",
            Self::Routing => "routing",
            Self::Practicing => "practicing",
            Self::Recording => "recording",
            Self::Crystallizing => "crystallizing",
        }
    }

    /// The phase that follows this one on the happy path.
    pub fn next(&self) -> Self {
        match self {
            Self::Idle => Self::Verifying,
            Self::Verifying => Self::Selecting,
            Self::Selecting => Self::Routing,
            Self::Routing => Self::Practicing,
            Self::Practicing => Self::Recording,
            Self::Recording => Self::Crystallizing,
            Self::Crystallizing => Self::Idle,
        }
    }

    /// Valid transitions: forward by one phase, or back to `Idle` from any
    /// active phase (early end or error).
    pub fn can_transition_to(&self, to: Self) -> bool {
        if *self == Self::Idle {
            return to == Self::Verifying;
        }
        to == Self::Idle || self.next() == to
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Practice phase outcome as reported to dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PracticeSummary {
    NotRun,
    Blocked { reason: String },
    GenerationFailed { attempts: u32 },
    Succeeded { partial_score: f64, verification: VerificationTier },
    Failed { partial_score: f64, verification: VerificationTier },
}

/// Crystallization phase outcome as reported to dashboards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrystallizationSummary {
    NotRun,
    NotTriggered { successes_since_last_run: u64, threshold: u64 },
    Accepted { content: String, pruned: usize },
    Rejected { reason: String },
}

/// Per-cycle result record, suitable for dashboards and metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleResult {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub candidates_seen: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub selected: Option<String>,
    pub selection_entropy: Option<f64>,
    pub domain: Option<PracticeDomain>,
    pub trajectory_id: Option<Uuid>,
    pub practice: PracticeSummary,
    pub crystallization: CrystallizationSummary,
    pub error: Option<String>,
    /// Every phase entered, in order.
    pub phases: Vec<CyclePhase>,
}

impl CycleResult {
    pub fn new(cycle_id: Uuid, candidates_seen: usize) -> Self {
        Self {
            cycle_id,
            started_at: Utc::now(),
            finished_at: None,
            candidates_seen,
            accepted: 0,
            rejected: 0,
            selected: None,
            selection_entropy: None,
            domain: None,
            trajectory_id: None,
            practice: PracticeSummary::NotRun,
            crystallization: CrystallizationSummary::NotRun,
            error: None,
            phases: vec![CyclePhase::Idle],
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
