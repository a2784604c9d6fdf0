//! Crystallized heuristics and crystallization runs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::PracticeDomain;
use super::practice::VerificationTier;

/// A durable, actionable sentence extracted from repeated successes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Heuristic {
    pub id: Uuid,
    pub domain: PracticeDomain,
    pub content: String,
    pub supporting_trajectory_count: u32,
    pub usage_count: u32,
    /// Weakest verification tier among the supporting trajectories.
    pub verification: VerificationTier,
    pub added_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl Heuristic {
    pub fn new(
        domain: PracticeDomain,
        content: impl Into<String>,
        supporting_trajectory_count: u32,
        verification: VerificationTier,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain,
            content: content.into(),
            supporting_trajectory_count,
            usage_count: 0,
            verification,
            added_at: Utc::now(),
            last_used_at: None,
        }
    }

    /// Age in fractional days at `now`.
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let seconds = (now - self.added_at).num_seconds().max(0);
        seconds as f64 / 86_400.0
    }

    /// Pruning value: uses per day of age. Ages under a day count as one.
    pub fn value(&self, now: DateTime<Utc>) -> f64 {
        f64::from(self.usage_count) / self.age_days(now).max(1.0)
    }
}

/// Result of one crystallization attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CrystallizationOutcome {
    Accepted { heuristic_id: Uuid, content: String },
    RejectedVague { content: String },
    RejectedDuplicate {
        content: String,
        duplicate_of: Uuid,
        similarity: f64,
    },
}

impl CrystallizationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }
}

/// Persistent marker of a crystallization attempt in a domain.
///
/// The steady-state trigger counts successes since the latest run, so a
/// rejected extraction does not re-fire on every following success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrystallizationRun {
    pub id: Uuid,
    pub domain: PracticeDomain,
    pub success_count_at_run: u64,
    pub outcome: CrystallizationOutcome,
    pub ran_at: DateTime<Utc>,
}

impl CrystallizationRun {
    pub fn new(domain: PracticeDomain, success_count_at_run: u64, outcome: CrystallizationOutcome) -> Self {
        Self {
            id: Uuid::new_v4(),
            domain,
            success_count_at_run,
            outcome,
            ran_at: Utc::now(),
        }
    }
}
