//! Practice trajectories: the append-only unit the crystallizer reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classification::PracticeDomain;
use super::practice::{CompletedPractice, PracticeProblem, VerificationTier};

/// One completed practice attempt and its outcome.
///
/// Trajectories are never updated or deleted. A correction is a new
/// trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub id: Uuid,
    /// The candidate whose practice produced this trajectory.
    pub candidate_ref: Uuid,
    pub domain: PracticeDomain,
    /// Difficulty level the problem was generated at.
    pub difficulty: u8,
    pub problem: PracticeProblem,
    pub solution: String,
    pub success: bool,
    pub partial_score: f64,
    pub verification: VerificationTier,
    pub created_at: DateTime<Utc>,
}

impl Trajectory {
    pub fn from_practice(candidate_ref: Uuid, practice: &CompletedPractice) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_ref,
            domain: practice.problem.domain,
            difficulty: practice.problem.difficulty,
            problem: practice.problem.clone(),
            solution: practice.solution.clone(),
            success: practice.success,
            partial_score: practice.partial_score.clamp(0.0, 1.0),
            verification: practice.verification,
            created_at: Utc::now(),
        }
    }

    /// Short digest used when presenting trajectories to the extractor.
    pub fn summary(&self, max_chars: usize) -> String {
        let spec: String = self.problem.specification.chars().take(max_chars).collect();
        let solution: String = self.solution.chars().take(max_chars).collect();
        format!(
            "[difficulty {} | {}] problem: {} | solution: {}",
            self.difficulty,
            self.verification.as_str(),
            spec.trim(),
            solution.trim()
        )
    }
}
