//! Emergence gate: admit or reject candidates on provenance and
//! specificity.

use chrono::Utc;
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{ArchitecturalConstants, Candidate, EmergenceVerdict, RejectionReason};
use crate::services::scorer::CandidateScorer;

/// A labeled example for threshold calibration: the candidate's combined
/// score and whether a reviewer judged it genuinely self-generated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabeledScore {
    pub combined_score: f64,
    pub should_pass: bool,
}

/// Combines the scorer's two sub-scores into one admission decision.
///
/// The weights come from the architectural constants. The threshold is
/// configuration; [`calibrate_threshold`] suggests a value from labeled
/// data but never applies it.
pub struct EmergenceGate {
    scorer: CandidateScorer,
    constants: ArchitecturalConstants,
    threshold: f64,
}

impl EmergenceGate {
    pub fn new(scorer: CandidateScorer, constants: ArchitecturalConstants, threshold: f64) -> DomainResult<Self> {
        validate_threshold(threshold)?;
        Ok(Self {
            scorer,
            constants,
            threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Evaluate one candidate.
    ///
    /// A structurally invalid candidate yields a rejecting verdict, not an
    /// error. Errors are reserved for judgment infrastructure failures.
    pub async fn evaluate(&self, candidate: &Candidate) -> DomainResult<EmergenceVerdict> {
        if let Err(e) = candidate.validate() {
            let message = match e {
                DomainError::ValidationFailed(m) => m,
                other => other.to_string(),
            };
            tracing::info!(candidate = %candidate.id, reason = %message, "Candidate rejected as invalid");
            return Ok(EmergenceVerdict::invalid(candidate.id, self.threshold, message));
        }

        let provenance = self.scorer.provenance_score(&candidate.provenance);
        let specificity = self.scorer.specificity(candidate).await?;
        let combined = self.constants.combined_score(provenance, specificity.score);
        let passed = combined >= self.threshold;

        let rejection_reason = (!passed).then(|| {
            if provenance <= specificity.score {
                RejectionReason::WeakProvenance { score: provenance }
            } else {
                RejectionReason::WeakSpecificity {
                    score: specificity.score,
                }
            }
        });

        let verdict = EmergenceVerdict {
            candidate_id: candidate.id,
            provenance_score: provenance,
            specificity_score: specificity.score,
            combined_score: combined,
            threshold: self.threshold,
            passed,
            rejection_reason,
            specificity_path: Some(specificity.path),
            evaluated_at: Utc::now(),
        };

        match &verdict.rejection_reason {
            None => tracing::info!(candidate = %candidate.id, combined, "Candidate admitted"),
            Some(reason) => tracing::info!(candidate = %candidate.id, combined, %reason, "Candidate rejected"),
        }
        Ok(verdict)
    }

    /// Evaluate a batch, one verdict per candidate in input order.
    pub async fn evaluate_all(&self, candidates: &[Candidate]) -> DomainResult<Vec<EmergenceVerdict>> {
        let mut verdicts = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            verdicts.push(self.evaluate(candidate).await?);
        }
        Ok(verdicts)
    }
}

fn validate_threshold(threshold: f64) -> DomainResult<()> {
    if threshold.is_finite() && (0.0..=1.0).contains(&threshold) {
        Ok(())
    } else {
        Err(DomainError::ValidationFailed(format!(
            "gate threshold must be within [0, 1], got {threshold}"
        )))
    }
}

/// Choose the threshold that best separates held-out labeled scores.
///
/// Candidate thresholds are the labeled scores themselves; the one with
/// the highest accuracy wins, ties going to the higher (stricter) value.
/// Needs at least one positive and one negative example.
pub fn calibrate_threshold(labeled: &[LabeledScore]) -> DomainResult<f64> {
    let positives = labeled.iter().filter(|l| l.should_pass).count();
    if positives == 0 || positives == labeled.len() {
        return Err(DomainError::ValidationFailed(
            "calibration needs both passing and failing examples".to_string(),
        ));
    }

    let mut best = (0, f64::MIN);
    for candidate in labeled.iter().map(|l| l.combined_score.clamp(0.0, 1.0)) {
        let correct = correct_at(labeled, candidate);
        if correct > best.0 || (correct == best.0 && candidate > best.1) {
            best = (correct, candidate);
        }
    }
    Ok(best.1)
}

/// Fraction of labeled examples the threshold decides correctly.
pub fn threshold_accuracy(labeled: &[LabeledScore], threshold: f64) -> f64 {
    if labeled.is_empty() {
        return 0.0;
    }
    correct_at(labeled, threshold) as f64 / labeled.len() as f64
}

fn correct_at(labeled: &[LabeledScore], threshold: f64) -> usize {
    labeled
        .iter()
        .filter(|l| (l.combined_score >= threshold) == l.should_pass)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Provenance;

    fn gate(threshold: f64) -> EmergenceGate {
        let constants = ArchitecturalConstants::canonical();
        EmergenceGate::new(CandidateScorer::new(constants), constants, threshold).unwrap()
    }

    #[tokio::test]
    async fn test_external_request_rejected_on_provenance() {
        let candidate = Candidate::new(
            "faster multi-step arithmetic",
            0.5,
            Provenance::external("the operator wants this"),
        );
        let verdict = gate(0.6).evaluate(&candidate).await.unwrap();
        assert!(verdict.provenance_score.abs() < f64::EPSILON);
        assert!(verdict.combined_score < 0.6);
        assert!(!verdict.passed);
        assert!(matches!(verdict.rejection_reason, Some(RejectionReason::WeakProvenance { .. })));
    }

    #[tokio::test]
    async fn test_concrete_reflection_passes() {
        let candidate = Candidate::new("faster multi-step arithmetic", 0.5, Provenance::reflection(vec!["r1".into()]));
        let verdict = gate(0.65).evaluate(&candidate).await.unwrap();
        assert!(verdict.passed);
        assert!(verdict.rejection_reason.is_none());
    }

    #[tokio::test]
    async fn test_generic_reflection_rejected_on_specificity() {
        let candidate = Candidate::new("I want to be better", 0.5, Provenance::reflection(vec![]));
        let verdict = gate(0.65).evaluate(&candidate).await.unwrap();
        assert!(!verdict.passed);
        assert!(matches!(verdict.rejection_reason, Some(RejectionReason::WeakSpecificity { .. })));
    }

    #[tokio::test]
    async fn test_invalid_candidate_gets_verdict() {
        let candidate = Candidate::new("x", -1.0, Provenance::reflection(vec![]));
        let verdict = gate(0.65).evaluate(&candidate).await.unwrap();
        assert!(!verdict.passed);
        assert!(matches!(verdict.rejection_reason, Some(RejectionReason::InvalidCandidate { .. })));
    }

    #[test]
    fn test_threshold_bounds() {
        let constants = ArchitecturalConstants::canonical();
        assert!(EmergenceGate::new(CandidateScorer::new(constants), constants, 1.5).is_err());
    }

    #[test]
    fn test_calibration_separates_labels() {
        let labeled = [
            LabeledScore { combined_score: 0.9, should_pass: true },
            LabeledScore { combined_score: 0.7, should_pass: true },
            LabeledScore { combined_score: 0.55, should_pass: false },
            LabeledScore { combined_score: 0.1, should_pass: false },
        ];
        let threshold = calibrate_threshold(&labeled).unwrap();
        assert!((threshold - 0.7).abs() < f64::EPSILON);
        assert!((threshold_accuracy(&labeled, threshold) - 1.0).abs() < f64::EPSILON);
        assert!((threshold_accuracy(&labeled, 0.95) - 0.5).abs() < f64::EPSILON);
        assert!(calibrate_threshold(&labeled[..2]).is_err());
    }
}
