//! Cycle orchestrator: sequences one improvement cycle.
//!
//! `Idle → Verifying → Selecting → Routing → Practicing → Recording →
//! Crystallizing → Idle`, ending early (back to `Idle`) when nothing
//! passes the gate, the domain is blocked, or generation fails. Each
//! phase's writes are self-contained. Infrastructure failures abort the
//! cycle and are returned to the caller; any other failure becomes the
//! cycle's error note.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CalibrationOutcome, CalibrationSignal, Candidate, CrystallizationOutcome, CrystallizationSummary,
    CyclePhase, CycleResult, DomainClassification, PracticeOutcome, PracticeSummary, Trajectory,
    NO_ORACLE_REASON,
};
use crate::domain::ports::{AuditRepository, ReflectionContext, Reflector, TrajectoryRepository};
use crate::services::crystallizer::{CrystallizationResult, Crystallizer};
use crate::services::difficulty::DifficultyTracker;
use crate::services::domain_classifier::DomainClassifier;
use crate::services::emergence_gate::EmergenceGate;
use crate::services::practice_runner::PracticeRunner;
use crate::services::selection_resolver::SelectionResolver;
use crate::services::strategy_document::StrategyDocumentService;

/// Everything the orchestrator sequences.
pub struct CycleComponents {
    pub gate: EmergenceGate,
    pub resolver: SelectionResolver,
    pub classifier: DomainClassifier,
    pub practice: PracticeRunner,
    pub difficulty: DifficultyTracker,
    pub crystallizer: Crystallizer,
    pub strategies: Arc<StrategyDocumentService>,
    pub trajectories: Arc<dyn TrajectoryRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

/// Runs improvement cycles.
pub struct CycleOrchestrator {
    gate: EmergenceGate,
    resolver: SelectionResolver,
    classifier: DomainClassifier,
    practice: PracticeRunner,
    difficulty: DifficultyTracker,
    crystallizer: Crystallizer,
    strategies: Arc<StrategyDocumentService>,
    trajectories: Arc<dyn TrajectoryRepository>,
    audit: Arc<dyn AuditRepository>,
}

impl CycleOrchestrator {
    pub fn new(components: CycleComponents) -> Self {
        Self {
            gate: components.gate,
            resolver: components.resolver,
            classifier: components.classifier,
            practice: components.practice,
            difficulty: components.difficulty,
            crystallizer: components.crystallizer,
            strategies: components.strategies,
            trajectories: components.trajectories,
            audit: components.audit,
        }
    }

    pub fn strategies(&self) -> &Arc<StrategyDocumentService> {
        &self.strategies
    }

    pub fn gate(&self) -> &EmergenceGate {
        &self.gate
    }

    /// Ask the reflector for candidates, feeding it the current strategies,
    /// then run a cycle over them.
    pub async fn run_reflection_cycle(&self, reflector: &dyn Reflector) -> DomainResult<CycleResult> {
        let context = ReflectionContext {
            strategies: self.strategies.render_strategies().await?,
        };
        let candidates = reflector.reflect(&context).await?;
        self.run_cycle(candidates).await
    }

    /// Run one cycle over externally supplied candidates.
    pub async fn run_cycle(&self, candidates: Vec<Candidate>) -> DomainResult<CycleResult> {
        let cycle_id = Uuid::new_v4();
        let mut result = CycleResult::new(cycle_id, candidates.len());
        tracing::info!(cycle = %cycle_id, candidates = candidates.len(), "Cycle started");

        let outcome = self.execute(&mut result, candidates).await;
        if let Err(e) = outcome {
            result.error = Some(e.to_string());
            if e.is_infrastructure() {
                tracing::error!(cycle = %cycle_id, error = %e, "Cycle aborted by infrastructure failure");
                finish(&mut result);
                if let Err(record_err) = self.audit.record_cycle(&result).await {
                    tracing::warn!(cycle = %cycle_id, error = %record_err, "Failed to record aborted cycle");
                }
                return Err(e);
            }
            tracing::warn!(cycle = %cycle_id, error = %e, "Cycle ended with error");
        }

        finish(&mut result);
        self.audit.record_cycle(&result).await?;
        tracing::info!(
            cycle = %cycle_id,
            accepted = result.accepted,
            rejected = result.rejected,
            domain = result.domain.map(|d| d.as_str()),
            "Cycle finished"
        );
        Ok(result)
    }

    async fn execute(&self, result: &mut CycleResult, candidates: Vec<Candidate>) -> DomainResult<()> {
        // Verifying
        advance(result, CyclePhase::Verifying)?;
        let verdicts = self.gate.evaluate_all(&candidates).await?;
        let judged: Vec<(Candidate, _)> = candidates.into_iter().zip(verdicts).collect();
        self.audit.record_verdicts(result.cycle_id, &judged).await?;

        let accepted: Vec<Candidate> = judged
            .into_iter()
            .filter(|(_, verdict)| verdict.passed)
            .map(|(candidate, _)| candidate)
            .collect();
        result.accepted = accepted.len();
        result.rejected = result.candidates_seen - accepted.len();
        if accepted.is_empty() {
            return Ok(());
        }

        // Selecting
        advance(result, CyclePhase::Selecting)?;
        let resolution = self.resolver.resolve(accepted).await?;
        if let Some(record) = &resolution.record {
            self.audit.record_selection(result.cycle_id, record).await?;
            result.selection_entropy = Some(record.entropy);
        }
        let winner = resolution.winner;
        result.selected = Some(winner.description.clone());

        // Routing
        advance(result, CyclePhase::Routing)?;
        let classification = self
            .classifier
            .classify(&winner.description, winner.domain_hint.as_deref());
        self.audit
            .record_classification(result.cycle_id, winner.id, &classification)
            .await?;
        let domain = classification.primary_domain;
        result.domain = Some(domain);
        if !classification.permits_practice() {
            result.practice = PracticeSummary::Blocked {
                reason: NO_ORACLE_REASON.to_string(),
            };
            self.calibrate(result.cycle_id, &winner, &classification, CalibrationOutcome::Blocked, false)
                .await?;
            return Ok(());
        }

        // Practicing
        advance(result, CyclePhase::Practicing)?;
        if !self.difficulty.is_loaded(domain).await {
            let history = self.trajectories.history(domain).await?;
            self.difficulty.rehydrate(domain, &history).await;
        }
        let level = self.difficulty.level(domain).await;
        let completed = match self.practice.run(&winner.description, domain, level).await? {
            PracticeOutcome::Completed(done) => done,
            PracticeOutcome::Blocked { reason, .. } => {
                result.practice = PracticeSummary::Blocked { reason };
                self.calibrate(result.cycle_id, &winner, &classification, CalibrationOutcome::Blocked, false)
                    .await?;
                return Ok(());
            }
            PracticeOutcome::GenerationFailed { attempts, last_error, .. } => {
                tracing::warn!(domain = %domain, attempts, last_error = %last_error, "Problem generation failed");
                result.practice = PracticeSummary::GenerationFailed { attempts };
                self.calibrate(
                    result.cycle_id,
                    &winner,
                    &classification,
                    CalibrationOutcome::GenerationFailed,
                    true,
                )
                .await?;
                return Ok(());
            }
        };

        // Recording
        advance(result, CyclePhase::Recording)?;
        let trajectory = Trajectory::from_practice(winner.id, &completed);
        self.trajectories.append(&trajectory).await?;
        self.difficulty.record(domain, trajectory.success).await;
        result.trajectory_id = Some(trajectory.id);
        result.practice = if trajectory.success {
            PracticeSummary::Succeeded {
                partial_score: trajectory.partial_score,
                verification: trajectory.verification,
            }
        } else {
            PracticeSummary::Failed {
                partial_score: trajectory.partial_score,
                verification: trajectory.verification,
            }
        };
        let (outcome, suspected) = if trajectory.success {
            (CalibrationOutcome::PracticeSucceeded, false)
        } else {
            (CalibrationOutcome::PracticeFailed, trajectory.partial_score <= 0.0)
        };
        self.calibrate(result.cycle_id, &winner, &classification, outcome, suspected)
            .await?;

        // Crystallizing
        advance(result, CyclePhase::Crystallizing)?;
        result.crystallization = match self.crystallizer.crystallize(domain).await? {
            CrystallizationResult::NotTriggered(check) => CrystallizationSummary::NotTriggered {
                successes_since_last_run: check.successes_since_last_run,
                threshold: check.threshold,
            },
            CrystallizationResult::Ran { run, pruned, .. } => match run.outcome {
                CrystallizationOutcome::Accepted { content, .. } => CrystallizationSummary::Accepted {
                    content,
                    pruned: pruned.len(),
                },
                CrystallizationOutcome::RejectedVague { content } => CrystallizationSummary::Rejected {
                    reason: format!("not actionable: {content}"),
                },
                CrystallizationOutcome::RejectedDuplicate { duplicate_of, similarity, .. } => {
                    CrystallizationSummary::Rejected {
                        reason: format!("duplicate of {duplicate_of} (similarity {similarity:.2})"),
                    }
                }
            },
        };
        Ok(())
    }

    async fn calibrate(
        &self,
        cycle_id: Uuid,
        winner: &Candidate,
        classification: &DomainClassification,
        outcome: CalibrationOutcome,
        suspected_misclassification: bool,
    ) -> DomainResult<()> {
        let signal = CalibrationSignal {
            id: Uuid::new_v4(),
            cycle_id,
            description: winner.description.clone(),
            predicted_domain: classification.primary_domain,
            confidence: classification.primary_confidence,
            outcome,
            suspected_misclassification,
            recorded_at: Utc::now(),
        };
        if suspected_misclassification {
            tracing::warn!(
                target: "emergence::calibration",
                domain = %signal.predicted_domain,
                outcome = outcome.as_str(),
                "Possible misclassification logged for recalibration"
            );
        }
        self.audit.record_calibration(&signal).await
    }
}

fn advance(result: &mut CycleResult, to: CyclePhase) -> DomainResult<()> {
    let from = result.phases.last().copied().unwrap_or(CyclePhase::Idle);
    if !from.can_transition_to(to) {
        return Err(DomainError::InvalidPhaseTransition {
            from: from.to_string(),
            to: to.to_string(),
        });
    }
    tracing::debug!(cycle = %result.cycle_id, phase = to.as_str(), "Entering phase");
    result.phases.push(to);
    Ok(())
}

fn finish(result: &mut CycleResult) {
    if result.phases.last().copied() != Some(CyclePhase::Idle) {
        result.phases.push(CyclePhase::Idle);
    }
    result.finished_at = Some(Utc::now());
}
