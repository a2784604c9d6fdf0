//! End-to-end cycle tests over scripted collaborators.
//!
//! Every scenario runs against the in-memory stores; the ones that touch
//! persistence also run against a migrated SQLite database.

mod common;

use common::{build, math_practice_judgment, reflection, report, seed_successes, Stores};
use emergence::adapters::judgment::MockJudgment;
use emergence::adapters::random::FixedRandomSource;
use emergence::adapters::StaticReflector;
use emergence::domain::errors::DomainError;
use emergence::domain::models::{
    CalibrationOutcome, Candidate, CrystallizationOutcome, CrystallizationRun,
    CrystallizationSummary, CyclePhase, Heuristic, PracticeDomain, PracticeSummary, Provenance,
    RejectionReason, VerificationTier,
};
use emergence::domain::ports::{AuditRepository, JudgmentTask, TrajectoryRepository};

const MATH_CANDIDATE: &str = "faster multi-step arithmetic with fractions";

#[tokio::test]
async fn test_weighted_selection_picks_interval_containing_draw() {
    common::setup_test_logging();
    let (stores, audit) = Stores::in_memory();
    let judgment = MockJudgment::new().respond(JudgmentTask::SpecificityCheck, "0.7");
    let harness = build(stores, judgment, FixedRandomSource::external(0.42), vec![]);

    let candidates = vec![
        reflection("faster multi-step arithmetic", 0.35),
        reflection("better memory", 0.30),
        reflection("more accurate unit conversion", 0.25),
        reflection("fewer mistakes in sql query parsing", 0.10),
    ];
    let result = harness.orchestrator.run_cycle(candidates).await.unwrap();

    assert_eq!(result.accepted, 4);
    assert_eq!(result.selected.as_deref(), Some("better memory"));

    let selections = audit.selections().await;
    assert_eq!(selections.len(), 1);
    let record = &selections[0];
    assert!((record.threshold - 0.42).abs() < f64::EPSILON);
    assert!((record.entropy - 0.94).abs() < 0.01, "entropy {}", record.entropy);
    assert_eq!(result.selection_entropy, Some(record.entropy));

    let probabilities = record.probabilities();
    assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    let mut ranked = probabilities.clone();
    ranked.sort_by(|a, b| b.total_cmp(a));
    assert!((record.runner_up_probability - ranked[1]).abs() < 1e-12);
    assert_eq!(record.counterfactuals.len(), 3);

    // "better memory" names no practicable domain.
    assert_eq!(result.domain, Some(PracticeDomain::Ambiguous));
    assert!(matches!(result.practice, PracticeSummary::Blocked { .. }));
    assert_eq!(harness.judgment.calls_for(JudgmentTask::ProblemGeneration), 0);
    let calibrations = audit.calibrations().await;
    assert_eq!(calibrations.len(), 1);
    assert_eq!(calibrations[0].outcome, CalibrationOutcome::Blocked);
}

#[tokio::test]
async fn test_external_request_rejected_on_provenance() {
    let (stores, audit) = Stores::in_memory();
    let harness = build(stores, MockJudgment::new(), FixedRandomSource::external(0.5), vec![]);

    let external = Candidate::new(MATH_CANDIDATE, 0.9, Provenance::external("please get faster at sums"));
    let mixed = Candidate::new(
        MATH_CANDIDATE,
        0.9,
        Provenance::reflection(vec![]).with_external_request("user suggested it"),
    );
    let result = harness.orchestrator.run_cycle(vec![external, mixed]).await.unwrap();

    assert_eq!(result.accepted, 0);
    assert_eq!(result.rejected, 2);
    assert_eq!(result.phases, vec![CyclePhase::Verifying, CyclePhase::Idle]);
    assert!(result.selected.is_none());

    let verdicts = audit.verdicts().await;
    assert!(verdicts[0].provenance_score.abs() < f64::EPSILON);
    assert!((verdicts[1].provenance_score - 0.2).abs() < f64::EPSILON);
    for verdict in &verdicts {
        assert!(!verdict.passed);
        assert!(verdict.combined_score < verdict.threshold);
        assert!(matches!(verdict.rejection_reason, Some(RejectionReason::WeakProvenance { .. })));
    }
    assert!(audit.selections().await.is_empty());
}

async fn crystallization_fires_on_twentieth_success(stores: Stores) {
    let judgment = math_practice_judgment().respond(
        JudgmentTask::HeuristicExtraction,
        "Convert every fraction to a common denominator before adding them.",
    );
    let harness = build(stores, judgment, FixedRandomSource::external(0.5), vec![report(3, 3)]);

    // Bootstrapped domain: one accepted run at zero successes.
    let seeded = Heuristic::new(
        PracticeDomain::Math,
        "Check boundary cases such as empty input before looping.",
        10,
        VerificationTier::Oracle,
    );
    let run = CrystallizationRun::new(
        PracticeDomain::Math,
        0,
        CrystallizationOutcome::Accepted {
            heuristic_id: seeded.id,
            content: seeded.content.clone(),
        },
    );
    harness
        .strategies
        .commit_crystallization(Some(&seeded), &run)
        .await
        .unwrap();
    seed_successes(&harness.trajectories, PracticeDomain::Math, 18).await;

    let nineteenth = harness
        .orchestrator
        .run_cycle(vec![reflection(MATH_CANDIDATE, 1.0)])
        .await
        .unwrap();
    assert!(matches!(nineteenth.practice, PracticeSummary::Succeeded { .. }));
    assert_eq!(
        nineteenth.crystallization,
        CrystallizationSummary::NotTriggered {
            successes_since_last_run: 19,
            threshold: 20
        }
    );
    assert_eq!(harness.judgment.calls_for(JudgmentTask::HeuristicExtraction), 0);

    let twentieth = harness
        .orchestrator
        .run_cycle(vec![reflection(MATH_CANDIDATE, 1.0)])
        .await
        .unwrap();
    assert!(matches!(
        twentieth.crystallization,
        CrystallizationSummary::Accepted { ref content, .. } if content.starts_with("Convert every fraction")
    ));
    assert_eq!(harness.judgment.calls_for(JudgmentTask::HeuristicExtraction), 1);

    let heuristics = harness.strategies.heuristics_for_domain(PracticeDomain::Math).await.unwrap();
    assert_eq!(heuristics.len(), 2);
    let runs = harness.strategies.crystallization_runs(PracticeDomain::Math).await.unwrap();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs.iter().map(|r| r.success_count_at_run).max(), Some(20));
}

#[tokio::test]
async fn test_crystallization_threshold_in_memory() {
    let (stores, _) = Stores::in_memory();
    crystallization_fires_on_twentieth_success(stores).await;
}

#[tokio::test]
async fn test_crystallization_threshold_sqlite() {
    crystallization_fires_on_twentieth_success(Stores::sqlite().await).await;
}

async fn oracle_retries_before_practice(stores: Stores) {
    let judgment = MockJudgment::new()
        .respond(JudgmentTask::ProblemGeneration, "Implement add_fractions(a, b).")
        .respond_many(
            JudgmentTask::OracleGeneration,
            [
                "print('looks fine to me')",
                "```python\nprint('ORACLE PASS sum'\nprint('ORACLE FAIL sum')\n```",
                common::ORACLE,
            ],
        )
        .respond(JudgmentTask::SolutionAttempt, common::SOLUTION);
    let harness = build(stores, judgment, FixedRandomSource::external(0.5), vec![report(1, 1)]);

    let result = harness
        .orchestrator
        .run_cycle(vec![reflection(MATH_CANDIDATE, 1.0)])
        .await
        .unwrap();

    assert!(matches!(
        result.practice,
        PracticeSummary::Succeeded {
            verification: VerificationTier::Oracle,
            ..
        }
    ));
    assert_eq!(harness.judgment.calls_for(JudgmentTask::ProblemGeneration), 1);
    assert_eq!(harness.judgment.calls_for(JudgmentTask::OracleGeneration), 3);
    assert_eq!(harness.executor.executions(), 1);

    let history = harness.trajectories.history(PracticeDomain::Math).await.unwrap();
    assert_eq!(history.len(), 1);
    assert!(history.iter().all(|t| t.success));
    assert_eq!(result.trajectory_id, Some(history[0].id));
}

#[tokio::test]
async fn test_oracle_generation_retries_in_memory() {
    let (stores, _) = Stores::in_memory();
    oracle_retries_before_practice(stores).await;
}

#[tokio::test]
async fn test_oracle_generation_retries_sqlite() {
    oracle_retries_before_practice(Stores::sqlite().await).await;
}

#[tokio::test]
async fn test_generation_exhausted_records_no_trajectory() {
    let (stores, audit) = Stores::in_memory();
    let judgment = MockJudgment::new()
        .respond(JudgmentTask::ProblemGeneration, "Implement add_fractions(a, b).")
        .respond(JudgmentTask::OracleGeneration, "no test script today");
    let harness = build(stores, judgment, FixedRandomSource::external(0.5), vec![]);

    let result = harness
        .orchestrator
        .run_cycle(vec![reflection(MATH_CANDIDATE, 1.0)])
        .await
        .unwrap();

    assert_eq!(result.practice, PracticeSummary::GenerationFailed { attempts: 3 });
    assert!(harness.trajectories.history(PracticeDomain::Math).await.unwrap().is_empty());
    assert_eq!(harness.judgment.calls_for(JudgmentTask::SolutionAttempt), 0);
    assert_eq!(harness.executor.executions(), 0);

    let calibrations = audit.calibrations().await;
    assert_eq!(calibrations[0].outcome, CalibrationOutcome::GenerationFailed);
    assert!(calibrations[0].suspected_misclassification);
}

#[tokio::test]
async fn test_failed_first_attempt_retries_with_feedback() {
    let (stores, _) = Stores::in_memory();
    let harness = build(
        stores,
        math_practice_judgment(),
        FixedRandomSource::external(0.5),
        vec![report(0, 2), report(2, 2)],
    );

    let result = harness
        .orchestrator
        .run_cycle(vec![reflection(MATH_CANDIDATE, 1.0)])
        .await
        .unwrap();

    assert!(matches!(result.practice, PracticeSummary::Succeeded { .. }));
    assert_eq!(harness.judgment.calls_for(JudgmentTask::SolutionAttempt), 2);
    let calls = harness.judgment.calls();
    let retry = calls
        .iter()
        .rev()
        .find(|c| c.task == JudgmentTask::SolutionAttempt)
        .unwrap();
    assert!(retry.input.contains("0 of 2 passed"));
}

#[tokio::test]
async fn test_logic_practice_uses_consistency_tier() {
    let (stores, audit) = Stores::in_memory();
    let judgment = MockJudgment::new()
        .respond(
            JudgmentTask::ProblemGeneration,
            "Alice says Bob is a knave. Bob says they are both knights. Who is the knight?",
        )
        .respond(JudgmentTask::LogicDerivation, "Bob's claim fails.\nANSWER: Alice is the knight");
    let harness = build(stores, judgment, FixedRandomSource::external(0.5), vec![]);

    let result = harness
        .orchestrator
        .run_cycle(vec![reflection("more consistent multi-step reasoning in logic puzzles", 1.0)])
        .await
        .unwrap();

    assert_eq!(result.domain, Some(PracticeDomain::Logic));
    assert!(matches!(
        result.practice,
        PracticeSummary::Succeeded {
            verification: VerificationTier::Consistency,
            ..
        }
    ));
    assert_eq!(harness.judgment.calls_for(JudgmentTask::LogicDerivation), 5);
    assert_eq!(harness.executor.executions(), 0);
    assert_eq!(audit.calibrations().await[0].outcome, CalibrationOutcome::PracticeSucceeded);
}

#[tokio::test]
async fn test_judgment_outage_aborts_and_records_cycle() {
    let (stores, audit) = Stores::in_memory();
    let judgment = MockJudgment::new().fail(JudgmentTask::SpecificityCheck, "connection refused");
    let harness = build(stores, judgment, FixedRandomSource::external(0.5), vec![]);

    let err = harness
        .orchestrator
        .run_cycle(vec![reflection("better memory", 1.0)])
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::JudgmentUnavailable(_)));

    let cycles = audit.cycles().await;
    assert_eq!(cycles.len(), 1);
    assert!(cycles[0].error.as_deref().unwrap().contains("connection refused"));
    assert_eq!(cycles[0].phases.last(), Some(&CyclePhase::Idle));
}

#[tokio::test]
async fn test_reflection_cycle_reads_reflector() {
    let (stores, audit) = Stores::in_memory();
    let harness = build(
        stores,
        math_practice_judgment(),
        FixedRandomSource::external(0.5),
        vec![report(1, 1)],
    );
    let reflector = StaticReflector::new(vec![reflection(MATH_CANDIDATE, 0.6)]);

    let result = harness.orchestrator.run_reflection_cycle(&reflector).await.unwrap();

    assert_eq!(result.candidates_seen, 1);
    assert_eq!(result.selected.as_deref(), Some(MATH_CANDIDATE));
    // A lone admitted candidate wins without a draw.
    assert!(result.selection_entropy.is_none());
    assert!(audit.selections().await.is_empty());
    assert_eq!(
        result.phases,
        vec![
            CyclePhase::Verifying,
            CyclePhase::Selecting,
            CyclePhase::Routing,
            CyclePhase::Practicing,
            CyclePhase::Recording,
            CyclePhase::Crystallizing,
            CyclePhase::Idle,
        ]
    );
}

#[tokio::test]
async fn test_sqlite_cycle_history_is_queryable() {
    let stores = Stores::sqlite().await;
    let harness = build(
        stores,
        math_practice_judgment(),
        FixedRandomSource::external(0.5),
        vec![report(1, 1)],
    );

    let first = harness
        .orchestrator
        .run_cycle(vec![reflection(MATH_CANDIDATE, 1.0)])
        .await
        .unwrap();
    let second = harness
        .orchestrator
        .run_cycle(vec![Candidate::new(MATH_CANDIDATE, 1.0, Provenance::bootstrap())])
        .await
        .unwrap();

    let cycles = harness.audit.recent_cycles(10).await.unwrap();
    assert_eq!(cycles.iter().map(|c| c.cycle_id).collect::<Vec<_>>(), vec![second.cycle_id, first.cycle_id]);
    assert_eq!(cycles[1].domain, Some(PracticeDomain::Math));
    assert_eq!(cycles[0].accepted, 0);
}
