//! Common test utilities for integration tests
//!
//! Builds a fully wired cycle orchestrator over scripted judgment, fixed
//! random draws and scripted oracle reports, backed by either the
//! in-memory stores or a migrated in-memory SQLite database.

#![allow(dead_code)]

use std::sync::Arc;

use emergence::adapters::judgment::MockJudgment;
use emergence::adapters::memory::{InMemoryAuditLog, InMemoryStrategyStore, InMemoryTrajectoryLog};
use emergence::adapters::oracle::ScriptedOracleExecutor;
use emergence::adapters::random::FixedRandomSource;
use emergence::adapters::sqlite::{
    create_migrated_test_pool, SqliteAuditRepository, SqliteStrategyRepository,
    SqliteTrajectoryRepository,
};
use emergence::domain::models::{
    ArchitecturalConstants, Candidate, ClassifierConfig, CompletedPractice, CrystallizerConfig,
    Oracle, OracleReport, PracticeConfig, PracticeDomain, PracticeProblem, Provenance,
    StrategyConfig, Trajectory,
};
use emergence::domain::ports::{
    AuditRepository, JudgmentTask, StrategyRepository, TrajectoryRepository,
};
use emergence::services::{
    CandidateScorer, Crystallizer, CycleComponents, CycleOrchestrator, DifficultyPolicy,
    DifficultyTracker, DomainClassifier, EmergenceGate, PracticeRunner, SelectionResolver,
    StrategyDocumentService, TokenCounter,
};
use uuid::Uuid;

pub const GATE_THRESHOLD: f64 = 0.65;

pub const ORACLE: &str = "```python\nfrom solution import *\nif add_fractions('3/4', '1/8') == '7/8':\n    print('ORACLE PASS sum')\nelse:\n    print('ORACLE FAIL sum')\n```";

pub const SOLUTION: &str = "```python\nfrom fractions import Fraction\ndef add_fractions(a, b):\n    return str(Fraction(a) + Fraction(b))\n```";

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// Storage behind a harness.
pub struct Stores {
    pub trajectories: Arc<dyn TrajectoryRepository>,
    pub strategy_repo: Arc<dyn StrategyRepository>,
    pub audit: Arc<dyn AuditRepository>,
}

impl Stores {
    pub fn in_memory() -> (Self, Arc<InMemoryAuditLog>) {
        let audit = Arc::new(InMemoryAuditLog::new());
        let stores = Self {
            trajectories: Arc::new(InMemoryTrajectoryLog::new()),
            strategy_repo: Arc::new(InMemoryStrategyStore::new()),
            audit: audit.clone(),
        };
        (stores, audit)
    }

    pub async fn sqlite() -> Self {
        let pool = create_migrated_test_pool()
            .await
            .expect("Failed to create migrated test pool");
        Self {
            trajectories: Arc::new(SqliteTrajectoryRepository::new(pool.clone())),
            strategy_repo: Arc::new(SqliteStrategyRepository::new(pool.clone())),
            audit: Arc::new(SqliteAuditRepository::new(pool)),
        }
    }
}

/// A wired orchestrator plus handles to everything it talks to.
pub struct Harness {
    pub orchestrator: CycleOrchestrator,
    pub judgment: Arc<MockJudgment>,
    pub executor: Arc<ScriptedOracleExecutor>,
    pub trajectories: Arc<dyn TrajectoryRepository>,
    pub strategies: Arc<StrategyDocumentService>,
    pub audit: Arc<dyn AuditRepository>,
}

pub fn build(
    stores: Stores,
    judgment: MockJudgment,
    random: FixedRandomSource,
    reports: Vec<OracleReport>,
) -> Harness {
    let constants = ArchitecturalConstants::canonical();
    let judgment = Arc::new(judgment);
    let executor = Arc::new(ScriptedOracleExecutor::new(reports));
    let strategies = Arc::new(StrategyDocumentService::new(
        stores.strategy_repo,
        TokenCounter::new(),
        StrategyConfig::default(),
    ));
    let practice_config = PracticeConfig::default();

    let orchestrator = CycleOrchestrator::new(CycleComponents {
        gate: EmergenceGate::new(
            CandidateScorer::new(constants).with_judgment(judgment.clone()),
            constants,
            GATE_THRESHOLD,
        )
        .expect("valid threshold"),
        resolver: SelectionResolver::new(Arc::new(random)),
        classifier: DomainClassifier::new(&ClassifierConfig::default()).expect("valid classifier"),
        practice: PracticeRunner::new(judgment.clone(), executor.clone(), practice_config.clone()),
        difficulty: DifficultyTracker::new(DifficultyPolicy::from(&practice_config)),
        crystallizer: Crystallizer::new(
            judgment.clone(),
            stores.trajectories.clone(),
            strategies.clone(),
            CrystallizerConfig::default(),
        ),
        strategies: strategies.clone(),
        trajectories: stores.trajectories.clone(),
        audit: stores.audit.clone(),
    });

    Harness {
        orchestrator,
        judgment,
        executor,
        trajectories: stores.trajectories,
        strategies,
        audit: stores.audit,
    }
}

pub fn report(passed: u32, total: u32) -> OracleReport {
    OracleReport {
        passed,
        total,
        timed_out: false,
        detail: format!("{passed} of {total} checks passed"),
    }
}

/// Judgment scripted for one successful math practice run.
pub fn math_practice_judgment() -> MockJudgment {
    MockJudgment::new()
        .respond(
            JudgmentTask::ProblemGeneration,
            "Implement add_fractions(a, b) returning the reduced sum of two fraction strings.",
        )
        .respond(JudgmentTask::OracleGeneration, ORACLE)
        .respond(JudgmentTask::SolutionAttempt, SOLUTION)
}

pub fn reflection(description: &str, intensity: f64) -> Candidate {
    Candidate::new(description, intensity, Provenance::reflection(vec!["session-1".to_string()]))
}

/// A finished trajectory, for seeding stores directly.
pub fn trajectory(domain: PracticeDomain, success: bool) -> Trajectory {
    let oracle = match domain {
        PracticeDomain::Logic => Oracle::Consistency {
            runs: 5,
            divergence_threshold: 0.35,
        },
        _ => Oracle::TestSuite {
            code: ORACLE.to_string(),
        },
    };
    let verification = oracle.tier();
    Trajectory::from_practice(
        Uuid::new_v4(),
        &CompletedPractice {
            problem: PracticeProblem {
                id: Uuid::new_v4(),
                domain,
                difficulty: 1,
                specification: "Add two fractions and reduce the result.".to_string(),
                oracle,
            },
            solution: SOLUTION.to_string(),
            success,
            partial_score: if success { 1.0 } else { 0.0 },
            verification,
            solution_attempts: 1,
            divergence: None,
        },
    )
}

pub async fn seed_successes(trajectories: &Arc<dyn TrajectoryRepository>, domain: PracticeDomain, count: usize) {
    for _ in 0..count {
        trajectories
            .append(&trajectory(domain, true))
            .await
            .expect("Failed to seed trajectory");
    }
}
