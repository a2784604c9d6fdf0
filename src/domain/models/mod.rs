//! Domain models for the emergence engine.

pub mod candidate;
pub mod classification;
pub mod config;
pub mod constants;
pub mod cycle;
pub mod heuristic;
pub mod practice;
pub mod selection;
pub mod strategy_document;
pub mod trajectory;
pub mod verdict;

pub use candidate::{Candidate, Origin, Provenance};
pub use classification::{
    CalibrationOutcome, CalibrationSignal, DomainClassification, DomainScore, PracticeDomain,
};
pub use config::{
    ClassifierConfig, Config, CrystallizerConfig, DatabaseConfig, GateConfig, JudgmentConfig,
    LoggingConfig, OracleConfig, PracticeConfig, RandomConfig, RateLimitConfig, StrategyConfig,
};
pub use constants::ArchitecturalConstants;
pub use cycle::{CrystallizationSummary, CyclePhase, CycleResult, PracticeSummary};
pub use heuristic::{CrystallizationOutcome, CrystallizationRun, Heuristic};
pub use practice::{
    CompletedPractice, Oracle, OracleReport, PracticeOutcome, PracticeProblem, VerificationTier,
    NO_ORACLE_REASON,
};
pub use selection::{Counterfactual, DrawSource, RandomDraw, SelectionEntry, SelectionRecord};
pub use strategy_document::StrategyDocument;
pub use trajectory::Trajectory;
pub use verdict::{EmergenceVerdict, RejectionReason, SpecificityPath};
