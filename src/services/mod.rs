//! Engine services.
//!
//! Each service depends only on domain models and port traits:
//! - CandidateScorer + EmergenceGate: admission
//! - SelectionResolver: weighted random collapse
//! - DomainClassifier: routing with a fail-closed default
//! - PracticeRunner + DifficultyTracker: oracle-constrained practice
//! - Crystallizer + StrategyDocumentService: heuristics and pruning
//! - CycleOrchestrator: the per-cycle state machine

pub mod crystallizer;
pub mod cycle_orchestrator;
pub mod difficulty;
pub mod domain_classifier;
pub mod emergence_gate;
pub mod lexical;
pub mod practice_runner;
pub mod scorer;
pub mod selection_resolver;
pub mod strategy_document;
pub mod token_counter;

pub use crystallizer::{CrystallizationResult, Crystallizer, TriggerCheck};
pub use cycle_orchestrator::{CycleComponents, CycleOrchestrator};
pub use difficulty::{DifficultyPolicy, DifficultyState, DifficultyTracker};
pub use domain_classifier::{DomainClassifier, Vocabulary};
pub use emergence_gate::{calibrate_threshold, threshold_accuracy, EmergenceGate, LabeledScore};
pub use practice_runner::PracticeRunner;
pub use scorer::{CandidateScorer, SpecificityAssessment};
pub use selection_resolver::{Resolution, SelectionResolver};
pub use strategy_document::{plan_prune, PrunePlan, PrunePolicy, StrategyDocumentService};
pub use token_counter::TokenCounter;
