//! Port trait definitions (Hexagonal Architecture)
//!
//! External collaborators the engine consumes:
//! - JudgmentCapability: generative and evaluative model calls
//! - RandomSource: uniform draws for the selection resolver
//! - Reflector: produces raw candidates
//! - OracleExecutor: runs solutions against test-suite oracles
//! - TrajectoryRepository / StrategyRepository / AuditRepository: persistence
//!
//! The services depend only on these traits, never on a specific backend.

pub mod audit_repository;
pub mod judgment;
pub mod oracle_executor;
pub mod random_source;
pub mod reflector;
pub mod strategy_repository;
pub mod trajectory_repository;

pub use audit_repository::AuditRepository;
pub use judgment::{
    parse_score, parse_yes_no, JudgmentCapability, JudgmentRequest, JudgmentTask, SamplingMode,
};
pub use oracle_executor::OracleExecutor;
pub use random_source::RandomSource;
pub use reflector::{ReflectionContext, Reflector};
pub use strategy_repository::StrategyRepository;
pub use trajectory_repository::TrajectoryRepository;
