//! Emergence - gated self-improvement engine
//!
//! Candidate improvements produced by reflection pass an emergence gate
//! (provenance and specificity), collapse to one winner through a weighted
//! random draw, and are routed to oracle-constrained practice. Successful
//! trajectories accumulate until a crystallizer distills them into
//! domain-scoped heuristics held in a budgeted strategy document.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Models, errors and port traits
//! - **Service Layer** (`services`): Gate, resolver, classifier, practice, crystallizer
//! - **Adapters** (`adapters`): SQLite, in-memory, HTTP judgment, random sources, oracles
//! - **Infrastructure Layer** (`infrastructure`): Configuration, logging, rate limiting
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use emergence::services::CycleOrchestrator;
//!
//! let result = orchestrator.run_reflection_cycle(&reflector).await?;
//! println!("selected: {:?}", result.selected);
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::errors::{DomainError, DomainResult};
pub use domain::models::{
    Candidate, Config, CycleResult, DomainClassification, EmergenceVerdict, Heuristic,
    PracticeDomain, Provenance, SelectionRecord, StrategyDocument, Trajectory,
};
pub use domain::ports::{
    AuditRepository, JudgmentCapability, OracleExecutor, RandomSource, Reflector,
    StrategyRepository, TrajectoryRepository,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{CycleOrchestrator, EmergenceGate, SelectionResolver};
