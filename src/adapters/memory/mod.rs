//! In-memory adapters for the persistence ports.
//!
//! Used by tests and by ephemeral runs that do not need a database.

pub mod audit_log;
pub mod strategy_store;
pub mod trajectory_log;

pub use audit_log::InMemoryAuditLog;
pub use strategy_store::InMemoryStrategyStore;
pub use trajectory_log::InMemoryTrajectoryLog;
