//! Adapters implementing the domain ports against external systems.

pub mod judgment;
pub mod memory;
pub mod oracle;
pub mod random;
pub mod rate_limited;
pub mod reflector;
pub mod sqlite;

pub use rate_limited::{RateLimitedJudgment, RateLimitedRandom};
pub use reflector::{JsonFileReflector, StaticReflector};
