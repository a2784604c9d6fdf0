//! Domain layer for the emergence engine
//!
//! Pure models, the port traits that adapters implement, and the domain
//! error type.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult};
