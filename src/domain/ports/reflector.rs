//! Reflection capability port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::Candidate;

/// Agent state handed to the reflection step.
#[derive(Debug, Clone, Default)]
pub struct ReflectionContext {
    /// Rendered `strategies` section from the strategy document.
    pub strategies: String,
}

/// Produces raw improvement candidates from agent state.
///
/// Opaque to the engine: zero or more free-form candidates per call.
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn reflect(&self, context: &ReflectionContext) -> DomainResult<Vec<Candidate>>;
}
