//! Strategy document persistence port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{CrystallizationRun, Heuristic, PracticeDomain};

/// Persistence for the constitution, heuristics and crystallization runs.
///
/// Callers outside the strategy document service should only read.
#[async_trait]
pub trait StrategyRepository: Send + Sync {
    /// Write the constitution. Fails with `ConstitutionImmutable` if one
    /// has already been written.
    async fn write_constitution(&self, content: &str) -> DomainResult<()>;

    async fn constitution(&self) -> DomainResult<Option<String>>;

    /// All heuristics, oldest first.
    async fn heuristics(&self) -> DomainResult<Vec<Heuristic>>;

    /// Heuristics for one domain, oldest first.
    async fn heuristics_for_domain(&self, domain: PracticeDomain) -> DomainResult<Vec<Heuristic>>;

    /// Record a crystallization run and, when accepted, its heuristic.
    /// Both writes happen or neither does.
    async fn commit_crystallization(
        &self,
        heuristic: Option<&Heuristic>,
        run: &CrystallizationRun,
    ) -> DomainResult<()>;

    /// Crystallization runs for one domain, oldest first.
    async fn crystallization_runs(&self, domain: PracticeDomain) -> DomainResult<Vec<CrystallizationRun>>;

    /// Remove pruned heuristics. Returns how many rows were removed.
    async fn remove_heuristics(&self, ids: &[Uuid]) -> DomainResult<usize>;

    /// Increment usage for a heuristic a reflection is known to have used.
    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()>;
}
