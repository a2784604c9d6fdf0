//! Trajectory store port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{PracticeDomain, Trajectory};

/// Append-only persistence for practice trajectories.
///
/// There is deliberately no update or delete operation. Appending an id
/// that already exists fails with `DomainError::AppendConflict`.
#[async_trait]
pub trait TrajectoryRepository: Send + Sync {
    /// Append one trajectory.
    async fn append(&self, trajectory: &Trajectory) -> DomainResult<()>;

    /// The most recent `limit` successful trajectories for a domain,
    /// newest first.
    async fn recent_successes(
        &self,
        domain: PracticeDomain,
        limit: usize,
    ) -> DomainResult<Vec<Trajectory>>;

    /// Every successful trajectory for a domain, oldest first.
    async fn successes(&self, domain: PracticeDomain) -> DomainResult<Vec<Trajectory>>;

    /// Number of successful trajectories for a domain.
    async fn count_successes(&self, domain: PracticeDomain) -> DomainResult<u64>;

    /// Every trajectory for a domain, success or failure, oldest first.
    async fn history(&self, domain: PracticeDomain) -> DomainResult<Vec<Trajectory>>;
}
