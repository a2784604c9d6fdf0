//! Arena-style in-memory trajectory log.
//!
//! Trajectories live in one append-only vector; a per-domain index of
//! arena positions serves the domain queries without scanning.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{PracticeDomain, Trajectory};
use crate::domain::ports::TrajectoryRepository;

#[derive(Default)]
struct Arena {
    entries: Vec<Trajectory>,
    ids: HashSet<Uuid>,
    by_domain: HashMap<PracticeDomain, Vec<usize>>,
    successes_by_domain: HashMap<PracticeDomain, Vec<usize>>,
}

/// In-memory append-only trajectory store.
#[derive(Default)]
pub struct InMemoryTrajectoryLog {
    arena: RwLock<Arena>,
}

impl InMemoryTrajectoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.arena.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl TrajectoryRepository for InMemoryTrajectoryLog {
    async fn append(&self, trajectory: &Trajectory) -> DomainResult<()> {
        let mut arena = self.arena.write().await;
        if !arena.ids.insert(trajectory.id) {
            return Err(DomainError::AppendConflict {
                entity: "trajectory".to_string(),
                id: trajectory.id.to_string(),
            });
        }
        let position = arena.entries.len();
        arena.by_domain.entry(trajectory.domain).or_default().push(position);
        if trajectory.success {
            arena
                .successes_by_domain
                .entry(trajectory.domain)
                .or_default()
                .push(position);
        }
        arena.entries.push(trajectory.clone());
        Ok(())
    }

    async fn recent_successes(&self, domain: PracticeDomain, limit: usize) -> DomainResult<Vec<Trajectory>> {
        let arena = self.arena.read().await;
        Ok(arena
            .successes_by_domain
            .get(&domain)
            .map(|positions| {
                positions
                    .iter()
                    .rev()
                    .take(limit)
                    .map(|p| arena.entries[*p].clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn successes(&self, domain: PracticeDomain) -> DomainResult<Vec<Trajectory>> {
        let arena = self.arena.read().await;
        Ok(arena
            .successes_by_domain
            .get(&domain)
            .map(|positions| positions.iter().map(|p| arena.entries[*p].clone()).collect())
            .unwrap_or_default())
    }

    async fn count_successes(&self, domain: PracticeDomain) -> DomainResult<u64> {
        let arena = self.arena.read().await;
        Ok(arena.successes_by_domain.get(&domain).map_or(0, |p| p.len() as u64))
    }

    async fn history(&self, domain: PracticeDomain) -> DomainResult<Vec<Trajectory>> {
        let arena = self.arena.read().await;
        Ok(arena
            .by_domain
            .get(&domain)
            .map(|positions| positions.iter().map(|p| arena.entries[*p].clone()).collect())
            .unwrap_or_default())
    }
}
