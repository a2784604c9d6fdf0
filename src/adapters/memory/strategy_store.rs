//! In-memory strategy document store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CrystallizationRun, Heuristic, PracticeDomain};
use crate::domain::ports::StrategyRepository;

#[derive(Default)]
struct State {
    constitution: Option<String>,
    heuristics: Vec<Heuristic>,
    runs: Vec<CrystallizationRun>,
}

/// In-memory implementation of [`StrategyRepository`].
#[derive(Default)]
pub struct InMemoryStrategyStore {
    state: RwLock<State>,
}

impl InMemoryStrategyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StrategyRepository for InMemoryStrategyStore {
    async fn write_constitution(&self, content: &str) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.constitution.is_some() {
            return Err(DomainError::ConstitutionImmutable);
        }
        state.constitution = Some(content.to_string());
        Ok(())
    }

    async fn constitution(&self) -> DomainResult<Option<String>> {
        Ok(self.state.read().await.constitution.clone())
    }

    async fn heuristics(&self) -> DomainResult<Vec<Heuristic>> {
        Ok(self.state.read().await.heuristics.clone())
    }

    async fn heuristics_for_domain(&self, domain: PracticeDomain) -> DomainResult<Vec<Heuristic>> {
        Ok(self
            .state
            .read()
            .await
            .heuristics
            .iter()
            .filter(|h| h.domain == domain)
            .cloned()
            .collect())
    }

    async fn commit_crystallization(
        &self,
        heuristic: Option<&Heuristic>,
        run: &CrystallizationRun,
    ) -> DomainResult<()> {
        let mut state = self.state.write().await;
        if state.runs.iter().any(|r| r.id == run.id) {
            return Err(DomainError::AppendConflict {
                entity: "crystallization_run".to_string(),
                id: run.id.to_string(),
            });
        }
        if let Some(h) = heuristic {
            if state.heuristics.iter().any(|existing| existing.id == h.id) {
                return Err(DomainError::AppendConflict {
                    entity: "heuristic".to_string(),
                    id: h.id.to_string(),
                });
            }
            state.heuristics.push(h.clone());
        }
        state.runs.push(run.clone());
        Ok(())
    }

    async fn crystallization_runs(&self, domain: PracticeDomain) -> DomainResult<Vec<CrystallizationRun>> {
        Ok(self
            .state
            .read()
            .await
            .runs
            .iter()
            .filter(|r| r.domain == domain)
            .cloned()
            .collect())
    }

    async fn remove_heuristics(&self, ids: &[Uuid]) -> DomainResult<usize> {
        let mut state = self.state.write().await;
        let before = state.heuristics.len();
        state.heuristics.retain(|h| !ids.contains(&h.id));
        Ok(before - state.heuristics.len())
    }

    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let mut state = self.state.write().await;
        let heuristic = state
            .heuristics
            .iter_mut()
            .find(|h| h.id == id)
            .ok_or_else(|| DomainError::ValidationFailed(format!("unknown heuristic {id}")))?;
        heuristic.usage_count = heuristic.usage_count.saturating_add(1);
        heuristic.last_used_at = Some(at);
        Ok(())
    }
}
