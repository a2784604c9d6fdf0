//! Strategy document service: the only writer of the strategies section.
//!
//! Writes to `strategies` (crystallized appends, pruning passes, usage
//! updates) are serialized behind one async mutex. Whole crystallization
//! passes take a second mutex so two cycles cannot both act on the same
//! trigger. Reads go straight to the repository.

use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::strategy_document::render_strategies;
use crate::domain::models::{CrystallizationRun, Heuristic, PracticeDomain, StrategyConfig, StrategyDocument};
use crate::domain::ports::StrategyRepository;
use crate::services::token_counter::TokenCounter;

/// Owns all writes to the strategy document.
pub struct StrategyDocumentService {
    repository: Arc<dyn StrategyRepository>,
    counter: TokenCounter,
    config: StrategyConfig,
    write_lock: Mutex<()>,
    crystallization_lock: Mutex<()>,
}

impl StrategyDocumentService {
    pub fn new(repository: Arc<dyn StrategyRepository>, counter: TokenCounter, config: StrategyConfig) -> Self {
        Self {
            repository,
            counter,
            config,
            write_lock: Mutex::new(()),
            crystallization_lock: Mutex::new(()),
        }
    }

    /// Write the constitution. A second write fails with
    /// `ConstitutionImmutable`.
    pub async fn initialize(&self, constitution: &str) -> DomainResult<()> {
        if constitution.trim().is_empty() {
            return Err(DomainError::ValidationFailed("constitution cannot be empty".to_string()));
        }
        let _guard = self.write_lock.lock().await;
        self.repository.write_constitution(constitution).await?;
        tracing::info!("Constitution written");
        Ok(())
    }

    pub async fn is_initialized(&self) -> DomainResult<bool> {
        Ok(self.repository.constitution().await?.is_some())
    }

    /// Current snapshot. An uninitialized document has an empty
    /// constitution.
    pub async fn snapshot(&self) -> DomainResult<StrategyDocument> {
        let constitution = self.repository.constitution().await?.unwrap_or_default();
        let strategies = self.repository.heuristics().await?;
        Ok(StrategyDocument::new(constitution, strategies))
    }

    /// The strategies section as text, for the next reflection prompt.
    pub async fn render_strategies(&self) -> DomainResult<String> {
        Ok(render_strategies(&self.repository.heuristics().await?))
    }

    pub async fn heuristics_for_domain(&self, domain: PracticeDomain) -> DomainResult<Vec<Heuristic>> {
        self.repository.heuristics_for_domain(domain).await
    }

    pub async fn crystallization_runs(&self, domain: PracticeDomain) -> DomainResult<Vec<CrystallizationRun>> {
        self.repository.crystallization_runs(domain).await
    }

    /// Estimated token cost of the strategies section.
    pub async fn estimated_cost(&self) -> DomainResult<usize> {
        Ok(self.cost(&self.repository.heuristics().await?))
    }

    fn cost(&self, heuristics: &[Heuristic]) -> usize {
        self.counter.count(&render_strategies(heuristics))
    }

    /// Exclusive access for one crystallization pass, from the trigger check
    /// through the commit. Independent of the write lock, which the commit
    /// takes on its own.
    pub async fn lock_crystallization(&self) -> MutexGuard<'_, ()> {
        self.crystallization_lock.lock().await
    }

    /// Record a crystallization run, appending its heuristic when accepted,
    /// then prune if the append pushed the section over budget. Returns the
    /// pruned heuristics.
    pub async fn commit_crystallization(
        &self,
        heuristic: Option<&Heuristic>,
        run: &CrystallizationRun,
    ) -> DomainResult<Vec<Heuristic>> {
        let _guard = self.write_lock.lock().await;
        self.repository.commit_crystallization(heuristic, run).await?;
        if heuristic.is_some() {
            self.prune_locked(Utc::now()).await
        } else {
            Ok(Vec::new())
        }
    }

    /// Run a pruning pass now.
    pub async fn prune(&self) -> DomainResult<Vec<Heuristic>> {
        let _guard = self.write_lock.lock().await;
        self.prune_locked(Utc::now()).await
    }

    async fn prune_locked(&self, now: DateTime<Utc>) -> DomainResult<Vec<Heuristic>> {
        let heuristics = self.repository.heuristics().await?;
        let plan = plan_prune(
            &heuristics,
            now,
            &PrunePolicy::from(&self.config),
            |set| self.cost(set),
        );
        if plan.removed.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = plan.removed.iter().map(|h| h.id).collect();
        self.repository.remove_heuristics(&ids).await?;
        tracing::info!(
            removed = ids.len(),
            cost_before = plan.cost_before,
            cost_after = plan.cost_after,
            budget = self.config.token_budget,
            "Strategies pruned"
        );
        if plan.cost_after > self.config.token_budget {
            tracing::warn!(
                cost = plan.cost_after,
                budget = self.config.token_budget,
                "Strategies still over budget; remaining heuristics are too young to prune"
            );
        }
        Ok(plan.removed)
    }

    /// Note that a reflection used a heuristic.
    pub async fn record_usage(&self, id: Uuid) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        self.repository.record_usage(id, Utc::now()).await
    }
}

/// Pruning parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PrunePolicy {
    pub budget: usize,
    pub target_ratio: f64,
    pub min_age: Duration,
}

impl From<&StrategyConfig> for PrunePolicy {
    fn from(config: &StrategyConfig) -> Self {
        Self {
            budget: config.token_budget,
            target_ratio: config.prune_target_ratio,
            min_age: Duration::days(config.min_age_days),
        }
    }
}

/// Result of planning a pruning pass.
#[derive(Debug, Clone)]
pub struct PrunePlan {
    pub removed: Vec<Heuristic>,
    pub cost_before: usize,
    pub cost_after: usize,
}

/// Decide which heuristics to drop.
///
/// Nothing happens while the cost is within budget. Over budget, eligible
/// heuristics (at least `min_age` old) go in ascending value order until
/// the cost is at or below `target_ratio * budget`. Value ties drop the
/// older heuristic first.
pub fn plan_prune<F>(heuristics: &[Heuristic], now: DateTime<Utc>, policy: &PrunePolicy, cost: F) -> PrunePlan
where
    F: Fn(&[Heuristic]) -> usize,
{
    let cost_before = cost(heuristics);
    if cost_before <= policy.budget {
        return PrunePlan {
            removed: Vec::new(),
            cost_before,
            cost_after: cost_before,
        };
    }

    let target = (policy.budget as f64 * policy.target_ratio).floor() as usize;
    let mut eligible: Vec<&Heuristic> = heuristics
        .iter()
        .filter(|h| now - h.added_at >= policy.min_age)
        .collect();
    eligible.sort_by(|a, b| {
        a.value(now)
            .total_cmp(&b.value(now))
            .then(a.added_at.cmp(&b.added_at))
    });

    let mut kept: Vec<Heuristic> = heuristics.to_vec();
    let mut removed = Vec::new();
    let mut cost_after = cost_before;
    for victim in eligible {
        if cost_after <= target {
            break;
        }
        kept.retain(|h| h.id != victim.id);
        removed.push(victim.clone());
        cost_after = cost(&kept);
    }

    PrunePlan {
        removed,
        cost_before,
        cost_after,
    }
}
