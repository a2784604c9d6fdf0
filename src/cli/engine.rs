//! Wiring of configured adapters into engine services for CLI commands.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::judgment::{AnthropicJudgment, AnthropicJudgmentConfig};
use crate::adapters::oracle::CommandOracleExecutor;
use crate::adapters::random::{FallbackRandomSource, QrngRandomSource};
use crate::adapters::sqlite::{
    database_url, initialize_database, PoolConfig, SqliteAuditRepository, SqliteStrategyRepository,
    SqliteTrajectoryRepository,
};
use crate::adapters::{RateLimitedJudgment, RateLimitedRandom};
use crate::domain::models::{ArchitecturalConstants, Config};
use crate::domain::ports::{JudgmentCapability, RandomSource};
use crate::infrastructure::RateLimiter;
use crate::services::{
    CandidateScorer, CycleComponents, CycleOrchestrator, Crystallizer, DifficultyPolicy,
    DifficultyTracker, DomainClassifier, EmergenceGate, PracticeRunner, SelectionResolver,
    StrategyDocumentService, TokenCounter,
};

/// Opened database plus the services every command shares.
pub struct Engine {
    pub config: Config,
    pub pool: SqlitePool,
    pub trajectories: Arc<SqliteTrajectoryRepository>,
    pub audit: Arc<SqliteAuditRepository>,
    pub strategies: Arc<StrategyDocumentService>,
    constants: ArchitecturalConstants,
    limiter: Arc<RateLimiter>,
}

impl Engine {
    /// Open (and migrate) the configured database.
    pub async fn open(config: Config) -> Result<Self> {
        let url = database_url(&config.database.path);
        let pool = initialize_database(&url, Some(PoolConfig::from(&config.database)))
            .await
            .context("Failed to initialize database. Run 'emergence init' first.")?;

        let strategies = Arc::new(StrategyDocumentService::new(
            Arc::new(SqliteStrategyRepository::new(pool.clone())),
            TokenCounter::new(),
            config.strategy.clone(),
        ));
        let limiter = Arc::new(RateLimiter::new(&config.rate_limit)?);

        Ok(Self {
            trajectories: Arc::new(SqliteTrajectoryRepository::new(pool.clone())),
            audit: Arc::new(SqliteAuditRepository::new(pool.clone())),
            strategies,
            pool,
            constants: ArchitecturalConstants::canonical(),
            limiter,
            config,
        })
    }

    /// Rate-limited judgment capability; fails without an API key.
    pub fn judgment(&self) -> Result<Arc<dyn JudgmentCapability>> {
        let adapter = AnthropicJudgment::new(AnthropicJudgmentConfig::from(&self.config.judgment))
            .context("Judgment capability is required for this command")?;
        Ok(Arc::new(RateLimitedJudgment::new(
            Arc::new(adapter),
            Arc::clone(&self.limiter),
        )))
    }

    /// Judgment capability when one is configured.
    pub fn optional_judgment(&self) -> Option<Arc<dyn JudgmentCapability>> {
        match self.judgment() {
            Ok(judgment) => Some(judgment),
            Err(e) => {
                tracing::debug!(error = %e, "Running without judgment capability");
                None
            }
        }
    }

    /// External random source with local fallback, rate-limited.
    pub fn random(&self) -> Result<Arc<dyn RandomSource>> {
        let source = match &self.config.random.endpoint {
            Some(endpoint) => {
                let primary = QrngRandomSource::new(
                    endpoint.clone(),
                    Duration::from_millis(self.config.random.timeout_ms),
                )?;
                FallbackRandomSource::new(Arc::new(primary))
            }
            None => FallbackRandomSource::local_only(),
        };
        Ok(Arc::new(RateLimitedRandom::new(
            Arc::new(source),
            Arc::clone(&self.limiter),
        )))
    }

    pub fn classifier(&self) -> Result<DomainClassifier> {
        Ok(DomainClassifier::new(&self.config.classifier)?)
    }

    pub fn gate(&self, judgment: Option<Arc<dyn JudgmentCapability>>) -> Result<EmergenceGate> {
        let mut scorer = CandidateScorer::new(self.constants);
        if let Some(judgment) = judgment {
            scorer = scorer.with_judgment(judgment);
        }
        Ok(EmergenceGate::new(scorer, self.constants, self.config.gate.threshold)?)
    }

    /// Full cycle orchestrator over the configured adapters.
    pub fn orchestrator(&self) -> Result<CycleOrchestrator> {
        let judgment = self.judgment()?;
        let executor = Arc::new(CommandOracleExecutor::new(self.config.oracle.clone()));

        Ok(CycleOrchestrator::new(CycleComponents {
            gate: self.gate(Some(Arc::clone(&judgment)))?,
            resolver: SelectionResolver::new(self.random()?),
            classifier: self.classifier()?,
            practice: PracticeRunner::new(
                Arc::clone(&judgment),
                executor,
                self.config.practice.clone(),
            ),
            difficulty: DifficultyTracker::new(DifficultyPolicy::from(&self.config.practice)),
            crystallizer: Crystallizer::new(
                judgment,
                self.trajectories.clone(),
                Arc::clone(&self.strategies),
                self.config.crystallizer.clone(),
            ),
            strategies: Arc::clone(&self.strategies),
            trajectories: self.trajectories.clone(),
            audit: self.audit.clone(),
        }))
    }
}
