//! Per-domain difficulty adaptation by streaks.
//!
//! State lives in memory and is rebuilt from trajectory history on first
//! use of a domain, so it survives restarts without a table of its own.

use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::domain::models::{PracticeConfig, PracticeDomain, Trajectory};

pub const MIN_DIFFICULTY: u8 = 1;

/// Streak thresholds and the level ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DifficultyPolicy {
    pub success_streak: u32,
    pub failure_streak: u32,
    pub max_level: u8,
}

impl From<&PracticeConfig> for DifficultyPolicy {
    fn from(config: &PracticeConfig) -> Self {
        Self {
            success_streak: config.success_streak.max(1),
            failure_streak: config.failure_streak.max(1),
            max_level: config.max_difficulty.max(MIN_DIFFICULTY),
        }
    }
}

/// Difficulty level and running streaks for one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DifficultyState {
    pub level: u8,
    pub consecutive_successes: u32,
    pub consecutive_failures: u32,
}

impl Default for DifficultyState {
    fn default() -> Self {
        Self {
            level: MIN_DIFFICULTY,
            consecutive_successes: 0,
            consecutive_failures: 0,
        }
    }
}

impl DifficultyState {
    /// Apply one outcome. Streaks reset whenever the level moves.
    pub fn record(&mut self, success: bool, policy: &DifficultyPolicy) {
        if success {
            self.consecutive_successes += 1;
            self.consecutive_failures = 0;
            if self.consecutive_successes >= policy.success_streak {
                self.level = self.level.saturating_add(1).min(policy.max_level);
                self.consecutive_successes = 0;
            }
        } else {
            self.consecutive_failures += 1;
            self.consecutive_successes = 0;
            if self.consecutive_failures >= policy.failure_streak {
                self.level = self.level.saturating_sub(1).max(MIN_DIFFICULTY);
                self.consecutive_failures = 0;
            }
        }
    }
}

/// Tracks difficulty for every domain.
pub struct DifficultyTracker {
    policy: DifficultyPolicy,
    states: RwLock<HashMap<PracticeDomain, DifficultyState>>,
}

impl DifficultyTracker {
    pub fn new(policy: DifficultyPolicy) -> Self {
        Self {
            policy,
            states: RwLock::new(HashMap::new()),
        }
    }

    pub async fn is_loaded(&self, domain: PracticeDomain) -> bool {
        self.states.read().await.contains_key(&domain)
    }

    /// Rebuild a domain's state by replaying its history, oldest first.
    pub async fn rehydrate(&self, domain: PracticeDomain, history: &[Trajectory]) {
        let mut state = DifficultyState::default();
        for trajectory in history.iter().filter(|t| t.domain == domain) {
            state.record(trajectory.success, &self.policy);
        }
        tracing::debug!(domain = %domain, level = state.level, replayed = history.len(), "Difficulty rehydrated");
        self.states.write().await.insert(domain, state);
    }

    pub async fn state(&self, domain: PracticeDomain) -> DifficultyState {
        self.states.read().await.get(&domain).copied().unwrap_or_default()
    }

    pub async fn level(&self, domain: PracticeDomain) -> u8 {
        self.state(domain).await.level
    }

    /// Record one practice outcome; returns the new level.
    pub async fn record(&self, domain: PracticeDomain, success: bool) -> u8 {
        let mut states = self.states.write().await;
        let state = states.entry(domain).or_default();
        let before = state.level;
        state.record(success, &self.policy);
        if state.level != before {
            tracing::info!(domain = %domain, from = before, to = state.level, "Difficulty changed");
        }
        state.level
    }
}
