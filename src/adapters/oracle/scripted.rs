//! Scripted oracle executor for tests and dry runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{OracleReport, PracticeProblem};
use crate::domain::ports::OracleExecutor;

/// Returns pre-scripted reports in order; the last one repeats.
pub struct ScriptedOracleExecutor {
    reports: Mutex<Vec<OracleReport>>,
    delay: Option<Duration>,
    executions: AtomicUsize,
}

impl ScriptedOracleExecutor {
    pub fn new(reports: Vec<OracleReport>) -> Self {
        let mut reports = reports;
        reports.reverse();
        Self {
            reports: Mutex::new(reports),
            delay: None,
            executions: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering, to exercise execution bounds.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn executions(&self) -> usize {
        self.executions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleExecutor for ScriptedOracleExecutor {
    async fn execute(
        &self,
        _problem: &PracticeProblem,
        _oracle_code: &str,
        _solution: &str,
    ) -> DomainResult<OracleReport> {
        self.executions.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut reports = self.reports.lock().unwrap_or_else(PoisonError::into_inner);
        let report = if reports.len() > 1 { reports.pop() } else { reports.last().cloned() };
        report.ok_or_else(|| DomainError::OracleExecutionFailed("no scripted report".to_string()))
    }
}
