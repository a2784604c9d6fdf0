//! Oracle execution port.

use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::{OracleReport, PracticeProblem};

/// Runs a candidate solution against a test-suite oracle.
///
/// Implementations must be cancel-safe: the practice runner enforces its
/// execution bound by dropping the returned future, and any child process
/// has to die with it.
#[async_trait]
pub trait OracleExecutor: Send + Sync {
    async fn execute(
        &self,
        problem: &PracticeProblem,
        oracle_code: &str,
        solution: &str,
    ) -> DomainResult<OracleReport>;
}
