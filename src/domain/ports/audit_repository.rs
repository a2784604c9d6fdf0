//! Audit log port for cycle-scoped records.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CalibrationSignal, Candidate, CycleResult, DomainClassification, EmergenceVerdict,
    SelectionRecord,
};

/// Append-only log for verdicts, selections, classifications, calibration
/// signals and cycle results.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Record every verdict produced in one verifying phase, atomically.
    async fn record_verdicts(
        &self,
        cycle_id: Uuid,
        verdicts: &[(Candidate, EmergenceVerdict)],
    ) -> DomainResult<()>;

    async fn record_selection(&self, cycle_id: Uuid, record: &SelectionRecord) -> DomainResult<()>;

    async fn record_classification(
        &self,
        cycle_id: Uuid,
        candidate_id: Uuid,
        classification: &DomainClassification,
    ) -> DomainResult<()>;

    async fn record_calibration(&self, signal: &CalibrationSignal) -> DomainResult<()>;

    async fn record_cycle(&self, result: &CycleResult) -> DomainResult<()>;

    /// Most recent cycle results, newest first.
    async fn recent_cycles(&self, limit: usize) -> DomainResult<Vec<CycleResult>>;

    /// Calibration signals flagged as suspected misclassifications.
    async fn suspected_misclassifications(&self, limit: usize) -> DomainResult<Vec<CalibrationSignal>>;
}
