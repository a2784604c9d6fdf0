//! In-memory audit log.

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    CalibrationSignal, Candidate, CycleResult, DomainClassification, EmergenceVerdict,
    SelectionRecord,
};
use crate::domain::ports::AuditRepository;

#[derive(Default)]
struct Log {
    verdicts: Vec<(Uuid, Candidate, EmergenceVerdict)>,
    selections: Vec<(Uuid, SelectionRecord)>,
    classifications: Vec<(Uuid, Uuid, DomainClassification)>,
    calibrations: Vec<CalibrationSignal>,
    cycles: Vec<CycleResult>,
}

/// In-memory implementation of [`AuditRepository`], with read accessors
/// for tests.
#[derive(Default)]
pub struct InMemoryAuditLog {
    log: RwLock<Log>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn verdicts(&self) -> Vec<EmergenceVerdict> {
        self.log.read().await.verdicts.iter().map(|(_, _, v)| v.clone()).collect()
    }

    pub async fn selections(&self) -> Vec<SelectionRecord> {
        self.log.read().await.selections.iter().map(|(_, s)| s.clone()).collect()
    }

    pub async fn classifications(&self) -> Vec<DomainClassification> {
        self.log
            .read()
            .await
            .classifications
            .iter()
            .map(|(_, _, c)| c.clone())
            .collect()
    }

    pub async fn calibrations(&self) -> Vec<CalibrationSignal> {
        self.log.read().await.calibrations.clone()
    }

    pub async fn cycles(&self) -> Vec<CycleResult> {
        self.log.read().await.cycles.clone()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditLog {
    async fn record_verdicts(&self, cycle_id: Uuid, verdicts: &[(Candidate, EmergenceVerdict)]) -> DomainResult<()> {
        let mut log = self.log.write().await;
        log.verdicts.extend(
            verdicts
                .iter()
                .map(|(c, v)| (cycle_id, c.clone(), v.clone())),
        );
        Ok(())
    }

    async fn record_selection(&self, cycle_id: Uuid, record: &SelectionRecord) -> DomainResult<()> {
        self.log.write().await.selections.push((cycle_id, record.clone()));
        Ok(())
    }

    async fn record_classification(
        &self,
        cycle_id: Uuid,
        candidate_id: Uuid,
        classification: &DomainClassification,
    ) -> DomainResult<()> {
        self.log
            .write()
            .await
            .classifications
            .push((cycle_id, candidate_id, classification.clone()));
        Ok(())
    }

    async fn record_calibration(&self, signal: &CalibrationSignal) -> DomainResult<()> {
        self.log.write().await.calibrations.push(signal.clone());
        Ok(())
    }

    async fn record_cycle(&self, result: &CycleResult) -> DomainResult<()> {
        self.log.write().await.cycles.push(result.clone());
        Ok(())
    }

    async fn recent_cycles(&self, limit: usize) -> DomainResult<Vec<CycleResult>> {
        Ok(self.log.read().await.cycles.iter().rev().take(limit).cloned().collect())
    }

    async fn suspected_misclassifications(&self, limit: usize) -> DomainResult<Vec<CalibrationSignal>> {
        Ok(self
            .log
            .read()
            .await
            .calibrations
            .iter()
            .rev()
            .filter(|s| s.suspected_misclassification)
            .take(limit)
            .cloned()
            .collect())
    }
}
