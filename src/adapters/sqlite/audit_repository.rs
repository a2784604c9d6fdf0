//! SQLite implementation of the AuditRepository.
//!
//! Verdicts, selections, classifications and cycle results are stored as
//! JSON documents next to a few indexed columns used for querying.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{map_insert_error, parse_datetime, parse_domain, parse_uuid, sql_limit};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CalibrationOutcome, CalibrationSignal, Candidate, CycleResult, DomainClassification,
    EmergenceVerdict, SelectionRecord,
};
use crate::domain::ports::AuditRepository;

#[derive(Clone)]
pub struct SqliteAuditRepository {
    pool: SqlitePool,
}

impl SqliteAuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditRepository for SqliteAuditRepository {
    async fn record_verdicts(
        &self,
        cycle_id: Uuid,
        verdicts: &[(Candidate, EmergenceVerdict)],
    ) -> DomainResult<()> {
        let mut tx = self.pool.begin().await?;
        for (candidate, verdict) in verdicts {
            sqlx::query(
                r#"INSERT INTO emergence_verdicts (cycle_id, candidate_id, description, passed,
                   combined_score, candidate, verdict, evaluated_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(cycle_id.to_string())
            .bind(candidate.id.to_string())
            .bind(&candidate.description)
            .bind(verdict.passed)
            .bind(verdict.combined_score)
            .bind(serde_json::to_string(candidate)?)
            .bind(serde_json::to_string(verdict)?)
            .bind(verdict.evaluated_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, "emergence_verdict", candidate.id))?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_selection(&self, cycle_id: Uuid, record: &SelectionRecord) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO selection_records (id, cycle_id, winner_id, entropy, source, record, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(record.id.to_string())
        .bind(cycle_id.to_string())
        .bind(record.winner().map(|w| w.candidate_id.to_string()))
        .bind(record.entropy)
        .bind(record.source.as_str())
        .bind(serde_json::to_string(record)?)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "selection_record", record.id))?;
        Ok(())
    }

    async fn record_classification(
        &self,
        cycle_id: Uuid,
        candidate_id: Uuid,
        classification: &DomainClassification,
    ) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO domain_classifications (cycle_id, candidate_id, primary_domain,
               primary_confidence, classification, recorded_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(cycle_id.to_string())
        .bind(candidate_id.to_string())
        .bind(classification.primary_domain.as_str())
        .bind(classification.primary_confidence)
        .bind(serde_json::to_string(classification)?)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "domain_classification", candidate_id))?;
        Ok(())
    }

    async fn record_calibration(&self, signal: &CalibrationSignal) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO calibration_signals (id, cycle_id, description, predicted_domain, confidence,
               outcome, suspected_misclassification, recorded_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(signal.id.to_string())
        .bind(signal.cycle_id.to_string())
        .bind(&signal.description)
        .bind(signal.predicted_domain.as_str())
        .bind(signal.confidence)
        .bind(signal.outcome.as_str())
        .bind(signal.suspected_misclassification)
        .bind(signal.recorded_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "calibration_signal", signal.id))?;
        Ok(())
    }

    async fn record_cycle(&self, result: &CycleResult) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO cycle_results (cycle_id, started_at, finished_at, domain, error, result)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(result.cycle_id.to_string())
        .bind(result.started_at.to_rfc3339())
        .bind(result.finished_at.map(|t| t.to_rfc3339()))
        .bind(result.domain.map(|d| d.as_str()))
        .bind(&result.error)
        .bind(serde_json::to_string(result)?)
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "cycle_result", result.cycle_id))?;
        Ok(())
    }

    async fn recent_cycles(&self, limit: usize) -> DomainResult<Vec<CycleResult>> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT result FROM cycle_results ORDER BY rowid DESC LIMIT ?")
                .bind(sql_limit(limit))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter()
            .map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .collect()
    }

    async fn suspected_misclassifications(&self, limit: usize) -> DomainResult<Vec<CalibrationSignal>> {
        let rows: Vec<CalibrationRow> = sqlx::query_as(
            r#"SELECT id, cycle_id, description, predicted_domain, confidence, outcome,
               suspected_misclassification, recorded_at
               FROM calibration_signals WHERE suspected_misclassification = 1
               ORDER BY rowid DESC LIMIT ?"#,
        )
        .bind(sql_limit(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CalibrationSignal::try_from).collect()
    }
}

fn parse_outcome(s: &str) -> DomainResult<CalibrationOutcome> {
    match s {
        "blocked" => Ok(CalibrationOutcome::Blocked),
        "generation_failed" => Ok(CalibrationOutcome::GenerationFailed),
        "practice_succeeded" => Ok(CalibrationOutcome::PracticeSucceeded),
        "practice_failed" => Ok(CalibrationOutcome::PracticeFailed),
        other => Err(DomainError::SerializationError(format!(
            "unknown calibration outcome: {other}"
        ))),
    }
}

#[derive(sqlx::FromRow)]
struct CalibrationRow {
    id: String,
    cycle_id: String,
    description: String,
    predicted_domain: String,
    confidence: f64,
    outcome: String,
    suspected_misclassification: bool,
    recorded_at: String,
}

impl TryFrom<CalibrationRow> for CalibrationSignal {
    type Error = DomainError;

    fn try_from(row: CalibrationRow) -> Result<Self, Self::Error> {
        Ok(CalibrationSignal {
            id: parse_uuid(&row.id)?,
            cycle_id: parse_uuid(&row.cycle_id)?,
            description: row.description,
            predicted_domain: parse_domain(&row.predicted_domain)?,
            confidence: row.confidence,
            outcome: parse_outcome(&row.outcome)?,
            suspected_misclassification: row.suspected_misclassification,
            recorded_at: parse_datetime(&row.recorded_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{PracticeDomain, Provenance};

    async fn setup() -> (SqlitePool, SqliteAuditRepository) {
        let pool = create_migrated_test_pool().await.unwrap();
        (pool.clone(), SqliteAuditRepository::new(pool))
    }

    fn signal(outcome: CalibrationOutcome, suspected: bool) -> CalibrationSignal {
        CalibrationSignal {
            id: Uuid::new_v4(),
            cycle_id: Uuid::new_v4(),
            description: "prove lemmas about sorting".to_string(),
            predicted_domain: PracticeDomain::Math,
            confidence: 0.4,
            outcome,
            suspected_misclassification: suspected,
            recorded_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_verdicts_recorded_per_candidate() {
        let (pool, repo) = setup().await;
        let cycle_id = Uuid::new_v4();
        let a = Candidate::new("faster multi-step arithmetic", 0.4, Provenance::bootstrap());
        let b = Candidate::new("be better", 0.2, Provenance::bootstrap());
        let verdicts = vec![
            (a.clone(), EmergenceVerdict::invalid(a.id, 0.6, "test")),
            (b.clone(), EmergenceVerdict::invalid(b.id, 0.6, "test")),
        ];
        repo.record_verdicts(cycle_id, &verdicts).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM emergence_verdicts WHERE cycle_id = ?")
            .bind(cycle_id.to_string())
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);

        let err = repo.record_verdicts(cycle_id, &verdicts[..1]).await.unwrap_err();
        assert!(matches!(err, DomainError::AppendConflict { .. }));
    }

    #[tokio::test]
    async fn test_suspected_misclassifications_filter_and_order() {
        let (_, repo) = setup().await;
        let first = signal(CalibrationOutcome::GenerationFailed, true);
        let clean = signal(CalibrationOutcome::PracticeSucceeded, false);
        let second = signal(CalibrationOutcome::PracticeFailed, true);
        for s in [&first, &clean, &second] {
            repo.record_calibration(s).await.unwrap();
        }

        let suspected = repo.suspected_misclassifications(10).await.unwrap();
        assert_eq!(suspected.iter().map(|s| s.id).collect::<Vec<_>>(), vec![second.id, first.id]);
        assert_eq!(suspected[1].outcome, CalibrationOutcome::GenerationFailed);
    }

    #[tokio::test]
    async fn test_cycle_results_newest_first() {
        let (_, repo) = setup().await;
        let older = CycleResult::new(Uuid::new_v4(), 3);
        let mut newer = CycleResult::new(Uuid::new_v4(), 1);
        newer.error = Some("judgment capability unavailable".to_string());
        repo.record_cycle(&older).await.unwrap();
        repo.record_cycle(&newer).await.unwrap();

        let cycles = repo.recent_cycles(1).await.unwrap();
        assert_eq!(cycles, vec![newer]);
    }
}
