//! SQLite implementation of the StrategyRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::adapters::sqlite::{
    map_insert_error, parse_count, parse_datetime, parse_domain, parse_optional_datetime, parse_uuid,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{CrystallizationRun, Heuristic, PracticeDomain};
use crate::domain::ports::StrategyRepository;

const HEURISTIC_COLUMNS: &str = "SELECT id, domain, content, supporting_trajectory_count, usage_count, \
     verification, added_at, last_used_at FROM heuristics";

#[derive(Clone)]
pub struct SqliteStrategyRepository {
    pool: SqlitePool,
}

impl SqliteStrategyRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StrategyRepository for SqliteStrategyRepository {
    async fn write_constitution(&self, content: &str) -> DomainResult<()> {
        let result = sqlx::query("INSERT INTO constitution (id, content, written_at) VALUES (1, ?, ?)")
            .bind(content)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(DomainError::ConstitutionImmutable)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn constitution(&self) -> DomainResult<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as("SELECT content FROM constitution WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(content,)| content))
    }

    async fn heuristics(&self) -> DomainResult<Vec<Heuristic>> {
        let query = format!("{HEURISTIC_COLUMNS} ORDER BY rowid ASC");
        let rows: Vec<HeuristicRow> = sqlx::query_as(&query).fetch_all(&self.pool).await?;
        rows.into_iter().map(Heuristic::try_from).collect()
    }

    async fn heuristics_for_domain(&self, domain: PracticeDomain) -> DomainResult<Vec<Heuristic>> {
        let query = format!("{HEURISTIC_COLUMNS} WHERE domain = ? ORDER BY rowid ASC");
        let rows: Vec<HeuristicRow> = sqlx::query_as(&query)
            .bind(domain.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Heuristic::try_from).collect()
    }

    async fn commit_crystallization(
        &self,
        heuristic: Option<&Heuristic>,
        run: &CrystallizationRun,
    ) -> DomainResult<()> {
        let outcome_json = serde_json::to_string(&run.outcome)?;
        let mut tx = self.pool.begin().await?;

        if let Some(h) = heuristic {
            sqlx::query(
                r#"INSERT INTO heuristics (id, domain, content, supporting_trajectory_count, usage_count,
                   verification, added_at, last_used_at)
                   VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(h.id.to_string())
            .bind(h.domain.as_str())
            .bind(&h.content)
            .bind(i64::from(h.supporting_trajectory_count))
            .bind(i64::from(h.usage_count))
            .bind(h.verification.as_str())
            .bind(h.added_at.to_rfc3339())
            .bind(h.last_used_at.map(|t| t.to_rfc3339()))
            .execute(&mut *tx)
            .await
            .map_err(|e| map_insert_error(e, "heuristic", h.id))?;
        }

        sqlx::query(
            r#"INSERT INTO crystallization_runs (id, domain, success_count_at_run, accepted, outcome, ran_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(run.id.to_string())
        .bind(run.domain.as_str())
        .bind(i64::try_from(run.success_count_at_run).unwrap_or(i64::MAX))
        .bind(run.outcome.is_accepted())
        .bind(&outcome_json)
        .bind(run.ran_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(|e| map_insert_error(e, "crystallization_run", run.id))?;

        tx.commit().await?;
        Ok(())
    }

    async fn crystallization_runs(&self, domain: PracticeDomain) -> DomainResult<Vec<CrystallizationRun>> {
        let rows: Vec<RunRow> = sqlx::query_as(
            "SELECT id, domain, success_count_at_run, outcome, ran_at FROM crystallization_runs \
             WHERE domain = ? ORDER BY rowid ASC",
        )
        .bind(domain.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CrystallizationRun::try_from).collect()
    }

    async fn remove_heuristics(&self, ids: &[Uuid]) -> DomainResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut removed = 0u64;
        for id in ids {
            let result = sqlx::query("DELETE FROM heuristics WHERE id = ?")
                .bind(id.to_string())
                .execute(&mut *tx)
                .await?;
            removed += result.rows_affected();
        }
        tx.commit().await?;

        Ok(usize::try_from(removed).unwrap_or(usize::MAX))
    }

    async fn record_usage(&self, id: Uuid, at: DateTime<Utc>) -> DomainResult<()> {
        let result = sqlx::query(
            "UPDATE heuristics SET usage_count = usage_count + 1, last_used_at = ? WHERE id = ?",
        )
        .bind(at.to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DomainError::ValidationFailed(format!("unknown heuristic {id}")));
        }
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct HeuristicRow {
    id: String,
    domain: String,
    content: String,
    supporting_trajectory_count: i64,
    usage_count: i64,
    verification: String,
    added_at: String,
    last_used_at: Option<String>,
}

impl TryFrom<HeuristicRow> for Heuristic {
    type Error = DomainError;

    fn try_from(row: HeuristicRow) -> Result<Self, Self::Error> {
        Ok(Heuristic {
            id: parse_uuid(&row.id)?,
            domain: parse_domain(&row.domain)?,
            content: row.content,
            supporting_trajectory_count: parse_count(row.supporting_trajectory_count, "supporting_trajectory_count")?,
            usage_count: parse_count(row.usage_count, "usage_count")?,
            verification: row.verification.parse()?,
            added_at: parse_datetime(&row.added_at)?,
            last_used_at: parse_optional_datetime(row.last_used_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RunRow {
    id: String,
    domain: String,
    success_count_at_run: i64,
    outcome: String,
    ran_at: String,
}

impl TryFrom<RunRow> for CrystallizationRun {
    type Error = DomainError;

    fn try_from(row: RunRow) -> Result<Self, Self::Error> {
        Ok(CrystallizationRun {
            id: parse_uuid(&row.id)?,
            domain: parse_domain(&row.domain)?,
            success_count_at_run: parse_count(row.success_count_at_run, "success_count_at_run")?,
            outcome: serde_json::from_str(&row.outcome)?,
            ran_at: parse_datetime(&row.ran_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{CrystallizationOutcome, VerificationTier};

    async fn setup() -> SqliteStrategyRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteStrategyRepository::new(pool)
    }

    fn accepted(domain: PracticeDomain, content: &str) -> (Heuristic, CrystallizationRun) {
        let h = Heuristic::new(domain, content, 20, VerificationTier::Oracle);
        let run = CrystallizationRun::new(
            domain,
            20,
            CrystallizationOutcome::Accepted {
                heuristic_id: h.id,
                content: content.to_string(),
            },
        );
        (h, run)
    }

    #[tokio::test]
    async fn test_constitution_is_write_once() {
        let repo = setup().await;
        assert!(repo.constitution().await.unwrap().is_none());

        repo.write_constitution("Never fabricate results.").await.unwrap();
        let err = repo.write_constitution("Something else.").await.unwrap_err();
        assert!(matches!(err, DomainError::ConstitutionImmutable));
        assert_eq!(repo.constitution().await.unwrap().as_deref(), Some("Never fabricate results."));
    }

    #[tokio::test]
    async fn test_commit_crystallization_stores_heuristic_and_run() {
        let repo = setup().await;
        let (h, run) = accepted(PracticeDomain::Code, "Write the failing test before the fix.");
        repo.commit_crystallization(Some(&h), &run).await.unwrap();

        let stored = repo.heuristics_for_domain(PracticeDomain::Code).await.unwrap();
        assert_eq!(stored, vec![h.clone()]);
        let runs = repo.crystallization_runs(PracticeDomain::Code).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].success_count_at_run, 20);
        assert!(runs[0].outcome.is_accepted());
        assert!(repo.heuristics_for_domain(PracticeDomain::Math).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_run_without_heuristic() {
        let repo = setup().await;
        let run = CrystallizationRun::new(
            PracticeDomain::Math,
            10,
            CrystallizationOutcome::RejectedVague {
                content: "Be careful.".to_string(),
            },
        );
        repo.commit_crystallization(None, &run).await.unwrap();

        assert!(repo.heuristics().await.unwrap().is_empty());
        assert_eq!(repo.crystallization_runs(PracticeDomain::Math).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_commit_leaves_nothing_behind() {
        let repo = setup().await;
        let (h, run) = accepted(PracticeDomain::Logic, "Enumerate cases before concluding.");
        repo.commit_crystallization(Some(&h), &run).await.unwrap();

        let (h2, _) = accepted(PracticeDomain::Logic, "List every premise explicitly first.");
        let err = repo.commit_crystallization(Some(&h2), &run).await.unwrap_err();
        assert!(matches!(err, DomainError::AppendConflict { .. }));
        assert_eq!(repo.heuristics().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_usage_and_removal() {
        let repo = setup().await;
        let (h, run) = accepted(PracticeDomain::Code, "Check boundary indices in every loop.");
        repo.commit_crystallization(Some(&h), &run).await.unwrap();

        let at = Utc::now();
        repo.record_usage(h.id, at).await.unwrap();
        repo.record_usage(h.id, at).await.unwrap();
        let stored = &repo.heuristics().await.unwrap()[0];
        assert_eq!(stored.usage_count, 2);
        assert!(stored.last_used_at.is_some());

        assert!(repo.record_usage(Uuid::new_v4(), at).await.is_err());
        assert_eq!(repo.remove_heuristics(&[h.id, Uuid::new_v4()]).await.unwrap(), 1);
        assert!(repo.heuristics().await.unwrap().is_empty());
    }
}
