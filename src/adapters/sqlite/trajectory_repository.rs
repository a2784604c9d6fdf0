//! SQLite implementation of the TrajectoryRepository.
//!
//! The table is guarded by triggers that abort any UPDATE or DELETE, and
//! this adapter only ever inserts. Rows are ordered by `rowid`, which is
//! append order.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::{
    map_insert_error, parse_count, parse_datetime, parse_domain, parse_uuid, sql_limit,
};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{PracticeDomain, Trajectory};
use crate::domain::ports::TrajectoryRepository;

const SELECT_COLUMNS: &str = "SELECT id, candidate_ref, domain, difficulty, problem, solution, success, \
     partial_score, verification, created_at FROM trajectories";

#[derive(Clone)]
pub struct SqliteTrajectoryRepository {
    pool: SqlitePool,
}

impl SqliteTrajectoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TrajectoryRepository for SqliteTrajectoryRepository {
    async fn append(&self, trajectory: &Trajectory) -> DomainResult<()> {
        let problem_json = serde_json::to_string(&trajectory.problem)?;

        sqlx::query(
            r#"INSERT INTO trajectories (id, candidate_ref, domain, difficulty, problem, solution,
               success, partial_score, verification, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(trajectory.id.to_string())
        .bind(trajectory.candidate_ref.to_string())
        .bind(trajectory.domain.as_str())
        .bind(i64::from(trajectory.difficulty))
        .bind(&problem_json)
        .bind(&trajectory.solution)
        .bind(trajectory.success)
        .bind(trajectory.partial_score)
        .bind(trajectory.verification.as_str())
        .bind(trajectory.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| map_insert_error(e, "trajectory", trajectory.id))?;

        Ok(())
    }

    async fn recent_successes(&self, domain: PracticeDomain, limit: usize) -> DomainResult<Vec<Trajectory>> {
        let query = format!("{SELECT_COLUMNS} WHERE domain = ? AND success = 1 ORDER BY rowid DESC LIMIT ?");
        let rows: Vec<TrajectoryRow> = sqlx::query_as(&query)
            .bind(domain.as_str())
            .bind(sql_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Trajectory::try_from).collect()
    }

    async fn successes(&self, domain: PracticeDomain) -> DomainResult<Vec<Trajectory>> {
        let query = format!("{SELECT_COLUMNS} WHERE domain = ? AND success = 1 ORDER BY rowid ASC");
        let rows: Vec<TrajectoryRow> = sqlx::query_as(&query)
            .bind(domain.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Trajectory::try_from).collect()
    }

    async fn count_successes(&self, domain: PracticeDomain) -> DomainResult<u64> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM trajectories WHERE domain = ? AND success = 1")
                .bind(domain.as_str())
                .fetch_one(&self.pool)
                .await?;

        parse_count(count, "success count")
    }

    async fn history(&self, domain: PracticeDomain) -> DomainResult<Vec<Trajectory>> {
        let query = format!("{SELECT_COLUMNS} WHERE domain = ? ORDER BY rowid ASC");
        let rows: Vec<TrajectoryRow> = sqlx::query_as(&query)
            .bind(domain.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Trajectory::try_from).collect()
    }
}

#[derive(sqlx::FromRow)]
struct TrajectoryRow {
    id: String,
    candidate_ref: String,
    domain: String,
    difficulty: i64,
    problem: String,
    solution: String,
    success: bool,
    partial_score: f64,
    verification: String,
    created_at: String,
}

impl TryFrom<TrajectoryRow> for Trajectory {
    type Error = DomainError;

    fn try_from(row: TrajectoryRow) -> Result<Self, Self::Error> {
        Ok(Trajectory {
            id: parse_uuid(&row.id)?,
            candidate_ref: parse_uuid(&row.candidate_ref)?,
            domain: parse_domain(&row.domain)?,
            difficulty: parse_count(row.difficulty, "difficulty")?,
            problem: serde_json::from_str(&row.problem)?,
            solution: row.solution,
            success: row.success,
            partial_score: row.partial_score,
            verification: row.verification.parse()?,
            created_at: parse_datetime(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_migrated_test_pool;
    use crate::domain::models::{Oracle, PracticeProblem, VerificationTier};
    use uuid::Uuid;

    fn trajectory(domain: PracticeDomain, success: bool, difficulty: u8) -> Trajectory {
        Trajectory {
            id: Uuid::new_v4(),
            candidate_ref: Uuid::new_v4(),
            domain,
            difficulty,
            problem: PracticeProblem {
                id: Uuid::new_v4(),
                domain,
                difficulty,
                specification: "Sum the even numbers in a list.".to_string(),
                oracle: Oracle::TestSuite {
                    code: "print('ORACLE PASS')".to_string(),
                },
            },
            solution: "def f(xs): return sum(x for x in xs if x % 2 == 0)".to_string(),
            success,
            partial_score: if success { 1.0 } else { 0.25 },
            verification: VerificationTier::Oracle,
            created_at: chrono::Utc::now(),
        }
    }

    async fn setup() -> SqliteTrajectoryRepository {
        let pool = create_migrated_test_pool().await.unwrap();
        SqliteTrajectoryRepository::new(pool)
    }

    #[tokio::test]
    async fn test_append_and_history_roundtrip() {
        let repo = setup().await;
        let t = trajectory(PracticeDomain::Code, true, 2);
        repo.append(&t).await.unwrap();

        let history = repo.history(PracticeDomain::Code).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, t.id);
        assert_eq!(history[0].difficulty, 2);
        assert_eq!(history[0].problem, t.problem);
    }

    #[tokio::test]
    async fn test_duplicate_append_is_conflict() {
        let repo = setup().await;
        let t = trajectory(PracticeDomain::Math, true, 1);
        repo.append(&t).await.unwrap();

        let err = repo.append(&t).await.unwrap_err();
        assert!(matches!(err, DomainError::AppendConflict { .. }));
    }

    #[tokio::test]
    async fn test_recent_successes_newest_first() {
        let repo = setup().await;
        let mut ids = Vec::new();
        for i in 0..4 {
            let t = trajectory(PracticeDomain::Code, i != 2, 1);
            ids.push(t.id);
            repo.append(&t).await.unwrap();
        }
        repo.append(&trajectory(PracticeDomain::Math, true, 1)).await.unwrap();

        let recent = repo.recent_successes(PracticeDomain::Code, 2).await.unwrap();
        assert_eq!(recent.iter().map(|t| t.id).collect::<Vec<_>>(), vec![ids[3], ids[1]]);
        assert_eq!(repo.count_successes(PracticeDomain::Code).await.unwrap(), 3);
        assert_eq!(repo.successes(PracticeDomain::Code).await.unwrap()[0].id, ids[0]);
    }

    #[tokio::test]
    async fn test_table_rejects_update_and_delete() {
        let pool = create_migrated_test_pool().await.unwrap();
        let repo = SqliteTrajectoryRepository::new(pool.clone());
        repo.append(&trajectory(PracticeDomain::Logic, true, 1)).await.unwrap();

        assert!(sqlx::query("UPDATE trajectories SET success = 0").execute(&pool).await.is_err());
        assert!(sqlx::query("DELETE FROM trajectories").execute(&pool).await.is_err());
        assert_eq!(repo.history(PracticeDomain::Logic).await.unwrap().len(), 1);
    }
}
