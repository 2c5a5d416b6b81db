//! Enrichment job queue
//!
//! Background classification jobs are rows in the shared `enrichment_job`
//! table, giving at-least-once delivery between the API and worker
//! binaries without an external broker. The API enqueues, the worker
//! claims with an atomic `queued` -> `running` flip. A worker crash
//! leaves `running` rows behind; `recover_stale` requeues them at worker
//! startup.

use crate::model::ReviewVersion;
use crate::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// Which derived fields a job must fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MissingKind {
    Tone,
    Sentiment,
    Both,
}

impl MissingKind {
    /// Classify a row's missing-field state.
    ///
    /// Returns `None` when both fields are already set (no job needed).
    pub fn for_row(row: &ReviewVersion) -> Option<MissingKind> {
        match (row.tone.is_none(), row.sentiment.is_none()) {
            (true, true) => Some(MissingKind::Both),
            (true, false) => Some(MissingKind::Tone),
            (false, true) => Some(MissingKind::Sentiment),
            (false, false) => None,
        }
    }

    pub fn wants_tone(self) -> bool {
        matches!(self, MissingKind::Tone | MissingKind::Both)
    }

    pub fn wants_sentiment(self) -> bool {
        matches!(self, MissingKind::Sentiment | MissingKind::Both)
    }
}

/// Queue states of an enrichment job
pub mod state {
    pub const QUEUED: &str = "queued";
    pub const RUNNING: &str = "running";
    pub const DONE: &str = "done";
    pub const FAILED: &str = "failed";
}

/// Payload handed from the dispatcher to the worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEnrichmentJob {
    pub review_version_id: i64,
    pub missing: MissingKind,
    pub text: Option<String>,
    pub stars: i64,
}

impl NewEnrichmentJob {
    /// Build the payload for a page row, or `None` when nothing is missing
    pub fn for_row(row: &ReviewVersion) -> Option<Self> {
        MissingKind::for_row(row).map(|missing| Self {
            review_version_id: row.id,
            missing,
            text: row.text.clone(),
            stars: row.stars,
        })
    }
}

/// A claimed or inspected queue row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrichmentJob {
    pub id: i64,
    pub review_version_id: i64,
    pub missing: MissingKind,
    pub text: Option<String>,
    pub stars: i64,
    pub state: String,
    pub attempts: i64,
    pub last_error: Option<String>,
}

/// Hand a job off to the queue
pub async fn enqueue(pool: &SqlitePool, job: &NewEnrichmentJob) -> Result<i64> {
    let now = Utc::now();
    let result = sqlx::query(
        r#"
        INSERT INTO enrichment_job
            (review_version_id, missing, text, stars, state, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'queued', ?, ?)
        "#,
    )
    .bind(job.review_version_id)
    .bind(job.missing)
    .bind(&job.text)
    .bind(job.stars)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Atomically claim the oldest queued job, flipping it to `running`
///
/// Returns `None` when the queue is empty. The attempt counter is bumped
/// on claim so the retry bound counts executions, not failures.
pub async fn claim_next(pool: &SqlitePool) -> Result<Option<EnrichmentJob>> {
    let job = sqlx::query_as::<_, EnrichmentJob>(
        r#"
        UPDATE enrichment_job
        SET state = 'running', attempts = attempts + 1, updated_at = ?
        WHERE id = (
            SELECT id FROM enrichment_job WHERE state = 'queued' ORDER BY id LIMIT 1
        )
        RETURNING id, review_version_id, missing, text, stars, state, attempts, last_error
        "#,
    )
    .bind(Utc::now())
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

/// Mark a job complete
pub async fn mark_done(pool: &SqlitePool, job_id: i64) -> Result<()> {
    sqlx::query("UPDATE enrichment_job SET state = 'done', updated_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Mark a job terminally failed (no further retries)
pub async fn mark_failed(pool: &SqlitePool, job_id: i64, error: &str) -> Result<()> {
    sqlx::query(
        "UPDATE enrichment_job SET state = 'failed', last_error = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error)
    .bind(Utc::now())
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Return a failed attempt to the queue for another try
pub async fn requeue(pool: &SqlitePool, job_id: i64, error: &str) -> Result<()> {
    sqlx::query(
        "UPDATE enrichment_job SET state = 'queued', last_error = ?, updated_at = ? WHERE id = ?",
    )
    .bind(error)
    .bind(Utc::now())
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Requeue jobs left `running` by a crashed worker
///
/// Called once at worker startup, before the claim loop begins.
pub async fn recover_stale(pool: &SqlitePool) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE enrichment_job SET state = 'queued', updated_at = ? WHERE state = 'running'",
    )
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let recovered = result.rows_affected();
    if recovered > 0 {
        tracing::warn!("Requeued {} stale running job(s) from previous run", recovered);
    }
    Ok(recovered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(tone: Option<&str>, sentiment: Option<&str>) -> ReviewVersion {
        ReviewVersion {
            id: 1,
            text: Some("solid build".to_string()),
            stars: 8,
            review_id: "r1".to_string(),
            tone: tone.map(String::from),
            sentiment: sentiment.map(String::from),
            category_id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_missing_kind_covers_all_four_cases() {
        assert_eq!(MissingKind::for_row(&row(None, None)), Some(MissingKind::Both));
        assert_eq!(
            MissingKind::for_row(&row(None, Some("happy"))),
            Some(MissingKind::Tone)
        );
        assert_eq!(
            MissingKind::for_row(&row(Some("calm"), None)),
            Some(MissingKind::Sentiment)
        );
        assert_eq!(MissingKind::for_row(&row(Some("calm"), Some("happy"))), None);
    }

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::db::init_tables(&pool).await.unwrap();
        pool
    }

    fn payload(id: i64, missing: MissingKind) -> NewEnrichmentJob {
        NewEnrichmentJob {
            review_version_id: id,
            missing,
            text: Some("good".to_string()),
            stars: 7,
        }
    }

    #[tokio::test]
    async fn test_claim_transitions_exactly_one_job() {
        let pool = setup_pool().await;
        enqueue(&pool, &payload(1, MissingKind::Both)).await.unwrap();
        enqueue(&pool, &payload(2, MissingKind::Tone)).await.unwrap();

        let first = claim_next(&pool).await.unwrap().unwrap();
        assert_eq!(first.review_version_id, 1);
        assert_eq!(first.state, state::RUNNING);
        assert_eq!(first.attempts, 1);

        let queued: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM enrichment_job WHERE state = 'queued'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(queued, 1);
    }

    #[tokio::test]
    async fn test_claim_returns_none_on_empty_queue() {
        let pool = setup_pool().await;
        assert!(claim_next(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requeue_allows_another_claim_with_bumped_attempts() {
        let pool = setup_pool().await;
        enqueue(&pool, &payload(1, MissingKind::Sentiment)).await.unwrap();

        let job = claim_next(&pool).await.unwrap().unwrap();
        requeue(&pool, job.id, "classifier timeout").await.unwrap();

        let retried = claim_next(&pool).await.unwrap().unwrap();
        assert_eq!(retried.id, job.id);
        assert_eq!(retried.attempts, 2);
        assert_eq!(retried.last_error.as_deref(), Some("classifier timeout"));
    }

    #[tokio::test]
    async fn test_done_and_failed_jobs_are_not_reclaimed() {
        let pool = setup_pool().await;
        enqueue(&pool, &payload(1, MissingKind::Both)).await.unwrap();
        enqueue(&pool, &payload(2, MissingKind::Both)).await.unwrap();

        let a = claim_next(&pool).await.unwrap().unwrap();
        mark_done(&pool, a.id).await.unwrap();
        let b = claim_next(&pool).await.unwrap().unwrap();
        mark_failed(&pool, b.id, "review version not found").await.unwrap();

        assert!(claim_next(&pool).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_recover_stale_requeues_running_jobs() {
        let pool = setup_pool().await;
        enqueue(&pool, &payload(1, MissingKind::Tone)).await.unwrap();
        claim_next(&pool).await.unwrap().unwrap();

        let recovered = recover_stale(&pool).await.unwrap();
        assert_eq!(recovered, 1);

        // Claimable again after recovery
        assert!(claim_next(&pool).await.unwrap().is_some());
    }
}
