//! Fire-and-forget hand-offs from the read path
//!
//! The read path never waits on background work: access logging is
//! spawned off the request task, and enrichment dispatch swallows queue
//! failures after logging them. A failed hand-off is the worker's loss,
//! not the client's.

use revd_common::jobs::{self, NewEnrichmentJob};
use revd_common::model::ReviewVersion;
use sqlx::SqlitePool;
use tracing::{debug, warn};

/// Record a read request in the access log without blocking it
pub fn log_access(pool: &SqlitePool, text: impl Into<String>) {
    let pool = pool.clone();
    let text = text.into();
    tokio::spawn(async move {
        if let Err(e) = crate::db::access_log::record(&pool, &text).await {
            warn!("Access log write failed: {}", e);
        }
    });
}

/// Enqueue enrichment jobs for every page row missing tone or sentiment
///
/// Each row gets at most one job covering its full missing-field set;
/// rows with both annotations get none. Per-row enqueue failures are
/// logged and skipped, and the page the caller already holds is returned
/// unchanged either way. Concurrent reads may enqueue duplicates for the
/// same version; the worker is idempotent, so that is tolerated rather
/// than locked against.
pub async fn dispatch_missing(pool: &SqlitePool, rows: &[ReviewVersion]) -> usize {
    let mut enqueued = 0;

    for row in rows {
        let Some(job) = NewEnrichmentJob::for_row(row) else {
            continue;
        };

        match jobs::enqueue(pool, &job).await {
            Ok(job_id) => {
                debug!(
                    "Enqueued enrichment job {} (review_version_id={}, missing={:?})",
                    job_id, job.review_version_id, job.missing
                );
                enqueued += 1;
            }
            Err(e) => {
                warn!(
                    "Enrichment dispatch failed for review_version_id={}: {}",
                    row.id, e
                );
            }
        }
    }

    enqueued
}
