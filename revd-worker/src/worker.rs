//! Enrichment worker loop
//!
//! Claims jobs from the shared queue and runs each through the
//! per-job state machine: fetch review -> classify missing label(s) ->
//! persist -> done. A missing review is terminal; classification
//! failures go back to the queue until the attempt bound is reached.
//! Retry pacing is the queue policy's concern, not the worker's.

use crate::classifier::{Classifier, LabelKind};
use crate::db;
use revd_common::jobs::{self, EnrichmentJob};
use revd_common::Result;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Worker tuning knobs
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Delay between queue polls when no work is available
    pub poll_interval: Duration,
    /// Executions allowed per job before it is marked failed
    pub max_attempts: i64,
    /// Number of concurrent claim loops
    pub concurrency: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_attempts: 5,
            concurrency: 2,
        }
    }
}

/// Background enrichment worker
pub struct EnrichmentWorker {
    db: SqlitePool,
    classifier: Arc<dyn Classifier>,
    config: WorkerConfig,
}

impl EnrichmentWorker {
    pub fn new(db: SqlitePool, classifier: Arc<dyn Classifier>, config: WorkerConfig) -> Self {
        Self {
            db,
            classifier,
            config,
        }
    }

    /// Run the claim loops until shutdown
    ///
    /// Requeues jobs stranded `running` by a previous crash, then spawns
    /// the configured number of claim loops. Each loop finishes its
    /// in-flight job before exiting.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<()> {
        jobs::recover_stale(&self.db).await?;

        let mut handles = Vec::new();
        for worker_id in 0..self.config.concurrency {
            let worker = Arc::clone(&self);
            let shutdown = shutdown.clone();
            handles.push(tokio::spawn(async move {
                worker.claim_loop(worker_id, shutdown).await;
            }));
        }
        info!(
            "Enrichment worker started with {} claim loop(s)",
            self.config.concurrency
        );

        for handle in handles {
            if let Err(e) = handle.await {
                error!("Claim loop panicked: {}", e);
            }
        }

        info!("Enrichment worker stopped");
        Ok(())
    }

    async fn claim_loop(&self, worker_id: usize, shutdown: CancellationToken) {
        debug!("Claim loop {} started", worker_id);

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            match jobs::claim_next(&self.db).await {
                Ok(Some(job)) => {
                    let job_id = job.id;
                    if let Err(e) = self.process_job(job).await {
                        // Database trouble mid-job; the row stays
                        // `running` and the startup sweep reclaims it.
                        error!("Job {} processing error: {}", job_id, e);
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {},
                        _ = shutdown.cancelled() => break,
                    }
                }
                Err(e) => {
                    error!("Queue claim failed: {}", e);
                    tokio::select! {
                        _ = tokio::time::sleep(self.config.poll_interval) => {},
                        _ = shutdown.cancelled() => break,
                    }
                }
            }
        }

        debug!("Claim loop {} exiting", worker_id);
    }

    /// Run one claimed job through the enrichment state machine
    pub async fn process_job(&self, job: EnrichmentJob) -> Result<()> {
        debug!(
            "Processing job {} (review_version_id={}, missing={:?}, attempt {})",
            job.id, job.review_version_id, job.missing, job.attempts
        );

        // Fetching review
        let Some(review) = db::get_review_version(&self.db, job.review_version_id).await? else {
            // The job references a deleted row; retrying cannot help.
            warn!(
                "Job {} references missing review version {}, failing terminally",
                job.id, job.review_version_id
            );
            jobs::mark_failed(&self.db, job.id, "review version not found").await?;
            return Ok(());
        };

        // A duplicate enqueue or a partially completed earlier attempt may
        // have filled some fields already; classify only what is still null.
        let want_tone = job.missing.wants_tone() && review.tone.is_none();
        let want_sentiment = job.missing.wants_sentiment() && review.sentiment.is_none();

        // Classifying, tone first, sequentially
        let mut tone: Option<String> = None;
        if want_tone {
            match self
                .classifier
                .classify(LabelKind::Tone, job.text.as_deref(), job.stars)
                .await
            {
                Ok(label) => tone = Some(label),
                Err(e) => return self.classification_failed(&job, None, e.to_string()).await,
            }
        }

        let mut sentiment: Option<String> = None;
        if want_sentiment {
            match self
                .classifier
                .classify(LabelKind::Sentiment, job.text.as_deref(), job.stars)
                .await
            {
                Ok(label) => sentiment = Some(label),
                Err(e) => {
                    // Keep the tone already earned; the retry fills the rest.
                    return self.classification_failed(&job, tone, e.to_string()).await;
                }
            }
        }

        // Persisting: one UPDATE covers tone, sentiment, or both
        if tone.is_some() || sentiment.is_some() {
            db::apply_labels(
                &self.db,
                job.review_version_id,
                tone.as_deref(),
                sentiment.as_deref(),
            )
            .await?;
            info!(
                "Enriched review version {} (tone={}, sentiment={})",
                job.review_version_id,
                tone.is_some(),
                sentiment.is_some()
            );
        } else {
            debug!(
                "Job {} had nothing left to fill for review version {}",
                job.id, job.review_version_id
            );
        }

        jobs::mark_done(&self.db, job.id).await?;
        Ok(())
    }

    /// Handle a classification failure per the queue's retry policy
    async fn classification_failed(
        &self,
        job: &EnrichmentJob,
        partial_tone: Option<String>,
        error: String,
    ) -> Result<()> {
        if let Some(tone) = partial_tone.as_deref() {
            db::apply_labels(&self.db, job.review_version_id, Some(tone), None).await?;
        }

        if job.attempts >= self.config.max_attempts {
            warn!(
                "Job {} failed after {} attempt(s), giving up: {}",
                job.id, job.attempts, error
            );
            jobs::mark_failed(&self.db, job.id, &error).await?;
        } else {
            warn!(
                "Job {} attempt {} failed, requeueing: {}",
                job.id, job.attempts, error
            );
            jobs::requeue(&self.db, job.id, &error).await?;
        }
        Ok(())
    }
}
