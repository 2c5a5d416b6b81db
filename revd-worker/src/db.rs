//! Review version access for the worker

use chrono::Utc;
use revd_common::model::ReviewVersion;
use revd_common::Result;
use sqlx::SqlitePool;

/// Fetch a review version by id
pub async fn get_review_version(pool: &SqlitePool, id: i64) -> Result<Option<ReviewVersion>> {
    let row = sqlx::query_as::<_, ReviewVersion>(
        r#"
        SELECT id, text, stars, review_id, tone, sentiment, category_id, created_at, updated_at
        FROM review_version
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Write classified labels into a review version, null-preserving
///
/// COALESCE keeps any label that is already set, so a re-run of a
/// partially completed job fills only the remaining null field and a
/// `both` job commits in one statement. `stars` and `text` are never
/// touched here.
pub async fn apply_labels(
    pool: &SqlitePool,
    review_version_id: i64,
    tone: Option<&str>,
    sentiment: Option<&str>,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE review_version
        SET tone = COALESCE(tone, ?),
            sentiment = COALESCE(sentiment, ?),
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(tone)
    .bind(sentiment)
    .bind(Utc::now())
    .bind(review_version_id)
    .execute(pool)
    .await?;

    Ok(())
}
