//! Review version queries
//!
//! Latest-version resolution, trends aggregation, and cursor pagination.
//! All three read paths are built on one relational resolver query so the
//! "latest row per logical review" rule lives in exactly one place.

use revd_common::cursor::PageCursor;
use revd_common::model::{validate_stars, CategoryTrend, ReviewVersion};
use revd_common::{Error, Result};
use chrono::Utc;
use sqlx::SqlitePool;

/// Latest-Version Resolver
///
/// One row per distinct `review_id`: the row with maximum `created_at`,
/// ties broken by maximum `id` (most recently inserted). Expressed as a
/// window query so it stays correct under concurrent writes and scales
/// with row count rather than version history depth.
const LATEST_VERSION_ROWS: &str = r#"
    SELECT id, text, stars, review_id, tone, sentiment, category_id, created_at, updated_at
    FROM (
        SELECT rv.*,
               ROW_NUMBER() OVER (
                   PARTITION BY review_id
                   ORDER BY created_at DESC, id DESC
               ) AS row_rank
        FROM review_version rv
    )
    WHERE row_rank = 1
"#;

/// One page of latest-version reviews plus the continuation token
#[derive(Debug)]
pub struct ReviewPage {
    pub reviews: Vec<ReviewVersion>,
    pub next_cursor: Option<PageCursor>,
}

/// Fetch one page of latest-version reviews for a category
///
/// Rows are ordered by `(created_at, id)` descending and restricted to
/// positions strictly before the cursor when one is supplied. The
/// composite cursor keeps the page boundary exact even when several rows
/// share one `created_at`.
pub async fn page_by_category(
    pool: &SqlitePool,
    category_id: i64,
    cursor: Option<PageCursor>,
    page_size: i64,
) -> Result<ReviewPage> {
    let reviews = match cursor {
        Some(cursor) => {
            let sql = format!(
                r#"
                SELECT * FROM ({LATEST_VERSION_ROWS})
                WHERE category_id = ?
                  AND (created_at < ? OR (created_at = ? AND id < ?))
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#
            );
            sqlx::query_as::<_, ReviewVersion>(&sql)
                .bind(category_id)
                .bind(cursor.created_at)
                .bind(cursor.created_at)
                .bind(cursor.id)
                .bind(page_size)
                .fetch_all(pool)
                .await?
        }
        None => {
            let sql = format!(
                r#"
                SELECT * FROM ({LATEST_VERSION_ROWS})
                WHERE category_id = ?
                ORDER BY created_at DESC, id DESC
                LIMIT ?
                "#
            );
            sqlx::query_as::<_, ReviewVersion>(&sql)
                .bind(category_id)
                .bind(page_size)
                .fetch_all(pool)
                .await?
        }
    };

    // A short page signals exhaustion; only a full page carries a cursor.
    let next_cursor = if reviews.len() as i64 == page_size {
        reviews
            .last()
            .map(|last| PageCursor::new(last.created_at, last.id))
    } else {
        None
    };

    Ok(ReviewPage {
        reviews,
        next_cursor,
    })
}

/// Top categories by average stars over latest-version reviews
///
/// Averages are computed over only the latest version of each logical
/// review, unrounded; ties on the average break by ascending category id
/// to keep the ranking deterministic.
pub async fn category_trends(pool: &SqlitePool, limit: i64) -> Result<Vec<CategoryTrend>> {
    let sql = format!(
        r#"
        SELECT c.id, c.name, c.description,
               AVG(latest.stars) AS average_stars,
               COUNT(latest.id) AS total_reviews
        FROM ({LATEST_VERSION_ROWS}) latest
        JOIN category c ON c.id = latest.category_id
        GROUP BY c.id
        ORDER BY average_stars DESC, c.id ASC
        LIMIT ?
        "#
    );

    let trends = sqlx::query_as::<_, CategoryTrend>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(trends)
}

/// Input for appending a review version
#[derive(Debug, Clone)]
pub struct NewReviewVersion {
    pub review_id: String,
    pub text: Option<String>,
    pub stars: i64,
    pub category_id: i64,
}

/// Append a review version row
///
/// Edits never mutate existing rows; a new stars/text for a logical
/// review is a fresh row sharing its `review_id`. Rejects stars outside
/// [1, 10] and unknown categories.
pub async fn insert_review_version(
    pool: &SqlitePool,
    new: &NewReviewVersion,
) -> Result<ReviewVersion> {
    validate_stars(new.stars)?;

    let category_exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM category WHERE id = ?)")
            .bind(new.category_id)
            .fetch_one(pool)
            .await?;
    if !category_exists {
        return Err(Error::Validation(format!(
            "unknown category_id: {}",
            new.category_id
        )));
    }

    let now = Utc::now();
    let row = sqlx::query_as::<_, ReviewVersion>(
        r#"
        INSERT INTO review_version (text, stars, review_id, category_id, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING id, text, stars, review_id, tone, sentiment, category_id, created_at, updated_at
        "#,
    )
    .bind(&new.text)
    .bind(new.stars)
    .bind(&new.review_id)
    .bind(new.category_id)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, Utc};

    async fn setup_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        revd_common::db::init_tables(&pool).await.unwrap();
        sqlx::query("INSERT INTO category (id, name) VALUES (1, 'Electronics'), (2, 'Books')")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    async fn insert_version(
        pool: &SqlitePool,
        review_id: &str,
        stars: i64,
        category_id: i64,
        created_at: DateTime<Utc>,
    ) -> i64 {
        sqlx::query(
            r#"
            INSERT INTO review_version (text, stars, review_id, category_id, created_at, updated_at)
            VALUES ('t', ?, ?, ?, ?, ?)
            "#,
        )
        .bind(stars)
        .bind(review_id)
        .bind(category_id)
        .bind(created_at)
        .bind(created_at)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    #[tokio::test]
    async fn test_resolver_returns_one_row_per_logical_review() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        insert_version(&pool, "r1", 8, 1, t0).await;
        insert_version(&pool, "r1", 9, 1, t0 + Duration::seconds(10)).await;
        insert_version(&pool, "r2", 3, 1, t0).await;

        let page = page_by_category(&pool, 1, None, 10).await.unwrap();
        assert_eq!(page.reviews.len(), 2);

        let r1 = page.reviews.iter().find(|r| r.review_id == "r1").unwrap();
        assert_eq!(r1.stars, 9);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_resolver_breaks_created_at_ties_by_max_id() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        let first = insert_version(&pool, "r1", 5, 1, t0).await;
        let second = insert_version(&pool, "r1", 7, 1, t0).await;
        assert!(second > first);

        let page = page_by_category(&pool, 1, None, 10).await.unwrap();
        assert_eq!(page.reviews.len(), 1);
        assert_eq!(page.reviews[0].id, second);
        assert_eq!(page.reviews[0].stars, 7);
    }

    #[tokio::test]
    async fn test_pagination_walk_has_no_gaps_or_duplicates() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        for i in 0..7 {
            insert_version(&pool, &format!("r{i}"), 5, 1, t0 + Duration::seconds(i)).await;
        }

        let mut seen = Vec::new();
        let mut cursor = None;
        loop {
            let page = page_by_category(&pool, 1, cursor, 3).await.unwrap();
            seen.extend(page.reviews.iter().map(|r| r.id));
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        assert_eq!(seen.len(), 7);
        let mut deduped = seen.clone();
        deduped.dedup();
        assert_eq!(deduped.len(), 7);
        // Strictly descending insertion order (later timestamps first)
        assert!(seen.windows(2).all(|w| w[0] > w[1]));
    }

    #[tokio::test]
    async fn test_pagination_exact_at_identical_timestamp_boundary() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        // Four distinct logical reviews sharing one created_at: a
        // timestamp-only cursor would skip or repeat across this boundary.
        for i in 0..4 {
            insert_version(&pool, &format!("same{i}"), 6, 1, t0).await;
        }

        let first = page_by_category(&pool, 1, None, 2).await.unwrap();
        assert_eq!(first.reviews.len(), 2);
        let second = page_by_category(&pool, 1, first.next_cursor, 2).await.unwrap();
        assert_eq!(second.reviews.len(), 2);

        // The second page is full, so exhaustion only shows on the third.
        if let Some(cursor) = second.next_cursor {
            let third = page_by_category(&pool, 1, Some(cursor), 2).await.unwrap();
            assert!(third.reviews.is_empty());
            assert!(third.next_cursor.is_none());
        }

        let mut ids: Vec<i64> = first
            .reviews
            .iter()
            .chain(second.reviews.iter())
            .map(|r| r.id)
            .collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_trends_use_latest_versions_only_and_sort_descending() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        // Category 1: r1 edited from 2 to 9 stars; only the 9 counts.
        insert_version(&pool, "r1", 2, 1, t0).await;
        insert_version(&pool, "r1", 9, 1, t0 + Duration::seconds(1)).await;
        // Category 2: two logical reviews averaging 7.0
        insert_version(&pool, "b1", 6, 2, t0).await;
        insert_version(&pool, "b2", 8, 2, t0).await;

        let trends = category_trends(&pool, 5).await.unwrap();
        assert_eq!(trends.len(), 2);
        assert_eq!(trends[0].id, 1);
        assert_eq!(trends[0].average_stars, 9.0);
        assert_eq!(trends[0].total_reviews, 1);
        assert_eq!(trends[1].id, 2);
        assert_eq!(trends[1].average_stars, 7.0);
        assert_eq!(trends[1].total_reviews, 2);
    }

    #[tokio::test]
    async fn test_trends_tie_breaks_by_ascending_category_id() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        insert_version(&pool, "a", 7, 2, t0).await;
        insert_version(&pool, "b", 7, 1, t0).await;

        let trends = category_trends(&pool, 5).await.unwrap();
        assert_eq!(trends[0].id, 1);
        assert_eq!(trends[1].id, 2);
    }

    #[tokio::test]
    async fn test_trends_limit_returns_top_n() {
        let pool = setup_pool().await;
        let t0 = Utc::now();
        insert_version(&pool, "a", 9, 1, t0).await;
        insert_version(&pool, "b", 7, 2, t0).await;

        let trends = category_trends(&pool, 1).await.unwrap();
        assert_eq!(trends.len(), 1);
        assert_eq!(trends[0].id, 1);
    }

    #[tokio::test]
    async fn test_insert_rejects_out_of_range_stars() {
        let pool = setup_pool().await;
        for stars in [0, 11] {
            let result = insert_review_version(
                &pool,
                &NewReviewVersion {
                    review_id: "r1".to_string(),
                    text: None,
                    stars,
                    category_id: 1,
                },
            )
            .await;
            assert!(matches!(result, Err(Error::Validation(_))));
        }
    }

    #[tokio::test]
    async fn test_insert_rejects_unknown_category() {
        let pool = setup_pool().await;
        let result = insert_review_version(
            &pool,
            &NewReviewVersion {
                review_id: "r1".to_string(),
                text: None,
                stars: 5,
                category_id: 99,
            },
        )
        .await;
        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_insert_leaves_annotations_null() {
        let pool = setup_pool().await;
        let row = insert_review_version(
            &pool,
            &NewReviewVersion {
                review_id: "r1".to_string(),
                text: Some("great".to_string()),
                stars: 8,
                category_id: 1,
            },
        )
        .await
        .unwrap();

        assert!(row.tone.is_none());
        assert!(row.sentiment.is_none());
        assert_eq!(row.created_at, row.updated_at);
    }
}
