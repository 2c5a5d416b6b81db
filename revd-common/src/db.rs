//! Database pool and schema initialization
//!
//! All REVD binaries share a single SQLite database file. Each binary
//! opens its own pool and calls `init_tables` at startup; creation is
//! idempotent so startup order between the binaries does not matter.

use crate::Result;
use sqlx::SqlitePool;
use std::path::Path;

/// Initialize database connection pool
///
/// Connects to the shared revd.db in the data folder, creating the file
/// and schema on first use.
pub async fn init_database_pool(db_path: &Path) -> Result<SqlitePool> {
    // Ensure parent directory exists
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Proper SQLite URI with mode=rwc (read, write, create)
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    tracing::debug!("Connecting to database: {}", db_url);

    let pool = SqlitePool::connect(&db_url).await?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create all REVD tables and indices if they don't exist
pub async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS review_version (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT,
            stars INTEGER NOT NULL,
            review_id TEXT NOT NULL,
            tone TEXT,
            sentiment TEXT,
            category_id INTEGER NOT NULL REFERENCES category(id),
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Latest-version resolution groups by review_id; listings scan per
    // category in reverse chronological order.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_version_review_id
         ON review_version (review_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_review_version_category_recency
         ON review_version (category_id, created_at DESC, id DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS access_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            text TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS enrichment_job (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_version_id INTEGER NOT NULL,
            missing TEXT NOT NULL,
            text TEXT,
            stars INTEGER NOT NULL,
            state TEXT NOT NULL DEFAULT 'queued',
            attempts INTEGER NOT NULL DEFAULT 0,
            last_error TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_enrichment_job_state
         ON enrichment_job (state, id)",
    )
    .execute(pool)
    .await?;

    tracing::info!(
        "Database tables initialized (category, review_version, access_log, enrichment_job)"
    );

    Ok(())
}
