//! Access log inserts
//!
//! Append-only audit rows. Never read by the core; retention is out of
//! scope.

use revd_common::Result;
use sqlx::SqlitePool;

/// Record one access log entry
pub async fn record(pool: &SqlitePool, text: &str) -> Result<()> {
    sqlx::query("INSERT INTO access_log (text) VALUES (?)")
        .bind(text)
        .execute(pool)
        .await?;
    Ok(())
}
