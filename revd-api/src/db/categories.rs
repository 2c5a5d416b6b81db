//! Category queries

use revd_common::model::Category;
use revd_common::Result;
use sqlx::SqlitePool;

/// Insert a category (administrative)
///
/// The unique name constraint surfaces as a database error the handler
/// maps to 409.
pub async fn insert_category(
    pool: &SqlitePool,
    name: &str,
    description: Option<&str>,
) -> Result<Category> {
    let row = sqlx::query_as::<_, Category>(
        r#"
        INSERT INTO category (name, description)
        VALUES (?, ?)
        RETURNING id, name, description
        "#,
    )
    .bind(name)
    .bind(description)
    .fetch_one(pool)
    .await?;

    Ok(row)
}
