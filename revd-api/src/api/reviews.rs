//! Review endpoints
//!
//! Read paths serve the latest version of each logical review and hand
//! rows with missing annotations to the enrichment queue before
//! responding; the next poll of the same review observes the labels once
//! the worker has filled them in.

use crate::db::{categories, reviews};
use crate::dispatch;
use crate::error::{ApiError, ApiResult};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use revd_common::cursor::PageCursor;
use revd_common::model::{Category, CategoryTrend, ReviewVersion};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ListReviewsParams {
    pub category_id: i64,
    pub cursor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReviewListResponse {
    pub reviews: Vec<ReviewVersion>,
    pub next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateReviewRequest {
    /// Absent for a brand-new logical review; supplied to append a
    /// version to an existing one.
    pub review_id: Option<String>,
    pub text: Option<String>,
    pub stars: i64,
    pub category_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub description: Option<String>,
}

/// GET /reviews/trends - Top 5 categories by average latest-version stars
pub async fn get_review_trends(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<CategoryTrend>>> {
    dispatch::log_access(&state.db, "GET /reviews/trends");

    let trends = reviews::category_trends(&state.db, 5).await?;
    if trends.is_empty() {
        debug!("Trends query found no categories with reviews");
        return Err(ApiError::NotFound("no review trends available".to_string()));
    }

    Ok(Json(trends.into_iter().map(CategoryTrend::rounded).collect()))
}

/// GET /reviews/?category_id=<id>&cursor=<token> - Page of latest-version reviews
pub async fn get_reviews_by_category(
    State(state): State<AppState>,
    Query(params): Query<ListReviewsParams>,
) -> ApiResult<Json<ReviewListResponse>> {
    dispatch::log_access(
        &state.db,
        format!("GET /reviews/?category_id={}", params.category_id),
    );

    let cursor = params
        .cursor
        .as_deref()
        .map(PageCursor::decode)
        .transpose()?;
    let is_first_page = cursor.is_none();

    let page =
        reviews::page_by_category(&state.db, params.category_id, cursor, state.page_size).await?;

    if page.reviews.is_empty() && is_first_page {
        // An empty continuation page is normal exhaustion; only an empty
        // first page is a 404.
        debug!(
            "No reviews found for category_id={} (empty first page)",
            params.category_id
        );
        return Err(ApiError::NotFound("no reviews found".to_string()));
    }

    // Hand incomplete rows to the enrichment queue; the response never
    // waits on classification and never fails on queue trouble.
    dispatch::dispatch_missing(&state.db, &page.reviews).await;

    Ok(Json(ReviewListResponse {
        next_cursor: page.next_cursor.map(|c| c.encode()),
        reviews: page.reviews,
    }))
}

/// POST /reviews/ - Append a review version
pub async fn create_review(
    State(state): State<AppState>,
    Json(req): Json<CreateReviewRequest>,
) -> ApiResult<(StatusCode, Json<ReviewVersion>)> {
    let review_id = req
        .review_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let row = reviews::insert_review_version(
        &state.db,
        &reviews::NewReviewVersion {
            review_id,
            text: req.text,
            stars: req.stars,
            category_id: req.category_id,
        },
    )
    .await?;

    info!(
        "Created review version {} (review_id={}, category_id={})",
        row.id, row.review_id, row.category_id
    );

    Ok((StatusCode::CREATED, Json(row)))
}

/// POST /categories - Create a category (administrative)
pub async fn create_category(
    State(state): State<AppState>,
    Json(req): Json<CreateCategoryRequest>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    match categories::insert_category(&state.db, &req.name, req.description.as_deref()).await {
        Ok(category) => {
            info!("Created category {} ({})", category.id, category.name);
            Ok((StatusCode::CREATED, Json(category)))
        }
        Err(revd_common::Error::Database(e))
            if e.as_database_error()
                .map_or(false, |d| d.is_unique_violation()) =>
        {
            Err(ApiError::Conflict(format!(
                "category '{}' already exists",
                req.name
            )))
        }
        Err(e) => Err(e.into()),
    }
}
