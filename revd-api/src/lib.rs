//! revd-api library interface
//!
//! Exposes the application state and router for integration testing.

pub mod api;
pub mod db;
pub mod dispatch;
pub mod error;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use sqlx::SqlitePool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Default page size for review listings
pub const DEFAULT_PAGE_SIZE: i64 = 15;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool, shared with the worker binary
    pub db: SqlitePool,
    /// Rows per page for review listings
    pub page_size: i64,
}

impl AppState {
    pub fn new(db: SqlitePool, page_size: i64) -> Self {
        Self { db, page_size }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/health", get(api::health::health))
        .route("/reviews/trends", get(api::reviews::get_review_trends))
        .route("/reviews/", get(api::reviews::get_reviews_by_category))
        .route("/reviews/", post(api::reviews::create_review))
        .route("/categories", post(api::reviews::create_category))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
