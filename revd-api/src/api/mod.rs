//! HTTP handlers for revd-api

pub mod health;
pub mod reviews;
