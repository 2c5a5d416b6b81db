//! # REVD Common Library
//!
//! Shared code for the REVD service binaries including:
//! - Database models (categories, review versions, access log)
//! - Database pool and schema initialization
//! - Enrichment job queue (durable, shared SQLite table)
//! - Page cursor encoding
//! - Configuration loading

pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod jobs;
pub mod model;

pub use error::{Error, Result};
