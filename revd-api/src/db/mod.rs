//! Database queries for revd-api

pub mod access_log;
pub mod categories;
pub mod reviews;
