//! Opaque page cursor for review listings
//!
//! The cursor encodes the `(created_at, id)` position of the last row of
//! the previous page. The composite form keeps pagination gap-free when
//! several rows share one `created_at` at a page boundary, which a
//! timestamp-only cursor cannot guarantee.

use crate::{Error, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};

/// Position of the last row seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: i64,
}

impl PageCursor {
    pub fn new(created_at: DateTime<Utc>, id: i64) -> Self {
        Self { created_at, id }
    }

    /// Serialize to the opaque wire token
    pub fn encode(&self) -> String {
        let raw = format!("{}|{}", self.created_at.to_rfc3339(), self.id);
        URL_SAFE_NO_PAD.encode(raw)
    }

    /// Parse the opaque wire token
    pub fn decode(token: &str) -> Result<Self> {
        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| Error::Validation("malformed cursor".to_string()))?;
        let raw = String::from_utf8(raw)
            .map_err(|_| Error::Validation("malformed cursor".to_string()))?;

        let (ts, id) = raw
            .rsplit_once('|')
            .ok_or_else(|| Error::Validation("malformed cursor".to_string()))?;

        let created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| Error::Validation("malformed cursor timestamp".to_string()))?
            .with_timezone(&Utc);
        let id: i64 = id
            .parse()
            .map_err(|_| Error::Validation("malformed cursor id".to_string()))?;

        Ok(Self { created_at, id })
    }
}
