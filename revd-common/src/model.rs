//! Database models shared by the REVD binaries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum accepted star rating
pub const MIN_STARS: i64 = 1;

/// Maximum accepted star rating
pub const MAX_STARS: i64 = 10;

/// Validate a star rating against the accepted [1, 10] domain
pub fn validate_stars(stars: i64) -> crate::Result<()> {
    if !(MIN_STARS..=MAX_STARS).contains(&stars) {
        return Err(crate::Error::Validation(format!(
            "stars must be between {} and {}, got {}",
            MIN_STARS, MAX_STARS, stars
        )));
    }
    Ok(())
}

/// A review category
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
}

/// One version of a logical review
///
/// All versions of a logical review share a `review_id`; edits append new
/// rows rather than mutating text or stars in place. Only `tone` and
/// `sentiment` are ever written after insert, and only from null to a
/// classified label.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ReviewVersion {
    pub id: i64,
    pub text: Option<String>,
    pub stars: i64,
    pub review_id: String,
    pub tone: Option<String>,
    pub sentiment: Option<String>,
    pub category_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-category trend over latest-version reviews
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryTrend {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub average_stars: f64,
    pub total_reviews: i64,
}

impl CategoryTrend {
    /// Round `average_stars` to 2 decimal places for the wire response.
    /// Stored/aggregated precision stays unrounded.
    pub fn rounded(mut self) -> Self {
        self.average_stars = (self.average_stars * 100.0).round() / 100.0;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_stars_accepts_domain_bounds() {
        validate_stars(1).unwrap();
        validate_stars(10).unwrap();
        validate_stars(5).unwrap();
    }

    #[test]
    fn test_validate_stars_rejects_out_of_range() {
        assert!(validate_stars(0).is_err());
        assert!(validate_stars(11).is_err());
        assert!(validate_stars(-3).is_err());
    }

    #[test]
    fn test_trend_rounding_is_response_only() {
        let trend = CategoryTrend {
            id: 1,
            name: "Electronics".to_string(),
            description: None,
            average_stars: 25.0 / 3.0,
            total_reviews: 3,
        };
        let rounded = trend.rounded();
        assert_eq!(rounded.average_stars, 8.33);
    }
}
