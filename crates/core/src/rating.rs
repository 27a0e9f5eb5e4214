//! Review rating aggregation.

use serde::Serialize;

/// Lowest allowed review rating.
pub const MIN_RATING: i32 = 1;

/// Highest allowed review rating.
pub const MAX_RATING: i32 = 5;

/// Whether a rating is within `1..=5`.
#[must_use]
pub const fn is_valid_rating(rating: i32) -> bool {
    rating >= MIN_RATING && rating <= MAX_RATING
}

/// Average rating and review count of a product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub avg_rating: f64,
    pub review_count: i64,
}

impl RatingSummary {
    /// Summarize a set of ratings. No reviews yields an average of 0.
    pub fn from_ratings<I>(ratings: I) -> Self
    where
        I: IntoIterator<Item = i32>,
    {
        let (sum, count) = ratings
            .into_iter()
            .fold((0_i64, 0_i64), |(sum, count), r| (sum + i64::from(r), count + 1));

        if count == 0 {
            return Self::default();
        }

        #[allow(clippy::cast_precision_loss)]
        let avg = sum as f64 / count as f64;
        Self {
            avg_rating: round_one_decimal(avg),
            review_count: count,
        }
    }
}

impl Default for RatingSummary {
    fn default() -> Self {
        Self {
            avg_rating: 0.0,
            review_count: 0,
        }
    }
}

/// Round an average to one decimal place for display.
#[must_use]
pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ratings() {
        assert!(!is_valid_rating(0));
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(6));
    }

    #[test]
    fn test_no_reviews() {
        let summary = RatingSummary::from_ratings([]);
        assert_eq!(summary.review_count, 0);
        assert!(summary.avg_rating.abs() < f64::EPSILON);
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        let summary = RatingSummary::from_ratings([5, 4, 4]);
        assert_eq!(summary.review_count, 3);
        assert!((summary.avg_rating - 4.3).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_one_decimal() {
        assert!((round_one_decimal(3.66) - 3.7).abs() < f64::EPSILON);
        assert!((round_one_decimal(4.0) - 4.0).abs() < f64::EPSILON);
    }
}
