//! Review Model

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{ProductSummary, UserSummary};
use crate::request::PaginatedResponse;

/// Product review. `target_id` is the product's seller.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: String,
    pub product_id: String,
    pub author_id: String,
    pub target_id: String,
    /// 1..=5
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
    /// Author bought the product
    pub is_verified: bool,
    pub is_helpful: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Review with author, product and seller cards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    #[serde(flatten)]
    pub review: Review,
    pub author: UserSummary,
    pub product: ProductSummary,
    pub target: UserSummary,
}

/// Create review payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreate {
    pub product_id: Option<String>,
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Validated review input for the store
#[derive(Debug, Clone)]
pub struct NewReview {
    pub product_id: String,
    pub author_id: String,
    pub rating: i32,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Update review payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewUpdate {
    pub rating: Option<i32>,
    pub title: Option<String>,
    pub comment: Option<String>,
}

/// Review list filters (GET /api/reviews)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFilter {
    pub product_id: Option<String>,
    pub author_id: Option<String>,
    pub target_id: Option<String>,
}

impl ReviewFilter {
    pub fn matches(&self, review: &Review) -> bool {
        self.product_id
            .as_ref()
            .is_none_or(|id| &review.product_id == id)
            && self
                .author_id
                .as_ref()
                .is_none_or(|id| &review.author_id == id)
            && self
                .target_id
                .as_ref()
                .is_none_or(|id| &review.target_id == id)
    }
}

/// Aggregate over the filtered reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSummary {
    /// 0 when there are no reviews
    pub average_rating: f64,
    pub total_reviews: i64,
    /// Count per star (1..=5), only when filtering by product
    pub rating_breakdown: Option<BTreeMap<i32, i64>>,
}

impl ReviewSummary {
    /// Build a breakdown with every star present, missing ones as 0
    pub fn breakdown(counts: impl IntoIterator<Item = (i32, i64)>) -> BTreeMap<i32, i64> {
        let mut map: BTreeMap<i32, i64> = (1..=5).map(|star| (star, 0)).collect();
        for (star, count) in counts {
            if let Some(slot) = map.get_mut(&star) {
                *slot += count;
            }
        }
        map
    }
}

/// Review list with its aggregate (GET /api/reviews)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewPage {
    #[serde(flatten)]
    pub page: PaginatedResponse<ReviewDetail>,
    pub summary: ReviewSummary,
}

pub fn is_valid_rating(rating: i32) -> bool {
    (1..=5).contains(&rating)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breakdown_fills_missing_stars() {
        let map = ReviewSummary::breakdown([(5, 3), (1, 1)]);
        assert_eq!(map.len(), 5);
        assert_eq!(map[&1], 1);
        assert_eq!(map[&3], 0);
        assert_eq!(map[&5], 3);
    }

    #[test]
    fn test_breakdown_ignores_out_of_range() {
        let map = ReviewSummary::breakdown([(0, 9), (6, 9)]);
        assert!(map.values().all(|&c| c == 0));
    }

    #[test]
    fn test_rating_range() {
        assert!(!is_valid_rating(0));
        assert!(is_valid_rating(1));
        assert!(is_valid_rating(5));
        assert!(!is_valid_rating(6));
    }
}
