//! Product Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::UserSummary;

/// Largest price a `NUMERIC(12,2)` column holds: 9_999_999_999.99
pub const MAX_PRICE: Decimal = Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2);
/// Prices carry at most cents
pub const PRICE_SCALE: u32 = 2;
/// Upper bound for a product's stock
pub const MAX_STOCK: i32 = 1_000_000;

/// Product entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub seller_id: String,
    pub name: String,
    pub description: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category: String,
    /// Units available, never negative
    pub stock: i32,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Product {
    pub fn summary(&self) -> ProductSummary {
        ProductSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            image_url: self.image_url.clone(),
            price: self.price,
            seller_id: self.seller_id.clone(),
        }
    }
}

/// Compact product card embedded in order items and reviews
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub name: String,
    pub image_url: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub seller_id: String,
}

/// Product with seller card and rating aggregate (list/detail views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductWithSeller {
    #[serde(flatten)]
    pub product: Product,
    pub seller: UserSummary,
    /// 0 when the product has no reviews
    pub average_rating: f64,
    pub review_count: i64,
}

/// Create product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductCreate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i32>,
}

/// Validated product input for the store
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub seller_id: String,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: Option<String>,
    pub category: String,
    pub stock: i32,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub stock: Option<i32>,
}

/// Product list filters (GET /api/products)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub category: Option<String>,
    /// Case-insensitive match on name or description
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub seller_id: Option<String>,
}

impl ProductFilter {
    /// In-memory equivalent of the SQL WHERE clause
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category
            && &product.category != category
        {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(min) = self.min_price
            && product.price < min
        {
            return false;
        }
        if let Some(max) = self.max_price
            && product.price > max
        {
            return false;
        }
        if let Some(seller_id) = &self.seller_id
            && &product.seller_id != seller_id
        {
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::prelude::FromPrimitive;

    fn mug() -> Product {
        Product {
            id: "p-1".into(),
            seller_id: "s-1".into(),
            name: "Ceramic Mug".into(),
            description: "Hand thrown stoneware".into(),
            price: Decimal::from_f64(18.5).unwrap(),
            image_url: None,
            category: "Home".into(),
            stock: 4,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let filter = ProductFilter {
            search: Some("STONEWARE".into()),
            ..Default::default()
        };
        assert!(filter.matches(&mug()));

        let filter = ProductFilter {
            search: Some("teapot".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&mug()));
    }

    #[test]
    fn test_filter_price_bounds_inclusive() {
        let filter = ProductFilter {
            min_price: Some(Decimal::from_f64(18.5).unwrap()),
            max_price: Some(Decimal::from(20)),
            ..Default::default()
        };
        assert!(filter.matches(&mug()));

        let filter = ProductFilter {
            max_price: Some(Decimal::from(18)),
            ..Default::default()
        };
        assert!(!filter.matches(&mug()));
    }

    #[test]
    fn test_filter_category_and_seller() {
        let filter = ProductFilter {
            category: Some("Home".into()),
            seller_id: Some("s-2".into()),
            ..Default::default()
        };
        assert!(!filter.matches(&mug()));
    }

    #[test]
    fn test_price_serializes_as_number() {
        let json = serde_json::to_value(mug()).unwrap();
        assert_eq!(json["price"], 18.5);
        assert_eq!(json["sellerId"], "s-1");
    }
}
