//! Product API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{
    MAX_PRICE, MAX_STOCK, NewProduct, PRICE_SCALE, Product, ProductCreate, ProductFilter,
    ProductUpdate, ProductWithSeller,
};
use shared::request::{PaginatedResponse, Pagination};

use crate::api::optional_text;
use crate::auth::CurrentUser;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductQuery {
    pub category: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub seller_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn check_price(price: Decimal) -> Result<Decimal, AppError> {
    let price = price.normalize();
    if price <= Decimal::ZERO {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            "Price must be greater than 0",
        ));
    }
    if price.scale() > PRICE_SCALE {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            "Price cannot have more than 2 decimal places",
        ));
    }
    if price > MAX_PRICE {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("Price cannot exceed {MAX_PRICE}"),
        )
        .with_detail("max", MAX_PRICE.to_string()));
    }
    Ok(price)
}

fn check_stock(stock: i32) -> Result<i32, AppError> {
    if !(0..=MAX_STOCK).contains(&stock) {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidStock,
            format!("Stock must be between 0 and {MAX_STOCK}"),
        ));
    }
    Ok(stock)
}

/// GET /api/products
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<ApiResponse<PaginatedResponse<ProductWithSeller>>> {
    let filter = ProductFilter {
        category: optional_text(query.category),
        search: optional_text(query.search),
        min_price: query.min_price,
        max_price: query.max_price,
        seller_id: optional_text(query.seller_id),
    };
    let page = Pagination::new(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let products = state.store.list_products(&filter, page).await?;
    Ok(ApiResponse::success(products))
}

/// POST /api/products
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ProductCreate>,
) -> AppResult<(StatusCode, ApiResponse<Product>)> {
    let (Some(name), Some(description), Some(price), Some(category)) = (
        optional_text(req.name),
        optional_text(req.description),
        req.price,
        optional_text(req.category),
    ) else {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "Missing required fields",
        ));
    };

    let product = state
        .store
        .create_product(NewProduct {
            seller_id: current.id.clone(),
            name,
            description,
            price: check_price(price)?,
            image_url: optional_text(req.image_url),
            category,
            stock: check_stock(req.stock.unwrap_or(0))?,
        })
        .await?;

    tracing::info!(product_id = %product.id, seller_id = %current.id, "Product created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("Product created", product),
    ))
}

/// GET /api/products/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ProductWithSeller>> {
    let product = state
        .store
        .get_product(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    Ok(ApiResponse::success(product))
}

/// PUT /api/products/{id}
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ProductUpdate>,
) -> AppResult<ApiResponse<Product>> {
    let update = ProductUpdate {
        name: optional_text(req.name),
        description: optional_text(req.description),
        price: req.price.map(check_price).transpose()?,
        image_url: optional_text(req.image_url),
        category: optional_text(req.category),
        stock: req.stock.map(check_stock).transpose()?,
    };
    let product = state.store.update_product(&id, &current.id, update).await?;
    Ok(ApiResponse::success_with_message("Product updated", product))
}

/// DELETE /api/products/{id}
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.store.delete_product(&id, &current.id).await?;
    tracing::info!(product_id = %id, seller_id = %current.id, "Product deleted");
    Ok(ApiResponse::ok_with_message("Product deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::str::FromStr;

    fn price(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_price_and_stock_bounds() {
        assert!(check_price(Decimal::new(1, 2)).is_ok());
        assert_eq!(
            check_price(Decimal::ZERO).unwrap_err().code,
            ErrorCode::ProductInvalidPrice
        );
        assert!(check_stock(0).is_ok());
        assert!(check_stock(MAX_STOCK).is_ok());
        assert_eq!(
            check_stock(-1).unwrap_err().code,
            ErrorCode::ProductInvalidStock
        );
        assert_eq!(
            check_stock(i32::MAX).unwrap_err().code,
            ErrorCode::ProductInvalidStock
        );
    }

    #[test]
    fn test_price_scale_and_ceiling() {
        assert_eq!(check_price(price("12.500")).unwrap(), price("12.5"));
        assert!(check_price(price("9999999999.99")).is_ok());

        for bad in ["0.001", "19.999", "10000000000", "70000000000000000000000000000"] {
            assert_eq!(
                check_price(price(bad)).unwrap_err().code,
                ErrorCode::ProductInvalidPrice,
                "{bad}"
            );
        }
    }
}
