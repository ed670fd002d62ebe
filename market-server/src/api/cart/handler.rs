//! Cart API Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::Serialize;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{Cart, CartAdd, CartItemDetail, CartQuantityUpdate, MAX_QUANTITY};

use crate::api::required_text;
use crate::auth::CurrentUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ClearedCart {
    pub removed: u64,
}

fn check_quantity(quantity: i32) -> Result<i32, AppError> {
    if quantity < 1 {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            "Quantity must be at least 1",
        ));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::with_message(
            ErrorCode::InvalidQuantity,
            format!("Quantity cannot exceed {MAX_QUANTITY}"),
        ));
    }
    Ok(quantity)
}

/// GET /api/cart
pub async fn get_cart(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<ApiResponse<Cart>> {
    let items = state.store.cart_items(&current.id).await?;
    Ok(ApiResponse::success(Cart::new(items)?))
}

/// POST /api/cart
pub async fn add(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<CartAdd>,
) -> AppResult<(StatusCode, ApiResponse<CartItemDetail>)> {
    let product_id = required_text(req.product_id, "productId")?;
    let quantity = check_quantity(req.quantity.unwrap_or(1))?;

    let item = state
        .store
        .add_to_cart(&current.id, &product_id, quantity)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("Item added to cart", item),
    ))
}

/// DELETE /api/cart
pub async fn clear(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<ApiResponse<ClearedCart>> {
    let removed = state.store.clear_cart(&current.id).await?;
    Ok(ApiResponse::success_with_message(
        "Cart cleared",
        ClearedCart { removed },
    ))
}

/// PUT /api/cart/{id}
pub async fn update_quantity(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<CartQuantityUpdate>,
) -> AppResult<ApiResponse<CartItemDetail>> {
    let quantity = req
        .quantity
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "quantity is required"))?;
    let item = state
        .store
        .set_cart_quantity(&current.id, &id, check_quantity(quantity)?)
        .await?;
    Ok(ApiResponse::success_with_message("Cart updated", item))
}

/// DELETE /api/cart/{id}
pub async fn remove(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.store.remove_cart_item(&current.id, &id).await?;
    Ok(ApiResponse::ok_with_message("Item removed from cart"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_bounds() {
        assert_eq!(check_quantity(1).unwrap(), 1);
        assert_eq!(check_quantity(MAX_QUANTITY).unwrap(), MAX_QUANTITY);
        for bad in [0, -3, MAX_QUANTITY + 1, i32::MAX] {
            assert_eq!(
                check_quantity(bad).unwrap_err().code,
                ErrorCode::InvalidQuantity,
                "{bad}"
            );
        }
    }
}
