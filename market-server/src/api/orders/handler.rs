//! Order API Handlers
//!
//! Checkout and status changes run inside the store so the stock checks and
//! writes share one transaction.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{OrderCreate, OrderStatusUpdate, OrderWithItems, SellerSales};
use shared::request::{PaginatedResponse, Pagination};

use crate::api::optional_text;
use crate::auth::CurrentUser;
use crate::orders::parse_status;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
}

/// GET /api/orders
pub async fn list(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(query): Query<OrderQuery>,
) -> AppResult<ApiResponse<PaginatedResponse<OrderWithItems>>> {
    let status = optional_text(query.status)
        .map(|s| parse_status(&s))
        .transpose()?;
    let page = Pagination::new(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let orders = state.store.list_orders(&current.id, status, page).await?;
    Ok(ApiResponse::success(orders))
}

/// POST /api/orders
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<OrderCreate>,
) -> AppResult<(StatusCode, ApiResponse<OrderWithItems>)> {
    let shipping_address = optional_text(req.shipping_address)
        .ok_or_else(|| AppError::new(ErrorCode::ShippingAddressRequired))?;

    let order = state
        .store
        .place_order(&current.id, &shipping_address)
        .await?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("Order placed", order),
    ))
}

/// GET /api/orders/{id}
///
/// Visible to the buyer and to sellers with a line in the order.
pub async fn get_by_id(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = state
        .store
        .get_order(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    if order.order.user_id != current.id && !order.has_seller(&current.id) {
        return Err(AppError::not_owner("You can only view your own orders"));
    }
    Ok(ApiResponse::success(order))
}

/// PUT /api/orders/{id}
pub async fn update_status(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<OrderStatusUpdate>,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let status = optional_text(req.status)
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "status is required"))?;
    let to = parse_status(&status)?;

    let order = state
        .store
        .update_order_status(&id, &current.id, to)
        .await?;
    Ok(ApiResponse::success_with_message(
        "Order status updated",
        order,
    ))
}

/// GET /api/orders/seller/{seller_id}
pub async fn seller_sales(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(seller_id): Path<String>,
) -> AppResult<ApiResponse<SellerSales>> {
    if seller_id != current.id {
        return Err(AppError::not_owner("You can only view your own sales"));
    }
    let sales = state.store.seller_sales(&seller_id).await?;
    Ok(ApiResponse::success(sales))
}
