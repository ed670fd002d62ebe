//! Order API

mod handler;

use axum::{Router, routing::get};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/orders", get(handler::list).post(handler::create))
        .route(
            "/api/orders/{id}",
            get(handler::get_by_id).put(handler::update_status),
        )
        .route("/api/orders/seller/{seller_id}", get(handler::seller_sales))
}
