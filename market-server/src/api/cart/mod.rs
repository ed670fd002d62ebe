//! Cart API

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/cart",
            get(handler::get_cart)
                .post(handler::add)
                .delete(handler::clear),
        )
        .route(
            "/api/cart/{id}",
            put(handler::update_quantity).delete(handler::remove),
        )
}
