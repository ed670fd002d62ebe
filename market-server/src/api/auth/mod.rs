//! Authentication API
//!
//! Login and registration sit behind per-IP rate limits.

mod handler;

use axum::{
    Router, middleware,
    routing::{get, post, put},
};

use crate::auth::rate_limit::{login_rate_limit, register_rate_limit};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/api/auth/login", post(handler::login))
        .layer(middleware::from_fn_with_state(state.clone(), login_rate_limit));

    let register = Router::new()
        .route("/api/auth/register", post(handler::register))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            register_rate_limit,
        ));

    Router::new()
        .merge(login)
        .merge(register)
        .route("/api/auth/logout", post(handler::logout))
        .route("/api/auth/me", get(handler::me))
        .route("/api/auth/profile", put(handler::update_profile))
}
