//! Review API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{
    NewReview, ReviewCreate, ReviewDetail, ReviewFilter, ReviewPage, ReviewUpdate,
    is_valid_rating,
};
use shared::request::Pagination;

use crate::api::{optional_text, required_text};
use crate::auth::CurrentUser;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewQuery {
    pub product_id: Option<String>,
    pub author_id: Option<String>,
    pub target_id: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

fn check_rating(rating: i32) -> Result<i32, AppError> {
    if !is_valid_rating(rating) {
        return Err(AppError::new(ErrorCode::InvalidRating).with_detail("rating", rating));
    }
    Ok(rating)
}

/// GET /api/reviews
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ReviewQuery>,
) -> AppResult<ApiResponse<ReviewPage>> {
    let filter = ReviewFilter {
        product_id: optional_text(query.product_id),
        author_id: optional_text(query.author_id),
        target_id: optional_text(query.target_id),
    };
    let page = Pagination::new(query.page, query.limit, DEFAULT_PAGE_SIZE);
    let reviews = state.store.list_reviews(&filter, page).await?;
    Ok(ApiResponse::success(reviews))
}

/// POST /api/reviews
pub async fn create(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ReviewCreate>,
) -> AppResult<(StatusCode, ApiResponse<ReviewDetail>)> {
    let product_id = required_text(req.product_id, "productId")?;
    let rating = req
        .rating
        .ok_or_else(|| AppError::with_message(ErrorCode::RequiredField, "rating is required"))?;

    let review = state
        .store
        .create_review(NewReview {
            product_id,
            author_id: current.id.clone(),
            rating: check_rating(rating)?,
            title: optional_text(req.title),
            comment: optional_text(req.comment),
        })
        .await?;

    tracing::info!(review_id = %review.review.id, author_id = %current.id, "Review created");
    Ok((
        StatusCode::CREATED,
        ApiResponse::success_with_message("Review created", review),
    ))
}

/// GET /api/reviews/{id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<ReviewDetail>> {
    let review = state
        .store
        .get_review(&id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;
    Ok(ApiResponse::success(review))
}

/// PUT /api/reviews/{id}
pub async fn update(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(req): Json<ReviewUpdate>,
) -> AppResult<ApiResponse<ReviewDetail>> {
    let update = ReviewUpdate {
        rating: req.rating.map(check_rating).transpose()?,
        title: optional_text(req.title),
        comment: optional_text(req.comment),
    };
    let review = state.store.update_review(&id, &current.id, update).await?;
    Ok(ApiResponse::success_with_message("Review updated", review))
}

/// DELETE /api/reviews/{id}
pub async fn delete(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<ApiResponse<()>> {
    state.store.delete_review(&id, &current.id).await?;
    Ok(ApiResponse::ok_with_message("Review deleted"))
}
