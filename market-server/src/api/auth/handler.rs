//! Authentication Handlers
//!
//! Registration, login/logout via JWT (bearer or `auth-token` cookie), and
//! the caller's own profile.

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use shared::error::{ApiResponse, AppError, AppResult, ErrorCode};
use shared::models::{
    AuthResponse, LoginRequest, ProfileUpdate, RegisterRequest, User, UserCreate, UserDetail,
};

use crate::api::{optional_text, required_text};
use crate::auth::CurrentUser;
use crate::auth::cookie::{clear_cookie, session_cookie};
use crate::state::AppState;
use crate::util::{hash_password, verify_password};

pub const MIN_PASSWORD_LEN: usize = 8;

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') || email.starts_with('@') || email.ends_with('@') {
        return Err(AppError::with_message(ErrorCode::InvalidFormat, "Invalid email address")
            .with_detail("field", "email"));
    }
    Ok(email)
}

/// Issue a token and the matching `Set-Cookie` header value
fn issue_session(state: &AppState, user: &User) -> Result<(String, String), AppError> {
    let token = state
        .jwt
        .generate_token(&user.id, &user.email)
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;
    let cookie = session_cookie(&token, state.jwt.expiry_seconds(), state.cookie_secure);
    Ok((token, cookie))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(email), Some(password), Some(first_name)) = (
        optional_text(req.email),
        req.password.filter(|p| !p.is_empty()),
        optional_text(req.first_name),
    ) else {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "Email, password and first name are required",
        ));
    };
    let email = normalize_email(&email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::new(ErrorCode::PasswordTooShort)
            .with_detail("min_length", MIN_PASSWORD_LEN));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::new(ErrorCode::EmailAlreadyTaken));
    }

    let hashed_password = hash_password(&password)
        .map_err(|e| AppError::internal(format!("Password hash error: {e}")))?;
    let user = state
        .store
        .create_user(UserCreate {
            email,
            hashed_password,
            first_name,
            last_name: optional_text(req.last_name).unwrap_or_default(),
        })
        .await?;

    let (token, cookie) = issue_session(&state, &user)?;
    tracing::info!(user_id = %user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, cookie)],
        ApiResponse::success_with_message("Registration successful", AuthResponse { token, user }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let (Some(email), Some(password)) = (optional_text(req.email), req.password) else {
        return Err(AppError::with_message(
            ErrorCode::RequiredField,
            "Email and password are required",
        ));
    };
    let email = email.to_lowercase();

    // Same error for unknown email and wrong password
    let user = match state.store.find_user_by_email(&email).await? {
        Some(user) if verify_password(&password, &user.hashed_password) => user,
        _ => {
            tracing::warn!(email = %email, "Login failed - invalid credentials");
            return Err(AppError::invalid_credentials());
        }
    };

    let (token, cookie) = issue_session(&state, &user)?;
    tracing::info!(user_id = %user.id, "User logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        ApiResponse::success_with_message("Login successful", AuthResponse { token, user }),
    ))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(SET_COOKIE, clear_cookie(state.cookie_secure))],
        ApiResponse::ok_with_message("Logged out"),
    )
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> AppResult<ApiResponse<UserDetail>> {
    let user = state
        .store
        .find_user(&current.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;
    let product_count = state.store.count_products_by_seller(&user.id).await?;

    Ok(ApiResponse::success(UserDetail {
        user,
        product_count,
    }))
}

/// PUT /api/auth/profile
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(req): Json<ProfileUpdate>,
) -> AppResult<ApiResponse<User>> {
    let first_name = required_text(req.first_name, "firstName")?;
    let email = normalize_email(&required_text(req.email, "email")?)?;

    let update = ProfileUpdate {
        first_name: Some(first_name),
        last_name: req.last_name.map(|v| v.trim().to_string()),
        email: Some(email),
        phone: optional_text(req.phone),
        profile_picture_url: optional_text(req.profile_picture_url),
    };
    let user = state.store.update_profile(&current.id, update).await?;

    Ok(ApiResponse::success_with_message("Profile updated", user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_email() {
        assert_eq!(
            normalize_email("  Ana@Example.COM ").unwrap(),
            "ana@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
    }
}
