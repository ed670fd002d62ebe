use shared::error::{AppError, ErrorCode};
use shared::models::{ProfileUpdate, User, UserCreate, UserSummary};
use shared::util::{new_id, now_millis};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

use crate::error::{ServiceResult, is_unique_violation};

pub async fn create(pool: &PgPool, input: UserCreate) -> ServiceResult<User> {
    let now = now_millis();
    let result = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, email, hashed_password, first_name, last_name, is_seller, member_since, created_at)
         VALUES ($1, $2, $3, $4, $5, FALSE, $6, $6)
         RETURNING *",
    )
    .bind(new_id())
    .bind(&input.email)
    .bind(&input.hashed_password)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(now)
    .fetch_one(pool)
    .await;

    match result {
        Ok(user) => Ok(user),
        Err(e) if is_unique_violation(&e) => Err(AppError::new(ErrorCode::EmailAlreadyTaken).into()),
        Err(e) => Err(e.into()),
    }
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn update_profile(
    pool: &PgPool,
    user_id: &str,
    update: ProfileUpdate,
) -> ServiceResult<User> {
    if let Some(email) = &update.email {
        let taken: Option<(String,)> =
            sqlx::query_as("SELECT id FROM users WHERE email = $1 AND id <> $2")
                .bind(email)
                .bind(user_id)
                .fetch_optional(pool)
                .await?;
        if taken.is_some() {
            return Err(AppError::new(ErrorCode::EmailAlreadyTaken).into());
        }
    }

    let result = sqlx::query_as::<_, User>(
        "UPDATE users SET
            first_name = COALESCE($2, first_name),
            last_name = COALESCE($3, last_name),
            email = COALESCE($4, email),
            phone = COALESCE($5, phone),
            profile_picture_url = COALESCE($6, profile_picture_url)
         WHERE id = $1
         RETURNING *",
    )
    .bind(user_id)
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.email)
    .bind(&update.phone)
    .bind(&update.profile_picture_url)
    .fetch_optional(pool)
    .await;

    match result {
        Ok(Some(user)) => Ok(user),
        Ok(None) => Err(AppError::new(ErrorCode::UserNotFound).into()),
        // Lost a race with another user claiming the same email
        Err(e) if is_unique_violation(&e) => Err(AppError::new(ErrorCode::EmailAlreadyTaken).into()),
        Err(e) => Err(e.into()),
    }
}

/// Batch-load user cards by id
pub async fn summaries(
    conn: &mut PgConnection,
    ids: &[String],
) -> Result<HashMap<String, UserSummary>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<UserSummary> = sqlx::query_as(
        "SELECT id, first_name, last_name, profile_picture_url FROM users WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|u| (u.id.clone(), u)).collect())
}

/// Card for a user id that may have vanished
pub fn summary_or_placeholder(map: &HashMap<String, UserSummary>, id: &str) -> UserSummary {
    map.get(id).cloned().unwrap_or_else(|| UserSummary {
        id: id.to_string(),
        first_name: String::new(),
        last_name: String::new(),
        profile_picture_url: None,
    })
}
