use shared::error::{AppError, ErrorCode};
use shared::models::{
    NewReview, Review, ReviewDetail, ReviewFilter, ReviewPage, ReviewSummary, ReviewUpdate,
};
use shared::request::{PaginatedResponse, Pagination};
use shared::util::{new_id, now_millis};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};

use super::{products, users};
use crate::error::{ServiceResult, is_unique_violation};

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter) {
    qb.push(" WHERE TRUE");
    if let Some(product_id) = &filter.product_id {
        qb.push(" AND product_id = ").push_bind(product_id.clone());
    }
    if let Some(author_id) = &filter.author_id {
        qb.push(" AND author_id = ").push_bind(author_id.clone());
    }
    if let Some(target_id) = &filter.target_id {
        qb.push(" AND target_id = ").push_bind(target_id.clone());
    }
}

/// Join author, product and target cards onto reviews
async fn details(conn: &mut PgConnection, reviews: Vec<Review>) -> ServiceResult<Vec<ReviewDetail>> {
    let mut user_ids: Vec<String> = reviews
        .iter()
        .flat_map(|r| [r.author_id.clone(), r.target_id.clone()])
        .collect();
    user_ids.sort();
    user_ids.dedup();
    let mut product_ids: Vec<String> = reviews.iter().map(|r| r.product_id.clone()).collect();
    product_ids.sort();
    product_ids.dedup();

    let user_map = users::summaries(&mut *conn, &user_ids).await?;
    let product_map = products::summaries(&mut *conn, &product_ids).await?;

    Ok(reviews
        .into_iter()
        .map(|review| ReviewDetail {
            author: users::summary_or_placeholder(&user_map, &review.author_id),
            target: users::summary_or_placeholder(&user_map, &review.target_id),
            product: products::summary_or_placeholder(&product_map, &review.product_id),
            review,
        })
        .collect())
}

async fn detail(conn: &mut PgConnection, review: Review) -> ServiceResult<ReviewDetail> {
    details(conn, vec![review])
        .await?
        .pop()
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound).into())
}

pub async fn list(
    pool: &PgPool,
    filter: &ReviewFilter,
    page: Pagination,
) -> ServiceResult<ReviewPage> {
    let mut conn = pool.acquire().await?;

    let mut stats_qb = QueryBuilder::<Postgres>::new(
        "SELECT COALESCE(AVG(rating), 0)::float8, COUNT(*) FROM reviews",
    );
    push_filters(&mut stats_qb, filter);
    let (average_rating, total_reviews): (f64, i64) =
        stats_qb.build_query_as().fetch_one(&mut *conn).await?;

    let rating_breakdown = match &filter.product_id {
        Some(product_id) => {
            let counts: Vec<(i32, i64)> = sqlx::query_as(
                "SELECT rating, COUNT(*) FROM reviews WHERE product_id = $1 GROUP BY rating",
            )
            .bind(product_id)
            .fetch_all(&mut *conn)
            .await?;
            Some(ReviewSummary::breakdown(counts))
        }
        None => None,
    };

    let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reviews");
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC, id LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
    let rows: Vec<Review> = qb.build_query_as().fetch_all(&mut *conn).await?;
    let data = details(&mut conn, rows).await?;

    Ok(ReviewPage {
        page: PaginatedResponse::new(data, total_reviews as u64, page),
        summary: ReviewSummary {
            average_rating,
            total_reviews,
            rating_breakdown,
        },
    })
}

async fn find_by_id(conn: &mut PgConnection, id: &str, lock: bool) -> ServiceResult<Review> {
    let sql = if lock {
        "SELECT * FROM reviews WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM reviews WHERE id = $1"
    };
    Ok(sqlx::query_as::<_, Review>(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?)
}

pub async fn find_detail(pool: &PgPool, id: &str) -> ServiceResult<Option<ReviewDetail>> {
    let mut conn = pool.acquire().await?;
    let review: Option<Review> = sqlx::query_as("SELECT * FROM reviews WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    match review {
        Some(review) => Ok(Some(detail(&mut conn, review).await?)),
        None => Ok(None),
    }
}

pub async fn create(pool: &PgPool, input: NewReview) -> ServiceResult<ReviewDetail> {
    let mut tx = pool.begin().await?;

    let product = products::find_by_id(&mut *tx, &input.product_id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if product.seller_id == input.author_id {
        return Err(AppError::new(ErrorCode::CannotReviewOwnProduct).into());
    }

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM reviews WHERE product_id = $1 AND author_id = $2)",
    )
    .bind(&input.product_id)
    .bind(&input.author_id)
    .fetch_one(&mut *tx)
    .await?;
    if exists {
        return Err(AppError::new(ErrorCode::ReviewAlreadyExists).into());
    }

    let is_verified: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT 1 FROM orders o
            JOIN order_items oi ON oi.order_id = o.id
            WHERE o.user_id = $1 AND oi.product_id = $2
              AND o.status IN ('CONFIRMED', 'DELIVERED'))",
    )
    .bind(&input.author_id)
    .bind(&input.product_id)
    .fetch_one(&mut *tx)
    .await?;

    let now = now_millis();
    let inserted: Result<Review, sqlx::Error> = sqlx::query_as(
        "INSERT INTO reviews (id, product_id, author_id, target_id, rating, title, comment, is_verified, is_helpful, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $9)
         RETURNING *",
    )
    .bind(new_id())
    .bind(&input.product_id)
    .bind(&input.author_id)
    .bind(&product.seller_id)
    .bind(input.rating)
    .bind(&input.title)
    .bind(&input.comment)
    .bind(is_verified)
    .bind(now)
    .fetch_one(&mut *tx)
    .await;
    let review = match inserted {
        Ok(review) => review,
        // Concurrent duplicate slipped past the EXISTS check
        Err(e) if is_unique_violation(&e) => {
            return Err(AppError::new(ErrorCode::ReviewAlreadyExists).into());
        }
        Err(e) => return Err(e.into()),
    };

    let created = detail(&mut *tx, review).await?;
    tx.commit().await?;
    Ok(created)
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    author_id: &str,
    update: ReviewUpdate,
) -> ServiceResult<ReviewDetail> {
    let mut tx = pool.begin().await?;
    let current = find_by_id(&mut *tx, id, true).await?;
    if current.author_id != author_id {
        return Err(AppError::not_owner("You can only update your own reviews").into());
    }

    let review: Review = sqlx::query_as(
        "UPDATE reviews SET
            rating = COALESCE($2, rating),
            title = COALESCE($3, title),
            comment = COALESCE($4, comment),
            updated_at = $5
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(update.rating)
    .bind(&update.title)
    .bind(&update.comment)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    let updated = detail(&mut *tx, review).await?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete(pool: &PgPool, id: &str, author_id: &str) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    let current = find_by_id(&mut *tx, id, true).await?;
    if current.author_id != author_id {
        return Err(AppError::not_owner("You can only delete your own reviews").into());
    }

    sqlx::query("DELETE FROM reviews WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_bind_in_order() {
        let filter = ReviewFilter {
            product_id: Some("p-1".into()),
            target_id: Some("u-2".into()),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT * FROM reviews");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT * FROM reviews WHERE TRUE AND product_id = $1 AND target_id = $2"
        );
    }
}
