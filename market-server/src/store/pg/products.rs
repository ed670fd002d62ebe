use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    NewProduct, Product, ProductFilter, ProductSummary, ProductUpdate, ProductWithSeller,
    UserSummary,
};
use shared::request::{PaginatedResponse, Pagination};
use shared::util::{new_id, now_millis};
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;

use crate::error::ServiceResult;

#[derive(sqlx::FromRow)]
struct ProductListingRow {
    #[sqlx(flatten)]
    product: Product,
    seller_first_name: String,
    seller_last_name: String,
    seller_profile_picture_url: Option<String>,
    average_rating: f64,
    review_count: i64,
}

impl From<ProductListingRow> for ProductWithSeller {
    fn from(row: ProductListingRow) -> Self {
        Self {
            seller: UserSummary {
                id: row.product.seller_id.clone(),
                first_name: row.seller_first_name,
                last_name: row.seller_last_name,
                profile_picture_url: row.seller_profile_picture_url,
            },
            product: row.product,
            average_rating: row.average_rating,
            review_count: row.review_count,
        }
    }
}

const LISTING_SELECT: &str = r#"
    SELECT p.*,
           u.first_name AS seller_first_name,
           u.last_name AS seller_last_name,
           u.profile_picture_url AS seller_profile_picture_url,
           COALESCE(r.average_rating, 0)::float8 AS average_rating,
           COALESCE(r.review_count, 0) AS review_count
    FROM products p
    JOIN users u ON u.id = p.seller_id
    LEFT JOIN (
        SELECT product_id, AVG(rating)::float8 AS average_rating, COUNT(*) AS review_count
        FROM reviews
        GROUP BY product_id
    ) r ON r.product_id = p.id
"#;

/// Escape LIKE wildcards in user input
fn like_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &filter.category {
        qb.push(" AND p.category = ").push_bind(category.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (p.name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR p.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
    if let Some(min) = filter.min_price {
        qb.push(" AND p.price >= ").push_bind(min);
    }
    if let Some(max) = filter.max_price {
        qb.push(" AND p.price <= ").push_bind(max);
    }
    if let Some(seller_id) = &filter.seller_id {
        qb.push(" AND p.seller_id = ").push_bind(seller_id.clone());
    }
}

pub async fn list(
    pool: &PgPool,
    filter: &ProductFilter,
    page: Pagination,
) -> ServiceResult<PaginatedResponse<ProductWithSeller>> {
    let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
    push_filters(&mut count_qb, filter);
    let total: i64 = count_qb.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Postgres>::new(LISTING_SELECT);
    push_filters(&mut qb, filter);
    qb.push(" ORDER BY p.created_at DESC, p.id LIMIT ")
        .push_bind(i64::from(page.limit))
        .push(" OFFSET ")
        .push_bind(page.offset() as i64);
    let rows: Vec<ProductListingRow> = qb.build_query_as().fetch_all(pool).await?;

    Ok(PaginatedResponse::new(
        rows.into_iter().map(ProductWithSeller::from).collect(),
        total as u64,
        page,
    ))
}

pub async fn find_with_seller(
    pool: &PgPool,
    id: &str,
) -> ServiceResult<Option<ProductWithSeller>> {
    let sql = format!("{LISTING_SELECT} WHERE p.id = $1");
    let row: Option<ProductListingRow> = sqlx::query_as(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(ProductWithSeller::from))
}

pub async fn find_by_id(conn: &mut PgConnection, id: &str) -> Result<Option<Product>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM products WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

/// Batch-load full products by id
pub async fn find_many(
    conn: &mut PgConnection,
    ids: &[String],
) -> Result<HashMap<String, Product>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<Product> = sqlx::query_as("SELECT * FROM products WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&mut *conn)
        .await?;
    Ok(rows.into_iter().map(|p| (p.id.clone(), p)).collect())
}

pub async fn count_by_seller(pool: &PgPool, seller_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE seller_id = $1")
        .bind(seller_id)
        .fetch_one(pool)
        .await
}

pub async fn create(pool: &PgPool, input: NewProduct) -> ServiceResult<Product> {
    let now = now_millis();
    let mut tx = pool.begin().await?;

    let product: Product = sqlx::query_as(
        "INSERT INTO products (id, seller_id, name, description, price, image_url, category, stock, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
         RETURNING *",
    )
    .bind(new_id())
    .bind(&input.seller_id)
    .bind(&input.name)
    .bind(&input.description)
    .bind(input.price)
    .bind(&input.image_url)
    .bind(&input.category)
    .bind(input.stock)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE users SET is_seller = TRUE WHERE id = $1 AND NOT is_seller")
        .bind(&input.seller_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;
    Ok(product)
}

/// Lock the product row and check ownership
async fn lock_owned(
    conn: &mut PgConnection,
    id: &str,
    seller_id: &str,
    verb: &str,
) -> ServiceResult<Product> {
    let product: Product = sqlx::query_as("SELECT * FROM products WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
    if product.seller_id != seller_id {
        return Err(AppError::not_owner(format!("You can only {verb} your own products")).into());
    }
    Ok(product)
}

pub async fn update(
    pool: &PgPool,
    id: &str,
    seller_id: &str,
    update: ProductUpdate,
) -> ServiceResult<Product> {
    let mut tx = pool.begin().await?;
    lock_owned(&mut *tx, id, seller_id, "update").await?;

    let product: Product = sqlx::query_as(
        "UPDATE products SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            image_url = COALESCE($5, image_url),
            category = COALESCE($6, category),
            stock = COALESCE($7, stock),
            updated_at = $8
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(&update.name)
    .bind(&update.description)
    .bind(update.price)
    .bind(&update.image_url)
    .bind(&update.category)
    .bind(update.stock)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(product)
}

pub async fn delete(pool: &PgPool, id: &str, seller_id: &str) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock_owned(&mut *tx, id, seller_id, "delete").await?;

    let (in_cart, in_order): (bool, bool) = sqlx::query_as(
        "SELECT EXISTS (SELECT 1 FROM cart_items WHERE product_id = $1),
                EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    if in_cart || in_order {
        return Err(AppError::new(ErrorCode::ProductInUse)
            .with_detail("in_cart", in_cart)
            .with_detail("in_order", in_order)
            .into());
    }

    // Reviews cascade
    sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Batch-load product cards by id
pub async fn summaries(
    conn: &mut PgConnection,
    ids: &[String],
) -> Result<HashMap<String, ProductSummary>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<ProductSummary> = sqlx::query_as(
        "SELECT id, name, image_url, price, seller_id FROM products WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;
    Ok(rows.into_iter().map(|p| (p.id.clone(), p)).collect())
}

/// Card for a product id that may have vanished
pub fn summary_or_placeholder(map: &HashMap<String, ProductSummary>, id: &str) -> ProductSummary {
    map.get(id).cloned().unwrap_or_else(|| ProductSummary {
        id: id.to_string(),
        name: String::new(),
        image_url: None,
        price: Decimal::ZERO,
        seller_id: String::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("mug"), "%mug%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn test_filters_bind_in_order() {
        let filter = ProductFilter {
            category: Some("Home".into()),
            search: Some("mug".into()),
            min_price: Some(Decimal::from(5)),
            ..Default::default()
        };
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products p");
        push_filters(&mut qb, &filter);
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM products p WHERE TRUE AND p.category = $1 \
             AND (p.name ILIKE $2 OR p.description ILIKE $3) AND p.price >= $4"
        );
    }
}
