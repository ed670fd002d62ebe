use shared::error::{AppError, ErrorCode};
use shared::models::{CartItem, CartItemDetail, Product};
use shared::util::{new_id, now_millis};
use sqlx::{PgConnection, PgPool};

use super::products;
use crate::error::ServiceResult;

pub async fn list(pool: &PgPool, user_id: &str) -> ServiceResult<Vec<CartItemDetail>> {
    let mut conn = pool.acquire().await?;
    let items: Vec<CartItem> = sqlx::query_as(
        "SELECT * FROM cart_items WHERE user_id = $1 ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await?;

    let product_ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
    let product_map = products::find_many(&mut conn, &product_ids).await?;

    Ok(items
        .into_iter()
        .filter_map(|item| {
            product_map.get(&item.product_id).map(|p| CartItemDetail {
                product: p.clone(),
                item,
            })
        })
        .collect())
}

async fn product_or_404(conn: &mut PgConnection, id: &str) -> ServiceResult<Product> {
    Ok(products::find_by_id(conn, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?)
}

fn check_stock(product: &Product, requested: i32) -> Result<(), AppError> {
    if requested > product.stock {
        return Err(AppError::insufficient_stock(
            &product.id,
            &product.name,
            requested,
            product.stock,
        ));
    }
    Ok(())
}

pub async fn add(
    pool: &PgPool,
    user_id: &str,
    product_id: &str,
    quantity: i32,
) -> ServiceResult<CartItemDetail> {
    let mut tx = pool.begin().await?;
    let product = product_or_404(&mut *tx, product_id).await?;

    // Merge into the existing line; the row lock serializes concurrent adds
    let item: CartItem = sqlx::query_as(
        "INSERT INTO cart_items (id, user_id, product_id, quantity, created_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (user_id, product_id)
         DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
         RETURNING *",
    )
    .bind(new_id())
    .bind(user_id)
    .bind(product_id)
    .bind(quantity)
    .bind(now_millis())
    .fetch_one(&mut *tx)
    .await?;

    // Dropping the transaction rolls the merge back
    check_stock(&product, item.quantity)?;

    tx.commit().await?;
    Ok(CartItemDetail { item, product })
}

async fn lock_owned_item(
    conn: &mut PgConnection,
    user_id: &str,
    item_id: &str,
    verb: &str,
) -> ServiceResult<CartItem> {
    let item: CartItem = sqlx::query_as("SELECT * FROM cart_items WHERE id = $1 FOR UPDATE")
        .bind(item_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
    if item.user_id != user_id {
        return Err(AppError::not_owner(format!("You can only {verb} your own cart items")).into());
    }
    Ok(item)
}

pub async fn set_quantity(
    pool: &PgPool,
    user_id: &str,
    item_id: &str,
    quantity: i32,
) -> ServiceResult<CartItemDetail> {
    let mut tx = pool.begin().await?;
    let item = lock_owned_item(&mut *tx, user_id, item_id, "update").await?;
    let product = product_or_404(&mut *tx, &item.product_id).await?;
    check_stock(&product, quantity)?;

    let item: CartItem =
        sqlx::query_as("UPDATE cart_items SET quantity = $2 WHERE id = $1 RETURNING *")
            .bind(item_id)
            .bind(quantity)
            .fetch_one(&mut *tx)
            .await?;

    tx.commit().await?;
    Ok(CartItemDetail { item, product })
}

pub async fn remove(pool: &PgPool, user_id: &str, item_id: &str) -> ServiceResult<()> {
    let mut tx = pool.begin().await?;
    lock_owned_item(&mut *tx, user_id, item_id, "remove").await?;

    sqlx::query("DELETE FROM cart_items WHERE id = $1")
        .bind(item_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn clear(pool: &PgPool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
