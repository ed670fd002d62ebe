use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Order, OrderItem, OrderItemDetail, OrderStatus, OrderWithItems, Product, SellerSales,
};
use shared::request::{PaginatedResponse, Pagination};
use shared::util::{new_id, now_millis};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;

use super::products;
use crate::error::ServiceResult;
use crate::orders::{self, CheckoutLine};

/// `orders` row with the status still as text
#[derive(sqlx::FromRow)]
struct OrderRow {
    id: String,
    user_id: String,
    status: String,
    total_amount: Decimal,
    shipping_address: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = OrderStatus::from_db(&row.status).ok_or_else(|| {
            AppError::internal(format!("Unknown order status in database: {}", row.status))
        })?;
        Ok(Order {
            id: row.id,
            user_id: row.user_id,
            status,
            total_amount: row.total_amount,
            shipping_address: row.shipping_address,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CartRow {
    id: String,
    product_id: String,
    quantity: i32,
}

/// Load the items of many orders in two queries
async fn attach_items(
    conn: &mut PgConnection,
    orders: Vec<Order>,
) -> ServiceResult<Vec<OrderWithItems>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }
    let order_ids: Vec<String> = orders.iter().map(|o| o.id.clone()).collect();
    let items: Vec<OrderItem> =
        sqlx::query_as("SELECT * FROM order_items WHERE order_id = ANY($1) ORDER BY id")
            .bind(&order_ids)
            .fetch_all(&mut *conn)
            .await?;

    let mut product_ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
    product_ids.sort();
    product_ids.dedup();
    let product_map = products::summaries(conn, &product_ids).await?;

    let mut by_order: HashMap<String, Vec<OrderItemDetail>> = HashMap::new();
    for item in items {
        let product = products::summary_or_placeholder(&product_map, &item.product_id);
        by_order
            .entry(item.order_id.clone())
            .or_default()
            .push(OrderItemDetail { item, product });
    }

    Ok(orders
        .into_iter()
        .map(|order| OrderWithItems {
            items: by_order.remove(&order.id).unwrap_or_default(),
            order,
        })
        .collect())
}

async fn load_order(
    conn: &mut PgConnection,
    id: &str,
    lock: bool,
) -> ServiceResult<Option<OrderWithItems>> {
    let sql = if lock {
        "SELECT * FROM orders WHERE id = $1 FOR UPDATE"
    } else {
        "SELECT * FROM orders WHERE id = $1"
    };
    let Some(row) = sqlx::query_as::<_, OrderRow>(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };
    let order = Order::try_from(row)?;
    Ok(attach_items(conn, vec![order]).await?.pop())
}

/// Turn the caller's cart into a PENDING order
///
/// Cart rows and product rows are locked (products in id order) before the
/// stock check, so concurrent checkouts of the same product serialize here.
pub async fn place(
    pool: &PgPool,
    user_id: &str,
    shipping_address: &str,
) -> ServiceResult<OrderWithItems> {
    let mut tx = pool.begin().await?;

    let cart: Vec<CartRow> = sqlx::query_as(
        "SELECT id, product_id, quantity FROM cart_items
         WHERE user_id = $1
         ORDER BY created_at, id
         FOR UPDATE",
    )
    .bind(user_id)
    .fetch_all(&mut *tx)
    .await?;
    if cart.is_empty() {
        return Err(AppError::new(ErrorCode::CartEmpty).into());
    }

    let mut product_ids: Vec<String> = cart.iter().map(|c| c.product_id.clone()).collect();
    product_ids.sort();
    product_ids.dedup();
    let locked: Vec<Product> =
        sqlx::query_as("SELECT * FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE")
            .bind(&product_ids)
            .fetch_all(&mut *tx)
            .await?;
    let product_map: HashMap<&str, &Product> =
        locked.iter().map(|p| (p.id.as_str(), p)).collect();

    let lines = cart
        .iter()
        .map(|c| {
            let product = product_map
                .get(c.product_id.as_str())
                .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
            Ok(CheckoutLine {
                cart_item_id: c.id.clone(),
                product_id: product.id.clone(),
                product_name: product.name.clone(),
                quantity: c.quantity,
                unit_price: product.price,
                stock: product.stock,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let plan = orders::plan_checkout(&lines)?;
    let now = now_millis();
    let order_id = new_id();

    sqlx::query(
        "INSERT INTO orders (id, user_id, status, total_amount, shipping_address, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)",
    )
    .bind(&order_id)
    .bind(user_id)
    .bind(OrderStatus::Pending.as_db())
    .bind(plan.total)
    .bind(shipping_address)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for line in &plan.lines {
        sqlx::query(
            "INSERT INTO order_items (id, order_id, product_id, quantity, price)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(new_id())
        .bind(&order_id)
        .bind(&line.product_id)
        .bind(line.quantity)
        .bind(line.unit_price)
        .execute(&mut *tx)
        .await?;
    }

    for (product_id, quantity) in &plan.decrements {
        let result = sqlx::query(
            "UPDATE products SET stock = stock - $1, updated_at = $3
             WHERE id = $2 AND stock >= $1",
        )
        .bind(quantity)
        .bind(product_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        // Rows are locked, so this only trips if the lock was bypassed
        if result.rows_affected() != 1 {
            return Err(AppError::new(ErrorCode::InsufficientStock)
                .with_detail("product_id", product_id.as_str())
                .into());
        }
    }

    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

    let placed = load_order(&mut *tx, &order_id, false)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        user_id = %user_id,
        total = %plan.total,
        items = plan.lines.len(),
        "Order placed"
    );
    Ok(placed)
}

pub async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
    status: Option<OrderStatus>,
    page: Pagination,
) -> ServiceResult<PaginatedResponse<OrderWithItems>> {
    let mut conn = pool.acquire().await?;
    let status = status.map(|s| s.as_db());

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM orders
         WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)",
    )
    .bind(user_id)
    .bind(status)
    .fetch_one(&mut *conn)
    .await?;

    let rows: Vec<OrderRow> = sqlx::query_as(
        "SELECT * FROM orders
         WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
         ORDER BY created_at DESC, id
         LIMIT $3 OFFSET $4",
    )
    .bind(user_id)
    .bind(status)
    .bind(i64::from(page.limit))
    .bind(page.offset() as i64)
    .fetch_all(&mut *conn)
    .await?;

    let orders = rows
        .into_iter()
        .map(Order::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let data = attach_items(&mut conn, orders).await?;
    Ok(PaginatedResponse::new(data, total as u64, page))
}

pub async fn find_with_items(pool: &PgPool, id: &str) -> ServiceResult<Option<OrderWithItems>> {
    let mut conn = pool.acquire().await?;
    load_order(&mut conn, id, false).await
}

/// Apply a status change under the order row lock
pub async fn update_status(
    pool: &PgPool,
    order_id: &str,
    user_id: &str,
    to: OrderStatus,
) -> ServiceResult<OrderWithItems> {
    let mut tx = pool.begin().await?;
    let current = load_order(&mut *tx, order_id, true)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;

    let actor = orders::resolve_actor(&current, user_id)?;
    let change = orders::transition(actor, current.order.status, to)?;
    let now = now_millis();

    if change.restores_stock {
        let mut restores: Vec<(&str, i32)> = current
            .items
            .iter()
            .map(|i| (i.item.product_id.as_str(), i.item.quantity))
            .collect();
        restores.sort_by(|a, b| a.0.cmp(b.0));
        for (product_id, quantity) in restores {
            sqlx::query("UPDATE products SET stock = stock + $1, updated_at = $3 WHERE id = $2")
                .bind(quantity)
                .bind(product_id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }
    }

    sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(order_id)
        .bind(to.as_db())
        .bind(now)
        .execute(&mut *tx)
        .await?;

    let updated = load_order(&mut *tx, order_id, false)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
    tx.commit().await?;

    tracing::info!(
        order_id = %order_id,
        user_id = %user_id,
        actor = actor.as_str(),
        from = %change.from,
        to = %change.to,
        "Order status changed"
    );
    Ok(updated)
}

#[derive(sqlx::FromRow)]
struct SalesRow {
    total_sales: Decimal,
    total_order_items: i64,
    order_count: i64,
}

pub async fn seller_sales(pool: &PgPool, seller_id: &str) -> Result<SellerSales, sqlx::Error> {
    let row: SalesRow = sqlx::query_as(
        "SELECT COALESCE(SUM(oi.price * oi.quantity), 0) AS total_sales,
                COALESCE(SUM(oi.quantity), 0)::bigint AS total_order_items,
                COUNT(DISTINCT oi.order_id) AS order_count
         FROM order_items oi
         JOIN orders o ON o.id = oi.order_id
         JOIN products p ON p.id = oi.product_id
         WHERE p.seller_id = $1
           AND o.status IN ('CONFIRMED', 'SHIPPED', 'DELIVERED')",
    )
    .bind(seller_id)
    .fetch_one(pool)
    .await?;

    Ok(SellerSales {
        seller_id: seller_id.to_string(),
        total_sales: row.total_sales,
        total_order_items: row.total_order_items,
        order_count: row.order_count,
    })
}
