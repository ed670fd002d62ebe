//! PostgreSQL backend
//!
//! Free functions per table taking `&PgPool` (or a transaction connection),
//! wrapped by [`PgStore`] for the `MarketStore` seam.

mod cart;
mod orders;
mod products;
mod reviews;
mod users;

use async_trait::async_trait;
use shared::models::{
    CartItemDetail, NewProduct, NewReview, OrderStatus, OrderWithItems, Product, ProductFilter,
    ProductUpdate, ProductWithSeller, ProfileUpdate, ReviewDetail, ReviewFilter, ReviewPage,
    ReviewUpdate, SellerSales, User, UserCreate,
};
use shared::request::{PaginatedResponse, Pagination};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use super::MarketStore;
use crate::error::{BoxError, ServiceResult};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and run embedded migrations
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");

        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MarketStore for PgStore {
    async fn create_user(&self, input: UserCreate) -> ServiceResult<User> {
        users::create(&self.pool, input).await
    }

    async fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        Ok(users::find_by_email(&self.pool, email).await?)
    }

    async fn find_user(&self, id: &str) -> ServiceResult<Option<User>> {
        Ok(users::find_by_id(&self.pool, id).await?)
    }

    async fn count_products_by_seller(&self, seller_id: &str) -> ServiceResult<i64> {
        Ok(products::count_by_seller(&self.pool, seller_id).await?)
    }

    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<User> {
        users::update_profile(&self.pool, user_id, update).await
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> ServiceResult<PaginatedResponse<ProductWithSeller>> {
        products::list(&self.pool, filter, page).await
    }

    async fn get_product(&self, id: &str) -> ServiceResult<Option<ProductWithSeller>> {
        products::find_with_seller(&self.pool, id).await
    }

    async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        products::create(&self.pool, input).await
    }

    async fn update_product(
        &self,
        id: &str,
        seller_id: &str,
        update: ProductUpdate,
    ) -> ServiceResult<Product> {
        products::update(&self.pool, id, seller_id, update).await
    }

    async fn delete_product(&self, id: &str, seller_id: &str) -> ServiceResult<()> {
        products::delete(&self.pool, id, seller_id).await
    }

    async fn cart_items(&self, user_id: &str) -> ServiceResult<Vec<CartItemDetail>> {
        cart::list(&self.pool, user_id).await
    }

    async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> ServiceResult<CartItemDetail> {
        cart::add(&self.pool, user_id, product_id, quantity).await
    }

    async fn set_cart_quantity(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i32,
    ) -> ServiceResult<CartItemDetail> {
        cart::set_quantity(&self.pool, user_id, item_id, quantity).await
    }

    async fn remove_cart_item(&self, user_id: &str, item_id: &str) -> ServiceResult<()> {
        cart::remove(&self.pool, user_id, item_id).await
    }

    async fn clear_cart(&self, user_id: &str) -> ServiceResult<u64> {
        Ok(cart::clear(&self.pool, user_id).await?)
    }

    async fn place_order(
        &self,
        user_id: &str,
        shipping_address: &str,
    ) -> ServiceResult<OrderWithItems> {
        orders::place(&self.pool, user_id, shipping_address).await
    }

    async fn list_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> ServiceResult<PaginatedResponse<OrderWithItems>> {
        orders::list_for_user(&self.pool, user_id, status, page).await
    }

    async fn get_order(&self, id: &str) -> ServiceResult<Option<OrderWithItems>> {
        orders::find_with_items(&self.pool, id).await
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        user_id: &str,
        to: OrderStatus,
    ) -> ServiceResult<OrderWithItems> {
        orders::update_status(&self.pool, order_id, user_id, to).await
    }

    async fn seller_sales(&self, seller_id: &str) -> ServiceResult<SellerSales> {
        Ok(orders::seller_sales(&self.pool, seller_id).await?)
    }

    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        page: Pagination,
    ) -> ServiceResult<ReviewPage> {
        reviews::list(&self.pool, filter, page).await
    }

    async fn get_review(&self, id: &str) -> ServiceResult<Option<ReviewDetail>> {
        reviews::find_detail(&self.pool, id).await
    }

    async fn create_review(&self, input: NewReview) -> ServiceResult<ReviewDetail> {
        reviews::create(&self.pool, input).await
    }

    async fn update_review(
        &self,
        id: &str,
        author_id: &str,
        update: ReviewUpdate,
    ) -> ServiceResult<ReviewDetail> {
        reviews::update(&self.pool, id, author_id, update).await
    }

    async fn delete_review(&self, id: &str, author_id: &str) -> ServiceResult<()> {
        reviews::delete(&self.pool, id, author_id).await
    }
}
