//! Persistence for the marketplace
//!
//! `MarketStore` is the seam between the API handlers and storage. Every
//! operation that must be atomic is one trait method, so each backend owns
//! its transaction boundary:
//!
//! - [`PgStore`]: PostgreSQL via sqlx, row locks inside one transaction
//! - [`MemoryStore`]: in-process tables behind a single mutex, used for
//!   local development without a database and by the test suite

mod memory;
pub mod pg;
pub mod seed;

pub use memory::MemoryStore;
pub use pg::PgStore;

use async_trait::async_trait;
use shared::models::{
    CartItemDetail, NewProduct, NewReview, OrderStatus, OrderWithItems, Product, ProductFilter,
    ProductUpdate, ProductWithSeller, ProfileUpdate, ReviewDetail, ReviewFilter, ReviewPage,
    ReviewUpdate, SellerSales, User, UserCreate,
};
use shared::request::{PaginatedResponse, Pagination};

use crate::error::ServiceResult;

#[async_trait]
pub trait MarketStore: Send + Sync {
    // ── Users ──

    /// Fails with `EmailAlreadyTaken` if the email is registered
    async fn create_user(&self, input: UserCreate) -> ServiceResult<User>;

    async fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>>;

    async fn find_user(&self, id: &str) -> ServiceResult<Option<User>>;

    /// Number of products listed by the user
    async fn count_products_by_seller(&self, seller_id: &str) -> ServiceResult<i64>;

    /// Fails with `EmailAlreadyTaken` if another user owns the new email
    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<User>;

    // ── Products ──

    /// Newest first
    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> ServiceResult<PaginatedResponse<ProductWithSeller>>;

    async fn get_product(&self, id: &str) -> ServiceResult<Option<ProductWithSeller>>;

    /// Inserts the product and marks its creator as a seller
    async fn create_product(&self, input: NewProduct) -> ServiceResult<Product>;

    /// Owner only
    async fn update_product(
        &self,
        id: &str,
        seller_id: &str,
        update: ProductUpdate,
    ) -> ServiceResult<Product>;

    /// Owner only; fails with `ProductInUse` while any cart or order references it
    async fn delete_product(&self, id: &str, seller_id: &str) -> ServiceResult<()>;

    // ── Cart ──

    /// Newest first
    async fn cart_items(&self, user_id: &str) -> ServiceResult<Vec<CartItemDetail>>;

    /// Merges into an existing line for the same product; the merged quantity
    /// must not exceed stock
    async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> ServiceResult<CartItemDetail>;

    /// Owner only; quantity must not exceed stock
    async fn set_cart_quantity(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i32,
    ) -> ServiceResult<CartItemDetail>;

    /// Owner only
    async fn remove_cart_item(&self, user_id: &str, item_id: &str) -> ServiceResult<()>;

    /// Returns the number of removed lines
    async fn clear_cart(&self, user_id: &str) -> ServiceResult<u64>;

    // ── Orders ──

    /// Atomically: check every cart line against current stock, create the
    /// order and its items at current prices, decrement stock, empty the cart.
    async fn place_order(
        &self,
        user_id: &str,
        shipping_address: &str,
    ) -> ServiceResult<OrderWithItems>;

    /// Orders placed by the user, newest first
    async fn list_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> ServiceResult<PaginatedResponse<OrderWithItems>>;

    async fn get_order(&self, id: &str) -> ServiceResult<Option<OrderWithItems>>;

    /// Atomically: resolve the acting user's role, validate the transition
    /// against the current status, restore stock on cancellation, write the
    /// new status.
    async fn update_order_status(
        &self,
        order_id: &str,
        user_id: &str,
        to: OrderStatus,
    ) -> ServiceResult<OrderWithItems>;

    async fn seller_sales(&self, seller_id: &str) -> ServiceResult<SellerSales>;

    // ── Reviews ──

    /// Newest first, with an aggregate over the whole filtered set
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        page: Pagination,
    ) -> ServiceResult<ReviewPage>;

    async fn get_review(&self, id: &str) -> ServiceResult<Option<ReviewDetail>>;

    /// Rejects own products and duplicates; sets `is_verified` when the author
    /// has a confirmed or delivered order containing the product
    async fn create_review(&self, input: NewReview) -> ServiceResult<ReviewDetail>;

    /// Author only
    async fn update_review(
        &self,
        id: &str,
        author_id: &str,
        update: ReviewUpdate,
    ) -> ServiceResult<ReviewDetail>;

    /// Author only
    async fn delete_review(&self, id: &str, author_id: &str) -> ServiceResult<()>;
}
