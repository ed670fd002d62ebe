//! In-memory store
//!
//! All tables live behind one `parking_lot::Mutex`; every trait method takes
//! the lock once, so each operation is atomic with respect to all others.

use async_trait::async_trait;
use parking_lot::Mutex;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CartItem, CartItemDetail, NewProduct, NewReview, Order, OrderItem, OrderItemDetail,
    OrderStatus, OrderWithItems, Product, ProductFilter, ProductUpdate, ProductWithSeller,
    ProfileUpdate, Review, ReviewDetail, ReviewFilter, ReviewPage, ReviewSummary, ReviewUpdate,
    SellerSales, User, UserCreate, UserSummary,
};
use shared::request::{PaginatedResponse, Pagination};
use shared::util::{new_id, now_millis};
use std::collections::BTreeMap;

use super::MarketStore;
use crate::error::ServiceResult;
use crate::orders::{self, CheckoutLine, SaleLine};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    reviews: Vec<Review>,
}

/// Newest first; ties keep the most recently inserted row first
fn newest_first<T>(
    rows: impl DoubleEndedIterator<Item = T>,
    created_at: impl Fn(&T) -> i64,
) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by_key(|row| std::cmp::Reverse(created_at(row)));
    rows
}

impl Tables {
    fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    fn user_summary(&self, id: &str) -> UserSummary {
        self.user(id).map(User::summary).unwrap_or_else(|| UserSummary {
            id: id.to_string(),
            first_name: String::new(),
            last_name: String::new(),
            profile_picture_url: None,
        })
    }

    fn product(&self, id: &str) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    fn product_mut(&mut self, id: &str) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    fn product_with_seller(&self, product: &Product) -> ProductWithSeller {
        let ratings: Vec<i32> = self
            .reviews
            .iter()
            .filter(|r| r.product_id == product.id)
            .map(|r| r.rating)
            .collect();
        ProductWithSeller {
            product: product.clone(),
            seller: self.user_summary(&product.seller_id),
            average_rating: average(&ratings),
            review_count: ratings.len() as i64,
        }
    }

    fn cart_detail(&self, item: &CartItem) -> Result<CartItemDetail, AppError> {
        let product = self
            .product(&item.product_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        Ok(CartItemDetail {
            item: item.clone(),
            product: product.clone(),
        })
    }

    fn order_with_items(&self, order: &Order) -> OrderWithItems {
        let items = self
            .order_items
            .iter()
            .filter(|i| i.order_id == order.id)
            .filter_map(|i| {
                self.product(&i.product_id).map(|p| OrderItemDetail {
                    item: i.clone(),
                    product: p.summary(),
                })
            })
            .collect();
        OrderWithItems {
            order: order.clone(),
            items,
        }
    }

    fn find_order(&self, id: &str) -> Result<OrderWithItems, AppError> {
        self.orders
            .iter()
            .find(|o| o.id == id)
            .map(|o| self.order_with_items(o))
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))
    }

    fn review_detail(&self, review: &Review) -> Result<ReviewDetail, AppError> {
        let product = self
            .product(&review.product_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        Ok(ReviewDetail {
            review: review.clone(),
            author: self.user_summary(&review.author_id),
            product: product.summary(),
            target: self.user_summary(&review.target_id),
        })
    }

    /// Author has a confirmed or delivered order containing the product
    fn has_purchased(&self, user_id: &str, product_id: &str) -> bool {
        self.orders
            .iter()
            .filter(|o| o.user_id == user_id)
            .filter(|o| matches!(o.status, OrderStatus::Confirmed | OrderStatus::Delivered))
            .any(|o| {
                self.order_items
                    .iter()
                    .any(|i| i.order_id == o.id && i.product_id == product_id)
            })
    }
}

fn average(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    ratings.iter().map(|&r| f64::from(r)).sum::<f64>() / ratings.len() as f64
}

/// In-process backend for development and tests
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert prebuilt rows (demo data, test fixtures)
    pub fn load(&self, users: Vec<User>, products: Vec<Product>) {
        let mut t = self.tables.lock();
        t.users.extend(users);
        t.products.extend(products);
    }

    /// Current stock of a product, if it exists
    pub fn stock_of(&self, product_id: &str) -> Option<i32> {
        self.tables.lock().product(product_id).map(|p| p.stock)
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn create_user(&self, input: UserCreate) -> ServiceResult<User> {
        let mut t = self.tables.lock();
        if t.users.iter().any(|u| u.email == input.email) {
            return Err(AppError::new(ErrorCode::EmailAlreadyTaken).into());
        }
        let now = now_millis();
        let user = User {
            id: new_id(),
            email: input.email,
            hashed_password: input.hashed_password,
            first_name: input.first_name,
            last_name: input.last_name,
            phone: None,
            profile_picture_url: None,
            is_seller: false,
            member_since: now,
            created_at: now,
        };
        t.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> ServiceResult<Option<User>> {
        let t = self.tables.lock();
        Ok(t.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: &str) -> ServiceResult<Option<User>> {
        Ok(self.tables.lock().user(id).cloned())
    }

    async fn count_products_by_seller(&self, seller_id: &str) -> ServiceResult<i64> {
        let t = self.tables.lock();
        Ok(t.products.iter().filter(|p| p.seller_id == seller_id).count() as i64)
    }

    async fn update_profile(&self, user_id: &str, update: ProfileUpdate) -> ServiceResult<User> {
        let mut t = self.tables.lock();
        if let Some(email) = &update.email
            && t.users.iter().any(|u| &u.email == email && u.id != user_id)
        {
            return Err(AppError::new(ErrorCode::EmailAlreadyTaken).into());
        }
        let user = t
            .users
            .iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if update.phone.is_some() {
            user.phone = update.phone;
        }
        if update.profile_picture_url.is_some() {
            user.profile_picture_url = update.profile_picture_url;
        }
        Ok(user.clone())
    }

    async fn list_products(
        &self,
        filter: &ProductFilter,
        page: Pagination,
    ) -> ServiceResult<PaginatedResponse<ProductWithSeller>> {
        let t = self.tables.lock();
        let matching = newest_first(
            t.products.iter().filter(|p| filter.matches(p)),
            |p| p.created_at,
        );
        let all = matching
            .into_iter()
            .map(|p| t.product_with_seller(p))
            .collect();
        Ok(PaginatedResponse::from_vec(all, page))
    }

    async fn get_product(&self, id: &str) -> ServiceResult<Option<ProductWithSeller>> {
        let t = self.tables.lock();
        Ok(t.product(id).map(|p| t.product_with_seller(p)))
    }

    async fn create_product(&self, input: NewProduct) -> ServiceResult<Product> {
        let mut t = self.tables.lock();
        let now = now_millis();
        let product = Product {
            id: new_id(),
            seller_id: input.seller_id,
            name: input.name,
            description: input.description,
            price: input.price,
            image_url: input.image_url,
            category: input.category,
            stock: input.stock,
            created_at: now,
            updated_at: now,
        };
        if let Some(seller) = t.users.iter_mut().find(|u| u.id == product.seller_id) {
            seller.is_seller = true;
        }
        t.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(
        &self,
        id: &str,
        seller_id: &str,
        update: ProductUpdate,
    ) -> ServiceResult<Product> {
        let mut t = self.tables.lock();
        let product = t
            .product_mut(id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        if product.seller_id != seller_id {
            return Err(AppError::not_owner("You can only update your own products").into());
        }

        if let Some(name) = update.name {
            product.name = name;
        }
        if let Some(description) = update.description {
            product.description = description;
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if update.image_url.is_some() {
            product.image_url = update.image_url;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(stock) = update.stock {
            product.stock = stock;
        }
        product.updated_at = now_millis();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: &str, seller_id: &str) -> ServiceResult<()> {
        let mut t = self.tables.lock();
        let product = t
            .product(id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        if product.seller_id != seller_id {
            return Err(AppError::not_owner("You can only delete your own products").into());
        }
        let in_cart = t.cart_items.iter().any(|c| c.product_id == id);
        let in_order = t.order_items.iter().any(|i| i.product_id == id);
        if in_cart || in_order {
            return Err(AppError::new(ErrorCode::ProductInUse)
                .with_detail("in_cart", in_cart)
                .with_detail("in_order", in_order)
                .into());
        }
        t.reviews.retain(|r| r.product_id != id);
        t.products.retain(|p| p.id != id);
        Ok(())
    }

    async fn cart_items(&self, user_id: &str) -> ServiceResult<Vec<CartItemDetail>> {
        let t = self.tables.lock();
        let items = newest_first(
            t.cart_items.iter().filter(|c| c.user_id == user_id),
            |c| c.created_at,
        );
        let details = items
            .into_iter()
            .map(|c| t.cart_detail(c))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(details)
    }

    async fn add_to_cart(
        &self,
        user_id: &str,
        product_id: &str,
        quantity: i32,
    ) -> ServiceResult<CartItemDetail> {
        let mut t = self.tables.lock();
        let product = t
            .product(product_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?
            .clone();

        let existing = t
            .cart_items
            .iter()
            .position(|c| c.user_id == user_id && c.product_id == product_id);
        let current = existing.map_or(0, |idx| t.cart_items[idx].quantity);
        let requested = current.checked_add(quantity).ok_or_else(|| {
            AppError::with_message(ErrorCode::InvalidQuantity, "Quantity is out of range")
        })?;
        if requested > product.stock {
            return Err(AppError::insufficient_stock(
                &product.id,
                &product.name,
                requested,
                product.stock,
            )
            .into());
        }

        let item = match existing {
            Some(idx) => {
                t.cart_items[idx].quantity = requested;
                t.cart_items[idx].clone()
            }
            None => {
                let item = CartItem {
                    id: new_id(),
                    user_id: user_id.to_string(),
                    product_id: product_id.to_string(),
                    quantity,
                    created_at: now_millis(),
                };
                t.cart_items.push(item.clone());
                item
            }
        };
        Ok(CartItemDetail { item, product })
    }

    async fn set_cart_quantity(
        &self,
        user_id: &str,
        item_id: &str,
        quantity: i32,
    ) -> ServiceResult<CartItemDetail> {
        let mut t = self.tables.lock();
        let idx = t
            .cart_items
            .iter()
            .position(|c| c.id == item_id)
            .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
        if t.cart_items[idx].user_id != user_id {
            return Err(AppError::not_owner("You can only update your own cart items").into());
        }
        let product = t
            .product(&t.cart_items[idx].product_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?
            .clone();
        if quantity > product.stock {
            return Err(AppError::insufficient_stock(
                &product.id,
                &product.name,
                quantity,
                product.stock,
            )
            .into());
        }
        t.cart_items[idx].quantity = quantity;
        Ok(CartItemDetail {
            item: t.cart_items[idx].clone(),
            product,
        })
    }

    async fn remove_cart_item(&self, user_id: &str, item_id: &str) -> ServiceResult<()> {
        let mut t = self.tables.lock();
        let idx = t
            .cart_items
            .iter()
            .position(|c| c.id == item_id)
            .ok_or_else(|| AppError::new(ErrorCode::CartItemNotFound))?;
        if t.cart_items[idx].user_id != user_id {
            return Err(AppError::not_owner("You can only remove your own cart items").into());
        }
        t.cart_items.remove(idx);
        Ok(())
    }

    async fn clear_cart(&self, user_id: &str) -> ServiceResult<u64> {
        let mut t = self.tables.lock();
        let before = t.cart_items.len();
        t.cart_items.retain(|c| c.user_id != user_id);
        Ok((before - t.cart_items.len()) as u64)
    }

    async fn place_order(
        &self,
        user_id: &str,
        shipping_address: &str,
    ) -> ServiceResult<OrderWithItems> {
        let mut t = self.tables.lock();

        let lines = t
            .cart_items
            .iter()
            .filter(|c| c.user_id == user_id)
            .map(|c| {
                let product = t
                    .product(&c.product_id)
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
        for (product_id, quantity) in &plan.decrements {
            if let Some(product) = t.product_mut(product_id) {
                product.stock -= quantity;
                product.updated_at = now;
            }
        }

        let order = Order {
            id: new_id(),
            user_id: user_id.to_string(),
            status: OrderStatus::Pending,
            total_amount: plan.total,
            shipping_address: shipping_address.to_string(),
            created_at: now,
            updated_at: now,
        };
        for line in &plan.lines {
            t.order_items.push(OrderItem {
                id: new_id(),
                order_id: order.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.unit_price,
            });
        }
        t.orders.push(order.clone());
        t.cart_items.retain(|c| c.user_id != user_id);

        tracing::info!(
            order_id = %order.id,
            user_id = %user_id,
            total = %plan.total,
            items = plan.lines.len(),
            "Order placed"
        );
        Ok(t.order_with_items(&order))
    }

    async fn list_orders(
        &self,
        user_id: &str,
        status: Option<OrderStatus>,
        page: Pagination,
    ) -> ServiceResult<PaginatedResponse<OrderWithItems>> {
        let t = self.tables.lock();
        let matching = newest_first(
            t.orders
                .iter()
                .filter(|o| o.user_id == user_id)
                .filter(|o| status.is_none_or(|s| o.status == s)),
            |o| o.created_at,
        );
        let all = matching
            .into_iter()
            .map(|o| t.order_with_items(o))
            .collect();
        Ok(PaginatedResponse::from_vec(all, page))
    }

    async fn get_order(&self, id: &str) -> ServiceResult<Option<OrderWithItems>> {
        let t = self.tables.lock();
        match t.find_order(id) {
            Ok(order) => Ok(Some(order)),
            Err(_) => Ok(None),
        }
    }

    async fn update_order_status(
        &self,
        order_id: &str,
        user_id: &str,
        to: OrderStatus,
    ) -> ServiceResult<OrderWithItems> {
        let mut t = self.tables.lock();
        let current = t.find_order(order_id)?;
        let actor = orders::resolve_actor(&current, user_id)?;
        let change = orders::transition(actor, current.order.status, to)?;

        let mut restored: BTreeMap<String, i32> = BTreeMap::new();
        if change.restores_stock {
            for line in &current.items {
                let Some(product) = t.product(&line.item.product_id) else {
                    continue;
                };
                let stock = restored.get(&product.id).copied().unwrap_or(product.stock);
                let stock = stock.checked_add(line.item.quantity).ok_or_else(|| {
                    AppError::with_message(
                        ErrorCode::ValueOutOfRange,
                        format!("Restoring stock for {} is out of range", product.name),
                    )
                    .with_detail("product_id", product.id.as_str())
                })?;
                restored.insert(product.id.clone(), stock);
            }
        }

        let now = now_millis();
        for (product_id, stock) in restored {
            if let Some(product) = t.product_mut(&product_id) {
                product.stock = stock;
                product.updated_at = now;
            }
        }

        let order = t
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| AppError::new(ErrorCode::OrderNotFound))?;
        order.status = to;
        order.updated_at = now;
        let order = order.clone();

        tracing::info!(
            order_id = %order_id,
            user_id = %user_id,
            actor = actor.as_str(),
            from = %change.from,
            to = %change.to,
            "Order status changed"
        );
        Ok(t.order_with_items(&order))
    }

    async fn seller_sales(&self, seller_id: &str) -> ServiceResult<SellerSales> {
        let t = self.tables.lock();
        let lines = t
            .order_items
            .iter()
            .filter(|i| t.product(&i.product_id).is_some_and(|p| p.seller_id == seller_id))
            .filter_map(|i| {
                t.orders.iter().find(|o| o.id == i.order_id).map(|o| SaleLine {
                    order_id: &o.id,
                    status: o.status,
                    quantity: i.quantity,
                    unit_price: i.price,
                })
            });
        Ok(orders::summarize_sales(seller_id, lines))
    }

    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        page: Pagination,
    ) -> ServiceResult<ReviewPage> {
        let t = self.tables.lock();
        let matching = newest_first(
            t.reviews.iter().filter(|r| filter.matches(r)),
            |r| r.created_at,
        );
        let ratings: Vec<i32> = matching.iter().map(|r| r.rating).collect();

        let rating_breakdown = filter.product_id.as_ref().map(|product_id| {
            ReviewSummary::breakdown(
                t.reviews
                    .iter()
                    .filter(|r| &r.product_id == product_id)
                    .map(|r| (r.rating, 1)),
            )
        });
        let summary = ReviewSummary {
            average_rating: average(&ratings),
            total_reviews: ratings.len() as i64,
            rating_breakdown,
        };

        let all = matching
            .into_iter()
            .map(|r| t.review_detail(r))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ReviewPage {
            page: PaginatedResponse::from_vec(all, page),
            summary,
        })
    }

    async fn get_review(&self, id: &str) -> ServiceResult<Option<ReviewDetail>> {
        let t = self.tables.lock();
        match t.reviews.iter().find(|r| r.id == id) {
            Some(review) => Ok(Some(t.review_detail(review)?)),
            None => Ok(None),
        }
    }

    async fn create_review(&self, input: NewReview) -> ServiceResult<ReviewDetail> {
        let mut t = self.tables.lock();
        let product = t
            .product(&input.product_id)
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        if product.seller_id == input.author_id {
            return Err(AppError::new(ErrorCode::CannotReviewOwnProduct).into());
        }
        if t
            .reviews
            .iter()
            .any(|r| r.product_id == input.product_id && r.author_id == input.author_id)
        {
            return Err(AppError::new(ErrorCode::ReviewAlreadyExists).into());
        }

        let now = now_millis();
        let review = Review {
            id: new_id(),
            target_id: product.seller_id.clone(),
            is_verified: t.has_purchased(&input.author_id, &input.product_id),
            product_id: input.product_id,
            author_id: input.author_id,
            rating: input.rating,
            title: input.title,
            comment: input.comment,
            is_helpful: 0,
            created_at: now,
            updated_at: now,
        };
        t.reviews.push(review.clone());
        Ok(t.review_detail(&review)?)
    }

    async fn update_review(
        &self,
        id: &str,
        author_id: &str,
        update: ReviewUpdate,
    ) -> ServiceResult<ReviewDetail> {
        let mut t = self.tables.lock();
        let review = t
            .reviews
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;
        if review.author_id != author_id {
            return Err(AppError::not_owner("You can only update your own reviews").into());
        }

        if let Some(rating) = update.rating {
            review.rating = rating;
        }
        if update.title.is_some() {
            review.title = update.title;
        }
        if update.comment.is_some() {
            review.comment = update.comment;
        }
        review.updated_at = now_millis();
        let review = review.clone();
        Ok(t.review_detail(&review)?)
    }

    async fn delete_review(&self, id: &str, author_id: &str) -> ServiceResult<()> {
        let mut t = self.tables.lock();
        let idx = t
            .reviews
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| AppError::new(ErrorCode::ReviewNotFound))?;
        if t.reviews[idx].author_id != author_id {
            return Err(AppError::not_owner("You can only delete your own reviews").into());
        }
        t.reviews.remove(idx);
        Ok(())
    }
}
