//! Demo data for the in-memory store
//!
//! Loaded when no database is configured and `SEED_DEMO_DATA` is on.
//! Both demo accounts use the password `password123`.

use rust_decimal::Decimal;
use shared::models::{Product, User};
use shared::util::{new_id, now_millis};

use super::MemoryStore;
use crate::util::hash_password;

pub const DEMO_PASSWORD: &str = "password123";

/// (name, description, price in cents, category, stock)
const DEMO_PRODUCTS: &[(&str, &str, i64, &str, i32)] = &[
    (
        "Hand-thrown Ceramic Mug",
        "Stoneware mug with a speckled glaze, 350 ml.",
        1850,
        "Home",
        24,
    ),
    (
        "Walnut Cutting Board",
        "End-grain walnut board finished with food-safe oil.",
        6400,
        "Kitchen",
        8,
    ),
    (
        "Linen Tea Towel Set",
        "Set of two stonewashed linen towels.",
        2200,
        "Kitchen",
        40,
    ),
    (
        "Beeswax Taper Candles",
        "Pair of hand-dipped pure beeswax candles.",
        1400,
        "Home",
        60,
    ),
    (
        "Leather Card Wallet",
        "Vegetable-tanned leather, stitched by hand.",
        4500,
        "Accessories",
        15,
    ),
    (
        "Wool Knit Beanie",
        "Merino wool beanie in charcoal.",
        3200,
        "Apparel",
        0,
    ),
];

fn demo_user(email: &str, first: &str, last: &str, hashed: &str, is_seller: bool) -> User {
    let now = now_millis();
    User {
        id: new_id(),
        email: email.to_string(),
        hashed_password: hashed.to_string(),
        first_name: first.to_string(),
        last_name: last.to_string(),
        phone: None,
        profile_picture_url: None,
        is_seller,
        member_since: now,
        created_at: now,
    }
}

/// Demo seller, demo shopper, and the seller's catalog
pub fn demo_data() -> Result<(Vec<User>, Vec<Product>), argon2::password_hash::Error> {
    let hashed = hash_password(DEMO_PASSWORD)?;
    let seller = demo_user("maker@market.dev", "Maya", "Maker", &hashed, true);
    let shopper = demo_user("shopper@market.dev", "Sam", "Shopper", &hashed, false);

    let now = now_millis();
    let products = DEMO_PRODUCTS
        .iter()
        .enumerate()
        .map(|(idx, &(name, description, cents, category, stock))| Product {
            id: new_id(),
            seller_id: seller.id.clone(),
            name: name.to_string(),
            description: description.to_string(),
            price: Decimal::new(cents, 2),
            image_url: None,
            category: category.to_string(),
            stock,
            // Distinct timestamps keep the listing order stable
            created_at: now - (DEMO_PRODUCTS.len() - idx) as i64,
            updated_at: now,
        })
        .collect();

    Ok((vec![seller, shopper], products))
}

pub fn seed_memory(store: &MemoryStore) -> Result<(), argon2::password_hash::Error> {
    let (users, products) = demo_data()?;
    tracing::info!(
        users = users.len(),
        products = products.len(),
        "Seeded demo data into in-memory store"
    );
    store.load(users, products);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::verify_password;

    #[test]
    fn test_demo_data_is_consistent() {
        let (users, products) = demo_data().unwrap();
        let seller = &users[0];
        assert!(seller.is_seller);
        assert!(verify_password(DEMO_PASSWORD, &seller.hashed_password));
        assert_eq!(products.len(), DEMO_PRODUCTS.len());
        assert!(products.iter().all(|p| p.seller_id == seller.id));
        assert!(products.iter().all(|p| p.price > Decimal::ZERO && p.stock >= 0));
        assert_eq!(products[0].price, Decimal::new(1850, 2));
    }
}
