//! Concurrent checkouts against one scarce product
//!
//! Every buyer holds the product in their cart and places an order at the
//! same time. Stock must never go negative and exactly `STOCK` units sell.

mod common;

use common::TestApp;
use futures::future::join_all;
use http::StatusCode;
use serde_json::json;
use std::sync::Arc;

const BUYERS: usize = 40;
const STOCK: i32 = 15;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_checkouts_never_oversell() {
    let app = Arc::new(TestApp::new());
    let (seller, _) = app.user("seller@example.com");
    let widget = app.product(&seller, "Widget", 500, STOCK);

    let mut tokens = Vec::with_capacity(BUYERS);
    for i in 0..BUYERS {
        let (_, token) = app.user(&format!("buyer{i}@example.com"));
        let res = app
            .post("/api/cart", Some(&token), json!({"productId": widget.id, "quantity": 1}))
            .await;
        assert_eq!(res.status, StatusCode::CREATED);
        tokens.push(token);
    }

    let handles = tokens.into_iter().map(|token| {
        let app = app.clone();
        tokio::spawn(async move {
            app.post("/api/orders", Some(&token), json!({"shippingAddress": "Dock 9"}))
                .await
        })
    });
    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let placed = results
        .iter()
        .filter(|r| r.status == StatusCode::CREATED)
        .count();
    let rejected = results
        .iter()
        .filter(|r| r.status == StatusCode::CONFLICT && r.code() == 5004)
        .count();

    assert_eq!(placed, STOCK as usize);
    assert_eq!(rejected, BUYERS - STOCK as usize);
    assert_eq!(app.stock(&widget), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_cancels_restore_stock_once() {
    let app = Arc::new(TestApp::new());
    let (seller, _) = app.user("seller@example.com");
    let (_, buyer) = app.user("buyer@example.com");
    let gadget = app.product(&seller, "Gadget", 1500, 10);

    app.post("/api/cart", Some(&buyer), json!({"productId": gadget.id, "quantity": 4}))
        .await;
    let placed = app
        .post("/api/orders", Some(&buyer), json!({"shippingAddress": "Dock 9"}))
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    assert_eq!(app.stock(&gadget), 6);
    let order_uri = format!("/api/orders/{}", placed.data()["id"].as_str().unwrap());

    let handles = (0..10).map(|_| {
        let app = app.clone();
        let buyer = buyer.clone();
        let order_uri = order_uri.clone();
        tokio::spawn(async move {
            app.put(&order_uri, Some(&buyer), json!({"status": "CANCELLED"}))
                .await
                .status
        })
    });
    let statuses: Vec<StatusCode> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == StatusCode::OK).count(), 1);
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count(),
        9
    );
    assert_eq!(app.stock(&gadget), 10);
}
