//! Order events reach the log with their ids

mod common;

use std::io;
use std::sync::{Arc, Mutex};

use common::TestApp;
use http::StatusCode;
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

struct BufferWriter(Arc<Mutex<Vec<u8>>>);

impl<'a> MakeWriter<'a> for SharedBuffer {
    type Writer = BufferWriter;

    fn make_writer(&'a self) -> Self::Writer {
        BufferWriter(Arc::clone(&self.0))
    }
}

impl io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().expect("log buffer lock").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn events(&self) -> Vec<Value> {
        let bytes = self.0.lock().expect("log buffer lock").clone();
        String::from_utf8(bytes)
            .expect("utf8 log output")
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

fn find<'a>(events: &'a [Value], message: &str) -> &'a Value {
    events
        .iter()
        .find(|e| e["fields"]["message"] == message)
        .unwrap_or_else(|| panic!("no {message:?} event in {events:#?}"))
}

#[tokio::test]
async fn test_order_placement_and_cancellation_are_logged() {
    let sink = SharedBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(sink.clone())
        .json()
        .with_max_level(tracing::Level::INFO)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let app = TestApp::new();
    let (seller, _) = app.user("potter@example.com");
    let (buyer, token) = app.user("patron@example.com");
    let bowl = app.product(&seller, "Bowl", 1800, 3);

    app.post("/api/cart", Some(&token), json!({"productId": bowl.id, "quantity": 2}))
        .await;
    let placed = app
        .post("/api/orders", Some(&token), json!({"shippingAddress": "4 Kiln Rd"}))
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    let order_id = placed.data()["id"].as_str().unwrap().to_string();

    let cancel = app
        .put(&format!("/api/orders/{order_id}"), Some(&token), json!({"status": "CANCELLED"}))
        .await;
    assert_eq!(cancel.status, StatusCode::OK);

    let events = sink.events();

    let placed = find(&events, "Order placed");
    assert_eq!(placed["level"], "INFO");
    assert_eq!(placed["fields"]["order_id"], order_id.as_str());
    assert_eq!(placed["fields"]["user_id"], buyer.id.as_str());
    assert_eq!(placed["fields"]["items"], 1);

    let changed = find(&events, "Order status changed");
    assert_eq!(changed["fields"]["order_id"], order_id.as_str());
    assert_eq!(changed["fields"]["user_id"], buyer.id.as_str());
    assert_eq!(changed["fields"]["actor"], "customer");
    assert_eq!(changed["fields"]["from"], "PENDING");
    assert_eq!(changed["fields"]["to"], "CANCELLED");
}
