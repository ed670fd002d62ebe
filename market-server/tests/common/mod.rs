//! Test harness: the real router over an in-memory store

#![allow(dead_code)]

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use axum::Router;
use axum::body::Body;
use http::{HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use market_server::AppState;
use market_server::api::create_router;
use market_server::auth::{JwtConfig, JwtService};
use market_server::store::MemoryStore;
use market_server::util::hash_password;
use rust_decimal::Decimal;
use serde_json::Value;
use shared::models::{Product, User};
use shared::util::{new_id, now_millis};
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse";

/// Hashing is slow in debug builds, so every fixture user shares one hash
fn password_hash() -> String {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(PASSWORD).unwrap()).clone()
}

/// Each request gets its own client IP so rate limits only bite when a test
/// pins one on purpose.
static NEXT_IP: AtomicU32 = AtomicU32::new(1);

fn next_ip() -> String {
    let n = NEXT_IP.fetch_add(1, Ordering::Relaxed);
    format!("10.{}.{}.{}", (n >> 16) & 0xff, (n >> 8) & 0xff, n & 0xff)
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub jwt: JwtService,
}

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Response {
    pub fn code(&self) -> u64 {
        self.body["code"].as_u64().unwrap_or_default()
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

fn jwt() -> JwtService {
    JwtService::with_config(JwtConfig {
        secret: "integration-test-secret".into(),
        expiry_hours: 1,
    })
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::with_store(store.clone(), jwt(), false);
        Self {
            router: create_router(state),
            store,
            jwt: jwt(),
        }
    }

    /// Insert a user directly and return it with a valid token
    pub fn user(&self, email: &str) -> (User, String) {
        let now = now_millis();
        let user = User {
            id: new_id(),
            email: email.to_string(),
            hashed_password: password_hash(),
            first_name: email.split('@').next().unwrap().to_string(),
            last_name: "Tester".into(),
            phone: None,
            profile_picture_url: None,
            is_seller: false,
            member_since: now,
            created_at: now,
        };
        let token = self.jwt.generate_token(&user.id, &user.email).unwrap();
        self.store.load(vec![user.clone()], Vec::new());
        (user, token)
    }

    /// Insert a product owned by `seller`
    pub fn product(&self, seller: &User, name: &str, cents: i64, stock: i32) -> Product {
        let now = now_millis();
        let product = Product {
            id: new_id(),
            seller_id: seller.id.clone(),
            name: name.to_string(),
            description: format!("{name} description"),
            price: Decimal::new(cents, 2),
            image_url: None,
            category: "Home".into(),
            stock,
            created_at: now,
            updated_at: now,
        };
        self.store.load(Vec::new(), vec![product.clone()]);
        product
    }

    pub fn stock(&self, product: &Product) -> i32 {
        self.store.stock_of(&product.id).unwrap()
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        self.request_from(&next_ip(), method, uri, token, body).await
    }

    pub async fn request_from(
        &self,
        ip: &str,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", ip);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        send(self.router.clone(), request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: Option<&str>, body: Value) -> Response {
        self.request(Method::PUT, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> Response {
        self.request(Method::DELETE, uri, token, None).await
    }
}

pub async fn send(router: Router, request: Request<Body>) -> Response {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    Response {
        status,
        headers,
        body,
    }
}
