//! Integration test support for the RocketShoes cart.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rocketshoes-integration-tests
//! ```
//!
//! Tests run against [`FakeShopApi`], an in-process `axum` server that serves
//! the same `products/{id}` and `stock/{id}` endpoints as the storefront API,
//! so the real HTTP client, cache, and file storage are exercised end to end.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rocketshoes_cart::{CartConfig, ConfigError};
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// Seconds advertised in `Retry-After` when rate limiting.
pub const RETRY_AFTER_SECS: u64 = 30;

#[derive(Default)]
struct ShopState {
    products: Mutex<HashMap<i32, Value>>,
    stock: Mutex<HashMap<i32, Value>>,
    failure: Mutex<Option<StatusCode>>,
    product_requests: AtomicUsize,
    stock_requests: AtomicUsize,
}

impl ShopState {
    fn failure(&self) -> Option<StatusCode> {
        *lock(&self.failure)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process catalog and stock API.
///
/// The server stops when the value is dropped.
pub struct FakeShopApi {
    addr: SocketAddr,
    state: Arc<ShopState>,
    server: JoinHandle<()>,
}

impl FakeShopApi {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Arc::new(ShopState::default());

        let app = Router::new()
            .route("/products/{id}", get(product))
            .route("/stock/{id}", get(stock))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Base URL the cart's API client should use.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Cart configuration pointing at this server and storing under `storage_dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if the generated configuration is rejected.
    pub fn config(&self, storage_dir: &Path) -> Result<CartConfig, ConfigError> {
        let base_url = self.base_url();
        let storage_dir = storage_dir.display().to_string();
        CartConfig::from_source(|key| match key {
            "CART_API_URL" => Some(base_url.clone()),
            "CART_STORAGE_DIR" => Some(storage_dir.clone()),
            _ => None,
        })
    }

    /// Serve `product` from the catalog with `amount` units in stock.
    pub fn add_product(&self, id: i32, title: &str, price: f64, amount: i64) {
        lock(&self.state.products).insert(
            id,
            json!({
                "id": id,
                "title": title,
                "price": price,
                "image": format!("https://rocketshoes.test/images/{id}.jpg"),
            }),
        );
        self.set_stock(id, Some(amount));
    }

    /// Set the stock for `id`; `None` makes the stock endpoint answer `null`.
    pub fn set_stock(&self, id: i32, amount: Option<i64>) {
        let record = amount.map_or(Value::Null, |amount| json!({ "id": id, "amount": amount }));
        lock(&self.state.stock).insert(id, record);
    }

    /// Serve a raw stock body for `id`.
    pub fn set_stock_body(&self, id: i32, body: Value) {
        lock(&self.state.stock).insert(id, body);
    }

    /// Make every request fail with `status` until cleared with `None`.
    pub fn fail_with(&self, status: Option<StatusCode>) {
        *lock(&self.state.failure) = status;
    }

    /// Number of catalog requests served so far.
    #[must_use]
    pub fn product_requests(&self) -> usize {
        self.state.product_requests.load(Ordering::SeqCst)
    }

    /// Number of stock requests served so far.
    #[must_use]
    pub fn stock_requests(&self) -> usize {
        self.state.stock_requests.load(Ordering::SeqCst)
    }
}

impl Drop for FakeShopApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Handlers
// =============================================================================

async fn product(State(state): State<Arc<ShopState>>, UrlPath(id): UrlPath<i32>) -> Response {
    state.product_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = state.failure() {
        return failure_response(status);
    }

    lock(&state.products)
        .get(&id)
        .cloned()
        .map_or_else(|| StatusCode::NOT_FOUND.into_response(), |p| Json(p).into_response())
}

async fn stock(State(state): State<Arc<ShopState>>, UrlPath(id): UrlPath<i32>) -> Response {
    state.stock_requests.fetch_add(1, Ordering::SeqCst);
    if let Some(status) = state.failure() {
        return failure_response(status);
    }

    lock(&state.stock)
        .get(&id)
        .cloned()
        .map_or_else(|| StatusCode::NOT_FOUND.into_response(), |s| Json(s).into_response())
}

fn failure_response(status: StatusCode) -> Response {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return (
            status,
            [(header::RETRY_AFTER, RETRY_AFTER_SECS.to_string())],
            "slow down",
        )
            .into_response();
    }
    (status, "upstream unavailable").into_response()
}
