//! Remote services the cart consults.
//!
//! # Services
//!
//! - [`CatalogService`] - Product details by id
//! - [`StockService`] - Units available per product
//!
//! [`ApiClient`] implements both over the storefront's REST API. The store only
//! sees the traits, so tests and alternative transports can be injected.

mod api;

pub use api::ApiClient;

use async_trait::async_trait;
use rocketshoes_core::{Product, ProductId, StockRecord};
use thiserror::Error;

/// Errors that can occur when calling the catalog or stock service.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Service answered with a non-success status.
    #[error("API error: {status} - {body}")]
    Status { status: u16, body: String },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Stock service had no record for a product the cart needs to check.
    #[error("No stock record for product {0}")]
    MissingRecord(ProductId),

    /// Any other failure reported by an injected implementation.
    #[error("{0}")]
    Other(String),
}

/// Source of product details.
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// Fetch the product with `id`.
    ///
    /// Unknown ids must yield an error, never a placeholder product.
    async fn product(&self, id: ProductId) -> Result<Product, ServiceError>;
}

/// Source of stock levels.
#[async_trait]
pub trait StockService: Send + Sync {
    /// Fetch the current stock record for `id`.
    ///
    /// `Ok(None)` means the service answered but holds no record for the id.
    async fn stock(&self, id: ProductId) -> Result<Option<StockRecord>, ServiceError>;
}
