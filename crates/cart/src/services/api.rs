//! REST client for the storefront's catalog and stock endpoints.
//!
//! Uses `reqwest` for HTTP. Products are cached using `moka` (5-minute TTL by
//! default); stock is always fetched fresh since it bounds what the shopper can
//! request.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use rocketshoes_core::{Product, ProductId, StockRecord};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;

use super::{CatalogService, ServiceError, StockService};
use crate::config::{ApiConfig, bearer};

const CACHE_CAPACITY: u64 = 1000;

/// Characters of a response body kept in errors and logs.
const BODY_PREVIEW_CHARS: usize = 200;

// =============================================================================
// ApiClient
// =============================================================================

/// Client for the storefront REST API.
///
/// Serves `GET products/{id}` and `GET stock/{id}` relative to the configured
/// base URL. Cheap to clone; clones share the connection pool and cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    products: Cache<ProductId, Product>,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ServiceError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&bearer(token))
                .map_err(|e| ServiceError::Other(format!("Invalid API token format: {e}")))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        let products = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.catalog_cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.base_url.clone(),
                products,
            }),
        })
    }

    /// Resolve an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url, ServiceError> {
        self.inner
            .base_url
            .join(path)
            .map_err(|e| ServiceError::Other(format!("Invalid endpoint '{path}': {e}")))
    }

    /// Execute a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ServiceError> {
        let url = self.endpoint(path)?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ServiceError::RateLimited(retry_after));
        }

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(path.to_string()));
        }

        // Get response body as text first for better error diagnostics
        let response_text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                path,
                body = %preview(&response_text),
                "API returned non-success status"
            );
            return Err(ServiceError::Status {
                status: status.as_u16(),
                body: preview(&response_text),
            });
        }

        serde_json::from_str(&response_text).map_err(|e| {
            tracing::error!(
                error = %e,
                path,
                body = %preview(&response_text),
                "Failed to parse API response"
            );
            ServiceError::Parse(e)
        })
    }
}

#[async_trait]
impl CatalogService for ApiClient {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: ProductId) -> Result<Product, ServiceError> {
        if let Some(product) = self.inner.products.get(&id).await {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product: Product = self.get_json(&format!("products/{id}")).await?;
        if product.id != id {
            return Err(ServiceError::Other(format!(
                "Catalog returned product {} for id {id}",
                product.id
            )));
        }

        self.inner.products.insert(id, product.clone()).await;
        Ok(product)
    }
}

#[async_trait]
impl StockService for ApiClient {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn stock(&self, id: ProductId) -> Result<Option<StockRecord>, ServiceError> {
        self.get_json(&format!("stock/{id}")).await
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_CHARS).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;

    fn config(base: &str) -> ApiConfig {
        ApiConfig::new(Url::parse(base).unwrap())
    }

    #[test]
    fn test_endpoint_resolution() {
        let client = ApiClient::new(&config("http://localhost:3333/")).unwrap();
        assert_eq!(
            client.endpoint("products/1").unwrap().as_str(),
            "http://localhost:3333/products/1"
        );
        assert_eq!(
            client.endpoint("stock/12").unwrap().as_str(),
            "http://localhost:3333/stock/12"
        );
    }

    #[test]
    fn test_new_with_token() {
        let mut api = config("http://localhost:3333/");
        api.token = Some(SecretString::from("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6"));
        assert!(ApiClient::new(&api).is_ok());
    }

    #[test]
    fn test_new_rejects_token_with_newline() {
        let mut api = config("http://localhost:3333/");
        api.token = Some(SecretString::from("abc\ndef"));
        assert!(matches!(ApiClient::new(&api), Err(ServiceError::Other(_))));
    }

    #[test]
    fn test_preview_truncates() {
        let body = "x".repeat(500);
        assert_eq!(preview(&body).len(), BODY_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
