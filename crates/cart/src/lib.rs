//! RocketShoes cart store.
//!
//! Tracks the products a shopper has selected, persists the selection across
//! restarts, and validates every requested amount against the stock service.
//!
//! # Architecture
//!
//! - [`store::CartStore`] - the cart and its add/remove/update operations
//! - [`services`] - catalog and stock lookups (REST client over `reqwest`)
//! - [`storage`] - key-value storage for the cart snapshot
//! - [`error`] - typed errors and the notifications shown to the shopper
//! - [`config`] - environment-based configuration
//! - [`telemetry`] - tracing and Sentry setup for host applications
//!
//! # Example
//!
//! ```rust,ignore
//! use rocketshoes_cart::{CartConfig, CartStore, UpdateProductAmount};
//! use rocketshoes_core::ProductId;
//!
//! let store = CartStore::from_config(&CartConfig::from_env()?)?;
//!
//! store.add_product(ProductId::new(1)).await?;
//! store
//!     .update_product_amount(UpdateProductAmount {
//!         product_id: ProductId::new(1),
//!         amount: 3,
//!     })
//!     .await?;
//!
//! for item in &store.cart() {
//!     println!("{} x{}", item.product.title, item.amount);
//! }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod error;
pub mod services;
pub mod storage;
pub mod store;
pub mod telemetry;

pub use config::{ApiConfig, CartConfig, ConfigError};
pub use error::{CartError, CartOperation, InitError, Notification, UnexpectedError};
pub use services::{ApiClient, CatalogService, ServiceError, StockService};
pub use storage::{FileStorage, MemoryStorage, SnapshotStorage, StorageError};
pub use store::{CartStore, UpdateProductAmount};
