//! The cart store: the shopper's cart, its three mutations, and persistence.
//!
//! Each mutation runs validate → compute next cart → persist → publish while
//! holding the store's mutation lock. Nothing is published unless the snapshot
//! write succeeded, and nothing is written unless validation passed, so a
//! failed operation leaves both the published state and storage untouched.

use std::sync::Arc;

use rocketshoes_core::{Cart, ProductId};
use tokio::sync::{Mutex, broadcast, watch};
use tracing::{debug, info, instrument, warn};

use crate::config::CartConfig;
use crate::error::{
    CartError, CartOperation, InitError, Notification, Result, UnexpectedError, add_breadcrumb,
};
use crate::services::{ApiClient, CatalogService, ServiceError, StockService};
use crate::storage::{FileStorage, SnapshotStorage, StorageError};

/// Notifications buffered for slow subscribers before old ones are dropped.
const NOTIFICATION_CAPACITY: usize = 16;

/// Arguments for [`CartStore::update_product_amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateProductAmount {
    pub product_id: ProductId,
    /// Desired amount. Values below one are rejected as out of stock.
    pub amount: i64,
}

/// Shopper's cart with stock-validated mutations.
///
/// This struct is cheaply cloneable via `Arc`; clones share state, so the
/// store can be handed to every UI component that reads or changes the cart.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartStoreInner>,
}

struct CartStoreInner {
    catalog: Arc<dyn CatalogService>,
    stock: Arc<dyn StockService>,
    storage: Arc<dyn SnapshotStorage>,
    key: String,
    mutation: Mutex<()>,
    state: watch::Sender<Cart>,
    notifications: broadcast::Sender<Notification>,
}

impl CartStore {
    /// Create a store and rehydrate the cart stored under `key`.
    ///
    /// A snapshot that cannot be decoded, or that breaks the cart's
    /// invariants, is discarded with a warning and the cart starts empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend cannot be read.
    pub fn new(
        catalog: Arc<dyn CatalogService>,
        stock: Arc<dyn StockService>,
        storage: Arc<dyn SnapshotStorage>,
        key: impl Into<String>,
    ) -> std::result::Result<Self, StorageError> {
        let key = key.into();
        let cart = load_snapshot(storage.as_ref(), &key)?;
        info!(key = %key, items = cart.len(), "Cart rehydrated");

        let (state, _) = watch::channel(cart);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        Ok(Self {
            inner: Arc::new(CartStoreInner {
                catalog,
                stock,
                storage,
                key,
                mutation: Mutex::new(()),
                state,
                notifications,
            }),
        })
    }

    /// Create a store backed by the REST API and file storage from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API client cannot be built or the stored
    /// snapshot cannot be read.
    pub fn from_config(config: &CartConfig) -> std::result::Result<Self, InitError> {
        let api = Arc::new(ApiClient::new(&config.api)?);
        let storage = Arc::new(FileStorage::new(&config.storage_dir));
        Ok(Self::new(
            api.clone(),
            api,
            storage,
            config.storage_key.clone(),
        )?)
    }

    /// The current cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.inner.state.borrow().clone()
    }

    /// Watch the cart; the receiver sees every published state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Cart> {
        self.inner.state.subscribe()
    }

    /// Receive the notifications raised by failed operations.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.inner.notifications.subscribe()
    }

    /// Key the snapshot is stored under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.inner.key
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Add one unit of a product to the cart.
    ///
    /// A product already in the cart has its amount raised by one, subject to
    /// the same stock check as [`update_product_amount`](Self::update_product_amount).
    /// The zero id is ignored.
    ///
    /// # Errors
    ///
    /// Returns `OutOfStock` if no unit is available (or one more would exceed
    /// stock), and `Unexpected` if a lookup or the snapshot write fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_product(&self, product_id: ProductId) -> Result<()> {
        if product_id.is_unset() {
            debug!("Ignoring add for unset product id");
            return Ok(());
        }

        let _guard = self.inner.mutation.lock().await;
        let result = self.add_locked(product_id).await;
        self.finish(result)
    }

    /// Remove a product from the cart.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the product is not in the cart, and `Unexpected`
    /// if the snapshot write fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_product(&self, product_id: ProductId) -> Result<()> {
        let _guard = self.inner.mutation.lock().await;
        let result = self.remove_locked(product_id);
        self.finish(result)
    }

    /// Set the amount of a product in the cart.
    ///
    /// The amount must be at least one and no more than the units in stock.
    /// A product that is not in the cart leaves the cart as it is and still
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns `OutOfStock` if the amount is out of range, and `Unexpected` if
    /// the stock lookup or the snapshot write fails.
    #[instrument(skip(self, request), fields(product_id = %request.product_id, amount = request.amount))]
    pub async fn update_product_amount(&self, request: UpdateProductAmount) -> Result<()> {
        let _guard = self.inner.mutation.lock().await;
        let result = self
            .update_locked(request.product_id, request.amount)
            .await;
        self.finish(result)
    }

    // =========================================================================
    // Internals (mutation lock held)
    // =========================================================================

    async fn add_locked(&self, id: ProductId) -> Result<()> {
        let unexpected = |e: ServiceError| CartError::unexpected(CartOperation::Add, e);

        let (product, stock) =
            tokio::try_join!(self.inner.catalog.product(id), self.inner.stock.stock(id))
                .map_err(unexpected)?;
        let stock = stock.ok_or_else(|| unexpected(ServiceError::MissingRecord(id)))?;

        if !stock.in_stock() {
            return Err(CartError::OutOfStock { product_id: id });
        }

        let cart = self.cart();
        if let Some(item) = cart.find(id) {
            let amount = i64::from(item.amount) + 1;
            return self.update_locked(id, amount).await;
        }

        self.commit(CartOperation::Add, id, cart.with_product(product))
    }

    fn remove_locked(&self, id: ProductId) -> Result<()> {
        let next = self.cart().without(id).ok_or(CartError::NotFound(id))?;
        self.commit(CartOperation::Remove, id, next)
    }

    async fn update_locked(&self, id: ProductId, amount: i64) -> Result<()> {
        let stock = self
            .inner
            .stock
            .stock(id)
            .await
            .map_err(|e| CartError::unexpected(CartOperation::Update, e))?;

        let Some(stock) = stock else {
            debug!("No stock record, leaving cart unchanged");
            return Ok(());
        };

        if !stock.allows(amount) {
            return Err(CartError::OutOfStock { product_id: id });
        }

        let amount = u32::try_from(amount).map_err(|_| {
            CartError::unexpected(CartOperation::Update, UnexpectedError::AmountOverflow(id))
        })?;

        let cart = self.cart();
        if !cart.contains(id) {
            warn!("Amount update for a product that is not in the cart, cart left unchanged");
        }

        self.commit(CartOperation::Update, id, cart.with_amount(id, amount))
    }

    /// Persist `next` and publish it.
    fn commit(&self, operation: CartOperation, id: ProductId, next: Cart) -> Result<()> {
        let snapshot =
            serde_json::to_string(&next).map_err(|e| CartError::unexpected(operation, e))?;
        self.inner
            .storage
            .set(&self.inner.key, &snapshot)
            .map_err(|e| CartError::unexpected(operation, e))?;

        let amount = next.find(id).map_or(0, |item| item.amount);
        add_breadcrumb(
            &format!("Cart {operation}"),
            &[("product_id", id.to_string()), ("amount", amount.to_string())],
        );
        debug!(amount, items = next.len(), "Cart committed");

        self.inner.state.send_replace(next);
        Ok(())
    }

    /// Report a failed operation and raise its notification.
    fn finish(&self, result: Result<()>) -> Result<()> {
        if let Err(e) = &result {
            e.report();
            // No subscribers is fine; the error is still returned.
            let _ = self.inner.notifications.send(e.notification());
        }
        result
    }
}

/// Read the stored snapshot, falling back to an empty cart if it is unusable.
fn load_snapshot(
    storage: &dyn SnapshotStorage,
    key: &str,
) -> std::result::Result<Cart, StorageError> {
    let Some(snapshot) = storage.get(key)? else {
        return Ok(Cart::new());
    };

    Ok(serde_json::from_str::<Cart>(&snapshot).unwrap_or_else(|e| {
        warn!(key, reason = %e, "Discarding unusable cart snapshot");
        Cart::new()
    }))
}
