//! Cart errors, user-facing notifications, and Sentry integration.
//!
//! Every cart operation returns `Result<(), CartError>`. The error keeps the
//! three-way split the shopper sees (out of stock, not in cart, something went
//! wrong) and maps onto the [`Notification`] shown to them. Unexpected failures
//! are captured to Sentry before they are returned.

use std::fmt;

use rocketshoes_core::ProductId;
use thiserror::Error;

use crate::services::ServiceError;
use crate::storage::StorageError;

/// The cart operation a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CartOperation {
    Add,
    Remove,
    Update,
}

impl CartOperation {
    /// Notification shown when this operation fails unexpectedly.
    #[must_use]
    pub const fn failure_notification(self) -> Notification {
        match self {
            Self::Add => Notification::AddFailed,
            Self::Remove => Notification::RemoveFailed,
            Self::Update => Notification::UpdateFailed,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Remove => "remove",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for CartOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transient, user-visible message about a failed cart action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notification {
    /// Requested amount exceeds what is in stock.
    OutOfStock,
    /// Adding a product failed for a reason other than stock.
    AddFailed,
    /// The product to remove was not found, or removing it failed.
    RemoveFailed,
    /// Changing a product's amount failed for a reason other than stock.
    UpdateFailed,
}

impl Notification {
    /// Message shown to the shopper.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::OutOfStock => "Requested quantity is out of stock",
            Self::AddFailed => "Could not add the product",
            Self::RemoveFailed => "Could not remove the product",
            Self::UpdateFailed => "Could not change the product quantity",
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Underlying cause of an unexpected failure.
#[derive(Debug, Error)]
pub enum UnexpectedError {
    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("failed to encode cart snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("stock for product {0} exceeds the supported amount")]
    AmountOverflow(ProductId),
}

/// Errors returned by cart operations.
#[derive(Debug, Error)]
pub enum CartError {
    /// Requested amount is not available, or the product is sold out.
    #[error("Out of stock: product {product_id}")]
    OutOfStock { product_id: ProductId },

    /// The product is not in the cart.
    #[error("Not in cart: product {0}")]
    NotFound(ProductId),

    /// A service call, the snapshot write, or other processing failed.
    #[error("Cart {operation} failed: {source}")]
    Unexpected {
        operation: CartOperation,
        #[source]
        source: UnexpectedError,
    },
}

impl CartError {
    pub(crate) fn unexpected(operation: CartOperation, source: impl Into<UnexpectedError>) -> Self {
        Self::Unexpected {
            operation,
            source: source.into(),
        }
    }

    /// The notification to show the shopper for this error.
    #[must_use]
    pub const fn notification(&self) -> Notification {
        match self {
            Self::OutOfStock { .. } => Notification::OutOfStock,
            Self::NotFound(_) => Notification::RemoveFailed,
            Self::Unexpected { operation, .. } => operation.failure_notification(),
        }
    }

    /// Log the error and capture unexpected failures to Sentry.
    pub(crate) fn report(&self) {
        match self {
            Self::Unexpected { .. } => {
                let event_id = sentry::capture_error(self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Cart operation failed"
                );
            }
            Self::OutOfStock { .. } | Self::NotFound(_) => {
                tracing::warn!(error = %self, "Cart operation rejected");
            }
        }
    }
}

/// Errors building a store from configuration.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("API client error: {0}")]
    Api(#[from] ServiceError),

    #[error("Snapshot storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type alias for `CartError`.
pub type Result<T> = std::result::Result<T, CartError>;

/// Add a breadcrumb for a cart action.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// changes leading up to an error.
pub fn add_breadcrumb(message: &str, data: &[(&str, String)]) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some("cart".to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    for (key, value) in data {
        breadcrumb
            .data
            .insert((*key).to_string(), serde_json::Value::String(value.clone()));
    }

    sentry::add_breadcrumb(breadcrumb);
}
