//! Decimal price as returned by the catalog.
//!
//! The catalog sends prices as bare JSON numbers (`99.9`). They are held as
//! [`Decimal`] so no float rounding leaks into the persisted snapshot; on the
//! way out they are written as strings, which [`Price`] also accepts on input.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A product's unit price in the store's currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Get the underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl From<Decimal> for Price {
    fn from(amount: Decimal) -> Self {
        Self(amount)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}
