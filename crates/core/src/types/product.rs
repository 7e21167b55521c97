//! Catalog and stock records.
//!
//! Both are owned by remote services; the cart only reads them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Price, ProductId};

/// A product as served by the catalog.
///
/// Display fields the cart does not interpret (descriptions, badges, ...) are
/// kept in `extra` so they survive the round trip through the snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(alias = "name")]
    pub title: String,
    pub price: Price,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// Create a product with no extra display fields.
    #[must_use]
    pub fn new(id: ProductId, title: impl Into<String>, price: Price) -> Self {
        Self {
            id,
            title: title.into(),
            price,
            image: None,
            extra: Map::new(),
        }
    }

    /// Set the image URL.
    #[must_use]
    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }
}

/// Units of a product available for sale, as reported by the stock service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    #[serde(alias = "productId")]
    pub id: ProductId,
    pub amount: i64,
}

impl StockRecord {
    #[must_use]
    pub const fn new(id: ProductId, amount: i64) -> Self {
        Self { id, amount }
    }

    /// Whether at least one unit is available.
    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.amount > 0
    }

    /// Whether `amount` units can be requested.
    #[must_use]
    pub const fn allows(&self, amount: i64) -> bool {
        amount > 0 && amount <= self.amount
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_product_from_catalog_json() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "title": "Tênis de Caminhada Leve Confortável",
            "price": 179.9,
            "image": "https://example.com/shoe.jpg"
        }))
        .unwrap();

        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.price, Price::new(Decimal::new(1799, 1)));
        assert_eq!(product.image.as_deref(), Some("https://example.com/shoe.jpg"));
        assert!(product.extra.is_empty());
    }

    #[test]
    fn test_product_accepts_name_and_keeps_unknown_fields() {
        let product: Product = serde_json::from_value(json!({
            "id": 2,
            "name": "Shoe",
            "price": "99.9",
            "brand": "Rocket"
        }))
        .unwrap();

        assert_eq!(product.title, "Shoe");
        assert_eq!(product.extra.get("brand"), Some(&json!("Rocket")));
    }

    #[test]
    fn test_stock_record_accepts_product_id_alias() {
        let stock: StockRecord =
            serde_json::from_value(json!({ "productId": 3, "amount": 5 })).unwrap();
        assert_eq!(stock, StockRecord::new(ProductId::new(3), 5));
    }

    #[test]
    fn test_stock_record_bounds() {
        let stock = StockRecord::new(ProductId::new(1), 5);
        assert!(stock.in_stock());
        assert!(stock.allows(1));
        assert!(stock.allows(5));
        assert!(!stock.allows(6));
        assert!(!stock.allows(0));
        assert!(!stock.allows(-1));

        assert!(!StockRecord::new(ProductId::new(1), 0).in_stock());
    }
}
