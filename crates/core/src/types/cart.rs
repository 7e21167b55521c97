//! The shopper's cart and its pure state transitions.
//!
//! A [`Cart`] is an ordered list of [`CartItem`]s, unique by product id, kept
//! in the order products were first added. Every transition returns a new cart;
//! nothing here mutates in place, which lets the store validate, persist and
//! publish a complete next state or nothing at all.

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use super::{Product, ProductId};

/// A rehydrated item list that breaks the cart's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidCart {
    #[error("product {0} appears more than once")]
    DuplicateProduct(ProductId),
    #[error("product {0} has a zero amount")]
    ZeroAmount(ProductId),
}

/// A product the shopper has selected, with the requested quantity.
///
/// Serialized flat, so a snapshot entry reads as the catalog product with an
/// extra `amount` field. The cart's amount replaces any `amount` the catalog
/// sent along with the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(flatten)]
    pub product: Product,
    pub amount: u32,
}

impl CartItem {
    #[must_use]
    pub fn new(mut product: Product, amount: u32) -> Self {
        product.extra.remove("amount");
        Self { product, amount }
    }

    #[must_use]
    pub const fn id(&self) -> ProductId {
        self.product.id
    }
}

/// Ordered, id-unique collection of cart items.
///
/// Serializes as a bare item array. Deserializing goes through
/// [`Cart::from_items`], so a stored list with repeated ids or zero amounts is
/// rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(try_from = "Vec<CartItem>")]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from a previously stored item list.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCart` if a product id repeats or an amount is zero.
    pub fn from_items(items: Vec<CartItem>) -> Result<Self, InvalidCart> {
        for (index, item) in items.iter().enumerate() {
            if item.amount == 0 {
                return Err(InvalidCart::ZeroAmount(item.id()));
            }
            if items.iter().skip(index + 1).any(|other| other.id() == item.id()) {
                return Err(InvalidCart::DuplicateProduct(item.id()));
            }
        }
        Ok(Self { items })
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CartItem> {
        self.items.iter()
    }

    /// Number of distinct products in the cart.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total number of units across all items.
    #[must_use]
    pub fn total_amount(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.amount)).sum()
    }

    #[must_use]
    pub fn find(&self, id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: ProductId) -> bool {
        self.find(id).is_some()
    }

    /// Append `product` with an amount of one.
    ///
    /// Callers check [`contains`](Self::contains) first; appending a product
    /// that is already present is a logic error and yields the cart unchanged.
    #[must_use]
    pub fn with_product(&self, product: Product) -> Self {
        if self.contains(product.id) {
            return self.clone();
        }
        let mut items = self.items.clone();
        items.push(CartItem::new(product, 1));
        Self { items }
    }

    /// Drop the item for `id`, or `None` if it is not in the cart.
    #[must_use]
    pub fn without(&self, id: ProductId) -> Option<Self> {
        if !self.contains(id) {
            return None;
        }
        let items = self
            .items
            .iter()
            .filter(|item| item.id() != id)
            .cloned()
            .collect();
        Some(Self { items })
    }

    /// Replace the amount of the item for `id`, leaving every other item as is.
    ///
    /// An id that is not in the cart yields an identical cart.
    #[must_use]
    pub fn with_amount(&self, id: ProductId, amount: u32) -> Self {
        let items = self
            .items
            .iter()
            .map(|item| {
                if item.id() == id {
                    CartItem::new(item.product.clone(), amount)
                } else {
                    item.clone()
                }
            })
            .collect();
        Self { items }
    }
}

impl TryFrom<Vec<CartItem>> for Cart {
    type Error = InvalidCart;

    fn try_from(items: Vec<CartItem>) -> Result<Self, Self::Error> {
        Self::from_items(items)
    }
}

impl Serialize for Cart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(&self.items)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use serde_json::json;

    use super::*;
    use crate::Price;

    fn product(id: i32, title: &str) -> Product {
        Product::new(ProductId::new(id), title, Price::new(Decimal::new(999, 1)))
    }

    fn cart_of(ids: &[(i32, u32)]) -> Cart {
        Cart::from_items(
            ids.iter()
                .map(|&(id, amount)| CartItem::new(product(id, "Shoe"), amount))
                .collect(),
        )
        .unwrap()
    }

    fn ids(cart: &Cart) -> Vec<i32> {
        cart.iter().map(|item| item.id().as_i32()).collect()
    }

    #[test]
    fn test_with_product_appends_amount_one() {
        let cart = cart_of(&[(1, 2)]);
        let next = cart.with_product(product(2, "Boot"));

        assert_eq!(ids(&next), vec![1, 2]);
        let added = next.find(ProductId::new(2)).unwrap();
        assert_eq!(added.amount, 1);
        assert_eq!(added.product, product(2, "Boot"));
        // Original untouched
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_with_product_ignores_present_id() {
        let cart = cart_of(&[(1, 2)]);
        assert_eq!(cart.with_product(product(1, "Shoe")), cart);
    }

    #[test]
    fn test_without_preserves_order() {
        let cart = cart_of(&[(1, 1), (2, 3), (3, 1)]);
        let next = cart.without(ProductId::new(2)).unwrap();

        assert_eq!(ids(&next), vec![1, 3]);
        assert_eq!(next.find(ProductId::new(1)), cart.find(ProductId::new(1)));
        assert_eq!(next.find(ProductId::new(3)), cart.find(ProductId::new(3)));
    }

    #[test]
    fn test_without_absent_id() {
        let cart = cart_of(&[(1, 1)]);
        assert!(cart.without(ProductId::new(9)).is_none());
    }

    #[test]
    fn test_with_amount_touches_only_target() {
        let cart = cart_of(&[(1, 1), (2, 1)]);
        let next = cart.with_amount(ProductId::new(2), 4);

        assert_eq!(next.find(ProductId::new(1)).unwrap().amount, 1);
        assert_eq!(next.find(ProductId::new(2)).unwrap().amount, 4);
        assert_eq!(ids(&next), vec![1, 2]);
    }

    #[test]
    fn test_with_amount_absent_id_is_identity() {
        let cart = cart_of(&[(1, 1)]);
        assert_eq!(cart.with_amount(ProductId::new(5), 3), cart);
    }

    #[test]
    fn test_total_amount() {
        assert_eq!(cart_of(&[(1, 2), (2, 3)]).total_amount(), 5);
        assert_eq!(Cart::new().total_amount(), 0);
    }

    #[test]
    fn test_from_items_rejects_duplicates() {
        let items = vec![
            CartItem::new(product(1, "Shoe"), 1),
            CartItem::new(product(1, "Shoe"), 2),
        ];
        assert_eq!(
            Cart::from_items(items),
            Err(InvalidCart::DuplicateProduct(ProductId::new(1)))
        );
    }

    #[test]
    fn test_from_items_rejects_zero_amount() {
        let items = vec![CartItem::new(product(1, "Shoe"), 0)];
        assert_eq!(
            Cart::from_items(items),
            Err(InvalidCart::ZeroAmount(ProductId::new(1)))
        );
    }

    #[test]
    fn test_snapshot_format_is_flat_array() {
        let cart = cart_of(&[(1, 2)]);
        let value = serde_json::to_value(&cart).unwrap();

        assert_eq!(
            value,
            json!([{ "id": 1, "title": "Shoe", "price": "99.9", "amount": 2 }])
        );
    }

    #[test]
    fn test_snapshot_round_trip_keeps_order_and_fields() {
        let mut first = product(3, "Runner").with_image("https://example.com/3.jpg");
        first.extra.insert("color".to_string(), json!("red"));
        let cart = Cart::new()
            .with_product(first)
            .with_product(product(1, "Shoe"))
            .with_amount(ProductId::new(1), 4);

        let json = serde_json::to_string(&cart).unwrap();
        let restored: Cart = serde_json::from_str(&json).unwrap();

        assert_eq!(restored, cart);
        assert_eq!(ids(&restored), vec![3, 1]);
    }

    #[test]
    fn test_catalog_amount_field_is_replaced_by_cart_amount() {
        let catalog: Product = serde_json::from_value(json!({
            "id": 1,
            "title": "Shoe",
            "price": 99.9,
            "amount": 7
        }))
        .unwrap();
        let cart = Cart::new().with_product(catalog);

        let value = serde_json::to_value(&cart).unwrap();
        assert_eq!(value[0]["amount"], json!(1));

        let json = serde_json::to_string(&cart).unwrap();
        assert_eq!(json.matches("\"amount\"").count(), 1);
        let restored: Cart = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, cart);
        assert_eq!(restored.find(ProductId::new(1)).unwrap().amount, 1);
    }

    #[test]
    fn test_deserialize_rejects_invalid_item_lists() {
        let duplicate = json!([
            { "id": 1, "title": "Shoe", "price": "99.9", "amount": 1 },
            { "id": 1, "title": "Shoe", "price": "99.9", "amount": 2 }
        ]);
        let err = serde_json::from_value::<Cart>(duplicate).unwrap_err();
        assert!(err.to_string().contains("appears more than once"));

        let zero = json!([{ "id": 2, "title": "Boot", "price": "10", "amount": 0 }]);
        let err = serde_json::from_value::<Cart>(zero).unwrap_err();
        assert!(err.to_string().contains("zero amount"));
    }
}
