//! Shopping cart types.
//!
//! The cart lives in the customer's session and is mutated through
//! [`crate::services::cart::CartService`]. Pure cart math and the idempotent
//! add rule live here so they can be tested without a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use paperfold_core::{CartLineId, CheckoutProductId, ItemRef, Price};

/// A single line in the cart.
///
/// Digital goods have no meaningful quantity above one, so a line is either
/// present or absent. The `quantity` field is always 1 and exists for wire
/// compatibility with clients that render it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Cart-local line ID, assigned when the line is added.
    pub id: CartLineId,
    /// Catalog identity (product or bundle).
    #[serde(flatten)]
    pub item: ItemRef,
    /// Checkout provider's product ID for this item.
    #[serde(rename = "polarProductId")]
    pub checkout_product_id: CheckoutProductId,
    /// Display title.
    pub title: String,
    /// Display image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Selling price.
    pub price: Price,
    /// Pre-discount price, if the item is on sale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compare_at_price: Option<Price>,
    /// Always 1 for digital goods.
    pub quantity: u32,
    /// When the line was added.
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// Build a fresh line with a new ID and the current timestamp.
    #[must_use]
    pub fn new(
        item: ItemRef,
        checkout_product_id: CheckoutProductId,
        title: String,
        image: Option<String>,
        price: Price,
        compare_at_price: Option<Price>,
    ) -> Self {
        Self {
            id: CartLineId::new(),
            item,
            checkout_product_id,
            title,
            image,
            price,
            compare_at_price,
            quantity: 1,
            added_at: Utc::now(),
        }
    }

    /// Savings on this line: `compare_at_price - price` when the compare-at
    /// price is higher, otherwise zero.
    #[must_use]
    pub fn savings(&self) -> Price {
        self.compare_at_price
            .filter(|compare| *compare > self.price)
            .map_or(Price::ZERO, |compare| compare.saturating_sub(self.price))
    }
}

/// The session-persisted cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Lines in insertion order.
    pub items: Vec<CartLine>,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Cart {
    /// Number of lines in the cart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether a line with the same catalog identity is already present.
    #[must_use]
    pub fn contains(&self, item: &ItemRef) -> bool {
        self.items.iter().any(|line| line.item == *item)
    }

    /// Add a line. Returns `false` without mutating if a line with the same
    /// catalog identity already exists.
    pub fn add(&mut self, line: CartLine) -> bool {
        if self.contains(&line.item) {
            return false;
        }
        self.items.push(line);
        self.updated_at = Utc::now();
        true
    }

    /// Remove a line by its cart-local ID. Returns the removed line, or
    /// `None` if no such line exists (removal of an unknown ID is a no-op).
    pub fn remove(&mut self, id: &CartLineId) -> Option<CartLine> {
        let index = self.items.iter().position(|line| line.id == *id)?;
        let removed = self.items.remove(index);
        self.updated_at = Utc::now();
        Some(removed)
    }

    /// Reset to an empty cart with fresh timestamps.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Sum of line prices.
    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.items.iter().map(|line| line.price).sum()
    }

    /// Sum of per-line savings over lines whose compare-at price exceeds
    /// their selling price.
    #[must_use]
    pub fn savings(&self) -> Price {
        self.items.iter().map(CartLine::savings).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use paperfold_core::ProductId;

    use super::*;

    fn line(product: &str, price: i64, compare_at: Option<i64>) -> CartLine {
        CartLine {
            id: CartLineId::new(),
            item: ItemRef::Product {
                product_id: ProductId::new(product),
            },
            checkout_product_id: CheckoutProductId::new(format!("polar_{product}")),
            title: format!("Item {product}"),
            image: None,
            price: Price::from_cents(price),
            compare_at_price: compare_at.map(Price::from_cents),
            quantity: 1,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_is_idempotent_per_catalog_identity() {
        let mut cart = Cart::default();
        assert!(cart.add(line("p1", 1000, None)));
        assert!(!cart.add(line("p1", 1000, None)));
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_add_distinguishes_product_from_bundle() {
        use paperfold_core::BundleId;

        let mut cart = Cart::default();
        assert!(cart.add(line("x", 1000, None)));

        let mut bundle = line("x", 2000, None);
        bundle.item = ItemRef::Bundle {
            bundle_id: BundleId::new("x"),
        };
        assert!(cart.add(bundle));
        assert_eq!(cart.len(), 2);
    }

    #[test]
    fn test_subtotal_and_savings() {
        let mut cart = Cart::default();
        cart.add(line("p1", 1000, Some(1500)));
        cart.add(line("p2", 500, None));

        assert_eq!(cart.subtotal(), Price::from_cents(1500));
        assert_eq!(cart.savings(), Price::from_cents(500));
    }

    #[test]
    fn test_savings_ignores_compare_at_below_price() {
        let mut cart = Cart::default();
        cart.add(line("p1", 1000, Some(800)));
        cart.add(line("p2", 1000, Some(1000)));

        assert_eq!(cart.savings(), Price::ZERO);
    }

    #[test]
    fn test_remove_unknown_id_is_noop() {
        let mut cart = Cart::default();
        cart.add(line("p1", 1000, None));

        assert!(cart.remove(&CartLineId::new()).is_none());
        assert_eq!(cart.len(), 1);
    }

    #[test]
    fn test_remove_returns_removed_line() {
        let mut cart = Cart::default();
        cart.add(line("p1", 1000, None));
        let id = cart.items.first().unwrap().id;

        let removed = cart.remove(&id).unwrap();
        assert_eq!(removed.title, "Item p1");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_clear_resets_to_empty() {
        let mut cart = Cart::default();
        cart.add(line("p1", 1000, None));
        cart.clear();

        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Price::ZERO);
    }

    #[test]
    fn test_line_serializes_with_flattened_identity() {
        let json = serde_json::to_value(line("p1", 1000, None)).unwrap();
        assert_eq!(json["type"], "product");
        assert_eq!(json["productId"], "p1");
        assert_eq!(json["polarProductId"], "polar_p1");
        assert_eq!(json["price"], 1000);
        assert_eq!(json["quantity"], 1);
    }
}
