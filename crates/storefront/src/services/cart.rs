//! Session-backed cart operations.
//!
//! The cart lives entirely in the customer's session. Every mutation writes
//! the updated cart back before returning, so a successful call is durable
//! for the lifetime of the session.

use tower_sessions::Session;

use paperfold_core::CartLineId;

use crate::models::cart::{Cart, CartLine};
use crate::models::session::keys;

/// Cart operations bound to one customer session.
pub struct CartService<'a> {
    session: &'a Session,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(session: &'a Session) -> Self {
        Self { session }
    }

    /// Load the cart, treating absent or unreadable session state as empty.
    ///
    /// Carts written by older releases can fail to deserialize; the customer
    /// gets a fresh cart rather than an error in that case.
    pub async fn load(&self) -> Cart {
        match self.session.get::<Cart>(keys::CART).await {
            Ok(Some(cart)) => cart,
            Ok(None) => Cart::default(),
            Err(error) => {
                tracing::debug!(error = %error, "Unreadable cart in session, starting fresh");
                Cart::default()
            }
        }
    }

    /// Add a line to the cart.
    ///
    /// Adding an item that is already in the cart (same catalog identity) is
    /// a no-op and leaves the stored cart untouched. Returns the resulting
    /// cart and whether the line was actually added.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn add(
        &self,
        line: CartLine,
    ) -> Result<(Cart, bool), tower_sessions::session::Error> {
        let mut cart = self.load().await;
        let item = line.item.clone();
        let price = line.price;

        let added = cart.add(line);
        if added {
            self.save(&cart).await?;
            tracing::info!(
                item_type = item.kind(),
                item_id = item.catalog_id(),
                price_cents = price.cents(),
                cart_size = cart.len(),
                "Add to cart"
            );
        }

        Ok((cart, added))
    }

    /// Remove a line by its cart line ID.
    ///
    /// Unknown IDs are a no-op; the customer may have the item removed in
    /// another tab already.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn remove(&self, id: CartLineId) -> Result<Cart, tower_sessions::session::Error> {
        let mut cart = self.load().await;

        if let Some(removed) = cart.remove(&id) {
            self.save(&cart).await?;
            tracing::info!(
                item_type = removed.item.kind(),
                item_id = removed.item.catalog_id(),
                cart_size = cart.len(),
                "Remove from cart"
            );
        }

        Ok(cart)
    }

    /// Replace the cart with a fresh empty one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store rejects the write.
    pub async fn clear(&self) -> Result<Cart, tower_sessions::session::Error> {
        let cart = Cart::default();
        self.save(&cart).await?;
        tracing::info!("Cart cleared");
        Ok(cart)
    }

    async fn save(&self, cart: &Cart) -> Result<(), tower_sessions::session::Error> {
        self.session.insert(keys::CART, cart).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use paperfold_core::{ItemRef, Price, ProductId};
    use tower_sessions::{MemoryStore, Session};

    use super::*;

    fn test_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn line(product: &str, cents: i64) -> CartLine {
        CartLine::new(
            ItemRef::Product {
                product_id: ProductId::new(product),
            },
            paperfold_core::CheckoutProductId::new(format!("polar_{product}")),
            format!("Product {product}"),
            None,
            Price::from_cents(cents),
            None,
        )
    }

    #[tokio::test]
    async fn test_load_empty_session() {
        let session = test_session();
        let cart = CartService::new(&session).load().await;
        assert!(cart.is_empty());
    }

    #[tokio::test]
    async fn test_add_persists_to_session() {
        let session = test_session();
        let service = CartService::new(&session);

        let (cart, added) = service.add(line("p1", 1000)).await.unwrap();
        assert!(added);
        assert_eq!(cart.len(), 1);

        let reloaded = service.load().await;
        assert_eq!(reloaded.len(), 1);
    }

    #[tokio::test]
    async fn test_add_duplicate_is_noop() {
        let session = test_session();
        let service = CartService::new(&session);

        service.add(line("p1", 1000)).await.unwrap();
        let (cart, added) = service.add(line("p1", 1000)).await.unwrap();

        assert!(!added);
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_unknown_id_is_noop() {
        let session = test_session();
        let service = CartService::new(&session);

        service.add(line("p1", 1000)).await.unwrap();
        let cart = service.remove(CartLineId::new()).await.unwrap();
        assert_eq!(cart.len(), 1);
    }

    #[tokio::test]
    async fn test_clear_resets_cart() {
        let session = test_session();
        let service = CartService::new(&session);

        service.add(line("p1", 1000)).await.unwrap();
        service.add(line("p2", 500)).await.unwrap();
        let cart = service.clear().await.unwrap();
        assert!(cart.is_empty());

        let reloaded = service.load().await;
        assert!(reloaded.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_cart_loads_as_empty() {
        let session = test_session();
        session.insert(keys::CART, "not a cart").await.unwrap();

        let cart = CartService::new(&session).load().await;
        assert!(cart.is_empty());
    }
}
