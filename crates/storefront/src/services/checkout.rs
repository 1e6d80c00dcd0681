//! Hosted checkout initiation.
//!
//! Builds a checkout session with the payment provider and hands the hosted
//! URL back to the client. The service never touches the cart or the
//! session; callers resolve the customer email and record preference updates
//! themselves, so checkout from a cart and express checkout from a product
//! page share one code path.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use paperfold_core::{CheckoutId, CheckoutProductId, Email, ItemRef};

use crate::polar::{CreateCheckoutRequest, PolarClient, PolarError};

/// One purchasable unit in a checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItem {
    /// The payment provider's product ID to bill.
    #[serde(rename = "polarProductId")]
    pub checkout_product_id: CheckoutProductId,
    /// Catalog identity of what is being bought.
    #[serde(flatten)]
    pub item: ItemRef,
}

/// Result of opening a hosted checkout session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSummary {
    /// Hosted checkout page to send the customer to.
    pub checkout_url: String,
    /// Provider's ID for the session, used later to look up the order.
    pub checkout_id: CheckoutId,
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout requested with no items.
    #[error("No items to check out")]
    NoItems,

    /// The payment provider rejected or failed the request.
    #[error(transparent)]
    Provider(#[from] PolarError),
}

/// Opens hosted checkout sessions with the payment provider.
pub struct CheckoutService<'a> {
    polar: &'a PolarClient,
    base_url: &'a str,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(polar: &'a PolarClient, base_url: &'a str) -> Self {
        Self { polar, base_url }
    }

    /// Open a hosted checkout session for `items`.
    ///
    /// `express` marks the session as a buy-it-now flow in the provider
    /// metadata; the request contract is otherwise identical to a cart
    /// checkout.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::NoItems`] for an empty item list and
    /// [`CheckoutError::Provider`] when the provider call fails.
    #[instrument(skip(self, items, metadata), fields(items = items.len()))]
    pub async fn initiate(
        &self,
        items: &[CheckoutItem],
        customer_email: Option<&Email>,
        metadata: HashMap<String, String>,
        express: bool,
    ) -> Result<CheckoutSummary, CheckoutError> {
        let request = build_request(items, customer_email, metadata, express, self.base_url)?;
        let session = self.polar.create_checkout(&request).await?;

        tracing::info!(
            checkout_id = %session.id,
            items = items.len(),
            express,
            "Checkout session created"
        );

        Ok(CheckoutSummary {
            checkout_url: session.url,
            checkout_id: CheckoutId::new(session.id),
        })
    }
}

/// Assemble the provider request. Pure so the metadata and URL rules are
/// testable without a network.
fn build_request(
    items: &[CheckoutItem],
    customer_email: Option<&Email>,
    mut metadata: HashMap<String, String>,
    express: bool,
    base_url: &str,
) -> Result<CreateCheckoutRequest, CheckoutError> {
    if items.is_empty() {
        return Err(CheckoutError::NoItems);
    }

    if express {
        metadata.insert("expressCheckout".to_owned(), "true".to_owned());
        metadata.insert("skipCart".to_owned(), "true".to_owned());
    }

    // Catalog identities ride along so the webhook and analytics can tie
    // provider line items back to our products.
    for (index, entry) in items.iter().enumerate() {
        metadata.insert(
            format!("item_{index}"),
            format!("{}:{}", entry.item.kind(), entry.item.catalog_id()),
        );
    }

    Ok(CreateCheckoutRequest {
        products: items
            .iter()
            .map(|entry| entry.checkout_product_id.to_string())
            .collect(),
        customer_email: customer_email.map(ToString::to_string),
        metadata,
        success_url: Some(format!(
            "{}/library?checkout_id={{CHECKOUT_ID}}",
            base_url.trim_end_matches('/')
        )),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use paperfold_core::{BundleId, ProductId};

    use super::*;

    fn item(polar_id: &str, product: &str) -> CheckoutItem {
        CheckoutItem {
            checkout_product_id: CheckoutProductId::new(polar_id),
            item: ItemRef::Product {
                product_id: ProductId::new(product),
            },
        }
    }

    #[test]
    fn test_empty_items_rejected() {
        let result = build_request(&[], None, HashMap::new(), false, "https://paperfold.ink");
        assert!(matches!(result, Err(CheckoutError::NoItems)));
    }

    #[test]
    fn test_products_preserve_order() {
        let items = vec![item("polar_a", "a"), item("polar_b", "b")];
        let request =
            build_request(&items, None, HashMap::new(), false, "https://paperfold.ink").unwrap();
        assert_eq!(request.products, vec!["polar_a", "polar_b"]);
    }

    #[test]
    fn test_express_sets_metadata_flags() {
        let items = vec![item("polar_a", "a")];
        let request =
            build_request(&items, None, HashMap::new(), true, "https://paperfold.ink").unwrap();

        assert_eq!(
            request.metadata.get("expressCheckout"),
            Some(&"true".to_owned())
        );
        assert_eq!(request.metadata.get("skipCart"), Some(&"true".to_owned()));
    }

    #[test]
    fn test_cart_checkout_has_no_express_flags() {
        let items = vec![item("polar_a", "a")];
        let request =
            build_request(&items, None, HashMap::new(), false, "https://paperfold.ink").unwrap();

        assert!(!request.metadata.contains_key("expressCheckout"));
        assert!(!request.metadata.contains_key("skipCart"));
    }

    #[test]
    fn test_catalog_identities_recorded_in_metadata() {
        let items = vec![
            item("polar_a", "planner-2026"),
            CheckoutItem {
                checkout_product_id: CheckoutProductId::new("polar_b"),
                item: ItemRef::Bundle {
                    bundle_id: BundleId::new("starter-kit"),
                },
            },
        ];
        let request =
            build_request(&items, None, HashMap::new(), false, "https://paperfold.ink").unwrap();

        assert_eq!(
            request.metadata.get("item_0"),
            Some(&"product:planner-2026".to_owned())
        );
        assert_eq!(
            request.metadata.get("item_1"),
            Some(&"bundle:starter-kit".to_owned())
        );
    }

    #[test]
    fn test_email_passed_through() {
        let items = vec![item("polar_a", "a")];
        let email: Email = "Buyer@Example.com".parse().unwrap();
        let request = build_request(
            &items,
            Some(&email),
            HashMap::new(),
            false,
            "https://paperfold.ink",
        )
        .unwrap();

        assert_eq!(request.customer_email.as_deref(), Some("buyer@example.com"));
    }

    #[test]
    fn test_success_url_keeps_checkout_id_placeholder() {
        let items = vec![item("polar_a", "a")];
        let request =
            build_request(&items, None, HashMap::new(), false, "https://paperfold.ink/").unwrap();

        assert_eq!(
            request.success_url.as_deref(),
            Some("https://paperfold.ink/library?checkout_id={CHECKOUT_ID}")
        );
    }
}
