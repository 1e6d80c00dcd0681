//! Purchasable item references.

use serde::{Deserialize, Serialize};

use super::id::{BundleId, ProductId};

/// A reference to something the storefront sells.
///
/// Either a single product or a bundle from the catalog. The cart treats two
/// references to the same catalog entry as the same item, which is what makes
/// repeated adds idempotent.
///
/// Wire form is a tagged object: `{"type": "product", "productId": "..."}` or
/// `{"type": "bundle", "bundleId": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ItemRef {
    #[serde(rename_all = "camelCase")]
    Product { product_id: ProductId },
    #[serde(rename_all = "camelCase")]
    Bundle { bundle_id: BundleId },
}

impl ItemRef {
    /// The catalog identifier, regardless of variant.
    #[must_use]
    pub fn catalog_id(&self) -> &str {
        match self {
            Self::Product { product_id } => product_id.as_str(),
            Self::Bundle { bundle_id } => bundle_id.as_str(),
        }
    }

    /// The item kind as a lowercase string, matching the wire tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Product { .. } => "product",
            Self::Bundle { .. } => "bundle",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_wire_shape() {
        let item = ItemRef::Product {
            product_id: ProductId::new("prod_1"),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"type":"product","productId":"prod_1"}"#);

        let back: ItemRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, item);
    }

    #[test]
    fn test_bundle_wire_shape() {
        let item = ItemRef::Bundle {
            bundle_id: BundleId::new("bundle_9"),
        };
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, r#"{"type":"bundle","bundleId":"bundle_9"}"#);
    }

    #[test]
    fn test_same_catalog_entry_compares_equal() {
        let a = ItemRef::Product {
            product_id: ProductId::new("prod_1"),
        };
        let b = ItemRef::Product {
            product_id: ProductId::new("prod_1"),
        };
        let c = ItemRef::Bundle {
            bundle_id: BundleId::new("prod_1"),
        };
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_catalog_id_and_kind() {
        let item = ItemRef::Bundle {
            bundle_id: BundleId::new("bundle_9"),
        };
        assert_eq!(item.catalog_id(), "bundle_9");
        assert_eq!(item.kind(), "bundle");
    }
}
