//! Download authorization for purchased files.
//!
//! Every file access runs the full authorization sequence: identity, order
//! lookup, ownership, payment status, access window, item lookup, quota.
//! Only then is a short-lived signed URL minted. The checks that need no
//! I/O are split into [`authorize_item`] so the whole decision table is
//! testable with plain values.

use std::time::Duration;

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use paperfold_core::{Email, OrderId};

use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::{OrderItem, OrderWithItems};
use crate::services::usage::{UsageEvent, UsageRecorder};
use crate::storage::{DownloadSigner, StorageError};

/// How long a granted download URL stays valid.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(3600);

/// Why a download request was refused.
///
/// The `Display` strings double as the client-facing error messages.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// No customer email on the request or in the session.
    #[error("Email required")]
    MissingIdentity,

    /// No order with the requested ID.
    #[error("Order not found")]
    OrderNotFound,

    /// The order belongs to a different email address.
    #[error("Access denied")]
    NotYourOrder,

    /// The order exists but has not been paid (or was refunded).
    #[error("Order is not completed")]
    OrderNotCompleted,

    /// The order's download window has closed.
    #[error("Download period has expired")]
    LinkExpired,

    /// The item index does not name an item on this order.
    #[error("Item not found")]
    ItemNotFound,

    /// Every allowed download for this item has been used.
    #[error("Download limit reached")]
    QuotaExhausted,

    /// The storage backend failed to sign a URL.
    #[error("Failed to generate download link")]
    Signing(#[source] StorageError),

    /// Order lookup failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Gatekeeper for paid file access.
pub struct DownloadService<'a> {
    orders: OrderRepository<'a>,
    signer: &'a dyn DownloadSigner,
    usage: &'a UsageRecorder,
}

impl<'a> DownloadService<'a> {
    #[must_use]
    pub const fn new(
        pool: &'a PgPool,
        signer: &'a dyn DownloadSigner,
        usage: &'a UsageRecorder,
    ) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            signer,
            usage,
        }
    }

    /// Authorize one download and mint a signed URL for it.
    ///
    /// On success the grant has already been queued for usage recording and
    /// the returned URL stays valid for [`DOWNLOAD_URL_TTL`].
    ///
    /// # Errors
    ///
    /// Returns the first failed check in the sequence; see [`DownloadError`].
    #[instrument(skip(self, identity))]
    pub async fn authorize(
        &self,
        order_id: OrderId,
        item_index: usize,
        identity: Option<&Email>,
    ) -> Result<String, DownloadError> {
        let email = identity.ok_or(DownloadError::MissingIdentity)?;

        let order = self
            .orders
            .get_with_items(order_id)
            .await
            .map_err(|error| match error {
                RepositoryError::NotFound => DownloadError::OrderNotFound,
                other => DownloadError::Repository(other),
            })?;

        let item = authorize_item(&order, email, item_index)?;

        let url = self
            .signer
            .signed_url(&item.file_key, &download_filename(item), DOWNLOAD_URL_TTL)
            .await
            .map_err(|error| {
                tracing::error!(
                    error = %error,
                    order_id = %order_id,
                    position = item.position,
                    file_key = %item.file_key,
                    "Failed to sign download URL"
                );
                DownloadError::Signing(error)
            })?;

        self.usage.record(UsageEvent {
            order_id,
            position: item.position,
        });

        tracing::info!(
            order_id = %order_id,
            position = item.position,
            "Download granted"
        );

        Ok(url)
    }
}

/// The I/O-free checks: ownership, status, access window, item, quota.
/// Runs in that order; the first failure wins.
fn authorize_item<'o>(
    order: &'o OrderWithItems,
    email: &Email,
    item_index: usize,
) -> Result<&'o OrderItem, DownloadError> {
    if order.order.customer_email != *email {
        return Err(DownloadError::NotYourOrder);
    }
    if !order.order.status.is_completed() {
        return Err(DownloadError::OrderNotCompleted);
    }
    if order.order.is_expired() {
        return Err(DownloadError::LinkExpired);
    }
    let item = order.item_at(item_index).ok_or(DownloadError::ItemNotFound)?;
    if item.quota_exhausted() {
        return Err(DownloadError::QuotaExhausted);
    }
    Ok(item)
}

/// Filename offered to the browser: the item title with the stored file's
/// extension.
fn download_filename(item: &OrderItem) -> String {
    match item.file_key.rsplit_once('.') {
        Some((_, extension)) if !extension.is_empty() && !extension.contains('/') => {
            format!("{}.{extension}", item.title)
        }
        _ => item.title.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration as ChronoDuration, Utc};

    use paperfold_core::{CheckoutId, OrderStatus, Price};

    use crate::models::order::Order;

    use super::*;

    fn order(status: OrderStatus, expired: bool, items: Vec<OrderItem>) -> OrderWithItems {
        let now = Utc::now();
        let order_id = OrderId::new();
        OrderWithItems {
            order: Order {
                id: order_id,
                checkout_id: CheckoutId::new("chk_1"),
                provider_order_id: None,
                customer_email: "owner@example.com".parse().unwrap(),
                status,
                total: Price::from_cents(1999),
                expires_at: expired.then(|| now - ChronoDuration::days(1)),
                created_at: now,
                updated_at: now,
            },
            items: items
                .into_iter()
                .map(|mut item| {
                    item.order_id = order_id;
                    item
                })
                .collect(),
        }
    }

    fn item(position: i32, used: i32, max: i32) -> OrderItem {
        OrderItem {
            order_id: OrderId::new(),
            position,
            title: "Weekly Planner".to_owned(),
            file_key: "products/weekly-planner.pdf".to_owned(),
            downloads_used: used,
            max_downloads: max,
        }
    }

    fn owner() -> Email {
        "owner@example.com".parse().unwrap()
    }

    #[test]
    fn test_completed_order_with_headroom_is_granted() {
        let order = order(OrderStatus::Completed, false, vec![item(0, 0, 5)]);
        let granted = authorize_item(&order, &owner(), 0).unwrap();
        assert_eq!(granted.file_key, "products/weekly-planner.pdf");
    }

    #[test]
    fn test_mismatched_email_is_denied() {
        let order = order(OrderStatus::Completed, false, vec![item(0, 0, 5)]);
        let other: Email = "stranger@example.com".parse().unwrap();
        let result = authorize_item(&order, &other, 0);
        assert!(matches!(result, Err(DownloadError::NotYourOrder)));
    }

    #[test]
    fn test_email_match_is_case_insensitive() {
        let order = order(OrderStatus::Completed, false, vec![item(0, 0, 5)]);
        let shouty: Email = "OWNER@Example.COM".parse().unwrap();
        assert!(authorize_item(&order, &shouty, 0).is_ok());
    }

    #[test]
    fn test_pending_order_is_refused() {
        let order = order(OrderStatus::Pending, false, vec![item(0, 0, 5)]);
        let result = authorize_item(&order, &owner(), 0);
        assert!(matches!(result, Err(DownloadError::OrderNotCompleted)));
    }

    #[test]
    fn test_refunded_order_is_refused() {
        let order = order(OrderStatus::Refunded, false, vec![item(0, 0, 5)]);
        let result = authorize_item(&order, &owner(), 0);
        assert!(matches!(result, Err(DownloadError::OrderNotCompleted)));
    }

    #[test]
    fn test_expired_order_is_refused() {
        let order = order(OrderStatus::Completed, true, vec![item(0, 0, 5)]);
        let result = authorize_item(&order, &owner(), 0);
        assert!(matches!(result, Err(DownloadError::LinkExpired)));
    }

    #[test]
    fn test_item_index_out_of_range_is_refused() {
        let order = order(OrderStatus::Completed, false, vec![item(0, 0, 5)]);
        let result = authorize_item(&order, &owner(), 5);
        assert!(matches!(result, Err(DownloadError::ItemNotFound)));
    }

    #[test]
    fn test_exhausted_quota_is_refused_even_for_owner() {
        let order = order(OrderStatus::Completed, false, vec![item(0, 5, 5)]);
        let result = authorize_item(&order, &owner(), 0);
        assert!(matches!(result, Err(DownloadError::QuotaExhausted)));
    }

    #[test]
    fn test_last_remaining_download_is_granted() {
        let order = order(OrderStatus::Completed, false, vec![item(0, 4, 5)]);
        assert!(authorize_item(&order, &owner(), 0).is_ok());
    }

    #[test]
    fn test_ownership_checked_before_status() {
        let order = order(OrderStatus::Pending, false, vec![item(0, 0, 5)]);
        let other: Email = "stranger@example.com".parse().unwrap();
        let result = authorize_item(&order, &other, 0);
        assert!(matches!(result, Err(DownloadError::NotYourOrder)));
    }

    #[test]
    fn test_second_item_addressed_by_index() {
        let order = order(
            OrderStatus::Completed,
            false,
            vec![item(0, 5, 5), item(1, 0, 5)],
        );
        let granted = authorize_item(&order, &owner(), 1).unwrap();
        assert_eq!(granted.position, 1);
    }

    #[test]
    fn test_download_filename_takes_extension_from_key() {
        let item = item(0, 0, 5);
        assert_eq!(download_filename(&item), "Weekly Planner.pdf");
    }

    #[test]
    fn test_download_filename_without_extension_uses_title() {
        let mut item = item(0, 0, 5);
        item.file_key = "products/raw-file".to_owned();
        assert_eq!(download_filename(&item), "Weekly Planner");
    }

    #[test]
    fn test_download_filename_ignores_dots_in_directories() {
        let mut item = item(0, 0, 5);
        item.file_key = "products/v1.2/planner".to_owned();
        assert_eq!(download_filename(&item), "Weekly Planner");
    }
}
