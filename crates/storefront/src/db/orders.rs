//! Order repository for database operations.
//!
//! Orders are written exactly once by the payment webhook and read by the
//! download authorizer, the customer library, and the CLI. The one mutation
//! after creation is the download counter on individual items.

use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use paperfold_core::{CheckoutId, Email, OrderId};

use super::RepositoryError;
use crate::models::order::{NewOrder, Order, OrderItem, OrderWithItems};

const ORDER_COLUMNS: &str = "id, checkout_id, provider_order_id, customer_email, \
     status, total_cents, expires_at, created_at, updated_at";

const ITEM_COLUMNS: &str =
    "order_id, position, title, file_key, downloads_used, max_downloads";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Record a new order with its items.
    ///
    /// Returns `None` without writing anything if an order for the same
    /// checkout already exists. Webhook deliveries are retried by the
    /// provider, so duplicate inserts are expected and harmless.
    ///
    /// Item positions are assigned from the input order, starting at zero.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any query fails.
    pub async fn insert(&self, new_order: &NewOrder) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let query = format!(
            r"
            INSERT INTO storefront.orders
                (id, checkout_id, provider_order_id, customer_email, status,
                 total_cents, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (checkout_id) DO NOTHING
            RETURNING {ORDER_COLUMNS}
            "
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(OrderId::new())
            .bind(&new_order.checkout_id)
            .bind(&new_order.provider_order_id)
            .bind(&new_order.customer_email)
            .bind(new_order.status)
            .bind(new_order.total)
            .bind(new_order.expires_at)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(order) = order else {
            // Duplicate checkout, nothing written. Dropping the transaction
            // rolls it back.
            return Ok(None);
        };

        for (position, item) in (0_i32..).zip(&new_order.items) {
            sqlx::query(
                r"
                INSERT INTO storefront.order_items
                    (order_id, position, title, file_key, max_downloads)
                VALUES ($1, $2, $3, $4, $5)
                ",
            )
            .bind(order.id)
            .bind(position)
            .bind(&item.title)
            .bind(&item.file_key)
            .bind(item.max_downloads)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(Some(order))
    }

    /// Load an order with its items, ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no such order exists.
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_with_items(&self, id: OrderId) -> Result<OrderWithItems, RepositoryError> {
        let query = format!("SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE id = $1");
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.order_items \
             WHERE order_id = $1 ORDER BY position"
        );
        let items = sqlx::query_as::<_, OrderItem>(&query)
            .bind(id)
            .fetch_all(self.pool)
            .await?;

        Ok(OrderWithItems { order, items })
    }

    /// Look up an order by the checkout session that produced it.
    ///
    /// Absence is normal while payment is still in flight, so this returns
    /// `None` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_checkout_id(
        &self,
        checkout_id: &CheckoutId,
    ) -> Result<Option<Order>, RepositoryError> {
        let query =
            format!("SELECT {ORDER_COLUMNS} FROM storefront.orders WHERE checkout_id = $1");
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(checkout_id)
            .fetch_optional(self.pool)
            .await?;

        Ok(order)
    }

    /// List all orders belonging to an email, newest first, with items.
    ///
    /// Emails are normalized to lowercase at the type level, so a plain
    /// equality match is case-insensitive in practice.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list_for_email(
        &self,
        email: &Email,
    ) -> Result<Vec<OrderWithItems>, RepositoryError> {
        let query = format!(
            "SELECT {ORDER_COLUMNS} FROM storefront.orders \
             WHERE customer_email = $1 ORDER BY created_at DESC"
        );
        let orders = sqlx::query_as::<_, Order>(&query)
            .bind(email)
            .fetch_all(self.pool)
            .await?;

        if orders.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<Uuid> = orders.iter().map(|order| order.id.as_uuid()).collect();
        let query = format!(
            "SELECT {ITEM_COLUMNS} FROM storefront.order_items \
             WHERE order_id = ANY($1) ORDER BY order_id, position"
        );
        let items = sqlx::query_as::<_, OrderItem>(&query)
            .bind(&ids)
            .fetch_all(self.pool)
            .await?;

        let mut by_order: HashMap<OrderId, Vec<OrderItem>> = HashMap::new();
        for item in items {
            by_order.entry(item.order_id).or_default().push(item);
        }

        Ok(orders
            .into_iter()
            .map(|order| {
                let items = by_order.remove(&order.id).unwrap_or_default();
                OrderWithItems { order, items }
            })
            .collect())
    }

    /// Consume one download on an item, if quota remains.
    ///
    /// The guard is part of the UPDATE itself, so two concurrent grants for
    /// the final download cannot both land.
    ///
    /// # Returns
    ///
    /// `true` if a download was recorded, `false` if the item does not exist
    /// or its quota is already spent.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn record_download(
        &self,
        order_id: OrderId,
        position: i32,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE storefront.order_items
            SET downloads_used = downloads_used + 1
            WHERE order_id = $1 AND position = $2 AND downloads_used < max_downloads
            ",
        )
        .bind(order_id)
        .bind(position)
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Reset download counters on every item of an order.
    ///
    /// Support tooling only, reached through the CLI.
    ///
    /// # Returns
    ///
    /// The number of items reset.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn reset_downloads(&self, order_id: OrderId) -> Result<u64, RepositoryError> {
        let result =
            sqlx::query("UPDATE storefront.order_items SET downloads_used = 0 WHERE order_id = $1")
                .bind(order_id)
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}
