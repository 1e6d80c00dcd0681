//! Order inspection and repair commands.
//!
//! # Usage
//!
//! ```bash
//! # List a customer's orders
//! pf-cli orders list -e buyer@example.com
//!
//! # Show one order with download counters
//! pf-cli orders show 7c9e6679-7425-40de-944b-e07fc1f90ae7
//!
//! # Reset download counters (support action after a customer runs out)
//! pf-cli orders reset-downloads 7c9e6679-7425-40de-944b-e07fc1f90ae7
//! ```

use thiserror::Error;

use paperfold_core::{Email, OrderId};
use paperfold_storefront::db::{OrderRepository, RepositoryError};

/// Errors that can occur during order commands.
#[derive(Debug, Error)]
pub enum OrdersError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The email argument did not parse.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// The order ID argument did not parse as a UUID.
    #[error("Invalid order ID: {0}")]
    InvalidOrderId(String),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// List all orders for a customer email, newest first.
///
/// # Errors
///
/// Returns an error if the email is invalid or the database is unreachable.
pub async fn list(email: &str) -> Result<(), OrdersError> {
    let email = Email::parse(email).map_err(|_| OrdersError::InvalidEmail(email.to_owned()))?;

    let database_url = super::database_url().map_err(OrdersError::MissingEnvVar)?;
    let pool = paperfold_storefront::db::create_pool(&database_url).await?;

    let orders = OrderRepository::new(&pool).list_for_email(&email).await?;

    if orders.is_empty() {
        tracing::info!("No orders for {email}");
        return Ok(());
    }

    #[allow(clippy::print_stdout)]
    for entry in &orders {
        println!(
            "{}  {:9}  {:>8}  {}  {} item(s)",
            entry.order.id,
            entry.order.status.to_string(),
            entry.order.total.to_string(),
            entry.order.created_at.format("%Y-%m-%d"),
            entry.items.len(),
        );
    }

    Ok(())
}

/// Show one order with per-item download counters.
///
/// # Errors
///
/// Returns an error if the ID is invalid, the order does not exist, or the
/// database is unreachable.
pub async fn show(id: &str) -> Result<(), OrdersError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| OrdersError::InvalidOrderId(id.to_owned()))?;

    let database_url = super::database_url().map_err(OrdersError::MissingEnvVar)?;
    let pool = paperfold_storefront::db::create_pool(&database_url).await?;

    let entry = OrderRepository::new(&pool).get_with_items(order_id).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("Order     {}", entry.order.id);
        println!("Checkout  {}", entry.order.checkout_id);
        println!("Customer  {}", entry.order.customer_email);
        println!("Status    {}", entry.order.status);
        println!("Total     {}", entry.order.total);
        println!("Created   {}", entry.order.created_at);
        match entry.order.expires_at {
            Some(at) => println!("Expires   {at}"),
            None => println!("Expires   never"),
        }
        println!();
        for item in &entry.items {
            println!(
                "  [{}] {}  {}/{} downloads  ({})",
                item.position, item.title, item.downloads_used, item.max_downloads, item.file_key,
            );
        }
    }

    Ok(())
}

/// Reset download counters on every item of an order.
///
/// # Errors
///
/// Returns an error if the ID is invalid or the database is unreachable.
pub async fn reset_downloads(id: &str) -> Result<(), OrdersError> {
    let order_id: OrderId = id
        .parse()
        .map_err(|_| OrdersError::InvalidOrderId(id.to_owned()))?;

    let database_url = super::database_url().map_err(OrdersError::MissingEnvVar)?;
    let pool = paperfold_storefront::db::create_pool(&database_url).await?;

    let reset = OrderRepository::new(&pool).reset_downloads(order_id).await?;

    tracing::info!("Reset download counters on {reset} item(s) of order {order_id}");
    Ok(())
}
