//! Seed demo data for local testing.
//!
//! Inserts a paid order directly, bypassing the webhook, so the download
//! and library endpoints can be exercised without a real Polar checkout.

use thiserror::Error;
use uuid::Uuid;

use paperfold_core::{CheckoutId, Email, OrderStatus, Price};
use paperfold_storefront::db::{OrderRepository, RepositoryError};
use paperfold_storefront::models::order::{NewOrder, NewOrderItem};

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The email argument did not parse.
    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository error.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Insert a demo paid order for an email.
///
/// The order carries two items with distinct quotas. With `expired` set the
/// download window is already closed, which is handy for testing the cutoff
/// path end to end.
///
/// # Errors
///
/// Returns an error if the email is invalid or the insert fails.
pub async fn order(email: &str, expired: bool) -> Result<(), SeedError> {
    let email = Email::parse(email).map_err(|_| SeedError::InvalidEmail(email.to_owned()))?;

    let database_url = super::database_url().map_err(SeedError::MissingEnvVar)?;
    let pool = paperfold_storefront::db::create_pool(&database_url).await?;

    let expires_at = expired.then(|| chrono::Utc::now() - chrono::Duration::days(1));

    let new_order = NewOrder {
        // Unique per run so repeated seeding creates separate orders
        checkout_id: CheckoutId::new(format!("seed_{}", Uuid::new_v4())),
        provider_order_id: None,
        customer_email: email.clone(),
        status: OrderStatus::Completed,
        total: Price::from_cents(2798),
        expires_at,
        items: vec![
            NewOrderItem {
                title: "Weekly Planner (Demo)".to_owned(),
                file_key: "demo/weekly-planner.pdf".to_owned(),
                max_downloads: 5,
            },
            NewOrderItem {
                title: "Budget Tracker (Demo)".to_owned(),
                file_key: "demo/budget-tracker.xlsx".to_owned(),
                max_downloads: 2,
            },
        ],
    };

    let Some(order) = OrderRepository::new(&pool).insert(&new_order).await? else {
        // Cannot happen with a fresh UUID in the checkout id
        tracing::warn!("Seed order collided with an existing checkout, nothing inserted");
        return Ok(());
    };

    tracing::info!("Seeded demo order {} for {email}", order.id);
    tracing::info!(
        "Try: curl -i 'http://localhost:3000/api/download/{}/0?email={email}'",
        order.id
    );
    Ok(())
}
