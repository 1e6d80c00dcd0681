//! Paperfold CLI - Database migrations and support tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! pf-cli migrate
//!
//! # Seed a demo paid order for local testing
//! pf-cli seed order -e buyer@example.com
//!
//! # Inspect orders for a customer
//! pf-cli orders list -e buyer@example.com
//! pf-cli orders show 7c9e6679-7425-40de-944b-e07fc1f90ae7
//!
//! # Reset download counters on an order (support)
//! pf-cli orders reset-downloads 7c9e6679-7425-40de-944b-e07fc1f90ae7
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `seed order` - Insert a demo paid order
//! - `orders` - Inspect and repair customer orders

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(author, version, about = "Paperfold CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed demo data
    Seed {
        #[command(subcommand)]
        target: SeedTarget,
    },
    /// Inspect and repair customer orders
    Orders {
        #[command(subcommand)]
        action: OrdersAction,
    },
}

#[derive(Subcommand)]
enum SeedTarget {
    /// Insert a demo paid order with downloadable items
    Order {
        /// Customer email the order belongs to
        #[arg(short, long)]
        email: String,

        /// Seed the order already expired (for testing the download cutoff)
        #[arg(long)]
        expired: bool,
    },
}

#[derive(Subcommand)]
enum OrdersAction {
    /// List orders for a customer email
    List {
        /// Customer email address
        #[arg(short, long)]
        email: String,
    },
    /// Show one order with its items
    Show {
        /// Order ID (UUID)
        id: String,
    },
    /// Reset download counters on every item of an order
    ResetDownloads {
        /// Order ID (UUID)
        id: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::storefront().await?,
        Commands::Seed { target } => match target {
            SeedTarget::Order { email, expired } => {
                commands::seed::order(&email, expired).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrdersAction::List { email } => commands::orders::list(&email).await?,
            OrdersAction::Show { id } => commands::orders::show(&id).await?,
            OrdersAction::ResetDownloads { id } => commands::orders::reset_downloads(&id).await?,
        },
    }
    Ok(())
}
