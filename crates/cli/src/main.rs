//! Wovry CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run storefront database migrations
//! wovry-cli migrate
//!
//! # Import the catalog
//! wovry-cli products import catalog.yaml
//!
//! # Find orders whose payment webhook never landed
//! wovry-cli orders pending --older-than 30
//!
//! # Reconcile one by hand
//! wovry-cli orders mark-paid <order-id>
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `products import` - Load products from YAML
//! - `orders pending` - List stale pending orders
//! - `orders mark-paid` - Apply the `pending -> paid` transition

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wovry-cli")]
#[command(author, version, about = "Wovry CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Inspect and reconcile orders
    Orders {
        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Import products from a YAML file
    Import {
        /// Path to the catalog file
        file: String,

        /// Validate only, write nothing
        #[arg(long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
enum OrderAction {
    /// List orders still pending
    Pending {
        /// Only orders created at least this many minutes ago
        #[arg(long, default_value_t = 30)]
        older_than: u32,
    },
    /// Mark an order paid (no-op if it already is)
    MarkPaid {
        /// Order id (UUID)
        order_id: String,
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
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Products { action } => match action {
            ProductAction::Import { file, dry_run } => {
                commands::products::import(&file, dry_run).await?;
            }
        },
        Commands::Orders { action } => match action {
            OrderAction::Pending { older_than } => commands::orders::pending(older_than).await?,
            OrderAction::MarkPaid { order_id } => commands::orders::mark_paid(&order_id).await?,
        },
    }
    Ok(())
}
