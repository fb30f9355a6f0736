//! Database migration command.
//!
//! # Usage
//!
//! ```bash
//! wovry-cli migrate
//! ```
//!
//! Migrations live in `crates/storefront/migrations/` and are embedded into
//! the storefront crate at build time.

use wovry_storefront::db::MIGRATOR;

use super::{CliError, connect};

/// Run storefront database migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), CliError> {
    let pool = connect().await?;

    tracing::info!("Running storefront migrations...");
    MIGRATOR.run(&pool).await?;

    tracing::info!("Storefront migrations complete!");
    Ok(())
}
