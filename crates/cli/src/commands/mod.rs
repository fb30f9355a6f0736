//! CLI subcommand implementations.
//!
//! Every command connects to the storefront database named by
//! `STOREFRONT_DATABASE_URL` (falling back to `DATABASE_URL`).

pub mod migrate;
pub mod orders;
pub mod products;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use wovry_storefront::db::{self, RepositoryError};

/// Errors shared by the CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid product #{index} ({name}): {reason}")]
    InvalidProduct {
        index: usize,
        name: String,
        reason: String,
    },

    #[error("Invalid order id: {0}")]
    InvalidOrderId(String),

    #[error("No order with id {0}")]
    OrderNotFound(String),
}

fn database_url() -> Result<SecretString, CliError> {
    dotenvy::dotenv().ok();

    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CliError::MissingEnvVar("STOREFRONT_DATABASE_URL"))
}

/// Connect to the storefront database.
async fn connect() -> Result<PgPool, CliError> {
    let url = database_url()?;
    tracing::info!("Connecting to storefront database...");
    Ok(db::create_pool(&url).await?)
}
