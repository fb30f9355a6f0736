//! Catalog import.
//!
//! # Usage
//!
//! ```bash
//! wovry-cli products import catalog.yaml
//! wovry-cli products import catalog.yaml --dry-run
//! ```
//!
//! # File format
//!
//! ```yaml
//! products:
//!   - name: Merino Scarf
//!     description: Hand-knit from undyed merino.
//!     price: "1450.00"
//!     imageUrl: https://cdn.wovry.shop/scarf.jpg
//!     category: scarves
//!     sizes: "One Size"
//!     colors: [Cream, Charcoal]
//!     isFeatured: true
//! ```
//!
//! `sizes` and `colors` take a list or a comma-separated string.

use std::path::Path;

use serde::Deserialize;

use wovry_core::ProductDraft;
use wovry_storefront::db::{PgProductStore, ProductStore};

use super::{CliError, connect};

#[derive(Debug, Deserialize)]
struct CatalogFile {
    products: Vec<ProductDraft>,
}

/// Parse and validate a catalog file. Fails on the first invalid product.
fn load_catalog(contents: &str) -> Result<Vec<ProductDraft>, CliError> {
    let catalog: CatalogFile = serde_yaml::from_str(contents)?;

    catalog
        .products
        .into_iter()
        .enumerate()
        .map(|(index, draft)| {
            let name = draft.name.clone();
            draft.validate().map_err(|e| CliError::InvalidProduct {
                index: index + 1,
                name,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Import products from a YAML file.
///
/// The whole file is validated before anything is written.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, a product is
/// invalid, or an insert fails.
pub async fn import(file_path: &str, dry_run: bool) -> Result<(), CliError> {
    let contents = std::fs::read_to_string(Path::new(file_path)).map_err(|source| CliError::Io {
        path: file_path.to_string(),
        source,
    })?;

    let drafts = load_catalog(&contents)?;
    tracing::info!(count = drafts.len(), file = %file_path, "Catalog validated");

    if dry_run {
        tracing::info!("Dry run, nothing written");
        return Ok(());
    }

    let store = PgProductStore::new(connect().await?);
    for draft in drafts {
        let product = store.create(draft).await?;
        tracing::info!(product_id = %product.id, name = %product.name, "Imported product");
    }

    tracing::info!("Catalog import complete!");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_load_catalog() {
        let drafts = load_catalog(
            r#"
products:
  - name: "  Merino Scarf "
    price: "1450.00"
    sizes: "One Size"
    colors: [Cream, Charcoal]
    isFeatured: true
  - name: Cable Beanie
    price: 650
"#,
        )
        .unwrap();

        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].name, "Merino Scarf");
        assert_eq!(drafts[0].price, Decimal::new(145_000, 2));
        assert_eq!(drafts[0].colors.len(), 2);
        assert!(drafts[0].is_featured);
        assert!(drafts[1].sizes.is_empty());
    }

    #[test]
    fn test_load_catalog_reports_invalid_product() {
        let err = load_catalog(
            r#"
products:
  - name: Mittens
    price: 300
  - name: Refund
    price: "-5"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, CliError::InvalidProduct { index: 2, .. }));
    }
}
