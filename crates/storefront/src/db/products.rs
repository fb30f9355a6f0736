//! `PostgreSQL` catalog store.
//!
//! Catalog filters are optional, so the listing query is assembled with
//! [`sqlx::QueryBuilder`] rather than a fixed statement.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

use wovry_core::{Product, ProductDraft, ProductFacets, ProductId, ProductQuery, ProductSort};

use super::{ProductStore, RepositoryError};

const PRODUCT_COLUMNS: &str =
    "id, name, description, price, image_url, category, sizes, colors, is_featured, created_at";

/// Products in `storefront.products`.
#[derive(Clone)]
pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Internal row type for product queries.
#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: String,
    price: Decimal,
    image_url: String,
    category: String,
    sizes: Vec<String>,
    colors: Vec<String>,
    is_featured: bool,
    created_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            image_url: row.image_url,
            category: row.category,
            sizes: row.sizes.into_iter().collect(),
            colors: row.colors.into_iter().collect(),
            is_featured: row.is_featured,
            created_at: row.created_at,
        }
    }
}

/// Internal row type for the facets query.
#[derive(sqlx::FromRow)]
struct FacetsRow {
    categories: Vec<String>,
    sizes: Vec<String>,
    colors: Vec<String>,
}

fn tags(set: &BTreeSet<String>) -> Vec<String> {
    set.iter().cloned().collect()
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the catalog listing statement for a query.
fn listing_query(query: &ProductQuery) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE TRUE"
    ));

    if let Some(category) = &query.category {
        builder.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(max_price) = query.max_price {
        builder.push(" AND price <= ").push_bind(max_price);
    }
    if !query.sizes.is_empty() {
        builder.push(" AND sizes @> ").push_bind(tags(&query.sizes));
    }
    if !query.colors.is_empty() {
        builder.push(" AND colors @> ").push_bind(tags(&query.colors));
    }
    if let Some(needle) = query.search_needle() {
        builder
            .push(" AND lower(name) LIKE ")
            .push_bind(format!("%{}%", escape_like(&needle)));
    }
    if query.featured_only {
        builder.push(" AND is_featured");
    }
    if let Some(exclude) = query.exclude {
        builder.push(" AND id <> ").push_bind(exclude);
    }

    builder.push(match query.sort {
        ProductSort::Newest => " ORDER BY created_at DESC, id",
        ProductSort::PriceAsc => " ORDER BY price ASC, id",
        ProductSort::PriceDesc => " ORDER BY price DESC, id",
    });
    builder
        .push(" LIMIT ")
        .push_bind(i64::from(query.limit))
        .push(" OFFSET ")
        .push_bind(i64::from(query.offset));

    builder
}

#[async_trait]
impl ProductStore for PgProductStore {
    #[instrument(skip(self))]
    async fn query(&self, query: &ProductQuery) -> Result<Vec<Product>, RepositoryError> {
        let rows = listing_query(query)
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    #[instrument(skip(self))]
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            SELECT id, name, description, price, image_url, category,
                   sizes, colors, is_featured, created_at
            FROM storefront.products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    #[instrument(skip(self))]
    async fn facets(&self) -> Result<ProductFacets, RepositoryError> {
        let row = sqlx::query_as::<_, FacetsRow>(
            r"
            SELECT
                COALESCE((SELECT array_agg(DISTINCT category ORDER BY category)
                          FROM storefront.products WHERE category <> ''), '{}') AS categories,
                COALESCE((SELECT array_agg(DISTINCT s ORDER BY s)
                          FROM storefront.products, unnest(sizes) AS s), '{}') AS sizes,
                COALESCE((SELECT array_agg(DISTINCT c ORDER BY c)
                          FROM storefront.products, unnest(colors) AS c), '{}') AS colors
            ",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ProductFacets {
            categories: row.categories.into_iter().collect(),
            sizes: row.sizes.into_iter().collect(),
            colors: row.colors.into_iter().collect(),
        })
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn create(&self, draft: ProductDraft) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            INSERT INTO storefront.products
                (id, name, description, price, image_url, category, sizes, colors, is_featured)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, name, description, price, image_url, category,
                      sizes, colors, is_featured, created_at
            ",
        )
        .bind(ProductId::generate())
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image_url)
        .bind(&draft.category)
        .bind(tags(&draft.sizes))
        .bind(tags(&draft.colors))
        .bind(draft.is_featured)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    #[instrument(skip(self, draft))]
    async fn update(
        &self,
        id: ProductId,
        draft: ProductDraft,
    ) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(
            r"
            UPDATE storefront.products
            SET name = $2, description = $3, price = $4, image_url = $5,
                category = $6, sizes = $7, colors = $8, is_featured = $9
            WHERE id = $1
            RETURNING id, name, description, price, image_url, category,
                      sizes, colors, is_featured, created_at
            ",
        )
        .bind(id)
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.price)
        .bind(&draft.image_url)
        .bind(&draft.category)
        .bind(tags(&draft.sizes))
        .bind(tags(&draft.colors))
        .bind(draft.is_featured)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::from).ok_or(RepositoryError::NotFound)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM storefront.products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("scarf"), "scarf");
    }

    #[test]
    fn test_listing_query_default() {
        let sql = listing_query(&ProductQuery::default()).into_sql();
        assert!(sql.ends_with("WHERE TRUE ORDER BY created_at DESC, id LIMIT $1 OFFSET $2"));
    }

    #[test]
    fn test_listing_query_binds_every_filter() {
        let query = ProductQuery {
            category: Some("scarves".to_string()),
            max_price: Some(Decimal::from(1000)),
            sizes: wovry_core::parse_tag_list("M"),
            colors: wovry_core::parse_tag_list("red"),
            search: Some("Chunky".to_string()),
            featured_only: true,
            sort: ProductSort::PriceDesc,
            ..ProductQuery::default()
        };
        let sql = listing_query(&query).into_sql();

        assert!(sql.contains("category = $1"));
        assert!(sql.contains("price <= $2"));
        assert!(sql.contains("sizes @> $3"));
        assert!(sql.contains("colors @> $4"));
        assert!(sql.contains("lower(name) LIKE $5"));
        assert!(sql.contains("AND is_featured"));
        assert!(sql.contains("ORDER BY price DESC, id LIMIT $6 OFFSET $7"));
    }
}
