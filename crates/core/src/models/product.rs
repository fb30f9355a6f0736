//! Catalog products and catalog queries.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{MAX_PRODUCT_PRICE, ProductId, STORED_AMOUNT_SCALE};

/// Errors in a product submitted by an administrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("product name is required")]
    MissingName,
    #[error("product price cannot be negative")]
    NegativePrice,
    #[error("product price cannot have more than {} decimal places", STORED_AMOUNT_SCALE)]
    PriceTooPrecise,
    #[error("product price cannot exceed {}", MAX_PRODUCT_PRICE)]
    PriceTooLarge,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image_url: String,
    pub category: String,
    pub sizes: BTreeSet<String>,
    pub colors: BTreeSet<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Replace every editable field with the draft's values.
    ///
    /// `id` and `created_at` are kept.
    pub fn apply(&mut self, draft: ProductDraft) {
        self.name = draft.name;
        self.description = draft.description;
        self.price = draft.price;
        self.image_url = draft.image_url;
        self.category = draft.category;
        self.sizes = draft.sizes;
        self.colors = draft.colors;
        self.is_featured = draft.is_featured;
    }
}

/// The editable fields of a product, as submitted by an administrator.
///
/// `sizes` and `colors` accept either a JSON array or a comma-separated
/// string (`"S, M, L"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub category: String,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub sizes: BTreeSet<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub colors: BTreeSet<String>,
    #[serde(default)]
    pub is_featured: bool,
}

impl ProductDraft {
    /// Trim text fields and check required values.
    ///
    /// # Errors
    ///
    /// Returns a [`ProductError`] for a blank name, or a price that is negative,
    /// finer than the stored precision or above [`MAX_PRODUCT_PRICE`].
    pub fn validate(mut self) -> Result<Self, ProductError> {
        self.name = self.name.trim().to_string();
        self.category = self.category.trim().to_string();
        self.image_url = self.image_url.trim().to_string();

        if self.name.is_empty() {
            return Err(ProductError::MissingName);
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ProductError::NegativePrice);
        }
        if self.price.normalize().scale() > STORED_AMOUNT_SCALE {
            return Err(ProductError::PriceTooPrecise);
        }
        if self.price > MAX_PRODUCT_PRICE {
            return Err(ProductError::PriceTooLarge);
        }
        Ok(self)
    }

    /// Materialize a new catalog product.
    #[must_use]
    pub fn into_product(self, id: ProductId, created_at: DateTime<Utc>) -> Product {
        Product {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            image_url: self.image_url,
            category: self.category,
            sizes: self.sizes,
            colors: self.colors,
            is_featured: self.is_featured,
            created_at,
        }
    }
}

/// Split a comma-separated list into a set of trimmed, non-empty tags.
///
/// ```
/// use wovry_core::parse_tag_list;
///
/// let tags = parse_tag_list(" S, M ,, L ");
/// assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["L", "M", "S"]);
/// ```
#[must_use]
pub fn parse_tag_list(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

fn deserialize_tags<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Tags {
        List(Vec<String>),
        Csv(String),
    }

    Ok(match Tags::deserialize(deserializer)? {
        Tags::List(list) => list
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect(),
        Tags::Csv(csv) => parse_tag_list(&csv),
    })
}

/// Catalog ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductSort {
    /// Most recently created first.
    #[default]
    Newest,
    /// Cheapest first.
    PriceAsc,
    /// Most expensive first.
    PriceDesc,
}

impl ProductSort {
    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let primary = match self {
            Self::Newest => b.created_at.cmp(&a.created_at),
            Self::PriceAsc => a.price.cmp(&b.price),
            Self::PriceDesc => b.price.cmp(&a.price),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

/// A catalog query: filters, ordering and a page window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub max_price: Option<Decimal>,
    /// Products must offer every listed size.
    pub sizes: BTreeSet<String>,
    /// Products must offer every listed color.
    pub colors: BTreeSet<String>,
    /// Case-insensitive substring of the product name.
    pub search: Option<String>,
    pub featured_only: bool,
    pub exclude: Option<ProductId>,
    pub sort: ProductSort,
    pub limit: u32,
    pub offset: u32,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category: None,
            max_price: None,
            sizes: BTreeSet::new(),
            colors: BTreeSet::new(),
            search: None,
            featured_only: false,
            exclude: None,
            sort: ProductSort::default(),
            limit: Self::DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl ProductQuery {
    /// Products per catalog page.
    pub const DEFAULT_LIMIT: u32 = 9;
    /// Upper bound on a single page.
    pub const MAX_LIMIT: u32 = 100;
    /// Products shown in the featured strip and the related strip.
    pub const STRIP_LIMIT: u32 = 4;

    /// Featured products for the home page.
    #[must_use]
    pub fn featured() -> Self {
        Self {
            featured_only: true,
            limit: Self::STRIP_LIMIT,
            ..Self::default()
        }
    }

    /// Other products in the same category as `product`.
    #[must_use]
    pub fn related_to(product: &Product) -> Self {
        Self {
            category: Some(product.category.clone()),
            exclude: Some(product.id),
            limit: Self::STRIP_LIMIT,
            ..Self::default()
        }
    }

    /// Clamp the page size into `1..=MAX_LIMIT`.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit.clamp(1, Self::MAX_LIMIT);
        self
    }

    /// Lowercased search needle, if any.
    #[must_use]
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }

    /// Whether a product passes every filter of this query.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.exclude == Some(product.id) {
            return false;
        }
        if self.featured_only && !product.is_featured {
            return false;
        }
        if self
            .category
            .as_ref()
            .is_some_and(|category| &product.category != category)
        {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        if !self.sizes.is_subset(&product.sizes) || !self.colors.is_subset(&product.colors) {
            return false;
        }
        if let Some(needle) = self.search_needle() {
            return product.name.to_lowercase().contains(&needle);
        }
        true
    }

    /// Filter, order and page a list of products.
    #[must_use]
    pub fn apply(&self, products: impl IntoIterator<Item = Product>) -> Vec<Product> {
        let mut matching: Vec<Product> = products
            .into_iter()
            .filter(|product| self.matches(product))
            .collect();
        matching.sort_by(|a, b| self.sort.compare(a, b));
        matching
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect()
    }
}

/// Distinct filter values across the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFacets {
    pub categories: BTreeSet<String>,
    pub sizes: BTreeSet<String>,
    pub colors: BTreeSet<String>,
}

impl ProductFacets {
    /// Gather facets from a set of products.
    #[must_use]
    pub fn collect<'a>(products: impl IntoIterator<Item = &'a Product>) -> Self {
        let mut facets = Self::default();
        for product in products {
            if !product.category.is_empty() {
                facets.categories.insert(product.category.clone());
            }
            facets.sizes.extend(product.sizes.iter().cloned());
            facets.colors.extend(product.colors.iter().cloned());
        }
        facets
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn product(name: &str, category: &str, price: i64, age_days: i64) -> Product {
        Product {
            id: ProductId::generate(),
            name: name.to_string(),
            description: String::new(),
            price: Decimal::from(price),
            image_url: String::new(),
            category: category.to_string(),
            sizes: parse_tag_list("S, M"),
            colors: parse_tag_list("red"),
            is_featured: false,
            created_at: Utc::now() - Duration::days(age_days),
        }
    }

    fn names(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_default_sort_is_newest_first() {
        let catalog = vec![
            product("old", "hats", 100, 10),
            product("new", "hats", 100, 1),
            product("mid", "hats", 100, 5),
        ];
        let page = ProductQuery::default().apply(catalog);
        assert_eq!(names(&page), vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_price_sorts() {
        let catalog = vec![
            product("b", "hats", 200, 1),
            product("a", "hats", 100, 1),
            product("c", "hats", 300, 1),
        ];
        let query = ProductQuery {
            sort: ProductSort::PriceAsc,
            ..ProductQuery::default()
        };
        assert_eq!(names(&query.apply(catalog.clone())), vec!["a", "b", "c"]);

        let query = ProductQuery {
            sort: ProductSort::PriceDesc,
            ..ProductQuery::default()
        };
        assert_eq!(names(&query.apply(catalog)), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_filters_combine() {
        let mut scarf = product("Chunky Scarf", "scarves", 900, 1);
        scarf.sizes = parse_tag_list("M, L");
        scarf.colors = parse_tag_list("red, blue");
        let hat = product("Beanie", "hats", 300, 1);
        let pricey = product("Cashmere Scarf", "scarves", 5000, 1);

        let query = ProductQuery {
            category: Some("scarves".to_string()),
            max_price: Some(Decimal::from(1000)),
            sizes: parse_tag_list("L"),
            colors: parse_tag_list("blue, red"),
            search: Some("  chunky ".to_string()),
            ..ProductQuery::default()
        };

        assert!(query.matches(&scarf));
        assert!(!query.matches(&hat));
        assert!(!query.matches(&pricey));

        let wants_green = ProductQuery {
            colors: parse_tag_list("green"),
            ..ProductQuery::default()
        };
        assert!(!wants_green.matches(&scarf));
    }

    #[test]
    fn test_related_excludes_self_and_other_categories() {
        let scarf = product("scarf", "scarves", 100, 1);
        let other_scarf = product("other", "scarves", 100, 1);
        let hat = product("hat", "hats", 100, 1);

        let query = ProductQuery::related_to(&scarf);
        let related = query.apply(vec![scarf.clone(), other_scarf, hat]);
        assert_eq!(names(&related), vec!["other"]);
    }

    #[test]
    fn test_featured_and_paging() {
        let mut catalog: Vec<Product> = (0..6)
            .map(|i| product(&format!("p{i}"), "hats", 100, i))
            .collect();
        for product in catalog.iter_mut().take(5) {
            product.is_featured = true;
        }

        let featured = ProductQuery::featured().apply(catalog.clone());
        assert_eq!(featured.len(), 4);
        assert!(featured.iter().all(|p| p.is_featured));

        let second_page = ProductQuery {
            offset: 4,
            ..ProductQuery::default().with_limit(4)
        }
        .apply(catalog);
        assert_eq!(names(&second_page), vec!["p4", "p5"]);
    }

    #[test]
    fn test_with_limit_clamps() {
        assert_eq!(ProductQuery::default().with_limit(0).limit, 1);
        assert_eq!(ProductQuery::default().with_limit(10_000).limit, 100);
    }

    #[test]
    fn test_draft_accepts_csv_or_list_tags() {
        let draft: ProductDraft = serde_json::from_str(
            r#"{"name":"Shawl","price":"1499.00","sizes":"S, M","colors":["ivory"," rose "]}"#,
        )
        .unwrap();
        assert_eq!(draft.sizes, parse_tag_list("M,S"));
        assert_eq!(draft.colors, parse_tag_list("ivory,rose"));
        assert!(!draft.is_featured);
    }

    #[test]
    fn test_draft_validation() {
        let draft = ProductDraft {
            name: "  Tote ".to_string(),
            description: String::new(),
            price: Decimal::from(10),
            image_url: String::new(),
            category: " bags ".to_string(),
            sizes: BTreeSet::new(),
            colors: BTreeSet::new(),
            is_featured: true,
        };
        let valid = draft.clone().validate().unwrap();
        assert_eq!(valid.name, "Tote");
        assert_eq!(valid.category, "bags");

        let nameless = ProductDraft {
            name: " ".to_string(),
            ..draft.clone()
        };
        assert_eq!(nameless.validate(), Err(ProductError::MissingName));

        let negative = ProductDraft {
            price: Decimal::from(-1),
            ..draft
        };
        assert_eq!(negative.validate(), Err(ProductError::NegativePrice));
    }

    #[test]
    fn test_validate_keeps_price_within_stored_range() {
        let draft = ProductDraft {
            name: "Tote".to_string(),
            description: String::new(),
            price: MAX_PRODUCT_PRICE,
            image_url: String::new(),
            category: "bags".to_string(),
            sizes: BTreeSet::new(),
            colors: BTreeSet::new(),
            is_featured: false,
        };
        assert!(draft.clone().validate().is_ok());

        let trailing_zeros = ProductDraft {
            price: Decimal::new(12_500, 3),
            ..draft.clone()
        };
        assert!(trailing_zeros.validate().is_ok());

        let too_precise = ProductDraft {
            price: Decimal::new(12_505, 3),
            ..draft.clone()
        };
        assert_eq!(too_precise.validate(), Err(ProductError::PriceTooPrecise));

        let too_large = ProductDraft {
            price: MAX_PRODUCT_PRICE + Decimal::new(1, 2),
            ..draft
        };
        assert_eq!(too_large.validate(), Err(ProductError::PriceTooLarge));
    }

    #[test]
    fn test_apply_keeps_identity_and_creation_time() {
        let mut existing = product("Old name", "hats", 100, 3);
        let id = existing.id;
        let created_at = existing.created_at;

        existing.apply(ProductDraft {
            name: "New name".to_string(),
            description: "Soft".to_string(),
            price: Decimal::from(150),
            image_url: String::new(),
            category: "caps".to_string(),
            sizes: BTreeSet::new(),
            colors: BTreeSet::new(),
            is_featured: true,
        });

        assert_eq!(existing.id, id);
        assert_eq!(existing.created_at, created_at);
        assert_eq!(existing.name, "New name");
        assert!(existing.is_featured);
    }

    #[test]
    fn test_facets() {
        let mut a = product("a", "hats", 1, 1);
        a.sizes = parse_tag_list("S");
        let mut b = product("b", "scarves", 1, 1);
        b.colors = parse_tag_list("blue");

        let facets = ProductFacets::collect(&[a, b]);
        assert_eq!(facets.categories, parse_tag_list("hats, scarves"));
        assert_eq!(facets.sizes, parse_tag_list("S, M"));
        assert_eq!(facets.colors, parse_tag_list("red, blue"));
    }
}
