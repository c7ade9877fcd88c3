//! Entity snapshots for the catalog hierarchy.
//!
//! These are plain values: parents are referenced by id only, and any parent data
//! needed by an operation is resolved explicitly into a lineage struct first.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use utoipa::ToSchema;
use uuid::Uuid;

/// Pointer into the external object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssetRef {
    pub remote_url: String,
    pub storage_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Category,
    SubCategory,
    Brand,
    Product,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::SubCategory => "sub_category",
            Self::Brand => "brand",
            Self::Product => "product",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub short_id: String,
    pub image: AssetRef,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubCategory {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub short_id: String,
    pub image: AssetRef,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub short_id: String,
    pub image: AssetRef,
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    Percentage,
    Fixed,
}

impl DiscountType {
    /// Returns the value persisted in the `discount_type` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Percentage => "percentage",
            Self::Fixed => "fixed",
        }
    }

    /// Parses the persisted/form representation. Unknown values yield `None`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "percentage" => Some(Self::Percentage),
            "fixed" => Some(Self::Fixed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Discount {
    #[schema(value_type = String)]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: DiscountType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub overview: String,
    pub badge: Option<String>,
    /// Stored and returned verbatim.
    #[schema(value_type = Object)]
    pub specs: Map<String, Value>,
    pub stock: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub discount: Option<Discount>,
    #[schema(value_type = String)]
    pub applied_price: Decimal,
    pub images: Vec<AssetRef>,
    pub short_id: String,
    pub category_id: Uuid,
    pub sub_category_id: Uuid,
    pub brand_id: Uuid,
}

/// Listing projection of a product: no images, specs, or parent references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub overview: String,
    pub badge: Option<String>,
    pub stock: i32,
    #[schema(value_type = String)]
    pub price: Decimal,
    pub discount: Option<Discount>,
    #[schema(value_type = String)]
    pub applied_price: Decimal,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id,
            title: product.title.clone(),
            slug: product.slug.clone(),
            overview: product.overview.clone(),
            badge: product.badge.clone(),
            stock: product.stock,
            price: product.price,
            discount: product.discount,
            applied_price: product.applied_price,
        }
    }
}

/// Equality filter used by the single-record lookups. Set fields are AND-combined.
/// For products `name` matches the title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct Lookup {
    pub id: Option<Uuid>,
    pub name: Option<String>,
    pub slug: Option<String>,
}

impl Lookup {
    #[must_use]
    pub fn by_id(id: Uuid) -> Self {
        Self {
            id: Some(id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_slug(slug: impl Into<String>) -> Self {
        Self {
            slug: Some(slug.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.id.is_none() && self.name.is_none() && self.slug.is_none()
    }
}

/// Parent reference used when counting products left behind by a cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentRef {
    Category(Uuid),
    SubCategory(Uuid),
    Brand(Uuid),
}

/// Paginated listing request. `min_applied_price` is inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProductQuery {
    pub min_applied_price: Decimal,
    pub page: u32,
    pub limit: u32,
}

impl ProductQuery {
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub docs: Vec<T>,
    pub total_docs: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub has_prev_page: bool,
    pub has_next_page: bool,
    pub prev_page: Option<u32>,
    pub next_page: Option<u32>,
}

impl<T> Page<T> {
    /// Builds page metadata for `docs` fetched at `page`/`limit` out of `total_docs`.
    #[must_use]
    pub fn new(docs: Vec<T>, total_docs: u64, page: u32, limit: u32) -> Self {
        let total_pages = if limit == 0 {
            0
        } else {
            total_docs.div_ceil(u64::from(limit))
        };
        let has_prev_page = page > 1;
        let has_next_page = u64::from(page) < total_pages;
        Self {
            docs,
            total_docs,
            limit,
            page,
            total_pages,
            has_prev_page,
            has_next_page,
            prev_page: has_prev_page.then(|| page - 1),
            next_page: has_next_page.then(|| page + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_metadata() {
        let page = Page::new(vec![1, 2], 7, 2, 2);
        assert_eq!(page.total_pages, 4);
        assert!(page.has_prev_page);
        assert!(page.has_next_page);
        assert_eq!(page.prev_page, Some(1));
        assert_eq!(page.next_page, Some(3));

        let last = Page::new(vec![7], 7, 4, 2);
        assert!(!last.has_next_page);
        assert_eq!(last.next_page, None);

        let empty: Page<u8> = Page::new(Vec::new(), 0, 1, 5);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_prev_page);
        assert!(!empty.has_next_page);
    }

    #[test]
    fn query_offset() {
        let query = ProductQuery {
            min_applied_price: Decimal::ZERO,
            page: 3,
            limit: 5,
        };
        assert_eq!(query.offset(), 10);
    }

    #[test]
    fn discount_type_parse() {
        assert_eq!(DiscountType::parse("Percentage"), Some(DiscountType::Percentage));
        assert_eq!(DiscountType::parse(" fixed "), Some(DiscountType::Fixed));
        assert_eq!(DiscountType::parse("bogo"), None);
    }

    #[test]
    fn discount_serializes_type_field() {
        let discount = Discount {
            amount: Decimal::from(10),
            kind: DiscountType::Percentage,
        };
        let value = serde_json::to_value(discount).unwrap_or_default();
        assert_eq!(value["type"], "percentage");
    }
}
