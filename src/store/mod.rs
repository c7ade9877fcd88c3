//! Persistent store for the catalog hierarchy.
//!
//! `CatalogStore` is the document-level interface the core relies on: single-record
//! create/find/save/delete, delete-many keyed by a parent id, and the product listing.
//! Each call is atomic on its own; nothing here spans several records in one transaction.
//!
//! Two implementations exist: `PgCatalogStore` (PostgreSQL via `sqlx`) and
//! `MemoryCatalogStore` (tests and local experiments).

pub mod memory;
pub mod postgres;

pub use memory::MemoryCatalogStore;
pub use postgres::PgCatalogStore;

use crate::catalog::model::{
    Brand, Category, Lookup, Page, ParentRef, Product, ProductQuery, ProductSummary, SubCategory,
};
use std::{future::Future, pin::Pin};
use thiserror::Error;
use uuid::Uuid;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub trait CatalogStore: Send + Sync {
    fn ping(&self) -> StoreFuture<'_, ()>;

    fn insert_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, ()>;
    fn find_category<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Category>>;
    /// Returns `false` when no row with the category's id exists.
    fn save_category<'a>(&'a self, category: &'a Category) -> StoreFuture<'a, bool>;
    /// Returns `false` when no row with `id` existed.
    fn delete_category(&self, id: Uuid) -> StoreFuture<'_, bool>;

    fn insert_sub_category<'a>(&'a self, sub_category: &'a SubCategory) -> StoreFuture<'a, ()>;
    fn find_sub_category<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<SubCategory>>;
    fn save_sub_category<'a>(&'a self, sub_category: &'a SubCategory) -> StoreFuture<'a, bool>;
    fn delete_sub_category(&self, id: Uuid) -> StoreFuture<'_, bool>;
    fn delete_sub_categories_by_category(&self, category_id: Uuid) -> StoreFuture<'_, u64>;

    fn insert_brand<'a>(&'a self, brand: &'a Brand) -> StoreFuture<'a, ()>;
    fn find_brand<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Brand>>;
    fn save_brand<'a>(&'a self, brand: &'a Brand) -> StoreFuture<'a, bool>;
    fn delete_brand(&self, id: Uuid) -> StoreFuture<'_, bool>;
    fn delete_brands_by_category(&self, category_id: Uuid) -> StoreFuture<'_, u64>;
    fn delete_brands_by_sub_category(&self, sub_category_id: Uuid) -> StoreFuture<'_, u64>;

    fn insert_product<'a>(&'a self, product: &'a Product) -> StoreFuture<'a, ()>;
    /// `lookup.name` matches the product title.
    fn find_product<'a>(&'a self, lookup: &'a Lookup) -> StoreFuture<'a, Option<Product>>;
    fn save_product<'a>(&'a self, product: &'a Product) -> StoreFuture<'a, bool>;
    fn delete_product(&self, id: Uuid) -> StoreFuture<'_, bool>;
    /// Products with `applied_price >= query.min_applied_price`, ascending by applied price.
    fn list_products(&self, query: ProductQuery) -> StoreFuture<'_, Page<ProductSummary>>;
    fn count_products_referencing(&self, parent: ParentRef) -> StoreFuture<'_, u64>;

    fn category_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<Category>> {
        Box::pin(async move { self.find_category(&Lookup::by_id(id)).await })
    }

    fn sub_category_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<SubCategory>> {
        Box::pin(async move { self.find_sub_category(&Lookup::by_id(id)).await })
    }

    fn brand_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<Brand>> {
        Box::pin(async move { self.find_brand(&Lookup::by_id(id)).await })
    }

    fn product_by_id(&self, id: Uuid) -> StoreFuture<'_, Option<Product>> {
        Box::pin(async move { self.find_product(&Lookup::by_id(id)).await })
    }
}
