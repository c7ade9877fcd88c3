//! Catalog hierarchy and lifecycle engine.
//!
//! `Catalog` owns the rules for the four entity levels: identity assignment on create,
//! image upload before persistence, price derivation on product writes, and the
//! cascade protocol on delete. It talks to two collaborators only: a `CatalogStore`
//! and an `ObjectStore` (through `AssetBinding`).
//!
//! Parents are never followed lazily. Operations that need ancestry load it up front
//! into a lineage value and work on that snapshot.

pub mod assets;
pub mod brands;
pub mod cascade;
pub mod categories;
pub mod error;
pub mod identity;
pub mod model;
pub mod pricing;
pub mod products;
pub mod sub_categories;

pub use assets::{AssetBinding, AssetCleanup, AssetConfig, AssetPath};
pub use cascade::{DeleteReport, IntegrityGap};
pub use error::CatalogError;
pub use identity::{IdentityConfig, IdentityGenerator};

use crate::{objects::ObjectStore, store::CatalogStore};
use model::{Brand, Category, Lookup, Product, SubCategory};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn CatalogStore>,
    assets: AssetBinding,
    identity: IdentityGenerator,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("assets", &self.assets)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

/// A sub-category together with its category.
#[derive(Debug, Clone)]
pub struct SubCategoryLineage {
    pub category: Category,
    pub sub_category: SubCategory,
}

/// A brand together with its category and sub-category.
#[derive(Debug, Clone)]
pub struct BrandLineage {
    pub category: Category,
    pub sub_category: SubCategory,
    pub brand: Brand,
}

impl Catalog {
    #[must_use]
    pub fn new(
        store: Arc<dyn CatalogStore>,
        objects: Arc<dyn ObjectStore>,
        assets: AssetConfig,
        identity: IdentityConfig,
    ) -> Self {
        Self {
            store,
            assets: AssetBinding::new(objects, assets),
            identity: IdentityGenerator::new(identity),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn CatalogStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn assets(&self) -> &AssetBinding {
        &self.assets
    }

    /// Best-effort removal of assets uploaded for a record that was never persisted.
    async fn discard_uploads(&self, folder: &AssetPath) {
        if let Err(err) = self.assets.delete_tree(folder).await {
            warn!(folder = %folder, error = %err, "orphaned assets left after failed create");
        }
    }

    fn category_folder(&self, category: &Category) -> AssetPath {
        self.assets.root().category(&category.short_id)
    }

    async fn require_category(&self, id: Uuid) -> Result<Category> {
        self.store
            .category_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category not found"))
    }

    async fn require_sub_category(&self, id: Uuid) -> Result<SubCategory> {
        self.store
            .sub_category_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("SubCategory not found"))
    }

    async fn require_brand(&self, id: Uuid) -> Result<Brand> {
        self.store
            .brand_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Brand not found"))
    }

    async fn require_product(&self, id: Uuid) -> Result<Product> {
        self.store
            .product_by_id(id)
            .await?
            .ok_or_else(|| CatalogError::not_found("Product not found"))
    }

    /// Loads the category of `sub_category`.
    async fn sub_category_lineage(&self, sub_category: SubCategory) -> Result<SubCategoryLineage> {
        let category = self.require_category(sub_category.category_id).await?;
        Ok(SubCategoryLineage {
            category,
            sub_category,
        })
    }

    /// Loads both parents of `brand`.
    async fn brand_lineage(&self, brand: Brand) -> Result<BrandLineage> {
        let category = self.require_category(brand.category_id).await?;
        let sub_category = self.require_sub_category(brand.sub_category_id).await?;
        Ok(BrandLineage {
            category,
            sub_category,
            brand,
        })
    }

    /// Resolves the ancestry named by explicit parent ids, checking that each level
    /// belongs to the one above it.
    async fn resolve_brand_lineage(
        &self,
        category_id: Uuid,
        sub_category_id: Uuid,
        brand_id: Uuid,
    ) -> Result<BrandLineage> {
        let category = self.require_category(category_id).await?;
        let sub_category = self.require_sub_category(sub_category_id).await?;
        if sub_category.category_id != category.id {
            return Err(CatalogError::validation(
                "SubCategory does not belong to the given category",
            ));
        }
        let brand = self.require_brand(brand_id).await?;
        if brand.category_id != category.id || brand.sub_category_id != sub_category.id {
            return Err(CatalogError::validation(
                "Brand does not belong to the given category and sub-category",
            ));
        }
        Ok(BrandLineage {
            category,
            sub_category,
            brand,
        })
    }

    /// Folder of a product, derived from its stored parent ids.
    async fn product_folder(&self, product: &Product) -> Result<AssetPath> {
        let category = self.require_category(product.category_id).await?;
        let sub_category = self.require_sub_category(product.sub_category_id).await?;
        let brand = self.require_brand(product.brand_id).await?;
        Ok(BrandLineage {
            category,
            sub_category,
            brand,
        }
        .folder(&self.assets.root())
        .product(&product.short_id))
    }
}

impl SubCategoryLineage {
    #[must_use]
    pub fn folder(&self, root: &AssetPath) -> AssetPath {
        root.category(&self.category.short_id)
            .sub_category(&self.sub_category.short_id)
    }
}

impl BrandLineage {
    #[must_use]
    pub fn folder(&self, root: &AssetPath) -> AssetPath {
        root.category(&self.category.short_id)
            .sub_category(&self.sub_category.short_id)
            .brand(&self.brand.short_id)
    }
}

/// Rejects lookups with no filter set.
pub(crate) fn require_filter(lookup: &Lookup) -> Result<()> {
    if lookup.is_empty() {
        return Err(CatalogError::validation(
            "Provide at least one of id, name or slug",
        ));
    }
    Ok(())
}

/// Trims a display name and checks it yields a usable slug.
pub(crate) fn clean_name(name: &str, field: &str) -> Result<(String, String)> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CatalogError::validation(format!("{field} is required")));
    }
    let slug = identity::slugify(name);
    if slug.is_empty() {
        return Err(CatalogError::validation(format!(
            "{field} must contain at least one letter or digit"
        )));
    }
    Ok((name.to_string(), slug))
}
