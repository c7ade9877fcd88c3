//! Cascade controller.
//!
//! Every delete runs the same stages in order:
//!
//! 1. remove the target record (`NotFound` here ends the request),
//! 2. `delete_tree` on the target's asset folder,
//! 3. delete-many of dependent sub-categories and brands keyed by parent id.
//!
//! Stage 1 is the only fatal one. Failures in stages 2 and 3 are collected into the
//! `DeleteReport` and logged; nothing is rolled back. Children's assets need no
//! per-child cleanup because they live under the parent's folder.
//!
//! Products are never removed by a parent delete. Any product still pointing at the
//! deleted parent is reported as an `IntegrityGap`.

use super::{
    assets::{AssetCleanup, AssetPath},
    model::{EntityKind, ParentRef},
    Catalog, CatalogError, Result,
};
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Records left pointing at a parent that no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityGap {
    pub parent: EntityKind,
    pub parent_id: Uuid,
    pub orphaned: EntityKind,
    pub count: u64,
}

/// Everything a delete did besides removing the target record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub kind: EntityKind,
    pub id: Uuid,
    /// Asset folder of the deleted entity, when it could be derived.
    pub folder: Option<String>,
    pub assets: AssetCleanup,
    pub sub_categories_removed: u64,
    pub brands_removed: u64,
    /// Non-fatal failures of the child cascade and gap accounting.
    pub failures: Vec<String>,
    pub integrity_gaps: Vec<IntegrityGap>,
}

impl DeleteReport {
    fn new(kind: EntityKind, id: Uuid) -> Self {
        Self {
            kind,
            id,
            folder: None,
            assets: AssetCleanup::Skipped {
                message: "asset folder not derived".to_string(),
            },
            sub_categories_removed: 0,
            brands_removed: 0,
            failures: Vec::new(),
            integrity_gaps: Vec::new(),
        }
    }

    /// `true` when every stage after the record delete succeeded and no gap was found.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        matches!(self.assets, AssetCleanup::Removed { .. })
            && self.failures.is_empty()
            && self.integrity_gaps.is_empty()
    }
}

impl Catalog {
    async fn clean_assets(&self, report: &mut DeleteReport, folder: Result<AssetPath>) {
        match folder {
            Ok(folder) => {
                report.assets = self.assets.cleanup(&folder).await;
                if let AssetCleanup::Failed { message } = &report.assets {
                    warn!(folder = %folder, error = %message, "asset cleanup failed after delete");
                }
                report.folder = Some(folder.to_string());
            }
            Err(err) => {
                warn!(kind = %report.kind, id = %report.id, error = %err, "asset folder unresolved, skipping cleanup");
                report.assets = AssetCleanup::Skipped {
                    message: err.to_string(),
                };
            }
        }
    }

    async fn record_product_gap(&self, report: &mut DeleteReport, parent: ParentRef) {
        match self.store.count_products_referencing(parent).await {
            Ok(0) => {}
            Ok(count) => {
                warn!(
                    parent = %report.kind,
                    parent_id = %report.id,
                    count,
                    "products left referencing a deleted parent"
                );
                report.integrity_gaps.push(IntegrityGap {
                    parent: report.kind,
                    parent_id: report.id,
                    orphaned: EntityKind::Product,
                    count,
                });
            }
            Err(err) => {
                warn!(error = %err, "could not count orphaned products");
                report
                    .failures
                    .push(format!("counting orphaned products failed: {err}"));
            }
        }
    }

    /// Deletes a category, its asset tree, its sub-categories and, when any
    /// sub-categories were removed, its brands.
    ///
    /// # Errors
    /// `NotFound` when the category does not exist. Later failures are reported.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<DeleteReport> {
        let category = self.require_category(id).await?;
        if !self.store.delete_category(id).await? {
            return Err(CatalogError::not_found("Category not found"));
        }

        let mut report = DeleteReport::new(EntityKind::Category, id);
        self.clean_assets(&mut report, Ok(self.category_folder(&category)))
            .await;

        match self.store.delete_sub_categories_by_category(id).await {
            Ok(removed) => report.sub_categories_removed = removed,
            Err(err) => {
                warn!(error = %err, "sub-category cascade failed");
                report
                    .failures
                    .push(format!("deleting sub-categories failed: {err}"));
            }
        }
        if report.sub_categories_removed > 0 {
            match self.store.delete_brands_by_category(id).await {
                Ok(removed) => report.brands_removed = removed,
                Err(err) => {
                    warn!(error = %err, "brand cascade failed");
                    report.failures.push(format!("deleting brands failed: {err}"));
                }
            }
        }

        self.record_product_gap(&mut report, ParentRef::Category(id))
            .await;
        info!(
            sub_categories = report.sub_categories_removed,
            brands = report.brands_removed,
            "category deleted"
        );
        Ok(report)
    }

    /// Deletes a sub-category, its asset tree and its brands.
    ///
    /// # Errors
    /// `NotFound` when the sub-category does not exist. Later failures are reported.
    #[instrument(skip(self))]
    pub async fn delete_sub_category(&self, id: Uuid) -> Result<DeleteReport> {
        let sub_category = self.require_sub_category(id).await?;
        if !self.store.delete_sub_category(id).await? {
            return Err(CatalogError::not_found("SubCategory not found"));
        }

        let mut report = DeleteReport::new(EntityKind::SubCategory, id);
        let folder = self
            .sub_category_lineage(sub_category)
            .await
            .map(|lineage| lineage.folder(&self.assets.root()));
        self.clean_assets(&mut report, folder).await;

        match self.store.delete_brands_by_sub_category(id).await {
            Ok(removed) => report.brands_removed = removed,
            Err(err) => {
                warn!(error = %err, "brand cascade failed");
                report.failures.push(format!("deleting brands failed: {err}"));
            }
        }

        self.record_product_gap(&mut report, ParentRef::SubCategory(id))
            .await;
        info!(brands = report.brands_removed, "sub-category deleted");
        Ok(report)
    }

    /// Deletes a brand and its asset tree. Nothing else cascades.
    ///
    /// # Errors
    /// `NotFound` when the brand does not exist. Later failures are reported.
    #[instrument(skip(self))]
    pub async fn delete_brand(&self, id: Uuid) -> Result<DeleteReport> {
        let brand = self.require_brand(id).await?;
        if !self.store.delete_brand(id).await? {
            return Err(CatalogError::not_found("Brand not found"));
        }

        let mut report = DeleteReport::new(EntityKind::Brand, id);
        let folder = self
            .brand_lineage(brand)
            .await
            .map(|lineage| lineage.folder(&self.assets.root()));
        self.clean_assets(&mut report, folder).await;

        self.record_product_gap(&mut report, ParentRef::Brand(id))
            .await;
        info!("brand deleted");
        Ok(report)
    }

    /// Deletes a product and its image folder.
    ///
    /// # Errors
    /// `NotFound` when the product does not exist. Asset cleanup failures are reported.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<DeleteReport> {
        let product = self.require_product(id).await?;
        if !self.store.delete_product(id).await? {
            return Err(CatalogError::not_found("Product not found"));
        }

        let mut report = DeleteReport::new(EntityKind::Product, id);
        let folder = self.product_folder(&product).await;
        self.clean_assets(&mut report, folder).await;
        info!("product deleted");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        model::{Brand, Category, SubCategory},
        products::{NewProduct, ProductParents},
        testing::{memory_catalog, png},
    };
    use rust_decimal::Decimal;

    async fn tree(catalog: &Catalog) -> (Category, SubCategory, Brand) {
        let Ok(category) = catalog.create_category("Video", Some(&png(vec![1]))).await else {
            panic!("category");
        };
        let Ok(sub) = catalog
            .create_sub_category(category.id, "TVs", Some(&png(vec![1])))
            .await
        else {
            panic!("sub-category");
        };
        let Ok(brand) = catalog
            .create_brand(category.id, sub.id, "Acme", Some(&png(vec![1])))
            .await
        else {
            panic!("brand");
        };
        (category, sub, brand)
    }

    #[tokio::test]
    async fn delete_missing_category_is_not_found() {
        let (catalog, _, _) = memory_catalog();
        let result = catalog.delete_category(Uuid::new_v4()).await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
    }

    #[tokio::test]
    async fn sub_category_delete_removes_brands_and_assets() {
        let (catalog, store, objects) = memory_catalog();
        let (category, sub, _) = tree(&catalog).await;

        let Ok(report) = catalog.delete_sub_category(sub.id).await else {
            panic!("delete");
        };
        assert_eq!(report.brands_removed, 1);
        assert!(report.is_clean());
        assert!(store.brands().await.is_empty());
        assert_eq!(store.categories().await.len(), 1);

        let sub_folder = catalog
            .assets()
            .root()
            .category(&category.short_id)
            .sub_category(&sub.short_id);
        assert_eq!(report.folder.as_deref(), Some(sub_folder.as_str()));
        assert!(objects.keys_under(sub_folder.as_str()).await.is_empty());
        assert_eq!(objects.keys().await.len(), 1);
    }

    #[tokio::test]
    async fn storage_failure_does_not_undo_delete() {
        let (catalog, store, objects) = memory_catalog();
        let (category, _, _) = tree(&catalog).await;
        objects.fail_deletes(true);

        let Ok(report) = catalog.delete_category(category.id).await else {
            panic!("delete");
        };
        assert!(matches!(report.assets, AssetCleanup::Failed { .. }));
        assert!(!report.is_clean());
        assert!(store.categories().await.is_empty());
        assert_eq!(report.sub_categories_removed, 1);
        assert_eq!(report.brands_removed, 1);
    }

    #[tokio::test]
    async fn brand_delete_reports_orphaned_products() {
        let (catalog, store, _) = memory_catalog();
        let (category, sub, brand) = tree(&catalog).await;
        let product = NewProduct {
            title: "OLED".to_string(),
            price: Decimal::from(100),
            ..NewProduct::default()
        };
        let parents = ProductParents {
            category_id: category.id,
            sub_category_id: sub.id,
            brand_id: brand.id,
        };
        assert!(catalog
            .create_product(parents, product, &[png(vec![1])])
            .await
            .is_ok());

        let Ok(report) = catalog.delete_brand(brand.id).await else {
            panic!("delete");
        };
        assert_eq!(
            report.integrity_gaps,
            vec![IntegrityGap {
                parent: EntityKind::Brand,
                parent_id: brand.id,
                orphaned: EntityKind::Product,
                count: 1,
            }]
        );
        assert_eq!(store.products().await.len(), 1);
    }

    #[tokio::test]
    async fn product_delete_removes_its_folder_only() {
        let (catalog, store, objects) = memory_catalog();
        let (category, sub, brand) = tree(&catalog).await;
        let parents = ProductParents {
            category_id: category.id,
            sub_category_id: sub.id,
            brand_id: brand.id,
        };
        let product = NewProduct {
            title: "OLED".to_string(),
            price: Decimal::from(100),
            ..NewProduct::default()
        };
        let Ok(product) = catalog
            .create_product(parents, product, &[png(vec![1]), png(vec![2])])
            .await
        else {
            panic!("product");
        };
        let before = objects.keys().await.len();

        let Ok(report) = catalog.delete_product(product.id).await else {
            panic!("delete");
        };
        assert_eq!(report.assets, AssetCleanup::Removed { objects: 2 });
        assert_eq!(objects.keys().await.len(), before - 2);
        assert!(store.products().await.is_empty());
        assert_eq!(store.brands().await.len(), 1);
    }

    #[tokio::test]
    async fn orphaned_product_delete_skips_assets() {
        let (catalog, store, _) = memory_catalog();
        let (category, sub, brand) = tree(&catalog).await;
        let parents = ProductParents {
            category_id: category.id,
            sub_category_id: sub.id,
            brand_id: brand.id,
        };
        let product = NewProduct {
            title: "OLED".to_string(),
            price: Decimal::from(100),
            ..NewProduct::default()
        };
        let Ok(product) = catalog
            .create_product(parents, product, &[png(vec![1])])
            .await
        else {
            panic!("product");
        };
        assert!(catalog.delete_brand(brand.id).await.is_ok());

        let Ok(report) = catalog.delete_product(product.id).await else {
            panic!("delete");
        };
        assert!(matches!(report.assets, AssetCleanup::Skipped { .. }));
        assert!(report.folder.is_none());
        assert!(store.products().await.is_empty());
    }
}
