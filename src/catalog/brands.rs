use super::{
    clean_name,
    model::{Brand, Lookup},
    require_filter, Catalog, CatalogError, Result, SubCategoryLineage,
};
use crate::objects::StagedFile;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct BrandUpdate {
    pub name: Option<String>,
}

impl Catalog {
    /// Creates a brand under a category and one of its sub-categories.
    ///
    /// # Errors
    /// `NotFound` when either parent is missing, `Validation` when the sub-category
    /// belongs to another category or the name/image is missing. Nothing is uploaded
    /// unless both parents resolve consistently.
    #[instrument(skip(self, image))]
    pub async fn create_brand(
        &self,
        category_id: Uuid,
        sub_category_id: Uuid,
        name: &str,
        image: Option<&StagedFile>,
    ) -> Result<Brand> {
        let category = self.require_category(category_id).await?;
        let sub_category = self.require_sub_category(sub_category_id).await?;
        if sub_category.category_id != category.id {
            return Err(CatalogError::validation(
                "SubCategory does not belong to the given category",
            ));
        }
        let (name, slug) = clean_name(name, "Name")?;
        let image = image.ok_or_else(|| CatalogError::validation("Please upload an image"))?;

        let lineage = SubCategoryLineage {
            category,
            sub_category,
        };
        let short_id = self.identity.new_short_id();
        let folder = lineage.folder(&self.assets.root()).brand(&short_id);
        let image = self.assets.store(image, &folder).await?;

        let brand = Brand {
            id: Uuid::new_v4(),
            name,
            slug,
            short_id,
            image,
            category_id: lineage.category.id,
            sub_category_id: lineage.sub_category.id,
        };
        if let Err(err) = self.store.insert_brand(&brand).await {
            self.discard_uploads(&folder).await;
            return Err(err.into());
        }

        info!(id = %brand.id, sub_category = %brand.sub_category_id, "brand created");
        Ok(brand)
    }

    /// # Errors
    /// `Validation` for an empty lookup, `NotFound` when nothing matches.
    #[instrument(skip(self))]
    pub async fn find_brand(&self, lookup: &Lookup) -> Result<Brand> {
        require_filter(lookup)?;
        self.store
            .find_brand(lookup)
            .await?
            .ok_or_else(|| CatalogError::not_found("Brand not found"))
    }

    /// # Errors
    /// `NotFound` when the brand (or, for an image replacement, a parent) is gone;
    /// otherwise as `update_category`.
    #[instrument(skip(self, update, image))]
    pub async fn update_brand(
        &self,
        id: Uuid,
        update: BrandUpdate,
        image: Option<&StagedFile>,
    ) -> Result<Brand> {
        let mut brand = self.require_brand(id).await?;

        if let Some(name) = update.name {
            let (name, slug) = clean_name(&name, "Name")?;
            brand.name = name;
            brand.slug = slug;
        }

        if let Some(image) = image {
            let lineage = self.brand_lineage(brand).await?;
            let folder = lineage.folder(&self.assets.root());
            brand = lineage.brand;
            brand.image = self
                .assets
                .replace(image, &folder, &brand.image.storage_key)
                .await?;
        }

        if !self.store.save_brand(&brand).await? {
            return Err(CatalogError::not_found("Brand not found"));
        }
        info!(id = %brand.id, "brand updated");
        Ok(brand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{memory_catalog, png};

    #[tokio::test]
    async fn mismatched_parents_upload_nothing() {
        let (catalog, store, objects) = memory_catalog();
        let (Ok(audio), Ok(video)) = (
            catalog.create_category("Audio", Some(&png(vec![1]))).await,
            catalog.create_category("Video", Some(&png(vec![1]))).await,
        ) else {
            panic!("categories");
        };
        let Ok(soundbars) = catalog
            .create_sub_category(audio.id, "Soundbars", Some(&png(vec![1])))
            .await
        else {
            panic!("sub-category");
        };
        let uploads = objects.upload_count();

        let result = catalog
            .create_brand(video.id, soundbars.id, "Sonos", Some(&png(vec![1])))
            .await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
        assert_eq!(objects.upload_count(), uploads);
        assert!(store.brands().await.is_empty());

        let missing = catalog
            .create_brand(audio.id, Uuid::new_v4(), "Sonos", Some(&png(vec![1])))
            .await;
        assert!(matches!(missing, Err(CatalogError::NotFound(_))));
        assert_eq!(objects.upload_count(), uploads);
    }

    #[tokio::test]
    async fn brand_folder_nests_under_sub_category() {
        let (catalog, _, _) = memory_catalog();
        let Ok(audio) = catalog.create_category("Audio", Some(&png(vec![1]))).await else {
            panic!("category");
        };
        let Ok(soundbars) = catalog
            .create_sub_category(audio.id, "Soundbars", Some(&png(vec![1])))
            .await
        else {
            panic!("sub-category");
        };
        let Ok(brand) = catalog
            .create_brand(audio.id, soundbars.id, "Sonos", Some(&png(vec![1])))
            .await
        else {
            panic!("brand");
        };
        let prefix = format!(
            "catalog/Categories/{}/SubCategories/{}/Brands/{}/",
            audio.short_id, soundbars.short_id, brand.short_id
        );
        assert!(brand.image.storage_key.starts_with(&prefix));

        let Ok(updated) = catalog
            .update_brand(brand.id, BrandUpdate::default(), Some(&png(vec![5])))
            .await
        else {
            panic!("update");
        };
        assert_eq!(updated.image.storage_key, brand.image.storage_key);
        assert_eq!(updated.name, "Sonos");
    }
}
