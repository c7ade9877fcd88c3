use super::{
    clean_name,
    model::{Lookup, SubCategory},
    require_filter, Catalog, CatalogError, Result,
};
use crate::objects::StagedFile;
use tracing::{info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
pub struct SubCategoryUpdate {
    pub name: Option<String>,
}

impl Catalog {
    /// Creates a sub-category under `category_id`; its folder nests inside the
    /// category folder.
    ///
    /// # Errors
    /// `NotFound` when the category does not exist (checked before anything is
    /// uploaded), `Validation` for a missing name or image, `Upload`/`Store` as for
    /// categories.
    #[instrument(skip(self, image))]
    pub async fn create_sub_category(
        &self,
        category_id: Uuid,
        name: &str,
        image: Option<&StagedFile>,
    ) -> Result<SubCategory> {
        let category = self.require_category(category_id).await?;
        let (name, slug) = clean_name(name, "Name")?;
        let image = image.ok_or_else(|| CatalogError::validation("Please upload an image"))?;

        let short_id = self.identity.new_short_id();
        let folder = self.category_folder(&category).sub_category(&short_id);
        let image = self.assets.store(image, &folder).await?;

        let sub_category = SubCategory {
            id: Uuid::new_v4(),
            name,
            slug,
            short_id,
            image,
            category_id: category.id,
        };
        if let Err(err) = self.store.insert_sub_category(&sub_category).await {
            self.discard_uploads(&folder).await;
            return Err(err.into());
        }

        info!(id = %sub_category.id, category = %category.id, "sub-category created");
        Ok(sub_category)
    }

    /// # Errors
    /// `Validation` for an empty lookup, `NotFound` when nothing matches.
    #[instrument(skip(self))]
    pub async fn find_sub_category(&self, lookup: &Lookup) -> Result<SubCategory> {
        require_filter(lookup)?;
        self.store
            .find_sub_category(lookup)
            .await?
            .ok_or_else(|| CatalogError::not_found("SubCategory not found"))
    }

    /// # Errors
    /// `NotFound` when the sub-category (or, for an image replacement, its category) is
    /// gone; otherwise as `update_category`.
    #[instrument(skip(self, update, image))]
    pub async fn update_sub_category(
        &self,
        id: Uuid,
        update: SubCategoryUpdate,
        image: Option<&StagedFile>,
    ) -> Result<SubCategory> {
        let mut sub_category = self.require_sub_category(id).await?;

        if let Some(name) = update.name {
            let (name, slug) = clean_name(&name, "Name")?;
            sub_category.name = name;
            sub_category.slug = slug;
        }

        if let Some(image) = image {
            let lineage = self.sub_category_lineage(sub_category).await?;
            let folder = lineage.folder(&self.assets.root());
            sub_category = lineage.sub_category;
            sub_category.image = self
                .assets
                .replace(image, &folder, &sub_category.image.storage_key)
                .await?;
        }

        if !self.store.save_sub_category(&sub_category).await? {
            return Err(CatalogError::not_found("SubCategory not found"));
        }
        info!(id = %sub_category.id, "sub-category updated");
        Ok(sub_category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::testing::{memory_catalog, png};

    #[tokio::test]
    async fn missing_category_is_checked_before_upload() {
        let (catalog, store, objects) = memory_catalog();
        let result = catalog
            .create_sub_category(Uuid::new_v4(), "Soundbars", Some(&png(vec![1])))
            .await;
        assert!(matches!(result, Err(CatalogError::NotFound(_))));
        assert_eq!(objects.upload_count(), 0);
        assert!(store.sub_categories().await.is_empty());
    }

    #[tokio::test]
    async fn folder_nests_under_category() {
        let (catalog, _, _) = memory_catalog();
        let Ok(category) = catalog.create_category("Audio", Some(&png(vec![1]))).await else {
            panic!("category");
        };
        let Ok(sub) = catalog
            .create_sub_category(category.id, "Soundbars", Some(&png(vec![2])))
            .await
        else {
            panic!("sub-category");
        };
        let prefix = format!(
            "catalog/Categories/{}/SubCategories/{}/",
            category.short_id, sub.short_id
        );
        assert!(sub.image.storage_key.starts_with(&prefix));
        assert_eq!(sub.category_id, category.id);
    }

    #[tokio::test]
    async fn image_replace_under_category_folder() {
        let (catalog, _, objects) = memory_catalog();
        let Ok(category) = catalog.create_category("Audio", Some(&png(vec![1]))).await else {
            panic!("category");
        };
        let Ok(sub) = catalog
            .create_sub_category(category.id, "Soundbars", Some(&png(vec![2])))
            .await
        else {
            panic!("sub-category");
        };
        let update = SubCategoryUpdate {
            name: Some("Sound Bars".to_string()),
        };
        let Ok(updated) = catalog
            .update_sub_category(sub.id, update, Some(&png(vec![3])))
            .await
        else {
            panic!("update");
        };
        assert_eq!(updated.slug, "sound_bars");
        assert_eq!(updated.image.storage_key, sub.image.storage_key);
        assert_eq!(objects.keys().await.len(), 2);
    }
}
