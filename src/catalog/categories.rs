use super::{
    clean_name,
    model::{Category, Lookup},
    require_filter, Catalog, CatalogError, Result,
};
use crate::objects::StagedFile;
use tracing::{info, instrument};
use uuid::Uuid;

/// Fields accepted by a category update; `None` leaves the stored value.
#[derive(Debug, Clone, Default)]
pub struct CategoryUpdate {
    pub name: Option<String>,
}

impl Catalog {
    /// Creates a category. The image is uploaded into the new category folder before
    /// the record is written.
    ///
    /// # Errors
    /// `Validation` for a missing name or image, `Upload` if the image cannot be stored,
    /// `Store` if the insert fails (uploaded assets are then removed best-effort).
    #[instrument(skip(self, image))]
    pub async fn create_category(&self, name: &str, image: Option<&StagedFile>) -> Result<Category> {
        let (name, slug) = clean_name(name, "Name")?;
        let image = image.ok_or_else(|| CatalogError::validation("Please upload an image"))?;

        let short_id = self.identity.new_short_id();
        let folder = self.assets.root().category(&short_id);
        let image = self.assets.store(image, &folder).await?;

        let category = Category {
            id: Uuid::new_v4(),
            name,
            slug,
            short_id,
            image,
        };
        if let Err(err) = self.store.insert_category(&category).await {
            self.discard_uploads(&folder).await;
            return Err(err.into());
        }

        info!(id = %category.id, slug = %category.slug, "category created");
        Ok(category)
    }

    /// # Errors
    /// `Validation` for an empty lookup, `NotFound` when nothing matches.
    #[instrument(skip(self))]
    pub async fn find_category(&self, lookup: &Lookup) -> Result<Category> {
        require_filter(lookup)?;
        self.store
            .find_category(lookup)
            .await?
            .ok_or_else(|| CatalogError::not_found("Category not found"))
    }

    /// Renames a category and/or replaces its image in place.
    ///
    /// # Errors
    /// `NotFound` when the category is gone, `Validation` for a blank name, `Upload` when
    /// the replacement cannot be stored.
    #[instrument(skip(self, update, image))]
    pub async fn update_category(
        &self,
        id: Uuid,
        update: CategoryUpdate,
        image: Option<&StagedFile>,
    ) -> Result<Category> {
        let mut category = self.require_category(id).await?;

        if let Some(name) = update.name {
            let (name, slug) = clean_name(&name, "Name")?;
            category.name = name;
            category.slug = slug;
        }

        if let Some(image) = image {
            let folder = self.category_folder(&category);
            category.image = self
                .assets
                .replace(image, &folder, &category.image.storage_key)
                .await?;
        }

        if !self.store.save_category(&category).await? {
            return Err(CatalogError::not_found("Category not found"));
        }
        info!(id = %category.id, "category updated");
        Ok(category)
    }
}
