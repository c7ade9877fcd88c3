//! Asset binding: where an entity's images live and how they move.
//!
//! Asset folders mirror the hierarchy:
//! `{uploads_folder}/Categories/{c}/SubCategories/{s}/Brands/{b}/Products/{p}`, built from
//! the immutable short ids. Deleting a subtree is one `delete_tree` on the subtree root.
//!
//! Every object store call is bounded by `AssetConfig::timeout`.

use super::{error::CatalogError, model::AssetRef};
use crate::objects::{ObjectFuture, ObjectStore, ObjectStoreError, StagedFile};
use serde::Serialize;
use std::{fmt, future::Future, sync::Arc, time::Duration};
use tracing::{debug, instrument};
use utoipa::ToSchema;

pub const DEFAULT_UPLOADS_FOLDER: &str = "catalog";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const CATEGORIES: &str = "Categories";
const SUB_CATEGORIES: &str = "SubCategories";
const BRANDS: &str = "Brands";
const PRODUCTS: &str = "Products";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetConfig {
    pub uploads_folder: String,
    pub timeout: Duration,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            uploads_folder: DEFAULT_UPLOADS_FOLDER.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Folder path inside the object store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPath(String);

impl AssetPath {
    #[must_use]
    pub fn root(uploads_folder: &str) -> Self {
        Self(uploads_folder.trim_matches('/').to_string())
    }

    fn child(&self, collection: &str, short_id: &str) -> Self {
        Self(format!("{}/{collection}/{short_id}", self.0))
    }

    /// Call on the root path.
    #[must_use]
    pub fn category(&self, short_id: &str) -> Self {
        self.child(CATEGORIES, short_id)
    }

    /// Call on a category path.
    #[must_use]
    pub fn sub_category(&self, short_id: &str) -> Self {
        self.child(SUB_CATEGORIES, short_id)
    }

    /// Call on a sub-category path.
    #[must_use]
    pub fn brand(&self, short_id: &str) -> Self {
        self.child(BRANDS, short_id)
    }

    /// Call on a brand path.
    #[must_use]
    pub fn product(&self, short_id: &str) -> Self {
        self.child(PRODUCTS, short_id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part of `key` after this folder, if `key` lies inside it.
    #[must_use]
    pub fn trailing_segment<'k>(&self, key: &'k str) -> Option<&'k str> {
        key.strip_prefix(self.0.as_str())
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|rest| !rest.is_empty())
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of removing an entity's asset folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AssetCleanup {
    Removed { objects: u64 },
    Failed { message: String },
    /// The folder could not be derived because a parent record is gone.
    Skipped { message: String },
}

#[derive(Clone)]
pub struct AssetBinding {
    objects: Arc<dyn ObjectStore>,
    config: AssetConfig,
}

impl fmt::Debug for AssetBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssetBinding")
            .field("backend", &self.objects.name())
            .field("config", &self.config)
            .finish()
    }
}

impl AssetBinding {
    #[must_use]
    pub fn new(objects: Arc<dyn ObjectStore>, config: AssetConfig) -> Self {
        Self { objects, config }
    }

    #[must_use]
    pub fn root(&self) -> AssetPath {
        AssetPath::root(&self.config.uploads_folder)
    }

    async fn bounded<T>(&self, call: ObjectFuture<'_, T>) -> Result<T, ObjectStoreError> {
        within(self.config.timeout, call).await
    }

    /// Uploads `file` into `folder` under a backend-chosen name.
    ///
    /// # Errors
    /// Returns `Upload` when the object store fails or times out.
    #[instrument(skip(self, file, folder), fields(backend = self.objects.name(), folder = %folder))]
    pub async fn store(&self, file: &StagedFile, folder: &AssetPath) -> Result<AssetRef, CatalogError> {
        let stored = self
            .bounded(self.objects.upload(file, folder.as_str(), None))
            .await
            .map_err(CatalogError::Upload)?;
        debug!(key = %stored.key, "asset stored");
        Ok(AssetRef {
            remote_url: stored.url,
            storage_key: stored.key,
        })
    }

    /// Overwrites the object at `existing_key` with `file`, keeping the key.
    ///
    /// # Errors
    /// Returns `Validation` when `existing_key` does not lie inside `folder`, and `Upload`
    /// when the object store fails or times out.
    #[instrument(skip(self, file, folder), fields(backend = self.objects.name(), folder = %folder))]
    pub async fn replace(
        &self,
        file: &StagedFile,
        folder: &AssetPath,
        existing_key: &str,
    ) -> Result<AssetRef, CatalogError> {
        let trailing = folder.trailing_segment(existing_key).ok_or_else(|| {
            CatalogError::validation(format!(
                "Stored image key {existing_key} is outside of {folder}"
            ))
        })?;
        let stored = self
            .bounded(self.objects.upload(file, folder.as_str(), Some(trailing)))
            .await
            .map_err(CatalogError::Upload)?;
        debug!(key = %stored.key, "asset replaced");
        Ok(AssetRef {
            remote_url: stored.url,
            storage_key: stored.key,
        })
    }

    /// Deletes every object under `folder`, then the folder itself.
    ///
    /// # Errors
    /// Returns `Storage` when either step fails or times out.
    #[instrument(skip(self, folder), fields(backend = self.objects.name(), folder = %folder))]
    pub async fn delete_tree(&self, folder: &AssetPath) -> Result<u64, CatalogError> {
        // trailing slash keeps prefix matches on segment boundaries
        let prefix = format!("{folder}/");
        let removed = self
            .bounded(self.objects.delete_by_prefix(&prefix))
            .await
            .map_err(CatalogError::Storage)?;
        self.bounded(self.objects.delete_folder(folder.as_str()))
            .await
            .map_err(CatalogError::Storage)?;
        debug!(removed, "asset tree deleted");
        Ok(removed)
    }

    /// `delete_tree` folded into an `AssetCleanup` for reports.
    pub async fn cleanup(&self, folder: &AssetPath) -> AssetCleanup {
        match self.delete_tree(folder).await {
            Ok(objects) => AssetCleanup::Removed { objects },
            Err(err) => AssetCleanup::Failed {
                message: err.to_string(),
            },
        }
    }
}

async fn within<T>(
    limit: Duration,
    call: impl Future<Output = Result<T, ObjectStoreError>>,
) -> Result<T, ObjectStoreError> {
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| ObjectStoreError::Timeout)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::MemoryObjectStore;

    fn png() -> StagedFile {
        StagedFile::new("a.png", "image/png", vec![1, 2, 3])
    }

    #[test]
    fn paths_mirror_hierarchy() {
        let root = AssetPath::root("/catalog/");
        let product = root.category("c1").sub_category("s1").brand("b1").product("p1");
        assert_eq!(
            product.as_str(),
            "catalog/Categories/c1/SubCategories/s1/Brands/b1/Products/p1"
        );
    }

    #[test]
    fn trailing_segment_requires_folder_boundary() {
        let folder = AssetPath::root("catalog").category("ab");
        assert_eq!(folder.trailing_segment("catalog/Categories/ab/x1"), Some("x1"));
        assert_eq!(folder.trailing_segment("catalog/Categories/abc/x1"), None);
        assert_eq!(folder.trailing_segment("catalog/Categories/ab/"), None);
        assert_eq!(folder.trailing_segment("other/x1"), None);
    }

    #[tokio::test]
    async fn replace_reuses_existing_key() {
        let objects = Arc::new(MemoryObjectStore::new());
        let binding = AssetBinding::new(objects.clone(), AssetConfig::default());
        let folder = binding.root().category("ab");

        let Ok(first) = binding.store(&png(), &folder).await else {
            panic!("store");
        };
        let replacement = StagedFile::new("b.png", "image/png", vec![9]);
        let Ok(second) = binding
            .replace(&replacement, &folder, &first.storage_key)
            .await
        else {
            panic!("replace");
        };

        assert_eq!(first.storage_key, second.storage_key);
        assert_ne!(first.remote_url, second.remote_url);
        assert_eq!(objects.keys().await.len(), 1);
        let stored = objects.get(&second.storage_key).await.map(|o| o.bytes);
        assert_eq!(stored, Some(vec![9]));
    }

    #[tokio::test]
    async fn replace_rejects_foreign_key() {
        let binding = AssetBinding::new(Arc::new(MemoryObjectStore::new()), AssetConfig::default());
        let folder = binding.root().category("ab");
        let result = binding.replace(&png(), &folder, "catalog/Categories/zz/x").await;
        assert!(matches!(result, Err(CatalogError::Validation(_))));
    }

    #[tokio::test]
    async fn delete_tree_spares_sibling_prefixes() {
        let objects = Arc::new(MemoryObjectStore::new());
        let binding = AssetBinding::new(objects.clone(), AssetConfig::default());
        let root = binding.root();
        let folder = root.category("ab");
        assert!(binding.store(&png(), &folder).await.is_ok());
        assert!(binding.store(&png(), &folder.sub_category("s1")).await.is_ok());
        assert!(binding.store(&png(), &root.category("abc")).await.is_ok());

        assert!(matches!(binding.delete_tree(&folder).await, Ok(2)));
        assert!(objects.keys_under(folder.as_str()).await.is_empty());
        assert_eq!(objects.keys().await.len(), 1);
        assert!(!objects.has_folder(folder.as_str()).await);
    }

    #[tokio::test]
    async fn upload_failure_maps_to_upload_error() {
        let objects = Arc::new(MemoryObjectStore::new());
        objects.fail_uploads(true);
        let binding = AssetBinding::new(objects, AssetConfig::default());
        let result = binding.store(&png(), &binding.root().category("ab")).await;
        assert!(matches!(result, Err(CatalogError::Upload(_))));
    }

    #[tokio::test]
    async fn slow_calls_time_out() {
        let result: Result<(), ObjectStoreError> = within(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ObjectStoreError::Timeout)));
    }
}
