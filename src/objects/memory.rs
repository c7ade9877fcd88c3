//! In-memory object store with failure injection.

use super::{
    check_key, join_key, key_in_prefix, ObjectFuture, ObjectStore, ObjectStoreError, StagedFile,
    StoredObject,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
};
use tokio::sync::RwLock;
use ulid::Ulid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryObject {
    pub url: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Objects live in a key-ordered map; folders are tracked as markers like a remote
/// store would, and must be emptied before they can be deleted.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: RwLock<BTreeMap<String, MemoryObject>>,
    folders: RwLock<BTreeSet<String>>,
    uploads: AtomicU64,
    fail_uploads: AtomicBool,
    fail_deletes: AtomicBool,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every following upload fail until reset.
    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }

    /// Makes every following delete fail until reset.
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful uploads since creation.
    #[must_use]
    pub fn upload_count(&self) -> u64 {
        self.uploads.load(Ordering::SeqCst)
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }

    pub async fn keys_under(&self, prefix: &str) -> Vec<String> {
        self.objects
            .read()
            .await
            .keys()
            .filter(|key| key_in_prefix(key, prefix))
            .cloned()
            .collect()
    }

    pub async fn get(&self, key: &str) -> Option<MemoryObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn has_folder(&self, folder: &str) -> bool {
        self.folders.read().await.contains(folder.trim_end_matches('/'))
    }
}

impl ObjectStore for MemoryObjectStore {
    fn upload<'a>(
        &'a self,
        file: &'a StagedFile,
        folder: &'a str,
        public_id: Option<&'a str>,
    ) -> ObjectFuture<'a, StoredObject> {
        Box::pin(async move {
            if self.fail_uploads.load(Ordering::SeqCst) {
                return Err(ObjectStoreError::Simulated("upload"));
            }
            let name = public_id.map_or_else(|| Ulid::new().to_string().to_lowercase(), str::to_string);
            let key = join_key(folder, &name);
            check_key(&key)?;

            let url = format!("memory://{key}?v={}", Ulid::new());
            self.objects.write().await.insert(
                key.clone(),
                MemoryObject {
                    url: url.clone(),
                    content_type: file.content_type.clone(),
                    bytes: file.bytes.clone(),
                },
            );

            // every ancestor behaves like an implicit folder marker
            let mut folders = self.folders.write().await;
            let mut current = String::new();
            for segment in folder.trim_end_matches('/').split('/') {
                if !current.is_empty() {
                    current.push('/');
                }
                current.push_str(segment);
                folders.insert(current.clone());
            }

            self.uploads.fetch_add(1, Ordering::SeqCst);
            Ok(StoredObject { url, key })
        })
    }

    fn delete_by_prefix<'a>(&'a self, prefix: &'a str) -> ObjectFuture<'a, u64> {
        Box::pin(async move {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(ObjectStoreError::Simulated("delete_by_prefix"));
            }
            let mut objects = self.objects.write().await;
            let before = objects.len();
            objects.retain(|key, _| !key_in_prefix(key, prefix));
            Ok((before - objects.len()) as u64)
        })
    }

    fn delete_folder<'a>(&'a self, folder: &'a str) -> ObjectFuture<'a, ()> {
        Box::pin(async move {
            if self.fail_deletes.load(Ordering::SeqCst) {
                return Err(ObjectStoreError::Simulated("delete_folder"));
            }
            let folder = folder.trim_end_matches('/');
            if self
                .objects
                .read()
                .await
                .keys()
                .any(|key| key_in_prefix(key, folder))
            {
                return Err(ObjectStoreError::FolderNotEmpty(folder.to_string()));
            }
            self.folders
                .write()
                .await
                .retain(|marker| !key_in_prefix(marker, folder));
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> StagedFile {
        StagedFile::new("a.png", "image/png", vec![0x89, 0x50])
    }

    #[tokio::test]
    async fn upload_with_public_id_overwrites_in_place() {
        let store = MemoryObjectStore::new();
        let first = store.upload(&png(), "root/Categories/ab", Some("img")).await;
        let second = store.upload(&png(), "root/Categories/ab", Some("img")).await;
        let (Ok(first), Ok(second)) = (first, second) else {
            panic!("uploads should succeed");
        };
        assert_eq!(first.key, "root/Categories/ab/img");
        assert_eq!(first.key, second.key);
        assert_ne!(first.url, second.url);
        assert_eq!(store.keys().await.len(), 1);
        assert_eq!(store.upload_count(), 2);
    }

    #[tokio::test]
    async fn delete_folder_requires_empty_folder() {
        let store = MemoryObjectStore::new();
        assert!(store.upload(&png(), "root/Categories/ab", None).await.is_ok());
        assert!(store.has_folder("root/Categories/ab").await);

        let err = store.delete_folder("root/Categories/ab").await;
        assert!(matches!(err, Err(ObjectStoreError::FolderNotEmpty(_))));

        assert!(matches!(store.delete_by_prefix("root/Categories/ab").await, Ok(1)));
        assert!(store.delete_folder("root/Categories/ab").await.is_ok());
        assert!(!store.has_folder("root/Categories/ab").await);
        assert!(store.has_folder("root/Categories").await);
    }

    #[tokio::test]
    async fn injected_failures() {
        let store = MemoryObjectStore::new();
        store.fail_uploads(true);
        assert!(store.upload(&png(), "root", None).await.is_err());
        assert_eq!(store.upload_count(), 0);

        store.fail_deletes(true);
        assert!(store.delete_by_prefix("root").await.is_err());
        assert!(store.delete_folder("root").await.is_err());
    }
}
