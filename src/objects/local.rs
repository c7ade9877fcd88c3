//! Filesystem-backed object store.
//!
//! Objects live at `{root}/{key}` and are reachable at `{public_base_url}/{key}?v={version}`.
//! Every write mints a fresh version token so a replaced object gets a new URL while
//! keeping its key.

use super::{
    check_key, join_key, key_in_prefix, ObjectFuture, ObjectStore, ObjectStoreError, StagedFile,
    StoredObject,
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use ulid::Ulid;

#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        check_key(key)?;
        Ok(key.split('/').fold(self.root.clone(), |path, segment| path.join(segment)))
    }

    /// Collects every file below `dir` as a key relative to the root.
    async fn walk_files(&self, dir: PathBuf) -> Result<Vec<(String, PathBuf)>, ObjectStoreError> {
        let mut files = Vec::new();
        let mut pending = vec![dir];
        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                Err(err) => return Err(err.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(relative) = path.strip_prefix(&self.root) {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    files.push((key, path));
                }
            }
        }
        Ok(files)
    }
}

impl ObjectStore for LocalObjectStore {
    fn upload<'a>(
        &'a self,
        file: &'a StagedFile,
        folder: &'a str,
        public_id: Option<&'a str>,
    ) -> ObjectFuture<'a, StoredObject> {
        Box::pin(async move {
            let name = public_id.map_or_else(|| Ulid::new().to_string().to_lowercase(), str::to_string);
            let key = join_key(folder, &name);
            let path = self.path_for(&key)?;
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).await?;
            }
            fs::write(&path, &file.bytes).await?;
            debug!(key = %key, bytes = file.bytes.len(), "stored local object");

            Ok(StoredObject {
                url: format!("{}/{key}?v={}", self.public_base_url, Ulid::new()),
                key,
            })
        })
    }

    fn delete_by_prefix<'a>(&'a self, prefix: &'a str) -> ObjectFuture<'a, u64> {
        Box::pin(async move {
            let prefix = prefix.trim_end_matches('/');
            let dir = self.path_for(prefix)?;
            let mut deleted = 0;
            for (key, path) in self.walk_files(dir).await? {
                if key_in_prefix(&key, prefix) {
                    fs::remove_file(&path).await?;
                    deleted += 1;
                }
            }
            Ok(deleted)
        })
    }

    fn delete_folder<'a>(&'a self, folder: &'a str) -> ObjectFuture<'a, ()> {
        Box::pin(async move {
            let folder = folder.trim_end_matches('/');
            let dir = self.path_for(folder)?;
            if !self.walk_files(dir.clone()).await?.is_empty() {
                return Err(ObjectStoreError::FolderNotEmpty(folder.to_string()));
            }
            match fs::remove_dir_all(&dir).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(err.into()),
            }
        })
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
