//! Object store abstraction used by asset binding.
//!
//! Backends upload staged files into a folder and delete whole folder trees by key
//! prefix. Three backends exist:
//!
//! - `LocalObjectStore` writes under a directory and is served by the API at `/assets`.
//! - `CloudinaryStore` talks to the Cloudinary upload and admin REST APIs.
//! - `MemoryObjectStore` keeps objects in memory (tests and local experiments).
//!
//! Backends do not retry. Callers bound every call with a timeout.

pub mod cloudinary;
pub mod local;
pub mod memory;

pub use cloudinary::{CloudinaryConfig, CloudinaryStore};
pub use local::LocalObjectStore;
pub use memory::MemoryObjectStore;

use std::{future::Future, pin::Pin};
use thiserror::Error;

pub type ObjectFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ObjectStoreError>> + Send + 'a>>;

/// A file received by the upload intake, already checked for MIME type and size.
#[derive(Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl StagedFile {
    #[must_use]
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }
}

impl std::fmt::Debug for StagedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Location of an uploaded object as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub key: String,
}

#[derive(Debug, Error)]
pub enum ObjectStoreError {
    #[error("object store request timed out")]
    Timeout,
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("object store request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("object store rejected request: {status} {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected object store response: {0}")]
    Response(String),
    #[error("folder is not empty: {0}")]
    FolderNotEmpty(String),
    /// Failure injected by `MemoryObjectStore`.
    #[error("simulated failure: {0}")]
    Simulated(&'static str),
}

/// Object store collaborator.
pub trait ObjectStore: Send + Sync {
    /// Uploads `file` into `folder`. With `public_id` the key is `{folder}/{public_id}` and an
    /// existing object at that key is overwritten; otherwise the backend picks a fresh name.
    fn upload<'a>(
        &'a self,
        file: &'a StagedFile,
        folder: &'a str,
        public_id: Option<&'a str>,
    ) -> ObjectFuture<'a, StoredObject>;

    /// Deletes every object whose key starts with `prefix`, returning how many were removed.
    fn delete_by_prefix<'a>(&'a self, prefix: &'a str) -> ObjectFuture<'a, u64>;

    /// Deletes the (now empty) folder marker. A missing folder is not an error.
    fn delete_folder<'a>(&'a self, folder: &'a str) -> ObjectFuture<'a, ()>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Rejects keys that could escape the storage root or address nothing.
pub(crate) fn check_key(key: &str) -> Result<(), ObjectStoreError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if bad {
        return Err(ObjectStoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Joins a folder and an object name into a key.
pub(crate) fn join_key(folder: &str, name: &str) -> String {
    format!("{}/{}", folder.trim_end_matches('/'), name)
}

/// Returns `true` when `key` is `prefix` itself or lies beneath it as a folder.
pub(crate) fn key_in_prefix(key: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    key == prefix
        || key
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}
