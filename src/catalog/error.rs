use crate::{objects::ObjectStoreError, store::StoreError};
use thiserror::Error;

/// Failures surfaced by catalog operations.
///
/// `IntegrityGap` is deliberately absent: gaps left by a cascade are reported in the
/// `DeleteReport` and logged, never raised.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The addressed entity or one of its required parents does not exist.
    #[error("{0}")]
    NotFound(String),
    /// A required field is missing or malformed.
    #[error("{0}")]
    Validation(String),
    /// Uploading or replacing an asset failed; nothing was persisted.
    #[error("upload failed: {0}")]
    Upload(#[source] ObjectStoreError),
    /// Deleting assets failed.
    #[error("object storage failed: {0}")]
    Storage(#[source] ObjectStoreError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl CatalogError {
    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}
