//! Multipart intake.
//!
//! Text fields are collected by name and files are staged in memory after their MIME
//! type is checked against the `UploadPolicy`. Whether a file is required is left to
//! the catalog operation, so a missing image surfaces as a validation error there.

use super::failure;
use crate::{catalog::products::MAX_PRODUCT_IMAGES, objects::StagedFile};
use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub allowed_content_types: Vec<String>,
    pub max_body_bytes: usize,
    pub max_product_images: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(
            ["image/png", "image/jpeg", "image/jpg", "image/gif", "image/webp"]
                .into_iter()
                .map(String::from)
                .collect(),
            DEFAULT_MAX_BODY_BYTES,
        )
    }
}

impl UploadPolicy {
    #[must_use]
    pub fn new(allowed_content_types: Vec<String>, max_body_bytes: usize) -> Self {
        Self {
            allowed_content_types,
            max_body_bytes,
            max_product_images: MAX_PRODUCT_IMAGES,
        }
    }

    #[must_use]
    pub fn accepts(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types.iter().any(|allowed| *allowed == essence)
    }
}

#[derive(Debug, Error)]
pub enum UploadRejection {
    #[error("Invalid file type: {0}")]
    UnsupportedType(String),
    #[error("Too many files in field {field}: at most {max} allowed")]
    TooManyFiles { field: String, max: usize },
    #[error(transparent)]
    Multipart(#[from] MultipartError),
}

impl IntoResponse for UploadRejection {
    fn into_response(self) -> Response {
        match &self {
            Self::Multipart(err) => {
                debug!("multipart rejected: {err}");
                failure(err.status(), err.body_text())
            }
            Self::UnsupportedType(_) | Self::TooManyFiles { .. } => {
                failure(StatusCode::BAD_REQUEST, self.to_string())
            }
        }
    }
}

/// A parsed multipart body.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<StagedFile>>,
}

impl UploadForm {
    /// Drains `multipart`. File parts are those carrying a file name.
    ///
    /// # Errors
    /// Rejects a disallowed MIME type, more than `max_product_images` files under one
    /// field, or a malformed/oversized body.
    pub async fn read(mut multipart: Multipart, policy: &UploadPolicy) -> Result<Self, UploadRejection> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                if !policy.accepts(&content_type) {
                    return Err(UploadRejection::UnsupportedType(content_type));
                }
                let bytes = field.bytes().await?;
                let files = form.files.entry(name.clone()).or_default();
                if files.len() >= policy.max_product_images {
                    return Err(UploadRejection::TooManyFiles {
                        field: name,
                        max: policy.max_product_images,
                    });
                }
                files.push(StagedFile::new(file_name, content_type, bytes.to_vec()));
            } else {
                let value = field.text().await?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Text value of `name`, `None` when absent.
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Text value of `name`, treating blank input as absent.
    #[must_use]
    pub fn non_blank(&self, name: &str) -> Option<&str> {
        self.text(name).filter(|value| !value.trim().is_empty())
    }

    /// First file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<StagedFile> {
        self.take_files(name).into_iter().next()
    }

    pub fn take_files(&mut self, name: &str) -> Vec<StagedFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_configured_types_only() {
        let policy = UploadPolicy::default();
        assert!(policy.accepts("image/png"));
        assert!(policy.accepts("IMAGE/JPEG; charset=binary"));
        assert!(!policy.accepts("application/pdf"));
        assert!(!policy.accepts(""));
        assert_eq!(policy.max_product_images, 5);
    }

    #[test]
    fn rejections_are_bad_requests() {
        let response = UploadRejection::UnsupportedType("text/plain".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let response = UploadRejection::TooManyFiles {
            field: "image".into(),
            max: 5,
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn blank_fields_are_absent() {
        let mut form = UploadForm::default();
        form.fields.insert("name".into(), "  ".into());
        form.fields.insert("title".into(), "TV".into());
        assert_eq!(form.text("name"), Some("  "));
        assert_eq!(form.non_blank("name"), None);
        assert_eq!(form.non_blank("title"), Some("TV"));
        assert!(form.take_file("image").is_none());
    }
}
