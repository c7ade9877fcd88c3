//! Cloudinary REST backend.
//!
//! Uploads use the signed upload API (`POST /v1_1/{cloud}/image/upload`); deletes use the
//! admin API with basic auth. Signatures are SHA-256, so the Cloudinary product
//! environment must be configured for SHA-256 API signatures.

use super::{ObjectFuture, ObjectStore, ObjectStoreError, StagedFile, StoredObject};
use reqwest::{multipart, Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.cloudinary.com";

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub api_url: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: SecretString,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("api_url", &self.api_url)
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug)]
pub struct CloudinaryStore {
    client: Client,
    config: CloudinaryConfig,
}

impl CloudinaryStore {
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot be built.
    pub fn new(config: CloudinaryConfig, timeout: Duration) -> Result<Self, ObjectStoreError> {
        Url::parse(&config.api_url)
            .map_err(|err| ObjectStoreError::Response(format!("invalid Cloudinary API URL: {err}")))?;
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client, config })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/v1_1/{}/{}",
            self.config.api_url.trim_end_matches('/'),
            self.config.cloud_name,
            path
        )
    }

    fn sign(&self, params: &[(&str, String)]) -> String {
        signature(params, self.config.api_secret.expose_secret())
    }
}

/// Cloudinary request signature: parameters sorted by name, joined as `k=v&k=v`, with the
/// API secret appended, hashed with SHA-256 and hex encoded. Empty values are skipped.
fn signature(params: &[(&str, String)], secret: &str) -> String {
    let mut sorted: Vec<&(&str, String)> = params.iter().filter(|(_, v)| !v.is_empty()).collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    hex::encode(Sha256::digest(format!("{to_sign}{secret}").as_bytes()))
}

async fn rejected(response: Response) -> ObjectStoreError {
    let status = response.status().as_u16();
    let message = match response.json::<Value>().await {
        Ok(body) => body["error"]["message"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
        Err(_) => String::new(),
    };
    ObjectStoreError::Rejected { status, message }
}

impl ObjectStore for CloudinaryStore {
    fn upload<'a>(
        &'a self,
        file: &'a StagedFile,
        folder: &'a str,
        public_id: Option<&'a str>,
    ) -> ObjectFuture<'a, StoredObject> {
        Box::pin(async move {
            let timestamp = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs())
                .to_string();
            let mut params = vec![
                ("folder", folder.to_string()),
                ("overwrite", "true".to_string()),
                ("timestamp", timestamp),
            ];
            if let Some(public_id) = public_id {
                params.push(("public_id", public_id.to_string()));
            }
            let signature = self.sign(&params);

            let part = multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(&file.content_type)?;
            let mut form = multipart::Form::new()
                .part("file", part)
                .text("api_key", self.config.api_key.clone())
                .text("signature", signature);
            for (name, value) in params {
                form = form.text(name, value);
            }

            let response = self
                .client
                .post(self.endpoint("image/upload"))
                .multipart(form)
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }

            let body: UploadResponse = response.json().await?;
            debug!(public_id = %body.public_id, "uploaded to cloudinary");
            Ok(StoredObject {
                url: body.secure_url,
                key: body.public_id,
            })
        })
    }

    fn delete_by_prefix<'a>(&'a self, prefix: &'a str) -> ObjectFuture<'a, u64> {
        Box::pin(async move {
            let response = self
                .client
                .delete(self.endpoint("resources/image/upload"))
                .basic_auth(
                    &self.config.api_key,
                    Some(self.config.api_secret.expose_secret()),
                )
                .query(&[("prefix", prefix)])
                .send()
                .await?;
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }
            let body: Value = response.json().await?;
            let deleted = body["deleted"]
                .as_object()
                .map_or(0, |map| map.values().filter(|v| v.as_str() == Some("deleted")).count());
            Ok(deleted as u64)
        })
    }

    fn delete_folder<'a>(&'a self, folder: &'a str) -> ObjectFuture<'a, ()> {
        Box::pin(async move {
            let response = self
                .client
                .delete(self.endpoint(&format!("folders/{}", folder.trim_matches('/'))))
                .basic_auth(
                    &self.config.api_key,
                    Some(self.config.api_secret.expose_secret()),
                )
                .send()
                .await?;
            // a folder that never received an asset does not exist remotely
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                return Ok(());
            }
            if !response.status().is_success() {
                return Err(rejected(response).await);
            }
            Ok(())
        })
    }

    fn name(&self) -> &'static str {
        "cloudinary"
    }
}
