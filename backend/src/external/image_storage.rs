//! Product image storage
//!
//! Uploads go to Cloudinary with a signed request; the stored value is the
//! returned `secure_url`.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{multipart, Client};
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::config::ImageStorageConfig;
use crate::error::{AppError, AppResult};

/// Capability to persist an image and return a stable URL for it
#[async_trait]
pub trait ImageUploader: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, name: &str) -> AppResult<String>;
}

/// Used when no image storage is configured
pub struct DisabledUploader;

#[async_trait]
impl ImageUploader for DisabledUploader {
    async fn upload(&self, _bytes: Vec<u8>, _name: &str) -> AppResult<String> {
        Err(AppError::Dependency("image storage is not configured".to_string()))
    }
}

/// Cloudinary upload client
#[derive(Clone)]
pub struct CloudinaryUploader {
    client: Client,
    base_url: String,
    api_key: String,
    api_secret: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

impl CloudinaryUploader {
    /// Build an uploader when cloud name and credentials are all present
    pub fn from_config(config: &ImageStorageConfig) -> Option<Self> {
        let cloud_name = non_empty(&config.cloud_name)?;
        Some(Self {
            client: Client::new(),
            base_url: format!("https://api.cloudinary.com/v1_1/{}", cloud_name),
            api_key: non_empty(&config.api_key)?,
            api_secret: non_empty(&config.api_secret)?,
            folder: config.folder.clone(),
        })
    }

    /// Create an uploader against a custom base URL, such as a local stub
    pub fn with_base_url(base_url: String, api_key: String, api_secret: String, folder: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
            api_secret,
            folder,
        }
    }
}

#[async_trait]
impl ImageUploader for CloudinaryUploader {
    async fn upload(&self, bytes: Vec<u8>, name: &str) -> AppResult<String> {
        let now = Utc::now();
        let timestamp = now.timestamp().to_string();
        let public_id = format!("{}-{}", now.timestamp_millis(), safe_base_name(name));

        let params = [
            ("folder", self.folder.as_str()),
            ("public_id", public_id.as_str()),
            ("timestamp", timestamp.as_str()),
        ];
        let signature = sign_params(&params, &self.api_secret);

        let file = multipart::Part::bytes(bytes).file_name(name.to_string());
        let form = multipart::Form::new()
            .part("file", file)
            .text("api_key", self.api_key.clone())
            .text("folder", self.folder.clone())
            .text("public_id", public_id)
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature);

        let response = self
            .client
            .post(format!("{}/image/upload", self.base_url))
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("Image upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Dependency(format!(
                "Image upload error: {} - {}",
                status, body
            )));
        }

        let data: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Dependency(format!("Failed to parse upload response: {}", e)))?;

        data.secure_url
            .filter(|url| !url.is_empty())
            .ok_or_else(|| AppError::Dependency("Image upload failed".to_string()))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// File name without extension, restricted to `[A-Za-z0-9_-]`
pub fn safe_base_name(original: &str) -> String {
    let file = original.rsplit(['/', '\\']).next().unwrap_or(original);
    let stem = match file.rfind('.') {
        Some(idx) if idx > 0 => &file[..idx],
        _ => file,
    };
    let base: String = stem
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if base.is_empty() {
        "image".to_string()
    } else {
        base
    }
}

/// Cloudinary request signature: sorted `key=value` pairs joined by `&`,
/// followed by the API secret, hashed with SHA-256 and hex encoded.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));
    let payload = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let digest = Sha256::digest(format!("{}{}", payload, api_secret).as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_base_name() {
        assert_eq!(safe_base_name("Maggi Pack (1).png"), "MaggiPack1");
        assert_eq!(safe_base_name("C:\\photos\\tea_box.jpeg"), "tea_box");
        assert_eq!(safe_base_name(".png"), "png");
        assert_eq!(safe_base_name("***"), "image");
    }

    #[test]
    fn test_signature_is_order_independent() {
        let a = sign_params(&[("timestamp", "1"), ("folder", "f")], "secret");
        let b = sign_params(&[("folder", "f"), ("timestamp", "1")], "secret");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_signature_known_value() {
        // sha256("a=1&b=2s")
        assert_eq!(
            sign_params(&[("b", "2"), ("a", "1")], "s"),
            "b9d014737a6137029b0d941e6dc2e469a3263824026f053fb62ebafeb021c6c7"
        );
    }

    #[tokio::test]
    async fn test_disabled_uploader_is_dependency_error() {
        let err = DisabledUploader.upload(vec![1, 2, 3], "x.png").await.unwrap_err();
        assert!(matches!(err, AppError::Dependency(_)));
    }
}
