//! External service integrations

pub mod image_storage;
pub mod mailer;

use std::sync::Arc;

use crate::config::{ImageStorageConfig, SmtpConfig};
use crate::error::AppResult;

pub use image_storage::{CloudinaryUploader, DisabledUploader, ImageUploader};
pub use mailer::{LogMailer, Mailer, SmtpMailer};

/// Pick the image uploader once at start-up
pub fn image_uploader_from_config(config: &ImageStorageConfig) -> Arc<dyn ImageUploader> {
    match CloudinaryUploader::from_config(config) {
        Some(uploader) => {
            tracing::info!("Image storage: Cloudinary");
            Arc::new(uploader)
        }
        None => {
            tracing::warn!("Image storage is not configured; product images will be rejected");
            Arc::new(DisabledUploader)
        }
    }
}

/// Pick the mailer once at start-up
pub fn mailer_from_config(config: &SmtpConfig) -> AppResult<Arc<dyn Mailer>> {
    match &config.host {
        Some(host) if !host.trim().is_empty() => Ok(Arc::new(SmtpMailer::new(host, config)?)),
        _ => {
            tracing::info!("SMTP is not configured; OTP emails will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}
