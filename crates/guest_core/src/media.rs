use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use serde::Deserialize;
use shared::error::GuestDataError;
use tracing::debug;

use crate::config::MediaSettings;

const DELIVERY_BASE: &str = "https://res.cloudinary.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadedMedia {
    #[serde(rename = "secure_url")]
    pub url: String,
    pub public_id: String,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// Destination for guest photo uploads.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(&self, file: &UploadFile) -> Result<UploadedMedia, GuestDataError>;
}

pub struct MissingMediaHost;

#[async_trait]
impl MediaHost for MissingMediaHost {
    async fn upload(&self, _file: &UploadFile) -> Result<UploadedMedia, GuestDataError> {
        Err(GuestDataError::upload("media host is not configured"))
    }
}

/// Unsigned uploads to a Cloudinary-compatible image endpoint using an upload
/// preset.
pub struct CloudinaryHost {
    http: Client,
    settings: MediaSettings,
}

impl CloudinaryHost {
    pub fn new(settings: MediaSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}/image/upload",
            self.settings.api_base, self.settings.cloud_name
        )
    }
}

#[async_trait]
impl MediaHost for CloudinaryHost {
    async fn upload(&self, file: &UploadFile) -> Result<UploadedMedia, GuestDataError> {
        let part = Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str(&file.mime_type)
            .map_err(|e| GuestDataError::upload(format!("invalid mime type: {e}")))?;
        let form = Form::new()
            .part("file", part)
            .text("upload_preset", self.settings.upload_preset.clone())
            .text("folder", self.settings.folder.clone());

        debug!(filename = %file.filename, size = file.size(), "uploading media");
        let response = self
            .http
            .post(self.endpoint())
            .multipart(form)
            .send()
            .await
            .map_err(|e| GuestDataError::upload(format!("media host unreachable: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GuestDataError::upload(format!(
                "media host rejected {} with {status}",
                file.filename
            )));
        }

        response
            .json()
            .await
            .map_err(|e| GuestDataError::upload(format!("unreadable media host response: {e}")))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

fn dimension(value: Option<u32>) -> String {
    value.map_or_else(|| "auto".to_string(), |v| v.to_string())
}

/// Delivery URL with automatic quality and format, cropped to fill.
pub fn optimized_url(cloud_name: &str, public_id: &str, options: DeliveryOptions) -> String {
    format!(
        "{DELIVERY_BASE}/{cloud_name}/image/upload/c_fill,w_{},h_{},q_auto,f_auto/{public_id}",
        dimension(options.width),
        dimension(options.height)
    )
}

pub fn thumbnail_url(cloud_name: &str, public_id: &str, size: u32) -> String {
    format!("{DELIVERY_BASE}/{cloud_name}/image/upload/c_thumb,w_{size},h_{size}/{public_id}")
}

#[cfg(test)]
#[path = "tests/media_tests.rs"]
mod tests;
