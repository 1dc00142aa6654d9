//! Client for the external media-processing provider.
//!
//! The provider stores uploads, transcodes them and serves derived
//! variants from URLs. This module only performs the signed upload call;
//! delivery URLs are built in `crate::transform::delivery` without any
//! network traffic.

use crate::{
    config::ProviderConfig,
    models::upload::{ProviderAsset, UploadOptions, UploadedFile},
};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::{
    Client, StatusCode,
    multipart::{Form, Part},
};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider rejected upload ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
    #[error("provider response could not be read: {0}")]
    InvalidResponse(String),
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

#[async_trait]
pub trait MediaProcessor: Send + Sync {
    /// Upload raw bytes and return the provider's reference and metadata.
    async fn upload(
        &self,
        file: &UploadedFile,
        options: &UploadOptions,
    ) -> ProcessorResult<ProviderAsset>;
}

/// Signed-upload client for a Cloudinary account.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: Client,
    config: ProviderConfig,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl CloudinaryClient {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn upload_endpoint(&self, options: &UploadOptions) -> String {
        format!(
            "{}/v1_1/{}/{}/upload",
            self.config.api_base.trim_end_matches('/'),
            self.config.cloud_name,
            options.kind.as_str()
        )
    }

    /// Parameters covered by the request signature, sorted by name.
    fn signed_params(options: &UploadOptions, timestamp: i64) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("folder", options.folder.clone()),
            ("timestamp", timestamp.to_string()),
        ];
        if let Some(format) = &options.format {
            params.push(("format", format.clone()));
        }
        if let Some(transformation) = &options.transformation {
            params.push(("transformation", transformation.clone()));
        }
        params.sort_by(|a, b| a.0.cmp(b.0));
        params
    }
}

/// Hex SHA-256 of `k1=v1&k2=v2...` followed by the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let joined = params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");
    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// File part for the upload form. A content type that does not parse is dropped.
fn file_part(file: &UploadedFile) -> Part {
    let bare = || Part::stream(file.bytes.clone()).file_name(file.filename.clone());
    match &file.content_type {
        Some(content_type) => bare().mime_str(content_type).unwrap_or_else(|err| {
            debug!("ignoring content type `{}`: {}", content_type, err);
            bare()
        }),
        None => bare(),
    }
}

#[async_trait]
impl MediaProcessor for CloudinaryClient {
    async fn upload(
        &self,
        file: &UploadedFile,
        options: &UploadOptions,
    ) -> ProcessorResult<ProviderAsset> {
        let params = Self::signed_params(options, Utc::now().timestamp());
        let signature = sign_params(&params, &self.config.api_secret);

        let part = file_part(file);

        let mut form = Form::new()
            .part("file", part)
            .text("api_key", self.config.api_key.clone())
            .text("signature", signature)
            .text("signature_algorithm", "sha256");
        for (name, value) in params {
            form = form.text(name, value);
        }

        let url = self.upload_endpoint(options);
        debug!("uploading {} bytes to {}", file.len(), url);

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorEnvelope>(&body)
                .map(|env| env.error.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            return Err(ProcessorError::Rejected { status, message });
        }

        let asset: ProviderAsset = serde_json::from_slice(&body)
            .map_err(|err| ProcessorError::InvalidResponse(err.to_string()))?;
        if asset.public_id.is_empty() {
            return Err(ProcessorError::InvalidResponse(
                "empty public_id in upload response".into(),
            ));
        }
        Ok(asset)
    }
}
