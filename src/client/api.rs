//! HTTP client for a running studio server.

use crate::{
    config::DEFAULT_MAX_UPLOAD_BYTES,
    models::{asset::MediaAsset, upload::ImageUploadResponse},
};
use reqwest::{
    Body, Client, Response, StatusCode,
    multipart::{Form, Part},
};
use serde::{Deserialize, de::DeserializeOwned};
use std::path::Path;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },
    #[error("{path} is {size} bytes; the limit is {limit}")]
    TooLarge { path: String, size: u64, limit: u64 },
}

pub type ApiResult<T> = Result<T, ApiClientError>;

/// Error envelope produced by the server's `AppError`.
#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Clone, Debug)]
pub struct StudioClient {
    http: Client,
    base: String,
    max_upload_bytes: u64,
}

impl StudioClient {
    pub fn new(http: Client, base: &str) -> Self {
        Self {
            http,
            base: base.trim_end_matches('/').to_string(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES as u64,
        }
    }

    pub fn with_max_upload_bytes(mut self, limit: u64) -> Self {
        self.max_upload_bytes = limit;
        self
    }

    pub fn http(&self) -> &Client {
        &self.http
    }

    /// Anonymous image upload; returns the provider reference.
    #[instrument(skip(self))]
    pub async fn upload_image(&self, path: &Path) -> ApiResult<String> {
        let (part, _) = self.file_part(path).await?;
        let form = Form::new().part("file", part);

        let response = self
            .http
            .post(format!("{}/api/image-upload", self.base))
            .multipart(form)
            .send()
            .await?;
        let body: ImageUploadResponse = parse(response).await?;
        debug!("image stored as {}", body.public_id);
        Ok(body.public_id)
    }

    /// Authenticated video upload; returns the stored record.
    #[instrument(skip(self, token))]
    pub async fn upload_video(
        &self,
        path: &Path,
        title: &str,
        description: Option<&str>,
        token: &str,
    ) -> ApiResult<MediaAsset> {
        let (part, size) = self.file_part(path).await?;
        let mut form = Form::new()
            .part("file", part)
            .text("title", title.to_string())
            .text("originalSize", size.to_string());
        if let Some(description) = description {
            form = form.text("description", description.to_string());
        }

        let response = self
            .http
            .post(format!("{}/api/video-upload", self.base))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await?;
        parse(response).await
    }

    pub async fn list_videos(&self) -> ApiResult<Vec<MediaAsset>> {
        let response = self
            .http
            .get(format!("{}/api/videos", self.base))
            .send()
            .await?;
        parse(response).await
    }

    /// Streams the file; refuses anything over the limit before connecting.
    async fn file_part(&self, path: &Path) -> ApiResult<(Part, u64)> {
        let io_err = |source| ApiClientError::Io {
            path: path.display().to_string(),
            source,
        };
        let file = File::open(path).await.map_err(io_err)?;
        let size = file.metadata().await.map_err(io_err)?.len();
        if size > self.max_upload_bytes {
            return Err(ApiClientError::TooLarge {
                path: path.display().to_string(),
                size,
                limit: self.max_upload_bytes,
            });
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let body = Body::wrap_stream(ReaderStream::new(file));
        Ok((Part::stream_with_length(body, size).file_name(filename), size))
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }
    let text = response.text().await?;
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);
    Err(ApiClientError::Status { status, message })
}
