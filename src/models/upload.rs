//! Upload inputs and the provider's answer to an upload.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Kind of media being sent to the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Path segment the provider uses for this resource type.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A file received from the caller, fully buffered for this request.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadedFile {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Everything the video form posts alongside the file.
#[derive(Clone, Debug, Default)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub title: Option<String>,
    pub description: Option<String>,
    /// Size the client claims the file has; informational only.
    pub declared_size: Option<i64>,
}

/// Options sent with a remote upload.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadOptions {
    pub kind: MediaKind,
    pub folder: String,
    /// Incoming transformation applied by the provider (e.g. `q_auto`).
    pub transformation: Option<String>,
    /// Target delivery format (e.g. `mp4`).
    pub format: Option<String>,
}

impl UploadOptions {
    /// Videos are normalized to auto-quality mp4.
    pub fn video() -> Self {
        Self {
            kind: MediaKind::Video,
            folder: "video-uploads".into(),
            transformation: Some("q_auto".into()),
            format: Some("mp4".into()),
        }
    }

    pub fn image() -> Self {
        Self {
            kind: MediaKind::Image,
            folder: "image-uploads".into(),
            transformation: None,
            format: None,
        }
    }
}

/// What the provider reports after a successful upload.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ProviderAsset {
    pub public_id: String,
    #[serde(default)]
    pub bytes: Option<i64>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub secure_url: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Response body of the image upload endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ImageUploadResponse {
    pub public_id: String,
}
