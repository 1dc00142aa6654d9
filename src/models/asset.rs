//! Represents an uploaded media item as persisted in the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A media asset whose bytes live at the processing provider.
///
/// The record only carries the provider reference (`public_id`) and the
/// metadata captured at upload time. Every derived URL is built from
/// `public_id`, so the record is never mutated after creation.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaAsset {
    /// Unique identifier assigned by the store.
    pub id: Uuid,

    /// Short label shown in the gallery.
    pub title: String,

    /// Optional free-text description.
    pub description: Option<String>,

    /// Stable reference returned by the processing provider.
    pub public_id: String,

    /// Byte count of the source upload.
    pub original_size: i64,

    /// Byte count reported by the provider after transcoding, if any.
    pub compressed_size: Option<i64>,

    /// Duration in seconds (video only).
    pub duration: Option<f64>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,
}

/// Fields supplied by the upload path; the store assigns `id` and `created_at`.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMediaAsset {
    pub title: String,
    pub description: Option<String>,
    pub public_id: String,
    pub original_size: i64,
    pub compressed_size: Option<i64>,
    pub duration: Option<f64>,
}
