//! Defines routes for uploads, the gallery and health probes.
//!
//! ## Structure
//! - **Uploads**
//!   - `POST /api/video-upload`: authenticated video upload, returns the record
//!   - `POST /api/image-upload`: anonymous image upload, returns `{ publicId }`
//!
//! - **Gallery and presets**
//!   - `GET  /api/videos`: all recorded videos, newest first
//!   - `GET  /api/presets`: effect names and social formats
//!
//! - **Probes**
//!   - `GET  /healthz`, `GET /readyz`

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        media_handlers::{list_presets, list_videos, upload_image, upload_video},
    },
    state::AppState,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

/// Build and return the router for all studio routes.
///
/// `max_upload_bytes` caps every request body, which bounds the per-request
/// file buffer.
pub fn routes(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // uploads
        .route("/api/video-upload", post(upload_video))
        .route("/api/image-upload", post(upload_image))
        // gallery
        .route("/api/videos", get(list_videos))
        .route("/api/presets", get(list_presets))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
}
