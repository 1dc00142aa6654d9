//! HTTP handlers for uploads, the video gallery and preset tables.
//! Multipart bodies are buffered per request and handed to `UploadService`.

use crate::{
    auth::Caller,
    errors::AppError,
    models::{
        asset::MediaAsset,
        upload::{ImageUploadResponse, UploadRequest, UploadedFile},
    },
    services::upload_service::UploadError,
    state::AppState,
    transform::presets::{PresetCatalog, catalog},
};
use axum::{
    Json,
    extract::{
        Multipart, State,
        multipart::{Field, MultipartError, MultipartRejection},
    },
};
use tracing::instrument;

/// POST `/api/video-upload`: authenticated; uploads and records a video.
#[instrument(skip_all)]
pub async fn upload_video(
    State(state): State<AppState>,
    caller: Caller,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MediaAsset>, AppError> {
    // Reject before looking at the body.
    let capability = caller.capability().ok_or(UploadError::Unauthenticated)?;
    let multipart =
        multipart.map_err(|rejection| AppError::new(rejection.status(), rejection.body_text()))?;
    let request = read_upload_form(multipart).await?;
    let record = state.uploads.upload_video(Some(capability), request).await?;
    Ok(Json(record))
}

/// POST `/api/image-upload`: anonymous; returns the provider reference only.
#[instrument(skip_all)]
pub async fn upload_image(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageUploadResponse>, AppError> {
    let request = read_upload_form(multipart).await?;
    let response = state.uploads.upload_image(request.file).await?;
    Ok(Json(response))
}

/// GET `/api/videos`: every recorded video, newest first.
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<MediaAsset>>, AppError> {
    Ok(Json(state.uploads.list_videos().await?))
}

/// GET `/api/presets`: effect names and social formats.
pub async fn list_presets() -> Json<PresetCatalog> {
    Json(catalog())
}

/// Collect the known form fields; unknown fields are ignored.
async fn read_upload_form(mut multipart: Multipart) -> Result<UploadRequest, AppError> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        match field.name() {
            Some("file") => {
                let filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(|s| s.to_string());
                let bytes = field.bytes().await.map_err(multipart_error)?;
                request.file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes,
                });
            }
            Some("title") => request.title = Some(text(field).await?),
            Some("description") => request.description = Some(text(field).await?),
            Some("originalSize") => {
                let raw = text(field).await?;
                request.declared_size = Some(raw.trim().parse().map_err(|_| {
                    AppError::bad_request(format!("originalSize `{}` is not a number", raw))
                })?);
            }
            _ => {}
        }
    }

    Ok(request)
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(multipart_error)
}

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), err.body_text())
}

#[cfg(test)]
mod tests {
    use crate::{
        auth::{TokenVerifier, tests::{SECRET, issue}},
        routes::routes::routes,
        services::upload_service::{
            UploadService,
            tests::{CountingStore, FakeProcessor},
        },
        state::AppState,
    };
    use axum::{
        Router,
        body::Body,
        http::{Request, StatusCode, header},
    };
    use chrono::Duration;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use std::sync::{Arc, atomic::Ordering};
    use tower::ServiceExt;

    const BOUNDARY: &str = "studio-test-boundary";

    struct Harness {
        app: Router,
        processor: Arc<FakeProcessor>,
        store: Arc<CountingStore>,
    }

    async fn harness() -> Harness {
        let processor = Arc::new(FakeProcessor::default());
        let store = Arc::new(CountingStore::new().await);
        let state = AppState {
            uploads: UploadService::new(store.clone(), processor.clone()),
            verifier: Arc::new(TokenVerifier::new(SECRET)),
        };
        Harness {
            app: routes(1024 * 1024).with_state(state),
            processor,
            store,
        }
    }

    /// Hand-built multipart body; `file` is (filename, bytes).
    fn form(fields: &[(&str, &str)], file: Option<(&str, &[u8])>) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((filename, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn post(uri: &str, body: Vec<u8>, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        );
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn video_upload_returns_record() {
        let h = harness().await;
        let token = issue(SECRET, "user_7", Duration::minutes(5));
        let body = form(
            &[("title", "Trip"), ("description", "Alps"), ("originalSize", "8")],
            Some(("trip.mov", b"12345678")),
        );

        let response = h
            .app
            .oneshot(post("/api/video-upload", body, Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let record = json(response).await;
        assert_eq!(record["title"], "Trip");
        assert_eq!(record["description"], "Alps");
        assert_eq!(record["originalSize"], 8);
        assert_eq!(record["publicId"], "video-uploads/asset-0");
        assert!(record["createdAt"].is_string());
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn video_upload_without_token_is_401() {
        let h = harness().await;
        let body = form(&[("title", "Trip")], Some(("trip.mov", b"1234")));

        let response = h
            .app
            .oneshot(post("/api/video-upload", body, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json(response).await["error"], "Unauthorized");
        assert_eq!(h.processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn anonymous_non_multipart_body_is_401() {
        let h = harness().await;

        let json_body = Request::post("/api/video-upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();
        let response = h.app.clone().oneshot(json_body).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let bare = Request::post("/api/video-upload")
            .body(Body::empty())
            .unwrap();
        let response = h.app.oneshot(bare).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(h.processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn authenticated_non_multipart_body_is_400() {
        let h = harness().await;
        let token = issue(SECRET, "user_7", Duration::minutes(5));

        let request = Request::post("/api/video-upload")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from("{}"))
            .unwrap();
        let response = h.app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forged_token_is_401() {
        let h = harness().await;
        let token = issue(b"not-the-secret", "user_7", Duration::minutes(5));
        let body = form(&[], Some(("trip.mov", b"1234")));

        let response = h
            .app
            .oneshot(post("/api/video-upload", body, Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn video_upload_without_file_is_400() {
        let h = harness().await;
        let token = issue(SECRET, "user_7", Duration::minutes(5));
        let body = form(&[("title", "Trip")], None);

        let response = h
            .app
            .oneshot(post("/api/video-upload", body, Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(h.processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_failure_is_500() {
        let h = harness().await;
        h.processor.fail.store(true, Ordering::SeqCst);
        let token = issue(SECRET, "user_7", Duration::minutes(5));
        let body = form(&[], Some(("trip.mov", b"1234")));

        let response = h
            .app
            .oneshot(post("/api/video-upload", body, Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn image_upload_is_anonymous() {
        let h = harness().await;
        let body = form(&[], Some(("cat.png", b"\x89PNG")));

        let response = h
            .app
            .oneshot(post("/api/image-upload", body, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            json(response).await,
            serde_json::json!({ "publicId": "image-uploads/asset-0" })
        );
        assert_eq!(h.store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected() {
        let h = harness().await;
        let big = vec![0u8; 2 * 1024 * 1024];
        let body = form(&[], Some(("huge.png", &big)));

        let response = h
            .app
            .oneshot(post("/api/image-upload", body, None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(h.processor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn listing_returns_uploads_newest_first() {
        let h = harness().await;
        let token = issue(SECRET, "user_7", Duration::minutes(5));
        for title in ["first", "second"] {
            let body = form(&[("title", title)], Some(("clip.mov", b"1234")));
            let response = h
                .app
                .clone()
                .oneshot(post("/api/video-upload", body, Some(&token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let response = h
            .app
            .oneshot(Request::get("/api/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let listed = json(response).await;
        let titles: Vec<_> = listed
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, ["second", "first"]);
    }

    #[tokio::test]
    async fn listing_store_failure_is_500() {
        let h = harness().await;
        h.store.inner.db.close().await;

        let response = h
            .app
            .oneshot(Request::get("/api/videos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn presets_expose_tables() {
        let h = harness().await;

        let response = h
            .app
            .oneshot(Request::get("/api/presets").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json(response).await;
        assert_eq!(body["effects"][0], "None");
        assert_eq!(body["formats"][3]["name"], "Twitter Header (3:1)");
        assert_eq!(body["formats"][3]["width"], 1500);
    }
}
