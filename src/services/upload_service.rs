//! Upload and listing workflow.
//!
//! `UploadService` is a pure function of (input, caller capability,
//! collaborators): it holds no mutable state, so concurrent requests only
//! share the store's own concurrency control.
//!
//! A video upload performs exactly one provider call and one store write.
//! If the write fails the provider keeps the asset; that orphan is logged
//! and left for a separate reconciliation pass.

use crate::{
    auth::Capability,
    models::{
        asset::{MediaAsset, NewMediaAsset},
        upload::{ImageUploadResponse, UploadOptions, UploadRequest, UploadedFile},
    },
    services::{
        media_processor::{MediaProcessor, ProcessorError},
        media_store::{MediaStore, StoreError},
    },
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("no file provided")]
    MissingFile,
    #[error("remote upload failed: {0}")]
    Remote(#[from] ProcessorError),
    #[error("saving media `{public_id}` failed: {source}")]
    Persistence {
        public_id: String,
        #[source]
        source: StoreError,
    },
}

#[derive(Clone)]
pub struct UploadService {
    store: Arc<dyn MediaStore>,
    processor: Arc<dyn MediaProcessor>,
}

impl UploadService {
    pub fn new(store: Arc<dyn MediaStore>, processor: Arc<dyn MediaProcessor>) -> Self {
        Self { store, processor }
    }

    /// Upload a video for an authenticated caller and record it.
    #[instrument(skip(self, caller, request), fields(user = tracing::field::Empty))]
    pub async fn upload_video(
        &self,
        caller: Option<&Capability>,
        request: UploadRequest,
    ) -> Result<MediaAsset, UploadError> {
        let capability = caller.ok_or(UploadError::Unauthenticated)?;
        tracing::Span::current().record("user", capability.user_id.as_str());

        let file = non_empty(request.file)?;
        let original_size = file.len() as i64;
        if let Some(declared) = request.declared_size {
            if declared != original_size {
                debug!(
                    "declared size {} differs from received {} bytes",
                    declared, original_size
                );
            }
        }

        let uploaded = self.processor.upload(&file, &UploadOptions::video()).await?;

        let asset = NewMediaAsset {
            title: request
                .title
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| file.filename.clone()),
            description: request
                .description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
            public_id: uploaded.public_id.clone(),
            original_size,
            compressed_size: uploaded.bytes,
            duration: uploaded.duration,
        };

        match self.store.create(asset).await {
            Ok(record) => {
                info!(
                    "stored video {} ({} -> {:?} bytes)",
                    record.public_id, record.original_size, record.compressed_size
                );
                Ok(record)
            }
            Err(source) => {
                warn!(
                    public_id = %uploaded.public_id,
                    "provider asset has no record after store failure: {}", source
                );
                Err(UploadError::Persistence {
                    public_id: uploaded.public_id,
                    source,
                })
            }
        }
    }

    /// Upload an image for previewing; nothing is persisted and no
    /// capability is required.
    #[instrument(skip(self, file))]
    pub async fn upload_image(
        &self,
        file: Option<UploadedFile>,
    ) -> Result<ImageUploadResponse, UploadError> {
        let file = non_empty(file)?;
        let uploaded = self.processor.upload(&file, &UploadOptions::image()).await?;
        info!("uploaded image {}", uploaded.public_id);
        Ok(ImageUploadResponse {
            public_id: uploaded.public_id,
        })
    }

    /// All recorded videos, newest first.
    pub async fn list_videos(&self) -> Result<Vec<MediaAsset>, StoreError> {
        self.store.list_newest_first().await
    }

    pub async fn store_ready(&self) -> Result<(), StoreError> {
        self.store.ping().await
    }
}

fn non_empty(file: Option<UploadedFile>) -> Result<UploadedFile, UploadError> {
    match file {
        Some(file) if !file.is_empty() => Ok(file),
        _ => Err(UploadError::MissingFile),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        models::upload::{MediaKind, ProviderAsset},
        services::{
            media_processor::ProcessorResult,
            media_store::{SqliteMediaStore, StoreResult, tests::memory_store},
        },
    };
    use async_trait::async_trait;
    use bytes::Bytes;
    use reqwest::StatusCode;
    use std::sync::{
        Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    };

    /// Provider double that hands out sequential ids.
    #[derive(Default)]
    pub(crate) struct FakeProcessor {
        pub calls: AtomicUsize,
        pub fail: AtomicBool,
        pub kinds: Mutex<Vec<MediaKind>>,
    }

    #[async_trait]
    impl MediaProcessor for FakeProcessor {
        async fn upload(
            &self,
            file: &UploadedFile,
            options: &UploadOptions,
        ) -> ProcessorResult<ProviderAsset> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            self.kinds.lock().unwrap().push(options.kind);
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProcessorError::Rejected {
                    status: StatusCode::BAD_GATEWAY,
                    message: "provider down".into(),
                });
            }
            Ok(ProviderAsset {
                public_id: format!("{}/asset-{n}", options.folder),
                bytes: Some(file.len() as i64 / 2),
                duration: (options.kind == MediaKind::Video).then_some(4.0),
                secure_url: None,
                format: options.format.clone(),
            })
        }
    }

    /// Store double counting writes, optionally failing them.
    pub(crate) struct CountingStore {
        pub inner: SqliteMediaStore,
        pub writes: AtomicUsize,
        pub fail: AtomicBool,
    }

    impl CountingStore {
        pub(crate) async fn new() -> Self {
            Self {
                inner: memory_store().await,
                writes: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl MediaStore for CountingStore {
        async fn create(&self, asset: NewMediaAsset) -> StoreResult<MediaAsset> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreError::Sqlx(sqlx::Error::PoolClosed));
            }
            self.inner.create(asset).await
        }

        async fn list_newest_first(&self) -> StoreResult<Vec<MediaAsset>> {
            self.inner.list_newest_first().await
        }

        async fn ping(&self) -> StoreResult<()> {
            self.inner.ping().await
        }
    }

    pub(crate) async fn service() -> (UploadService, Arc<FakeProcessor>, Arc<CountingStore>) {
        let processor = Arc::new(FakeProcessor::default());
        let store = Arc::new(CountingStore::new().await);
        let service = UploadService::new(store.clone(), processor.clone());
        (service, processor, store)
    }

    fn user() -> Capability {
        Capability {
            user_id: "user_1".into(),
        }
    }

    fn video(bytes: &'static [u8]) -> UploadRequest {
        UploadRequest {
            file: Some(UploadedFile {
                filename: "holiday.mp4".into(),
                content_type: Some("video/mp4".into()),
                bytes: Bytes::from_static(bytes),
            }),
            title: Some("Holiday".into()),
            description: Some("  ".into()),
            declared_size: Some(999),
        }
    }

    #[tokio::test]
    async fn video_upload_records_received_size() {
        let (service, processor, store) = service().await;

        let record = service
            .upload_video(Some(&user()), video(b"0123456789"))
            .await
            .unwrap();

        assert!(!record.public_id.is_empty());
        assert_eq!(record.original_size, 10);
        assert_eq!(record.compressed_size, Some(5));
        assert_eq!(record.duration, Some(4.0));
        assert_eq!(record.title, "Holiday");
        assert_eq!(record.description, None);
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
        assert_eq!(*processor.kinds.lock().unwrap(), vec![MediaKind::Video]);
    }

    #[tokio::test]
    async fn missing_title_falls_back_to_filename() {
        let (service, _, _) = service().await;
        let mut request = video(b"abc");
        request.title = None;

        let record = service.upload_video(Some(&user()), request).await.unwrap();

        assert_eq!(record.title, "holiday.mp4");
    }

    #[tokio::test]
    async fn unauthenticated_video_touches_nothing() {
        let (service, processor, store) = service().await;

        let err = service.upload_video(None, video(b"abc")).await.unwrap_err();

        assert!(matches!(err, UploadError::Unauthenticated));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_file_touches_nothing() {
        let (service, processor, store) = service().await;
        let mut request = video(b"");
        let err = service
            .upload_video(Some(&user()), request.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, UploadError::MissingFile));

        request.file = None;
        let err = service.upload_video(Some(&user()), request).await.unwrap_err();
        assert!(matches!(err, UploadError::MissingFile));

        let err = service.upload_image(None).await.unwrap_err();
        assert!(matches!(err, UploadError::MissingFile));

        assert_eq!(processor.calls.load(Ordering::SeqCst), 0);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn remote_failure_skips_persistence() {
        let (service, processor, store) = service().await;
        processor.fail.store(true, Ordering::SeqCst);

        let err = service
            .upload_video(Some(&user()), video(b"abc"))
            .await
            .unwrap_err();

        assert!(matches!(err, UploadError::Remote(_)));
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn store_failure_reports_orphaned_asset() {
        let (service, processor, store) = service().await;
        store.fail.store(true, Ordering::SeqCst);

        let err = service
            .upload_video(Some(&user()), video(b"abc"))
            .await
            .unwrap_err();

        match err {
            UploadError::Persistence { public_id, .. } => {
                assert_eq!(public_id, "video-uploads/asset-0")
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(processor.calls.load(Ordering::SeqCst), 1);
        assert!(service.list_videos().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_upload_needs_no_capability_and_stores_nothing() {
        let (service, processor, store) = service().await;

        let response = service
            .upload_image(video(b"png bytes").file)
            .await
            .unwrap();

        assert_eq!(response.public_id, "image-uploads/asset-0");
        assert_eq!(*processor.kinds.lock().unwrap(), vec![MediaKind::Image]);
        assert_eq!(store.writes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn listing_returns_every_upload_newest_first() {
        let (service, _, _) = service().await;
        for _ in 0..3 {
            service
                .upload_video(Some(&user()), video(b"frames"))
                .await
                .unwrap();
        }

        let listed = service.list_videos().await.unwrap();

        assert_eq!(listed.len(), 3);
        assert!(
            listed
                .windows(2)
                .all(|pair| pair[0].created_at >= pair[1].created_at)
        );
    }
}
