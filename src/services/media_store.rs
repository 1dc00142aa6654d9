//! Persistence boundary for media asset records.
//!
//! `SqliteMediaStore` keeps one row per uploaded asset in `media_assets`.
//! Records are inserted once and listed newest first; nothing here updates
//! or deletes a row.

use crate::models::asset::{MediaAsset, NewMediaAsset};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

/// Schema applied by `migrate`.
pub const MIGRATION_SQL: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Persist a new record, assigning its id and creation time.
    async fn create(&self, asset: NewMediaAsset) -> StoreResult<MediaAsset>;

    /// Every record, most recent first.
    async fn list_newest_first(&self) -> StoreResult<Vec<MediaAsset>>;

    /// Lightweight connectivity probe used by `/readyz`.
    async fn ping(&self) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct SqliteMediaStore {
    /// Shared SQLite connection pool.
    pub db: Arc<SqlitePool>,
}

impl SqliteMediaStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MediaStore for SqliteMediaStore {
    async fn create(&self, asset: NewMediaAsset) -> StoreResult<MediaAsset> {
        let record = sqlx::query_as::<_, MediaAsset>(
            r#"
            INSERT INTO media_assets (
                id, title, description, public_id, original_size,
                compressed_size, duration, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id, title, description, public_id, original_size,
                      compressed_size, duration, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&asset.title)
        .bind(&asset.description)
        .bind(&asset.public_id)
        .bind(asset.original_size)
        .bind(asset.compressed_size)
        .bind(asset.duration)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await?;

        debug!("stored media asset {} ({})", record.id, record.public_id);
        Ok(record)
    }

    async fn list_newest_first(&self) -> StoreResult<Vec<MediaAsset>> {
        let rows = sqlx::query_as::<_, MediaAsset>(
            "SELECT id, title, description, public_id, original_size,
                    compressed_size, duration, created_at
             FROM media_assets
             ORDER BY created_at DESC, id ASC",
        )
        .fetch_all(&*self.db)
        .await?;
        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }
}

/// Apply the embedded schema statement by statement.
pub async fn migrate(db: &SqlitePool) -> StoreResult<usize> {
    let statements = MIGRATION_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>();

    for stmt in &statements {
        debug!("Executing migration SQL: {}", stmt);
        sqlx::query(stmt).execute(db).await?;
    }

    Ok(statements.len())
}
