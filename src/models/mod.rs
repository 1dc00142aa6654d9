//! Core data models for the media studio.
//!
//! `asset` maps to the `media_assets` table via `sqlx::FromRow` and
//! serializes as camelCase JSON; `upload` holds request inputs and the
//! provider's upload answer.

pub mod asset;
pub mod upload;
