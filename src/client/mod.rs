//! Client side of the studio: talks to a running server, drives the upload
//! state machine and saves derived assets.

pub mod api;
pub mod download;
pub mod progress;
pub mod workflow;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Api(#[from] api::ApiClientError),
    #[error(transparent)]
    Workflow(#[from] workflow::WorkflowError),
    #[error(transparent)]
    Download(#[from] download::DownloadError),
}
