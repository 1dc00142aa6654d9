//! Client-side upload and preview state machine.
//!
//! ```text
//! Idle -> Uploading -> Uploaded -> Ready
//!                         |          ^  |
//!                         v          |  v
//!                   AwaitingTransform <-+  (preset or prompt changed)
//! ```
//!
//! A failed upload returns to `Idle`. A derived image that fails to load
//! still settles into `Ready`: nothing is written, the preview is simply
//! empty.

use crate::{
    client::{
        ClientError,
        api::ApiClientError,
        progress::{self, SimulatedProgress},
    },
    transform::{delivery::DeliveryUrlBuilder, presets::Preset},
};
use std::future::Future;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    Uploading,
    Uploaded { public_id: String },
    AwaitingTransform { public_id: String },
    Ready { public_id: String },
}

impl WorkflowState {
    fn name(&self) -> &'static str {
        match self {
            WorkflowState::Idle => "idle",
            WorkflowState::Uploading => "uploading",
            WorkflowState::Uploaded { .. } => "uploaded",
            WorkflowState::AwaitingTransform { .. } => "awaiting-transform",
            WorkflowState::Ready { .. } => "ready",
        }
    }

    fn public_id(&self) -> Option<&str> {
        match self {
            WorkflowState::Uploaded { public_id }
            | WorkflowState::AwaitingTransform { public_id }
            | WorkflowState::Ready { public_id } => Some(public_id),
            WorkflowState::Idle | WorkflowState::Uploading => None,
        }
    }
}

/// How loading the derived image ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageLoad {
    Loaded,
    Failed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("cannot {event} while {state}")]
    InvalidTransition {
        event: &'static str,
        state: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct UploadWorkflow {
    state: WorkflowState,
    preset: Preset,
    progress: SimulatedProgress,
}

impl UploadWorkflow {
    pub fn new(preset: Preset) -> Self {
        Self {
            state: WorkflowState::Idle,
            preset,
            progress: SimulatedProgress::default(),
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn preset(&self) -> &Preset {
        &self.preset
    }

    pub fn progress(&self) -> &SimulatedProgress {
        &self.progress
    }

    pub fn public_id(&self) -> Option<&str> {
        self.state.public_id()
    }

    /// The derived image is shown only once it has settled.
    pub fn is_image_visible(&self) -> bool {
        matches!(self.state, WorkflowState::Ready { .. })
    }

    fn invalid(&self, event: &'static str) -> WorkflowError {
        WorkflowError::InvalidTransition {
            event,
            state: self.state.name(),
        }
    }

    fn transition(&mut self, next: WorkflowState) {
        debug!("workflow {} -> {}", self.state.name(), next.name());
        self.state = next;
    }

    pub fn begin_upload(&mut self) -> Result<(), WorkflowError> {
        if self.state == WorkflowState::Uploading {
            return Err(self.invalid("begin upload"));
        }
        self.progress.start();
        self.transition(WorkflowState::Uploading);
        Ok(())
    }

    /// Advance the simulated indicator; no effect outside an upload.
    pub fn progress_tick(&mut self) -> u8 {
        if self.state == WorkflowState::Uploading {
            self.progress.tick();
        }
        self.progress.value()
    }

    pub fn upload_succeeded(&mut self, public_id: String) -> Result<(), WorkflowError> {
        if self.state != WorkflowState::Uploading {
            return Err(self.invalid("finish upload"));
        }
        self.progress.complete();
        self.transition(WorkflowState::Uploaded { public_id });
        Ok(())
    }

    pub fn upload_failed(&mut self) -> Result<(), WorkflowError> {
        if self.state != WorkflowState::Uploading {
            return Err(self.invalid("fail upload"));
        }
        self.progress.reset();
        self.transition(WorkflowState::Idle);
        Ok(())
    }

    pub fn hide_progress(&mut self) {
        self.progress.hide();
    }

    /// Change the preset. Returns whether the displayed image was invalidated.
    pub fn select(&mut self, preset: Preset) -> Result<bool, WorkflowError> {
        if preset == self.preset {
            return Ok(false);
        }
        self.preset = preset;
        Ok(self.invalidate_displayed())
    }

    /// Edit the background-fill prompt; only meaningful for that preset.
    pub fn set_prompt(&mut self, prompt: &str) -> Result<bool, WorkflowError> {
        let Preset::BackgroundFill { format, .. } = &self.preset else {
            return Err(self.invalid("set a prompt"));
        };
        let next = Preset::background_fill(*format, Some(prompt));
        self.select(next)
    }

    /// Re-request the current preset (the "Apply" button).
    pub fn apply(&mut self) -> Result<(), WorkflowError> {
        match &self.state {
            WorkflowState::Uploaded { public_id } | WorkflowState::Ready { public_id } => {
                let public_id = public_id.clone();
                self.transition(WorkflowState::AwaitingTransform { public_id });
                Ok(())
            }
            _ => Err(self.invalid("apply")),
        }
    }

    /// The derived image finished loading, successfully or not.
    pub fn image_settled(&mut self, outcome: ImageLoad) -> Result<(), WorkflowError> {
        match &self.state {
            WorkflowState::Uploaded { public_id }
            | WorkflowState::AwaitingTransform { public_id } => {
                if outcome == ImageLoad::Failed {
                    debug!("derived image for {} failed to load", public_id);
                }
                let public_id = public_id.clone();
                self.transition(WorkflowState::Ready { public_id });
                Ok(())
            }
            _ => Err(self.invalid("settle an image")),
        }
    }

    /// URL of the derived image for the current preset, once uploaded.
    pub fn display_url(&self, builder: &DeliveryUrlBuilder) -> Option<String> {
        self.public_id()
            .map(|public_id| builder.preset_url(public_id, &self.preset))
    }

    fn invalidate_displayed(&mut self) -> bool {
        let public_id = match &self.state {
            WorkflowState::Uploaded { public_id }
            | WorkflowState::AwaitingTransform { public_id }
            | WorkflowState::Ready { public_id } => public_id.clone(),
            WorkflowState::Idle | WorkflowState::Uploading => return false,
        };
        self.transition(WorkflowState::AwaitingTransform { public_id });
        true
    }
}

/// Drive one upload: tick the cosmetic indicator while `upload` is pending,
/// then apply its outcome to the workflow.
///
/// `on_progress` receives every displayed value, ending with 100 on success
/// or 0 on failure.
pub async fn run_upload<Fut>(
    workflow: &mut UploadWorkflow,
    upload: Fut,
    mut on_progress: impl FnMut(u8),
) -> Result<String, ClientError>
where
    Fut: Future<Output = Result<String, ApiClientError>>,
{
    workflow.begin_upload()?;
    on_progress(workflow.progress().value());

    let mut ticker = tokio::time::interval(progress::TICK);
    // First tick completes immediately.
    ticker.tick().await;
    tokio::pin!(upload);

    let outcome = loop {
        tokio::select! {
            result = &mut upload => break result,
            _ = ticker.tick() => on_progress(workflow.progress_tick()),
        }
    };

    match outcome {
        Ok(public_id) => {
            workflow.upload_succeeded(public_id.clone())?;
            on_progress(workflow.progress().value());
            tokio::time::sleep(progress::HOLD).await;
            workflow.hide_progress();
            Ok(public_id)
        }
        Err(err) => {
            workflow.upload_failed()?;
            on_progress(workflow.progress().value());
            workflow.hide_progress();
            Err(err.into())
        }
    }
}
