//! Error types for scenesync-sync.

use thiserror::Error;

use scenesync_client::CallError;

/// A render trigger refused before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no room image has been uploaded")]
    NoRoomImage,

    #[error("no products are placed in the room")]
    NoItems,
}

/// All errors that can arise from synchronization operations.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The render call (or a session call) failed after the executor gave up.
    #[error("render call failed: {0}")]
    Call(#[from] CallError),

    #[error("a render is already in progress")]
    RenderInFlight,

    #[error("prompt template error: {0}")]
    Prompt(#[from] tera::Error),

    #[error("prompt template io error at {path}: {source}")]
    TemplateIo {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    /// Text suitable for showing to the person editing the room.
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Validation(ValidationError::NoRoomImage) => {
                "Upload a room photo before visualizing.".to_string()
            }
            SyncError::Validation(ValidationError::NoItems) => {
                "Add at least one product to visualize.".to_string()
            }
            SyncError::Call(CallError::RemoteRejection { detail, .. }) => detail.clone(),
            SyncError::Call(CallError::Timeout { .. }) => {
                "The visualization took too long. Please try again.".to_string()
            }
            SyncError::Call(CallError::Transport(_)) => {
                "Could not reach the visualization service. Check your connection and try again."
                    .to_string()
            }
            SyncError::Call(CallError::RemoteFailure { .. }) => {
                "The visualization service is having trouble. Please try again shortly.".to_string()
            }
            SyncError::Call(CallError::EmptyResult(_)) => {
                "The visualization came back empty. Please try again.".to_string()
            }
            SyncError::Call(CallError::Cancelled) => "Visualization cancelled.".to_string(),
            SyncError::RenderInFlight => "A visualization is already in progress.".to_string(),
            other => format!("Visualization failed: {other}"),
        }
    }
}

pub(crate) fn template_io_err(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::TemplateIo {
        path: path.into(),
        source,
    }
}
