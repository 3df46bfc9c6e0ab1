//! Seams for the external collaborators. Each is opaque to the engine.

use async_trait::async_trait;

use scenesync_core::SessionId;

use crate::error::CallError;
use crate::protocol::{PersistedHistory, RenderRequest, RenderResponse};

/// The image-generation service.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderResponse, CallError>;
}

/// Create or resume a design session.
#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create_session(&self) -> Result<SessionId, CallError>;

    async fn resume_session(&self, id: &SessionId) -> Result<SessionId, CallError>;
}

/// Optional server-side persistence of undo/redo state.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// `None` when the server has no history for the session.
    async fn load(&self, session: &SessionId) -> Result<Option<PersistedHistory>, CallError>;

    async fn save(&self, session: &SessionId, history: &PersistedHistory) -> Result<(), CallError>;
}
