//! Explicit design-session handle.
//!
//! Created once on first use, invalidated when the room photo changes.
//! Session calls run under their own cancellation token so cancelling a
//! render never aborts session setup and vice versa.

use scenesync_core::{RetryPolicy, SessionId};

use crate::cancel::CancellationToken;
use crate::error::CallError;
use crate::executor::execute;
use crate::service::SessionService;

#[derive(Debug, Default)]
pub struct SessionHandle {
    id: Option<SessionId>,
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle for a session id recovered from elsewhere (e.g. a page reload).
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id: Some(id),
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    /// Return the current session, creating one if none exists yet.
    pub async fn ensure<S>(&mut self, service: &S, policy: &RetryPolicy) -> Result<SessionId, CallError>
    where
        S: SessionService + ?Sized,
    {
        if let Some(id) = &self.id {
            return Ok(id.clone());
        }
        let cancel = self.cancel.clone();
        let id = execute(policy, &cancel, |_| service.create_session()).await?;
        tracing::info!(session = %id, "design session created");
        self.id = Some(id.clone());
        Ok(id)
    }

    /// Confirm a recovered session id with the service, replacing it with
    /// whatever id the service answers with.
    pub async fn resume<S>(&mut self, service: &S, policy: &RetryPolicy) -> Result<Option<SessionId>, CallError>
    where
        S: SessionService + ?Sized,
    {
        let Some(current) = self.id.clone() else {
            return Ok(None);
        };
        let cancel = self.cancel.clone();
        let id = execute(policy, &cancel, |_| service.resume_session(&current)).await?;
        if id != current {
            tracing::info!(previous = %current, session = %id, "session resumed under new id");
        }
        self.id = Some(id.clone());
        Ok(Some(id))
    }

    /// Drop the session and abort any session call still in flight.
    pub fn invalidate(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        if let Some(id) = self.id.take() {
            tracing::debug!(session = %id, "design session invalidated");
        }
    }
}
