//! Synchronization orchestrator. Owns the scene, the rendered baseline, the
//! history, and the session handle, and decides when to render.
//!
//! # Render lifecycle
//!
//! ```text
//! begin_render()  validate → classify → build request → new generation + token
//! ticket.run()    execute the request through the retrying executor
//! commit(result)  apply only if the ticket is still the latest generation
//! ```
//!
//! [`SyncOrchestrator::render`] chains the three. Splitting them lets a caller
//! keep editing while a render is outstanding; any later `begin_render`,
//! `undo`, `redo`, or `set_room_image` makes the outstanding ticket stale, and
//! a stale ticket never touches the baseline.
//!
//! A ticket dropped before it is committed cancels itself, which frees the
//! in-flight slot for the next `begin_render`.

use std::fmt;

use scenesync_client::{
    execute, CallError, CancellationToken, HistoryStore, PersistedHistory, RenderRequest, Renderer,
    SessionHandle, SessionService,
};
use scenesync_core::{
    HistoryEntry, ImageRef, OverlapPolicy, RenderedBaseline, RetryPolicy, SceneSnapshot, SessionId,
    SyncConfig,
};

use crate::classifier::{classify_with_fallback, ChangeDescriptor};
use crate::error::{SyncError, ValidationError};
use crate::history::HistoryController;
use crate::prompt::PromptRenderer;
use crate::request;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Whether the Visualize action is meaningful right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No room photo, or nothing placed and nothing shown to remove.
    NotReady,
    ReadyToRender,
    /// The displayed image already shows the current scene.
    UpToDate,
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Readiness::NotReady => "not ready",
            Readiness::ReadyToRender => "ready to render",
            Readiness::UpToDate => "up to date",
        };
        f.write_str(s)
    }
}

/// What a completed render did to the orchestrator's state.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// Nothing changed since the last render; no call was made.
    Skipped,
    /// The baseline now shows `entry`.
    Rendered {
        entry: HistoryEntry,
        descriptor: ChangeDescriptor,
    },
    /// A newer render, undo, redo, or room change overtook this one; its
    /// result was discarded.
    Superseded { generation: u64 },
}

/// Cancels the wrapped token when dropped.
#[derive(Debug)]
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// One issued render: the request plus what it needs to commit.
#[derive(Debug)]
pub struct RenderTicket {
    generation: u64,
    cancel: CancelOnDrop,
    policy: RetryPolicy,
    request: RenderRequest,
    snapshot: SceneSnapshot,
    descriptor: ChangeDescriptor,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn request(&self) -> &RenderRequest {
        &self.request
    }

    pub fn descriptor(&self) -> &ChangeDescriptor {
        &self.descriptor
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.0.is_cancelled()
    }

    /// Perform the render. A response without a usable image fails the
    /// attempt with `EmptyResult`.
    pub async fn run<R>(self, renderer: &R) -> TicketResult
    where
        R: Renderer + ?Sized,
    {
        let generation = self.generation;
        let request = &self.request;
        let snapshot = &self.snapshot;
        tracing::info!(generation, mode = ?request.mode, "render started");

        let result = execute(&self.policy, &self.cancel.0, |attempt| async move {
            tracing::debug!(generation, attempt, "render attempt");
            let response = renderer.render(request).await?;
            let image = response.image()?.clone();
            if response.confirms(snapshot) == Some(false) {
                tracing::warn!(
                    generation,
                    reported = response.products_in_scene.len(),
                    expected = snapshot.len(),
                    "renderer reports a different scene than requested",
                );
            }
            Ok(image)
        })
        .await;

        TicketResult { ticket: self, result }
    }
}

/// A finished ticket waiting to be committed.
#[derive(Debug)]
pub struct TicketResult {
    ticket: RenderTicket,
    result: Result<ImageRef, CallError>,
}

impl TicketResult {
    pub fn generation(&self) -> u64 {
        self.ticket.generation
    }

    pub fn result(&self) -> Result<&ImageRef, &CallError> {
        self.result.as_ref()
    }
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    cancel: CancellationToken,
}

// ---------------------------------------------------------------------------
// SyncOrchestrator
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct SyncOrchestrator {
    room_image: Option<ImageRef>,
    current: SceneSnapshot,
    baseline: Option<RenderedBaseline>,
    /// Items of the last successful render, kept to repair an empty baseline.
    previous_rendered: Option<SceneSnapshot>,
    history: HistoryController,
    session: SessionHandle,
    render_policy: RetryPolicy,
    session_policy: RetryPolicy,
    overlap: OverlapPolicy,
    prompts: PromptRenderer,
    generation: u64,
    in_flight: Option<InFlight>,
}

impl SyncOrchestrator {
    pub fn new(config: &SyncConfig, prompts: PromptRenderer) -> Self {
        Self {
            room_image: None,
            current: SceneSnapshot::empty(),
            baseline: None,
            previous_rendered: None,
            history: HistoryController::new(config.history_capacity),
            session: SessionHandle::new(),
            render_policy: config.render_retry,
            session_policy: config.session_retry,
            overlap: config.overlap,
            prompts,
            generation: 0,
            in_flight: None,
        }
    }

    /// Build with prompt templates loaded from `config.template_dir`.
    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let prompts = PromptRenderer::new(config.template_dir.as_deref())?;
        Ok(Self::new(config, prompts))
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn room_image(&self) -> Option<&ImageRef> {
        self.room_image.as_ref()
    }

    pub fn current_scene(&self) -> &SceneSnapshot {
        &self.current
    }

    pub fn baseline(&self) -> Option<&RenderedBaseline> {
        self.baseline.as_ref()
    }

    pub fn history(&self) -> &HistoryController {
        &self.history
    }

    pub fn session(&self) -> Option<&SessionId> {
        self.session.id()
    }

    pub fn is_rendering(&self) -> bool {
        self.in_flight
            .as_ref()
            .is_some_and(|in_flight| !in_flight.cancel.is_cancelled())
    }

    /// Replace the room photo. Everything derived from the old photo goes:
    /// the in-flight render, the baseline, the history, and the session.
    pub fn set_room_image(&mut self, image: ImageRef) {
        self.cancel_in_flight();
        self.history.clear();
        self.baseline = None;
        self.previous_rendered = None;
        self.session.invalidate();
        tracing::info!("room image replaced; baseline and history cleared");
        self.room_image = Some(image);
    }

    pub fn update_scene(&mut self, snapshot: SceneSnapshot) {
        self.current = snapshot;
    }

    /// Seed the session handle with an id recovered from elsewhere.
    pub fn restore_session(&mut self, id: SessionId) {
        self.session = SessionHandle::with_id(id);
    }

    /// Seed the baseline directly, e.g. from a saved render.
    pub fn restore_baseline(&mut self, baseline: RenderedBaseline) {
        self.previous_rendered = Some(baseline.snapshot.clone());
        self.baseline = Some(baseline);
    }

    pub fn classify(&self) -> ChangeDescriptor {
        classify_with_fallback(
            &self.current,
            self.baseline.as_ref(),
            self.previous_rendered.as_ref(),
        )
    }

    pub fn readiness(&self) -> Readiness {
        if self.validate().is_err() {
            return Readiness::NotReady;
        }
        if self.classify().is_no_change() {
            Readiness::UpToDate
        } else {
            Readiness::ReadyToRender
        }
    }

    fn has_shown_items(&self) -> bool {
        self.baseline
            .as_ref()
            .is_some_and(|baseline| !baseline.snapshot.is_empty())
    }

    fn validate(&self) -> Result<&ImageRef, ValidationError> {
        let room = self
            .room_image
            .as_ref()
            .filter(|image| !image.is_blank())
            .ok_or(ValidationError::NoRoomImage)?;
        if self.current.is_empty() && !self.has_shown_items() {
            return Err(ValidationError::NoItems);
        }
        Ok(room)
    }

    // -----------------------------------------------------------------------
    // Rendering
    // -----------------------------------------------------------------------

    /// Validate, classify, and issue a ticket. `Ok(None)` means the image is
    /// already up to date.
    pub fn begin_render(&mut self) -> Result<Option<RenderTicket>, SyncError> {
        let room = self.validate()?.clone();

        if !self.is_rendering() {
            if let Some(abandoned) = self.in_flight.take() {
                tracing::debug!(generation = abandoned.generation, "abandoned render released");
            }
        }
        if let Some(generation) = self.in_flight.as_ref().map(|in_flight| in_flight.generation) {
            match self.overlap {
                OverlapPolicy::Reject => {
                    tracing::debug!(generation, "render refused; one is in flight");
                    return Err(SyncError::RenderInFlight);
                }
                OverlapPolicy::CancelPrevious => {
                    tracing::info!(generation, "cancelling in-flight render");
                    self.cancel_in_flight();
                }
            }
        }

        let descriptor = self.classify();
        let request = request::build(
            &descriptor,
            &self.current,
            self.baseline.as_ref().map(|baseline| &baseline.image),
            &room,
            self.session.id(),
            &self.prompts,
        )?;
        let Some(request) = request else {
            tracing::debug!("scene unchanged since last render; skipping");
            return Ok(None);
        };

        self.generation += 1;
        let cancel = CancellationToken::new();
        self.in_flight = Some(InFlight {
            generation: self.generation,
            cancel: cancel.clone(),
        });
        tracing::debug!(
            generation = self.generation,
            descriptor = descriptor.kind(),
            "render ticket issued",
        );

        Ok(Some(RenderTicket {
            generation: self.generation,
            cancel: CancelOnDrop(cancel),
            policy: self.render_policy,
            request,
            snapshot: self.current.clone(),
            descriptor,
        }))
    }

    /// Apply a finished ticket. Stale tickets are discarded; a failed render
    /// leaves the baseline and history untouched.
    pub fn commit(&mut self, finished: TicketResult) -> Result<RenderOutcome, SyncError> {
        let TicketResult { ticket, result } = finished;
        let latest = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == ticket.generation);
        if latest {
            self.in_flight = None;
        }
        if !latest || ticket.is_cancelled() {
            tracing::debug!(generation = ticket.generation, "stale render result discarded");
            return Ok(RenderOutcome::Superseded {
                generation: ticket.generation,
            });
        }

        let image = match result {
            Ok(image) => image,
            Err(err) => {
                tracing::warn!(generation = ticket.generation, error = %err, "render failed; keeping previous image");
                return Err(SyncError::Call(err));
            }
        };

        let baseline = RenderedBaseline::new(image, ticket.snapshot);
        let entry = HistoryEntry::from(&baseline);
        self.history.push(entry.clone());
        self.previous_rendered = Some(baseline.snapshot.clone());
        self.baseline = Some(baseline);
        tracing::info!(
            generation = ticket.generation,
            descriptor = ticket.descriptor.kind(),
            history = self.history.len(),
            "render committed",
        );

        Ok(RenderOutcome::Rendered {
            entry,
            descriptor: ticket.descriptor,
        })
    }

    /// Begin, run, and commit in one step.
    pub async fn render<R>(&mut self, renderer: &R) -> Result<RenderOutcome, SyncError>
    where
        R: Renderer + ?Sized,
    {
        let Some(ticket) = self.begin_render()? else {
            return Ok(RenderOutcome::Skipped);
        };
        let finished = ticket.run(renderer).await;
        self.commit(finished)
    }

    pub fn cancel_in_flight(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            tracing::debug!(generation = in_flight.generation, "in-flight render cancelled");
            in_flight.cancel.cancel();
        }
    }

    // -----------------------------------------------------------------------
    // Undo / redo
    // -----------------------------------------------------------------------

    pub fn undo(&mut self) -> Option<HistoryEntry> {
        self.cancel_in_flight();
        let entry = self.history.undo()?.clone();
        self.show(&entry);
        Some(entry)
    }

    pub fn redo(&mut self) -> Option<HistoryEntry> {
        self.cancel_in_flight();
        let entry = self.history.redo()?.clone();
        self.show(&entry);
        Some(entry)
    }

    fn show(&mut self, entry: &HistoryEntry) {
        self.current = entry.snapshot.clone();
        self.previous_rendered = Some(entry.snapshot.clone());
        self.baseline = Some(entry.to_baseline());
    }

    // -----------------------------------------------------------------------
    // Session and server-side history
    // -----------------------------------------------------------------------

    /// The session id, created on first use under the session retry policy.
    pub async fn ensure_session<S>(&mut self, service: &S) -> Result<SessionId, SyncError>
    where
        S: SessionService + ?Sized,
    {
        Ok(self.session.ensure(service, &self.session_policy).await?)
    }

    /// Confirm a restored session id with the service.
    pub async fn resume_session<S>(&mut self, service: &S) -> Result<Option<SessionId>, SyncError>
    where
        S: SessionService + ?Sized,
    {
        Ok(self.session.resume(service, &self.session_policy).await?)
    }

    pub fn persisted_history(&self) -> PersistedHistory {
        self.history.to_persisted()
    }

    /// Replace local history with server state and show its current entry.
    pub fn restore_history(&mut self, state: PersistedHistory) {
        self.cancel_in_flight();
        self.history = HistoryController::from_persisted(state, self.history.capacity());
        if let Some(entry) = self.history.current().cloned() {
            if entry.snapshot.fingerprint() != self.current.fingerprint() {
                tracing::info!(
                    items = entry.snapshot.len(),
                    "stored history shows a different scene; replacing the displayed one",
                );
            }
            self.show(&entry);
        }
    }

    /// Pull the server's history for the current session. Returns `false`
    /// when there is no session or the server has nothing stored.
    pub async fn load_history<H>(&mut self, store: &H) -> Result<bool, SyncError>
    where
        H: HistoryStore + ?Sized,
    {
        let Some(session) = self.session.id().cloned() else {
            return Ok(false);
        };
        let session = &session;
        let cancel = CancellationToken::new();
        let state = execute(&self.session_policy, &cancel, |_| store.load(session)).await?;
        match state {
            Some(state) => {
                self.restore_history(state);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Push local history for the current session. No-op without a session.
    pub async fn save_history<H>(&self, store: &H) -> Result<(), SyncError>
    where
        H: HistoryStore + ?Sized,
    {
        let Some(session) = self.session.id() else {
            return Ok(());
        };
        let state = &self.history.to_persisted();
        let cancel = CancellationToken::new();
        execute(&self.session_policy, &cancel, |_| store.save(session, state)).await?;
        Ok(())
    }
}
