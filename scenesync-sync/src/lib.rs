//! # scenesync-sync
//!
//! Keeps a rendered room image consistent with the products placed in it.
//!
//! Call [`classify`] to compare the current scene with what the image shows,
//! [`request::build`] to turn that into the minimal render request, or drive
//! the whole loop (render, undo, redo, sessions) through [`SyncOrchestrator`].

pub mod classifier;
pub mod error;
pub mod history;
pub mod orchestrator;
pub mod prompt;
pub mod request;

pub use classifier::{classify, classify_with_fallback, AddItem, AddKind, ChangeDescriptor, ReducedItem, RemovedItem};
pub use error::{SyncError, ValidationError};
pub use history::{HistoryController, DEFAULT_HISTORY_CAPACITY};
pub use orchestrator::{Readiness, RenderOutcome, RenderTicket, SyncOrchestrator, TicketResult};
pub use prompt::{PromptKind, PromptRenderer};
