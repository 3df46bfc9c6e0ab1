//! Outbound side of the sync engine: resilient call execution, the wire
//! protocol, and HTTP clients for the rendering and session services.

pub mod cancel;
mod error;
pub mod executor;
pub mod http;
pub mod protocol;
pub mod service;
pub mod session;

pub use cancel::CancellationToken;
pub use error::CallError;
pub use executor::execute;
pub use http::HttpBackend;
pub use protocol::{
    PersistedHistory, PhaseAction, RemovedProductRef, RenderMode, RenderPhase, RenderRequest,
    RenderResponse, WireProduct,
};
pub use service::{HistoryStore, Renderer, SessionService};
pub use session::SessionHandle;
