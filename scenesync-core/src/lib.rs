//! scenesync core library: scene snapshot model, baselines, config.
//!
//! - [`types`]: product ids, placed items, snapshots, baselines, history entries
//! - [`config`]: `~/.scenesync/config.yaml` load / save, retry policy
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{EndpointConfig, OverlapPolicy, RetryPolicy, SyncConfig};
pub use error::ConfigError;
pub use types::{
    HistoryEntry, ImageRef, PlacedItem, ProductId, RenderedBaseline, SceneSnapshot, SessionId,
};
