//! Reading scene and baseline files, and building an orchestrator from them.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use scenesync_core::{config, ImageRef, RenderedBaseline, SceneSnapshot, SessionId, SyncConfig};
use scenesync_sync::SyncOrchestrator;

/// A JSON array of placed items.
pub fn read_snapshot(path: &Path) -> Result<SceneSnapshot> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read scene file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a JSON list of placed items", path.display()))
}

/// A JSON object `{ "image", "items", "rendered_at"? }`.
pub fn read_baseline(path: Option<&Path>) -> Result<Option<RenderedBaseline>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read baseline file {}", path.display()))?;
    let baseline = serde_json::from_str(&contents)
        .with_context(|| format!("{} is not a rendered baseline", path.display()))?;
    Ok(Some(baseline))
}

/// Atomically write `baseline` as pretty JSON: `<path>.tmp` → `rename`.
pub fn write_baseline(path: &Path, baseline: &RenderedBaseline) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    let json = serde_json::to_string_pretty(baseline).context("failed to serialize baseline")?;
    std::fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move baseline into {}", path.display()))?;
    Ok(())
}

pub fn load_config() -> Result<SyncConfig> {
    config::load().context("failed to load ~/.scenesync/config.yaml")
}

/// Everything a command needs to put an orchestrator into a given state.
pub struct SceneInputs<'a> {
    pub current: &'a Path,
    pub room: Option<&'a str>,
    pub baseline: Option<&'a Path>,
    pub session: Option<&'a str>,
}

pub fn orchestrator(config: &SyncConfig, inputs: &SceneInputs<'_>) -> Result<SyncOrchestrator> {
    let mut orch = SyncOrchestrator::from_config(config).context("failed to load prompt templates")?;
    if let Some(room) = inputs.room {
        orch.set_room_image(ImageRef::from(room));
    }
    if let Some(baseline) = read_baseline(inputs.baseline)? {
        tracing::debug!(items = baseline.snapshot.len(), image = %baseline.image, "restored baseline");
        orch.restore_baseline(baseline);
    }
    if let Some(session) = inputs.session {
        orch.restore_session(SessionId::from(session));
    }
    orch.update_scene(read_snapshot(inputs.current)?);
    Ok(orch)
}
