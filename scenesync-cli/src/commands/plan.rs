//! `scenesync plan`: print the request a render would send, without sending it.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;

use super::input::{load_config, orchestrator, SceneInputs};

/// Arguments for `scenesync plan`.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// JSON list of the products currently placed.
    #[arg(long)]
    pub current: PathBuf,

    /// URL or data URI of the bare room photo.
    #[arg(long)]
    pub room: String,

    /// JSON baseline of the last successful render.
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Design session id to attach to the request.
    #[arg(long)]
    pub session: Option<String>,
}

impl PlanArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let mut orch = orchestrator(
            &config,
            &SceneInputs {
                current: &self.current,
                room: Some(&self.room),
                baseline: self.baseline.as_deref(),
                session: self.session.as_deref(),
            },
        )?;

        let ticket = orch
            .begin_render()
            .map_err(|err| anyhow!(err.user_message()))
            .context("cannot plan a render")?;
        let Some(ticket) = ticket else {
            println!("Nothing to render: the image already shows this scene.");
            return Ok(());
        };

        println!(
            "{}",
            serde_json::to_string_pretty(ticket.request()).context("failed to serialize request")?
        );
        Ok(())
    }
}
