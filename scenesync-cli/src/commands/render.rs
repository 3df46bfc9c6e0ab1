//! `scenesync render`: render the scene through the configured service.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::Args;
use colored::Colorize;

use scenesync_client::HttpBackend;
use scenesync_sync::RenderOutcome;

use super::input::{load_config, orchestrator, write_baseline, SceneInputs};

/// Arguments for `scenesync render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// JSON list of the products currently placed.
    #[arg(long)]
    pub current: PathBuf,

    /// URL or data URI of the bare room photo.
    #[arg(long)]
    pub room: String,

    /// JSON baseline of the last successful render.
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Where to write the new baseline (defaults to stdout).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Attach this design session id.
    #[arg(long, conflicts_with = "new_session")]
    pub session: Option<String>,

    /// Create a design session before rendering.
    #[arg(long)]
    pub new_session: bool,
}

impl RenderArgs {
    pub fn run(self) -> Result<()> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        runtime.block_on(self.render())
    }

    async fn render(self) -> Result<()> {
        let config = load_config()?;
        let backend = HttpBackend::new(&config.renderer, config.render_retry.timeout());
        let mut orch = orchestrator(
            &config,
            &SceneInputs {
                current: &self.current,
                room: Some(&self.room),
                baseline: self.baseline.as_deref(),
                session: self.session.as_deref(),
            },
        )?;

        if self.new_session {
            let id = orch
                .ensure_session(&backend)
                .await
                .map_err(|err| anyhow!(err.user_message()))
                .with_context(|| format!("could not create a session at {}", backend.base_url()))?;
            eprintln!("session {id}");
        }

        let outcome = orch
            .render(&backend)
            .await
            .map_err(|err| anyhow!(err.user_message()))
            .context("render failed")?;

        match outcome {
            RenderOutcome::Skipped => {
                println!("{} the image already shows this scene", "UP TO DATE".green().bold());
                Ok(())
            }
            RenderOutcome::Rendered { descriptor, .. } => {
                let baseline = orch
                    .baseline()
                    .context("render committed without a baseline")?;
                eprintln!("{} {}", "RENDERED".cyan().bold(), descriptor.summary());
                match &self.out {
                    Some(path) => {
                        write_baseline(path, baseline)?;
                        println!("{} -> {}", baseline.image, path.display());
                    }
                    None => println!(
                        "{}",
                        serde_json::to_string_pretty(baseline).context("failed to serialize baseline")?
                    ),
                }
                Ok(())
            }
            RenderOutcome::Superseded { generation } => {
                Err(anyhow!("render {generation} was superseded before it finished"))
            }
        }
    }
}
