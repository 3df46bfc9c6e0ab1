//! `scenesync classify`: print the change descriptor for a scene.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use scenesync_sync::{classify_with_fallback, ChangeDescriptor};

use super::input::{read_baseline, read_snapshot};

/// Arguments for `scenesync classify`.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// JSON list of the products currently placed.
    #[arg(long)]
    pub current: PathBuf,

    /// JSON baseline of the last successful render.
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// JSON list of the previously rendered products, used when the baseline
    /// lists no items despite having an image.
    #[arg(long)]
    pub previous: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ClassifyArgs {
    pub fn run(self) -> Result<()> {
        let current = read_snapshot(&self.current)?;
        let baseline = read_baseline(self.baseline.as_deref())?;
        let previous = self.previous.as_deref().map(read_snapshot).transpose()?;

        let descriptor = classify_with_fallback(&current, baseline.as_ref(), previous.as_ref());
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&descriptor).context("failed to serialize descriptor")?
            );
            return Ok(());
        }

        println!("{}", colored_kind(&descriptor));
        println!("{}", descriptor.summary());
        Ok(())
    }
}

pub(crate) fn colored_kind(descriptor: &ChangeDescriptor) -> String {
    let kind = descriptor.kind().to_uppercase();
    match descriptor {
        ChangeDescriptor::NoChange => kind.green().bold().to_string(),
        ChangeDescriptor::Initial | ChangeDescriptor::Reset { .. } => kind.yellow().bold().to_string(),
        ChangeDescriptor::Removal { .. }
        | ChangeDescriptor::RemoveAndAdd { .. }
        | ChangeDescriptor::QuantityDecrease { .. } => kind.red().bold().to_string(),
        ChangeDescriptor::Additive { .. } => kind.cyan().bold().to_string(),
    }
}
