//! `scenesync status`: readiness and per-product change overview.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use scenesync_core::{ProductId, SceneSnapshot};
use scenesync_sync::{Readiness, SyncOrchestrator};

use super::classify::colored_kind;
use super::input::{load_config, orchestrator, SceneInputs};

/// Arguments for `scenesync status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// JSON list of the products currently placed.
    #[arg(long)]
    pub current: PathBuf,

    /// URL or data URI of the bare room photo.
    #[arg(long)]
    pub room: Option<String>,

    /// JSON baseline of the last successful render.
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self) -> Result<()> {
        let config = load_config()?;
        let orch = orchestrator(
            &config,
            &SceneInputs {
                current: &self.current,
                room: self.room.as_deref(),
                baseline: self.baseline.as_deref(),
                session: None,
            },
        )?;

        let report = build_report(&orch);
        if self.json {
            print_json(&orch, report)?;
            return Ok(());
        }
        print_table(&orch, report);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Tabled)]
struct ProductRow {
    #[tabled(rename = "product")]
    product: String,
    #[tabled(rename = "shown")]
    shown: u32,
    #[tabled(rename = "now")]
    now: u32,
    #[tabled(rename = "change")]
    change: String,
}

#[derive(Serialize)]
struct StatusJson {
    readiness: &'static str,
    descriptor: &'static str,
    summary: String,
    rendered_at: Option<String>,
    products: Vec<ProductRow>,
}

fn build_report(orch: &SyncOrchestrator) -> Vec<ProductRow> {
    let empty = SceneSnapshot::empty();
    let shown = orch.baseline().map_or(&empty, |baseline| &baseline.snapshot);
    let now = orch.current_scene();

    let mut ids: Vec<ProductId> = now.items().iter().map(|item| item.id.clone()).collect();
    let seen: BTreeSet<ProductId> = ids.iter().cloned().collect();
    ids.extend(shown.items().iter().map(|item| item.id.clone()).filter(|id| !seen.contains(id)));

    ids.into_iter()
        .map(|id| {
            let before = shown.get(&id);
            let after = now.get(&id);
            let name = after
                .or(before)
                .map(|item| item.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| id.to_string());
            let shown_qty = before.map_or(0, |item| item.quantity);
            let now_qty = after.map_or(0, |item| item.quantity);
            ProductRow {
                product: name,
                shown: shown_qty,
                now: now_qty,
                change: change_label(shown_qty, now_qty),
            }
        })
        .collect()
}

fn change_label(shown: u32, now: u32) -> String {
    match (shown, now) {
        (0, _) => "new".to_string(),
        (_, 0) => "removed".to_string(),
        (a, b) if b > a => format!("+{}", b - a),
        (a, b) if b < a => format!("-{}", a - b),
        _ => "-".to_string(),
    }
}

fn readiness_key(readiness: Readiness) -> &'static str {
    match readiness {
        Readiness::NotReady => "not_ready",
        Readiness::ReadyToRender => "ready_to_render",
        Readiness::UpToDate => "up_to_date",
    }
}

fn readiness_indicator(readiness: Readiness) -> String {
    match readiness {
        Readiness::NotReady => "■".bright_black().bold().to_string(),
        Readiness::ReadyToRender => "■".yellow().bold().to_string(),
        Readiness::UpToDate => "■".green().bold().to_string(),
    }
}

fn format_age(at: DateTime<Utc>) -> String {
    let seconds = (Utc::now() - at).num_seconds().max(0);
    match seconds {
        0..=59 => format!("{seconds}s ago"),
        60..=3_599 => format!("{}m ago", seconds / 60),
        3_600..=86_399 => format!("{}h ago", seconds / 3_600),
        _ => format!("{}d ago", seconds / 86_400),
    }
}

fn print_json(orch: &SyncOrchestrator, products: Vec<ProductRow>) -> Result<()> {
    let descriptor = orch.classify();
    let payload = StatusJson {
        readiness: readiness_key(orch.readiness()),
        descriptor: descriptor.kind(),
        summary: descriptor.summary(),
        rendered_at: orch.baseline().map(|baseline| baseline.rendered_at.to_rfc3339()),
        products,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(orch: &SyncOrchestrator, products: Vec<ProductRow>) {
    let readiness = orch.readiness();
    let descriptor = orch.classify();
    let rendered = orch
        .baseline()
        .map_or_else(|| "never".to_string(), |baseline| format_age(baseline.rendered_at));

    println!(
        "{} {} | {} | last render {}",
        readiness_indicator(readiness),
        readiness.to_string().to_uppercase().bold(),
        colored_kind(&descriptor),
        rendered,
    );

    if products.is_empty() {
        println!("No products placed.");
    } else {
        let mut table = Table::new(products);
        table.with(Style::rounded());
        println!("{table}");
    }

    if readiness == Readiness::ReadyToRender {
        println!("Run 'scenesync render' to update the image.");
    }
}
