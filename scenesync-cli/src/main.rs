//! scenesync: keep a rendered room image in step with the placed products.
//!
//! # Usage
//!
//! ```text
//! scenesync classify --current <json> [--baseline <json>] [--previous <json>] [--json]
//! scenesync plan --current <json> --room <ref> [--baseline <json>] [--session <id>]
//! scenesync status --current <json> [--room <ref>] [--baseline <json>] [--json]
//! scenesync render --current <json> --room <ref> [--baseline <json>] [--out <json>]
//! scenesync config show|init [--force]|path
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    classify::ClassifyArgs, config::ConfigCommand, plan::PlanArgs, render::RenderArgs,
    status::StatusArgs,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "scenesync",
    version,
    about = "Decide and issue minimal re-renders of a furnished room image",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr (overrides RUST_LOG).
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare the current scene with the rendered baseline.
    Classify(ClassifyArgs),

    /// Print the render request that would be sent, without sending it.
    Plan(PlanArgs),

    /// Show whether a render is needed and what changed per product.
    Status(StatusArgs),

    /// Render the current scene through the configured service.
    Render(RenderArgs),

    /// Inspect or create ~/.scenesync/config.yaml.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Classify(args) => args.run(),
        Commands::Plan(args) => args.run(),
        Commands::Status(args) => args.run(),
        Commands::Render(args) => args.run(),
        Commands::Config { command } => commands::config::run(command),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
