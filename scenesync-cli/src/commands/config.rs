//! `scenesync config`: show, create, or locate the config file.

use anyhow::{Context, Result};
use clap::Subcommand;

use scenesync_core::config;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as YAML.
    Show,

    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Print the config file location.
    Path,
}

pub fn run(command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let config = super::input::load_config()?;
            print!(
                "{}",
                serde_yaml::to_string(&config).context("failed to serialize config")?
            );
        }
        ConfigCommand::Init { force } => {
            let path = config::init(force).context("config init failed")?;
            println!("Wrote {}", path.display());
        }
        ConfigCommand::Path => {
            let home = dirs::home_dir().context("could not determine home directory")?;
            println!("{}", config::config_path_at(&home).display());
        }
    }
    Ok(())
}
