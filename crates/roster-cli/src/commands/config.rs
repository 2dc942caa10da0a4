use anyhow::{Context, Result};
use colored::Colorize;
use std::path::PathBuf;

use crate::cli::ConfigCommands;
use roster_config::RosterConfig;

/// Execute config subcommand
pub fn execute(cmd: ConfigCommands, config: &RosterConfig) -> Result<()> {
    match cmd {
        ConfigCommands::Init { path, force } => init(path, force),
        ConfigCommands::Show => show(config),
    }
}

/// Initialize a new config file
fn init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_path = path
        .or_else(|| RosterConfig::default_config_path().ok())
        .context("Could not determine config file path")?;

    if config_path.exists() && !force {
        println!(
            "{} Config file already exists at: {}",
            "Error:".red().bold(),
            config_path.display()
        );
        println!("Use {} to overwrite", "--force".yellow());
        return Ok(());
    }

    RosterConfig::create_example(&config_path)?;

    println!(
        "{} Created config file at: {}",
        "Success:".green().bold(),
        config_path.display()
    );
    println!(
        "\n{}",
        "Default values will be used until you customize the config.".dimmed()
    );
    Ok(())
}

/// Show the effective configuration (file, environment and flags applied)
fn show(config: &RosterConfig) -> Result<()> {
    println!("{}", config.display_as_toml()?);
    Ok(())
}
