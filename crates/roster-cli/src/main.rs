use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use roster_cli::cli::{Cli, Commands};
use roster_cli::commands;
use roster_config::RosterConfig;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    // Load configuration, then apply CLI overrides
    let mut config = RosterConfig::load(cli.config.clone())?;
    if let Some(timeout) = cli.timeout {
        config.network.timeout_secs = timeout;
    }

    match cli.command {
        Commands::Populate {
            csv_path,
            integrations,
            import_new,
            no_import_new: _,
        } => commands::populate::execute(&config, csv_path, integrations, import_new).await,

        Commands::PagerdutyUsers {
            token,
            query,
            email_only,
        } => commands::pagerduty_users::execute(&config, token, query, email_only).await,

        Commands::IdentitystoreUserids {
            usernames,
            identitystore_id,
            infile,
            outfile,
        } => {
            commands::identitystore_userids::execute(
                &config,
                usernames,
                identitystore_id,
                infile,
                outfile,
            )
            .await
        }

        Commands::Integrations => commands::integrations::execute(&config),

        Commands::Config(cmd) => commands::config::execute(cmd, &config),
    }
}

/// Logs go to stderr so stdout stays clean for status lines and listings
fn init_tracing(cli: &Cli) {
    let filter = match cli.level_filter() {
        Some(level) => EnvFilter::new(level.to_string()),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
