use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use roster_config::RosterConfig;
use roster_connectors::{builtin_registry, ConnectorSettings};
use roster_core::{Driver, RunOptions};
use tracing::debug;

use crate::output::{self, ConsoleObserver};
use crate::prompt::TerminalPrompter;

/// Reconcile the ledger at `csv_path`.
///
/// Column failures are reported but never fail the command; only ledger
/// read, parse and write errors do.
pub async fn execute(
    config: &RosterConfig,
    csv_path: PathBuf,
    integrations: Vec<String>,
    import_new: bool,
) -> Result<()> {
    if !csv_path.is_file() {
        bail!("Ledger {} does not exist or is not a file", csv_path.display());
    }

    let registry = builtin_registry(&ConnectorSettings::from_config(config))?;
    debug!("Integrations available: {:?}", registry.known_slugs());

    let prompter = TerminalPrompter::new();
    let mut observer = ConsoleObserver;
    let report = Driver::new(&registry, &prompter)
        .with_options(RunOptions { import_new })
        .run(
            &csv_path,
            &integrations,
            &config.ledger.identity_columns,
            &mut observer,
        )
        .await
        .with_context(|| format!("Failed to reconcile {}", csv_path.display()))?;

    if report.outcomes.is_empty() {
        println!("{}", "No integration columns to reconcile.".dimmed());
        return Ok(());
    }

    println!("\n{}", output::summary_table(&report));
    let failures = report.failures().count();
    if failures > 0 {
        output::warning(&format!(
            "{} column(s) failed; rerun to retry them.",
            failures
        ));
    }
    println!(
        "{} {} rows written to {}",
        "Done:".green().bold(),
        report.total_updated(),
        csv_path.display()
    );
    Ok(())
}
