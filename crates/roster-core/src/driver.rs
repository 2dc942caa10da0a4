//! Reconciliation driver
//!
//! For each requested column the driver walks
//! `SelectType → BindExternalId → EnsureColumn → DetermineTargets →
//! AcquireCreds → Fetch → Merge`, ending in a [`ColumnOutcome`].
//!
//! Failures are column-local: an integration error stops work on that column
//! and the driver moves on. The ledger is written back after every column has
//! been visited, whatever happened to each of them.

use std::collections::BTreeSet;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::column::ColumnKey;
use crate::connector::Connector;
use crate::error::{IntegrationError, LedgerResult};
use crate::ledger::Ledger;
use crate::prompt::Prompter;
use crate::registry::ConnectorRegistry;

/// Choice offered alongside the known slugs when a column's type is unknown
pub const SKIP_OPTION: &str = "SELECT TO SKIP";

/// Per-run switches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Ask capable connectors for every row instead of only blank ones
    pub import_new: bool,
}

/// How processing of one column ended
#[derive(Debug)]
pub enum ColumnOutcome {
    /// Values were fetched and merged
    Updated {
        column: String,
        slug: String,
        updated: usize,
        remaining: usize,
    },
    /// Nothing to resolve; no credentials were requested
    UpToDate { column: String, slug: String },
    /// An integration error aborted this column; the ledger column is untouched
    Failed {
        column: String,
        slug: String,
        error: IntegrationError,
    },
    /// The operator chose not to process this column
    Skipped { column: String },
}

impl ColumnOutcome {
    /// Column key as it stands after processing (bound if binding happened)
    pub fn column(&self) -> &str {
        match self {
            Self::Updated { column, .. }
            | Self::UpToDate { column, .. }
            | Self::Failed { column, .. }
            | Self::Skipped { column } => column,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Outcomes of one run in processing order
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<ColumnOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &ColumnOutcome> {
        self.outcomes.iter().filter(|o| o.is_failure())
    }

    /// Total rows written across all columns
    pub fn total_updated(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o {
                ColumnOutcome::Updated { updated, .. } => *updated,
                _ => 0,
            })
            .sum()
    }
}

/// Progress callbacks so a frontend can report while prompts interleave
pub trait RunObserver {
    fn column_started(&mut self, _column: &str) {}
    fn connector_selected(&mut self, _column: &str, _slug: &str) {}
    fn column_finished(&mut self, _outcome: &ColumnOutcome) {}
}

impl RunObserver for () {}

/// Drives connectors over a ledger
pub struct Driver<'a> {
    registry: &'a ConnectorRegistry,
    prompter: &'a dyn Prompter,
    options: RunOptions,
}

impl<'a> Driver<'a> {
    pub fn new(registry: &'a ConnectorRegistry, prompter: &'a dyn Prompter) -> Self {
        Self {
            registry,
            prompter,
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Columns reconciled when none are requested: every column except the
    /// identity columns, in schema order
    pub fn default_columns(ledger: &Ledger, identity_columns: &[String]) -> Vec<String> {
        ledger
            .columns()
            .iter()
            .filter(|c| !identity_columns.contains(c))
            .cloned()
            .collect()
    }

    /// Load the ledger at `path`, reconcile `columns`, and write it back.
    ///
    /// An empty `columns` list means [`Driver::default_columns`].
    pub async fn run(
        &self,
        path: &Path,
        columns: &[String],
        identity_columns: &[String],
        observer: &mut dyn RunObserver,
    ) -> LedgerResult<RunReport> {
        let mut ledger = Ledger::load(path)?;

        let columns = if columns.is_empty() {
            Self::default_columns(&ledger, identity_columns)
        } else {
            columns.to_vec()
        };

        let report = self.reconcile(&mut ledger, &columns, observer).await;
        ledger.write(path)?;
        info!(
            "Reconciled {} columns into {}",
            report.outcomes.len(),
            path.display()
        );
        Ok(report)
    }

    /// Reconcile each column in turn; repeated column names are visited once
    pub async fn reconcile(
        &self,
        ledger: &mut Ledger,
        columns: &[String],
        observer: &mut dyn RunObserver,
    ) -> RunReport {
        let mut seen = BTreeSet::new();
        let mut report = RunReport::default();

        for column in columns {
            if !seen.insert(column.as_str()) {
                continue;
            }
            observer.column_started(column);
            let outcome = self.reconcile_column(ledger, column, observer).await;
            observer.column_finished(&outcome);
            report.outcomes.push(outcome);
        }

        report
    }

    async fn reconcile_column(
        &self,
        ledger: &mut Ledger,
        column: &str,
        observer: &mut dyn RunObserver,
    ) -> ColumnOutcome {
        let key = ColumnKey::parse(column);

        // SelectType
        let slug = match self.select_type(&key) {
            Ok(Some(slug)) => slug,
            Ok(None) => {
                debug!("Skipping column '{}'", column);
                return ColumnOutcome::Skipped {
                    column: column.to_string(),
                };
            }
            Err(error) => {
                warn!("Could not select a service for '{}': {}", column, error);
                return ColumnOutcome::Failed {
                    column: column.to_string(),
                    slug: String::new(),
                    error,
                };
            }
        };

        let mut connector = match self.registry.create(&slug) {
            Ok(connector) => connector,
            Err(e) => {
                warn!("{}; skipping column '{}'", e, column);
                return ColumnOutcome::Skipped {
                    column: column.to_string(),
                };
            }
        };
        observer.connector_selected(column, &slug);

        // BindExternalId
        let key = match self.bind_external_id(connector.as_mut(), key).await {
            Ok(key) => key,
            Err(error) => {
                warn!("Integration '{}' failed: {}", column, error);
                return ColumnOutcome::Failed {
                    column: column.to_string(),
                    slug,
                    error,
                };
            }
        };
        let column = key.as_str().to_string();

        // EnsureColumn
        ledger.ensure_column(&column);

        // DetermineTargets
        let targets: BTreeSet<String> =
            if self.options.import_new && connector.supports_importing_new() {
                ledger.lookup_keys().map(str::to_string).collect()
            } else {
                ledger.missing_rows(&column).into_iter().collect()
            };
        if targets.is_empty() {
            debug!("Column '{}' has no blanks", column);
            return ColumnOutcome::UpToDate { column, slug };
        }

        // AcquireCreds, Fetch
        let results = match self.acquire_and_fetch(connector.as_mut(), &targets).await {
            Ok(results) => results,
            Err(error) => {
                warn!("Integration '{}' failed: {}", column, error);
                return ColumnOutcome::Failed {
                    column,
                    slug,
                    error,
                };
            }
        };

        // Merge
        let updated = ledger.merge(&column, &results);
        let remaining = targets.len().saturating_sub(results.len());
        debug!(
            "Column '{}': {} updated, {} remaining",
            column, updated, remaining
        );
        ColumnOutcome::Updated {
            column,
            slug,
            updated,
            remaining,
        }
    }

    /// Returns `None` when the operator picks the skip option
    fn select_type(&self, key: &ColumnKey) -> Result<Option<String>, IntegrationError> {
        let slug = key.slug();
        if !slug.is_empty() && self.registry.is_supported(slug) {
            return Ok(Some(slug.to_string()));
        }

        let mut choices: Vec<String> = self
            .registry
            .known_slugs()
            .into_iter()
            .map(str::to_string)
            .collect();
        choices.push(SKIP_OPTION.to_string());

        let prompt = format!("Select Service for Integration '{}'", key);
        let picked = self.prompter.select(&prompt, &choices)?;
        match choices.get(picked) {
            Some(choice) if choice != SKIP_OPTION => Ok(Some(choice.clone())),
            _ => Ok(None),
        }
    }

    async fn bind_external_id(
        &self,
        connector: &mut dyn Connector,
        key: ColumnKey,
    ) -> Result<ColumnKey, IntegrationError> {
        if let Some(external_id) = key.external_id() {
            connector.bind_external_id(external_id);
            return Ok(key);
        }

        match connector.prompt_for_external_id(self.prompter).await? {
            Some(external_id) => {
                connector.bind_external_id(&external_id);
                let bound = key.bind(&external_id);
                debug!("Bound '{}' to '{}'", key, bound);
                Ok(bound)
            }
            None => Ok(key),
        }
    }

    async fn acquire_and_fetch(
        &self,
        connector: &mut dyn Connector,
        targets: &BTreeSet<String>,
    ) -> Result<crate::connector::FetchResults, IntegrationError> {
        connector.prompt_for_creds(self.prompter).await?;
        connector.fetch(targets).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{NoopConnector, ScriptedPrompter};

    fn registry() -> ConnectorRegistry {
        ConnectorRegistry::builder()
            .register("test", || Box::new(NoopConnector::new()))
            .expect("register")
            .build()
    }

    fn ledger() -> Ledger {
        Ledger::from_reader(
            "email,User ID,test,other\na@x.com,1,,\n".as_bytes(),
            "test.csv",
        )
        .expect("ledger")
    }

    #[test]
    fn default_columns_exclude_identity_columns() {
        let identity = vec!["email".to_string(), "User ID".to_string()];
        assert_eq!(Driver::default_columns(&ledger(), &identity), ["test", "other"]);
    }

    #[tokio::test]
    async fn unknown_type_can_be_skipped() {
        let registry = registry();
        // choices are ["test", SKIP_OPTION]
        let prompter = ScriptedPrompter::new().with_selection(1);
        let driver = Driver::new(&registry, &prompter);
        let mut ledger = ledger();

        let report = driver
            .reconcile(&mut ledger, &["other".to_string()], &mut ())
            .await;

        assert!(matches!(
            report.outcomes.as_slice(),
            [ColumnOutcome::Skipped { column }] if column == "other"
        ));
        assert_eq!(
            prompter.prompts(),
            ["Select Service for Integration 'other'"]
        );
    }

    #[tokio::test]
    async fn repeated_columns_are_processed_once() {
        let registry = registry();
        let prompter = ScriptedPrompter::new();
        let driver = Driver::new(&registry, &prompter);
        let mut ledger = ledger();

        let report = driver
            .reconcile(&mut ledger, &["test".to_string(), "test".to_string()], &mut ())
            .await;

        assert_eq!(report.outcomes.len(), 1);
    }
}
