//! Roster core
//!
//! The reconciliation engine behind `roster populate`: a CSV-backed identity
//! [`Ledger`], the [`Connector`] capability interface, the slug-keyed
//! [`ConnectorRegistry`], and the [`Driver`] that walks each requested
//! column through connector selection, external-id binding, credential
//! acquisition, fetch and merge.

pub mod column;
pub mod connector;
pub mod driver;
pub mod error;
pub mod ledger;
pub mod prompt;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

pub use column::{ColumnKey, KEY_DELIMITER};
pub use connector::{Connector, FetchResults};
pub use driver::{ColumnOutcome, Driver, RunObserver, RunOptions, RunReport, SKIP_OPTION};
pub use error::{
    IntegrationError, IntegrationResult, LedgerError, LedgerResult, PromptError, RegistryError,
};
pub use ledger::{Ledger, EMAIL_COLUMN, ROW_KEY_COLUMNS, SYM_CLOUD_COLUMN};
pub use prompt::Prompter;
pub use registry::{ConnectorFactory, ConnectorRegistry, ConnectorRegistryBuilder};
