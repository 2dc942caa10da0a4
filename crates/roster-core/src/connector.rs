//! Connector capability interface
//!
//! A connector proxies one external identity system. The driver builds a
//! fresh instance per column, optionally binds it to an external sub-resource,
//! asks it to acquire credentials, then asks it to resolve identifiers.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

use crate::error::IntegrationResult;
use crate::prompt::Prompter;

/// Identifier → external id
pub type FetchResults = BTreeMap<String, String>;

#[async_trait]
pub trait Connector: Send {
    /// Registry slug of this connector
    fn slug(&self) -> &str;

    /// Whether the connector can list every identity proactively
    fn supports_importing_new(&self) -> bool {
        false
    }

    /// Ask which sub-resource (instance, account, domain, organization) this
    /// column binds to. `None` means the connector has no such concept.
    async fn prompt_for_external_id(
        &mut self,
        prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>>;

    /// Tell the connector which sub-resource the column is bound to
    fn bind_external_id(&mut self, _external_id: &str) {}

    /// Acquire and validate credentials. Called once before [`Connector::fetch`].
    async fn prompt_for_creds(&mut self, prompter: &dyn Prompter) -> IntegrationResult<()>;

    /// Resolve identifiers to external ids.
    ///
    /// Identifiers the external system does not know are simply absent from
    /// the result; only malformed responses are errors.
    async fn fetch(&mut self, identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults>;
}
