//! Settings shared by every connector constructor

use std::time::Duration;

use roster_config::RosterConfig;
use roster_core::{IntegrationError, IntegrationResult};

/// Endpoints and timeouts handed to connector constructors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectorSettings {
    /// Per-call timeout for HTTP and AWS requests
    pub timeout: Duration,
    /// PagerDuty REST API base URL
    pub pagerduty_url: String,
    /// Aptible auth API base URL
    pub aptible_url: String,
}

impl ConnectorSettings {
    pub fn from_config(config: &RosterConfig) -> Self {
        Self {
            timeout: config.network.timeout(),
            pagerduty_url: config.pagerduty.api_url.trim_end_matches('/').to_string(),
            aptible_url: config.aptible.auth_url.trim_end_matches('/').to_string(),
        }
    }

    /// A fresh HTTP client with the configured timeout
    pub fn http_client(&self, system: &str) -> IntegrationResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("roster/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IntegrationError::connection(system, e.to_string()))
    }
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self::from_config(&RosterConfig::default())
    }
}
