//! AWS-backed connectors: IAM Identity Center (`aws_sso`) and IAM (`iam`)
//!
//! Both use the default AWS credential chain (environment, shared profile,
//! instance metadata) and load it lazily, the first time a connector needs it.

pub mod iam;
pub mod sso;

use std::time::Duration;

use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tokio::sync::OnceCell;
use tracing::debug;

pub use iam::Iam;
pub use sso::{find_user_id, list_sso_instances, AwsSso, SsoInstance};

/// Load the shared AWS configuration with a per-operation timeout
pub async fn load_sdk_config(timeout: Duration) -> SdkConfig {
    let timeouts = TimeoutConfig::builder().operation_timeout(timeout).build();
    let config = aws_config::defaults(BehaviorVersion::latest())
        .timeout_config(timeouts)
        .load()
        .await;
    debug!(region = ?config.region(), "Loaded AWS configuration");
    config
}

/// Lazily loaded AWS configuration owned by one connector instance
#[derive(Debug)]
pub(crate) struct AwsSession {
    timeout: Duration,
    config: OnceCell<SdkConfig>,
}

impl AwsSession {
    pub(crate) fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            config: OnceCell::new(),
        }
    }

    #[cfg(test)]
    pub(crate) fn with_config(config: SdkConfig) -> Self {
        Self {
            timeout: Duration::from_secs(5),
            config: OnceCell::from(config),
        }
    }

    pub(crate) async fn config(&self) -> &SdkConfig {
        self.config
            .get_or_init(|| load_sdk_config(self.timeout))
            .await
    }
}

/// Service error code (`AccessDenied`, `NoSuchEntity`, ...) if the call reached AWS
pub(crate) fn error_code<E, R>(err: &SdkError<E, R>) -> Option<&str>
where
    E: ProvideErrorMetadata,
{
    err.as_service_error().and_then(|e| e.code())
}

/// Whether the call was rejected for missing permissions
pub(crate) fn is_access_denied<E, R>(err: &SdkError<E, R>) -> bool
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match error_code(err) {
        Some(code) => code.starts_with("AccessDenied"),
        None => describe(err).contains("AccessDenied"),
    }
}

/// Full error chain, for messages shown to the operator
pub(crate) fn describe<E>(err: &E) -> String
where
    E: std::error::Error,
{
    DisplayErrorContext(err).to_string()
}

/// Static credentials and a fixed region, with every service sent to `endpoint`
#[cfg(test)]
pub(crate) async fn mock_sdk_config(endpoint: &str) -> SdkConfig {
    use aws_sdk_iam::config::{Credentials, Region};

    aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(Credentials::new("AKIDTEST", "secret", None, None, "test"))
        .endpoint_url(endpoint)
        .load()
        .await
}
