//! AWS IAM connector
//!
//! Resolves email-named IAM users to their ARNs. The column is bound to the
//! AWS account the caller's credentials belong to.

use std::collections::BTreeSet;

use async_trait::async_trait;
use aws_sdk_iam::error::SdkError;
use aws_sdk_iam::operation::get_user::{GetUserError, GetUserOutput};
use aws_sdk_iam::Client;
use roster_core::{Connector, FetchResults, IntegrationError, IntegrationResult, Prompter};
use tracing::{debug, info, warn};

use super::{describe, error_code, is_access_denied, AwsSession};
use crate::settings::ConnectorSettings;

pub const SLUG: &str = "iam";

const SYSTEM: &str = "AWS IAM";

/// IAM connector
#[derive(Debug)]
pub struct Iam {
    session: AwsSession,
    account_id: Option<String>,
}

impl Iam {
    pub fn new(settings: &ConnectorSettings) -> Self {
        Self {
            session: AwsSession::new(settings.timeout),
            account_id: None,
        }
    }

    #[cfg(test)]
    fn with_sdk_config(config: aws_config::SdkConfig) -> Self {
        Self {
            session: AwsSession::with_config(config),
            account_id: None,
        }
    }

    async fn client(&self) -> Client {
        Client::new(self.session.config().await)
    }

    /// `GetUser` for the calling identity
    async fn current_user(&self) -> IntegrationResult<GetUserOutput> {
        self.client()
            .await
            .get_user()
            .send()
            .await
            .map_err(caller_error)
    }

    /// ARN of the named user, `None` when IAM has no such user
    async fn user_arn(&self, client: &Client, user_name: &str) -> IntegrationResult<Option<String>> {
        match client.get_user().user_name(user_name).send().await {
            Ok(output) => Ok(output.user().map(|user| user.arn().to_string())),
            Err(err) if is_no_such_entity(&err) => {
                debug!("No IAM user named {}", user_name);
                Ok(None)
            }
            Err(err) => Err(IntegrationError::connection(SYSTEM, describe(&err))),
        }
    }
}

#[async_trait]
impl Connector for Iam {
    fn slug(&self) -> &str {
        SLUG
    }

    async fn prompt_for_external_id(
        &mut self,
        prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>> {
        let caller = self.current_user().await?;
        let account = caller
            .user()
            .and_then(|user| account_id_from_arn(user.arn()));

        let account = match account {
            Some(account) => account.to_string(),
            None => prompter.input("What AWS account ID?")?,
        };
        Ok(Some(account))
    }

    fn bind_external_id(&mut self, external_id: &str) {
        self.account_id = Some(external_id.to_string());
    }

    async fn prompt_for_creds(&mut self, _prompter: &dyn Prompter) -> IntegrationResult<()> {
        let caller = self.current_user().await?;
        let arn = caller.user().map(|user| user.arn()).unwrap_or_default();
        info!("Authenticated to AWS IAM as {}", arn);

        if let (Some(bound), Some(actual)) = (&self.account_id, account_id_from_arn(arn)) {
            if bound != actual {
                warn!(
                    "Column is bound to account {} but credentials belong to {}",
                    bound,
                    actual
                );
            }
        }
        Ok(())
    }

    async fn fetch(&mut self, identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults> {
        let client = self.client().await;
        let mut results = FetchResults::new();
        for identifier in identifiers {
            if let Some(arn) = self.user_arn(&client, identifier).await? {
                results.insert(identifier.clone(), arn);
            }
        }
        Ok(results)
    }
}

fn caller_error(err: SdkError<GetUserError>) -> IntegrationError {
    let code = error_code(&err);
    if code == Some("ValidationError") {
        IntegrationError::auth("You must authenticate using an IAM User's credentials.")
    } else if is_access_denied(&err) {
        IntegrationError::auth("Access Denied: Please ensure you can GetUser for AWS IAM.")
    } else {
        IntegrationError::connection(SYSTEM, describe(&err))
    }
}

fn is_no_such_entity(err: &SdkError<GetUserError>) -> bool {
    err.as_service_error()
        .is_some_and(GetUserError::is_no_such_entity_exception)
}

/// Account id: the fifth `:`-separated field of an ARN
pub(crate) fn account_id_from_arn(arn: &str) -> Option<&str> {
    arn.split(':').nth(4).filter(|account| !account.is_empty())
}
