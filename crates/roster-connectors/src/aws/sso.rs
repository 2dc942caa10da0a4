//! AWS IAM Identity Center (SSO) connector
//!
//! Columns are bound to an SSO instance ARN. Users are looked up by
//! `UserName` in the identity store behind each selected instance.

use std::collections::BTreeSet;

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_identitystore::types::Filter;
use roster_core::{
    Connector, FetchResults, IntegrationError, IntegrationResult, PromptError, Prompter,
};
use tracing::{debug, info};

use super::{describe, is_access_denied, AwsSession};
use crate::settings::ConnectorSettings;

pub const SLUG: &str = "aws_sso";

const SYSTEM: &str = "AWS SSO";

/// One IAM Identity Center instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SsoInstance {
    pub instance_arn: String,
    pub identity_store_id: String,
}

/// Every SSO instance visible to the caller, in the order AWS returns them
pub async fn list_sso_instances(config: &SdkConfig) -> IntegrationResult<Vec<SsoInstance>> {
    let client = aws_sdk_ssoadmin::Client::new(config);
    let mut instances = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let output = client
            .list_instances()
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|err| {
                if is_access_denied(&err) {
                    IntegrationError::auth(
                        "Access Denied: Please ensure you can ListInstances for AWS SSO Admin.",
                    )
                } else {
                    IntegrationError::connection(SYSTEM, describe(&err))
                }
            })?;

        for instance in output.instances() {
            match (instance.instance_arn(), instance.identity_store_id()) {
                (Some(arn), Some(store)) => instances.push(SsoInstance {
                    instance_arn: arn.to_string(),
                    identity_store_id: store.to_string(),
                }),
                _ => debug!("Skipping SSO instance without ARN or identity store"),
            }
        }

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => break,
        }
    }

    debug!("Found {} SSO instance(s)", instances.len());
    Ok(instances)
}

/// `UserId` of the user named `user_name` in `identity_store_id`.
///
/// Follows pagination until the first match.
#[allow(deprecated)]
pub async fn find_user_id(
    config: &SdkConfig,
    identity_store_id: &str,
    user_name: &str,
) -> IntegrationResult<Option<String>> {
    let client = aws_sdk_identitystore::Client::new(config);
    let filter = Filter::builder()
        .attribute_path("UserName")
        .attribute_value(user_name)
        .build()
        .map_err(|err| IntegrationError::unexpected(SYSTEM, err.to_string()))?;
    let mut next_token: Option<String> = None;

    loop {
        let output = client
            .list_users()
            .identity_store_id(identity_store_id)
            .filters(filter.clone())
            .set_next_token(next_token.take())
            .send()
            .await
            .map_err(|err| IntegrationError::connection(SYSTEM, describe(&err)))?;

        if let Some(user) = output.users().first() {
            return Ok(Some(user.user_id().to_string()));
        }

        match output.next_token() {
            Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
            _ => return Ok(None),
        }
    }
}

/// SSO connector
#[derive(Debug)]
pub struct AwsSso {
    session: AwsSession,
    instance_arn: Option<String>,
    identity_stores: Vec<String>,
}

impl AwsSso {
    pub fn new(settings: &ConnectorSettings) -> Self {
        Self {
            session: AwsSession::new(settings.timeout),
            instance_arn: None,
            identity_stores: Vec::new(),
        }
    }

    #[cfg(test)]
    fn with_sdk_config(config: SdkConfig) -> Self {
        Self {
            session: AwsSession::with_config(config),
            instance_arn: None,
            identity_stores: Vec::new(),
        }
    }

    async fn instances(&self) -> IntegrationResult<Vec<SsoInstance>> {
        list_sso_instances(self.session.config().await).await
    }
}

fn no_instances() -> IntegrationError {
    IntegrationError::unexpected(SYSTEM, "No AWS SSO instances found for the current account")
}

/// ARN a column binds to: the only instance, else the operator's pick
pub(crate) fn choose_instance_arn(
    instances: &[SsoInstance],
    prompter: &dyn Prompter,
) -> IntegrationResult<String> {
    const PROMPT: &str = "Which Instance ARN?";
    match instances {
        [] => Err(no_instances()),
        [only] => Ok(only.instance_arn.clone()),
        _ => {
            let arns: Vec<String> = instances.iter().map(|i| i.instance_arn.clone()).collect();
            let choice = prompter.select(PROMPT, &arns)?;
            arns.into_iter()
                .nth(choice)
                .ok_or_else(|| PromptError::NoAnswer(PROMPT.to_string()).into())
        }
    }
}

/// Identity stores to search: the only instance's, else those the operator ticks
pub(crate) fn choose_identity_stores(
    instances: &[SsoInstance],
    prompter: &dyn Prompter,
) -> IntegrationResult<Vec<String>> {
    match instances {
        [] => Err(no_instances()),
        [only] => Ok(vec![only.identity_store_id.clone()]),
        _ => {
            let arns: Vec<String> = instances.iter().map(|i| i.instance_arn.clone()).collect();
            Ok(prompter
                .multi_select("Which SSO Instances?", &arns)?
                .into_iter()
                .filter_map(|index| instances.get(index))
                .map(|i| i.identity_store_id.clone())
                .collect())
        }
    }
}

#[async_trait]
impl Connector for AwsSso {
    fn slug(&self) -> &str {
        SLUG
    }

    fn supports_importing_new(&self) -> bool {
        true
    }

    async fn prompt_for_external_id(
        &mut self,
        prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>> {
        let instances = self.instances().await?;
        choose_instance_arn(&instances, prompter).map(Some)
    }

    fn bind_external_id(&mut self, external_id: &str) {
        self.instance_arn = Some(external_id.to_string());
    }

    async fn prompt_for_creds(&mut self, prompter: &dyn Prompter) -> IntegrationResult<()> {
        let instances = self.instances().await?;
        self.identity_stores = choose_identity_stores(&instances, prompter)?;

        info!(
            "Using identity store(s) {} for instance {}",
            self.identity_stores.join(", "),
            self.instance_arn.as_deref().unwrap_or("<unbound>")
        );
        Ok(())
    }

    async fn fetch(&mut self, identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults> {
        let config = self.session.config().await;
        let mut results = FetchResults::new();

        for store in &self.identity_stores {
            for identifier in identifiers {
                if let Some(user_id) = find_user_id(config, store, identifier).await? {
                    results.insert(identifier.clone(), user_id);
                }
            }
        }
        Ok(results)
    }
}
