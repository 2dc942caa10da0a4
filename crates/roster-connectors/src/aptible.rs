//! Aptible connector
//!
//! Authenticates against the Aptible auth API with a password grant (plus a
//! one-time 2FA retry) and resolves emails to organization user ids.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use roster_config::{env_or_prompt, Echo, APTIBLE_EMAIL_VAR, APTIBLE_PASSWORD_VAR};
use roster_core::{Connector, FetchResults, IntegrationError, IntegrationResult, Prompter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::settings::ConnectorSettings;

pub const SLUG: &str = "aptible";

const SYSTEM: &str = "Aptible";
const TOKEN_LIFETIME_SECS: u64 = 43_200;

#[derive(Debug, Clone, Serialize)]
struct TokenRequest {
    expires_in: u64,
    grant_type: &'static str,
    username: String,
    password: String,
    scope: &'static str,
    #[serde(rename = "_source")]
    source: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    otp_token: Option<String>,
}

impl TokenRequest {
    fn password_grant(username: String, password: String) -> Self {
        Self {
            expires_in: TOKEN_LIFETIME_SECS,
            grant_type: "password",
            username,
            password,
            scope: "manage",
            source: "dashboard",
            otp_token: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// HAL collection wrapper
#[derive(Debug, Deserialize)]
struct Embedded<T> {
    #[serde(rename = "_embedded")]
    embedded: T,
}

#[derive(Debug, Deserialize)]
struct Organizations {
    organizations: Vec<Organization>,
}

#[derive(Debug, Deserialize)]
struct Organization {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Users {
    users: Vec<AptibleUser>,
}

#[derive(Debug, Deserialize)]
struct AptibleUser {
    id: String,
    email: String,
}

/// Aptible connector; columns are bound to an organization id
#[derive(Debug)]
pub struct Aptible {
    settings: ConnectorSettings,
    organization_id: Option<String>,
    session: Option<(Client, String)>,
}

impl Aptible {
    pub fn new(settings: &ConnectorSettings) -> Self {
        Self {
            settings: settings.clone(),
            organization_id: None,
            session: None,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.settings.aptible_url, path)
    }

    async fn create_access_token(
        &self,
        client: &Client,
        request: &TokenRequest,
    ) -> IntegrationResult<(StatusCode, TokenResponse)> {
        let response = client
            .post(self.url("tokens"))
            .json(request)
            .send()
            .await
            .map_err(|e| IntegrationError::connection(SYSTEM, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IntegrationError::connection(SYSTEM, e.to_string()))?;

        let parsed = serde_json::from_str(&body).map_err(|e| {
            IntegrationError::unexpected(
                SYSTEM,
                format!("Invalid JSON: {} ({})", e, status.as_u16()),
            )
        })?;
        Ok((status, parsed))
    }

    async fn get_resource<T: DeserializeOwned>(&self, path: &str) -> IntegrationResult<T> {
        let (client, token) = self
            .session
            .as_ref()
            .ok_or_else(|| IntegrationError::auth("Aptible credentials were not acquired"))?;

        let response = client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| IntegrationError::connection(SYSTEM, e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IntegrationError::connection(SYSTEM, e.to_string()))?;

        if status != StatusCode::OK {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .unwrap_or_default()
                .message;
            return Err(IntegrationError::connection(
                SYSTEM,
                format!("{} ({})", message, status.as_u16()),
            ));
        }

        serde_json::from_str(&body)
            .map_err(|e| IntegrationError::unexpected(SYSTEM, format!("Invalid JSON: {e}")))
    }

    /// The bound organization, or the first visible one when unbound
    async fn organization_id(&self) -> IntegrationResult<String> {
        let orgs: Embedded<Organizations> = self.get_resource("organizations").await?;
        let mut orgs = orgs.embedded.organizations.into_iter();

        let found = match &self.organization_id {
            Some(bound) => orgs.find(|org| &org.id == bound),
            None => orgs.next(),
        };
        found.map(|org| org.id).ok_or_else(|| match &self.organization_id {
            Some(bound) => {
                IntegrationError::unexpected(SYSTEM, format!("Organization {bound} not found"))
            }
            None => IntegrationError::unexpected(SYSTEM, "No organizations visible"),
        })
    }
}

#[async_trait]
impl Connector for Aptible {
    fn slug(&self) -> &str {
        SLUG
    }

    async fn prompt_for_external_id(
        &mut self,
        prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>> {
        let id = prompter.input("What is your Aptible Organization ID?")?;
        Ok(Some(id.trim().to_string()))
    }

    fn bind_external_id(&mut self, external_id: &str) {
        self.organization_id = Some(external_id.to_string());
    }

    async fn prompt_for_creds(&mut self, prompter: &dyn Prompter) -> IntegrationResult<()> {
        let (email, _) = env_or_prompt(APTIBLE_EMAIL_VAR, "Aptible Email", Echo::Visible, prompter)?;
        let (password, _) = env_or_prompt(
            APTIBLE_PASSWORD_VAR,
            "Aptible Password",
            Echo::Hidden,
            prompter,
        )?;

        let client = self.settings.http_client(SYSTEM)?;
        let mut request = TokenRequest::password_grant(email, password);
        let (mut status, mut response) = self.create_access_token(&client, &request).await?;

        if status == StatusCode::UNAUTHORIZED
            && response.error.as_deref() == Some("otp_token_required")
        {
            debug!("Aptible requires a 2FA token");
            request.otp_token = Some(prompter.input("Enter 2FA Token")?);
            (status, response) = self.create_access_token(&client, &request).await?;
        }

        if status != StatusCode::CREATED {
            return Err(IntegrationError::auth(format!(
                "Invalid credentials! {} ({})",
                response.message.unwrap_or_default(),
                status.as_u16()
            )));
        }

        let token = response.access_token.ok_or_else(|| {
            IntegrationError::auth("Invalid credentials! Missing access_token.")
        })?;
        info!("Authenticated to Aptible");
        self.session = Some((client, token));
        Ok(())
    }

    async fn fetch(&mut self, identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults> {
        let org_id = self.organization_id().await?;
        let users: Embedded<Users> = self
            .get_resource(&format!("organizations/{}/users", urlencoding::encode(&org_id)))
            .await?;

        Ok(users
            .embedded
            .users
            .into_iter()
            .filter(|user| identifiers.contains(&user.email))
            .map(|user| (user.email, user.id))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::test_support::ScriptedPrompter;
    use serial_test::serial;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn connector(server: &MockServer) -> Aptible {
        let settings = ConnectorSettings {
            aptible_url: server.uri(),
            ..ConnectorSettings::default()
        };
        Aptible::new(&settings)
    }

    fn prompter_with_login() -> ScriptedPrompter {
        ScriptedPrompter::new()
            .with_input("ops@example.com")
            .with_input("hunter2")
    }

    fn clear_env() {
        std::env::remove_var(APTIBLE_EMAIL_VAR);
        std::env::remove_var(APTIBLE_PASSWORD_VAR);
    }

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "access_token": "tok" })),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    #[serial]
    async fn password_grant_sends_expected_payload() {
        clear_env();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .and(body_partial_json(serde_json::json!({
                "expires_in": 43200,
                "grant_type": "password",
                "username": "ops@example.com",
                "password": "hunter2",
                "scope": "manage",
                "_source": "dashboard"
            })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut aptible = connector(&server);
        aptible
            .prompt_for_creds(&prompter_with_login())
            .await
            .expect("creds");
    }

    #[tokio::test]
    #[serial]
    async fn otp_challenge_prompts_and_retries_once() {
        clear_env();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .and(body_partial_json(serde_json::json!({ "otp_token": "123456" })))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(serde_json::json!({ "access_token": "tok" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "otp_token_required",
                "message": "2FA required"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let prompter = prompter_with_login().with_input("123456");
        let mut aptible = connector(&server);
        aptible.prompt_for_creds(&prompter).await.expect("creds");

        assert_eq!(
            prompter.prompts(),
            ["Aptible Email", "Aptible Password", "Enter 2FA Token"]
        );
    }

    #[tokio::test]
    #[serial]
    async fn rejected_password_is_an_auth_error() {
        clear_env();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": "invalid_credentials",
                "message": "Invalid email or password"
            })))
            .mount(&server)
            .await;

        let err = connector(&server)
            .prompt_for_creds(&prompter_with_login())
            .await
            .unwrap_err();

        assert!(err.is_auth());
        assert_eq!(
            err.to_string(),
            "Invalid credentials! Invalid email or password (401)"
        );
    }

    #[tokio::test]
    #[serial]
    async fn non_json_token_response_is_unexpected() {
        clear_env();
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tokens"))
            .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
            .mount(&server)
            .await;

        let err = connector(&server)
            .prompt_for_creds(&prompter_with_login())
            .await
            .unwrap_err();

        assert!(!err.is_auth());
        let message = err.to_string();
        assert!(message.starts_with("Unexpected response from Aptible! Invalid JSON"));
        assert!(message.ends_with("(502)"));
    }

    #[tokio::test]
    #[serial]
    async fn fetch_resolves_users_of_bound_organization() {
        clear_env();
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/organizations"))
            .and(header("Authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "organizations": [{ "id": "org-1" }, { "id": "org-2" }] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/organizations/org-2/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "users": [
                    { "id": "u-1", "email": "a@x.com" },
                    { "id": "u-9", "email": "other@x.com" }
                ] }
            })))
            .mount(&server)
            .await;

        let mut aptible = connector(&server);
        aptible.bind_external_id("org-2");
        aptible
            .prompt_for_creds(&prompter_with_login())
            .await
            .expect("creds");

        let wanted: BTreeSet<String> = ["a@x.com".to_string()].into_iter().collect();
        let results = aptible.fetch(&wanted).await.expect("fetch");

        assert_eq!(results.len(), 1);
        assert_eq!(results.get("a@x.com").map(String::as_str), Some("u-1"));
    }

    #[tokio::test]
    #[serial]
    async fn non_200_resource_is_a_connection_issue() {
        clear_env();
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/organizations"))
            .respond_with(
                ResponseTemplate::new(403)
                    .set_body_json(serde_json::json!({ "message": "Forbidden" })),
            )
            .mount(&server)
            .await;

        let mut aptible = connector(&server);
        aptible
            .prompt_for_creds(&prompter_with_login())
            .await
            .expect("creds");
        let err = aptible.fetch(&BTreeSet::new()).await.unwrap_err();

        assert_eq!(err.to_string(), "Aptible connection issue! Forbidden (403)");
    }

    #[tokio::test]
    #[serial]
    async fn user_without_email_is_unexpected() {
        clear_env();
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("GET"))
            .and(path("/organizations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "organizations": [{ "id": "org-1" }] }
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/organizations/org-1/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": { "users": [{ "id": "u-1" }] }
            })))
            .mount(&server)
            .await;

        let mut aptible = connector(&server);
        aptible
            .prompt_for_creds(&prompter_with_login())
            .await
            .expect("creds");
        let err = aptible.fetch(&BTreeSet::new()).await.unwrap_err();

        assert!(err
            .to_string()
            .starts_with("Unexpected response from Aptible! Invalid JSON"));
    }
}
