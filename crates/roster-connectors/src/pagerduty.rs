//! PagerDuty connector and REST client
//!
//! Users are matched by email against the full account user list, which is
//! enumerated with classic `offset`/`limit`/`more` pagination.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use roster_config::{env_or_prompt, Echo, PAGERDUTY_TOKEN_VAR};
use roster_core::{Connector, FetchResults, IntegrationError, IntegrationResult, Prompter};
use serde::Deserialize;
use tracing::{debug, info};

use crate::settings::ConnectorSettings;

pub const SLUG: &str = "pagerduty";

const SYSTEM: &str = "PagerDuty";
const ACCEPT_V2: &str = "application/vnd.pagerduty+json;version=2";
const PAGE_LIMIT: usize = 100;

/// A PagerDuty user as returned by `GET /users`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PagerDutyUser {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    users: Vec<PagerDutyUser>,
    #[serde(default)]
    more: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Authenticated PagerDuty REST API session
#[derive(Debug, Clone)]
pub struct PagerDutyClient {
    client: Client,
    base_url: String,
    token: String,
}

impl PagerDutyClient {
    pub fn new(client: Client, base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    fn get(&self, path: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/{}", self.base_url, path))
            .header(AUTHORIZATION, format!("Token token={}", self.token))
            .header(ACCEPT, ACCEPT_V2)
    }

    async fn send(&self, request: RequestBuilder) -> IntegrationResult<Response> {
        request
            .send()
            .await
            .map_err(|e| IntegrationError::connection(SYSTEM, e.to_string()))
    }

    /// Check the token with a one-user request
    pub async fn validate(&self) -> IntegrationResult<()> {
        let response = self.send(self.get("users?limit=1")).await?;
        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(IntegrationError::auth("Invalid API Key"))
            }
            status => Err(connection_error(response, status).await),
        }
    }

    /// Every user in the account, optionally narrowed by PagerDuty's `query`
    pub async fn list_users(&self, query: Option<&str>) -> IntegrationResult<Vec<PagerDutyUser>> {
        let mut users = Vec::new();
        let mut offset = 0;

        loop {
            let page = self.users_page(offset, query).await?;
            let count = page.users.len();
            users.extend(page.users);

            if !page.more || count == 0 {
                break;
            }
            offset += count;
        }

        debug!("Listed {} PagerDuty users", users.len());
        Ok(users)
    }

    async fn users_page(&self, offset: usize, query: Option<&str>) -> IntegrationResult<UsersPage> {
        let mut path = format!("users?limit={}&offset={}", PAGE_LIMIT, offset);
        if let Some(query) = query {
            path.push_str("&query=");
            path.push_str(&urlencoding::encode(query));
        }

        let response = self.send(self.get(&path)).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(connection_error(response, status).await);
        }

        let body = response
            .text()
            .await
            .map_err(|e| IntegrationError::connection(SYSTEM, e.to_string()))?;
        serde_json::from_str(&body)
            .map_err(|e| IntegrationError::unexpected(SYSTEM, format!("Invalid JSON: {e}")))
    }
}

async fn connection_error(response: Response, status: StatusCode) -> IntegrationError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.message)
        .unwrap_or_default();
    IntegrationError::connection(SYSTEM, format!("{} ({})", message, status.as_u16()))
}

/// PagerDuty connector; columns are bound to the account domain
#[derive(Debug)]
pub struct PagerDuty {
    settings: ConnectorSettings,
    domain: Option<String>,
    client: Option<PagerDutyClient>,
}

impl PagerDuty {
    pub fn new(settings: &ConnectorSettings) -> Self {
        Self {
            settings: settings.clone(),
            domain: None,
            client: None,
        }
    }
}

#[async_trait]
impl Connector for PagerDuty {
    fn slug(&self) -> &str {
        SLUG
    }

    async fn prompt_for_external_id(
        &mut self,
        prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>> {
        let domain = prompter.input("What is your PagerDuty domain?")?;
        Ok(Some(domain.trim().to_string()))
    }

    fn bind_external_id(&mut self, external_id: &str) {
        self.domain = Some(external_id.to_string());
    }

    async fn prompt_for_creds(&mut self, prompter: &dyn Prompter) -> IntegrationResult<()> {
        let (token, source) = env_or_prompt(
            PAGERDUTY_TOKEN_VAR,
            "Enter PagerDuty API Key",
            Echo::Hidden,
            prompter,
        )?;
        debug!("PagerDuty token from {}", source);

        let http = self.settings.http_client(SYSTEM)?;
        let client = PagerDutyClient::new(http, &self.settings.pagerduty_url, token);
        client.validate().await?;

        info!(
            "Authenticated to PagerDuty ({})",
            self.domain.as_deref().unwrap_or("unbound")
        );
        self.client = Some(client);
        Ok(())
    }

    async fn fetch(&mut self, identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| IntegrationError::auth("PagerDuty credentials were not acquired"))?;

        Ok(client
            .list_users(None)
            .await?
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
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> PagerDutyClient {
        PagerDutyClient::new(Client::new(), server.uri(), "secret")
    }

    fn user(id: &str, email: &str) -> serde_json::Value {
        serde_json::json!({ "id": id, "email": email, "name": format!("User {id}") })
    }

    #[tokio::test]
    async fn validate_sends_token_and_accept_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("limit", "1"))
            .and(header("Authorization", "Token token=secret"))
            .and(header("Accept", ACCEPT_V2))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [], "more": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).validate().await.expect("valid token");
    }

    #[tokio::test]
    async fn rejected_token_is_an_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": { "message": "Unauthorized", "code": 2006 }
            })))
            .mount(&server)
            .await;

        let err = client(&server).validate().await.unwrap_err();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Invalid API Key");
    }

    #[tokio::test]
    async fn server_error_is_a_connection_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
                "error": { "message": "Internal Error" }
            })))
            .mount(&server)
            .await;

        let err = client(&server).validate().await.unwrap_err();
        assert!(!err.is_auth());
        assert_eq!(
            err.to_string(),
            "PagerDuty connection issue! Internal Error (500)"
        );
    }

    #[tokio::test]
    async fn list_users_follows_offset_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("offset", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [user("P1", "a@x.com"), user("P2", "b@x.com")],
                "more": true
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("offset", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [user("P3", "c@x.com")],
                "more": false
            })))
            .mount(&server)
            .await;

        let users = client(&server).list_users(None).await.expect("users");
        let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, ["P1", "P2", "P3"]);
        assert_eq!(users[2].name, "User P3");
    }

    #[tokio::test]
    async fn list_users_passes_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .and(query_param("query", "ali ce"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [user("P1", "alice@x.com")],
                "more": false
            })))
            .expect(1)
            .mount(&server)
            .await;

        let users = client(&server).list_users(Some("ali ce")).await.expect("users");
        assert_eq!(users.len(), 1);
    }

    #[tokio::test]
    async fn user_without_email_is_an_unexpected_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [{ "id": "P1" }],
                "more": false
            })))
            .mount(&server)
            .await;

        let err = client(&server).list_users(None).await.unwrap_err();
        assert!(err
            .to_string()
            .starts_with("Unexpected response from PagerDuty! Invalid JSON"));
    }

    #[tokio::test]
    #[serial]
    async fn connector_resolves_requested_emails_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "users": [user("P1", "a@x.com"), user("P2", "z@x.com")],
                "more": false
            })))
            .mount(&server)
            .await;

        std::env::remove_var(PAGERDUTY_TOKEN_VAR);
        let settings = ConnectorSettings {
            pagerduty_url: server.uri(),
            ..ConnectorSettings::default()
        };
        let mut connector = PagerDuty::new(&settings);
        let prompter = ScriptedPrompter::new().with_input("typed-token");

        connector.prompt_for_creds(&prompter).await.expect("creds");
        let wanted: BTreeSet<String> = ["a@x.com", "b@x.com"].iter().map(|s| s.to_string()).collect();
        let results = connector.fetch(&wanted).await.expect("fetch");

        assert_eq!(prompter.prompts(), ["Enter PagerDuty API Key"]);
        assert_eq!(results.len(), 1);
        assert_eq!(results.get("a@x.com").map(String::as_str), Some("P1"));
    }

    #[tokio::test]
    async fn fetch_before_creds_fails() {
        let mut connector = PagerDuty::new(&ConnectorSettings::default());
        let err = connector.fetch(&BTreeSet::new()).await.unwrap_err();
        assert!(err.is_auth());
    }
}
