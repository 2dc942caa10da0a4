use anyhow::{bail, Result};
use roster_config::RosterConfig;
use roster_connectors::{ConnectorSettings, PagerDutyClient};

/// List PagerDuty users as `email,name` lines
pub async fn execute(
    config: &RosterConfig,
    token: Option<String>,
    query: Option<String>,
    email_only: bool,
) -> Result<()> {
    let Some(token) = token.filter(|t| !t.is_empty()) else {
        bail!("You must supply a token, use `--token` or export `PD_API_TOKEN` in your shell");
    };

    let settings = ConnectorSettings::from_config(config);
    let client = PagerDutyClient::new(
        settings.http_client("PagerDuty")?,
        &settings.pagerduty_url,
        token,
    );

    for user in client.list_users(query.as_deref()).await? {
        if email_only {
            println!("{}", user.email);
        } else {
            println!("{},{}", user.email, user.name);
        }
    }
    Ok(())
}
