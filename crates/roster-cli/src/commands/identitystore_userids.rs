use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use roster_config::RosterConfig;
use roster_connectors::aws::{find_user_id, list_sso_instances, load_sdk_config, SsoInstance};
use tracing::debug;

const HEADERS: [&str; 3] = ["Email", "IdentityStoreId", "PrincipalId"];

/// One resolved username
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdRow {
    pub username: String,
    pub identity_store_id: String,
    pub user_id: String,
}

impl UserIdRow {
    fn fields(&self) -> [&str; 3] {
        [&self.username, &self.identity_store_id, &self.user_id]
    }
}

/// Resolve Identity Store user ids for `usernames` (or the usernames in `infile`)
pub async fn execute(
    config: &RosterConfig,
    usernames: Vec<String>,
    identitystore_id: Option<String>,
    infile: Option<PathBuf>,
    outfile: Option<PathBuf>,
) -> Result<()> {
    let usernames = match infile {
        Some(path) => read_usernames(&path)?,
        None => usernames,
    };
    if usernames.is_empty() {
        bail!("No usernames given; pass them as arguments or with --infile");
    }

    let sdk_config = load_sdk_config(config.network.timeout()).await;
    let identity_store_id = match identitystore_id {
        Some(id) => id,
        None => pick_identity_store(&list_sso_instances(&sdk_config).await?)?,
    };
    debug!("Using identity store {}", identity_store_id);

    let mut rows = Vec::with_capacity(usernames.len());
    for username in usernames {
        let user_id = find_user_id(&sdk_config, &identity_store_id, &username)
            .await?
            .ok_or_else(|| anyhow!("Could not find a UserId for Username: {username}"))?;
        rows.push(UserIdRow {
            username,
            identity_store_id: identity_store_id.clone(),
            user_id,
        });
    }

    println!("{}", rows_table(&rows));

    if let Some(path) = outfile {
        let written = write_rows(&path, &rows)?;
        println!("\nWrote {} rows to {}", written, path.display());
    }
    Ok(())
}

/// The only identity store, or an error naming what the operator must do
pub fn pick_identity_store(instances: &[SsoInstance]) -> Result<String> {
    match instances {
        [only] => Ok(only.identity_store_id.clone()),
        [] => bail!("No AWS SSO instances found for the current account"),
        _ => bail!(
            "Found more than one AWS SSO instance. Please specify the Identity store ID via the --identitystore-id option"
        ),
    }
}

/// Usernames from the first column of a CSV, header row skipped
pub fn read_usernames(path: &Path) -> Result<Vec<String>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let mut usernames = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Failed to read {}", path.display()))?;
        if let Some(username) = record.get(0).filter(|u| !u.is_empty()) {
            usernames.push(username.to_string());
        }
    }
    Ok(usernames)
}

fn rows_table(rows: &[UserIdRow]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(HEADERS);
    for row in rows {
        table.add_row(row.fields());
    }
    table
}

/// Write the header and `rows` with every field quoted; returns the line count
pub fn write_rows(path: &Path, rows: &[UserIdRow]) -> Result<usize> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record(row.fields())?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(rows.len() + 1)
}
