//! Roster configuration
//!
//! Loaded with precedence `defaults < file < environment < CLI flags`. The
//! CLI applies its own overrides after [`RosterConfig::load`] returns.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from loading or writing configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config file {}: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to write config file {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("could not determine config directory")]
    NoConfigDir,
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub pagerduty: PagerDutyConfig,
    #[serde(default)]
    pub aptible: AptibleConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
}

/// Network configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Per-call timeout in seconds for HTTP and AWS requests
    pub timeout_secs: u64,
}

/// PagerDuty API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagerDutyConfig {
    /// REST API base URL
    pub api_url: String,
}

/// Aptible auth API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AptibleConfig {
    /// Auth API base URL
    pub auth_url: String,
}

/// Ledger handling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Columns that identify a person and are never reconciled by default
    pub identity_columns: Vec<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { timeout_secs: 30 }
    }
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.pagerduty.com".to_string(),
        }
    }
}

impl Default for AptibleConfig {
    fn default() -> Self {
        Self {
            auth_url: "https://auth.aptible.com".to_string(),
        }
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            identity_columns: vec![
                "email".to_string(),
                "sym:cloud".to_string(),
                "User ID".to_string(),
            ],
        }
    }
}

impl NetworkConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RosterConfig {
    /// Load configuration: defaults, then the config file, then environment
    pub fn load(config_file: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::from_file_or_default(config_file)?;
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(timeout) = lookup("ROSTER_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|&secs| secs > 0)
        {
            self.network.timeout_secs = timeout;
        }
        if let Some(url) = lookup("ROSTER_PAGERDUTY_URL").filter(|v| !v.is_empty()) {
            self.pagerduty.api_url = url;
        }
        if let Some(url) = lookup("ROSTER_APTIBLE_URL").filter(|v| !v.is_empty()) {
            self.aptible.auth_url = url;
        }
    }

    /// Default config file path: `$XDG_CONFIG_HOME/roster/config.toml`
    pub fn default_config_path() -> ConfigResult<PathBuf> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("roster").join("config.toml"))
    }

    /// Parse a config file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if config.network.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                path: path.to_path_buf(),
                reason: "network.timeout_secs must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Load config from file or return default
    fn from_file_or_default(config_file: Option<PathBuf>) -> ConfigResult<Self> {
        if config_file.is_none() && std::env::var("ROSTER_TEST_MODE").is_ok() {
            return Ok(Self::default());
        }

        let path = config_file
            .or_else(|| Self::default_config_path().ok())
            .filter(|p| p.exists());

        match path {
            Some(path) => {
                debug!("Loading config from {}", path.display());
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Display the configuration as TOML
    pub fn display_as_toml(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Create a new config file with example values
    pub fn create_example(path: &Path) -> ConfigResult<()> {
        let example = r#"# Roster Configuration
# Location: ~/.config/roster/config.toml

[network]
# Per-request timeout in seconds (HTTP and AWS calls)
# Env: ROSTER_TIMEOUT_SECS
timeout_secs = 30

[pagerduty]
# Env: ROSTER_PAGERDUTY_URL
api_url = "https://api.pagerduty.com"

[aptible]
# Env: ROSTER_APTIBLE_URL
auth_url = "https://auth.aptible.com"

[ledger]
# Columns that identify a person; never reconciled unless named with --integration
identity_columns = ["email", "sym:cloud", "User ID"]

# Credentials are never stored here. They are read from the environment
# (PD_API_TOKEN, APTIBLE_EMAIL, APTIBLE_PASSWORD, the AWS default chain)
# or prompted for interactively.
"#;

        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, example).map_err(write_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_public_endpoints() {
        let config = RosterConfig::default();
        assert_eq!(config.network.timeout(), Duration::from_secs(30));
        assert_eq!(config.pagerduty.api_url, "https://api.pagerduty.com");
        assert_eq!(config.aptible.auth_url, "https://auth.aptible.com");
        assert_eq!(
            config.ledger.identity_columns,
            ["email", "sym:cloud", "User ID"]
        );
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\ntimeout_secs = 5\n").unwrap();

        let config = RosterConfig::from_file(&path).expect("parse");
        assert_eq!(config.network.timeout_secs, 5);
        assert_eq!(config.pagerduty, PagerDutyConfig::default());
    }

    #[test]
    fn invalid_file_reports_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "not valid toml {{{").unwrap();

        let err = RosterConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("ROSTER_TIMEOUT_SECS", "12"),
            ("ROSTER_PAGERDUTY_URL", "http://localhost:9000"),
            ("ROSTER_APTIBLE_URL", ""),
        ]
        .into_iter()
        .collect();

        let mut config = RosterConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.network.timeout_secs, 12);
        assert_eq!(config.pagerduty.api_url, "http://localhost:9000");
        assert_eq!(config.aptible.auth_url, "https://auth.aptible.com");
    }

    #[test]
    fn unparseable_or_zero_timeout_is_ignored() {
        for value in ["soon", "0"] {
            let mut config = RosterConfig::default();
            config.apply_env(|name| (name == "ROSTER_TIMEOUT_SECS").then(|| value.to_string()));
            assert_eq!(config.network.timeout_secs, 30);
        }
    }

    #[test]
    fn zero_timeout_in_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[network]\ntimeout_secs = 0\n").unwrap();

        let err = RosterConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("timeout_secs"));
    }

    #[test]
    fn example_file_parses_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        RosterConfig::create_example(&path).expect("create");
        let config = RosterConfig::from_file(&path).expect("parse");

        assert_eq!(config, RosterConfig::default());
    }

    #[test]
    fn display_as_toml_round_trips() {
        let config = RosterConfig::default();
        let rendered = config.display_as_toml().expect("render");
        let parsed: RosterConfig = toml::from_str(&rendered).expect("parse");
        assert_eq!(parsed, config);
    }
}
