//! Credential resolution for external systems
//!
//! Every connector resolves secrets the same way:
//! 1. Environment variable (e.g., `PD_API_TOKEN`)
//! 2. One blocking interactive prompt
//!
//! Secrets are never written to disk.

use std::fmt;

use roster_core::{PromptError, Prompter};
use tracing::debug;

/// PagerDuty REST API token
pub const PAGERDUTY_TOKEN_VAR: &str = "PD_API_TOKEN";

/// Aptible login email
pub const APTIBLE_EMAIL_VAR: &str = "APTIBLE_EMAIL";

/// Aptible login password
pub const APTIBLE_PASSWORD_VAR: &str = "APTIBLE_PASSWORD";

/// Source of a resolved credential
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// From an environment variable
    EnvVar,
    /// Typed in by the operator
    Prompt,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::EnvVar => write!(f, "env"),
            CredentialSource::Prompt => write!(f, "prompt"),
        }
    }
}

/// How the prompt fallback should read the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Echo {
    Visible,
    Hidden,
}

/// Resolve a credential from `var`, falling back to prompting for `label`.
///
/// An empty environment variable counts as unset.
pub fn env_or_prompt(
    var: &str,
    label: &str,
    echo: Echo,
    prompter: &dyn Prompter,
) -> Result<(String, CredentialSource), PromptError> {
    env_or_prompt_with(var, label, echo, prompter, |name| std::env::var(name).ok())
}

/// [`env_or_prompt`] with an explicit environment lookup
pub fn env_or_prompt_with(
    var: &str,
    label: &str,
    echo: Echo,
    prompter: &dyn Prompter,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(String, CredentialSource), PromptError> {
    if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
        debug!("Resolved {} from env var {}", label, var);
        return Ok((value, CredentialSource::EnvVar));
    }

    let value = match echo {
        Echo::Visible => prompter.input(label)?,
        Echo::Hidden => prompter.password(label)?,
    };
    debug!("Resolved {} from prompt", label);
    Ok((value, CredentialSource::Prompt))
}
