//! # Roster Configuration
//!
//! Configuration file loading with environment overrides, and the shared
//! environment-then-prompt credential resolution used by every connector.

#![warn(clippy::all)]

mod config;
pub mod credentials;

pub use config::*;
pub use credentials::{
    env_or_prompt, env_or_prompt_with, CredentialSource, Echo, APTIBLE_EMAIL_VAR,
    APTIBLE_PASSWORD_VAR, PAGERDUTY_TOKEN_VAR,
};
