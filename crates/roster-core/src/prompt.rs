//! Operator interaction
//!
//! Every interactive read made by the driver or a connector goes through
//! [`Prompter`], so a terminal frontend and scripted test doubles are
//! interchangeable.

use crate::error::PromptError;

/// Blocking interactive input
pub trait Prompter: Send + Sync {
    /// Free-text answer
    fn input(&self, prompt: &str) -> Result<String, PromptError>;

    /// Hidden answer (passwords, API tokens, one-time codes)
    fn password(&self, prompt: &str) -> Result<String, PromptError>;

    /// Choose exactly one item; returns its index
    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError>;

    /// Choose any number of items; returns their indices
    fn multi_select(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>, PromptError>;
}
