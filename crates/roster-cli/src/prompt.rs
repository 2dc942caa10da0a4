//! Terminal prompts backed by `dialoguer`

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, MultiSelect, Password, Select};
use roster_core::{PromptError, Prompter};

/// Interactive prompter for a real terminal
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

fn io_error(err: dialoguer::Error) -> PromptError {
    PromptError::Io(std::io::Error::other(err.to_string()))
}

impl Prompter for TerminalPrompter {
    fn input(&self, prompt: &str) -> Result<String, PromptError> {
        Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact_text()
            .map_err(io_error)
    }

    fn password(&self, prompt: &str) -> Result<String, PromptError> {
        Password::with_theme(&self.theme)
            .with_prompt(prompt)
            .interact()
            .map_err(io_error)
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(io_error)
    }

    fn multi_select(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>, PromptError> {
        MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .interact()
            .map_err(io_error)
    }
}
