//! Mock implementations of [`Connector`] and [`Prompter`]
//!
//! - [`NoopConnector`]: the `test` integration; no external id, no
//!   credentials, resolves nothing.
//! - [`StubConnector`]: canned external id, results and failures, with a
//!   shared [`CallLog`] so tests can see what the driver asked for even
//!   though the registry constructs a fresh instance per column.
//! - [`ScriptedPrompter`]: replays queued answers and records every prompt.
//!
//! ```rust,ignore
//! use roster_core::test_support::StubConnector;
//!
//! let stub = StubConnector::new("pagerduty").with_result("a@x.com", "PD123");
//! let log = stub.log();
//! assert_eq!(log.creds_prompts(), 0);
//! ```

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::connector::{Connector, FetchResults};
use crate::error::{IntegrationError, IntegrationResult, PromptError};
use crate::prompt::Prompter;

/// Connector that does nothing
#[derive(Debug, Clone, Default)]
pub struct NoopConnector;

impl NoopConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for NoopConnector {
    fn slug(&self) -> &str {
        "test"
    }

    async fn prompt_for_external_id(
        &mut self,
        _prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>> {
        Ok(None)
    }

    async fn prompt_for_creds(&mut self, _prompter: &dyn Prompter) -> IntegrationResult<()> {
        Ok(())
    }

    async fn fetch(&mut self, _identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults> {
        Ok(FetchResults::new())
    }
}

/// Calls observed across every instance cloned from one [`StubConnector`]
#[derive(Debug, Default)]
struct Calls {
    external_id_prompts: usize,
    creds_prompts: usize,
    bound: Vec<String>,
    fetches: Vec<BTreeSet<String>>,
}

/// Shared handle onto a stub's recorded calls
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    inner: Arc<Mutex<Calls>>,
}

impl CallLog {
    fn with<T>(&self, f: impl FnOnce(&mut Calls) -> T) -> T {
        let mut calls = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut calls)
    }

    pub fn external_id_prompts(&self) -> usize {
        self.with(|c| c.external_id_prompts)
    }

    pub fn creds_prompts(&self) -> usize {
        self.with(|c| c.creds_prompts)
    }

    pub fn bound(&self) -> Vec<String> {
        self.with(|c| c.bound.clone())
    }

    pub fn fetches(&self) -> Vec<BTreeSet<String>> {
        self.with(|c| c.fetches.clone())
    }
}

/// Connector with scripted behaviour
#[derive(Debug, Clone)]
pub struct StubConnector {
    slug: String,
    external_id: Option<String>,
    importing_new: bool,
    auth_failure: Option<String>,
    fetch_failure: Option<String>,
    results: FetchResults,
    log: CallLog,
}

impl StubConnector {
    pub fn new(slug: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            external_id: None,
            importing_new: false,
            auth_failure: None,
            fetch_failure: None,
            results: BTreeMap::new(),
            log: CallLog::default(),
        }
    }

    /// Answer `prompt_for_external_id` with this id
    pub fn with_external_id(mut self, external_id: impl Into<String>) -> Self {
        self.external_id = Some(external_id.into());
        self
    }

    pub fn with_importing_new(mut self) -> Self {
        self.importing_new = true;
        self
    }

    /// Fail `prompt_for_creds` with an auth error
    pub fn with_auth_failure(mut self, message: impl Into<String>) -> Self {
        self.auth_failure = Some(message.into());
        self
    }

    /// Fail `fetch` with an unexpected-response error
    pub fn with_fetch_failure(mut self, message: impl Into<String>) -> Self {
        self.fetch_failure = Some(message.into());
        self
    }

    /// Resolve `identifier` to `external_id` whenever it is requested
    pub fn with_result(mut self, identifier: &str, external_id: &str) -> Self {
        self.results
            .insert(identifier.to_string(), external_id.to_string());
        self
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    /// Constructor suitable for a registry; every instance shares this stub's log
    pub fn factory(self) -> impl Fn() -> Box<dyn Connector> + Send + Sync + 'static {
        move || -> Box<dyn Connector> { Box::new(self.clone()) }
    }
}

#[async_trait]
impl Connector for StubConnector {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn supports_importing_new(&self) -> bool {
        self.importing_new
    }

    async fn prompt_for_external_id(
        &mut self,
        _prompter: &dyn Prompter,
    ) -> IntegrationResult<Option<String>> {
        self.log.with(|c| c.external_id_prompts += 1);
        Ok(self.external_id.clone())
    }

    fn bind_external_id(&mut self, external_id: &str) {
        self.log.with(|c| c.bound.push(external_id.to_string()));
    }

    async fn prompt_for_creds(&mut self, _prompter: &dyn Prompter) -> IntegrationResult<()> {
        self.log.with(|c| c.creds_prompts += 1);
        match &self.auth_failure {
            Some(message) => Err(IntegrationError::auth(message.clone())),
            None => Ok(()),
        }
    }

    async fn fetch(&mut self, identifiers: &BTreeSet<String>) -> IntegrationResult<FetchResults> {
        self.log.with(|c| c.fetches.push(identifiers.clone()));
        if let Some(message) = &self.fetch_failure {
            return Err(IntegrationError::unexpected(self.slug.clone(), message.clone()));
        }
        Ok(self
            .results
            .iter()
            .filter(|(id, _)| identifiers.contains(*id))
            .map(|(id, value)| (id.clone(), value.clone()))
            .collect())
    }
}

#[derive(Debug, Clone)]
enum Answer {
    Text(String),
    Selection(usize),
    Selections(Vec<usize>),
}

/// Prompter that replays queued answers in order
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an answer for the next `input` or `password` prompt
    pub fn with_input(self, answer: impl Into<String>) -> Self {
        self.push(Answer::Text(answer.into()))
    }

    /// Queue an answer for the next `select` prompt
    pub fn with_selection(self, index: usize) -> Self {
        self.push(Answer::Selection(index))
    }

    /// Queue an answer for the next `multi_select` prompt
    pub fn with_selections(self, indices: Vec<usize>) -> Self {
        self.push(Answer::Selections(indices))
    }

    fn push(self, answer: Answer) -> Self {
        self.answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(answer);
        self
    }

    /// Every prompt shown so far, in order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn next(&self, prompt: &str) -> Result<Answer, PromptError> {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());
        self.answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| PromptError::NoAnswer(prompt.to_string()))
    }
}

impl Prompter for ScriptedPrompter {
    fn input(&self, prompt: &str) -> Result<String, PromptError> {
        match self.next(prompt)? {
            Answer::Text(text) => Ok(text),
            _ => Err(PromptError::NoAnswer(prompt.to_string())),
        }
    }

    fn password(&self, prompt: &str) -> Result<String, PromptError> {
        self.input(prompt)
    }

    fn select(&self, prompt: &str, items: &[String]) -> Result<usize, PromptError> {
        match self.next(prompt)? {
            Answer::Selection(index) if index < items.len() => Ok(index),
            _ => Err(PromptError::NoAnswer(prompt.to_string())),
        }
    }

    fn multi_select(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>, PromptError> {
        match self.next(prompt)? {
            Answer::Selections(indices) if indices.iter().all(|&i| i < items.len()) => {
                Ok(indices)
            }
            _ => Err(PromptError::NoAnswer(prompt.to_string())),
        }
    }
}
