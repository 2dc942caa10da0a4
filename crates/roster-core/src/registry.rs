//! Slug → connector constructor registry
//!
//! Registries are built once at process start and then read-only. Use
//! [`ConnectorRegistry::builder`] to register connectors, then call
//! `.build()` to get the immutable registry.
//!
//! ```rust,ignore
//! let registry = ConnectorRegistry::builder()
//!     .register("pagerduty", || Box::new(PagerDuty::new(settings.clone())))?
//!     .build();
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::column::KEY_DELIMITER;
use crate::connector::Connector;
use crate::error::RegistryError;

/// Zero-argument constructor for a connector
pub type ConnectorFactory = Arc<dyn Fn() -> Box<dyn Connector> + Send + Sync>;

/// Read-only mapping from slug to connector constructor, in registration order
#[derive(Clone, Default)]
pub struct ConnectorRegistry {
    entries: Vec<(String, ConnectorFactory)>,
}

impl ConnectorRegistry {
    pub fn builder() -> ConnectorRegistryBuilder {
        ConnectorRegistryBuilder::default()
    }

    /// Look up the constructor for `slug`
    pub fn resolve(&self, slug: &str) -> Result<&ConnectorFactory, RegistryError> {
        self.entries
            .iter()
            .find(|(s, _)| s == slug)
            .map(|(_, factory)| factory)
            .ok_or_else(|| RegistryError::UnknownIntegration(slug.to_string()))
    }

    /// Construct a fresh connector for `slug`
    pub fn create(&self, slug: &str) -> Result<Box<dyn Connector>, RegistryError> {
        self.resolve(slug).map(|factory| factory())
    }

    pub fn is_supported(&self, slug: &str) -> bool {
        self.entries.iter().any(|(s, _)| s == slug)
    }

    /// Registered slugs in registration order
    pub fn known_slugs(&self) -> Vec<&str> {
        self.entries.iter().map(|(s, _)| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorRegistry")
            .field("slugs", &self.known_slugs())
            .finish()
    }
}

/// Accumulates registrations for a [`ConnectorRegistry`]
#[derive(Default)]
pub struct ConnectorRegistryBuilder {
    entries: Vec<(String, ConnectorFactory)>,
}

impl ConnectorRegistryBuilder {
    /// Register a constructor under `slug`.
    ///
    /// Fails if the slug is already taken, empty, or contains the column key
    /// delimiter.
    pub fn register<F>(mut self, slug: impl Into<String>, factory: F) -> Result<Self, RegistryError>
    where
        F: Fn() -> Box<dyn Connector> + Send + Sync + 'static,
    {
        let slug = slug.into();
        if slug.is_empty() || slug.contains(KEY_DELIMITER) {
            return Err(RegistryError::InvalidSlug(slug));
        }
        if self.entries.iter().any(|(s, _)| *s == slug) {
            return Err(RegistryError::DuplicateSlug(slug));
        }
        debug!("Registered integration '{}'", slug);
        self.entries.push((slug, Arc::new(factory)));
        Ok(self)
    }

    pub fn build(self) -> ConnectorRegistry {
        ConnectorRegistry {
            entries: self.entries,
        }
    }
}
