//! Ledger column keys
//!
//! A column key is either a bare integration slug (`pagerduty`) or a slug
//! bound to an external sub-resource (`aws_sso:arn:aws:sso:::instance/ssoins-123`).
//! Only the first delimiter splits the key; everything after it is the
//! opaque external id.

use std::fmt;

/// Separator between the slug and the external id in a column key
pub const KEY_DELIMITER: char = ':';

/// A parsed ledger column name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnKey {
    raw: String,
}

impl ColumnKey {
    /// Wrap a column name as it appears in the ledger header
    pub fn parse(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// The integration slug (the whole key when unbound)
    pub fn slug(&self) -> &str {
        match self.raw.split_once(KEY_DELIMITER) {
            Some((slug, _)) => slug,
            None => &self.raw,
        }
    }

    /// The bound external id, if any
    pub fn external_id(&self) -> Option<&str> {
        self.raw.split_once(KEY_DELIMITER).map(|(_, id)| id)
    }

    /// Whether an external id has already been bound into this key
    pub fn is_bound(&self) -> bool {
        self.raw.contains(KEY_DELIMITER)
    }

    /// Produce the compound key `self:external_id`
    pub fn bind(&self, external_id: &str) -> Self {
        Self {
            raw: format!("{}{}{}", self.raw, KEY_DELIMITER, external_id),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for ColumnKey {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl From<String> for ColumnKey {
    fn from(raw: String) -> Self {
        Self::parse(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_key_is_its_own_slug() {
        let key = ColumnKey::parse("pagerduty");
        assert_eq!(key.slug(), "pagerduty");
        assert_eq!(key.external_id(), None);
        assert!(!key.is_bound());
    }

    #[test]
    fn compound_key_splits_on_first_delimiter_only() {
        let key = ColumnKey::parse("aws_sso:arn:aws:sso:::instance/ssoins-123");
        assert_eq!(key.slug(), "aws_sso");
        assert_eq!(key.external_id(), Some("arn:aws:sso:::instance/ssoins-123"));
        assert!(key.is_bound());
    }

    #[test]
    fn bind_appends_external_id() {
        let key = ColumnKey::parse("aptible").bind("org-42");
        assert_eq!(key.as_str(), "aptible:org-42");
        assert_eq!(key.slug(), "aptible");
        assert_eq!(key.external_id(), Some("org-42"));
    }

    #[test]
    fn empty_external_id_still_counts_as_bound() {
        let key = ColumnKey::parse("pagerduty").bind("");
        assert!(key.is_bound());
        assert_eq!(key.external_id(), Some(""));
    }
}
