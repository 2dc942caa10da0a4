//! CSV-backed identity ledger
//!
//! One row per person, keyed by the `sym:cloud` value (falling back to
//! `email`), and one column per integration identifier. Every row carries a
//! value for every column; an empty string means "not yet resolved".
//!
//! Column order is fixed by the header on load and only ever grows at the end
//! through [`Ledger::ensure_column`]. Row order is first-seen order; a
//! duplicate row key replaces the earlier row's values in place.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{LedgerError, LedgerResult};

/// Preferred row-key column
pub const SYM_CLOUD_COLUMN: &str = "sym:cloud";

/// Fallback row-key column
pub const EMAIL_COLUMN: &str = "email";

/// Row-key columns in precedence order
pub const ROW_KEY_COLUMNS: [&str; 2] = [SYM_CLOUD_COLUMN, EMAIL_COLUMN];

/// In-memory table of identities
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    columns: Vec<String>,
    keys: Vec<String>,
    rows: Vec<Vec<String>>,
    index: HashMap<String, usize>,
}

impl Ledger {
    /// Build an empty ledger with the given header
    pub fn with_columns<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Load a ledger from a CSV file with a header row
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|source| LedgerError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::from_csv(reader, path)
    }

    /// Load a ledger from any reader; `origin` is only used in error messages
    pub fn from_reader<R: io::Read>(reader: R, origin: impl AsRef<Path>) -> LedgerResult<Self> {
        let reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
        Self::from_csv(reader, origin.as_ref())
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>, origin: &Path) -> LedgerResult<Self> {
        let read_err = |source| LedgerError::Read {
            path: origin.to_path_buf(),
            source,
        };
        let malformed = |reason: String| LedgerError::Malformed {
            path: origin.to_path_buf(),
            reason,
        };

        let header = reader.headers().map_err(read_err)?.clone();
        if header.is_empty() || header.iter().all(str::is_empty) {
            return Err(malformed("no header row".to_string()));
        }

        let columns: Vec<String> = header.iter().map(str::to_string).collect();
        for (i, column) in columns.iter().enumerate() {
            if columns[..i].contains(column) {
                return Err(malformed(format!("duplicate column '{column}'")));
            }
        }

        let key_positions: Vec<usize> = ROW_KEY_COLUMNS
            .iter()
            .filter_map(|name| columns.iter().position(|c| c == name))
            .collect();
        if key_positions.is_empty() {
            return Err(malformed(format!(
                "no row-key column (expected '{SYM_CLOUD_COLUMN}' or '{EMAIL_COLUMN}')"
            )));
        }

        let mut ledger = Self::with_columns(columns);
        for (line, record) in reader.records().enumerate() {
            let record = record.map_err(read_err)?;
            if record.len() > ledger.columns.len() {
                warn!(
                    "Row {} of {} has {} fields but the header has {}; extra fields dropped",
                    line + 2,
                    origin.display(),
                    record.len(),
                    ledger.columns.len()
                );
            }

            let mut values: Vec<String> = record
                .iter()
                .take(ledger.columns.len())
                .map(str::to_string)
                .collect();
            values.resize(ledger.columns.len(), String::new());

            let key = key_positions
                .iter()
                .map(|&pos| values[pos].as_str())
                .find(|value| !value.is_empty())
                .unwrap_or_default()
                .to_string();
            if key.is_empty() {
                warn!(
                    "Row {} of {} has no row key; it is kept but never reconciled",
                    line + 2,
                    origin.display()
                );
            }
            ledger.upsert(key, values);
        }

        debug!(
            "Loaded {} rows and {} columns from {}",
            ledger.len(),
            ledger.columns.len(),
            origin.display()
        );
        Ok(ledger)
    }

    fn upsert(&mut self, key: String, values: Vec<String>) {
        // Rows without a key cannot be matched against anything; keep each one as is.
        if key.is_empty() {
            self.keys.push(key);
            self.rows.push(values);
            return;
        }
        match self.index.get(&key) {
            Some(&pos) => {
                debug!("Duplicate row key '{}'; keeping the later row", key);
                self.rows[pos] = values;
            }
            None => {
                self.index.insert(key.clone(), self.keys.len());
                self.keys.push(key);
                self.rows.push(values);
            }
        }
    }

    /// Current schema in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.column_position(column).is_some()
    }

    fn column_position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// Row keys in row order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Value of one cell, `None` if the row or column does not exist
    pub fn get(&self, key: &str, column: &str) -> Option<&str> {
        let row = *self.index.get(key)?;
        let col = self.column_position(column)?;
        Some(self.rows[row][col].as_str())
    }

    /// Add a column at the end, back-filling empty values. Returns whether it was added.
    pub fn ensure_column(&mut self, column: &str) -> bool {
        if self.contains_column(column) {
            return false;
        }
        self.columns.push(column.to_string());
        for row in &mut self.rows {
            row.push(String::new());
        }
        debug!("Added column '{}'", column);
        true
    }

    /// Non-empty row keys in row order
    pub fn lookup_keys(&self) -> impl Iterator<Item = &str> {
        self.keys().filter(|key| !key.is_empty())
    }

    /// Row keys whose value in `column` is empty or absent.
    ///
    /// Rows without a key are never reported: there is nothing to look up.
    pub fn missing_rows(&self, column: &str) -> Vec<String> {
        let col = self.column_position(column);
        self.keys
            .iter()
            .zip(&self.rows)
            .filter(|(key, _)| !key.is_empty())
            .filter(|(_, row)| col.map_or(true, |col| row[col].is_empty()))
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Write fetched values into `column` for keys already in the ledger.
    ///
    /// Keys not present in the ledger are ignored. Returns the number of rows
    /// written.
    pub fn merge(&mut self, column: &str, values: &BTreeMap<String, String>) -> usize {
        self.ensure_column(column);
        let Some(col) = self.column_position(column) else {
            return 0;
        };

        let mut written = 0;
        for (key, value) in values {
            match self.index.get(key) {
                Some(&row) => {
                    self.rows[row][col] = value.clone();
                    written += 1;
                }
                None => debug!("Ignoring result for '{}' which is not in the ledger", key),
            }
        }
        written
    }

    /// Serialize header and rows to any writer
    pub fn write_to<W: io::Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write the ledger to `path`, replacing its contents
    pub fn write(&self, path: impl AsRef<Path>) -> LedgerResult<()> {
        let path = path.as_ref();
        let write_err = |source: io::Error| LedgerError::Write {
            path: path.to_path_buf(),
            source,
        };

        let file = std::fs::File::create(path).map_err(write_err)?;
        self.write_to(file)
            .map_err(|e| write_err(io::Error::from(e)))?;

        debug!("Wrote {} rows to {}", self.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(csv: &str) -> Ledger {
        Ledger::from_reader(csv.as_bytes(), "test.csv").expect("parse ledger")
    }

    #[test]
    fn load_keys_rows_by_email() {
        let ledger = parse("email,pagerduty\na@x.com,\nb@x.com,PD9\n");
        assert_eq!(ledger.columns(), ["email", "pagerduty"]);
        assert_eq!(ledger.keys().collect::<Vec<_>>(), ["a@x.com", "b@x.com"]);
        assert_eq!(ledger.get("b@x.com", "pagerduty"), Some("PD9"));
    }

    #[test]
    fn sym_cloud_takes_precedence_over_email() {
        let ledger = parse("email,sym:cloud\nwork@x.com,sso@x.com\nonly@x.com,\n");
        let keys: Vec<_> = ledger.keys().collect();
        assert_eq!(keys, ["sso@x.com", "only@x.com"]);
    }

    #[test]
    fn empty_input_is_malformed() {
        let err = Ledger::from_reader("".as_bytes(), "empty.csv").unwrap_err();
        assert!(matches!(err, LedgerError::Malformed { .. }));
    }

    #[test]
    fn header_without_key_column_is_malformed() {
        let err = Ledger::from_reader("name,pagerduty\nA,\n".as_bytes(), "x.csv").unwrap_err();
        match err {
            LedgerError::Malformed { reason, .. } => assert!(reason.contains("row-key")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_keys_keep_last_row_in_first_position() {
        let ledger = parse("email,iam\na@x.com,first\nb@x.com,\na@x.com,second\n");
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.keys().collect::<Vec<_>>(), ["a@x.com", "b@x.com"]);
        assert_eq!(ledger.get("a@x.com", "iam"), Some("second"));
    }

    #[test]
    fn short_rows_are_padded() {
        let ledger = parse("email,iam,pagerduty\na@x.com\n");
        assert_eq!(ledger.get("a@x.com", "pagerduty"), Some(""));
    }

    #[test]
    fn ensure_column_is_idempotent() {
        let mut ledger = parse("email,iam\na@x.com,arn:1\n");
        assert!(ledger.ensure_column("pagerduty"));
        let after_first = ledger.clone();
        assert!(!ledger.ensure_column("pagerduty"));
        assert_eq!(ledger, after_first);
        assert_eq!(ledger.columns(), ["email", "iam", "pagerduty"]);
        assert_eq!(ledger.get("a@x.com", "iam"), Some("arn:1"));
        assert_eq!(ledger.get("a@x.com", "pagerduty"), Some(""));
    }

    #[test]
    fn missing_rows_for_absent_column_matches_after_ensure() {
        let mut ledger = parse("email\na@x.com\nb@x.com\n");
        let before = ledger.missing_rows("aptible");
        ledger.ensure_column("aptible");
        assert_eq!(before, ledger.missing_rows("aptible"));
        assert_eq!(before, ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn merge_never_adds_rows() {
        let mut ledger = parse("email,pagerduty\na@x.com,\nb@x.com,already-set\n");
        let mut values = BTreeMap::new();
        values.insert("a@x.com".to_string(), "PD123".to_string());
        values.insert("stranger@x.com".to_string(), "PD999".to_string());

        let written = ledger.merge("pagerduty", &values);

        assert_eq!(written, 1);
        assert_eq!(ledger.len(), 2);
        assert!(!ledger.contains_key("stranger@x.com"));
        assert_eq!(ledger.get("a@x.com", "pagerduty"), Some("PD123"));
        assert_eq!(ledger.get("b@x.com", "pagerduty"), Some("already-set"));
    }

    #[test]
    fn write_then_load_round_trips() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("users.csv");
        std::fs::write(
            &path,
            "email,User ID,notes,pagerduty\na@x.com,1,\"likes, commas\",PD1\nb@x.com,2,,\n",
        )
        .expect("write fixture");

        let original = Ledger::load(&path).expect("load");
        original.write(&path).expect("write");
        let reloaded = Ledger::load(&path).expect("reload");

        assert_eq!(original, reloaded);
        assert_eq!(reloaded.get("a@x.com", "notes"), Some("likes, commas"));
    }

    #[test]
    fn write_to_missing_directory_fails_with_path() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("missing").join("users.csv");
        let err = Ledger::with_columns(["email"]).write(&path).unwrap_err();
        match err {
            LedgerError::Write { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rows_without_a_key_are_kept_but_never_missing() {
        let csv = "email,iam,notes\na@x.com,,\n,,spare row\n,,another\n";
        let ledger = parse(csv);

        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.missing_rows("iam"), ["a@x.com"]);
        assert_eq!(ledger.missing_rows("pagerduty"), ["a@x.com"]);
        assert_eq!(ledger.lookup_keys().collect::<Vec<_>>(), ["a@x.com"]);

        let mut out = Vec::new();
        ledger.write_to(&mut out).expect("write");
        assert_eq!(String::from_utf8(out).expect("utf8"), csv);
    }
}
