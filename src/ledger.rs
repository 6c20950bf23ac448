//! Error ledger: entity key (file path, folder path or synthetic label) to the
//! issues raised against it. Append-only during a run, deduplicated on output.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

use crate::codes::{ErrorCode, EXCEPTION_TAG};
use crate::error::{AuditError, Result};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Issue {
    Code(ErrorCode),
    /// A local failure (unreadable file, malformed name) carried with its raw message.
    Exception(String),
}

impl Issue {
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Exception(_) => None,
        }
    }
}

impl From<ErrorCode> for Issue {
    fn from(code: ErrorCode) -> Self {
        Self::Code(code)
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "{code}"),
            Self::Exception(message) => write!(f, "{EXCEPTION_TAG}: {message}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ErrorLedger {
    entries: BTreeMap<String, Vec<Issue>>,
}

impl ErrorLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, key: impl Into<String>, issue: impl Into<Issue>) {
        self.entries.entry(key.into()).or_default().push(issue.into());
    }

    pub fn record_all<I>(&mut self, key: &str, issues: I)
    where
        I: IntoIterator,
        I::Item: Into<Issue>,
    {
        let mut issues = issues.into_iter().peekable();
        if issues.peek().is_none() {
            return;
        }
        let slot = self.entries.entry(key.to_string()).or_default();
        slot.extend(issues.map(Into::into));
    }

    pub fn record_exception(&mut self, key: impl Into<String>, message: impl fmt::Display) {
        self.record(key, Issue::Exception(message.to_string()));
    }

    /// Deduplicated issues for one key, in sorted order.
    pub fn issues_for(&self, key: &str) -> BTreeSet<Issue> {
        self.entries
            .get(key)
            .map(|issues| issues.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn codes_for(&self, key: &str) -> BTreeSet<ErrorCode> {
        self.entries
            .get(key)
            .map(|issues| issues.iter().filter_map(Issue::code).collect())
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys equal to `prefix` or nested under it as a `/`-separated path.
    pub fn keys_under<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        let nested = format!("{}/", prefix.trim_end_matches('/'));
        self.entries
            .keys()
            .map(String::as_str)
            .filter(move |key| *key == prefix || key.starts_with(&nested))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_by_code(&self) -> BTreeMap<ErrorCode, usize> {
        let mut counts = BTreeMap::new();
        for issues in self.entries.values() {
            let unique: BTreeSet<ErrorCode> = issues.iter().filter_map(Issue::code).collect();
            for code in unique {
                *counts.entry(code).or_insert(0) += 1;
            }
        }
        counts
    }

    /// One row per key with its issues deduplicated.
    pub fn deduplicated(&self) -> Vec<(String, Vec<Issue>)> {
        self.entries
            .iter()
            .map(|(key, issues)| {
                let unique: BTreeSet<Issue> = issues.iter().cloned().collect();
                (key.clone(), unique.into_iter().collect())
            })
            .collect()
    }

    /// Write the ledger as a two-column TSV; issues joined with `", "`.
    pub fn write_tsv(&self, path: &Path, headers: [&str; 2]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AuditError::write(parent, err))?;
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        writer.write_record(headers)?;
        for (key, issues) in self.deduplicated() {
            let joined = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            writer.write_record([key.as_str(), joined.as_str()])?;
        }
        writer.flush().map_err(|err| AuditError::write(path, err))?;
        Ok(())
    }

    /// Write one row per distinct `(key, issue)` pair.
    pub fn write_flat_tsv(&self, path: &Path, headers: [&str; 2]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AuditError::write(parent, err))?;
        }
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)?;
        writer.write_record(headers)?;
        for (key, issues) in self.deduplicated() {
            for issue in issues {
                writer.write_record([key.as_str(), issue.to_string().as_str()])?;
            }
        }
        writer.flush().map_err(|err| AuditError::write(path, err))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_codes_collapse_on_output() {
        let mut ledger = ErrorLedger::new();
        ledger.record("a.wav", ErrorCode::FilenameContainsSpace);
        ledger.record("a.wav", ErrorCode::FilenameContainsSpace);
        ledger.record("a.wav", ErrorCode::NonNumericUttid);

        let rows = ledger.deduplicated();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1.len(), 2);
    }

    #[test]
    fn exceptions_render_with_catch_all_tag() {
        let issue = Issue::Exception("boom".to_string());
        assert_eq!(issue.to_string(), "SPK-E99: boom");
        assert_eq!(issue.code(), None);
    }

    #[test]
    fn record_all_ignores_empty_batches() {
        let mut ledger = ErrorLedger::new();
        ledger.record_all("quiet.tsv", Vec::<ErrorCode>::new());
        assert!(ledger.is_empty());
    }

    #[test]
    fn keys_under_matches_path_segments_only() {
        let mut ledger = ErrorLedger::new();
        ledger.record("MH/Pune/SPK1/a.wav", ErrorCode::NonNumericUttid);
        ledger.record("MH/Pune/SPK10/b.wav", ErrorCode::NonNumericUttid);
        ledger.record("MH/Pune/SPK1", ErrorCode::NoMetadataFile);

        let keys: Vec<&str> = ledger.keys_under("MH/Pune/SPK1").collect();
        assert_eq!(keys, vec!["MH/Pune/SPK1", "MH/Pune/SPK1/a.wav"]);
    }

    #[test]
    fn count_by_code_counts_keys_not_repeats() {
        let mut ledger = ErrorLedger::new();
        ledger.record("a", ErrorCode::FileEmpty);
        ledger.record("a", ErrorCode::FileEmpty);
        ledger.record("b", ErrorCode::FileEmpty);
        assert_eq!(ledger.count_by_code()[&ErrorCode::FileEmpty], 2);
    }
}
