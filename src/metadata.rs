//! Speaker metadata extraction from the per-folder `Key: Value` text file.
//!
//! Produces the two structured sub-reports joined into the folder tables:
//! *extras* (fields outside the required set, with their values) and
//! *flagged* (each required field with `OK`, `MISSING` or `EMPTY`).

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldStatus {
    Ok,
    Missing,
    Empty,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Missing => "MISSING",
            Self::Empty => "EMPTY",
        }
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Folder-level reasons raised by the metadata and presence checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FolderReason {
    /// Not exactly one metadata text file.
    TextFile,
    /// No `.pdf` twin next to the metadata text file.
    Pdf,
    NoAudio,
    NoTable,
    RequiredFieldMissing,
    RequiredFieldEmpty,
    MetadataUnreadable,
}

impl FolderReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TextFile => "TXT-E1",
            Self::Pdf => "PDF-E1",
            Self::NoAudio => "WAV-E1",
            Self::NoTable => "TSV-E1",
            Self::RequiredFieldMissing => "META-E1",
            Self::RequiredFieldEmpty => "META-E2",
            Self::MetadataUnreadable => "META-E3",
        }
    }
}

impl fmt::Display for FolderReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: ({})", self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataReport {
    pub reasons: Vec<FolderReason>,
    pub extras: BTreeMap<String, String>,
    pub flagged: BTreeMap<String, FieldStatus>,
}

/// Parse `Key: Value` lines; the first occurrence of a key wins.
/// Lines without a colon are ignored.
pub fn parse_fields(text: &str) -> Vec<(String, String)> {
    let mut seen = BTreeSet::new();
    let mut fields = Vec::new();
    for line in text.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() || !seen.insert(key.to_string()) {
            continue;
        }
        fields.push((key.to_string(), value.trim().to_string()));
    }
    fields
}

pub fn extract_metadata(text: &str, required: &[String]) -> MetadataReport {
    let fields = parse_fields(text);
    let mut report = MetadataReport::default();

    for name in required {
        let status = match fields.iter().find(|(key, _)| key == name) {
            None => FieldStatus::Missing,
            Some((_, value)) if value.is_empty() => FieldStatus::Empty,
            Some(_) => FieldStatus::Ok,
        };
        report.flagged.insert(name.clone(), status);
    }

    for (key, value) in fields {
        if !required.contains(&key) {
            report.extras.insert(key, value);
        }
    }

    if report.flagged.values().any(|s| *s == FieldStatus::Missing) {
        report.reasons.push(FolderReason::RequiredFieldMissing);
    }
    if report.flagged.values().any(|s| *s == FieldStatus::Empty) {
        report.reasons.push(FolderReason::RequiredFieldEmpty);
    }
    report
}

/// Read and extract. An unreadable file yields a report with only `META-E3`.
pub fn extract_metadata_file(path: &Path, required: &[String]) -> MetadataReport {
    match fs::read(path) {
        Ok(raw) => extract_metadata(&String::from_utf8_lossy(&raw), required),
        Err(_) => MetadataReport {
            reasons: vec![FolderReason::MetadataUnreadable],
            ..MetadataReport::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required() -> Vec<String> {
        ["Speaker_ID", "Gender", "Age"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn complete_metadata_has_no_reasons() {
        let text = "Speaker_ID: SPK001\nGender: F\nAge: 31\nPhone: Android\n";
        let report = extract_metadata(text, &required());
        assert!(report.reasons.is_empty());
        assert_eq!(report.flagged["Age"], FieldStatus::Ok);
        assert_eq!(report.extras["Phone"], "Android");
        assert!(!report.extras.contains_key("Speaker_ID"));
    }

    #[test]
    fn missing_and_empty_fields_are_flagged() {
        let text = "Speaker_ID: SPK001\nGender:\n";
        let report = extract_metadata(text, &required());
        assert_eq!(report.flagged["Gender"], FieldStatus::Empty);
        assert_eq!(report.flagged["Age"], FieldStatus::Missing);
        assert_eq!(
            report.reasons,
            vec![
                FolderReason::RequiredFieldMissing,
                FolderReason::RequiredFieldEmpty
            ]
        );
    }

    #[test]
    fn values_may_contain_colons() {
        let fields = parse_fields("Recorded: 10:30\nno colon here\n");
        assert_eq!(fields, vec![("Recorded".to_string(), "10:30".to_string())]);
    }

    #[test]
    fn reason_renders_like_report_cells() {
        assert_eq!(FolderReason::Pdf.to_string(), "Error: (PDF-E1)");
        assert_eq!(FolderReason::TextFile.to_string(), "Error: (TXT-E1)");
    }

    #[test]
    fn unreadable_file_reports_meta_e3() {
        let report = extract_metadata_file(Path::new("/no/such/meta.txt"), &required());
        assert_eq!(report.reasons, vec![FolderReason::MetadataUnreadable]);
    }
}
