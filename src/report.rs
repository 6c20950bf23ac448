//! Report assembly: per-speaker-folder streams joined on `(district, speaker)`
//! with an outer join, then written as TSV/CSV tables plus a JSON run summary.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::codes::ErrorCategory;
use crate::error::{AuditError, Result};
use crate::metadata::{FieldStatus, FolderReason};

pub const PREINITIAL_REPORT: &str = "speaker_metadata_preinitial_checks_report.tsv";
pub const EXTRAS_REPORT: &str = "speaker_metadata_df_extras.csv";
pub const FLAGGED_REPORT: &str = "speaker_metadata_flagged.tsv";
pub const ERROR_LISTING: &str = "Error_files.tsv";
pub const RUN_SUMMARY: &str = "run_summary.json";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FolderKey {
    pub district: String,
    pub speaker: String,
}

impl FolderKey {
    pub fn new(district: impl Into<String>, speaker: impl Into<String>) -> Self {
        Self {
            district: district.into(),
            speaker: speaker.into(),
        }
    }
}

/// The independent streams collected during the walk, one entry per folder.
#[derive(Debug, Clone, Default)]
pub struct FolderReports {
    pub reasons: Vec<(FolderKey, Vec<FolderReason>)>,
    pub extras: Vec<(FolderKey, BTreeMap<String, String>)>,
    pub flagged: Vec<(FolderKey, BTreeMap<String, FieldStatus>)>,
    pub pdf_exists: Vec<(FolderKey, bool)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinedFolder {
    pub reasons: Option<Vec<FolderReason>>,
    pub extras: Option<BTreeMap<String, String>>,
    pub flagged: Option<BTreeMap<String, FieldStatus>>,
    pub pdf_exists: Option<bool>,
}

impl FolderReports {
    /// Outer join: a folder present in any stream gets a row, missing streams stay `None`.
    pub fn join(&self) -> BTreeMap<FolderKey, JoinedFolder> {
        let mut joined: BTreeMap<FolderKey, JoinedFolder> = BTreeMap::new();
        for (key, reasons) in &self.reasons {
            joined.entry(key.clone()).or_default().reasons = Some(reasons.clone());
        }
        for (key, extras) in &self.extras {
            joined.entry(key.clone()).or_default().extras = Some(extras.clone());
        }
        for (key, flagged) in &self.flagged {
            joined.entry(key.clone()).or_default().flagged = Some(flagged.clone());
        }
        for (key, exists) in &self.pdf_exists {
            joined.entry(key.clone()).or_default().pdf_exists = Some(*exists);
        }
        joined
    }

    pub fn flagged_folder_count(&self) -> usize {
        self.reasons
            .iter()
            .filter(|(_, reasons)| !reasons.is_empty())
            .count()
    }

    /// Write the pre-initial, extras and flagged tables into `output_dir`.
    pub fn write_all(&self, output_dir: &Path) -> Result<Vec<PathBuf>> {
        let joined = self.join();

        let preinitial = output_dir.join(PREINITIAL_REPORT);
        write_preinitial(&joined, &preinitial)?;

        let extras = output_dir.join(EXTRAS_REPORT);
        write_wide(&joined, &extras, b',', |folder| folder.extras.clone())?;

        let flagged = output_dir.join(FLAGGED_REPORT);
        write_wide(&joined, &flagged, b'\t', |folder| {
            folder.flagged.as_ref().map(|map| {
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_string()))
                    .collect::<BTreeMap<_, _>>()
            })
        })?;

        Ok(vec![preinitial, extras, flagged])
    }
}

fn write_preinitial(joined: &BTreeMap<FolderKey, JoinedFolder>, path: &Path) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    writer.write_record(["Speaker", "Reason"])?;
    for (key, folder) in joined {
        let Some(reasons) = folder.reasons.as_ref().filter(|r| !r.is_empty()) else {
            continue;
        };
        let cell = reasons
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writer.write_record([key.speaker.as_str(), cell.as_str()])?;
    }
    writer.flush().map_err(|err| AuditError::write(path, err))?;
    Ok(())
}

/// `District, Speaker, <dynamic columns...>, PDF exists` over folders that have
/// either the selected sub-report or a PDF flag.
fn write_wide<F>(
    joined: &BTreeMap<FolderKey, JoinedFolder>,
    path: &Path,
    delimiter: u8,
    select: F,
) -> Result<()>
where
    F: Fn(&JoinedFolder) -> Option<BTreeMap<String, String>>,
{
    let rows: Vec<(&FolderKey, Option<BTreeMap<String, String>>, Option<bool>)> = joined
        .iter()
        .map(|(key, folder)| (key, select(folder), folder.pdf_exists))
        .filter(|(_, values, pdf)| values.is_some() || pdf.is_some())
        .collect();

    let columns: BTreeSet<String> = rows
        .iter()
        .filter_map(|(_, values, _)| values.as_ref())
        .flat_map(|values| values.keys().cloned())
        .collect();

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(path)?;
    let mut header = vec!["District".to_string(), "Speaker".to_string()];
    header.extend(columns.iter().cloned());
    header.push("PDF exists".to_string());
    writer.write_record(&header)?;

    for (key, values, pdf) in rows {
        let mut record = vec![key.district.clone(), key.speaker.clone()];
        for column in &columns {
            let cell = values
                .as_ref()
                .and_then(|values| values.get(column))
                .cloned()
                .unwrap_or_default();
            record.push(cell);
        }
        record.push(pdf.map(|exists| exists.to_string()).unwrap_or_default());
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|err| AuditError::write(path, err))?;
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub root: String,
    pub phase1_folder: String,
    pub lookup: String,
    pub catalog: String,
    pub state_folders: usize,
    pub district_folders: usize,
    pub speaker_folders: usize,
    pub files_scanned: usize,
    pub total_duration_hours: f64,
    pub lookup_pairs: usize,
    pub catalog_images: usize,
    pub phase1_pairs: usize,
    pub phase2_pairs: usize,
    pub repeated_speaker_ids: usize,
    pub repeated_utterance_ids: usize,
    pub ledger_keys: usize,
    pub flagged_folders: usize,
    pub issues_by_category: BTreeMap<ErrorCategory, usize>,
}

impl RunSummary {
    pub fn write(&self, path: &Path) -> Result<()> {
        let payload = serde_json::to_string_pretty(self).map_err(|source| {
            AuditError::Serialize {
                what: "run summary",
                source,
            }
        })?;
        fs::write(path, payload).map_err(|err| AuditError::write(path, err))
    }
}
