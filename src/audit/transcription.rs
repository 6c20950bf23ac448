//! Transcription-batch audit: `root/<batch>/<sub>/**` trees of transcriber
//! tables, each checked with the transcription table variant, plus the
//! one-table-per-leaf-folder rule.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::AuditConfig;
use crate::error::Result;
use crate::ledger::ErrorLedger;
use crate::rules::filename::FileKind;
use crate::rules::table::{check_table_cardinality, validate_table, TableVariant};

use super::walk::{relative_key, sorted_subdirs};

#[derive(Debug, Default)]
pub struct TranscriptionOutcome {
    pub ledger: ErrorLedger,
    pub folders_checked: usize,
    pub tables_checked: usize,
}

impl TranscriptionOutcome {
    /// One `filename`/`error` row per distinct finding.
    pub fn write(&self, output: &Path) -> Result<()> {
        self.ledger.write_flat_tsv(output, ["filename", "error"])
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct FolderTally {
    tables: usize,
    has_subdirs: bool,
}

pub fn run_transcription_audit(root: &Path, config: &AuditConfig) -> TranscriptionOutcome {
    let mut outcome = TranscriptionOutcome::default();
    let batches = match sorted_subdirs(root) {
        Ok(batches) => batches,
        Err(err) => {
            outcome.ledger.record_exception(
                root.display().to_string(),
                format!("cannot list directory: {err}"),
            );
            return outcome;
        }
    };

    for batch in batches {
        let subfolders = match sorted_subdirs(&batch) {
            Ok(subfolders) => subfolders,
            Err(err) => {
                outcome.ledger.record_exception(
                    relative_key(root, &batch),
                    format!("cannot list directory: {err}"),
                );
                continue;
            }
        };
        for subfolder in subfolders {
            audit_subtree(root, &subfolder, config, &mut outcome);
        }
    }

    info!(
        folders = outcome.folders_checked,
        tables = outcome.tables_checked,
        flagged = outcome.ledger.len(),
        "transcription audit finished"
    );
    outcome
}

fn audit_subtree(
    root: &Path,
    subtree: &Path,
    config: &AuditConfig,
    outcome: &mut TranscriptionOutcome,
) {
    let mut tallies: BTreeMap<PathBuf, FolderTally> = BTreeMap::new();

    for entry in WalkDir::new(subtree).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(subtree).to_path_buf();
                outcome.ledger.record_exception(relative_key(root, &path), err);
                continue;
            }
        };
        let path = entry.path();
        if entry.file_type().is_dir() {
            tallies.entry(path.to_path_buf()).or_default();
            if entry.depth() > 0 {
                if let Some(parent) = path.parent() {
                    tallies.entry(parent.to_path_buf()).or_default().has_subdirs = true;
                }
            }
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if FileKind::classify(&name) != FileKind::Table {
            continue;
        }
        if let Some(parent) = path.parent() {
            tallies.entry(parent.to_path_buf()).or_default().tables += 1;
        }
        let report = validate_table(path, TableVariant::Transcription, config);
        outcome.tables_checked += 1;
        if !report.issues.is_empty() {
            debug!(file = %path.display(), codes = ?report.codes(), "table flagged");
        }
        outcome
            .ledger
            .record_all(&relative_key(root, path), report.issues);
    }

    for (folder, tally) in tallies {
        outcome.folders_checked += 1;
        // Intermediate folders only answer for their own tables.
        if tally.has_subdirs && tally.tables <= 1 {
            continue;
        }
        if let Some(code) = check_table_cardinality(tally.tables) {
            outcome.ledger.record(relative_key(root, &folder), code);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::codes::ErrorCode;

    const GOOD_ROW: &str = "1\tPune-A_01.jpg\tMH_Pune_SPK001_12_Pune-A_01.wav\t12\t0.5\t3.0\thello\n";

    fn batch_tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("batch1/sub1/leaf_ok")).unwrap();
        fs::create_dir_all(dir.path().join("batch1/sub1/leaf_empty")).unwrap();
        fs::create_dir_all(dir.path().join("batch1/sub1/leaf_double")).unwrap();
        fs::write(dir.path().join("batch1/sub1/leaf_ok/a.tsv"), GOOD_ROW).unwrap();
        fs::write(dir.path().join("batch1/sub1/leaf_double/a.tsv"), GOOD_ROW).unwrap();
        fs::write(dir.path().join("batch1/sub1/leaf_double/b.tsv"), "").unwrap();
        dir
    }

    #[test]
    fn leaf_cardinality_and_file_findings() {
        let dir = batch_tree();
        let outcome = run_transcription_audit(dir.path(), &AuditConfig::default());

        assert_eq!(outcome.tables_checked, 3);
        assert!(!outcome.ledger.contains_key("batch1/sub1/leaf_ok"));
        assert!(!outcome.ledger.contains_key("batch1/sub1/leaf_ok/a.tsv"));
        assert!(!outcome.ledger.contains_key("batch1/sub1"));
        assert!(outcome
            .ledger
            .codes_for("batch1/sub1/leaf_empty")
            .contains(&ErrorCode::FolderEmpty));
        assert!(outcome
            .ledger
            .codes_for("batch1/sub1/leaf_double")
            .contains(&ErrorCode::MultipleTableFiles));
        assert!(outcome
            .ledger
            .codes_for("batch1/sub1/leaf_double/b.tsv")
            .contains(&ErrorCode::FileEmpty));
    }

    #[test]
    fn flat_listing_has_one_row_per_finding() {
        let dir = batch_tree();
        let outcome = run_transcription_audit(dir.path(), &AuditConfig::default());
        let output = dir.path().join("out/errors.tsv");
        outcome.write(&output).unwrap();

        let text = fs::read_to_string(&output).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("filename\terror"));
        assert!(text.contains("batch1/sub1/leaf_double\tTRXN_E1"));
        assert!(text.contains("batch1/sub1/leaf_empty\tTRXN_E2"));
        assert!(text.contains("batch1/sub1/leaf_double/b.tsv\tTRXN_E5"));
    }

    #[test]
    fn missing_root_is_recorded_not_fatal() {
        let outcome =
            run_transcription_audit(Path::new("/no/such/batch/root"), &AuditConfig::default());
        assert_eq!(outcome.ledger.len(), 1);
        assert_eq!(outcome.tables_checked, 0);
    }
}
