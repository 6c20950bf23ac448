//! Tab-separated table checks. Two variants share the reader:
//!
//! - [`TableVariant::Transcription`]: fixed column count, per-row grammar,
//!   transcript sanitation. Reporting is per file: the first bad row stops the grammar scan.
//! - [`TableVariant::AudioCorrespondence`]: trailing newline, forbidden characters,
//!   and the `(end - start)` duration sum that feeds the corpus budget.
//!
//! No header row is assumed in either variant.

use std::fs;
use std::path::Path;

use crate::codes::ErrorCode;
use crate::config::AuditConfig;
use crate::ledger::Issue;

const TRANSCRIPT_COLUMN: usize = 6;
const AUDIO_COLUMN: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableVariant {
    Transcription,
    AudioCorrespondence,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableReport {
    pub issues: Vec<Issue>,
    pub rows: usize,
    pub duration_seconds: f64,
}

impl TableReport {
    fn push(&mut self, issue: impl Into<Issue>) {
        let issue = issue.into();
        if !self.issues.contains(&issue) {
            self.issues.push(issue);
        }
    }

    pub fn codes(&self) -> Vec<ErrorCode> {
        self.issues.iter().filter_map(Issue::code).collect()
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds / 3600.0
    }
}

/// Read `path` and validate it. A read failure becomes an exception issue, never an `Err`.
pub fn validate_table(path: &Path, variant: TableVariant, config: &AuditConfig) -> TableReport {
    match fs::read(path) {
        Ok(bytes) => validate_table_bytes(&bytes, variant, config),
        Err(err) => TableReport {
            issues: vec![Issue::Exception(format!("could not read the file: {err}"))],
            ..TableReport::default()
        },
    }
}

pub fn validate_table_bytes(
    bytes: &[u8],
    variant: TableVariant,
    config: &AuditConfig,
) -> TableReport {
    let mut report = TableReport::default();
    if bytes.iter().all(u8::is_ascii_whitespace) {
        report.push(ErrorCode::FileEmpty);
        return report;
    }

    match variant {
        TableVariant::Transcription => check_transcription(bytes, config, &mut report),
        TableVariant::AudioCorrespondence => check_audio_table(bytes, config, &mut report),
    }
    report
}

fn read_rows(bytes: &[u8]) -> Result<Vec<csv::StringRecord>, csv::Error> {
    csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes)
        .records()
        .collect()
}

fn check_transcription(bytes: &[u8], config: &AuditConfig, report: &mut TableReport) {
    let rows = match read_rows(bytes) {
        Ok(rows) => rows,
        Err(err) => {
            report.push(Issue::Exception(format!("could not read the file: {err}")));
            return;
        }
    };
    report.rows = rows.len();
    if rows.is_empty() {
        report.push(ErrorCode::FileEmpty);
        return;
    }

    let expected = config.transcription_columns;
    if rows.iter().all(|row| row.len() == 1) && expected > 1 {
        report.push(ErrorCode::NotTabSeparated);
    } else if rows.iter().any(|row| row.len() != expected) {
        report.push(ErrorCode::WrongColumnCount);
    } else if rows.iter().any(|row| !row_matches_grammar(row)) {
        report.push(ErrorCode::FormatViolation);
    }

    let embedded = rows
        .iter()
        .filter_map(|row| row.get(TRANSCRIPT_COLUMN))
        .any(|transcript| transcript.contains('\n') || transcript.contains('\t'));
    if embedded {
        report.push(ErrorCode::EmbeddedControlChar);
    }
}

/// `int, text, *.wav, int, number, number, non-empty text`.
pub fn row_matches_grammar(row: &csv::StringRecord) -> bool {
    let field = |index: usize| row.get(index).map(str::trim);
    let is_int = |index: usize| field(index).is_some_and(|value| value.parse::<i64>().is_ok());
    let is_number =
        |index: usize| field(index).is_some_and(|value| value.parse::<f64>().is_ok());

    is_int(0)
        && row
            .get(AUDIO_COLUMN)
            .is_some_and(|audio| audio.ends_with(".wav"))
        && is_int(3)
        && is_number(4)
        && is_number(5)
        && row
            .get(TRANSCRIPT_COLUMN)
            .is_some_and(|transcript| !transcript.is_empty())
}

fn check_audio_table(bytes: &[u8], config: &AuditConfig, report: &mut TableReport) {
    if bytes.last() != Some(&b'\n') {
        report.push(ErrorCode::MissingTrailingNewline);
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => {
            if config
                .disallowed_chars
                .iter()
                .any(|forbidden| !forbidden.is_empty() && text.contains(forbidden.as_str()))
            {
                report.push(ErrorCode::DisallowedUnicodeChar);
            }
        }
        Err(err) => {
            report.push(Issue::Exception(format!("file is not valid UTF-8: {err}")));
            return;
        }
    }

    let rows = match read_rows(bytes) {
        Ok(rows) => rows,
        Err(err) => {
            report.push(Issue::Exception(format!("could not read the file: {err}")));
            return;
        }
    };
    report.rows = rows.len();
    match sum_durations(&rows, config.duration_start_column, config.duration_end_column) {
        Ok(seconds) => report.duration_seconds = seconds,
        Err(message) => report.push(Issue::Exception(message)),
    }
}

/// Sum `end - start` over every row. One non-numeric row voids the whole file.
pub fn sum_durations(
    rows: &[csv::StringRecord],
    start_column: usize,
    end_column: usize,
) -> Result<f64, String> {
    let mut total = 0.0;
    for (index, row) in rows.iter().enumerate() {
        let start = parse_cell(row, start_column);
        let end = parse_cell(row, end_column);
        match (start, end) {
            (Some(start), Some(end)) => total += end - start,
            _ => {
                return Err(format!(
                    "row {}: columns {start_column}/{end_column} are not numeric",
                    index + 1
                ))
            }
        }
    }
    Ok(total)
}

fn parse_cell(row: &csv::StringRecord, column: usize) -> Option<f64> {
    row.get(column)?.trim().parse::<f64>().ok()
}

/// Leaf folders hold exactly one table file.
pub fn check_table_cardinality(table_files: usize) -> Option<ErrorCode> {
    match table_files {
        0 => Some(ErrorCode::FolderEmpty),
        1 => None,
        _ => Some(ErrorCode::MultipleTableFiles),
    }
}
