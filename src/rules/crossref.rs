//! Reference sets loaded once per run and the membership checks against them:
//! state/district lookup, image catalog, and the per-folder `Speaker_ID:` declaration.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::Reader;

use crate::codes::ErrorCode;
use crate::error::{AuditError, Result};
use crate::rules::filename::FilenameRecord;

pub const SPEAKER_ID_PREFIX: &str = "Speaker_ID:";

/// Valid `(state, district)` pairs from a two-column, headerless TSV.
#[derive(Debug, Clone, Default)]
pub struct StateDistrictLookup {
    states: HashSet<String>,
    districts: HashSet<String>,
    pairs: usize,
}

impl StateDistrictLookup {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        let mut lookup = Self::default();
        for (state, district) in pairs {
            lookup.insert(state.into(), district.into());
        }
        lookup
    }

    fn insert(&mut self, state: String, district: String) {
        self.states.insert(state);
        self.districts.insert(district);
        self.pairs += 1;
    }

    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        let mut lookup = Self::default();
        for record in reader.records() {
            let record = record?;
            let state = record.get(0).unwrap_or("").trim();
            let district = record.get(1).unwrap_or("").trim();
            if state.is_empty() && district.is_empty() {
                continue;
            }
            lookup.insert(state.to_string(), district.to_string());
        }
        Ok(lookup)
    }

    pub fn len(&self) -> usize {
        self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs == 0
    }

    /// Both tokens must be known; each is checked against its own column.
    pub fn check(&self, state: &str, district: &str) -> Option<ErrorCode> {
        if self.states.contains(state) && self.districts.contains(district) {
            None
        } else {
            Some(ErrorCode::StateDistrictMismatch)
        }
    }
}

/// Image identifiers from the union of the catalog sheets.
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    filenames: HashSet<String>,
}

impl ImageCatalog {
    pub fn from_filenames<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filenames: filenames.into_iter().map(Into::into).collect(),
        }
    }

    /// Spreadsheets read every sheet in `sheets`; `.csv`/`.tsv` catalogs are a single sheet.
    pub fn load(path: &Path, sheets: &[String], column: &str) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "csv" => read_catalog_delimited(path, b',', column),
            "tsv" => read_catalog_delimited(path, b'\t', column),
            _ => read_catalog_workbook(path, sheets, column),
        }
    }

    pub fn len(&self) -> usize {
        self.filenames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filenames.is_empty()
    }

    pub fn contains(&self, image_id: &str) -> bool {
        self.filenames.contains(image_id)
    }
}

fn read_catalog_workbook(path: &Path, sheets: &[String], column: &str) -> Result<ImageCatalog> {
    let spreadsheet_err = |message: String| AuditError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };
    let mut workbook =
        calamine::open_workbook_auto(path).map_err(|err| spreadsheet_err(err.to_string()))?;

    let mut filenames = HashSet::new();
    for sheet in sheets {
        let range = workbook
            .worksheet_range(sheet)
            .map_err(|err| spreadsheet_err(format!("sheet '{sheet}': {err}")))?;
        let mut rows = range.rows();
        let header = rows.next().unwrap_or(&[]);
        let index = header
            .iter()
            .position(|cell| cell_str(cell).trim() == column)
            .ok_or_else(|| AuditError::MissingColumn {
                sheet: sheet.clone(),
                column: column.to_string(),
            })?;
        for row in rows {
            let value = row.get(index).map(cell_str).unwrap_or_default();
            let value = value.trim();
            if !value.is_empty() {
                filenames.insert(value.to_string());
            }
        }
    }
    Ok(ImageCatalog { filenames })
}

fn read_catalog_delimited(path: &Path, delimiter: u8, column: &str) -> Result<ImageCatalog> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)?;
    let index = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == column)
        .ok_or_else(|| AuditError::MissingColumn {
            sheet: path.display().to_string(),
            column: column.to_string(),
        })?;
    let mut filenames = HashSet::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index).map(str::trim).filter(|v| !v.is_empty()) {
            filenames.insert(value.to_string());
        }
    }
    Ok(ImageCatalog { filenames })
}

fn cell_str(cell: &calamine::Data) -> String {
    match cell {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => format!("{f}"),
        calamine::Data::Int(i) => format!("{i}"),
        calamine::Data::Bool(b) => format!("{b}"),
        other => format!("{other:?}"),
    }
}

/// How many metadata text files a speaker folder holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataPresence {
    Missing,
    Single(PathBuf),
    Multiple(Vec<PathBuf>),
}

impl MetadataPresence {
    pub fn from_files(mut text_files: Vec<PathBuf>) -> Self {
        match text_files.len() {
            0 => Self::Missing,
            1 => Self::Single(text_files.remove(0)),
            _ => Self::Multiple(text_files),
        }
    }

    /// Folder-level code for anything other than exactly one file.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Missing => Some(ErrorCode::NoMetadataFile),
            Self::Single(_) => None,
            Self::Multiple(_) => Some(ErrorCode::MultipleMetadataFiles),
        }
    }
}

/// Value of the first `Speaker_ID:` line, if any.
pub fn declared_speaker_id(text: &str) -> Option<String> {
    text.lines()
        .find(|line| line.starts_with(SPEAKER_ID_PREFIX))
        .and_then(|line| line.split(':').nth(1))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn read_declared_speaker_id(path: &Path) -> Result<Option<String>> {
    let raw = fs::read(path).map_err(|err| AuditError::read(path, err))?;
    Ok(declared_speaker_id(&String::from_utf8_lossy(&raw)))
}

/// Outcome of matching one folder's declaration against its utterance filenames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeakerCheck {
    /// No declaration line: one folder-level code, no per-file comparison.
    NotDeclared,
    /// Filenames whose speaker token differs from the declared ID.
    Mismatched(Vec<String>),
}

pub fn check_speaker_ids<'a, I>(declared: Option<&str>, records: I) -> SpeakerCheck
where
    I: IntoIterator<Item = (&'a str, &'a FilenameRecord)>,
{
    let Some(declared) = declared else {
        return SpeakerCheck::NotDeclared;
    };
    let mismatched = records
        .into_iter()
        .filter(|(_, record)| record.kind.is_utterance() && record.speaker_id != declared)
        .map(|(name, _)| name.to_string())
        .collect();
    SpeakerCheck::Mismatched(mismatched)
}

impl SpeakerCheck {
    pub fn folder_code(&self) -> Option<ErrorCode> {
        match self {
            Self::NotDeclared => Some(ErrorCode::SpeakerIdNotFound),
            Self::Mismatched(_) => None,
        }
    }
}
