//! Identifier pools for the two collection phases and the corpus duration budget.
//!
//! Phase 1 is read from a reference tree of TSV exports; phase 2 is filled from
//! `.wav` filenames during the corpus walk. Repeats are found by intersecting
//! the *bare* speaker and utterance ID sets of both phases, so an ID reused
//! with a different partner still counts.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::codes::ErrorCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    One,
    Two,
}

#[derive(Debug, Clone, Default)]
pub struct IdentifierPools {
    phase1: HashSet<(String, String)>,
    phase2: HashSet<(String, String)>,
}

impl IdentifierPools {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the pair was already in that phase's pool.
    pub fn add(&mut self, phase: Phase, speaker_id: &str, utterance_id: &str) -> bool {
        let pair = (speaker_id.to_string(), utterance_id.to_string());
        match phase {
            Phase::One => self.phase1.insert(pair),
            Phase::Two => self.phase2.insert(pair),
        }
    }

    pub fn pair_count(&self, phase: Phase) -> usize {
        self.pool(phase).len()
    }

    fn pool(&self, phase: Phase) -> &HashSet<(String, String)> {
        match phase {
            Phase::One => &self.phase1,
            Phase::Two => &self.phase2,
        }
    }

    pub fn speaker_ids(&self, phase: Phase) -> HashSet<&str> {
        self.pool(phase).iter().map(|(speaker, _)| speaker.as_str()).collect()
    }

    pub fn utterance_ids(&self, phase: Phase) -> HashSet<&str> {
        self.pool(phase).iter().map(|(_, utt)| utt.as_str()).collect()
    }

    pub fn repeated_speaker_ids(&self) -> BTreeSet<String> {
        intersect(self.speaker_ids(Phase::One), self.speaker_ids(Phase::Two))
    }

    pub fn repeated_utterance_ids(&self) -> BTreeSet<String> {
        intersect(self.utterance_ids(Phase::One), self.utterance_ids(Phase::Two))
    }

    /// Synthetic ledger keys for every cross-phase repeat.
    pub fn repeat_findings(&self) -> Vec<(String, ErrorCode)> {
        let speakers = self
            .repeated_speaker_ids()
            .into_iter()
            .map(|id| (format!("Repeated_speaker_ID_{id}"), ErrorCode::RepeatedSpeakerId));
        let utterances = self
            .repeated_utterance_ids()
            .into_iter()
            .map(|id| (format!("Repeated_utt_ID_{id}"), ErrorCode::RepeatedUtteranceId));
        speakers.chain(utterances).collect()
    }
}

fn intersect(left: HashSet<&str>, right: HashSet<&str>) -> BTreeSet<String> {
    left.intersection(&right).map(|id| id.to_string()).collect()
}

/// `(speaker, utterance)` from a path-like first column, e.g.
/// `/data/MH_Pune_SPK001_12_x.wav` -> `("SPK001", "12")`.
pub fn pair_from_reference_path(field: &str) -> Option<(String, String)> {
    if !field.starts_with('/') {
        return None;
    }
    let basename = field.rsplit('/').next().unwrap_or(field);
    let parts: Vec<&str> = basename.split('_').collect();
    if parts.len() < 4 {
        return None;
    }
    Some((parts[2].to_string(), parts[3].to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct Phase1Scan {
    pub files_read: usize,
    pub rows_read: usize,
    /// Files that could not be read, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// Stream every file under `root` record by record into the phase-1 pool.
/// Records are never collected, so peak memory does not grow with file size.
pub fn scan_phase1_tree(root: &Path, pools: &mut IdentifierPools) -> Phase1Scan {
    let mut scan = Phase1Scan::default();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                let path = err.path().unwrap_or(root).to_path_buf();
                scan.failures.push((path, err.to_string()));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match scan_phase1_file(entry.path(), pools) {
            Ok(rows) => {
                scan.files_read += 1;
                scan.rows_read += rows;
            }
            Err(err) => scan.failures.push((entry.path().to_path_buf(), err.to_string())),
        }
    }
    debug!(
        files = scan.files_read,
        rows = scan.rows_read,
        pairs = pools.pair_count(Phase::One),
        "phase-1 reference scan finished"
    );
    scan
}

fn scan_phase1_file(path: &Path, pools: &mut IdentifierPools) -> Result<usize, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut record = csv::StringRecord::new();
    let mut rows = 0;
    while reader.read_record(&mut record)? {
        rows += 1;
        if let Some((speaker, utterance)) = record.get(0).and_then(pair_from_reference_path) {
            pools.add(Phase::One, &speaker, &utterance);
        }
    }
    Ok(rows)
}

/// Inclusive band of acceptable corpus hours.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationBudget {
    pub min_hours: f64,
    pub max_hours: f64,
}

impl DurationBudget {
    pub fn new(min_hours: f64, max_hours: f64) -> Self {
        Self {
            min_hours,
            max_hours,
        }
    }

    pub fn check(&self, total_hours: f64) -> Option<ErrorCode> {
        if total_hours < self.min_hours || total_hours > self.max_hours {
            Some(ErrorCode::DurationOutOfRange)
        } else {
            None
        }
    }

    pub fn ledger_key(&self) -> String {
        format!(
            "Batch Duration not between {} to {} Hours",
            self.min_hours, self.max_hours
        )
    }
}
