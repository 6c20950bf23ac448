//! Corpus audit driver.
//!
//! One [`AuditContext`] lives for one run and owns every piece of mutable state
//! the rules feed: the ledger, the identifier pools, the duration sum and the
//! file-to-image mapping. The walk is fixed-depth `root/state/district/speaker/`;
//! catalog membership, the duration budget and cross-phase repeats are resolved
//! in bulk once the walk is done.

pub mod transcription;
pub mod walk;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::codes::{ErrorCategory, ErrorCode};
use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::ledger::ErrorLedger;
use crate::metadata::{extract_metadata_file, FolderReason};
use crate::report::{FolderKey, FolderReports, RunSummary, ERROR_LISTING, RUN_SUMMARY};
use crate::rules::crossref::{
    check_speaker_ids, read_declared_speaker_id, ImageCatalog, MetadataPresence, SpeakerCheck,
    StateDistrictLookup,
};
use crate::rules::duplicates::{scan_phase1_tree, DurationBudget, IdentifierPools, Phase};
use crate::rules::filename::{check_filename, FileKind, FilenameRecord};
use crate::rules::table::{validate_table, TableVariant};

use self::walk::{relative_key, sorted_files, sorted_subdirs};

/// Key prefix for findings raised while reading the phase-1 reference tree.
pub const PHASE1_KEY_PREFIX: &str = "phase1";

#[derive(Debug, Clone)]
pub struct AuditInputs {
    pub root: PathBuf,
    pub phase1_folder: PathBuf,
    pub lookup: PathBuf,
    pub catalog: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    pub state_folders: usize,
    pub district_folders: usize,
    pub speaker_folders: usize,
    pub files_scanned: usize,
}

/// Run-scoped state threaded through every check of one corpus audit.
#[derive(Debug)]
pub struct AuditContext {
    config: AuditConfig,
    root: PathBuf,
    lookup: StateDistrictLookup,
    catalog: ImageCatalog,
    pub ledger: ErrorLedger,
    pub pools: IdentifierPools,
    pub duration_hours: f64,
    /// Ledger key of each utterance file to the catalog identifier it references.
    pub image_mapping: BTreeMap<String, String>,
    pub folders: FolderReports,
    pub stats: WalkStats,
}

impl AuditContext {
    pub fn new(
        root: impl Into<PathBuf>,
        config: AuditConfig,
        lookup: StateDistrictLookup,
        catalog: ImageCatalog,
    ) -> Self {
        Self {
            config,
            root: root.into(),
            lookup,
            catalog,
            ledger: ErrorLedger::new(),
            pools: IdentifierPools::new(),
            duration_hours: 0.0,
            image_mapping: BTreeMap::new(),
            folders: FolderReports::default(),
            stats: WalkStats::default(),
        }
    }

    fn key_for(&self, path: &Path) -> String {
        relative_key(&self.root, path)
    }

    /// Walk `root/state/district/speaker/`. Unreadable directories are recorded and skipped.
    pub fn walk_corpus(&mut self) {
        let root = self.root.clone();
        for state in self.subdirs_or_record(&root) {
            self.stats.state_folders += 1;
            for district in self.subdirs_or_record(&state) {
                self.stats.district_folders += 1;
                let district_key = self.key_for(&district);
                for speaker in self.subdirs_or_record(&district) {
                    self.stats.speaker_folders += 1;
                    self.audit_speaker_folder(&district_key, &speaker);
                }
            }
        }
        info!(
            states = self.stats.state_folders,
            districts = self.stats.district_folders,
            speakers = self.stats.speaker_folders,
            files = self.stats.files_scanned,
            "corpus walk finished"
        );
    }

    fn subdirs_or_record(&mut self, dir: &Path) -> Vec<PathBuf> {
        match sorted_subdirs(dir) {
            Ok(dirs) => dirs,
            Err(err) => {
                warn!(path = %dir.display(), error = %err, "cannot list directory");
                let key = self.key_for(dir);
                self.ledger
                    .record_exception(key, format!("cannot list directory: {err}"));
                Vec::new()
            }
        }
    }

    pub fn audit_speaker_folder(&mut self, district_key: &str, dir: &Path) {
        let folder_key = self.key_for(dir);
        debug!(folder = %folder_key, "auditing speaker folder");
        let files = match sorted_files(dir) {
            Ok(files) => files,
            Err(err) => {
                self.ledger
                    .record_exception(folder_key, format!("cannot list directory: {err}"));
                return;
            }
        };

        let mut records: Vec<(String, FilenameRecord)> = Vec::new();
        let mut text_files = Vec::new();
        let mut has_audio = false;
        let mut has_table = false;

        for (name, path) in &files {
            self.stats.files_scanned += 1;
            match FileKind::classify(name) {
                FileKind::Audio => has_audio = true,
                FileKind::Table => has_table = true,
                FileKind::Metadata => text_files.push(path.clone()),
                FileKind::Pdf | FileKind::Other => {}
            }
            if let Some(record) = self.audit_file(name, path) {
                records.push((name.clone(), record));
            }
        }

        let folder = FolderKey::new(district_key, folder_key.clone());
        let mut reasons = Vec::new();
        let presence = MetadataPresence::from_files(text_files);
        if let Some(code) = presence.code() {
            self.ledger.record(folder_key.as_str(), code);
            reasons.push(FolderReason::TextFile);
        }

        if let MetadataPresence::Single(text_file) = &presence {
            self.check_declared_speaker(&folder_key, dir, text_file, &records);

            let metadata = extract_metadata_file(text_file, &self.config.required_metadata_fields);
            reasons.extend(metadata.reasons);
            let pdf_exists = text_file.with_extension("pdf").is_file();
            if !pdf_exists {
                reasons.push(FolderReason::Pdf);
            }
            self.folders.extras.push((folder.clone(), metadata.extras));
            self.folders.flagged.push((folder.clone(), metadata.flagged));
            self.folders.pdf_exists.push((folder.clone(), pdf_exists));
        }

        if !has_audio {
            reasons.push(FolderReason::NoAudio);
        }
        if !has_table {
            reasons.push(FolderReason::NoTable);
        }
        self.folders.reasons.push((folder, reasons));
        debug!(
            folder = %folder_key,
            findings = self.ledger.keys_under(&folder_key).count(),
            "speaker folder audited"
        );
    }

    fn check_declared_speaker(
        &mut self,
        folder_key: &str,
        dir: &Path,
        text_file: &Path,
        records: &[(String, FilenameRecord)],
    ) {
        let declared = match read_declared_speaker_id(text_file) {
            Ok(declared) => declared,
            Err(err) => {
                let key = self.key_for(text_file);
                self.ledger.record_exception(key, err);
                return;
            }
        };
        let named = records.iter().map(|(name, record)| (name.as_str(), record));
        let check = check_speaker_ids(declared.as_deref(), named);
        if let Some(code) = check.folder_code() {
            self.ledger.record(folder_key, code);
        }
        if let SpeakerCheck::Mismatched(names) = check {
            for name in names {
                let key = self.key_for(&dir.join(name));
                self.ledger.record(key, ErrorCode::SpeakerIdMismatch);
            }
        }
    }

    /// Per-file rules. Returns the parsed record for audio and table files.
    pub fn audit_file(&mut self, name: &str, path: &Path) -> Option<FilenameRecord> {
        let key = self.key_for(path);
        let kind = FileKind::classify(name);
        self.ledger
            .record_all(&key, check_filename(name, &self.config));

        if kind == FileKind::Metadata {
            // A short metadata name already carries its underscore-count code.
            if let Ok(record) = FilenameRecord::parse(name) {
                if let Some(code) = self.lookup.check(&record.state, &record.district) {
                    self.ledger.record(key.as_str(), code);
                }
            }
            return None;
        }
        if !kind.is_utterance() {
            return None;
        }
        let record = match FilenameRecord::parse(name) {
            Ok(record) => record,
            Err(err) => {
                self.ledger.record_exception(key, err);
                return None;
            }
        };

        if let Some(code) = self.lookup.check(&record.state, &record.district) {
            self.ledger.record(key.as_str(), code);
        }

        if kind == FileKind::Audio {
            if let Some(utterance) = record.utterance_id.as_deref() {
                if !self.pools.add(Phase::Two, &record.speaker_id, utterance) {
                    self.ledger.record(key.as_str(), ErrorCode::RepeatedUtteranceId);
                }
            }
        }

        if let Some(image_id) = record.image_id() {
            self.image_mapping.insert(key.clone(), image_id);
        }

        if kind == FileKind::Table {
            let report = validate_table(path, TableVariant::AudioCorrespondence, &self.config);
            self.duration_hours += report.duration_hours();
            self.ledger.record_all(&key, report.issues);
        }

        Some(record)
    }

    /// Bulk checks that need the whole walk: catalog membership, budget, cross-phase repeats.
    pub fn finish(&mut self) {
        let missing: Vec<String> = self
            .image_mapping
            .iter()
            .filter(|(_, image_id)| !self.catalog.contains(image_id))
            .map(|(key, _)| key.clone())
            .collect();
        for key in missing {
            self.ledger.record(key, ErrorCode::ImageNotInCatalog);
        }

        let budget = DurationBudget::new(
            self.config.duration_min_hours,
            self.config.duration_max_hours,
        );
        if let Some(code) = budget.check(self.duration_hours) {
            warn!(
                hours = self.duration_hours,
                min = budget.min_hours,
                max = budget.max_hours,
                "corpus duration outside the accepted band"
            );
            self.ledger.record(budget.ledger_key(), code);
        }

        for (key, code) in self.pools.repeat_findings() {
            self.ledger.record(key, code);
        }
    }
}

#[derive(Debug)]
pub struct AuditOutcome {
    pub ledger: ErrorLedger,
    pub folders: FolderReports,
    pub summary: RunSummary,
}

/// Load the reference inputs, walk the corpus and resolve the bulk checks.
///
/// Unreadable reference inputs leave their set empty and are recorded in the
/// ledger; the run always completes.
pub fn run_corpus_audit(inputs: &AuditInputs, config: AuditConfig) -> AuditOutcome {
    let mut early = ErrorLedger::new();

    let lookup = match StateDistrictLookup::load(&inputs.lookup) {
        Ok(lookup) => lookup,
        Err(err) => {
            warn!(path = %inputs.lookup.display(), error = %err, "lookup unavailable, every file will mismatch");
            early.record_exception(inputs.lookup.display().to_string(), err);
            StateDistrictLookup::default()
        }
    };
    let catalog = match ImageCatalog::load(
        &inputs.catalog,
        &config.catalog_sheets,
        &config.catalog_column,
    ) {
        Ok(catalog) => catalog,
        Err(err) => {
            warn!(path = %inputs.catalog.display(), error = %err, "catalog unavailable, every image will be flagged");
            early.record_exception(inputs.catalog.display().to_string(), err);
            ImageCatalog::default()
        }
    };
    info!(
        lookup_pairs = lookup.len(),
        catalog_images = catalog.len(),
        "reference inputs loaded"
    );

    let mut ctx = AuditContext::new(&inputs.root, config, lookup, catalog);
    ctx.ledger = early;

    let scan = scan_phase1_tree(&inputs.phase1_folder, &mut ctx.pools);
    for (path, message) in scan.failures {
        let relative = relative_key(&inputs.phase1_folder, &path);
        let key = format!("{PHASE1_KEY_PREFIX}/{}", relative.trim_start_matches('/'));
        ctx.ledger.record_exception(key, message);
    }
    info!(
        files = scan.files_read,
        pairs = ctx.pools.pair_count(Phase::One),
        "phase-1 identifiers collected"
    );

    if !inputs.root.is_dir() {
        warn!(path = %inputs.root.display(), "corpus root is not a directory");
    }
    ctx.walk_corpus();
    ctx.finish();

    for (code, count) in ctx.ledger.count_by_code() {
        info!(code = %code, description = code.description(), entries = count, "finding");
    }
    let summary = summarize(inputs, &ctx);
    AuditOutcome {
        ledger: ctx.ledger,
        folders: ctx.folders,
        summary,
    }
}

fn summarize(inputs: &AuditInputs, ctx: &AuditContext) -> RunSummary {
    let mut issues_by_category: BTreeMap<ErrorCategory, usize> = BTreeMap::new();
    for (code, count) in ctx.ledger.count_by_code() {
        *issues_by_category.entry(code.category()).or_insert(0) += count;
    }
    RunSummary {
        generated_at: chrono::Utc::now().to_rfc3339(),
        root: inputs.root.display().to_string(),
        phase1_folder: inputs.phase1_folder.display().to_string(),
        lookup: inputs.lookup.display().to_string(),
        catalog: inputs.catalog.display().to_string(),
        state_folders: ctx.stats.state_folders,
        district_folders: ctx.stats.district_folders,
        speaker_folders: ctx.stats.speaker_folders,
        files_scanned: ctx.stats.files_scanned,
        total_duration_hours: ctx.duration_hours,
        lookup_pairs: ctx.lookup.len(),
        catalog_images: ctx.catalog.len(),
        phase1_pairs: ctx.pools.pair_count(Phase::One),
        phase2_pairs: ctx.pools.pair_count(Phase::Two),
        repeated_speaker_ids: ctx.pools.repeated_speaker_ids().len(),
        repeated_utterance_ids: ctx.pools.repeated_utterance_ids().len(),
        ledger_keys: ctx.ledger.len(),
        flagged_folders: ctx.folders.flagged_folder_count(),
        issues_by_category,
    }
}

/// Write the folder tables, the error listing and the run summary into `output_dir`.
pub fn write_outputs(outcome: &AuditOutcome, output_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).map_err(|err| AuditError::write(output_dir, err))?;

    let mut written = outcome.folders.write_all(output_dir)?;

    let listing = output_dir.join(ERROR_LISTING);
    outcome.ledger.write_tsv(&listing, ["File", "Issue"])?;
    written.push(listing);

    let summary = output_dir.join(RUN_SUMMARY);
    outcome.summary.write(&summary)?;
    written.push(summary);

    Ok(written)
}
