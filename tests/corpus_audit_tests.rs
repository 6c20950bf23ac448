use std::fs;
use std::path::{Path, PathBuf};

use corpus_audit::audit::{run_corpus_audit, write_outputs, AuditInputs, AuditOutcome};
use corpus_audit::codes::ErrorCode;
use corpus_audit::config::AuditConfig;
use corpus_audit::report::{ERROR_LISTING, PREINITIAL_REPORT, RUN_SUMMARY};
use tempfile::TempDir;

const SPEAKER: &str = "MH/Pune/SPK001";
const WAV: &str = "MH_Pune_SPK001_12_Pune-A_01.wav";
const TSV: &str = "MH_Pune_SPK001_12_Pune-A_01.tsv";
const META: &str = "MH_Pune_SPK001.txt";
const METADATA_TEXT: &str =
    "Speaker_ID: SPK001\nGender: F\nAge: 34\nState: MH\nDistrict: Pune\nPhone: Android\n";

struct Fixture {
    dir: TempDir,
    inputs: AuditInputs,
}

impl Fixture {
    /// One clean speaker folder, a matching lookup and catalog, an unrelated phase-1 batch.
    fn clean() -> Self {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let root = dir.path().join("corpus");
        let phase1 = dir.path().join("phase1");
        fs::create_dir_all(&phase1).expect("fixture dirs should be created");
        fs::write(
            phase1.join("old_batch.tsv"),
            "/old/KA_Mysuru_SPK777_900_img.wav\tx\n",
        )
        .expect("fixture should be written");

        let lookup = dir.path().join("lookup.tsv");
        fs::write(&lookup, "MH\tPune\nKA\tMysuru\n").expect("fixture should be written");
        let catalog = dir.path().join("catalog.csv");
        fs::write(&catalog, "Filename,Theme\nPune-A_01.jpg,market\nGeneric_03.jpg,home\n")
            .expect("fixture should be written");

        let fixture = Self {
            inputs: AuditInputs {
                root,
                phase1_folder: phase1,
                lookup,
                catalog,
            },
            dir,
        };
        fixture.write(WAV, "RIFF");
        fixture.write(TSV, &table_row(WAV, "12"));
        fixture.write(META, METADATA_TEXT);
        fixture.write("MH_Pune_SPK001.pdf", "%PDF");
        fixture
    }

    fn speaker_dir(&self) -> PathBuf {
        self.inputs.root.join(SPEAKER)
    }

    fn write(&self, name: &str, contents: &str) {
        let dir = self.speaker_dir();
        fs::create_dir_all(&dir).expect("fixture dirs should be created");
        fs::write(dir.join(name), contents).expect("fixture should be written");
    }

    fn remove(&self, name: &str) {
        fs::remove_file(self.speaker_dir().join(name)).expect("fixture should be removed");
    }

    fn run(&self) -> AuditOutcome {
        let mut config = AuditConfig::default();
        config.duration_min_hours = 0.0;
        run_corpus_audit(&self.inputs, config)
    }
}

fn table_row(wav: &str, utterance: &str) -> String {
    format!("1\tPune-A_01.jpg\t{wav}\t{utterance}\t0.0\t4.5\tnamaskar\n")
}

fn file_key(name: &str) -> String {
    format!("{SPEAKER}/{name}")
}

fn codes(outcome: &AuditOutcome, key: &str) -> Vec<ErrorCode> {
    outcome.ledger.codes_for(key).into_iter().collect()
}

#[test]
fn clean_speaker_folder_has_empty_ledger() {
    let fixture = Fixture::clean();
    let outcome = fixture.run();

    let keys: Vec<&str> = outcome.ledger.keys_under(SPEAKER).collect();
    assert!(keys.is_empty(), "unexpected findings: {keys:?}");
    assert!(outcome.ledger.is_empty());
    assert_eq!(outcome.summary.speaker_folders, 1);
    assert_eq!(outcome.summary.files_scanned, 4);
    assert_eq!(outcome.summary.phase1_pairs, 1);
    assert_eq!(outcome.summary.flagged_folders, 0);
}

#[test]
fn foreign_codec_raises_only_extension_code() {
    let fixture = Fixture::clean();
    fixture.remove(WAV);
    let mp3 = "MH_Pune_SPK001_12_Pune-A_01.mp3";
    fixture.write(mp3, "ID3");

    let outcome = fixture.run();
    assert_eq!(
        codes(&outcome, &file_key(mp3)),
        vec![ErrorCode::IncorrectAudioExtension]
    );
}

#[test]
fn non_numeric_utterance_raises_only_uttid_code() {
    let fixture = Fixture::clean();
    fixture.remove(WAV);
    let wav = "MH_Pune_SPK001_AB_Pune-A_01.wav";
    fixture.write(wav, "RIFF");

    let outcome = fixture.run();
    assert_eq!(codes(&outcome, &file_key(wav)), vec![ErrorCode::NonNumericUttid]);
}

#[test]
fn missing_declaration_is_not_also_a_mismatch() {
    let fixture = Fixture::clean();
    fixture.write(META, "Gender: F\nAge: 34\nState: MH\nDistrict: Pune\n");

    let outcome = fixture.run();
    assert_eq!(
        codes(&outcome, SPEAKER),
        vec![ErrorCode::SpeakerIdNotFound]
    );
    let mismatches = outcome
        .ledger
        .count_by_code()
        .get(&ErrorCode::SpeakerIdMismatch)
        .copied()
        .unwrap_or(0);
    assert_eq!(mismatches, 0);
}

#[test]
fn declared_speaker_must_match_every_utterance_file() {
    let fixture = Fixture::clean();
    fixture.write(META, &METADATA_TEXT.replace("SPK001", "SPK999"));

    let outcome = fixture.run();
    for name in [WAV, TSV] {
        assert!(
            codes(&outcome, &file_key(name)).contains(&ErrorCode::SpeakerIdMismatch),
            "{name} should mismatch"
        );
    }
    assert!(!outcome.ledger.contains_key(&file_key(META)));
}

#[test]
fn folder_without_metadata_file() {
    let fixture = Fixture::clean();
    fixture.remove(META);

    let outcome = fixture.run();
    assert_eq!(codes(&outcome, SPEAKER), vec![ErrorCode::NoMetadataFile]);
}

#[test]
fn two_metadata_files_are_their_own_condition() {
    let fixture = Fixture::clean();
    fixture.write("MH_Pune_SPK002.txt", METADATA_TEXT);

    let outcome = fixture.run();
    assert_eq!(
        codes(&outcome, SPEAKER),
        vec![ErrorCode::MultipleMetadataFiles]
    );
}

#[test]
fn image_outside_catalog_is_flagged_in_bulk() {
    let fixture = Fixture::clean();
    let wav = "MH_Pune_SPK001_13_Pune-Q_44.wav";
    fixture.write(wav, "RIFF");

    let outcome = fixture.run();
    assert_eq!(
        codes(&outcome, &file_key(wav)),
        vec![ErrorCode::ImageNotInCatalog]
    );
    assert!(!outcome.ledger.contains_key(&file_key(WAV)));
}

#[test]
fn unknown_state_is_a_lookup_mismatch() {
    let fixture = Fixture::clean();
    let wav = "GJ_Pune_SPK001_14_Pune-A_01.wav";
    fixture.write(wav, "RIFF");

    let outcome = fixture.run();
    assert!(codes(&outcome, &file_key(wav)).contains(&ErrorCode::StateDistrictMismatch));
}

#[test]
fn metadata_file_name_is_checked_against_lookup() {
    let fixture = Fixture::clean();
    fixture.remove(META);
    let text = "GJ_Surat_SPK001.txt";
    fixture.write(text, METADATA_TEXT);

    let outcome = fixture.run();
    assert_eq!(
        codes(&outcome, &file_key(text)),
        vec![ErrorCode::StateDistrictMismatch]
    );
}

#[test]
fn ids_seen_in_phase1_are_repeats() {
    let fixture = Fixture::clean();
    fs::write(
        fixture.inputs.phase1_folder.join("nested_batch.tsv"),
        "/old/MH_Pune_SPK001_12_img.wav\tx\n",
    )
    .expect("fixture should be written");

    let outcome = fixture.run();
    assert!(outcome
        .ledger
        .codes_for("Repeated_speaker_ID_SPK001")
        .contains(&ErrorCode::RepeatedSpeakerId));
    assert!(outcome
        .ledger
        .codes_for("Repeated_utt_ID_12")
        .contains(&ErrorCode::RepeatedUtteranceId));
    assert_eq!(outcome.summary.repeated_speaker_ids, 1);
}

#[test]
fn duration_budget_uses_configured_band() {
    let fixture = Fixture::clean();
    let outcome = run_corpus_audit(&fixture.inputs, AuditConfig::default());
    assert!(outcome
        .ledger
        .codes_for("Batch Duration not between 300 to 900 Hours")
        .contains(&ErrorCode::DurationOutOfRange));
    assert!((outcome.summary.total_duration_hours - 4.5 / 3600.0).abs() < 1e-9);

    let clean = fixture.run();
    assert!(!clean.ledger.contains_key("Batch Duration not between 0 to 900 Hours"));
}

#[test]
fn table_without_trailing_newline_is_flagged() {
    let fixture = Fixture::clean();
    fixture.write(TSV, table_row(WAV, "12").trim_end());

    let outcome = fixture.run();
    assert_eq!(
        codes(&outcome, &file_key(TSV)),
        vec![ErrorCode::MissingTrailingNewline]
    );
}

#[test]
fn unreadable_reference_inputs_degrade_instead_of_aborting() {
    let mut fixture = Fixture::clean();
    fixture.inputs.lookup = fixture.dir.path().join("missing_lookup.tsv");
    fixture.inputs.catalog = fixture.dir.path().join("missing_catalog.xlsx");

    let outcome = fixture.run();
    let wav_codes = codes(&outcome, &file_key(WAV));
    assert!(wav_codes.contains(&ErrorCode::StateDistrictMismatch));
    assert!(wav_codes.contains(&ErrorCode::ImageNotInCatalog));
    let lookup_key = fixture.inputs.lookup.display().to_string();
    assert!(outcome.ledger.contains_key(&lookup_key));
    assert_eq!(outcome.summary.lookup_pairs, 0);
    assert_eq!(outcome.summary.catalog_images, 0);
}

#[test]
fn outputs_are_written_with_expected_headers() {
    let fixture = Fixture::clean();
    fixture.remove("MH_Pune_SPK001.pdf");
    let outcome = fixture.run();
    let out = fixture.dir.path().join("reports");

    let written = write_outputs(&outcome, &out).expect("outputs should be written");
    assert_eq!(written.len(), 5);
    for path in &written {
        assert!(path.is_file(), "{} missing", path.display());
    }

    let listing =
        fs::read_to_string(out.join(ERROR_LISTING)).expect("listing should be readable");
    assert!(listing.starts_with("File\tIssue\n"));

    let preinitial =
        fs::read_to_string(out.join(PREINITIAL_REPORT)).expect("report should be readable");
    assert_eq!(
        preinitial,
        format!("Speaker\tReason\n{SPEAKER}\tError: (PDF-E1)\n")
    );

    let raw_summary =
        fs::read_to_string(out.join(RUN_SUMMARY)).expect("summary should be readable");
    let summary: serde_json::Value =
        serde_json::from_str(&raw_summary).expect("summary should be json");
    assert_eq!(summary["speaker_folders"], 1);
    assert_eq!(summary["flagged_folders"], 1);
    assert!(summary["generated_at"].is_string());
}

#[test]
fn missing_root_completes_with_an_exception_entry() {
    let mut fixture = Fixture::clean();
    fixture.inputs.root = Path::new("/definitely/not/a/corpus").to_path_buf();

    let outcome = fixture.run();
    assert_eq!(outcome.summary.speaker_folders, 0);
    assert!(outcome.ledger.contains_key("/definitely/not/a/corpus"));
}

#[test]
fn missing_phase1_folder_is_keyed_under_phase1_prefix() {
    let mut fixture = Fixture::clean();
    fixture.inputs.phase1_folder = fixture.dir.path().join("no_phase1");

    let outcome = fixture.run();
    let keys: Vec<&str> = outcome.ledger.keys_under("phase1").collect();
    assert!(!keys.is_empty(), "phase-1 failure should be recorded");
    assert!(keys.iter().all(|key| !key.contains("//")), "malformed keys: {keys:?}");
}
