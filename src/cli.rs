use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use crate::audit::transcription::run_transcription_audit;
use crate::audit::{run_corpus_audit, write_outputs, AuditInputs};
use crate::config::{load_config, AuditConfig};

#[derive(Parser, Debug)]
#[command(name = "corpus-audit")]
#[command(about = "Rule-based audit of speech corpus deliveries")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit a `state/district/speaker` corpus tree and write the folder reports.
    Audit(AuditArgs),
    /// Check transcriber tables under `root/<batch>/<sub>/`.
    Transcripts(TranscriptArgs),
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    /// Corpus root holding state folders.
    #[arg(long)]
    pub root: PathBuf,
    /// Reference tree of earlier-batch tables used for repeat detection.
    #[arg(long)]
    pub phase1_folder: PathBuf,
    /// Headerless two-column state/district TSV.
    #[arg(long)]
    pub lookup: PathBuf,
    /// Image catalog spreadsheet (or a CSV/TSV with a Filename column).
    #[arg(long)]
    pub catalog: PathBuf,
    #[arg(long)]
    pub output_dir: PathBuf,
    /// Optional YAML overrides for thresholds and naming rules.
    #[arg(long, env = "CORPUS_AUDIT_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct TranscriptArgs {
    pub root: PathBuf,
    pub output_file: PathBuf,
    #[arg(long, env = "CORPUS_AUDIT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Parse `args` (program name first) and run. Returns the process exit code.
pub fn run_with_args(args: &[String]) -> i32 {
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return err.exit_code();
        }
    };
    match cli.command {
        Command::Audit(args) => handle_audit(args),
        Command::Transcripts(args) => handle_transcripts(args),
    }
}

fn resolve_config(path: Option<&Path>) -> Option<AuditConfig> {
    let Some(path) = path else {
        return Some(AuditConfig::default());
    };
    match load_config(path) {
        Ok(config) => Some(config),
        Err(err) => {
            error!(error = %err, "configuration rejected");
            eprintln!("config error: {err}");
            None
        }
    }
}

fn handle_audit(args: AuditArgs) -> i32 {
    let Some(config) = resolve_config(args.config.as_deref()) else {
        return 1;
    };
    let inputs = AuditInputs {
        root: args.root,
        phase1_folder: args.phase1_folder,
        lookup: args.lookup,
        catalog: args.catalog,
    };
    info!(root = %inputs.root.display(), "starting corpus audit");
    let outcome = run_corpus_audit(&inputs, config);

    match write_outputs(&outcome, &args.output_dir) {
        Ok(written) => {
            for path in &written {
                info!(path = %path.display(), "report written");
            }
            println!(
                "audit complete: folders={} files={} flagged_folders={} ledger_keys={} hours={:.2}",
                outcome.summary.speaker_folders,
                outcome.summary.files_scanned,
                outcome.summary.flagged_folders,
                outcome.summary.ledger_keys,
                outcome.summary.total_duration_hours,
            );
            0
        }
        Err(err) => {
            eprintln!("failed to write reports: {err}");
            1
        }
    }
}

fn handle_transcripts(args: TranscriptArgs) -> i32 {
    let Some(config) = resolve_config(args.config.as_deref()) else {
        return 1;
    };
    info!(root = %args.root.display(), "starting transcription audit");
    let outcome = run_transcription_audit(&args.root, &config);

    match outcome.write(&args.output_file) {
        Ok(()) => {
            println!(
                "transcription audit complete: folders={} tables={} flagged={}",
                outcome.folders_checked,
                outcome.tables_checked,
                outcome.ledger.len(),
            );
            0
        }
        Err(err) => {
            eprintln!("failed to write {}: {err}", args.output_file.display());
            1
        }
    }
}
