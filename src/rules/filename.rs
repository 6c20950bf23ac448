//! Filename grammar: `{state}_{district}_{speaker}_{utt}_{image...}.wav|.tsv` for
//! utterance files and `{state}_{district}_{speaker}.txt` for speaker metadata.
//!
//! Every rule in [`check_filename`] runs independently so one file can carry
//! several codes. Structured fields come from [`FilenameRecord::parse`], which
//! reports a malformed name as a typed error instead of panicking on a missing token.

use thiserror::Error;

use crate::codes::ErrorCode;
use crate::config::AuditConfig;

pub const UTTERANCE_UNDERSCORES: usize = 5;
pub const METADATA_UNDERSCORES: usize = 2;

/// Tokens needed before the image reference can be read.
const UTTERANCE_MIN_TOKENS: usize = 5;
const METADATA_MIN_TOKENS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Audio,
    Table,
    Metadata,
    Pdf,
    Other,
}

impl FileKind {
    pub fn classify(name: &str) -> Self {
        if name.ends_with(".wav") {
            Self::Audio
        } else if name.ends_with(".tsv") {
            Self::Table
        } else if name.ends_with(".txt") {
            Self::Metadata
        } else if name.ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Other
        }
    }

    pub fn is_utterance(&self) -> bool {
        matches!(self, Self::Audio | Self::Table)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilenameError {
    #[error("'{name}' has {found} underscore-delimited tokens, at least {required} needed")]
    TooFewTokens {
        name: String,
        found: usize,
        required: usize,
    },
    #[error("'{0}' is not an audio, table or metadata file")]
    Unsupported(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameRecord {
    pub kind: FileKind,
    pub state: String,
    pub district: String,
    pub speaker_id: String,
    pub utterance_id: Option<String>,
    /// Tokens 5 and 6 joined, e.g. `Pune-A_01`; absent for metadata files.
    pub image_ref: Option<String>,
    pub extension: String,
}

impl FilenameRecord {
    pub fn parse(name: &str) -> Result<Self, FilenameError> {
        let kind = FileKind::classify(name);
        let required = match kind {
            FileKind::Audio | FileKind::Table => UTTERANCE_MIN_TOKENS,
            FileKind::Metadata => METADATA_MIN_TOKENS,
            FileKind::Pdf | FileKind::Other => {
                return Err(FilenameError::Unsupported(name.to_string()))
            }
        };

        let (stem, extension) = split_extension(name);
        let tokens: Vec<&str> = stem.split('_').collect();
        if tokens.len() < required {
            return Err(FilenameError::TooFewTokens {
                name: name.to_string(),
                found: tokens.len(),
                required,
            });
        }

        let (utterance_id, image_ref) = if kind.is_utterance() {
            let end = tokens.len().min(6);
            let joined = tokens[4..end].join("_");
            // Only the part before the first dot names the image.
            let image = joined.split_once('.').map_or(joined.as_str(), |(head, _)| head);
            (Some(tokens[3].to_string()), Some(image.to_string()))
        } else {
            (None, None)
        };

        Ok(Self {
            kind,
            state: tokens[0].to_string(),
            district: tokens[1].to_string(),
            speaker_id: tokens[2].to_string(),
            utterance_id,
            image_ref,
            extension: extension.to_string(),
        })
    }

    /// Canonical catalog identifier for the image this utterance was prompted with.
    pub fn image_id(&self) -> Option<String> {
        self.image_ref.as_ref().map(|image| format!("{image}.jpg"))
    }
}

/// Split at the last dot; a name without one has an empty extension.
pub fn split_extension(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(dot) => (&name[..dot], &name[dot + 1..]),
        None => (name, ""),
    }
}

/// Accepts anything that parses as a float, including exponent forms.
pub fn is_numeric(token: &str) -> bool {
    let token = token.trim();
    !token.is_empty() && token.parse::<f64>().is_ok()
}

/// Run every filename rule against `name` and collect the codes raised.
pub fn check_filename(name: &str, config: &AuditConfig) -> Vec<ErrorCode> {
    let mut codes = Vec::new();
    let kind = FileKind::classify(name);
    let (stem, extension) = split_extension(name);
    let underscores = name.matches('_').count();

    if kind.is_utterance() {
        if name.contains(' ') {
            codes.push(ErrorCode::FilenameContainsSpace);
        }
        if underscores != UTTERANCE_UNDERSCORES {
            codes.push(ErrorCode::IncorrectUnderscoreCount);
        }

        let tokens: Vec<&str> = stem.split('_').collect();
        if let (Some(district), Some(image)) = (tokens.get(1), tokens.get(4)) {
            if let Some((image_district, _)) = image.split_once('-') {
                if image_district != *district {
                    codes.push(ErrorCode::ImageDistrictMismatch);
                }
            }
        }
        if let Some(utterance) = tokens.get(3) {
            if !is_numeric(utterance) {
                codes.push(ErrorCode::NonNumericUttid);
            }
        }
    }

    if kind == FileKind::Metadata && underscores != METADATA_UNDERSCORES {
        codes.push(ErrorCode::IncorrectTxtUnderscoreCount);
    }

    if !extension.is_empty() && config.is_disallowed_audio_extension(extension) {
        codes.push(ErrorCode::IncorrectAudioExtension);
    }

    codes
}
