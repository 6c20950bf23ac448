//! Error-code taxonomy for corpus and transcription audits.
//!
//! Each variant carries a stable wire tag (`SPK-E*` for the corpus audit,
//! `TRXN_E*` for transcription batches) that ends up in the report files.

use std::fmt;

use serde::Serialize;

/// Tag written in front of free-text exception entries.
pub const EXCEPTION_TAG: &str = "SPK-E99";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorCode {
    StateDistrictMismatch,
    FilenameContainsSpace,
    IncorrectUnderscoreCount,
    ImageDistrictMismatch,
    IncorrectTxtUnderscoreCount,
    RepeatedSpeakerId,
    RepeatedUtteranceId,
    MissingTrailingNewline,
    DisallowedUnicodeChar,
    SpeakerIdMismatch,
    SpeakerIdNotFound,
    NoMetadataFile,
    NonNumericUttid,
    ImageNotInCatalog,
    IncorrectAudioExtension,
    DurationOutOfRange,
    MultipleMetadataFiles,
    MultipleTableFiles,
    FolderEmpty,
    WrongColumnCount,
    EmbeddedControlChar,
    FileEmpty,
    NotTabSeparated,
    FormatViolation,
}

/// Coarse grouping used in log output and the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    FilenameGrammar,
    TableFormat,
    CrossReference,
    Duplicate,
    Aggregate,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StateDistrictMismatch => "SPK-E12",
            Self::FilenameContainsSpace => "SPK-E13",
            Self::IncorrectUnderscoreCount => "SPK-E14",
            Self::ImageDistrictMismatch => "SPK-E15",
            Self::IncorrectTxtUnderscoreCount => "SPK-E16",
            Self::RepeatedSpeakerId => "SPK-E17",
            Self::RepeatedUtteranceId => "SPK-E18",
            Self::MissingTrailingNewline => "SPK-E19",
            Self::DisallowedUnicodeChar => "SPK-E20",
            Self::SpeakerIdMismatch => "SPK-E21",
            Self::SpeakerIdNotFound => "SPK-E22",
            Self::NoMetadataFile => "SPK-E23",
            Self::NonNumericUttid => "SPK-E24",
            Self::ImageNotInCatalog => "SPK-E25",
            Self::IncorrectAudioExtension => "SPK-E26",
            Self::DurationOutOfRange => "SPK-E27",
            Self::MultipleMetadataFiles => "SPK-E28",
            Self::MultipleTableFiles => "TRXN_E1",
            Self::FolderEmpty => "TRXN_E2",
            Self::WrongColumnCount => "TRXN_E3",
            Self::EmbeddedControlChar => "TRXN_E4",
            Self::FileEmpty => "TRXN_E5",
            Self::NotTabSeparated => "TRXN_E6",
            Self::FormatViolation => "TRXN_E7",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::StateDistrictMismatch => "state or district not in lookup",
            Self::FilenameContainsSpace => "filename contains space",
            Self::IncorrectUnderscoreCount => "incorrect number of underscores",
            Self::ImageDistrictMismatch => "image district mismatch",
            Self::IncorrectTxtUnderscoreCount => "incorrect number of underscores in .txt",
            Self::RepeatedSpeakerId => "repeated speaker ID",
            Self::RepeatedUtteranceId => "repeated utterance ID",
            Self::MissingTrailingNewline => "table file does not end with newline",
            Self::DisallowedUnicodeChar => "disallowed character in table file",
            Self::SpeakerIdMismatch => "speaker ID differs from metadata",
            Self::SpeakerIdNotFound => "Speaker_ID not found in metadata",
            Self::NoMetadataFile => "no metadata .txt file",
            Self::NonNumericUttid => "non-numeric utterance ID",
            Self::ImageNotInCatalog => "image not present in catalog",
            Self::IncorrectAudioExtension => "audio extension is not .wav",
            Self::DurationOutOfRange => "total duration out of range",
            Self::MultipleMetadataFiles => "more than one metadata .txt file",
            Self::MultipleTableFiles => "folder contains multiple table files",
            Self::FolderEmpty => "folder has no table file",
            Self::WrongColumnCount => "wrong column count",
            Self::EmbeddedControlChar => "transcript contains newline or tab",
            Self::FileEmpty => "file is empty",
            Self::NotTabSeparated => "file is not tab-separated",
            Self::FormatViolation => "row does not follow the column grammar",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::FilenameContainsSpace
            | Self::IncorrectUnderscoreCount
            | Self::ImageDistrictMismatch
            | Self::IncorrectTxtUnderscoreCount
            | Self::NonNumericUttid
            | Self::IncorrectAudioExtension => ErrorCategory::FilenameGrammar,
            Self::MissingTrailingNewline
            | Self::DisallowedUnicodeChar
            | Self::MultipleTableFiles
            | Self::FolderEmpty
            | Self::WrongColumnCount
            | Self::EmbeddedControlChar
            | Self::FileEmpty
            | Self::NotTabSeparated
            | Self::FormatViolation => ErrorCategory::TableFormat,
            Self::StateDistrictMismatch
            | Self::SpeakerIdMismatch
            | Self::SpeakerIdNotFound
            | Self::NoMetadataFile
            | Self::MultipleMetadataFiles
            | Self::ImageNotInCatalog => ErrorCategory::CrossReference,
            Self::RepeatedSpeakerId | Self::RepeatedUtteranceId => ErrorCategory::Duplicate,
            Self::DurationOutOfRange => ErrorCategory::Aggregate,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_tags_keep_their_prefix_per_audit() {
        assert_eq!(ErrorCode::StateDistrictMismatch.as_str(), "SPK-E12");
        assert_eq!(ErrorCode::DurationOutOfRange.as_str(), "SPK-E27");
        assert_eq!(ErrorCode::MultipleTableFiles.as_str(), "TRXN_E1");
        assert_eq!(ErrorCode::FormatViolation.to_string(), "TRXN_E7");
    }

    #[test]
    fn categories_follow_taxonomy() {
        assert_eq!(
            ErrorCode::NonNumericUttid.category(),
            ErrorCategory::FilenameGrammar
        );
        assert_eq!(
            ErrorCode::RepeatedSpeakerId.category(),
            ErrorCategory::Duplicate
        );
        assert_eq!(
            ErrorCode::DurationOutOfRange.category(),
            ErrorCategory::Aggregate
        );
    }
}
