//! Run configuration: thresholds and naming conventions the rule engine checks against.
//! Every field has a default, so an absent or partial YAML file is fine.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AuditError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Acceptable total corpus duration, inclusive on both ends.
    pub duration_min_hours: f64,
    pub duration_max_hours: f64,
    /// Substrings that must not appear anywhere in a corpus table file.
    pub disallowed_chars: Vec<String>,
    /// Audio codecs rejected by extension, compared case-insensitively, without the dot.
    pub disallowed_audio_extensions: Vec<String>,
    pub transcription_columns: usize,
    pub duration_start_column: usize,
    pub duration_end_column: usize,
    pub catalog_sheets: Vec<String>,
    pub catalog_column: String,
    pub required_metadata_fields: Vec<String>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            duration_min_hours: 300.0,
            duration_max_hours: 900.0,
            disallowed_chars: vec!["\r".to_string()],
            disallowed_audio_extensions: ["mp3", "flac", "aac", "ogg", "wma", "alac"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            transcription_columns: 7,
            duration_start_column: 4,
            duration_end_column: 5,
            catalog_sheets: vec![
                "DistrictSpecificImages".to_string(),
                "GenericImages".to_string(),
            ],
            catalog_column: "Filename".to_string(),
            required_metadata_fields: ["Speaker_ID", "Gender", "Age", "State", "District"]
                .iter()
                .map(|field| field.to_string())
                .collect(),
        }
    }
}

impl AuditConfig {
    pub fn is_disallowed_audio_extension(&self, extension: &str) -> bool {
        self.disallowed_audio_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

/// Load config from a YAML file. Missing keys take their defaults.
pub fn load_config(path: impl AsRef<Path>) -> Result<AuditConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|err| AuditError::read(path, err))?;
    if raw.trim().is_empty() {
        return Ok(AuditConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| AuditError::Config {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let parsed: AuditConfig =
            serde_yaml::from_str("duration_min_hours: 10.0\ndisallowed_chars: [\"\\u00a0\"]\n")
                .unwrap();
        assert_eq!(parsed.duration_min_hours, 10.0);
        assert_eq!(parsed.duration_max_hours, 900.0);
        assert_eq!(parsed.disallowed_chars, vec!["\u{a0}".to_string()]);
        assert_eq!(parsed.transcription_columns, 7);
    }

    #[test]
    fn audio_extension_match_ignores_case() {
        let config = AuditConfig::default();
        assert!(config.is_disallowed_audio_extension("MP3"));
        assert!(config.is_disallowed_audio_extension("flac"));
        assert!(!config.is_disallowed_audio_extension("wav"));
    }
}
