//! Decode and content-staging configuration

use crate::error::{EntryError, FieldContext, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Options controlling how tolerant [`FileEntry::decode_with`] is
///
/// [`FileEntry::decode_with`]: crate::FileEntry::decode_with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// Treat end of input inside the optional-data section as corruption
    /// even after at least one record was read
    pub strict_optional_eof: bool,
}

impl DecodeOptions {
    pub fn strict() -> Self {
        DecodeOptions {
            strict_optional_eof: true,
        }
    }
}

/// Where and how content is staged to temporary files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    /// Directory for temp files; the system temp dir when unset
    pub temp_dir: Option<PathBuf>,

    /// File name prefix for temp files
    pub temp_prefix: String,

    /// Buffer size used when streaming content between files
    pub copy_buffer_size: usize,
}

impl Default for StagingConfig {
    fn default() -> Self {
        StagingConfig {
            temp_dir: None,
            temp_prefix: String::from("novuspack-fileentry-"),
            copy_buffer_size: 64 * 1024,
        }
    }
}

impl StagingConfig {
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryConfig {
    pub decode: DecodeOptions,
    pub staging: StagingConfig,
}

impl EntryConfig {
    /// Parse a TOML document; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EntryConfig = toml::from_str(text).map_err(|e| {
            EntryError::validation(
                "invalid configuration",
                FieldContext::new("config", e.message(), "valid TOML configuration"),
            )
            .with_source(e)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| {
            EntryError::validation(
                "configuration cannot be serialized",
                FieldContext::new("config", &e, "serializable configuration"),
            )
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.staging.copy_buffer_size == 0 {
            return Err(EntryError::validation(
                "copy buffer size must be positive",
                FieldContext::new("staging.copy_buffer_size", 0, "> 0"),
            ));
        }
        if self.staging.temp_prefix.contains(std::path::MAIN_SEPARATOR) {
            return Err(EntryError::validation(
                "temp prefix cannot contain a path separator",
                FieldContext::new("staging.temp_prefix", &self.staging.temp_prefix, "plain file name prefix"),
            ));
        }
        Ok(())
    }

    pub fn with_strict_decode(mut self, strict: bool) -> Self {
        self.decode.strict_optional_eof = strict;
        self
    }

    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging.temp_dir = Some(dir.into());
        self
    }

    pub fn with_temp_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.staging.temp_prefix = prefix.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EntryConfig::default();
        assert!(!config.decode.strict_optional_eof);
        assert_eq!(config.staging.temp_prefix, "novuspack-fileentry-");
        assert_eq!(config.staging.copy_buffer_size, 65536);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial() {
        let config = EntryConfig::from_toml_str(
            r#"
            [decode]
            strict_optional_eof = true

            [staging]
            temp_prefix = "stage-"
            "#,
        )
        .unwrap();
        assert!(config.decode.strict_optional_eof);
        assert_eq!(config.staging.temp_prefix, "stage-");
        assert_eq!(config.staging.copy_buffer_size, 65536);
    }

    #[test]
    fn test_from_toml_rejects_zero_buffer() {
        let err = EntryConfig::from_toml_str("[staging]\ncopy_buffer_size = 0\n").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_from_toml_rejects_garbage() {
        assert!(EntryConfig::from_toml_str("decode = [").is_err());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EntryConfig::default()
            .with_strict_decode(true)
            .with_temp_dir("/var/tmp/stage");
        let text = config.to_toml_string().unwrap();
        assert_eq!(EntryConfig::from_toml_str(&text).unwrap(), config);
    }
}
