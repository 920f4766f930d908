// SPDX-License-Identifier: MIT
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, StreamError};
use crate::io::{Endianness, TextEncoding};

static CURRENT: OnceCell<Config> = OnceCell::new();

/// Tunables shared by streams, readers and writers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Byte order used by readers/writers created without one
    pub default_endianness: Endianness,
    /// Text encoding used by readers/writers created without one
    pub default_encoding: TextEncoding,
    /// Chunk size for stream copies and comparisons
    pub copy_buffer_size: usize,
    /// Bytes pulled per step of a text token search
    pub text_chunk_size: usize,
    /// Return memory buffers to a shared pool when their source is disposed
    pub recycle_memory_buffers: bool,
    /// Larger buffers are freed instead of pooled
    pub max_recycled_buffer_size: usize,
    pub max_pooled_buffers: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_endianness: Endianness::LittleEndian,
            default_encoding: TextEncoding::Utf8,
            copy_buffer_size: 70 * 1024,
            text_chunk_size: 128,
            recycle_memory_buffers: true,
            max_recycled_buffer_size: 1024 * 1024,
            max_pooled_buffers: 16,
        }
    }
}

impl Config {
    /// Load configuration from `BINSTREAM_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, falling back to defaults for
    /// missing or unparsable values
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            default_endianness: parse_or(
                &lookup,
                "BINSTREAM_ENDIANNESS",
                defaults.default_endianness,
            ),
            default_encoding: parse_or(&lookup, "BINSTREAM_ENCODING", defaults.default_encoding),
            copy_buffer_size: parse_or(
                &lookup,
                "BINSTREAM_COPY_BUFFER_SIZE",
                defaults.copy_buffer_size,
            ),
            text_chunk_size: parse_or(
                &lookup,
                "BINSTREAM_TEXT_CHUNK_SIZE",
                defaults.text_chunk_size,
            ),
            recycle_memory_buffers: parse_or(
                &lookup,
                "BINSTREAM_RECYCLE_BUFFERS",
                defaults.recycle_memory_buffers,
            ),
            max_recycled_buffer_size: parse_or(
                &lookup,
                "BINSTREAM_MAX_RECYCLED_BUFFER_SIZE",
                defaults.max_recycled_buffer_size,
            ),
            max_pooled_buffers: parse_or(
                &lookup,
                "BINSTREAM_MAX_POOLED_BUFFERS",
                defaults.max_pooled_buffers,
            ),
        }
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| StreamError::Config(e.to_string()))?;
        config.validate().map_err(StreamError::Config)?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.copy_buffer_size == 0 {
            return Err("copy_buffer_size must be greater than zero".to_string());
        }

        if self.text_chunk_size == 0 {
            return Err("text_chunk_size must be greater than zero".to_string());
        }

        Ok(())
    }

    /// Install the process-wide configuration.
    ///
    /// Fails when the configuration is invalid or when one was already
    /// installed or read through [`Config::current`].
    pub fn install(config: Config) -> Result<()> {
        config.validate().map_err(StreamError::Config)?;
        CURRENT
            .set(config)
            .map_err(|_| StreamError::Config("configuration is already installed".to_string()))
    }

    /// Process-wide configuration, defaults unless [`Config::install`] ran first
    pub fn current() -> &'static Config {
        CURRENT.get_or_init(Config::default)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(key, value = %raw, "Invalid configuration value, using default");
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.copy_buffer_size, 70 * 1024);
        assert_eq!(config.text_chunk_size, 128);
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("BINSTREAM_ENDIANNESS", "big-endian"),
            ("BINSTREAM_ENCODING", "utf-16le"),
            ("BINSTREAM_COPY_BUFFER_SIZE", "4096"),
            ("BINSTREAM_RECYCLE_BUFFERS", "false"),
        ]));

        assert_eq!(config.default_endianness, Endianness::BigEndian);
        assert_eq!(config.default_encoding, TextEncoding::Utf16Le);
        assert_eq!(config.copy_buffer_size, 4096);
        assert!(!config.recycle_memory_buffers);
        assert_eq!(config.text_chunk_size, 128);
    }

    #[test]
    fn test_invalid_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("BINSTREAM_TEXT_CHUNK_SIZE", "lots"),
            ("BINSTREAM_ENDIANNESS", "middle"),
        ]));
        assert_eq!(config.text_chunk_size, 128);
        assert_eq!(config.default_endianness, Endianness::LittleEndian);
    }

    #[test]
    fn test_validate_rejects_zero_chunks() {
        let config = Config {
            text_chunk_size: 0,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_toml_str() {
        let config = Config::from_toml_str(
            r#"
            default_endianness = "big-endian"
            copy_buffer_size = 512
            "#,
        )
        .unwrap();
        assert_eq!(config.default_endianness, Endianness::BigEndian);
        assert_eq!(config.copy_buffer_size, 512);
        assert_eq!(config.max_pooled_buffers, 16);

        let err = Config::from_toml_str("copy_buffer_size = 0").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }
}
