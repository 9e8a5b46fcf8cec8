//! Decoder configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMESPLIT_CONFIG` (environment variable)
//! 2. `~/.config/mimesplit/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimesplit\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Buffer sizing.
    pub buffer: BufferConfig,
    /// Hard limits on untrusted input.
    pub limits: LimitsConfig,
    /// Parsing leniency.
    pub parser: ParserConfig,
}

/// Buffer sizing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Bytes pulled from the input per refill (default: 8192).
    /// Raised to the boundary delimiter length if smaller.
    pub read_buffer_size: usize,
    /// Initial capacity of each part's body buffer (default: 4096).
    pub initial_part_capacity: usize,
}

/// Limits on untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum body size of a single part in bytes (default: 256 MB).
    pub max_part_size: usize,
    /// Maximum size of a part's header block in bytes (default: 64 KB).
    pub max_header_size: usize,
}

/// Parsing leniency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Accept a final part that runs to EOF without a closing boundary.
    pub allow_unterminated_final_part: bool,
}

/// Failure to load an explicitly named config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

// ── Default implementations ─────────────────────────────────────

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 8 * 1024,  // 8 KB
            initial_part_capacity: 4096, // 4 KB
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_part_size: 256 * 1024 * 1024, // 256 MB
            max_header_size: 64 * 1024,       // 64 KB
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match load_config_from(&path) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load config, using defaults");
                }
            }
        }
    }
    Config::default()
}

/// Load configuration from a specific file.
pub fn load_config_from(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg = toml::from_str::<Config>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MIMESPLIT_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mimesplit").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.buffer.read_buffer_size, 8192);
        assert_eq!(cfg.buffer.initial_part_capacity, 4096);
        assert_eq!(cfg.limits.max_header_size, 64 * 1024);
        assert!(!cfg.parser.allow_unterminated_final_part);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let mut cfg = Config::default();
        cfg.limits.max_part_size = 1024;
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[parser]
allow_unterminated_final_part = true

[limits]
max_part_size = 1048576
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert!(cfg.parser.allow_unterminated_final_part);
        assert_eq!(cfg.limits.max_part_size, 1_048_576);
        // Other fields use defaults
        assert_eq!(cfg.limits.max_header_size, 64 * 1024);
        assert_eq!(cfg.buffer.read_buffer_size, 8192);
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[buffer]\nread_buffer_size = 64\n").expect("write");
        let cfg = load_config_from(&path).expect("load");
        assert_eq!(cfg.buffer.read_buffer_size, 64);
    }

    #[test]
    fn test_load_config_from_invalid_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[buffer\nread_buffer_size = ").expect("write");
        assert!(matches!(
            load_config_from(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            load_config_from(dir.path().join("missing.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
