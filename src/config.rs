//! Configuration loading from environment variables and TOML files.
//!
//! All values come from `GG_TEXT_*` environment variables with defaults.
//! Invalid values fall back to defaults without crashing. A TOML file can
//! supply the same settings; environment variables win over file values.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GG_TEXT_MAX_LENGTH` | 512 | Default encode length (tokens) |
//! | `GG_TEXT_MAX_NEW_TOKENS` | 256 | Greedy generation budget |
//! | `GG_TEXT_LOG_LEVEL` | info | `EnvFilter` directive |
//! | `GG_TEXT_LOG_FORMAT` | json | `json` or `pretty` |
//! | `GG_TEXT_LOG_FILE` | (stderr) | Log file path |
//! | `GG_TEXT_STOP_SEQUENCES` | (none) | Comma-separated stop sequences |

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::generation::GreedyConfig;
use crate::telemetry::{LogConfig, LogFormat};
use crate::tokenizer::{TokenId, DEFAULT_MAX_LENGTH};

const DEFAULT_MAX_NEW_TOKENS: usize = 256;
const MIN_MAX_LENGTH: usize = 2;
const MAX_MAX_LENGTH: usize = 1_000_000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Effective configuration summary (serializable).
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    pub max_length: usize,
    pub max_new_tokens: usize,
    pub log_level: String,
    pub log_format: String,
    pub log_file: Option<PathBuf>,
    pub stop_sequences: Vec<String>,
}

/// Settings as written in a TOML file; every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub max_length: Option<usize>,
    pub max_new_tokens: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<String>,
    pub log_file: Option<PathBuf>,
    pub stop_sequences: Option<Vec<String>>,
}

/// All configuration after defaults, file values and environment overrides.
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub max_length: usize,
    pub max_new_tokens: usize,
    pub log: LogConfig,
    pub stop_sequences: Vec<String>,
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.trim().parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Non-empty string env var.
fn parse_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_stop_sequences(raw: &str) -> Vec<String> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn load_log_config(file: &FileConfig) -> LogConfig {
    let defaults = LogConfig::default();
    let level = parse_string("GG_TEXT_LOG_LEVEL")
        .or_else(|| file.log_level.clone())
        .unwrap_or(defaults.level);
    let format = parse_string("GG_TEXT_LOG_FORMAT")
        .or_else(|| file.log_format.clone())
        .and_then(|f| LogFormat::parse(&f))
        .unwrap_or(defaults.format);
    let output_path = parse_string("GG_TEXT_LOG_FILE")
        .map(PathBuf::from)
        .or_else(|| file.log_file.clone());
    LogConfig { format, level, output_path }
}

fn resolve(file: FileConfig) -> EnvConfig {
    let max_length = parse_usize(
        "GG_TEXT_MAX_LENGTH",
        file.max_length.unwrap_or(DEFAULT_MAX_LENGTH),
    );
    let max_length = max_length.clamp(MIN_MAX_LENGTH, MAX_MAX_LENGTH);
    let max_new_tokens = parse_usize(
        "GG_TEXT_MAX_NEW_TOKENS",
        file.max_new_tokens.unwrap_or(DEFAULT_MAX_NEW_TOKENS),
    );
    let max_new_tokens = max_new_tokens.max(1);
    let stop_sequences = match std::env::var("GG_TEXT_STOP_SEQUENCES") {
        Ok(raw) => parse_stop_sequences(&raw),
        Err(_) => file.stop_sequences.clone().unwrap_or_default(),
    };

    EnvConfig {
        max_length,
        max_new_tokens,
        log: load_log_config(&file),
        stop_sequences,
    }
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> EnvConfig {
    resolve(FileConfig::default())
}

/// Load a TOML file, then apply environment overrides.
pub fn load_file(path: &Path) -> Result<EnvConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: FileConfig = toml::from_str(&text).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    tracing::debug!(path = %path.display(), "config file loaded");
    Ok(resolve(file))
}

impl EnvConfig {
    /// Return a serializable summary of all effective values.
    pub fn effective_config(&self) -> EffectiveConfig {
        EffectiveConfig {
            max_length: self.max_length,
            max_new_tokens: self.max_new_tokens,
            log_level: self.log.level.clone(),
            log_format: match self.log.format {
                LogFormat::Json => "json".into(),
                LogFormat::Pretty => "pretty".into(),
            },
            log_file: self.log.output_path.clone(),
            stop_sequences: self.stop_sequences.clone(),
        }
    }

    /// Greedy generation settings for a model with the given EOS ids.
    pub fn greedy_config(&self, eos_token_ids: Vec<TokenId>) -> GreedyConfig {
        GreedyConfig {
            max_new_tokens: self.max_new_tokens,
            eos_token_ids,
            stop_sequences: self.stop_sequences.clone(),
        }
    }
}
