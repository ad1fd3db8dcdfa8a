// SPDX-License-Identifier: MIT OR Apache-2.0
#![doc = include_str!("../README.md")]
//! mf-config
#![deny(unsafe_code)]
#![warn(missing_docs)]

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Fatal configuration failures (spec §0.3: "fatal").
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The requested configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound {
        /// Path that was requested.
        path: String,
    },
    /// The file's contents are not valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseError {
        /// Human-readable parse failure detail.
        reason: String,
    },
    /// The parsed config failed semantic validation.
    #[error("config validation failed: {reasons:?}")]
    ValidationError {
        /// Each individual validation failure.
        reasons: Vec<String>,
    },
}

/// Advisory-level issues that do not prevent startup (spec §0.3: "advisory").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// `max_json_bytes` is set unusually low, which may reject ordinary projects.
    SuspiciouslySmallJsonLimit {
        /// The configured value.
        bytes: usize,
    },
    /// `io.max_bytes` is set unusually low for bundle-sized I/O.
    SuspiciouslySmallIoLimit {
        /// The configured value.
        bytes: usize,
    },
    /// `outDir` was configured but does not exist yet (created lazily on first write).
    OutDirDoesNotExistYet {
        /// The configured directory.
        path: PathBuf,
    },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SuspiciouslySmallJsonLimit { bytes } => {
                write!(f, "max_json_bytes={bytes} is unusually small; large projects may be rejected")
            }
            Self::SuspiciouslySmallIoLimit { bytes } => {
                write!(f, "io.max_bytes={bytes} is unusually small; bundle writes may be rejected")
            }
            Self::OutDirDoesNotExistYet { path } => {
                write!(f, "outDir '{}' does not exist yet; it will be created on first write", path.display())
            }
        }
    }
}

/// Raw TOML shape, all fields optional so a partial (or empty) file is valid.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawConfig {
    max_json_bytes: Option<usize>,
    io: Option<RawIo>,
    out_dir: Option<PathBuf>,
    stdio_only: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawIo {
    max_bytes: Option<usize>,
}

/// Loaded, validated MotionForge configuration (spec §0.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MotionForgeConfig {
    /// Byte ceiling for `loadProjectJson` input (backs `MF_ERR_MAX_JSON_BYTES`).
    pub max_json_bytes: usize,
    /// Byte ceiling for `mf.io.*` reads/writes (backs `MF_ERR_IO_MAX_BYTES`).
    pub io_max_bytes: usize,
    /// Default output directory for `mf.pipeline.makeBundle` when the caller omits `outDir`.
    pub out_dir: Option<PathBuf>,
    /// If true, the server reports an explicit error rather than attempting any non-stdio transport.
    pub stdio_only: bool,
}

/// Default `max_json_bytes` (spec §4.1's byte-limit parameter, 5 MB).
pub const DEFAULT_MAX_JSON_BYTES: usize = 5_000_000;
/// Default `io.max_bytes` (bundle-sized I/O, 64 MB).
pub const DEFAULT_IO_MAX_BYTES: usize = 64_000_000;

impl Default for MotionForgeConfig {
    fn default() -> Self {
        Self {
            max_json_bytes: DEFAULT_MAX_JSON_BYTES,
            io_max_bytes: DEFAULT_IO_MAX_BYTES,
            out_dir: None,
            stdio_only: true,
        }
    }
}

impl MotionForgeConfig {
    /// Parse `toml_source`, applying defaults for any field the file omits.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ParseError`] if the source is not valid TOML for this
    /// shape; [`ConfigError::ValidationError`] if a present value is out of
    /// range (e.g. a zero byte limit).
    pub fn parse(toml_source: &str) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let raw: RawConfig = toml::from_str(toml_source).map_err(|e| ConfigError::ParseError { reason: e.to_string() })?;

        let mut reasons = Vec::new();
        if raw.max_json_bytes == Some(0) {
            reasons.push("max_json_bytes must be > 0".to_string());
        }
        if raw.io.as_ref().and_then(|io| io.max_bytes) == Some(0) {
            reasons.push("io.max_bytes must be > 0".to_string());
        }
        if !reasons.is_empty() {
            return Err(ConfigError::ValidationError { reasons });
        }

        let defaults = Self::default();
        let config = Self {
            max_json_bytes: raw.max_json_bytes.unwrap_or(defaults.max_json_bytes),
            io_max_bytes: raw.io.and_then(|io| io.max_bytes).unwrap_or(defaults.io_max_bytes),
            out_dir: raw.out_dir,
            stdio_only: raw.stdio_only.unwrap_or(defaults.stdio_only),
        };

        let mut warnings = Vec::new();
        if config.max_json_bytes < 1024 {
            warnings.push(ConfigWarning::SuspiciouslySmallJsonLimit { bytes: config.max_json_bytes });
        }
        if config.io_max_bytes < 1024 {
            warnings.push(ConfigWarning::SuspiciouslySmallIoLimit { bytes: config.io_max_bytes });
        }
        if let Some(dir) = &config.out_dir
            && !dir.exists()
        {
            warnings.push(ConfigWarning::OutDirDoesNotExistYet { path: dir.clone() });
        }

        Ok((config, warnings))
    }

    /// Load and parse `path`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::FileNotFound`] if `path` does not exist, plus
    /// everything [`Self::parse`] can return.
    pub fn load(path: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound { path: path.display().to_string() });
        }
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ParseError { reason: format!("failed to read {}: {e}", path.display()) })?;
        Self::parse(&source)
    }

    /// Load `motionforge.toml` from `dir` if present, else fall back to defaults with no warnings.
    ///
    /// # Errors
    ///
    /// Everything [`Self::load`] can return, except a missing file (that
    /// case falls back to defaults silently).
    pub fn load_optional(dir: &Path) -> Result<(Self, Vec<ConfigWarning>), ConfigError> {
        let candidate = dir.join("motionforge.toml");
        if candidate.exists() {
            Self::load(&candidate)
        } else {
            Ok((Self::default(), Vec::new()))
        }
    }
}
