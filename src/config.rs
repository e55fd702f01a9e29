//! Converter configuration.
//!
//! Handles loading, validating, and merging `image-converter.toml`. Values
//! are layered: stock defaults, then the config file, then command-line
//! flags. Each layer only needs the keys it wants to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [conversion]
//! # target = "webp"        # Default target when --to is not given
//! compression = "none"      # none | low | medium | high
//! delete_original = false   # Replace / remove the source on success
//! strip_metadata = true     # Re-encode same-format files even without compression
//! overwrite = false         # Replace existing output files
//!
//! [optimizer]
//! enabled = true            # Use pngquant / cwebp when installed
//! pngquant = "pngquant"     # Program name or path
//! cwebp = "cwebp"           # Program name or path
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::types::{CompressionLevel, TargetFormat};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "image-converter.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full configuration.
///
/// All fields have defaults; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConverterConfig {
    pub conversion: ConversionConfig,
    pub optimizer: OptimizerConfig,
    pub processing: ProcessingConfig,
}

impl ConverterConfig {
    /// Validate values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.optimizer.pngquant.trim().is_empty() {
            return Err(ConfigError::Validation(
                "optimizer.pngquant must not be empty".into(),
            ));
        }
        if self.optimizer.cwebp.trim().is_empty() {
            return Err(ConfigError::Validation(
                "optimizer.cwebp must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Defaults applied to every request in a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// Target used when none is given on the command line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetFormat>,
    pub compression: CompressionLevel,
    pub delete_original: bool,
    /// When false, same-format requests without compression are skipped
    /// instead of re-encoded.
    pub strip_metadata: bool,
    pub overwrite: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            target: None,
            compression: CompressionLevel::None,
            delete_original: false,
            strip_metadata: true,
            overwrite: false,
        }
    }
}

/// External optimizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    pub enabled: bool,
    pub pngquant: String,
    pub cwebp: String,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            pngquant: "pngquant".to_string(),
            cwebp: "cwebp".to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Stock defaults as a TOML value, the bottom layer of every merge.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(ConverterConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge overlays onto a base value in order, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let merged = overlays.into_iter().fold(base, merge_toml);
    let config: ConverterConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`, falling back to defaults when it is missing.
pub fn load_config(path: &Path) -> Result<ConverterConfig, ConfigError> {
    load_config_with(path, None)
}

/// Like [`load_config`], with one more layer (command-line flags) on top.
pub fn load_config_with(
    path: &Path,
    overrides: Option<toml::Value>,
) -> Result<ConverterConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let file = load_raw_config(path)?;
    resolve_config(base, file.into_iter().chain(overrides))
}

/// Returns a fully-commented stock config with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Image Converter Configuration
# =============================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Command-line flags override these values.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Conversion defaults
# ---------------------------------------------------------------------------
[conversion]
# Target format used when --to is not given: "jpeg", "png" or "webp".
# target = "webp"

# Compression level: "none", "low", "medium" or "high".
#   jpeg/webp: quality 90 / 70 / 50
#   png:       compress-level 1 / 6 / 9 (and pngquant quality ranges)
compression = "none"

# Same format: replace the source in place.
# Other format: write <name>.<target> and remove the source.
delete_original = false

# Re-encode same-format files without compression to drop their metadata.
# When false, such files are skipped.
strip_metadata = true

# Replace files that already exist at the output path.
overwrite = false

# ---------------------------------------------------------------------------
# External optimizers
# ---------------------------------------------------------------------------
[optimizer]
# Run pngquant (PNG) and cwebp (lossy WebP) after encoding, when installed.
# Their output is kept only when it is smaller.
# Missing tools are skipped silently.
enabled = true
pngquant = "pngquant"
cwebp = "cwebp"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers. Omit for auto (number of CPU cores).
# Values larger than the core count are clamped down.
# max_processes = 4
"##
}
