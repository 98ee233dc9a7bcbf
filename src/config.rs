//! Rendition configuration module.
//!
//! Handles loading, validating, and merging `renditions.toml`. User values are
//! layered over stock defaults, so a config file only needs the keys it wants
//! to change.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! ppoi = "0.5x0.5"          # Point of interest used when none is given
//! force = false             # Re-render targets that already exist
//!
//! # Processors applied before every format's own list
//! always = ["autorotate", "preprocess_jpeg", "preprocess_gif", "preserve_icc_profile"]
//!
//! [formats]
//! thumb = [["thumbnail", [300, 300]]]
//! square = [["crop", [200, 200]]]
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Each processor entry is either a bare name or an array of the name
//! followed by its arguments. Unknown keys are rejected, and
//! [`RenditionsConfig::validate_processors`] checks every name against a
//! registry before anything is rendered.

use crate::field::ImageField;
use crate::pipeline::{ProcessorRegistry, ProcessorSpec, default_always};
use crate::types::Ppoi;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// File name looked up by [`load_config`].
pub const CONFIG_FILE: &str = "renditions.toml";

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

/// Rendition configuration loaded from `renditions.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenditionsConfig {
    /// Default point of interest.
    pub ppoi: Ppoi,
    /// Re-render existing targets.
    pub force: bool,
    /// Fixed processor prefix.
    pub always: Vec<ProcessorSpec>,
    /// Format name → processor list.
    pub formats: BTreeMap<String, Vec<ProcessorSpec>>,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for RenditionsConfig {
    fn default() -> Self {
        Self {
            ppoi: Ppoi::default(),
            force: false,
            always: default_always(),
            formats: BTreeMap::new(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl RenditionsConfig {
    /// Validate values that serde cannot check on its own.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        for (name, specs) in &self.formats {
            let bad_char = |c: char| c.is_whitespace() || c == '/' || c == '\\' || c == '.';
            if name.is_empty() || name.chars().any(bad_char) {
                return Err(ConfigError::Validation(format!(
                    "format name '{name}' must be non-empty without whitespace, '.', '/' or '\\'"
                )));
            }
            if specs.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "formats.{name} must list at least one processor"
                )));
            }
        }
        Ok(())
    }

    /// Check that every processor named in `always` and `formats` is registered.
    pub fn validate_processors(&self, registry: &ProcessorRegistry) -> Result<(), ConfigError> {
        let named = self
            .always
            .iter()
            .map(|spec| ("always", spec))
            .chain(
                self.formats
                    .iter()
                    .flat_map(|(format, specs)| specs.iter().map(move |s| (format.as_str(), s))),
            );
        for (owner, spec) in named {
            if !registry.contains(spec.name()) {
                return Err(ConfigError::Validation(format!(
                    "{owner}: unknown processor '{}' (available: {})",
                    spec.name(),
                    registry.names().join(", ")
                )));
            }
        }
        Ok(())
    }

    /// The configured formats as an [`ImageField`].
    pub fn field(&self) -> ImageField {
        ImageField::from_formats(self.formats.clone())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
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

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(RenditionsConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay, arrays included, replace base values entirely.
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

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<RenditionsConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: RenditionsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from [`CONFIG_FILE`] in the given directory.
///
/// A missing file yields the stock defaults.
pub fn load_config(root: &Path) -> Result<RenditionsConfig, ConfigError> {
    resolve_config(load_raw_config(&root.join(CONFIG_FILE))?)
}

/// Load config from an explicit file path. Unlike [`load_config`], a missing
/// file is an error.
pub fn load_config_file(path: &Path) -> Result<RenditionsConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    resolve_config(Some(toml::from_str(&content)?))
}

/// Returns a fully-commented stock `renditions.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Renditions Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.

# Point of interest as "<x>x<y>", fractions of width and height.
# Crops keep this spot as close to their center as the image allows.
ppoi = "0.5x0.5"

# Re-render targets that already exist.
force = false

# Processors run before every format's own list, in this order.
# Set to [] to disable.
always = ["autorotate", "preprocess_jpeg", "preprocess_gif", "preserve_icc_profile"]

# ---------------------------------------------------------------------------
# Formats
# ---------------------------------------------------------------------------
# Each key is a format name; its value is the ordered processor list.
# A processor is a bare name or ["name", arg, ...].
#
#   thumbnail [w, h]  shrink to fit inside w x h, keeping the aspect ratio
#   crop [w, h]       crop around the point of interest, then resize to w x h
[formats]
# thumb = [["thumbnail", [300, 300]]]
# square = [["crop", [200, 200]]]

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
