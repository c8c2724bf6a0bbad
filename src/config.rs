//! Collage configuration module.
//!
//! Handles loading, validating, and merging `collage.toml`. Stock defaults
//! are overridden by whatever the user file sets; everything else keeps its
//! default.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [collage]
//! layout = "grid-2x2"       # Layout id (see `photo-collage layouts`)
//! aspect_ratio = "4:5"      # Aspect ratio id
//! gutter = 16.0             # Space between cells, in export pixels
//! corner_radius = 24.0      # Cell corner radius before gutter adjustment
//! background = "#ffffff"    # Canvas color, #rgb or #rrggbb
//!
//! [export]
//! width = 2048              # Exported JPEG width in pixels
//! quality = 92              # JPEG quality (1-100)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [collage]
//! layout = "mosaic"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::export::{EXPORT_WIDTH, ExportConfig};
use crate::imaging::Quality;
use crate::layout::{
    DEFAULT_ASPECT_RATIO_ID, DEFAULT_LAYOUT_ID, find_aspect_ratio, find_layout,
};
use crate::types::{CollageSettings, Rgb};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up in a directory.
pub const CONFIG_FILE_NAME: &str = "collage.toml";

/// Accepted export widths.
pub const EXPORT_WIDTH_RANGE: RangeInclusive<u32> = 64..=8192;

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

/// Collage configuration loaded from `collage.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollageConfig {
    /// Starting collage settings.
    pub collage: CollageSection,
    /// JPEG export settings.
    pub export: ExportSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollageSection {
    pub layout: String,
    pub aspect_ratio: String,
    pub gutter: f64,
    pub corner_radius: f64,
    pub background: String,
}

impl Default for CollageSection {
    fn default() -> Self {
        let settings = CollageSettings::default();
        Self {
            layout: DEFAULT_LAYOUT_ID.to_string(),
            aspect_ratio: DEFAULT_ASPECT_RATIO_ID.to_string(),
            gutter: settings.gutter,
            corner_radius: settings.corner_radius,
            background: settings.background_color.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportSection {
    pub width: u32,
    pub quality: u32,
}

impl Default for ExportSection {
    fn default() -> Self {
        Self {
            width: EXPORT_WIDTH,
            quality: Quality::default().value(),
        }
    }
}

fn validation(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}

impl CollageConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let c = &self.collage;
        if find_layout(&c.layout).is_none() {
            return Err(validation(format!("collage.layout: unknown layout '{}'", c.layout)));
        }
        if find_aspect_ratio(&c.aspect_ratio).is_none() {
            return Err(validation(format!(
                "collage.aspect_ratio: unknown aspect ratio '{}'",
                c.aspect_ratio
            )));
        }
        if !c.gutter.is_finite() || c.gutter < 0.0 {
            return Err(validation("collage.gutter must be a non-negative number"));
        }
        if !c.corner_radius.is_finite() || c.corner_radius < 0.0 {
            return Err(validation("collage.corner_radius must be a non-negative number"));
        }
        if let Err(e) = c.background.parse::<Rgb>() {
            return Err(validation(format!("collage.background: {e}")));
        }
        if !EXPORT_WIDTH_RANGE.contains(&self.export.width) {
            return Err(validation(format!(
                "export.width must be {}-{}",
                EXPORT_WIDTH_RANGE.start(),
                EXPORT_WIDTH_RANGE.end()
            )));
        }
        if !(1..=100).contains(&self.export.quality) {
            return Err(validation("export.quality must be 1-100"));
        }
        Ok(())
    }

    /// Starting settings record described by the `[collage]` section.
    pub fn settings(&self) -> Result<CollageSettings, ConfigError> {
        let c = &self.collage;
        let background_color = c
            .background
            .parse::<Rgb>()
            .map_err(|e| validation(format!("collage.background: {e}")))?;
        Ok(CollageSettings {
            layout_id: c.layout.clone(),
            aspect_ratio_id: c.aspect_ratio.clone(),
            gutter: c.gutter,
            corner_radius: c.corner_radius,
            background_color,
        })
    }

    pub fn export_config(&self) -> ExportConfig {
        ExportConfig {
            width: self.export.width,
            quality: Quality::new(self.export.quality),
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(CollageConfig::default())?)
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

/// Load `collage.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the directory has no `collage.toml`.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILE_NAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<CollageConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: CollageConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `collage.toml` in the given directory, on top of the
/// stock defaults.
pub fn load_config(dir: &Path) -> Result<CollageConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `collage.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Photo Collage Configuration
# ===========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# The file is read from the working directory (or --config-dir).
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Collage
# ---------------------------------------------------------------------------
[collage]
# Layout id. Run `photo-collage layouts` for the full list.
layout = "grid-2x2"

# Aspect ratio id: 1:1, 4:5, 3:4, 2:3, 9:16, 16:9, 4:3 or 3:2.
aspect_ratio = "4:5"

# Space between cells and around the edge, in canvas pixels.
gutter = 16.0

# Corner radius of each cell. Half the gutter is taken off before drawing,
# so corners stay visually consistent as the gutter grows.
corner_radius = 24.0

# Canvas color shown in the gutter and in empty cells (#rgb or #rrggbb).
background = "#ffffff"

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Width of the exported JPEG in pixels (64-8192). Height follows the
# aspect ratio.
width = 2048

# JPEG quality (1 = worst, 100 = best).
quality = 92
"##
}
