//! Shared types passed between the session, the engine and the CLI.
//!
//! [`CollageSettings`] doubles as the persisted settings record: the settings
//! collaborator stores it as camelCase JSON, and [`CollageSettings::from_json`]
//! reads it back leniently so a stale or hand-edited record never blocks a
//! session from starting.

use crate::layout::{self, DEFAULT_ASPECT_RATIO_ID, DEFAULT_LAYOUT_ID};
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use thiserror::Error;

/// Stable identifier of an image for its whole lifetime in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageId(pub u64);

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Decoded RGBA bitmap shared between an image record and the source cache.
pub type Bitmap = Arc<RgbaImage>;

/// Where an image's pixels come from.
///
/// `bytes` is the original file content; `preview_path` is a secondary
/// location the same picture can be decoded from when the bytes cannot.
#[derive(Debug, Clone, Default)]
pub struct ImageSource {
    /// Display label (usually the file name).
    pub label: String,
    pub bytes: Option<Arc<[u8]>>,
    pub preview_path: Option<PathBuf>,
    /// Natural size if already known by the acquisition side.
    pub natural_size: Option<(u32, u32)>,
    /// Bitmap decoded by the acquisition side, if any.
    pub bitmap: Option<Bitmap>,
}

impl ImageSource {
    pub fn from_bytes(label: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            label: label.into(),
            bytes: Some(bytes.into()),
            ..Self::default()
        }
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            label: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            preview_path: Some(path),
            ..Self::default()
        }
    }

    /// Attach an already-decoded bitmap; its size becomes the natural size.
    pub fn with_bitmap(mut self, bitmap: Bitmap) -> Self {
        self.natural_size = Some(bitmap.dimensions());
        self.bitmap = Some(bitmap);
        self
    }
}

/// An image in the active collage set.
#[derive(Debug, Clone)]
pub struct CollageImage {
    pub id: ImageId,
    pub source: ImageSource,
    /// `None` until the natural size is known; such images are not drawn.
    pub natural_size: Option<(u32, u32)>,
    focus_x: f64,
    focus_y: f64,
}

impl CollageImage {
    pub fn new(id: ImageId, source: ImageSource) -> Self {
        let natural_size = source.natural_size;
        Self {
            id,
            source,
            natural_size,
            focus_x: 0.5,
            focus_y: 0.5,
        }
    }

    pub fn focus(&self) -> (f64, f64) {
        (self.focus_x, self.focus_y)
    }

    /// Store a new focal point, clamped to `[0, 1]` on both axes.
    ///
    /// NaN maps to the center.
    pub fn set_focus(&mut self, x: f64, y: f64) {
        self.focus_x = clamp_unit(x);
        self.focus_y = clamp_unit(y);
    }

    /// Bitmap supplied by the acquisition side, if any.
    pub fn external_bitmap(&self) -> Option<&Bitmap> {
        self.source.bitmap.as_ref()
    }
}

/// Clamp to `[0, 1]`, mapping NaN to `0.5`.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.5
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("invalid color {0:?}: expected #rgb or #rrggbb")]
pub struct ColorParseError(String);

/// Opaque RGB background color, written as `#rrggbb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);
}

impl FromStr for Rgb {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim().strip_prefix('#').ok_or_else(err)?;
        if !hex.is_ascii() {
            return Err(err());
        }
        let channel = |h: &str| u8::from_str_radix(h, 16).map_err(|_| err());
        match hex.len() {
            3 => {
                let expand = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Rgb(expand(0)?, expand(1)?, expand(2)?))
            }
            6 => Ok(Rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl Serialize for Rgb {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Styling and geometry choices for one collage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollageSettings {
    pub layout_id: String,
    pub aspect_ratio_id: String,
    /// Spacing between adjacent cells, in output pixels.
    pub gutter: f64,
    /// Visual corner radius, in output pixels.
    pub corner_radius: f64,
    pub background_color: Rgb,
}

impl Default for CollageSettings {
    fn default() -> Self {
        Self {
            layout_id: DEFAULT_LAYOUT_ID.to_string(),
            aspect_ratio_id: DEFAULT_ASPECT_RATIO_ID.to_string(),
            gutter: 16.0,
            corner_radius: 24.0,
            background_color: Rgb::WHITE,
        }
    }
}

impl CollageSettings {
    /// Replace-merge: every field present in `patch` overwrites ours.
    ///
    /// Unknown layout/aspect ids and negative or non-finite lengths are
    /// ignored so the record always stays renderable.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        let mut next = self.clone();
        if let Some(id) = &patch.layout_id
            && layout::find_layout(id).is_some()
        {
            next.layout_id = id.clone();
        }
        if let Some(id) = &patch.aspect_ratio_id
            && layout::find_aspect_ratio(id).is_some()
        {
            next.aspect_ratio_id = id.clone();
        }
        if let Some(g) = patch.gutter.filter(|v| v.is_finite() && *v >= 0.0) {
            next.gutter = g;
        }
        if let Some(r) = patch.corner_radius.filter(|v| v.is_finite() && *v >= 0.0) {
            next.corner_radius = r;
        }
        if let Some(c) = patch.background_color {
            next.background_color = c;
        }
        next
    }

    /// Read a persisted settings record, falling back to defaults per field.
    pub fn from_json(json: &str) -> Self {
        let patch = match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => SettingsPatch::from_json_value(&value),
            Err(_) => SettingsPatch::default(),
        };
        Self::default().merged(&patch)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Partial settings update; `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch {
    pub layout_id: Option<String>,
    pub aspect_ratio_id: Option<String>,
    pub gutter: Option<f64>,
    pub corner_radius: Option<f64>,
    pub background_color: Option<Rgb>,
}

impl From<CollageSettings> for SettingsPatch {
    /// A patch that replaces every field.
    fn from(settings: CollageSettings) -> Self {
        Self {
            layout_id: Some(settings.layout_id),
            aspect_ratio_id: Some(settings.aspect_ratio_id),
            gutter: Some(settings.gutter),
            corner_radius: Some(settings.corner_radius),
            background_color: Some(settings.background_color),
        }
    }
}

impl SettingsPatch {
    /// Pick whichever persisted keys have the right shape, dropping the rest.
    fn from_json_value(value: &serde_json::Value) -> Self {
        let str_field = |key: &str| value.get(key).and_then(|v| v.as_str()).map(String::from);
        let num_field = |key: &str| value.get(key).and_then(|v| v.as_f64());
        Self {
            layout_id: str_field("layoutId"),
            aspect_ratio_id: str_field("aspectRatioId"),
            gutter: num_field("gutter"),
            corner_radius: num_field("cornerRadius"),
            background_color: str_field("backgroundColor").and_then(|s| s.parse().ok()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_parses_long_and_short_hex() {
        assert_eq!("#ff8000".parse::<Rgb>().unwrap(), Rgb(255, 128, 0));
        assert_eq!("#fff".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!("#0a0".parse::<Rgb>().unwrap(), Rgb(0, 170, 0));
    }

    #[test]
    fn rgb_rejects_garbage() {
        assert!("ffffff".parse::<Rgb>().is_err());
        assert!("#ffff".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert!("#ééé".parse::<Rgb>().is_err());
    }

    #[test]
    fn rgb_display_is_lowercase_hex() {
        assert_eq!(Rgb(10, 255, 0).to_string(), "#0aff00");
    }

    #[test]
    fn focus_defaults_to_center() {
        let img = CollageImage::new(ImageId(1), ImageSource::default());
        assert_eq!(img.focus(), (0.5, 0.5));
    }

    #[test]
    fn focus_is_clamped() {
        let mut img = CollageImage::new(ImageId(1), ImageSource::default());
        img.set_focus(-3.0, 7.5);
        assert_eq!(img.focus(), (0.0, 1.0));
        img.set_focus(f64::NAN, f64::INFINITY);
        assert_eq!(img.focus(), (0.5, 1.0));
        img.set_focus(0.25, 0.75);
        assert_eq!(img.focus(), (0.25, 0.75));
    }

    #[test]
    fn merge_overwrites_present_fields_only() {
        let base = CollageSettings::default();
        let next = base.merged(&SettingsPatch {
            gutter: Some(0.0),
            layout_id: Some("mosaic".into()),
            ..SettingsPatch::default()
        });
        assert_eq!(next.gutter, 0.0);
        assert_eq!(next.layout_id, "mosaic");
        assert_eq!(next.corner_radius, base.corner_radius);
        assert_eq!(next.aspect_ratio_id, base.aspect_ratio_id);
    }

    #[test]
    fn merge_ignores_invalid_values() {
        let base = CollageSettings::default();
        let next = base.merged(&SettingsPatch {
            layout_id: Some("does-not-exist".into()),
            aspect_ratio_id: Some("7:0".into()),
            gutter: Some(-4.0),
            corner_radius: Some(f64::NAN),
            background_color: None,
        });
        assert_eq!(next, base);
    }

    #[test]
    fn settings_json_uses_camel_case() {
        let json = CollageSettings::default().to_json().unwrap();
        assert!(json.contains("\"layoutId\""));
        assert!(json.contains("\"cornerRadius\""));
        assert!(json.contains("\"#ffffff\""));
    }

    #[test]
    fn from_json_round_trips_a_saved_record() {
        let mut settings = CollageSettings::default();
        settings.layout_id = "triptych".into();
        settings.background_color = Rgb(1, 2, 3);
        let restored = CollageSettings::from_json(&settings.to_json().unwrap());
        assert_eq!(restored, settings);
    }

    #[test]
    fn from_json_falls_back_per_field() {
        let restored = CollageSettings::from_json(
            r##"{"layoutId": 42, "gutter": 4, "backgroundColor": "red", "aspectRatioId": "16:9"}"##,
        );
        assert_eq!(restored.layout_id, DEFAULT_LAYOUT_ID);
        assert_eq!(restored.gutter, 4.0);
        assert_eq!(restored.background_color, Rgb::WHITE);
        assert_eq!(restored.aspect_ratio_id, "16:9");
    }

    #[test]
    fn from_json_tolerates_corrupt_input() {
        assert_eq!(
            CollageSettings::from_json("not json"),
            CollageSettings::default()
        );
    }
}
