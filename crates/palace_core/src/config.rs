//! Editor configuration.
//!
//! # Responsibility
//! - Hold grid, canvas and element sizing parameters for the editor.
//! - Parse JSON configuration documents with full defaulting.
//!
//! # Invariants
//! - `grid_size`, `element_size` and canvas dimensions are strictly positive.
//! - Room footprints are expressed in whole grid units and are positive.

use crate::model::element::VariantId;
use crate::spatial::geometry::{Rect, Size};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const DEFAULT_GRID_SIZE: f64 = 100.0;
const DEFAULT_CANVAS_WIDTH: f64 = 2000.0;
const DEFAULT_CANVAS_HEIGHT: f64 = 1200.0;
const DEFAULT_ELEMENT_SIZE: f64 = 32.0;

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// Document is not valid JSON or has wrong field types.
    Parse(serde_json::Error),
    /// Field value violates a positivity constraint.
    InvalidValue { field: String, value: f64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid palace config: {err}"),
            Self::InvalidValue { field, value } => {
                write!(f, "palace config field `{field}` must be positive, got {value}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::InvalidValue { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Drawable canvas extent, origin at (0, 0).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasBounds {
    pub width: f64,
    pub height: f64,
}

impl Default for CanvasBounds {
    fn default() -> Self {
        Self {
            width: DEFAULT_CANVAS_WIDTH,
            height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

impl CanvasBounds {
    pub fn rect(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Room footprint in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomFootprint {
    pub width_units: u32,
    pub height_units: u32,
}

/// Editor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PalaceConfig {
    /// Room snapping unit in canvas pixels.
    pub grid_size: f64,
    pub canvas: CanvasBounds,
    /// Side length of objects and anchors.
    pub element_size: f64,
    /// Footprint per room variant; unknown variants are one grid unit square.
    pub room_variants: BTreeMap<VariantId, RoomFootprint>,
}

impl Default for PalaceConfig {
    fn default() -> Self {
        Self {
            grid_size: DEFAULT_GRID_SIZE,
            canvas: CanvasBounds::default(),
            element_size: DEFAULT_ELEMENT_SIZE,
            room_variants: BTreeMap::new(),
        }
    }
}

impl PalaceConfig {
    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields fall back to defaults.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks positivity constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("grid_size", self.grid_size)?;
        require_positive("element_size", self.element_size)?;
        require_positive("canvas.width", self.canvas.width)?;
        require_positive("canvas.height", self.canvas.height)?;
        for (variant, footprint) in &self.room_variants {
            require_positive(
                &format!("room_variants.{variant}.width_units"),
                f64::from(footprint.width_units),
            )?;
            require_positive(
                &format!("room_variants.{variant}.height_units"),
                f64::from(footprint.height_units),
            )?;
        }
        Ok(())
    }

    /// Registers a room variant footprint.
    pub fn with_room_variant(mut self, variant: VariantId, width_units: u32, height_units: u32) -> Self {
        self.room_variants.insert(
            variant,
            RoomFootprint {
                width_units,
                height_units,
            },
        );
        self
    }

    /// Returns the pixel size of a room variant.
    pub fn room_size(&self, variant: VariantId) -> Size {
        let footprint = self.room_variants.get(&variant).copied().unwrap_or(RoomFootprint {
            width_units: 1,
            height_units: 1,
        });
        Size::new(
            f64::from(footprint.width_units) * self.grid_size,
            f64::from(footprint.height_units) * self.grid_size,
        )
    }

    /// Returns the pixel size used for objects and anchors.
    pub fn element_size(&self) -> Size {
        Size::square(self.element_size)
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value.is_finite() {
        return Ok(());
    }
    Err(ConfigError::InvalidValue {
        field: field.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, PalaceConfig};
    use crate::spatial::geometry::Size;

    #[test]
    fn empty_document_uses_defaults() {
        let config = PalaceConfig::from_json_str("{}").unwrap();
        assert_eq!(config, PalaceConfig::default());
        assert_eq!(config.grid_size, 100.0);
    }

    #[test]
    fn room_variants_drive_room_size() {
        let config = PalaceConfig::from_json_str(
            r#"{"grid_size": 50, "room_variants": {"2": {"width_units": 3, "height_units": 2}}}"#,
        )
        .unwrap();
        assert_eq!(config.room_size(2), Size::new(150.0, 100.0));
        assert_eq!(config.room_size(9), Size::new(50.0, 50.0));
    }

    #[test]
    fn non_positive_grid_is_rejected() {
        let err = PalaceConfig::from_json_str(r#"{"grid_size": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "grid_size"));
    }

    #[test]
    fn malformed_document_is_parse_error() {
        let err = PalaceConfig::from_json_str("{grid_size").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
