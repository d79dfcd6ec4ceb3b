//! Tunable constants for detection, sizing and widget appearance
//!
//! Every field has a default, so a TOML file only needs the keys it overrides:
//!
//! ```
//! use markform_core::config::FormConfig;
//!
//! let config = FormConfig::from_toml_str(
//!     r#"
//!     char_width_estimate = 7.0
//!     region_order = "reverse_discovery"
//!
//!     [page_size]
//!     width = 612.0
//!     height = 792.0
//!     "#,
//! )
//! .unwrap();
//! assert_eq!(config.char_width_estimate, 7.0);
//! assert_eq!(config.padding_x, 2.0);
//! ```

use crate::error::FormError;
use crate::model::{ColorClass, ColorRange, PageSize};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Widget fill color.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FillColor {
    Transparent,
    /// RGB components in the 0-1 range
    Rgb([f32; 3]),
}

impl FillColor {
    pub const WHITE: FillColor = FillColor::Rgb([1.0, 1.0, 1.0]);

    pub fn is_opaque(&self) -> bool {
        matches!(self, FillColor::Rgb(_))
    }
}

/// How regions of one class are ordered on a page before numbering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegionOrder {
    /// Order in which the contour tracer discovered the regions
    Discovery,
    /// Reverse of the discovery order.
    ///
    /// The tracer scans rows top to bottom, so this numbers fields bottom to
    /// top. It does not reproduce the top-down order of tracers that report
    /// contours from the bottom of the image first.
    ReverseDiscovery,
    /// Sorted by top edge, then left edge
    #[default]
    ReadingOrder,
}

impl FromStr for RegionOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "discovery" => Ok(RegionOrder::Discovery),
            "reverse_discovery" | "reverse" => Ok(RegionOrder::ReverseDiscovery),
            "reading_order" | "reading" => Ok(RegionOrder::ReadingOrder),
            other => Err(format!(
                "unknown region order '{}' (expected discovery, reverse-discovery or reading-order)",
                other
            )),
        }
    }
}

/// Main configuration structure, loadable from TOML
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FormConfig {
    /// Output page size in points (default: A4)
    pub page_size: PageSize,
    /// Inward left padding of text fields, in points (default: 2.0)
    pub padding_x: f64,
    /// Inward top padding of text fields, in points (default: 0.0)
    pub padding_y: f64,
    /// Average glyph width used to derive a text field's max length (default: 6.0)
    pub char_width_estimate: f64,
    /// Text field font size (default: 11.0)
    pub font_size: f64,
    /// Pixel range of text markers (default: pure-ish red)
    pub text_marker_range: ColorRange,
    /// Pixel range of checkbox markers (default: pure-ish green)
    pub checkbox_marker_range: ColorRange,
    /// Text field background (default: transparent)
    pub text_fill: FillColor,
    /// Checkbox background. Must be opaque: viewers fail to render the
    /// check state of a checkbox with a transparent background.
    pub checkbox_fill: FillColor,
    pub region_order: RegionOrder,
    /// Turn degenerate-geometry warnings into errors
    pub strict_geometry: bool,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            padding_x: 2.0,
            padding_y: 0.0,
            char_width_estimate: 6.0,
            font_size: 11.0,
            text_marker_range: ColorRange::new([200, 0, 0], [255, 0, 0]),
            checkbox_marker_range: ColorRange::new([0, 200, 0], [0, 255, 0]),
            text_fill: FillColor::Transparent,
            checkbox_fill: FillColor::WHITE,
            region_order: RegionOrder::default(),
            strict_geometry: false,
        }
    }
}

impl FormConfig {
    /// Load and validate configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, FormError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            FormError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml_str(s: &str) -> Result<Self, FormError> {
        let config: FormConfig = toml::from_str(s)
            .map_err(|e| FormError::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, FormError> {
        toml::to_string_pretty(self).map_err(|e| FormError::SerializationError(e.to_string()))
    }

    pub fn range_for(&self, class: ColorClass) -> ColorRange {
        match class {
            ColorClass::TextMarker => self.text_marker_range,
            ColorClass::CheckboxMarker => self.checkbox_marker_range,
        }
    }

    pub fn validate(&self) -> Result<(), FormError> {
        if !(self.page_size.width > 0.0 && self.page_size.height > 0.0) {
            return Err(FormError::Config(format!(
                "page size must be positive, got {}x{}",
                self.page_size.width, self.page_size.height
            )));
        }
        if !(self.char_width_estimate > 0.0) {
            return Err(FormError::Config(
                "char_width_estimate must be positive".into(),
            ));
        }
        if !(self.font_size > 0.0) {
            return Err(FormError::Config("font_size must be positive".into()));
        }
        if self.padding_x < 0.0 || self.padding_y < 0.0 {
            return Err(FormError::Config("padding must not be negative".into()));
        }
        for class in ColorClass::ALL {
            if !self.range_for(class).is_well_formed() {
                return Err(FormError::Config(format!(
                    "{} range has a lower bound above its upper bound",
                    class
                )));
            }
        }
        if !self
            .text_marker_range
            .is_disjoint(&self.checkbox_marker_range)
        {
            return Err(FormError::Config(
                "text and checkbox marker ranges overlap".into(),
            ));
        }
        if !self.checkbox_fill.is_opaque() {
            return Err(FormError::Config(
                "checkbox_fill must be an opaque color".into(),
            ));
        }
        Ok(())
    }
}
