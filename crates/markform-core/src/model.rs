//! Core data types shared by every pipeline stage.

use image::{Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Page dimensions in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PageSize {
    pub width: f64,
    pub height: f64,
}

impl PageSize {
    /// ISO A4, 210 x 297 mm.
    pub const A4: PageSize = PageSize {
        width: 595.275_590_551_181_1,
        height: 841.889_763_779_527_6,
    };

    /// US Letter, 8.5 x 11 in.
    pub const LETTER: PageSize = PageSize {
        width: 612.0,
        height: 792.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// The two marker classes a page can carry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ColorClass {
    /// Red markers, rendered as text fields
    TextMarker,
    /// Green markers, rendered as checkboxes
    CheckboxMarker,
}

impl ColorClass {
    /// Detection and numbering order within a page.
    pub const ALL: [ColorClass; 2] = [ColorClass::TextMarker, ColorClass::CheckboxMarker];

    /// Canonical color used when drawing detections back onto an image.
    pub fn overlay_color(self) -> Rgb<u8> {
        match self {
            ColorClass::TextMarker => Rgb([255, 0, 0]),
            ColorClass::CheckboxMarker => Rgb([0, 255, 0]),
        }
    }
}

impl fmt::Display for ColorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorClass::TextMarker => write!(f, "text marker"),
            ColorClass::CheckboxMarker => write!(f, "checkbox marker"),
        }
    }
}

/// Inclusive per-channel pixel range, channels in RGB order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl ColorRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, pixel: &Rgb<u8>) -> bool {
        (0..3).all(|c| self.lower[c] <= pixel.0[c] && pixel.0[c] <= self.upper[c])
    }

    /// True when no pixel value can fall inside both ranges.
    pub fn is_disjoint(&self, other: &ColorRange) -> bool {
        (0..3).any(|c| self.upper[c] < other.lower[c] || other.upper[c] < self.lower[c])
    }

    pub fn is_well_formed(&self) -> bool {
        (0..3).all(|c| self.lower[c] <= self.upper[c])
    }
}

/// One rendered page of the source form.
#[derive(Debug, Clone)]
pub struct Page {
    pub index: usize,
    pub raster: RgbImage,
    pub target: PageSize,
}

impl Page {
    pub fn new(index: usize, raster: RgbImage, target: PageSize) -> Self {
        Self {
            index,
            raster,
            target,
        }
    }

    pub fn raster_width(&self) -> u32 {
        self.raster.width()
    }

    pub fn raster_height(&self) -> u32 {
        self.raster.height()
    }
}

/// Axis-aligned bounds of a region in raster pixels (inclusive corner pixels).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub max_x: u32,
    pub min_y: u32,
    pub max_y: u32,
}

impl BoundingBox {
    pub fn from_points(points: &[(u32, u32)]) -> Option<Self> {
        let (&(x0, y0), rest) = points.split_first()?;
        let mut bounds = BoundingBox {
            min_x: x0,
            max_x: x0,
            min_y: y0,
            max_y: y0,
        };
        for &(x, y) in rest {
            bounds.min_x = bounds.min_x.min(x);
            bounds.max_x = bounds.max_x.max(x);
            bounds.min_y = bounds.min_y.min(y);
            bounds.max_y = bounds.max_y.max(y);
        }
        Some(bounds)
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y
    }
}

/// The raster-space extent of one detected marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub class: ColorClass,
    /// Boundary pixels in the order the contour tracer visited them
    pub points: Vec<(u32, u32)>,
    pub bounds: BoundingBox,
}

impl Region {
    /// Returns `None` for an empty boundary.
    pub fn from_points(class: ColorClass, points: Vec<(u32, u32)>) -> Option<Self> {
        let bounds = BoundingBox::from_points(&points)?;
        Some(Self {
            class,
            points,
            bounds,
        })
    }
}

/// Geometry in PDF point space, y measured from the page bottom.
///
/// `height` is signed: text fields are anchored at their top edge and carry a
/// negative height, checkboxes are anchored at their bottom edge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MappedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl MappedRect {
    /// `[llx, lly, urx, ury]` regardless of sign conventions.
    pub fn normalized(&self) -> [f64; 4] {
        let (x0, x1) = (self.x, self.x + self.width);
        let (y0, y1) = (self.y, self.y + self.height);
        [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
    }

    pub fn area(&self) -> f64 {
        (self.width * self.height).abs()
    }
}

/// Field id, 1-based and unique across a document.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(transparent)]
pub struct FieldId(pub u32);

impl FieldId {
    pub const FIRST: FieldId = FieldId(1);

    pub fn next(self) -> FieldId {
        FieldId(self.0 + 1)
    }

    /// Field name and tooltip used in the generated form.
    pub fn name(self) -> String {
        self.0.to_string()
    }
}

impl Default for FieldId {
    fn default() -> Self {
        FieldId::FIRST
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Widget kind with its kind-specific sizing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    TextField { max_len: u32, font_size: f64 },
    Checkbox { size: f64 },
}

impl FieldKind {
    pub fn is_text(&self) -> bool {
        matches!(self, FieldKind::TextField { .. })
    }

    pub fn is_checkbox(&self) -> bool {
        matches!(self, FieldKind::Checkbox { .. })
    }
}

/// One interactive widget to place on a page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDescriptor {
    pub id: FieldId,
    pub page: usize,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(flatten)]
    pub rect: MappedRect,
}

/// Ordered fields of one output page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageFields {
    pub index: usize,
    pub size: PageSize,
    pub fields: Vec<FieldDescriptor>,
}

/// The field layer of a whole document, page by page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormLayout {
    pub pages: Vec<PageFields>,
}

impl FormLayout {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn field_count(&self) -> usize {
        self.pages.iter().map(|p| p.fields.len()).sum()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.pages.iter().flat_map(|p| p.fields.iter())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Non-fatal geometry problem found while synthesizing a field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GeometryWarning {
    pub page: usize,
    pub id: FieldId,
    pub reason: String,
}

impl fmt::Display for GeometryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}, field {}: {}", self.page, self.id, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_range_is_inclusive() {
        let red = ColorRange::new([200, 0, 0], [255, 0, 0]);
        assert!(red.contains(&Rgb([200, 0, 0])));
        assert!(red.contains(&Rgb([255, 0, 0])));
        assert!(!red.contains(&Rgb([199, 0, 0])));
        assert!(!red.contains(&Rgb([255, 1, 0])));
        assert!(!red.contains(&Rgb([255, 255, 255])));
    }

    #[test]
    fn test_color_ranges_disjoint() {
        let red = ColorRange::new([200, 0, 0], [255, 0, 0]);
        let green = ColorRange::new([0, 200, 0], [0, 255, 0]);
        assert!(red.is_disjoint(&green));
        assert!(!red.is_disjoint(&red));
    }

    #[test]
    fn test_bounding_box_from_points() {
        let bounds = BoundingBox::from_points(&[(484, 258), (484, 297), (1510, 297), (1510, 258)])
            .unwrap();
        assert_eq!(
            bounds,
            BoundingBox {
                min_x: 484,
                max_x: 1510,
                min_y: 258,
                max_y: 297
            }
        );
        assert_eq!(bounds.width(), 1026);
        assert_eq!(bounds.height(), 39);
    }

    #[test]
    fn test_bounding_box_empty_points() {
        assert!(BoundingBox::from_points(&[]).is_none());
        assert!(Region::from_points(ColorClass::TextMarker, vec![]).is_none());
    }

    #[test]
    fn test_normalized_rect_handles_negative_height() {
        let rect = MappedRect {
            x: 10.0,
            y: 100.0,
            width: 50.0,
            height: -20.0,
        };
        assert_eq!(rect.normalized(), [10.0, 80.0, 60.0, 100.0]);
        assert_eq!(rect.area(), 1000.0);
    }

    #[test]
    fn test_field_id_sequence() {
        let id = FieldId::FIRST;
        assert_eq!(id.0, 1);
        assert_eq!(id.next(), FieldId(2));
        assert_eq!(id.name(), "1");
    }

    #[test]
    fn test_descriptor_json_shape() {
        let field = FieldDescriptor {
            id: FieldId(7),
            page: 1,
            kind: FieldKind::TextField {
                max_len: 12,
                font_size: 11.0,
            },
            rect: MappedRect {
                x: 1.0,
                y: 2.0,
                width: 3.0,
                height: -4.0,
            },
        };
        let value = serde_json::to_value(&field).unwrap();
        assert_eq!(value["id"], 7);
        assert_eq!(value["kind"], "text_field");
        assert_eq!(value["max_len"], 12);
        assert_eq!(value["height"], -4.0);

        let back: FieldDescriptor = serde_json::from_value(value).unwrap();
        assert_eq!(back, field);
    }
}
