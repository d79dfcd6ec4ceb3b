//! Raster pixel space to PDF point space
//!
//! Raster coordinates start top-left with y growing downward; PDF coordinates
//! start bottom-left with y growing upward. For a bounding box the mapper yields
//! `(a, b, w, h)`:
//!
//! ```text
//! a = (min_x / raster_width)  * target_width
//! b = target_height - (min_y / raster_height) * target_height
//! w = (max_x - min_x) / raster_width  * target_width
//! h = (max_y - min_y) / raster_height * target_height
//! ```
//!
//! `(a, b)` is the box's top-left corner in point space and `h` is a magnitude.
//! Text fields hang down from that corner (negative height); checkboxes are
//! anchored at the bottom-left corner instead.

use crate::detect::PageRegions;
use crate::model::{BoundingBox, MappedRect, Page, PageSize};

/// A bounding box mapped into target page space, before any field-specific layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappedBox {
    pub a: f64,
    pub b: f64,
    pub w: f64,
    /// Always non-negative
    pub h: f64,
}

impl MappedBox {
    /// Top-left anchored geometry extending downward: `(a, b, w, -h)`.
    pub fn text_rect(&self) -> MappedRect {
        MappedRect {
            x: self.a,
            y: self.b,
            width: self.w,
            height: -self.h,
        }
    }

    /// Bottom-left anchored geometry: `(a, b - h, w, h)`.
    pub fn checkbox_rect(&self) -> MappedRect {
        MappedRect {
            x: self.a,
            y: self.b - self.h,
            width: self.w,
            height: self.h,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    raster_width: f64,
    raster_height: f64,
    target: PageSize,
}

impl CoordinateMapper {
    pub fn new(raster_width: u32, raster_height: u32, target: PageSize) -> Self {
        Self {
            raster_width: f64::from(raster_width),
            raster_height: f64::from(raster_height),
            target,
        }
    }

    pub fn for_page(page: &Page) -> Self {
        Self::new(page.raster_width(), page.raster_height(), page.target)
    }

    pub fn for_regions(regions: &PageRegions) -> Self {
        Self::new(regions.raster_width, regions.raster_height, regions.target)
    }

    pub fn map(&self, bounds: &BoundingBox) -> MappedBox {
        let min_x = f64::from(bounds.min_x);
        let max_x = f64::from(bounds.max_x);
        let min_y = f64::from(bounds.min_y);
        let max_y = f64::from(bounds.max_y);

        let a = (min_x / self.raster_width) * self.target.width;
        let b = self.target.height - (min_y / self.raster_height) * self.target.height;
        let w = (max_x - min_x) / self.raster_width * self.target.width;
        let h = (max_y - min_y) / self.raster_height * self.target.height;

        MappedBox { a, b, w, h }
    }
}
