//! Marker region detection
//!
//! Thresholds a page against a class color range and traces the outer border of
//! every connected component with `imageproc`'s contour finder.

use crate::config::{FormConfig, RegionOrder};
use crate::error::FormError;
use crate::model::{ColorClass, ColorRange, Page, PageSize, Region};
use image::{GrayImage, Luma};
use imageproc::contours::{find_contours, BorderType};

/// Regions found on one page, per class, already in numbering order.
#[derive(Debug, Clone, PartialEq)]
pub struct PageRegions {
    pub page: usize,
    pub raster_width: u32,
    pub raster_height: u32,
    pub target: PageSize,
    pub text: Vec<Region>,
    pub checkbox: Vec<Region>,
}

impl PageRegions {
    pub fn regions(&self, class: ColorClass) -> &[Region] {
        match class {
            ColorClass::TextMarker => &self.text,
            ColorClass::CheckboxMarker => &self.checkbox,
        }
    }

    pub fn len(&self) -> usize {
        self.text.len() + self.checkbox.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone)]
pub struct RegionDetector {
    text_range: ColorRange,
    checkbox_range: ColorRange,
    order: RegionOrder,
}

impl RegionDetector {
    pub fn new(config: &FormConfig) -> Self {
        Self {
            text_range: config.text_marker_range,
            checkbox_range: config.checkbox_marker_range,
            order: config.region_order,
        }
    }

    pub fn range(&self, class: ColorClass) -> ColorRange {
        match class {
            ColorClass::TextMarker => self.text_range,
            ColorClass::CheckboxMarker => self.checkbox_range,
        }
    }

    /// Detect both marker classes on a page.
    pub fn detect_page(&self, page: &Page) -> Result<PageRegions, FormError> {
        let text = self.detect(page, ColorClass::TextMarker)?;
        let checkbox = self.detect(page, ColorClass::CheckboxMarker)?;

        tracing::debug!(
            "Page {}: {} text markers, {} checkbox markers",
            page.index,
            text.len(),
            checkbox.len()
        );

        Ok(PageRegions {
            page: page.index,
            raster_width: page.raster_width(),
            raster_height: page.raster_height(),
            target: page.target,
            text,
            checkbox,
        })
    }

    /// Detect the regions of one class, ordered by the configured policy.
    ///
    /// A page without matching pixels yields an empty list.
    pub fn detect(&self, page: &Page, class: ColorClass) -> Result<Vec<Region>, FormError> {
        validate_raster(page)?;

        let mask = self.framed_mask(page, class);
        let discovered: Vec<Region> = find_contours::<u32>(&mask)
            .into_iter()
            // Solid markers have no holes; a hole border would duplicate its parent
            .filter(|contour| contour.border_type == BorderType::Outer)
            .filter_map(|contour| {
                // Undo the frame offset; foreground never lies on the frame
                let points = contour.points.iter().map(|p| (p.x - 1, p.y - 1)).collect();
                Region::from_points(class, points)
            })
            .collect();

        Ok(apply_order(discovered, self.order))
    }

    /// Binary mask of the pixels inside the class range.
    pub fn class_mask(&self, page: &Page, class: ColorClass) -> GrayImage {
        let range = self.range(class);
        GrayImage::from_fn(page.raster_width(), page.raster_height(), |x, y| {
            if range.contains(page.raster.get_pixel(x, y)) {
                Luma([255u8])
            } else {
                Luma([0u8])
            }
        })
    }

    /// Class mask surrounded by a one pixel background frame.
    ///
    /// The tracer only opens an outer border on a background-to-foreground
    /// step, so a component starting in column 0 would otherwise be read as a
    /// hole. Pixel `(x, y)` lands at `(x + 1, y + 1)`.
    fn framed_mask(&self, page: &Page, class: ColorClass) -> GrayImage {
        let range = self.range(class);
        let (width, height) = (page.raster_width(), page.raster_height());
        let mut mask = GrayImage::new(width + 2, height + 2);
        for (x, y, pixel) in page.raster.enumerate_pixels() {
            if range.contains(pixel) {
                mask.put_pixel(x + 1, y + 1, Luma([255u8]));
            }
        }
        mask
    }
}

fn validate_raster(page: &Page) -> Result<(), FormError> {
    if page.raster_width() == 0 || page.raster_height() == 0 {
        return Err(FormError::DetectionInput {
            page: page.index,
            reason: format!(
                "raster has zero dimension ({}x{})",
                page.raster_width(),
                page.raster_height()
            ),
        });
    }
    Ok(())
}

fn apply_order(mut regions: Vec<Region>, order: RegionOrder) -> Vec<Region> {
    match order {
        RegionOrder::Discovery => {}
        RegionOrder::ReverseDiscovery => regions.reverse(),
        RegionOrder::ReadingOrder => {
            // Stable, so identical corners keep discovery order
            regions.sort_by_key(|r| (r.bounds.min_y, r.bounds.min_x));
        }
    }
    regions
}
