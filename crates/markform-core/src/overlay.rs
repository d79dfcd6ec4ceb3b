//! Debug rendering of detected regions.

use crate::detect::PageRegions;
use crate::model::ColorClass;
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

/// Draw every detected region as a filled rectangle in its class color on a
/// black canvas the size of the page raster.
///
/// Comparing this with the source render shows which markers were picked up.
pub fn render_overlay(regions: &PageRegions) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(regions.raster_width, regions.raster_height, Rgb([0, 0, 0]));

    for class in ColorClass::ALL {
        let color = class.overlay_color();
        for region in regions.regions(class) {
            let b = region.bounds;
            let rect = Rect::at(b.min_x as i32, b.min_y as i32).of_size(b.width() + 1, b.height() + 1);
            draw_filled_rect_mut(&mut canvas, rect, color);
        }
    }

    canvas
}
