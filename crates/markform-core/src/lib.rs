//! Marker-driven fillable PDF generation
//!
//! Turns rendered form pages carrying color-coded placeholder rectangles into an
//! interactive PDF: red markers become text fields, green markers become checkboxes.
//!
//! The pipeline runs strictly forward:
//! - `detect`: find marker regions on each raster page
//! - `mapping`: convert raster bounding boxes to PDF point space
//! - `synth`: turn mapped regions into numbered field descriptors
//! - `builder`: emit a field-only AcroForm document
//! - `composite`: lay the clean visual document underneath the fields

pub mod builder;
pub mod composite;
pub mod config;
pub mod detect;
pub mod error;
pub mod mapping;
pub mod model;
pub mod overlay;
pub mod pipeline;
pub mod synth;

pub use builder::FormDocumentBuilder;
pub use composite::LayerCompositor;
pub use config::{FillColor, FormConfig, RegionOrder};
pub use detect::{PageRegions, RegionDetector};
pub use error::FormError;
pub use mapping::{CoordinateMapper, MappedBox};
pub use model::{
    BoundingBox, ColorClass, ColorRange, FieldDescriptor, FieldId, FieldKind, FormLayout,
    GeometryWarning, MappedRect, Page, PageFields, PageSize, Region,
};
pub use overlay::render_overlay;
pub use pipeline::{Conversion, FormPipeline, LayoutResult};
pub use synth::FieldSynthesizer;

/// Parse PDF bytes and return page count
pub fn get_page_count(bytes: &[u8]) -> Result<usize, FormError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| FormError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len())
}
