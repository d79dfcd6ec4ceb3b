//! End-to-end conversion
//!
//! Detection runs per page in parallel. Field ids are then assigned in a single
//! sequential pass over the pages in document order, so numbering is page-major
//! and, within a page, text fields before checkboxes.

use crate::builder::FormDocumentBuilder;
use crate::composite::LayerCompositor;
use crate::config::FormConfig;
use crate::detect::{PageRegions, RegionDetector};
use crate::error::FormError;
use crate::model::{FieldId, FormLayout, GeometryWarning, Page};
use crate::synth::FieldSynthesizer;
use image::RgbImage;
use lopdf::Document;
use rayon::prelude::*;

/// Numbered field layout plus the geometry warnings raised while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub layout: FormLayout,
    pub warnings: Vec<GeometryWarning>,
}

/// Output of a full conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    /// The final interactive PDF
    pub pdf: Vec<u8>,
    pub layout: FormLayout,
    pub warnings: Vec<GeometryWarning>,
}

#[derive(Debug, Clone)]
pub struct FormPipeline {
    config: FormConfig,
    detector: RegionDetector,
    synthesizer: FieldSynthesizer,
    builder: FormDocumentBuilder,
    compositor: LayerCompositor,
}

impl FormPipeline {
    /// Validates `config` before building the stages.
    pub fn new(config: FormConfig) -> Result<Self, FormError> {
        config.validate()?;
        Ok(Self {
            detector: RegionDetector::new(&config),
            synthesizer: FieldSynthesizer::new(&config),
            builder: FormDocumentBuilder::new(&config),
            compositor: LayerCompositor::new(),
            config,
        })
    }

    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    /// Wrap a decoded raster as page `index` at the configured page size.
    pub fn page(&self, index: usize, raster: RgbImage) -> Page {
        Page::new(index, raster, self.config.page_size)
    }

    /// Detect markers on every page in parallel.
    ///
    /// Results come back in input order, one per page, so a bad page does not
    /// hide the results of its siblings.
    pub fn detect_pages(&self, pages: &[Page]) -> Vec<Result<PageRegions, FormError>> {
        pages
            .par_iter()
            .map(|page| self.detector.detect_page(page))
            .collect()
    }

    /// Assign ids and build descriptors for detections given in document order.
    pub fn layout(&self, detections: &[PageRegions]) -> Result<LayoutResult, FormError> {
        let mut next = FieldId::FIRST;
        let mut warnings = Vec::new();
        let mut pages = Vec::with_capacity(detections.len());

        for regions in detections {
            let (page, following) = self
                .synthesizer
                .synthesize_page(next, regions, &mut warnings)?;
            pages.push(page);
            next = following;
        }

        let layout = FormLayout { pages };
        tracing::info!(
            "Laid out {} fields over {} pages ({} warnings)",
            layout.field_count(),
            layout.page_count(),
            warnings.len()
        );
        Ok(LayoutResult { layout, warnings })
    }

    /// Detect every page, aborting on the first page error.
    pub fn detect_all(&self, pages: &[Page]) -> Result<Vec<PageRegions>, FormError> {
        self.detect_pages(pages).into_iter().collect()
    }

    /// Detect and lay out a whole document, aborting on the first page error.
    pub fn plan(&self, pages: &[Page]) -> Result<LayoutResult, FormError> {
        self.layout(&self.detect_all(pages)?)
    }

    pub fn build_form(&self, layout: &FormLayout) -> Result<Document, FormError> {
        self.builder.build(layout)
    }

    /// Run the whole pipeline against a clean visual PDF.
    ///
    /// Nothing is returned unless every stage succeeds.
    pub fn convert(&self, pages: &[Page], clean_pdf: &[u8]) -> Result<Conversion, FormError> {
        let visual = load_visual(clean_pdf, pages.len())?;
        let detections = self.detect_all(pages)?;
        self.finish(&detections, visual)
    }

    /// Like [`Self::convert`], starting from detections already in hand.
    pub fn convert_detected(
        &self,
        detections: &[PageRegions],
        clean_pdf: &[u8],
    ) -> Result<Conversion, FormError> {
        let visual = load_visual(clean_pdf, detections.len())?;
        self.finish(detections, visual)
    }

    fn finish(&self, detections: &[PageRegions], visual: Document) -> Result<Conversion, FormError> {
        let LayoutResult { layout, warnings } = self.layout(detections)?;
        let form = self.builder.build(&layout)?;
        let mut merged = self.compositor.composite(form, visual)?;
        merged.compress();

        let mut pdf = Vec::new();
        merged
            .save_to(&mut pdf)
            .map_err(|e| FormError::OperationError(format!("Failed to save output PDF: {}", e)))?;

        tracing::info!("Conversion produced {} bytes", pdf.len());
        Ok(Conversion {
            pdf,
            layout,
            warnings,
        })
    }
}

/// Load the clean PDF and check it against the number of rendered pages.
fn load_visual(clean_pdf: &[u8], page_count: usize) -> Result<Document, FormError> {
    let visual = Document::load_mem(clean_pdf)
        .map_err(|e| FormError::ParseError(format!("Failed to load clean PDF: {}", e)))?;

    let visual_pages = visual.get_pages().len();
    if visual_pages != page_count {
        return Err(FormError::PageCountMismatch {
            fields: page_count,
            visual: visual_pages,
        });
    }
    Ok(visual)
}
