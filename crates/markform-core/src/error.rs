use crate::model::FieldId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormError {
    /// The raster for a page is missing or has a zero dimension.
    #[error("Page {page}: invalid raster input: {reason}")]
    DetectionInput { page: usize, reason: String },

    /// The field layer and the visual layer disagree on page count.
    #[error("Page count mismatch: field layer has {fields} pages, visual layer has {visual}")]
    PageCountMismatch { fields: usize, visual: usize },

    /// Only raised when strict geometry validation is enabled.
    #[error("Page {page}, field {id}: degenerate geometry: {reason}")]
    DegenerateGeometry {
        page: usize,
        id: FieldId,
        reason: String,
    },

    #[error("Failed to parse PDF: {0}")]
    ParseError(String),

    #[error("PDF operation failed: {0}")]
    OperationError(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl FormError {
    /// Whether the error is confined to a single page.
    ///
    /// Page-local errors may be reported per page in a batch without aborting
    /// sibling pages. Everything else aborts the whole conversion.
    pub fn is_page_local(&self) -> bool {
        matches!(
            self,
            FormError::DetectionInput { .. } | FormError::DegenerateGeometry { .. }
        )
    }
}
