//! Field synthesis
//!
//! Turns mapped regions into numbered field descriptors. The id sequence is
//! threaded through explicitly: every call takes the next unused id and returns
//! the one after it, so numbering depends only on call order.

use crate::config::FormConfig;
use crate::detect::PageRegions;
use crate::error::FormError;
use crate::mapping::{CoordinateMapper, MappedBox};
use crate::model::{
    ColorClass, FieldDescriptor, FieldId, FieldKind, GeometryWarning, PageFields, PageSize,
};

/// Slack for floating-point noise when checking page bounds.
const BOUNDS_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct FieldSynthesizer {
    padding_x: f64,
    padding_y: f64,
    char_width_estimate: f64,
    font_size: f64,
    strict: bool,
}

impl FieldSynthesizer {
    pub fn new(config: &FormConfig) -> Self {
        Self {
            padding_x: config.padding_x,
            padding_y: config.padding_y,
            char_width_estimate: config.char_width_estimate,
            font_size: config.font_size,
            strict: config.strict_geometry,
        }
    }

    /// Build one field with id `next`, returning it with the following id.
    ///
    /// Never fails: zero-area input produces a degenerate field, see [`Self::inspect`].
    pub fn synthesize(
        &self,
        next: FieldId,
        page: usize,
        class: ColorClass,
        mapped: &MappedBox,
    ) -> (FieldDescriptor, FieldId) {
        let field = match class {
            ColorClass::TextMarker => {
                let mut rect = mapped.text_rect();
                rect.x += self.padding_x;
                rect.width -= self.padding_x;
                rect.y -= self.padding_y;
                rect.height += self.padding_y;

                let max_len = (mapped.w / self.char_width_estimate).floor().max(0.0) as u32;

                FieldDescriptor {
                    id: next,
                    page,
                    kind: FieldKind::TextField {
                        max_len,
                        font_size: self.font_size,
                    },
                    rect,
                }
            }
            ColorClass::CheckboxMarker => FieldDescriptor {
                id: next,
                page,
                kind: FieldKind::Checkbox { size: mapped.w },
                rect: mapped.checkbox_rect(),
            },
        };

        (field, next.next())
    }

    /// Report zero-area or off-page geometry. Such fields are still emitted.
    pub fn inspect(
        &self,
        field: &FieldDescriptor,
        mapped: &MappedBox,
        page_size: PageSize,
    ) -> Option<GeometryWarning> {
        let reason = if mapped.w <= 0.0 || mapped.h <= 0.0 {
            Some(format!(
                "zero-area marker ({:.3} x {:.3} pt)",
                mapped.w, mapped.h
            ))
        } else if field.kind.is_text() && field.rect.width <= 0.0 {
            Some(format!(
                "marker narrower than the {} pt text padding",
                self.padding_x
            ))
        } else {
            let [llx, lly, urx, ury] = field.rect.normalized();
            let off_page = llx < -BOUNDS_EPSILON
                || lly < -BOUNDS_EPSILON
                || urx > page_size.width + BOUNDS_EPSILON
                || ury > page_size.height + BOUNDS_EPSILON;
            off_page.then(|| {
                format!(
                    "rect [{:.2} {:.2} {:.2} {:.2}] extends beyond the {:.2} x {:.2} page",
                    llx, lly, urx, ury, page_size.width, page_size.height
                )
            })
        };

        reason.map(|reason| GeometryWarning {
            page: field.page,
            id: field.id,
            reason,
        })
    }

    /// Synthesize every region of a page: text markers first, then checkboxes.
    ///
    /// Geometry warnings are appended to `warnings`; in strict mode the first
    /// one is returned as an error instead.
    pub fn synthesize_page(
        &self,
        next: FieldId,
        regions: &PageRegions,
        warnings: &mut Vec<GeometryWarning>,
    ) -> Result<(PageFields, FieldId), FormError> {
        let mapper = CoordinateMapper::for_regions(regions);
        let mut next = next;
        let mut fields = Vec::with_capacity(regions.len());

        for class in ColorClass::ALL {
            for region in regions.regions(class) {
                let mapped = mapper.map(&region.bounds);
                let (field, following) = self.synthesize(next, regions.page, class, &mapped);

                if let Some(warning) = self.inspect(&field, &mapped, regions.target) {
                    if self.strict {
                        return Err(FormError::DegenerateGeometry {
                            page: warning.page,
                            id: warning.id,
                            reason: warning.reason,
                        });
                    }
                    tracing::warn!("Degenerate geometry: {}", warning);
                    warnings.push(warning);
                }

                fields.push(field);
                next = following;
            }
        }

        Ok((
            PageFields {
                index: regions.page,
                size: regions.target,
                fields,
            },
            next,
        ))
    }
}
