//! Layer compositing
//!
//! Places the clean visual document underneath the field-only document, page by
//! page. The visual page is wrapped into a Form XObject and painted before the
//! field page's own content, so the widgets (page annotations) stay on top and
//! remain interactive. The output keeps the field document's catalog and AcroForm.

use crate::error::FormError;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

/// XObject resource name of the visual layer on each output page.
const LAYER_NAME: &str = "MarkformVisual";

/// Bound on page tree ancestry walks, guards against cyclic Parent links.
const MAX_TREE_DEPTH: usize = 64;

/// Everything needed to redraw one visual page elsewhere.
struct VisualPage {
    content: Vec<u8>,
    resources: Option<Object>,
    media_box: Option<Object>,
}

#[derive(Debug, Clone, Default)]
pub struct LayerCompositor;

impl LayerCompositor {
    pub fn new() -> Self {
        Self
    }

    /// Merge `visual` beneath `fields`, page by page.
    ///
    /// Both documents must have the same page count; otherwise
    /// [`FormError::PageCountMismatch`] is returned and nothing is produced.
    pub fn composite(&self, fields: Document, visual: Document) -> Result<Document, FormError> {
        let field_pages: Vec<ObjectId> = fields.get_pages().into_values().collect();
        let visual_pages: Vec<ObjectId> = visual.get_pages().into_values().collect();

        if field_pages.len() != visual_pages.len() {
            return Err(FormError::PageCountMismatch {
                fields: field_pages.len(),
                visual: visual_pages.len(),
            });
        }

        // Read visual pages before their ids are shifted
        let layers = visual_pages
            .iter()
            .enumerate()
            .map(|(index, &page_id)| read_visual_page(&visual, page_id, index))
            .collect::<Result<Vec<_>, _>>()?;

        let mut dest = fields;
        let id_offset = dest.max_id;
        for (old_id, object) in visual.objects.into_iter() {
            let new_id = (old_id.0 + id_offset, old_id.1);
            dest.objects.insert(new_id, remap_object_refs(object, id_offset));
        }
        dest.max_id = (visual.max_id + id_offset).max(dest.max_id);

        for (index, (page_id, layer)) in field_pages.into_iter().zip(layers).enumerate() {
            let media_box = match layer.media_box {
                Some(media_box) => remap_object_refs(media_box, id_offset),
                None => inherited_attribute(&dest, page_id, b"MediaBox")
                    .cloned()
                    .ok_or_else(|| {
                        FormError::OperationError(format!("Page {} has no MediaBox", index))
                    })?,
            };
            let resources = layer
                .resources
                .map(|r| remap_object_refs(r, id_offset))
                .unwrap_or_else(|| Object::Dictionary(Dictionary::new()));

            let mut xobject = Dictionary::new();
            xobject.set("Type", Object::Name(b"XObject".to_vec()));
            xobject.set("Subtype", Object::Name(b"Form".to_vec()));
            xobject.set("FormType", Object::Integer(1));
            xobject.set("BBox", media_box);
            xobject.set("Resources", resources);
            let xobject_id = dest.add_object(Stream::new(xobject, layer.content));

            underlay(&mut dest, page_id, xobject_id)?;
        }

        // Drops the visual document's catalog and page tree
        dest.prune_objects();

        tracing::info!("Composited {} pages", dest.get_pages().len());
        Ok(dest)
    }

    /// Byte-level convenience wrapper around [`Self::composite`].
    pub fn composite_bytes(&self, fields: &[u8], visual: &[u8]) -> Result<Vec<u8>, FormError> {
        let fields = Document::load_mem(fields)
            .map_err(|e| FormError::ParseError(format!("Failed to load form layer: {}", e)))?;
        let visual = Document::load_mem(visual)
            .map_err(|e| FormError::ParseError(format!("Failed to load visual layer: {}", e)))?;

        let mut merged = self.composite(fields, visual)?;
        merged.compress();

        let mut buffer = Vec::new();
        merged
            .save_to(&mut buffer)
            .map_err(|e| FormError::OperationError(format!("Failed to save merged PDF: {}", e)))?;
        Ok(buffer)
    }
}

fn read_visual_page(
    doc: &Document,
    page_id: ObjectId,
    index: usize,
) -> Result<VisualPage, FormError> {
    let content = doc.get_page_content(page_id).map_err(|e| {
        FormError::ParseError(format!("Failed to read visual page {}: {}", index, e))
    })?;
    Ok(VisualPage {
        content,
        resources: inherited_attribute(doc, page_id, b"Resources").cloned(),
        media_box: inherited_attribute(doc, page_id, b"MediaBox").cloned(),
    })
}

/// Look up a page attribute, walking up the page tree when it is inherited.
fn inherited_attribute<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_TREE_DEPTH {
        let dict = doc.get_object(current).ok()?.as_dict().ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").ok()?.as_reference().ok()?;
    }
    None
}

/// Paint `xobject_id` first on `page_id`, keeping the page's own content above it.
fn underlay(doc: &mut Document, page_id: ObjectId, xobject_id: ObjectId) -> Result<(), FormError> {
    let draw = format!("q /{} Do Q\n", LAYER_NAME);
    let draw_id = doc.add_object(Stream::new(Dictionary::new(), draw.into_bytes()));

    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|_| FormError::OperationError("Invalid page dictionary".into()))?;

    let mut contents = vec![Object::Reference(draw_id)];
    match page.get(b"Contents") {
        Ok(Object::Array(existing)) => contents.extend(existing.iter().cloned()),
        Ok(existing @ Object::Reference(_)) => contents.push(existing.clone()),
        _ => {}
    }

    // Resources may live in a separate object
    let resources_ref = match page.get(b"Resources") {
        Ok(Object::Reference(id)) => Some(*id),
        _ => None,
    };

    let resources = match resources_ref {
        Some(id) => doc
            .get_object_mut(id)
            .and_then(Object::as_dict_mut)
            .map_err(|_| FormError::OperationError("Invalid page resources".into()))?,
        None => {
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|_| FormError::OperationError("Invalid page dictionary".into()))?;
            if !matches!(page.get(b"Resources"), Ok(Object::Dictionary(_))) {
                page.set("Resources", Object::Dictionary(Dictionary::new()));
            }
            page.get_mut(b"Resources")
                .and_then(Object::as_dict_mut)
                .map_err(|_| FormError::OperationError("Invalid page resources".into()))?
        }
    };

    let mut xobjects = match resources.get(b"XObject") {
        Ok(Object::Dictionary(existing)) => existing.clone(),
        _ => Dictionary::new(),
    };
    xobjects.set(LAYER_NAME, Object::Reference(xobject_id));
    resources.set("XObject", Object::Dictionary(xobjects));

    let page = doc
        .get_object_mut(page_id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| FormError::OperationError("Invalid page dictionary".into()))?;
    page.set("Contents", Object::Array(contents));

    Ok(())
}

/// Recursively remap object references in an object
fn remap_object_refs(obj: Object, offset: u32) -> Object {
    match obj {
        Object::Reference(id) => Object::Reference((id.0 + offset, id.1)),
        Object::Array(arr) => Object::Array(
            arr.into_iter()
                .map(|o| remap_object_refs(o, offset))
                .collect(),
        ),
        Object::Dictionary(mut dict) => {
            for (_, value) in dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Dictionary(dict)
        }
        Object::Stream(mut stream) => {
            for (_, value) in stream.dict.iter_mut() {
                *value = remap_object_refs(value.clone(), offset);
            }
            Object::Stream(stream)
        }
        other => other,
    }
}
