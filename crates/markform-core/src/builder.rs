//! Field-only AcroForm document
//!
//! Emits one blank page per layout page, each carrying its fields as merged
//! field/widget annotations. The pages have no visible content; the visual
//! layer is added later by the compositor.

use crate::config::{FillColor, FormConfig};
use crate::error::FormError;
use crate::model::{FieldDescriptor, FieldKind, FormLayout, PageFields};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};

/// Resource name of the text field font (Courier).
const TEXT_FONT: &str = "Cour";
/// Resource name of the check mark font (ZapfDingbats).
const CHECK_FONT: &str = "ZaDb";
/// ZapfDingbats glyph for a check mark.
const CHECK_GLYPH: &str = "4";
/// Appearance state name of a ticked checkbox.
pub const CHECKED_STATE: &str = "Yes";

/// Annotation flag: print the widget.
const FLAG_PRINT: i64 = 4;

#[derive(Debug, Clone)]
pub struct FormDocumentBuilder {
    text_fill: FillColor,
    checkbox_fill: FillColor,
    font_size: f64,
}

struct FormFonts {
    text: ObjectId,
    check: ObjectId,
}

impl FormDocumentBuilder {
    pub fn new(config: &FormConfig) -> Self {
        Self {
            text_fill: config.text_fill,
            checkbox_fill: config.checkbox_fill,
            font_size: config.font_size,
        }
    }

    /// Build the field-only document.
    ///
    /// Pages without fields are still emitted so the page count matches the
    /// visual document.
    pub fn build(&self, layout: &FormLayout) -> Result<Document, FormError> {
        if !self.checkbox_fill.is_opaque() {
            return Err(FormError::Config(
                "checkbox_fill must be an opaque color".into(),
            ));
        }

        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let fonts = add_fonts(&mut doc);

        let mut kids = Vec::with_capacity(layout.pages.len());
        let mut field_refs = Vec::with_capacity(layout.field_count());

        for page in &layout.pages {
            let page_id = self.add_page(&mut doc, pages_id, page, &fonts, &mut field_refs)?;
            kids.push(Object::Reference(page_id));
        }

        let mut pages_dict = Dictionary::new();
        pages_dict.set("Type", Object::Name(b"Pages".to_vec()));
        pages_dict.set("Count", Object::Integer(kids.len() as i64));
        pages_dict.set("Kids", Object::Array(kids));
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));

        let acroform_id = doc.add_object(Object::Dictionary(self.acroform(field_refs, &fonts)));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        catalog.set("AcroForm", Object::Reference(acroform_id));
        let catalog_id = doc.add_object(Object::Dictionary(catalog));
        doc.trailer.set("Root", Object::Reference(catalog_id));

        tracing::info!(
            "Built form layer: {} pages, {} fields",
            layout.page_count(),
            layout.field_count()
        );

        Ok(doc)
    }

    /// Build and serialize the field-only document.
    pub fn build_bytes(&self, layout: &FormLayout) -> Result<Vec<u8>, FormError> {
        let mut doc = self.build(layout)?;
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)
            .map_err(|e| FormError::OperationError(format!("Failed to save form PDF: {}", e)))?;
        Ok(buffer)
    }

    fn add_page(
        &self,
        doc: &mut Document,
        pages_id: ObjectId,
        page: &PageFields,
        fonts: &FormFonts,
        field_refs: &mut Vec<Object>,
    ) -> Result<ObjectId, FormError> {
        let page_id = doc.new_object_id();

        let mut annots = Vec::with_capacity(page.fields.len());
        for field in &page.fields {
            let widget = match field.kind {
                FieldKind::TextField { max_len, font_size } => {
                    self.text_widget(field, page_id, max_len, font_size)
                }
                FieldKind::Checkbox { size } => self.checkbox_widget(doc, field, page_id, size, fonts)?,
            };
            let widget_id = doc.add_object(Object::Dictionary(widget));
            annots.push(Object::Reference(widget_id));
            field_refs.push(Object::Reference(widget_id));
        }

        let content_id = doc.add_object(Stream::new(Dictionary::new(), Vec::new()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.size.width as f32),
                Object::Real(page.size.height as f32),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(Dictionary::new()));
        page_dict.set("Annots", Object::Array(annots));
        doc.objects.insert(page_id, Object::Dictionary(page_dict));

        Ok(page_id)
    }

    fn text_widget(
        &self,
        field: &FieldDescriptor,
        page_id: ObjectId,
        max_len: u32,
        font_size: f64,
    ) -> Dictionary {
        let mut widget = widget_base(field, page_id);
        widget.set("FT", Object::Name(b"Tx".to_vec()));
        widget.set("MaxLen", Object::Integer(i64::from(max_len)));
        widget.set(
            "DA",
            Object::String(
                format!("/{} {} Tf 0 0 0 rg", TEXT_FONT, font_size).into_bytes(),
                StringFormat::Literal,
            ),
        );

        let mut mk = Dictionary::new();
        if let FillColor::Rgb(rgb) = self.text_fill {
            mk.set("BG", color_array(rgb));
        }
        widget.set("MK", Object::Dictionary(mk));
        widget
    }

    fn checkbox_widget(
        &self,
        doc: &mut Document,
        field: &FieldDescriptor,
        page_id: ObjectId,
        size: f64,
        fonts: &FormFonts,
    ) -> Result<Dictionary, FormError> {
        let FillColor::Rgb(fill) = self.checkbox_fill else {
            return Err(FormError::Config(
                "checkbox_fill must be an opaque color".into(),
            ));
        };

        let mut widget = widget_base(field, page_id);
        widget.set("FT", Object::Name(b"Btn".to_vec()));
        widget.set("V", Object::Name(b"Off".to_vec()));
        widget.set("AS", Object::Name(b"Off".to_vec()));
        widget.set(
            "DA",
            Object::String(
                format!("/{} 0 Tf 0 0 0 rg", CHECK_FONT).into_bytes(),
                StringFormat::Literal,
            ),
        );

        let mut mk = Dictionary::new();
        mk.set("BG", color_array(fill));
        mk.set(
            "CA",
            Object::String(CHECK_GLYPH.as_bytes().to_vec(), StringFormat::Literal),
        );
        widget.set("MK", Object::Dictionary(mk));

        let on_id = doc.add_object(checkbox_appearance(size, fill, Some(fonts.check)));
        let off_id = doc.add_object(checkbox_appearance(size, fill, None));
        let mut normal = Dictionary::new();
        normal.set(CHECKED_STATE, Object::Reference(on_id));
        normal.set("Off", Object::Reference(off_id));
        let mut ap = Dictionary::new();
        ap.set("N", Object::Dictionary(normal));
        widget.set("AP", Object::Dictionary(ap));

        Ok(widget)
    }

    fn acroform(&self, fields: Vec<Object>, fonts: &FormFonts) -> Dictionary {
        let mut font_dict = Dictionary::new();
        font_dict.set(TEXT_FONT, Object::Reference(fonts.text));
        font_dict.set(CHECK_FONT, Object::Reference(fonts.check));
        let mut dr = Dictionary::new();
        dr.set("Font", Object::Dictionary(font_dict));

        let mut acroform = Dictionary::new();
        acroform.set("Fields", Object::Array(fields));
        // Viewers regenerate text field appearances from DA
        acroform.set("NeedAppearances", Object::Boolean(true));
        acroform.set("DR", Object::Dictionary(dr));
        acroform.set(
            "DA",
            Object::String(
                format!("/{} {} Tf 0 g", TEXT_FONT, self.font_size).into_bytes(),
                StringFormat::Literal,
            ),
        );
        acroform
    }
}

fn add_fonts(doc: &mut Document) -> FormFonts {
    let mut font = |base: &[u8]| {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"Font".to_vec()));
        dict.set("Subtype", Object::Name(b"Type1".to_vec()));
        dict.set("BaseFont", Object::Name(base.to_vec()));
        doc.add_object(Object::Dictionary(dict))
    };
    let text = font(b"Courier");
    let check = font(b"ZapfDingbats");
    FormFonts { text, check }
}

/// Entries shared by every widget: naming, placement and a zero-width border.
fn widget_base(field: &FieldDescriptor, page_id: ObjectId) -> Dictionary {
    let name = field.id.name();
    let [llx, lly, urx, ury] = widget_rect(field);

    let mut widget = Dictionary::new();
    widget.set("Type", Object::Name(b"Annot".to_vec()));
    widget.set("Subtype", Object::Name(b"Widget".to_vec()));
    widget.set(
        "T",
        Object::String(name.clone().into_bytes(), StringFormat::Literal),
    );
    widget.set("TU", Object::String(name.into_bytes(), StringFormat::Literal));
    widget.set(
        "Rect",
        Object::Array(vec![
            Object::Real(llx as f32),
            Object::Real(lly as f32),
            Object::Real(urx as f32),
            Object::Real(ury as f32),
        ]),
    );
    widget.set("F", Object::Integer(FLAG_PRINT));
    widget.set("P", Object::Reference(page_id));

    let mut border = Dictionary::new();
    border.set("W", Object::Integer(0));
    widget.set("BS", Object::Dictionary(border));
    widget
}

/// Widget rectangle `[llx, lly, urx, ury]`. Checkboxes are square.
pub fn widget_rect(field: &FieldDescriptor) -> [f64; 4] {
    match field.kind {
        FieldKind::Checkbox { size } => [
            field.rect.x,
            field.rect.y,
            field.rect.x + size,
            field.rect.y + size,
        ],
        FieldKind::TextField { .. } => field.rect.normalized(),
    }
}

fn color_array(rgb: [f32; 3]) -> Object {
    Object::Array(rgb.iter().map(|&c| Object::Real(c)).collect())
}

/// Appearance stream of a checkbox: the fill, plus a check mark when `check_font` is set.
fn checkbox_appearance(size: f64, fill: [f32; 3], check_font: Option<ObjectId>) -> Stream {
    let [r, g, b] = fill;
    let mut content = format!("q\n{} {} {} rg\n0 0 {s} {s} re f\nQ\n", r, g, b, s = size);

    let mut resources = Dictionary::new();
    if let Some(font_id) = check_font {
        let glyph_size = size * 0.8;
        content.push_str(&format!(
            "q\nBT\n0 0 0 rg\n/{font} {fs} Tf\n{tx} {ty} Td\n({glyph}) Tj\nET\nQ\n",
            font = CHECK_FONT,
            fs = glyph_size,
            tx = size * 0.15,
            ty = size * 0.2,
            glyph = CHECK_GLYPH,
        ));
        let mut font_dict = Dictionary::new();
        font_dict.set(CHECK_FONT, Object::Reference(font_id));
        resources.set("Font", Object::Dictionary(font_dict));
    }

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Form".to_vec()));
    dict.set(
        "BBox",
        Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(size as f32),
            Object::Real(size as f32),
        ]),
    );
    dict.set("Resources", Object::Dictionary(resources));

    Stream::new(dict, content.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldId, MappedRect, PageSize};

    fn text_field(id: u32, page: usize) -> FieldDescriptor {
        FieldDescriptor {
            id: FieldId(id),
            page,
            kind: FieldKind::TextField {
                max_len: 20,
                font_size: 11.0,
            },
            rect: MappedRect {
                x: 72.0,
                y: 700.0,
                width: 120.0,
                height: -14.0,
            },
        }
    }

    fn checkbox(id: u32, page: usize) -> FieldDescriptor {
        FieldDescriptor {
            id: FieldId(id),
            page,
            kind: FieldKind::Checkbox { size: 10.0 },
            rect: MappedRect {
                x: 72.0,
                y: 600.0,
                width: 10.0,
                height: 10.0,
            },
        }
    }

    fn layout(pages: Vec<Vec<FieldDescriptor>>) -> FormLayout {
        FormLayout {
            pages: pages
                .into_iter()
                .enumerate()
                .map(|(index, fields)| PageFields {
                    index,
                    size: PageSize::A4,
                    fields,
                })
                .collect(),
        }
    }

    fn widgets_on_page(doc: &Document, page_id: ObjectId) -> Vec<Dictionary> {
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"Annots")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|o| {
                let id = o.as_reference().unwrap();
                doc.get_object(id).unwrap().as_dict().unwrap().clone()
            })
            .collect()
    }

    fn name_of(widget: &Dictionary) -> String {
        match widget.get(b"T").unwrap() {
            Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
            other => panic!("unexpected T: {:?}", other),
        }
    }

    #[test]
    fn test_one_page_per_layout_page_including_empty() {
        let builder = FormDocumentBuilder::new(&FormConfig::default());
        let doc = builder
            .build(&layout(vec![vec![text_field(1, 0)], vec![], vec![checkbox(2, 2)]]))
            .unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_widgets_carry_ids_and_types() {
        let builder = FormDocumentBuilder::new(&FormConfig::default());
        let doc = builder
            .build(&layout(vec![vec![text_field(1, 0), checkbox(2, 0)]]))
            .unwrap();
        let pages = doc.get_pages();
        let widgets = widgets_on_page(&doc, pages[&1]);

        assert_eq!(widgets.len(), 2);
        assert_eq!(name_of(&widgets[0]), "1");
        assert_eq!(widgets[0].get(b"FT").unwrap().as_name().unwrap(), b"Tx");
        assert_eq!(widgets[0].get(b"MaxLen").unwrap().as_i64().unwrap(), 20);
        assert_eq!(name_of(&widgets[1]), "2");
        assert_eq!(widgets[1].get(b"FT").unwrap().as_name().unwrap(), b"Btn");
        assert!(widgets[1].get(b"AP").is_ok());
    }

    #[test]
    fn test_text_field_has_no_background_and_no_border() {
        let builder = FormDocumentBuilder::new(&FormConfig::default());
        let doc = builder.build(&layout(vec![vec![text_field(1, 0)]])).unwrap();
        let widgets = widgets_on_page(&doc, doc.get_pages()[&1]);

        let mk = widgets[0].get(b"MK").unwrap().as_dict().unwrap();
        assert!(mk.get(b"BG").is_err());
        let bs = widgets[0].get(b"BS").unwrap().as_dict().unwrap();
        assert_eq!(bs.get(b"W").unwrap().as_i64().unwrap(), 0);
    }

    #[test]
    fn test_checkbox_background_is_opaque() {
        let builder = FormDocumentBuilder::new(&FormConfig::default());
        let doc = builder.build(&layout(vec![vec![checkbox(1, 0)]])).unwrap();
        let widgets = widgets_on_page(&doc, doc.get_pages()[&1]);

        let mk = widgets[0].get(b"MK").unwrap().as_dict().unwrap();
        let bg = mk.get(b"BG").unwrap().as_array().unwrap();
        assert_eq!(bg.len(), 3);
    }

    #[test]
    fn test_transparent_checkbox_fill_refused() {
        let config = FormConfig {
            checkbox_fill: FillColor::Transparent,
            ..FormConfig::default()
        };
        let result = FormDocumentBuilder::new(&config).build(&layout(vec![vec![checkbox(1, 0)]]));
        assert!(matches!(result, Err(FormError::Config(_))));
    }

    #[test]
    fn test_widget_rect_normalizes_text_and_squares_checkbox() {
        assert_eq!(widget_rect(&text_field(1, 0)), [72.0, 686.0, 192.0, 700.0]);
        assert_eq!(widget_rect(&checkbox(2, 0)), [72.0, 600.0, 82.0, 610.0]);
    }

    #[test]
    fn test_acroform_lists_every_field() {
        let builder = FormDocumentBuilder::new(&FormConfig::default());
        let bytes = builder
            .build_bytes(&layout(vec![
                vec![text_field(1, 0), text_field(2, 0)],
                vec![checkbox(3, 1)],
            ]))
            .unwrap();

        let doc = Document::load_mem(&bytes).unwrap();
        let catalog = doc.catalog().unwrap();
        let acroform_id = catalog.get(b"AcroForm").unwrap().as_reference().unwrap();
        let acroform = doc.get_object(acroform_id).unwrap().as_dict().unwrap();
        let fields = acroform.get(b"Fields").unwrap().as_array().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(doc.get_pages().len(), 2);
    }
}
