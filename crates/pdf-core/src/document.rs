//! PDF Document wrapper

use crate::form::{
    self, acroform, catalog_id, collect_fields, encode_text_string, read_rect,
    widget_states, FieldNode, FieldType, FormField, WidgetAnnotation,
};
use crate::text::{generate_field_appearance, DefaultAppearance};
use crate::{Align, PdfError, Result};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::path::Path;

/// How far into the file the `%PDF-` header may appear
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Checkbox values that mean "tick the box" when they don't name a state
const TRUTHY: [&str; 5] = ["true", "yes", "on", "1", "x"];

/// PDF Document wrapper providing form-level operations
pub struct PdfDocument {
    /// The underlying lopdf document
    inner: Document,
    /// Whether edited text fields get a fresh `/AP` stream
    regenerate_appearances: bool,
}

impl PdfDocument {
    /// Open a PDF document from a file path
    ///
    /// # Arguments
    /// * `path` - Path to the PDF file
    ///
    /// # Example
    /// ```ignore
    /// let doc = PdfDocument::open("form.pdf")?;
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::open_from_bytes(&data)
    }

    /// Open a PDF document from bytes
    ///
    /// # Arguments
    /// * `data` - PDF file bytes
    ///
    /// # Errors
    /// `OpenError` when the bytes carry no `%PDF-` header or lopdf cannot
    /// parse them, `Encrypted` for encrypted documents.
    pub fn open_from_bytes(data: &[u8]) -> Result<Self> {
        if !has_pdf_header(data) {
            return Err(PdfError::OpenError(
                "Not a PDF file (missing %PDF- header)".to_string(),
            ));
        }

        let inner = Document::load_mem(data).map_err(|e| PdfError::OpenError(e.to_string()))?;
        if inner.is_encrypted() {
            return Err(PdfError::Encrypted);
        }

        tracing::debug!(
            bytes = data.len(),
            pages = inner.get_pages().len(),
            "opened PDF document"
        );

        Ok(Self {
            inner,
            regenerate_appearances: true,
        })
    }

    /// Get the number of pages in the document
    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Enable or disable appearance stream regeneration for edited fields
    ///
    /// With regeneration off, only `/NeedAppearances` is set and viewers
    /// are left to draw the new values.
    pub fn set_regenerate_appearances(&mut self, enabled: bool) {
        self.regenerate_appearances = enabled;
    }

    /// All terminal form fields, in `/AcroForm /Fields` order
    ///
    /// Returns an empty list for documents without an AcroForm.
    pub fn form_fields(&self) -> Result<Vec<FormField>> {
        Ok(collect_fields(&self.inner)?
            .into_iter()
            .map(|node| node.field)
            .collect())
    }

    /// Look up a field by its fully qualified name
    pub fn field(&self, name: &str) -> Result<Option<FormField>> {
        Ok(collect_fields(&self.inner)?
            .into_iter()
            .find(|node| node.field.name == name)
            .map(|node| node.field))
    }

    /// Widget annotations on a page
    ///
    /// # Arguments
    /// * `page` - Page number (1-indexed)
    pub fn page_widgets(&self, page: usize) -> Result<Vec<WidgetAnnotation>> {
        let pages = self.inner.get_pages();
        let page_id = u32::try_from(page)
            .ok()
            .and_then(|number| pages.get(&number))
            .copied()
            .ok_or(PdfError::InvalidPage(page, pages.len()))?;

        let on_page = form::page_annotation_ids(&self.inner, page_id);
        let mut widgets = Vec::new();

        for node in collect_fields(&self.inner)? {
            for widget in &node.widgets {
                if !on_page.contains(widget) {
                    continue;
                }
                let rect = self
                    .inner
                    .get_dictionary(*widget)
                    .ok()
                    .and_then(|d| read_rect(&self.inner, d))
                    .unwrap_or_default();
                widgets.push(WidgetAnnotation {
                    page,
                    field_name: node.field.name.clone(),
                    rect,
                    object_id: *widget,
                });
            }
        }

        // Keep the page's own annotation order
        widgets.sort_by_key(|w| on_page.iter().position(|id| *id == w.object_id));
        Ok(widgets)
    }

    /// Write a value into a form field
    ///
    /// Text and choice fields store the value as a text string. Buttons
    /// store it as a state name: an existing "on" state, `Off`, or a truthy
    /// word (`true`, `yes`, `on`, `1`, `x`) meaning the first "on" state.
    ///
    /// # Arguments
    /// * `name` - Fully qualified field name
    /// * `value` - New value
    ///
    /// # Example
    /// ```ignore
    /// doc.set_field_value("customer.name", "Somchai")?;
    /// doc.set_field_value("agree", "Yes")?;
    /// ```
    pub fn set_field_value(&mut self, name: &str, value: &str) -> Result<()> {
        let node = collect_fields(&self.inner)?
            .into_iter()
            .find(|node| node.field.name == name)
            .ok_or_else(|| PdfError::FieldNotFound(name.to_string()))?;

        if let Some(reason) = node.field.not_writable_reason() {
            return Err(PdfError::FieldNotWritable {
                name: name.to_string(),
                reason: reason.to_string(),
            });
        }

        match node.field.field_type {
            FieldType::Button => self.set_button_state(&node, value)?,
            FieldType::Text | FieldType::Choice => {
                if node.field.field_type == FieldType::Choice
                    && !node.field.options.is_empty()
                    && !node.field.accepts_free_choice()
                    && !node.field.options.iter().any(|o| o == value)
                {
                    tracing::warn!(field = name, value, "value is not one of the field's options");
                }

                self.inner
                    .get_object_mut(node.id)?
                    .as_dict_mut()
                    .map_err(|_| PdfError::MalformedForm(format!("{name} is not a dictionary")))?
                    .set("V", encode_text_string(value));

                if self.regenerate_appearances {
                    self.regenerate_text_appearances(&node, value)?;
                }
            }
            FieldType::Signature | FieldType::Unknown => {
                return Err(PdfError::FieldNotWritable {
                    name: name.to_string(),
                    reason: "unsupported field type".to_string(),
                });
            }
        }

        self.set_need_appearances()?;
        tracing::debug!(field = name, "field value written");
        Ok(())
    }

    /// Set `/V` and every widget's `/AS` of a checkbox or radio group
    fn set_button_state(&mut self, node: &FieldNode, value: &str) -> Result<()> {
        let states = &node.field.options;
        let state = if value.is_empty() || value == "Off" {
            "Off".to_string()
        } else if states.iter().any(|s| s == value) {
            value.to_string()
        } else if TRUTHY.contains(&value.to_ascii_lowercase().as_str()) && !states.is_empty() {
            states[0].clone()
        } else {
            return Err(PdfError::FieldNotWritable {
                name: node.field.name.clone(),
                reason: format!("unknown button state {value:?}"),
            });
        };

        for widget in &node.widgets {
            let appearance = if widget_states(&self.inner, *widget).contains(&state) {
                state.clone()
            } else {
                "Off".to_string()
            };
            self.inner
                .get_object_mut(*widget)?
                .as_dict_mut()
                .map_err(|_| PdfError::MalformedForm("widget is not a dictionary".to_string()))?
                .set("AS", Object::Name(appearance.into_bytes()));
        }

        self.inner
            .get_object_mut(node.id)?
            .as_dict_mut()
            .map_err(|_| PdfError::MalformedForm("field is not a dictionary".to_string()))?
            .set("V", Object::Name(state.into_bytes()));
        Ok(())
    }

    /// Replace each widget's normal appearance with one showing `value`
    ///
    /// Values a standard font cannot show drop the stale `/AP` instead, so
    /// viewers honour `/NeedAppearances`.
    fn regenerate_text_appearances(&mut self, node: &FieldNode, value: &str) -> Result<()> {
        let da_source = node.default_appearance.clone().unwrap_or_default();
        let multiline = node.field.is_multiline();

        for widget in &node.widgets {
            let widget_dict = self.inner.get_dictionary(*widget)?;
            let Some([x1, y1, x2, y2]) = read_rect(&self.inner, widget_dict) else {
                tracing::warn!(field = %node.field.name, "widget has no /Rect; appearance skipped");
                continue;
            };
            let da = match widget_dict.get(b"DA") {
                Ok(Object::String(bytes, _)) => {
                    DefaultAppearance::parse(&String::from_utf8_lossy(bytes))
                }
                _ => DefaultAppearance::parse(&da_source),
            };
            let align = widget_dict
                .get(b"Q")
                .ok()
                .and_then(|q| q.as_i64().ok())
                .map(Align::from_quadding)
                .unwrap_or_else(|| Align::from_quadding(node.quadding));

            let width = (x2 - x1).abs();
            let height = (y2 - y1).abs();

            match generate_field_appearance(value, width, height, &da, align, multiline) {
                Some(content) => {
                    let stream = Stream::new(
                        dictionary! {
                            "Type" => "XObject",
                            "Subtype" => "Form",
                            "BBox" => vec![0.into(), 0.into(), width.into(), height.into()],
                            "Resources" => dictionary! {
                                "Font" => dictionary! {
                                    da.font_name.as_str() => helvetica_font(),
                                },
                            },
                        },
                        content,
                    );
                    let stream_id = self.inner.add_object(Object::Stream(stream));
                    self.widget_dict_mut(*widget)?
                        .set("AP", dictionary! { "N" => stream_id });
                }
                None => {
                    self.widget_dict_mut(*widget)?.remove(b"AP");
                }
            }
        }
        Ok(())
    }

    fn widget_dict_mut(&mut self, widget: ObjectId) -> Result<&mut Dictionary> {
        self.inner
            .get_object_mut(widget)?
            .as_dict_mut()
            .map_err(|_| PdfError::MalformedForm("widget is not a dictionary".to_string()))
    }

    /// Set `/NeedAppearances true` on the AcroForm, wherever it lives
    fn set_need_appearances(&mut self) -> Result<()> {
        let acroform_ref = match acroform(&self.inner)? {
            Some(_) => {
                let catalog = self.inner.get_dictionary(catalog_id(&self.inner)?)?;
                catalog.get(b"AcroForm")?.as_reference().ok()
            }
            None => return Ok(()),
        };

        let form = match acroform_ref {
            Some(id) => self.inner.get_object_mut(id)?,
            None => {
                let root = catalog_id(&self.inner)?;
                self.inner
                    .get_object_mut(root)?
                    .as_dict_mut()
                    .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?
                    .get_mut(b"AcroForm")?
            }
        };
        form.as_dict_mut()
            .map_err(|_| PdfError::MalformedForm("AcroForm is not a dictionary".to_string()))?
            .set("NeedAppearances", Object::Boolean(true));
        Ok(())
    }

    /// Save the document to a file
    ///
    /// # Arguments
    /// * `path` - Output file path
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.inner
            .save(path)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;
        Ok(())
    }

    /// Save the document to bytes
    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::SaveError(e.to_string()))?;

        Ok(buffer)
    }

    /// Access the underlying lopdf document
    pub fn inner(&self) -> &Document {
        &self.inner
    }

    /// Access the underlying lopdf document mutably
    pub fn inner_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    /// Get all page object IDs in order
    pub fn get_page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().values().copied().collect()
    }
}

/// Whether `%PDF-` appears near the start of the data
fn has_pdf_header(data: &[u8]) -> bool {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    window.windows(5).any(|w| w == b"%PDF-")
}

/// Standard 14 Helvetica with WinAnsi encoding, used by generated appearances
fn helvetica_font() -> Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    }
}
