//! AcroForm field discovery

use crate::{PdfError, Result};
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use std::collections::{HashMap, HashSet};

/// Field flag bits (`/Ff`), PDF 32000-1 tables 221, 226, 228, 230
pub(crate) mod flags {
    pub const READ_ONLY: i64 = 1;
    pub const REQUIRED: i64 = 1 << 1;
    pub const MULTILINE: i64 = 1 << 12;
    pub const RADIO: i64 = 1 << 15;
    pub const PUSHBUTTON: i64 = 1 << 16;
    pub const EDIT: i64 = 1 << 18;
}

/// Kind of interactive form field (`/FT`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// `/Tx` - free text
    Text,
    /// `/Btn` - checkbox, radio button or push button
    Button,
    /// `/Ch` - list box or combo box
    Choice,
    /// `/Sig` - digital signature
    Signature,
    /// Missing or unrecognised `/FT`
    Unknown,
}

impl FieldType {
    fn from_name(name: Option<&[u8]>) -> Self {
        match name {
            Some(b"Tx") => FieldType::Text,
            Some(b"Btn") => FieldType::Button,
            Some(b"Ch") => FieldType::Choice,
            Some(b"Sig") => FieldType::Signature,
            _ => FieldType::Unknown,
        }
    }
}

/// A terminal form field discovered in the document
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    /// Fully qualified name (`parent.child`)
    pub name: String,
    /// The field's own `/T`
    pub partial_name: String,
    /// Field type, inherited from ancestors when absent
    pub field_type: FieldType,
    /// Current value as text (button states are given by name)
    pub value: Option<String>,
    /// Raw `/Ff` flags
    pub flags: i64,
    /// Pages (1-indexed) holding a widget of this field
    pub pages: Vec<usize>,
    /// Choice options, or the "on" states of a button
    pub options: Vec<String>,
}

impl FormField {
    pub fn is_read_only(&self) -> bool {
        self.flags & flags::READ_ONLY != 0
    }

    pub fn is_required(&self) -> bool {
        self.flags & flags::REQUIRED != 0
    }

    pub fn is_multiline(&self) -> bool {
        self.field_type == FieldType::Text && self.flags & flags::MULTILINE != 0
    }

    pub fn is_radio(&self) -> bool {
        self.field_type == FieldType::Button && self.flags & flags::RADIO != 0
    }

    pub fn is_pushbutton(&self) -> bool {
        self.field_type == FieldType::Button && self.flags & flags::PUSHBUTTON != 0
    }

    /// Whether a user can type a value into this field
    pub fn is_fillable(&self) -> bool {
        !self.is_read_only()
            && !self.is_pushbutton()
            && matches!(
                self.field_type,
                FieldType::Text | FieldType::Choice | FieldType::Button
            )
    }

    /// Reason the field cannot be written, if any
    pub(crate) fn not_writable_reason(&self) -> Option<&'static str> {
        if self.is_read_only() {
            Some("read-only field")
        } else if self.field_type == FieldType::Signature {
            Some("signature field")
        } else if self.is_pushbutton() {
            Some("push button")
        } else if self.field_type == FieldType::Unknown {
            Some("unknown field type")
        } else {
            None
        }
    }

    pub(crate) fn accepts_free_choice(&self) -> bool {
        self.flags & flags::EDIT != 0
    }
}

/// A widget annotation on a page
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetAnnotation {
    /// Page number (1-indexed)
    pub page: usize,
    /// Fully qualified name of the field the widget belongs to
    pub field_name: String,
    /// `/Rect` as `[x1, y1, x2, y2]`
    pub rect: [f64; 4],
    /// Annotation object ID
    pub object_id: ObjectId,
}

/// A discovered field plus the object references needed to edit it
#[derive(Debug, Clone)]
pub(crate) struct FieldNode {
    pub field: FormField,
    pub id: ObjectId,
    pub widgets: Vec<ObjectId>,
    pub default_appearance: Option<String>,
    pub quadding: i64,
}

/// Values a field inherits from its ancestors (and from `/AcroForm`)
#[derive(Debug, Clone, Default)]
struct Inherited {
    name: String,
    field_type: Option<Vec<u8>>,
    value: Option<Object>,
    flags: i64,
    default_appearance: Option<String>,
    quadding: i64,
}

/// Decode a PDF text string
///
/// Handles UTF-16BE and UTF-8 byte order marks; anything else is read as
/// PDFDocEncoding, which agrees with Latin-1 for printable text.
pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else if let Some(rest) = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8_lossy(rest).into_owned()
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

/// Encode text as a PDF text string object
///
/// ASCII stays a literal string; everything else becomes UTF-16BE with a BOM.
pub fn encode_text_string(text: &str) -> Object {
    if text.is_ascii() {
        Object::String(text.as_bytes().to_vec(), StringFormat::Literal)
    } else {
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes, StringFormat::Hexadecimal)
    }
}

/// Follow a reference to its target, leaving direct objects untouched
pub(crate) fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Result<&'a Object> {
    match obj {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

/// Read a number that may be stored as integer or real
pub(crate) fn as_number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Read a `/Rect`-style array of four numbers
pub(crate) fn read_rect(doc: &Document, dict: &Dictionary) -> Option<[f64; 4]> {
    let arr = resolve(doc, dict.get(b"Rect").ok()?).ok()?.as_array().ok()?;
    if arr.len() != 4 {
        return None;
    }
    let mut rect = [0.0; 4];
    for (slot, obj) in rect.iter_mut().zip(arr) {
        *slot = as_number(resolve(doc, obj).ok()?)?;
    }
    Some(rect)
}

fn text_entry(doc: &Document, dict: &Dictionary, key: &[u8]) -> Option<String> {
    match resolve(doc, dict.get(key).ok()?).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

fn value_to_text(doc: &Document, obj: &Object) -> Option<String> {
    match resolve(doc, obj).ok()? {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        Object::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(|o| value_to_text(doc, o)).collect();
            Some(parts.join(", "))
        }
        _ => None,
    }
}

/// Object ID of the document catalog
pub(crate) fn catalog_id(doc: &Document) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .map_err(|_| PdfError::ParseError("Document trailer missing Root entry".to_string()))?
        .as_reference()
        .map_err(|_| PdfError::ParseError("Root is not a reference".to_string()))
}

/// The `/AcroForm` dictionary, if the document has one
pub(crate) fn acroform(doc: &Document) -> Result<Option<&Dictionary>> {
    let catalog = doc
        .get_object(catalog_id(doc)?)?
        .as_dict()
        .map_err(|_| PdfError::ParseError("Catalog is not a dictionary".to_string()))?;
    let Ok(entry) = catalog.get(b"AcroForm") else {
        return Ok(None);
    };
    let dict = resolve(doc, entry)?
        .as_dict()
        .map_err(|_| PdfError::MalformedForm("AcroForm is not a dictionary".to_string()))?;
    Ok(Some(dict))
}

/// Map every annotation object ID to the page (1-indexed) that lists it
pub(crate) fn annotation_pages(doc: &Document) -> HashMap<ObjectId, usize> {
    let mut map = HashMap::new();
    for (page_number, page_id) in doc.get_pages() {
        for annot_id in page_annotation_ids(doc, page_id) {
            map.entry(annot_id).or_insert(page_number as usize);
        }
    }
    map
}

/// Indirect annotation IDs listed in a page's `/Annots`
pub(crate) fn page_annotation_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Some(annots) = page
        .get(b"Annots")
        .ok()
        .and_then(|a| resolve(doc, a).ok())
        .and_then(|a| a.as_array().ok())
    else {
        return Vec::new();
    };
    annots
        .iter()
        .filter_map(|a| a.as_reference().ok())
        .collect()
}

/// Collect every terminal field reachable from `/AcroForm /Fields`
pub(crate) fn collect_fields(doc: &Document) -> Result<Vec<FieldNode>> {
    let Some(form) = acroform(doc)? else {
        return Ok(Vec::new());
    };

    let roots = match form.get(b"Fields") {
        Ok(fields) => resolve(doc, fields)?
            .as_array()
            .map_err(|_| PdfError::MalformedForm("AcroForm /Fields is not an array".to_string()))?
            .clone(),
        Err(_) => Vec::new(),
    };

    let root = Inherited {
        default_appearance: text_entry(doc, form, b"DA"),
        quadding: form.get(b"Q").ok().and_then(|q| q.as_i64().ok()).unwrap_or(0),
        ..Inherited::default()
    };

    let pages = annotation_pages(doc);
    let mut visited = HashSet::new();
    let mut out = Vec::new();

    // Depth-first with an explicit stack; field trees can nest arbitrarily deep
    let mut stack: Vec<(ObjectId, Inherited)> = Vec::new();
    for entry in roots.iter().rev() {
        match entry.as_reference() {
            Ok(id) => stack.push((id, root.clone())),
            Err(_) => tracing::warn!("skipping direct object in AcroForm /Fields"),
        }
    }

    while let Some((id, parent)) = stack.pop() {
        if let Some((inherited, kids)) = visit(doc, id, &parent, &pages, &mut visited, &mut out) {
            stack.extend(kids.into_iter().rev().map(|kid| (kid, inherited.clone())));
        }
    }

    tracing::debug!(count = out.len(), "discovered form fields");
    Ok(out)
}

/// Process one node of the field tree
///
/// Terminal fields are pushed to `out`. For a non-terminal node, returns
/// what its child fields inherit together with their IDs.
fn visit(
    doc: &Document,
    id: ObjectId,
    parent: &Inherited,
    pages: &HashMap<ObjectId, usize>,
    visited: &mut HashSet<ObjectId>,
    out: &mut Vec<FieldNode>,
) -> Option<(Inherited, Vec<ObjectId>)> {
    if !visited.insert(id) {
        tracing::warn!(?id, "form field tree revisits an object; cycle cut");
        return None;
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        tracing::warn!(?id, "form field is not a dictionary; skipped");
        return None;
    };

    let partial_name = text_entry(doc, dict, b"T");
    let name = match (&partial_name, parent.name.is_empty()) {
        (Some(t), true) => t.clone(),
        (Some(t), false) => format!("{}.{}", parent.name, t),
        (None, _) => parent.name.clone(),
    };

    let inherited = Inherited {
        name,
        field_type: dict
            .get(b"FT")
            .ok()
            .and_then(|ft| ft.as_name().ok())
            .map(|ft| ft.to_vec())
            .or_else(|| parent.field_type.clone()),
        value: dict.get(b"V").ok().cloned().or_else(|| parent.value.clone()),
        flags: dict
            .get(b"Ff")
            .ok()
            .and_then(|f| f.as_i64().ok())
            .unwrap_or(parent.flags),
        default_appearance: text_entry(doc, dict, b"DA")
            .or_else(|| parent.default_appearance.clone()),
        quadding: dict
            .get(b"Q")
            .ok()
            .and_then(|q| q.as_i64().ok())
            .unwrap_or(parent.quadding),
    };

    let kids: Vec<ObjectId> = dict
        .get(b"Kids")
        .ok()
        .and_then(|k| resolve(doc, k).ok())
        .and_then(|k| k.as_array().ok())
        .map(|arr| arr.iter().filter_map(|o| o.as_reference().ok()).collect())
        .unwrap_or_default();

    let (field_kids, widget_kids): (Vec<ObjectId>, Vec<ObjectId>) =
        kids.into_iter().partition(|kid| {
            doc.get_dictionary(*kid)
                .map(|d| d.has(b"T"))
                .unwrap_or(false)
        });

    if !field_kids.is_empty() {
        return Some((inherited, field_kids));
    }

    if inherited.name.is_empty() {
        tracing::warn!(?id, "terminal form field has no name; skipped");
        return None;
    }

    let widgets = if widget_kids.is_empty() {
        vec![id]
    } else {
        widget_kids
    };

    let field_type = FieldType::from_name(inherited.field_type.as_deref());
    let mut field_pages: Vec<usize> = widgets
        .iter()
        .filter_map(|w| pages.get(w).copied())
        .collect();
    field_pages.sort_unstable();
    field_pages.dedup();

    let options = match field_type {
        FieldType::Choice => choice_options(doc, dict),
        FieldType::Button => button_states(doc, &widgets),
        _ => Vec::new(),
    };

    let field = FormField {
        name: inherited.name.clone(),
        partial_name: partial_name.unwrap_or_default(),
        field_type,
        value: inherited
            .value
            .as_ref()
            .and_then(|v| value_to_text(doc, v)),
        flags: inherited.flags,
        pages: field_pages,
        options,
    };

    out.push(FieldNode {
        field,
        id,
        widgets,
        default_appearance: inherited.default_appearance,
        quadding: inherited.quadding,
    });
    None
}

/// Export values listed in a choice field's `/Opt`
fn choice_options(doc: &Document, dict: &Dictionary) -> Vec<String> {
    let Some(opts) = dict
        .get(b"Opt")
        .ok()
        .and_then(|o| resolve(doc, o).ok())
        .and_then(|o| o.as_array().ok())
    else {
        return Vec::new();
    };
    opts.iter()
        .filter_map(|opt| match resolve(doc, opt).ok()? {
            Object::Array(pair) => pair.first().and_then(|o| value_to_text(doc, o)),
            other => value_to_text(doc, other),
        })
        .collect()
}

/// "On" appearance states of a button's widgets (every `/AP /N` key except `Off`)
pub(crate) fn button_states(doc: &Document, widgets: &[ObjectId]) -> Vec<String> {
    let mut states = Vec::new();
    for widget in widgets {
        for state in widget_states(doc, *widget) {
            if !states.contains(&state) {
                states.push(state);
            }
        }
    }
    states
}

pub(crate) fn widget_states(doc: &Document, widget: ObjectId) -> Vec<String> {
    let Some(normal) = doc
        .get_dictionary(widget)
        .ok()
        .and_then(|w| w.get(b"AP").ok())
        .and_then(|ap| resolve(doc, ap).ok())
        .and_then(|ap| ap.as_dict().ok())
        .and_then(|ap| ap.get(b"N").ok())
        .and_then(|n| resolve(doc, n).ok())
        .and_then(|n| n.as_dict().ok())
    else {
        return Vec::new();
    };
    normal
        .iter()
        .map(|(key, _)| String::from_utf8_lossy(key).into_owned())
        .filter(|key| key != "Off")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_latin1() {
        assert_eq!(decode_text_string(b"Name"), "Name");
        assert_eq!(decode_text_string(b"caf\xe9"), "caf\u{e9}");
    }

    #[test]
    fn test_decode_utf16be() {
        let bytes = [0xFE, 0xFF, 0x0E, 0x01, 0x0E, 0x02];
        assert_eq!(decode_text_string(&bytes), "\u{0e01}\u{0e02}");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("ชื่อ".as_bytes());
        assert_eq!(decode_text_string(&bytes), "ชื่อ");
    }

    #[test]
    fn test_encode_ascii_is_literal() {
        let obj = encode_text_string("Hello");
        assert!(matches!(
            obj,
            Object::String(ref bytes, StringFormat::Literal) if bytes == b"Hello"
        ));
    }

    #[test]
    fn test_encode_unicode_reads_back() {
        let obj = encode_text_string("สมชาย");
        let Object::String(bytes, StringFormat::Hexadecimal) = obj else {
            panic!("expected a hex string");
        };
        assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text_string(&bytes), "สมชาย");
    }

    #[test]
    fn test_field_type_from_name() {
        assert_eq!(FieldType::from_name(Some(b"Tx")), FieldType::Text);
        assert_eq!(FieldType::from_name(Some(b"Btn")), FieldType::Button);
        assert_eq!(FieldType::from_name(Some(b"Ch")), FieldType::Choice);
        assert_eq!(FieldType::from_name(Some(b"Sig")), FieldType::Signature);
        assert_eq!(FieldType::from_name(None), FieldType::Unknown);
    }

    #[test]
    fn test_fillable_flags() {
        let mut field = FormField {
            name: "a".to_string(),
            partial_name: "a".to_string(),
            field_type: FieldType::Text,
            value: None,
            flags: 0,
            pages: vec![1],
            options: Vec::new(),
        };
        assert!(field.is_fillable());
        assert_eq!(field.not_writable_reason(), None);

        field.flags = flags::READ_ONLY;
        assert!(!field.is_fillable());
        assert_eq!(field.not_writable_reason(), Some("read-only field"));

        field.flags = flags::PUSHBUTTON;
        field.field_type = FieldType::Button;
        assert!(field.is_pushbutton());
        assert!(!field.is_fillable());

        field.flags = 0;
        field.field_type = FieldType::Signature;
        assert_eq!(field.not_writable_reason(), Some("signature field"));
    }
}
