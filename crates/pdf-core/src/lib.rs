//! PDF Core - Low-level PDF form access
//!
//! This crate provides functionality for:
//! - Opening and saving PDF documents
//! - Discovering AcroForm fields and their widget annotations
//! - Writing field values back into the document
//! - Regenerating appearance streams for edited text fields
//!
//! # Example
//!
//! ```ignore
//! use pdf_core::PdfDocument;
//!
//! let mut doc = PdfDocument::open("form.pdf")?;
//! for field in doc.form_fields()? {
//!     println!("{} ({:?}) on pages {:?}", field.name, field.field_type, field.pages);
//! }
//! doc.set_field_value("customer.name", "Somchai")?;
//! doc.save("filled.pdf")?;
//! ```

mod document;
mod form;
mod text;

pub use document::PdfDocument;
pub use form::{decode_text_string, encode_text_string, FieldType, FormField, WidgetAnnotation};
pub use text::{generate_field_appearance, Color, DefaultAppearance};

use thiserror::Error;

/// PDF media type, as declared by browsers and HTTP
pub const PDF_MEDIA_TYPE: &str = "application/pdf";

/// Errors that can occur during PDF operations
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("Failed to open PDF: {0}")]
    OpenError(String),

    #[error("Failed to save PDF: {0}")]
    SaveError(String),

    #[error("PDF is encrypted")]
    Encrypted,

    #[error("Invalid page number: {0} (document has {1} pages)")]
    InvalidPage(usize, usize),

    #[error("Form field not found: {0}")]
    FieldNotFound(String),

    #[error("Form field {name} is not writable: {reason}")]
    FieldNotWritable { name: String, reason: String },

    #[error("Malformed form: {0}")]
    MalformedForm(String),

    #[error("PDF parsing error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Lopdf error: {0}")]
    LopdfError(#[from] lopdf::Error),
}

/// Result type for PDF operations
pub type Result<T> = std::result::Result<T, PdfError>;

/// Text alignment options (the `/Q` quadding of a form field)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

impl Align {
    /// Map a `/Q` value to an alignment; unknown values fall back to left
    pub fn from_quadding(q: i64) -> Self {
        match q {
            1 => Align::Center,
            2 => Align::Right,
            _ => Align::Left,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_default() {
        assert_eq!(Align::default(), Align::Left);
    }

    #[test]
    fn test_align_from_quadding() {
        assert_eq!(Align::from_quadding(0), Align::Left);
        assert_eq!(Align::from_quadding(1), Align::Center);
        assert_eq!(Align::from_quadding(2), Align::Right);
        assert_eq!(Align::from_quadding(7), Align::Left);
    }

    #[test]
    fn test_error_messages() {
        let err = PdfError::InvalidPage(4, 3);
        assert_eq!(err.to_string(), "Invalid page number: 4 (document has 3 pages)");

        let err = PdfError::FieldNotWritable {
            name: "sig".to_string(),
            reason: "signature field".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Form field sig is not writable: signature field"
        );
    }
}
