//! Form Session - the viewer/editor session behind a PDF form filler
//!
//! This crate provides:
//! - A media-type gate for user-selected files
//! - A load lifecycle where only the newest selection can complete
//! - A clamped pagination cursor
//! - A field-name to value map, pre-populated from the document's AcroForm
//! - Export of the edited document as real, re-validated PDF bytes
//!
//! # Example
//!
//! ```ignore
//! use form_session::{SelectedFile, Session, SessionConfig};
//!
//! let mut session = Session::new(SessionConfig::default());
//! session.load(SelectedFile::new("form.pdf", "application/pdf", bytes))?;
//! session.next_page();
//! session.set_field("customer.name", "Somchai")?;
//! let exported = session.export(Some("filled.pdf"))?;
//! std::fs::write(&exported.filename, &exported.bytes)?;
//! ```

pub mod config;
pub mod export;
pub mod fields;
pub mod media;
pub mod pagination;
mod session;
pub mod state;

pub use config::SessionConfig;
pub use export::{resolve_export_filename, ExportedFile};
pub use fields::{FieldKind, FieldValues, FieldView};
pub use media::SelectedFile;
pub use pagination::Pagination;
pub use session::Session;
pub use state::{LoadOutcome, LoadTicket, Selection, SessionState};

use pdf_core::PdfError;
use thiserror::Error;

/// Errors that can occur during a session
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No document is ready (session is {0})")]
    NotReady(&'static str),

    #[error("No file has been selected")]
    NoFile,

    #[error("Unknown form field: {0}")]
    UnknownField(String),

    #[error("Form field is read-only: {0}")]
    ReadOnlyField(String),

    #[error("Failed to load document: {0}")]
    Parse(#[source] PdfError),

    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SessionError::NotReady("loading").to_string(),
            "No document is ready (session is loading)"
        );
        assert_eq!(
            SessionError::Parse(PdfError::Encrypted).to_string(),
            "Failed to load document: PDF is encrypted"
        );
        assert_eq!(
            SessionError::from(PdfError::FieldNotFound("a".to_string())).to_string(),
            "PDF error: Form field not found: a"
        );
    }
}
