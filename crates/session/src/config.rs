//! Session configuration

use crate::Result;
use pdf_core::PDF_MEDIA_TYPE;
use serde::{Deserialize, Serialize};

/// Configuration injected when a session is constructed
///
/// Every field has a default, so `{}` is a valid configuration.
///
/// ```json
/// {
///   "renderWorkerSrc": "/static/pdf.worker.min.js",
///   "acceptedMediaTypes": ["application/pdf"],
///   "prefillFromDocument": true,
///   "regenerateAppearances": true,
///   "defaultExportName": "filled.pdf"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Worker script URL for the host's page renderer (PDF.js `workerSrc`)
    pub render_worker_src: Option<String>,

    /// Declared media types a selected file may carry
    pub accepted_media_types: Vec<String>,

    /// Pre-populate field values from the loaded document's AcroForm
    pub prefill_from_document: bool,

    /// Build appearance streams for edited text fields on export
    pub regenerate_appearances: bool,

    /// Export filename used when the caller gives none
    pub default_export_name: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            render_worker_src: None,
            accepted_media_types: vec![PDF_MEDIA_TYPE.to_string()],
            prefill_from_document: true,
            regenerate_appearances: true,
            default_export_name: None,
        }
    }
}

impl SessionConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the render worker URL
    pub fn with_render_worker_src(mut self, src: impl Into<String>) -> Self {
        self.render_worker_src = Some(src.into());
        self
    }

    /// Set the fallback export filename
    pub fn with_default_export_name(mut self, name: impl Into<String>) -> Self {
        self.default_export_name = Some(name.into());
        self
    }

    /// Whether a declared media type passes the gate
    ///
    /// Comparison ignores case and any parameters (`; charset=...`).
    pub fn accepts_media_type(&self, media_type: &str) -> bool {
        let essence = media_type.split(';').next().unwrap_or("").trim();
        !essence.is_empty()
            && self
                .accepted_media_types
                .iter()
                .any(|accepted| accepted.eq_ignore_ascii_case(essence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_accepts_pdf_only() {
        let config = SessionConfig::default();
        assert!(config.accepts_media_type("application/pdf"));
        assert!(config.accepts_media_type("Application/PDF"));
        assert!(config.accepts_media_type("application/pdf; name=x.pdf"));
        assert!(!config.accepts_media_type("image/png"));
        assert!(!config.accepts_media_type(""));
    }

    #[test]
    fn test_from_empty_json_is_default() {
        let config = SessionConfig::from_json("{}").unwrap();
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_from_json_camel_case() {
        let config = SessionConfig::from_json(
            r#"{
                "renderWorkerSrc": "http://localhost/pdf.worker.js",
                "acceptedMediaTypes": ["application/pdf", "application/x-pdf"],
                "prefillFromDocument": false,
                "defaultExportName": "out.pdf"
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.render_worker_src.as_deref(),
            Some("http://localhost/pdf.worker.js")
        );
        assert!(config.accepts_media_type("application/x-pdf"));
        assert!(!config.prefill_from_document);
        assert!(config.regenerate_appearances);
        assert_eq!(config.default_export_name.as_deref(), Some("out.pdf"));
    }

    #[test]
    fn test_from_json_invalid() {
        let err = SessionConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, crate::SessionError::Config(_)));
    }

    #[test]
    fn test_builders() {
        let config = SessionConfig::default()
            .with_render_worker_src("/worker.js")
            .with_default_export_name("x.pdf");
        assert_eq!(config.render_worker_src.as_deref(), Some("/worker.js"));
        assert_eq!(config.default_export_name.as_deref(), Some("x.pdf"));
    }
}
