//! Exported documents and their filenames

use pdf_core::PDF_MEDIA_TYPE;

/// Filename used when nothing better is known
const FALLBACK_NAME: &str = "document.pdf";

/// A document ready to hand to the download mechanism
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Suggested download name, always ending in `.pdf`
    pub filename: String,
    /// Always `application/pdf`
    pub media_type: String,
    /// Serialized PDF
    pub bytes: Vec<u8>,
    /// Names of the fields written into the document
    pub applied: Vec<String>,
}

impl ExportedFile {
    pub(crate) fn new(filename: String, bytes: Vec<u8>, applied: Vec<String>) -> Self {
        Self {
            filename,
            media_type: PDF_MEDIA_TYPE.to_string(),
            bytes,
            applied,
        }
    }

    /// Whether any field edit went into the bytes
    ///
    /// When false, `bytes` are the originally loaded file, untouched.
    pub fn modified(&self) -> bool {
        !self.applied.is_empty()
    }
}

/// Pick the download filename for an export
///
/// Order: the requested name, the configured default, `<source stem>-filled.pdf`,
/// then `document.pdf`. Blank candidates are skipped, directories are
/// stripped and `.pdf` is appended when missing.
pub fn resolve_export_filename(
    requested: Option<&str>,
    configured: Option<&str>,
    source_name: Option<&str>,
) -> String {
    if let Some(name) = requested.and_then(clean).or_else(|| configured.and_then(clean)) {
        return with_pdf_extension(name);
    }

    source_name
        .and_then(clean)
        .map(|name| {
            let stem = strip_pdf_extension(name);
            if stem.is_empty() {
                FALLBACK_NAME.to_string()
            } else {
                format!("{stem}-filled.pdf")
            }
        })
        .unwrap_or_else(|| FALLBACK_NAME.to_string())
}

/// Last path component, trimmed; `None` when nothing is left
fn clean(name: &str) -> Option<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        None
    } else {
        Some(base)
    }
}

/// The part before a trailing `.pdf` (any case), if there is one
fn pdf_stem(name: &str) -> Option<&str> {
    let split = name.len().checked_sub(4)?;
    if !name.is_char_boundary(split) {
        return None;
    }
    let (stem, ext) = name.split_at(split);
    ext.eq_ignore_ascii_case(".pdf").then_some(stem)
}

fn strip_pdf_extension(name: &str) -> &str {
    pdf_stem(name).unwrap_or(name)
}

fn with_pdf_extension(name: &str) -> String {
    match pdf_stem(name) {
        Some("") => FALLBACK_NAME.to_string(),
        Some(_) => name.to_string(),
        None => format!("{name}.pdf"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_requested_name_wins() {
        assert_eq!(
            resolve_export_filename(Some("mine.pdf"), Some("cfg.pdf"), Some("src.pdf")),
            "mine.pdf"
        );
    }

    #[test]
    fn test_blank_requested_falls_through() {
        // A save button has no value of its own, so blank names are common
        assert_eq!(
            resolve_export_filename(Some("  "), Some("cfg"), Some("src.pdf")),
            "cfg.pdf"
        );
        assert_eq!(
            resolve_export_filename(Some(""), None, Some("Tax Form.PDF")),
            "Tax Form-filled.pdf"
        );
    }

    #[test]
    fn test_fallback_name() {
        assert_eq!(resolve_export_filename(None, None, None), "document.pdf");
        assert_eq!(
            resolve_export_filename(None, None, Some(".pdf")),
            "document.pdf"
        );
    }

    #[test]
    fn test_strips_directories() {
        assert_eq!(
            resolve_export_filename(Some("../../etc/out"), None, None),
            "out.pdf"
        );
        assert_eq!(
            resolve_export_filename(Some("C:\\Users\\me\\form.pdf"), None, None),
            "form.pdf"
        );
        assert_eq!(
            resolve_export_filename(Some("dir/"), None, Some("a.pdf")),
            "a-filled.pdf"
        );
    }

    #[test]
    fn test_extension_case_insensitive() {
        assert_eq!(resolve_export_filename(Some("A.PDF"), None, None), "A.PDF");
        assert_eq!(resolve_export_filename(Some("a.txt"), None, None), "a.txt.pdf");
    }

    #[test]
    fn test_non_ascii_names() {
        assert_eq!(
            resolve_export_filename(None, None, Some("แบบฟอร์ม.pdf")),
            "แบบฟอร์ม-filled.pdf"
        );
        assert_eq!(resolve_export_filename(Some("ใบ"), None, None), "ใบ.pdf");
    }

    #[test]
    fn test_modified_flag() {
        let untouched = ExportedFile::new("a.pdf".into(), vec![1], vec![]);
        assert!(!untouched.modified());
        assert_eq!(untouched.media_type, "application/pdf");
        let edited = ExportedFile::new("a.pdf".into(), vec![1], vec!["name".into()]);
        assert!(edited.modified());
    }
}
