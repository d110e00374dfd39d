//! User-selected files

/// A file picked by the user, as the host hands it over
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    /// File name as shown in the picker
    pub name: String,
    /// Declared media type (browser `File.type`), not verified against content
    pub media_type: String,
    /// File contents
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, media_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            bytes,
        }
    }
}

/// The file the session currently owns
///
/// Bytes arrive after selection when the host reads the file asynchronously.
#[derive(Debug, Clone, Default)]
pub(crate) struct SourceFile {
    pub name: String,
    pub media_type: String,
    pub bytes: Option<Vec<u8>>,
}
