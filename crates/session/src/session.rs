//! The viewer/editor session

use crate::export::{resolve_export_filename, ExportedFile};
use crate::fields::{FieldValues, FieldView};
use crate::media::{SelectedFile, SourceFile};
use crate::state::{LoadOutcome, LoadTicket, Selection, SessionState};
use crate::{Pagination, Result, SessionConfig, SessionError};
use pdf_core::{FormField, PdfDocument, PdfError, WidgetAnnotation};

/// One user's session over one selected PDF at a time
///
/// Drives the select -> load -> edit -> export lifecycle. The session
/// never performs I/O itself: the host supplies file bytes and consumes
/// the exported bytes.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    source: Option<SourceFile>,
    document: Option<PdfDocument>,
    /// Every terminal field of the loaded document, in document order
    fields: Vec<FormField>,
    /// Values the loaded document itself carries, for fillable fields
    baseline: FieldValues,
    values: FieldValues,
    pagination: Pagination,
    generation: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

impl Session {
    /// Create an empty session
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::Empty,
            source: None,
            document: None,
            fields: Vec::new(),
            baseline: FieldValues::new(),
            values: FieldValues::new(),
            pagination: Pagination::empty(),
            generation: 0,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    /// Offer a file to the session
    ///
    /// A declared media type outside the accepted list is rejected and
    /// leaves the session exactly as it was. An accepted file replaces the
    /// previous one: field values are cleared, the cursor goes back to 1,
    /// the page count to 0, and the session enters `Loading`. Finish the
    /// load with [`Session::finish_load`] and the returned ticket.
    ///
    /// # Arguments
    /// * `name` - File name as shown to the user
    /// * `media_type` - Declared media type (browser `File.type`)
    pub fn select_file(&mut self, name: &str, media_type: &str) -> Selection {
        if !self.config.accepts_media_type(media_type) {
            tracing::warn!(file = name, media_type, "file rejected: not an accepted media type");
            return Selection::Rejected {
                media_type: media_type.to_string(),
            };
        }

        self.generation += 1;
        let ticket = LoadTicket(self.generation);

        self.source = Some(SourceFile {
            name: name.to_string(),
            media_type: media_type.to_string(),
            bytes: None,
        });
        self.document = None;
        self.fields.clear();
        self.baseline.clear();
        self.values.clear();
        self.pagination = Pagination::empty();
        self.state = SessionState::Loading { ticket };

        tracing::info!(file = name, generation = ticket.generation(), "file accepted");
        Selection::Accepted(ticket)
    }

    /// Complete a load with the selected file's bytes
    ///
    /// A ticket other than the newest is stale: the bytes are dropped and
    /// `LoadOutcome::Stale` is returned without touching the session.
    ///
    /// # Errors
    /// `SessionError::Parse` when the bytes are not a usable PDF; the
    /// session is then `Failed`.
    pub fn finish_load(&mut self, ticket: LoadTicket, bytes: Vec<u8>) -> Result<LoadOutcome> {
        if !self.is_current(ticket) {
            tracing::warn!(
                generation = ticket.generation(),
                current = self.generation,
                "discarding stale load"
            );
            return Ok(LoadOutcome::Stale);
        }

        let parsed = PdfDocument::open_from_bytes(&bytes).and_then(|doc| {
            if doc.page_count() == 0 {
                return Err(PdfError::ParseError("document has no pages".to_string()));
            }
            let fields = doc.form_fields()?;
            Ok((doc, fields))
        });

        if let Some(source) = self.source.as_mut() {
            source.bytes = Some(bytes);
        }

        let (mut document, fields) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(error = %e, "document failed to load");
                self.state = SessionState::Failed {
                    error: e.to_string(),
                };
                return Err(SessionError::Parse(e));
            }
        };
        document.set_regenerate_appearances(self.config.regenerate_appearances);

        self.baseline = fields
            .iter()
            .filter(|f| f.is_fillable())
            .map(|f| (f.name.clone(), f.value.clone().unwrap_or_default()))
            .collect();
        self.values = if self.config.prefill_from_document {
            self.baseline.clone()
        } else {
            FieldValues::new()
        };
        self.pagination = Pagination::new(document.page_count());
        self.fields = fields;
        self.document = Some(document);
        self.state = SessionState::Ready;

        let outcome = LoadOutcome::Ready {
            page_count: self.pagination.total(),
            field_count: self.fields.len(),
        };
        tracing::info!(
            pages = self.pagination.total(),
            fields = self.fields.len(),
            "document ready"
        );
        Ok(outcome)
    }

    /// Abandon a load whose bytes could not be read
    ///
    /// Moves a current load to `Failed` and returns true; stale tickets
    /// are ignored.
    pub fn fail_load(&mut self, ticket: LoadTicket, reason: &str) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        tracing::warn!(reason, "file could not be read");
        self.state = SessionState::Failed {
            error: reason.to_string(),
        };
        true
    }

    /// Select and load a file in one step
    pub fn load(&mut self, file: SelectedFile) -> Result<LoadOutcome> {
        match self.select_file(&file.name, &file.media_type) {
            Selection::Accepted(ticket) => self.finish_load(ticket, file.bytes),
            Selection::Rejected { media_type } => Ok(LoadOutcome::Rejected { media_type }),
        }
    }

    fn is_current(&self, ticket: LoadTicket) -> bool {
        self.state == SessionState::Loading { ticket }
    }

    fn require_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(SessionError::NotReady(self.state.name()))
        }
    }

    /// Name of the current file, if any
    pub fn file_name(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.name.as_str())
    }

    /// Declared media type of the current file, if any
    pub fn file_media_type(&self) -> Option<&str> {
        self.source.as_ref().map(|s| s.media_type.as_str())
    }

    /// Bytes of the current file, for the host's page renderer
    pub fn document_bytes(&self) -> Option<&[u8]> {
        self.source.as_ref().and_then(|s| s.bytes.as_deref())
    }

    // Pagination

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn current_page(&self) -> usize {
        self.pagination.current()
    }

    /// Number of pages; 0 until a document is ready
    pub fn page_count(&self) -> usize {
        self.pagination.total()
    }

    pub fn can_go_previous(&self) -> bool {
        self.pagination.can_go_previous()
    }

    pub fn can_go_next(&self) -> bool {
        self.pagination.can_go_next()
    }

    /// Go back one page (no-op on the first page)
    pub fn previous_page(&mut self) -> usize {
        let page = self.pagination.previous();
        tracing::debug!(page, "previous page");
        page
    }

    /// Go forward one page (no-op on the last page)
    pub fn next_page(&mut self) -> usize {
        let page = self.pagination.next();
        tracing::debug!(page, "next page");
        page
    }

    /// Jump to a page, clamped to the document
    pub fn go_to_page(&mut self, page: usize) -> usize {
        let page = self.pagination.go_to(page);
        tracing::debug!(page, "go to page");
        page
    }

    // Fields

    /// Every discovered field, in document order
    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    /// The inputs to show, with current session values
    pub fn field_views(&self) -> Vec<FieldView> {
        self.fields
            .iter()
            .map(|f| FieldView::new(f, &self.values))
            .collect()
    }

    /// Inputs for fields that have a widget on the given page
    pub fn field_views_on_page(&self, page: usize) -> Vec<FieldView> {
        self.fields
            .iter()
            .filter(|f| f.pages.contains(&page))
            .map(|f| FieldView::new(f, &self.values))
            .collect()
    }

    /// Widget annotations on the current page
    pub fn current_page_widgets(&self) -> Result<Vec<WidgetAnnotation>> {
        self.require_ready()?;
        let document = self.document.as_ref().ok_or(SessionError::NoFile)?;
        Ok(document.page_widgets(self.pagination.current())?)
    }

    pub fn values(&self) -> &FieldValues {
        &self.values
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.values.get(name)
    }

    /// Set a field's value
    ///
    /// Upserts exactly one key. The value is not checked against the
    /// field's type.
    ///
    /// # Errors
    /// `NotReady` outside the ready state, `UnknownField` for names the
    /// document does not define, `ReadOnlyField` for fields that cannot
    /// be filled.
    pub fn set_field(&mut self, name: &str, value: &str) -> Result<()> {
        self.require_ready()?;
        let field = self
            .fields
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| SessionError::UnknownField(name.to_string()))?;
        if !field.is_fillable() {
            return Err(SessionError::ReadOnlyField(name.to_string()));
        }

        self.values.upsert(name, value);
        tracing::debug!(field = name, "field edited");
        Ok(())
    }

    // Export

    /// Produce the edited document
    ///
    /// The original bytes are parsed again from scratch, every value that
    /// differs from the document's own is written into its field, and the
    /// result is serialized. The serialized bytes are re-opened and each
    /// written field is checked before the export is returned. Without
    /// edits the original bytes are returned untouched.
    ///
    /// # Arguments
    /// * `filename` - Requested download name; blank or `None` falls back
    ///   to the configured default, then to `<source>-filled.pdf`
    pub fn export(&self, filename: Option<&str>) -> Result<ExportedFile> {
        self.require_ready()?;
        let source = self.source.as_ref().ok_or(SessionError::NoFile)?;
        let original = source.bytes.as_deref().ok_or(SessionError::NoFile)?;

        let filename = resolve_export_filename(
            filename,
            self.config.default_export_name.as_deref(),
            Some(&source.name),
        );

        let changed = self.values.changed_from(&self.baseline);
        if changed.is_empty() {
            tracing::info!(file = %filename, "export without edits; original bytes returned");
            return Ok(ExportedFile::new(filename, original.to_vec(), Vec::new()));
        }

        let mut document = PdfDocument::open_from_bytes(original)?;
        document.set_regenerate_appearances(self.config.regenerate_appearances);

        let mut expected = Vec::with_capacity(changed.len());
        for (name, value) in &changed {
            document.set_field_value(name, value)?;
            let stored = document.field(name)?.and_then(|f| f.value);
            expected.push((name.to_string(), stored));
        }

        let bytes = document.to_bytes()?;
        verify_export(&bytes, &expected)?;

        let applied: Vec<String> = expected.into_iter().map(|(name, _)| name).collect();
        tracing::info!(
            file = %filename,
            fields = applied.len(),
            bytes = bytes.len(),
            "document exported"
        );
        Ok(ExportedFile::new(filename, bytes, applied))
    }
}

/// Re-open exported bytes and check every written field reads back
fn verify_export(bytes: &[u8], expected: &[(String, Option<String>)]) -> Result<()> {
    let reopened = PdfDocument::open_from_bytes(bytes)
        .map_err(|e| SessionError::Export(format!("exported bytes do not parse: {e}")))?;

    for (name, value) in expected {
        let actual = reopened
            .field(name)
            .map_err(|e| SessionError::Export(e.to_string()))?
            .and_then(|f| f.value);
        if &actual != value {
            return Err(SessionError::Export(format!(
                "field {name} reads back as {actual:?}, expected {value:?}"
            )));
        }
    }
    Ok(())
}
