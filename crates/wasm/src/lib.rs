//! WASM bindings for the PDF form viewer
//!
//! This crate exposes a [`PdfFormViewer`] to JavaScript:
//! - Loading a user-selected `File`
//! - Page navigation for the host's renderer
//! - Listing and editing form fields
//! - Exporting and downloading the filled PDF
//!
//! # Example (JavaScript)
//!
//! ```javascript
//! import init, { PdfFormViewer } from 'pdfform-wasm';
//!
//! await init();
//!
//! const viewer = new PdfFormViewer(JSON.stringify({
//!   renderWorkerSrc: '/pdf.worker.min.js',
//! }));
//!
//! input.addEventListener('change', async () => {
//!   const outcome = await viewer.loadFile(input.files[0]);
//!   if (outcome.status === 'ready') {
//!     renderPage(viewer.documentBytes(), viewer.currentPage);
//!   }
//! });
//!
//! viewer.setField('customer.name', 'Somchai');
//! viewer.download('filled.pdf');
//! ```

use std::cell::RefCell;
use std::fmt::Display;
use std::rc::Rc;

use form_session::{LoadOutcome, Selection, Session, SessionConfig};
use serde::Serialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};

// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Serialize with plain JS objects for maps
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

/// A widget's position on the current page, in PDF user space
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WidgetView {
    field_name: String,
    page: usize,
    rect: [f64; 4],
}

/// PDF form viewer and editor
///
/// The session is shared with in-flight loads, so a file chosen while
/// another is still being read simply supersedes it.
#[wasm_bindgen]
pub struct PdfFormViewer {
    session: Rc<RefCell<Session>>,
}

#[wasm_bindgen]
impl PdfFormViewer {
    /// Create a viewer
    ///
    /// @param configJson - Optional JSON configuration (camelCase keys)
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<PdfFormViewer, JsValue> {
        let config = match config_json.as_deref().map(str::trim) {
            Some(json) if !json.is_empty() => SessionConfig::from_json(json).map_err(js_error)?,
            _ => SessionConfig::default(),
        };
        Ok(PdfFormViewer {
            session: Rc::new(RefCell::new(Session::new(config))),
        })
    }

    /// Load a file chosen by the user
    ///
    /// Resolves to `{ status: "ready", pageCount, fieldCount }`,
    /// `{ status: "rejected", mediaType }` or `{ status: "stale" }`.
    /// Rejects when the bytes cannot be read or parsed.
    ///
    /// @param file - File from an `<input type="file">`
    /// @returns Promise of the load outcome
    #[wasm_bindgen(js_name = loadFile)]
    pub fn load_file(&self, file: web_sys::File) -> js_sys::Promise {
        let selection = self
            .session
            .borrow_mut()
            .select_file(&file.name(), &file.type_());

        let ticket = match selection {
            Selection::Accepted(ticket) => ticket,
            Selection::Rejected { media_type } => {
                let outcome = LoadOutcome::Rejected { media_type };
                return future_to_promise(async move { to_js(&outcome) });
            }
        };

        let session = Rc::clone(&self.session);
        future_to_promise(async move {
            let buffer = match JsFuture::from(file.array_buffer()).await {
                Ok(buffer) => buffer,
                Err(e) => {
                    let reason = e
                        .as_string()
                        .unwrap_or_else(|| "file could not be read".to_string());
                    session.borrow_mut().fail_load(ticket, &reason);
                    return Err(JsValue::from_str(&reason));
                }
            };
            let bytes = js_sys::Uint8Array::new(&buffer).to_vec();

            let outcome = session
                .borrow_mut()
                .finish_load(ticket, bytes)
                .map_err(js_error)?;
            to_js(&outcome)
        })
    }

    /// Lifecycle state: "empty", "loading", "ready" or "failed"
    #[wasm_bindgen(getter)]
    pub fn state(&self) -> String {
        self.session.borrow().state().name().to_string()
    }

    /// Error message of the last failed load
    #[wasm_bindgen(getter, js_name = loadError)]
    pub fn load_error(&self) -> Option<String> {
        match self.session.borrow().state() {
            form_session::SessionState::Failed { error } => Some(error.clone()),
            _ => None,
        }
    }

    #[wasm_bindgen(getter, js_name = fileName)]
    pub fn file_name(&self) -> Option<String> {
        self.session.borrow().file_name().map(str::to_string)
    }

    /// Worker script URL for the host's page renderer
    #[wasm_bindgen(getter, js_name = renderWorkerSrc)]
    pub fn render_worker_src(&self) -> Option<String> {
        self.session.borrow().config().render_worker_src.clone()
    }

    /// Bytes of the loaded PDF, for rendering
    ///
    /// @returns Uint8Array, or undefined before a file is loaded
    #[wasm_bindgen(js_name = documentBytes)]
    pub fn document_bytes(&self) -> Option<Vec<u8>> {
        self.session.borrow().document_bytes().map(<[u8]>::to_vec)
    }

    // Pagination

    #[wasm_bindgen(getter, js_name = currentPage)]
    pub fn current_page(&self) -> usize {
        self.session.borrow().current_page()
    }

    #[wasm_bindgen(getter, js_name = pageCount)]
    pub fn page_count(&self) -> usize {
        self.session.borrow().page_count()
    }

    #[wasm_bindgen(getter, js_name = canGoPrevious)]
    pub fn can_go_previous(&self) -> bool {
        self.session.borrow().can_go_previous()
    }

    #[wasm_bindgen(getter, js_name = canGoNext)]
    pub fn can_go_next(&self) -> bool {
        self.session.borrow().can_go_next()
    }

    /// @returns The new current page
    #[wasm_bindgen(js_name = previousPage)]
    pub fn previous_page(&self) -> usize {
        self.session.borrow_mut().previous_page()
    }

    /// @returns The new current page
    #[wasm_bindgen(js_name = nextPage)]
    pub fn next_page(&self) -> usize {
        self.session.borrow_mut().next_page()
    }

    /// Jump to a page; out-of-range numbers are clamped
    ///
    /// @returns The new current page
    #[wasm_bindgen(js_name = goToPage)]
    pub fn go_to_page(&self, page: usize) -> usize {
        self.session.borrow_mut().go_to_page(page)
    }

    // Fields

    /// Every form field with its current value
    ///
    /// @returns Array of `{ name, label, kind, value, readOnly, required, multiline, pages, options }`
    pub fn fields(&self) -> Result<JsValue, JsValue> {
        to_js(&self.session.borrow().field_views())
    }

    /// Fields that have a widget on the current page
    #[wasm_bindgen(js_name = pageFields)]
    pub fn page_fields(&self) -> Result<JsValue, JsValue> {
        let session = self.session.borrow();
        to_js(&session.field_views_on_page(session.current_page()))
    }

    /// Widget rectangles on the current page, for overlaying inputs
    ///
    /// @returns Array of `{ fieldName, page, rect: [x1, y1, x2, y2] }`
    #[wasm_bindgen(js_name = pageWidgets)]
    pub fn page_widgets(&self) -> Result<JsValue, JsValue> {
        let widgets: Vec<WidgetView> = self
            .session
            .borrow()
            .current_page_widgets()
            .map_err(js_error)?
            .into_iter()
            .map(|w| WidgetView {
                field_name: w.field_name,
                page: w.page,
                rect: w.rect,
            })
            .collect();
        to_js(&widgets)
    }

    /// Current values as a plain object of name to value
    pub fn values(&self) -> Result<JsValue, JsValue> {
        to_js(self.session.borrow().values())
    }

    /// Set one field's value
    #[wasm_bindgen(js_name = setField)]
    pub fn set_field(&self, name: &str, value: &str) -> Result<(), JsValue> {
        self.session
            .borrow_mut()
            .set_field(name, value)
            .map_err(js_error)
    }

    // Export

    /// Export the filled PDF
    ///
    /// @param filename - Optional download name, resolved the same way as `download`
    /// @returns PDF bytes (Uint8Array)
    #[wasm_bindgen(js_name = exportBytes)]
    pub fn export_bytes(&self, filename: Option<String>) -> Result<Vec<u8>, JsValue> {
        let exported = self
            .session
            .borrow()
            .export(filename.as_deref())
            .map_err(js_error)?;
        Ok(exported.bytes)
    }

    /// Export the filled PDF and hand it to the browser as a download
    ///
    /// @param filename - Optional download name; `.pdf` is appended when missing
    /// @returns The filename used
    pub fn download(&self, filename: Option<String>) -> Result<String, JsValue> {
        let exported = self
            .session
            .borrow()
            .export(filename.as_deref())
            .map_err(js_error)?;

        let parts = js_sys::Array::new();
        parts.push(&js_sys::Uint8Array::from(exported.bytes.as_slice()));
        let options = web_sys::BlobPropertyBag::new();
        options.set_type(&exported.media_type);
        let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
        let url = web_sys::Url::create_object_url_with_blob(&blob)?;

        let clicked = click_download_link(&url, &exported.filename);
        web_sys::Url::revoke_object_url(&url)?;
        clicked?;

        Ok(exported.filename)
    }
}

/// Click a temporary `<a download>` pointing at `url`
fn click_download_link(url: &str, filename: &str) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document available"))?;
    let anchor: web_sys::HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(url);
    anchor.set_download(filename);
    anchor.click();
    Ok(())
}
