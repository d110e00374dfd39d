//! Integration tests for the viewer/editor session

use form_session::{
    LoadOutcome, Selection, SelectedFile, Session, SessionConfig, SessionError, SessionState,
};
use lopdf::{dictionary, Object, Stream};
use pdf_core::PdfDocument;
use pretty_assertions::assert_eq;

fn rect(x1: i64, y1: i64, x2: i64, y2: i64) -> Object {
    Object::Array(vec![x1.into(), y1.into(), x2.into(), y2.into()])
}

/// Create a PDF with `page_count` pages and an AcroForm
///
/// Fields: `name` (text, page 1), `address.city` (text, last page, value
/// "Chiang Mai"), `agree` (checkbox, page 1), `locked` (read-only text,
/// page 1).
fn create_form_pdf(page_count: usize) -> Vec<u8> {
    assert!(page_count >= 1);
    let mut doc = lopdf::Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_ids: Vec<_> = (0..page_count).map(|_| doc.new_object_id()).collect();
    let first = page_ids[0];
    let last = page_ids[page_count - 1];

    let name_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("name"),
        "DA" => Object::string_literal("/Helv 11 Tf 0 g"),
        "Rect" => rect(100, 700, 300, 720),
        "P" => first,
    });

    let address_id = doc.new_object_id();
    let city_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "T" => Object::string_literal("city"),
        "Parent" => address_id,
        "Rect" => rect(100, 650, 300, 670),
        "P" => last,
    });
    doc.objects.insert(
        address_id,
        Object::Dictionary(dictionary! {
            "FT" => "Tx",
            "T" => Object::string_literal("address"),
            "V" => Object::string_literal("Chiang Mai"),
            "Kids" => vec![city_id.into()],
        }),
    );

    let on_id = doc.add_object(Stream::new(dictionary! {}, b"0 0 8 8 re f".to_vec()));
    let off_id = doc.add_object(Stream::new(dictionary! {}, vec![]));
    let agree_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Btn",
        "T" => Object::string_literal("agree"),
        "V" => "Off",
        "AS" => "Off",
        "Rect" => rect(100, 600, 110, 610),
        "AP" => dictionary! { "N" => dictionary! { "Yes" => on_id, "Off" => off_id } },
        "P" => first,
    });

    let locked_id = doc.add_object(dictionary! {
        "Type" => "Annot",
        "Subtype" => "Widget",
        "FT" => "Tx",
        "T" => Object::string_literal("locked"),
        "Ff" => 1,
        "V" => Object::string_literal("fixed"),
        "Rect" => rect(100, 550, 300, 570),
        "P" => first,
    });

    for (i, page_id) in page_ids.iter().enumerate() {
        let mut annots = Vec::new();
        if i == 0 {
            annots.extend([name_id, agree_id, locked_id]);
        }
        if i == page_count - 1 {
            annots.push(city_id);
        }
        let contents_id = doc.add_object(Stream::new(dictionary! {}, vec![]));
        doc.objects.insert(
            *page_id,
            Object::Dictionary(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.28.into(), 841.89.into()],
                "Resources" => dictionary! {},
                "Contents" => contents_id,
                "Annots" => annots.into_iter().map(Object::from).collect::<Vec<_>>(),
            }),
        );
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => page_count as i64,
            "Kids" => page_ids.iter().copied().map(Object::from).collect::<Vec<_>>(),
        }),
    );

    // AcroForm stored directly in the catalog
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
        "AcroForm" => dictionary! {
            "Fields" => vec![name_id.into(), address_id.into(), agree_id.into(), locked_id.into()],
            "DA" => Object::string_literal("/Helv 0 Tf 0 g"),
        },
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

fn pdf_file(name: &str, pages: usize) -> SelectedFile {
    SelectedFile::new(name, "application/pdf", create_form_pdf(pages))
}

fn ready_session(pages: usize) -> Session {
    let mut session = Session::default();
    session.load(pdf_file("form.pdf", pages)).unwrap();
    session
}

#[test]
fn test_new_session_is_empty() {
    let session = Session::default();
    assert_eq!(session.state(), &SessionState::Empty);
    assert_eq!(session.page_count(), 0);
    assert_eq!(session.current_page(), 1);
    assert!(session.values().is_empty());
    assert!(session.file_name().is_none());
    assert!(session.document_bytes().is_none());
}

#[test]
fn test_rejected_type_on_empty_session() {
    let mut session = Session::default();
    let outcome = session
        .load(SelectedFile::new("photo.png", "image/png", vec![1, 2, 3]))
        .unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Rejected {
            media_type: "image/png".to_string()
        }
    );
    assert_eq!(session.state(), &SessionState::Empty);
    assert!(session.file_name().is_none());
}

#[test]
fn test_rejected_type_leaves_ready_session_unchanged() {
    let mut session = ready_session(3);
    session.next_page();
    session.set_field("name", "Somchai").unwrap();

    let before_values = session.values().clone();
    let selection = session.select_file("notes.txt", "text/plain");

    assert_eq!(
        selection,
        Selection::Rejected {
            media_type: "text/plain".to_string()
        }
    );
    assert_eq!(session.state(), &SessionState::Ready);
    assert_eq!(session.current_page(), 2);
    assert_eq!(session.page_count(), 3);
    assert_eq!(session.values(), &before_values);
    assert_eq!(session.file_name(), Some("form.pdf"));
}

#[test]
fn test_load_reports_page_count_and_starts_at_one() {
    let mut session = Session::default();
    let outcome = session.load(pdf_file("form.pdf", 4)).unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Ready {
            page_count: 4,
            field_count: 4
        }
    );
    assert!(session.is_ready());
    assert_eq!(session.current_page(), 1);
    assert_eq!(session.page_count(), 4);
    assert_eq!(session.file_media_type(), Some("application/pdf"));
    assert!(session.document_bytes().is_some());
}

#[test]
fn test_navigation_is_clamped() {
    let mut session = ready_session(3);
    assert!(!session.can_go_previous());
    assert_eq!(session.previous_page(), 1);

    assert_eq!(session.next_page(), 2);
    assert_eq!(session.next_page(), 3);
    assert!(!session.can_go_next());
    assert_eq!(session.next_page(), 3);

    assert_eq!(session.go_to_page(0), 1);
    assert_eq!(session.go_to_page(42), 3);
}

#[test]
fn test_fields_prefilled_from_document() {
    let session = ready_session(2);
    assert_eq!(session.field_value("name"), Some(""));
    assert_eq!(session.field_value("address.city"), Some("Chiang Mai"));
    assert_eq!(session.field_value("agree"), Some("Off"));
    // Read-only fields are listed but not editable values
    assert_eq!(session.field_value("locked"), None);
    assert_eq!(session.values().len(), 3);

    let views = session.field_views();
    let names: Vec<&str> = views.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["name", "address.city", "agree", "locked"]);
    assert_eq!(views[1].label, "city");
    assert!(views[3].read_only);
    assert_eq!(views[2].options, vec!["Yes"]);
}

#[test]
fn test_prefill_can_be_disabled() {
    let config = SessionConfig {
        prefill_from_document: false,
        ..SessionConfig::default()
    };
    let mut session = Session::new(config);
    session.load(pdf_file("form.pdf", 1)).unwrap();
    assert!(session.values().is_empty());
    // Field list is still known
    assert_eq!(session.fields().len(), 4);

    // Rows show what the document holds until the user types
    let city = session
        .field_views()
        .into_iter()
        .find(|v| v.name == "address.city")
        .unwrap();
    assert_eq!(city.value, "Chiang Mai");
}

#[test]
fn test_read_only_field_shows_document_value() {
    let session = ready_session(1);
    let locked = session
        .field_views()
        .into_iter()
        .find(|v| v.name == "locked")
        .unwrap();
    assert!(locked.read_only);
    assert_eq!(locked.value, "fixed");
}

#[test]
fn test_field_views_on_page() {
    let session = ready_session(3);
    let first: Vec<String> = session
        .field_views_on_page(1)
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(first, vec!["name", "agree", "locked"]);
    let last: Vec<String> = session
        .field_views_on_page(3)
        .into_iter()
        .map(|v| v.name)
        .collect();
    assert_eq!(last, vec!["address.city"]);
    assert!(session.field_views_on_page(2).is_empty());
}

#[test]
fn test_current_page_widgets_follow_cursor() {
    let mut session = ready_session(2);
    let names: Vec<String> = session
        .current_page_widgets()
        .unwrap()
        .into_iter()
        .map(|w| w.field_name)
        .collect();
    assert_eq!(names, vec!["name", "agree", "locked"]);

    session.next_page();
    let widgets = session.current_page_widgets().unwrap();
    assert_eq!(widgets.len(), 1);
    assert_eq!(widgets[0].field_name, "address.city");
    assert_eq!(widgets[0].page, 2);
}

#[test]
fn test_second_load_resets_values_and_cursor() {
    let mut session = ready_session(3);
    session.next_page();
    session.next_page();
    session.set_field("name", "Somchai").unwrap();

    session.load(pdf_file("other.pdf", 2)).unwrap();

    assert_eq!(session.current_page(), 1);
    assert_eq!(session.page_count(), 2);
    assert_eq!(session.field_value("name"), Some(""));
    assert_eq!(session.file_name(), Some("other.pdf"));
}

#[test]
fn test_selection_clears_values_before_load_completes() {
    let mut session = ready_session(3);
    session.set_field("name", "Somchai").unwrap();
    session.next_page();

    let Selection::Accepted(ticket) = session.select_file("next.pdf", "application/pdf") else {
        panic!("PDF should be accepted");
    };
    assert_eq!(session.state(), &SessionState::Loading { ticket });
    assert!(session.values().is_empty());
    assert_eq!(session.current_page(), 1);
    assert_eq!(session.page_count(), 0);
}

#[test]
fn test_edit_upserts_single_key() {
    let mut session = ready_session(2);
    let before = session.values().clone();

    session.set_field("name", "Somchai").unwrap();

    assert_eq!(session.field_value("name"), Some("Somchai"));
    for (key, value) in before.iter().filter(|(k, _)| *k != "name") {
        assert_eq!(session.field_value(key), Some(value));
    }
    assert_eq!(session.values().len(), before.len());

    session.set_field("name", "Malee").unwrap();
    assert_eq!(session.field_value("name"), Some("Malee"));
}

#[test]
fn test_edit_rejects_unknown_and_read_only() {
    let mut session = ready_session(1);
    let err = session.set_field("nope", "x").unwrap_err();
    assert!(matches!(err, SessionError::UnknownField(ref n) if n == "nope"));

    let err = session.set_field("locked", "x").unwrap_err();
    assert!(matches!(err, SessionError::ReadOnlyField(_)));
    assert_eq!(session.field_value("locked"), None);
}

#[test]
fn test_edit_requires_ready() {
    let mut session = Session::default();
    let err = session.set_field("name", "x").unwrap_err();
    assert!(matches!(err, SessionError::NotReady("empty")));

    session.select_file("form.pdf", "application/pdf");
    let err = session.set_field("name", "x").unwrap_err();
    assert!(matches!(err, SessionError::NotReady("loading")));
}

#[test]
fn test_parse_failure_is_reported() {
    let mut session = Session::default();
    let err = session
        .load(SelectedFile::new(
            "fake.pdf",
            "application/pdf",
            b"this is not a pdf".to_vec(),
        ))
        .unwrap_err();
    assert!(matches!(err, SessionError::Parse(_)));
    assert!(matches!(session.state(), SessionState::Failed { .. }));
    assert_eq!(session.page_count(), 0);

    // A good file recovers the session
    session.load(pdf_file("form.pdf", 2)).unwrap();
    assert!(session.is_ready());
}

#[test]
fn test_newest_selection_wins() {
    let mut session = Session::default();
    let Selection::Accepted(first) = session.select_file("first.pdf", "application/pdf") else {
        panic!("accepted");
    };
    let Selection::Accepted(second) = session.select_file("second.pdf", "application/pdf") else {
        panic!("accepted");
    };
    assert!(second > first);

    // Second finishes first
    let outcome = session.finish_load(second, create_form_pdf(2)).unwrap();
    assert!(matches!(outcome, LoadOutcome::Ready { page_count: 2, .. }));

    // The older load arriving late changes nothing
    let outcome = session.finish_load(first, create_form_pdf(5)).unwrap();
    assert_eq!(outcome, LoadOutcome::Stale);
    assert_eq!(session.page_count(), 2);
    assert_eq!(session.file_name(), Some("second.pdf"));
}

#[test]
fn test_stale_failure_is_ignored() {
    let mut session = Session::default();
    let Selection::Accepted(first) = session.select_file("a.pdf", "application/pdf") else {
        panic!("accepted");
    };
    let Selection::Accepted(second) = session.select_file("b.pdf", "application/pdf") else {
        panic!("accepted");
    };

    assert!(!session.fail_load(first, "read error"));
    assert_eq!(session.state(), &SessionState::Loading { ticket: second });

    // A stale parse failure is not an error either
    let outcome = session.finish_load(first, b"garbage".to_vec()).unwrap();
    assert_eq!(outcome, LoadOutcome::Stale);

    assert!(session.fail_load(second, "read error"));
    assert_eq!(
        session.state(),
        &SessionState::Failed {
            error: "read error".to_string()
        }
    );
}

#[test]
fn test_export_without_edits_returns_original() {
    let original = create_form_pdf(2);
    let mut session = Session::default();
    session
        .load(SelectedFile::new("form.pdf", "application/pdf", original.clone()))
        .unwrap();

    let exported = session.export(None).unwrap();
    assert!(!exported.modified());
    assert_eq!(exported.bytes, original);
    assert_eq!(exported.filename, "form-filled.pdf");
    assert_eq!(exported.media_type, "application/pdf");
}

#[test]
fn test_export_writes_edits() {
    let original = create_form_pdf(2);
    let mut session = Session::default();
    session
        .load(SelectedFile::new("form.pdf", "application/pdf", original.clone()))
        .unwrap();
    session.set_field("name", "Somchai").unwrap();
    session.set_field("address.city", "Bangkok").unwrap();
    session.set_field("agree", "yes").unwrap();

    let exported = session.export(Some("done.pdf")).unwrap();
    assert!(exported.modified());
    assert_ne!(exported.bytes, original);
    assert_eq!(exported.filename, "done.pdf");
    assert_eq!(exported.applied, vec!["address.city", "agree", "name"]);

    let reopened = PdfDocument::open_from_bytes(&exported.bytes).unwrap();
    let value = |name: &str| reopened.field(name).unwrap().unwrap().value;
    assert_eq!(value("name").as_deref(), Some("Somchai"));
    assert_eq!(value("address.city").as_deref(), Some("Bangkok"));
    assert_eq!(value("agree").as_deref(), Some("Yes"));
    assert_eq!(value("locked").as_deref(), Some("fixed"));
}

#[test]
fn test_export_reverted_edit_is_unmodified() {
    let mut session = ready_session(1);
    session.set_field("name", "temp").unwrap();
    session.set_field("name", "").unwrap();
    let exported = session.export(None).unwrap();
    assert!(!exported.modified());
}

#[test]
fn test_export_is_repeatable() {
    let mut session = ready_session(1);
    session.set_field("name", "Somchai").unwrap();
    let first = session.export(None).unwrap();
    let second = session.export(None).unwrap();
    assert_eq!(first.applied, second.applied);
    // The session keeps its original bytes; exports never feed back
    assert_ne!(session.document_bytes().unwrap(), first.bytes.as_slice());
}

#[test]
fn test_export_invalid_button_state_fails() {
    let mut session = ready_session(1);
    session.set_field("agree", "perhaps").unwrap();
    let err = session.export(None).unwrap_err();
    assert!(matches!(err, SessionError::Pdf(_)));
}

#[test]
fn test_export_requires_ready() {
    let session = Session::default();
    assert!(matches!(
        session.export(None).unwrap_err(),
        SessionError::NotReady("empty")
    ));
}

#[test]
fn test_export_filename_from_config() {
    let config = SessionConfig::default().with_default_export_name("configured");
    let mut session = Session::new(config);
    session.load(pdf_file("form.pdf", 1)).unwrap();
    // An empty name, as a save button's value would be
    assert_eq!(session.export(Some("")).unwrap().filename, "configured.pdf");
}

#[test]
fn test_export_without_appearance_regeneration() {
    let config = SessionConfig {
        regenerate_appearances: false,
        ..SessionConfig::default()
    };
    let mut session = Session::new(config);
    session.load(pdf_file("form.pdf", 1)).unwrap();
    session.set_field("name", "Somchai").unwrap();
    let exported = session.export(None).unwrap();

    let reopened = PdfDocument::open_from_bytes(&exported.bytes).unwrap();
    let widget = reopened.page_widgets(1).unwrap()[0].object_id;
    let dict = reopened.inner().get_dictionary(widget).unwrap();
    assert!(!dict.has(b"AP"));
}

#[test]
fn test_render_worker_src_is_injected() {
    let config = SessionConfig::default().with_render_worker_src("http://localhost/worker.js");
    let session = Session::new(config);
    assert_eq!(
        session.config().render_worker_src.as_deref(),
        Some("http://localhost/worker.js")
    );
}
