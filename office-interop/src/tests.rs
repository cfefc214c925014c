//! End-to-end behaviour against the in-memory host.

use std::cell::Cell;
use std::rc::Rc;

use crate::convert::SaveOptions;
use crate::error::InteropError;
use crate::events::{ApplicationEvent, EventKind};
use crate::native::codes;
use crate::powerpoint::SlideLayout;
use crate::testing::FakeHost;
use crate::wrapper::{Dispose, Wrapper};

#[test]
fn disposing_a_document_disposes_its_cached_collections() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &["one", "two"]);
    let paragraphs = host.object(doc, "Paragraphs");
    let shapes = host.object(doc, "Shapes");
    let windows = host.object(doc, "Windows");
    let app = host.application().unwrap();

    let document = app.documents().unwrap().item(0).unwrap();
    assert_eq!(document.paragraphs().unwrap().count().unwrap(), 2);
    assert_eq!(document.shapes().unwrap().count().unwrap(), 0);
    assert_eq!(document.windows().unwrap().count().unwrap(), 1);
    for id in [doc, paragraphs, shapes, windows] {
        assert_eq!(host.live_references(id), 1);
    }

    document.dispose();
    for id in [doc, paragraphs, shapes, windows] {
        assert_eq!(host.live_references(id), 0, "object {id} still referenced");
    }
    assert!(matches!(
        document.paragraphs().unwrap_err(),
        InteropError::Disposed { type_name: "Document" }
    ));
}

#[test]
fn parent_is_not_owned_by_the_child() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &["one"]);
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();
    let paragraph = document.paragraphs().unwrap().item(0).unwrap();

    let parent = paragraph.parent().unwrap().unwrap();
    assert_eq!(parent.get_string("Name").unwrap(), "a.docx");
    assert_eq!(host.live_references(doc), 2);

    paragraph.dispose();
    assert_eq!(host.live_references(doc), 2, "disposing a child leaves its parent alone");
    parent.dispose();
    assert_eq!(host.live_references(doc), 1);
    assert_eq!(document.name().unwrap(), "a.docx");
}

#[test]
fn missing_active_objects_read_as_none() {
    let host = FakeHost::word();
    let app = host.application().unwrap();
    assert!(app.active_document().unwrap().is_none());
    assert!(app.active_window().unwrap().is_none());
    assert!(app.selection().unwrap().is_none());

    host.add_document("a.docx", &["one"]);
    let document = app.active_document().unwrap().unwrap();
    assert_eq!(document.name().unwrap(), "a.docx");
    let window = app.active_window().unwrap().unwrap();
    assert_eq!(window.caption().unwrap(), "a.docx");
    assert!(app.selection().unwrap().unwrap().is_collapsed().unwrap());
}

#[test]
fn unrelated_active_object_faults_still_surface() {
    let host = FakeHost::word();
    host.add_document("a.docx", &[]);
    host.fail(host.app_id(), "ActiveDocument", crate::native::codes::RPC_E_CALL_REJECTED);
    let app = host.application().unwrap();
    let err = app.active_document().unwrap_err();
    assert_eq!(err.native_code(), Some(crate::native::codes::RPC_E_CALL_REJECTED));
}

#[test]
fn out_of_range_indices_never_reach_the_host() {
    let host = FakeHost::word();
    host.add_document("a.docx", &[]);
    host.add_document("b.docx", &[]);
    let app = host.application().unwrap();
    let docs = app.documents().unwrap();

    assert_eq!(docs.item(1).unwrap().name().unwrap(), "b.docx");
    for index in [-1, 2, i32::MAX] {
        assert!(matches!(
            docs.item(index).unwrap_err(),
            InteropError::OutOfRange { count: 2, .. }
        ));
    }
    assert_eq!(host.out_of_range_accesses(), 0);
    assert_eq!(docs.first().unwrap().unwrap().name().unwrap(), "a.docx");
    assert_eq!(docs.last().unwrap().unwrap().name().unwrap(), "b.docx");
}

#[test]
fn delete_many_removes_from_the_back() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &["1", "2", "3", "4", "5"]);
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();
    let paragraphs = document.paragraphs().unwrap();

    let report = paragraphs.delete_many(&[1, 2, 2]).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.succeeded, 2);
    let left: Vec<String> = paragraphs.iter().map(|p| p.unwrap().text().unwrap()).collect();
    assert_eq!(left, ["1", "4", "5"]);

    assert!(matches!(
        paragraphs.delete_many(&[0, 9]).unwrap_err(),
        InteropError::OutOfRange { index: 9, count: 3 }
    ));
    assert_eq!(paragraphs.count().unwrap(), 3, "nothing deleted when any index is invalid");
    assert_eq!(host.members(host.object(doc, "Paragraphs")).len(), 3);
}

#[test]
fn iteration_sees_members_added_midway() {
    let host = FakeHost::word();
    host.add_document("a.docx", &["one", "two"]);
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();
    let paragraphs = document.paragraphs().unwrap();

    let mut seen = 0;
    for paragraph in &*paragraphs {
        let paragraph = paragraph.unwrap();
        if seen == 0 {
            paragraphs.append().unwrap().dispose();
        }
        paragraph.dispose();
        seen += 1;
    }
    assert_eq!(seen, 3);
}

#[test]
fn dropping_one_wrapper_leaves_its_siblings_live() {
    let host = FakeHost::word();
    let a = host.add_document("a.docx", &[]);
    let b = host.add_document("b.docx", &[]);
    let app = host.application().unwrap();
    let docs = app.documents().unwrap();
    let first = docs.item(0).unwrap();
    let second = docs.item(1).unwrap();

    drop(first);
    assert_eq!(host.live_references(a), 0);
    assert_eq!(host.live_references(b), 1);
    assert_eq!(second.name().unwrap(), "b.docx");
}

#[test]
fn disposed_cached_child_is_rebuilt_on_next_access() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &["one"]);
    let paragraphs = host.object(doc, "Paragraphs");
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();

    document.paragraphs().unwrap().dispose();
    assert_eq!(host.live_references(paragraphs), 0);
    assert_eq!(document.paragraphs().unwrap().count().unwrap(), 1);
    assert_eq!(host.live_references(paragraphs), 1);
}

#[test]
fn disposing_a_cached_collection_leaves_its_document_usable() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &["one"]);
    let shapes_id = host.object(doc, "Shapes");
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();

    let added: Vec<_> = {
        let shapes = document.shapes().unwrap();
        (0..3)
            .map(|i| {
                let shape = shapes
                    .add_textbox(crate::convert::TextOrientation::Horizontal, (0.0, f64::from(i) * 40.0, 100.0, 30.0))
                    .unwrap();
                shape.set_text(&format!("box {i}")).unwrap();
                shape
            })
            .collect()
    };
    let members = host.members(shapes_id);
    assert_eq!(members.len(), 3);
    for &id in &members {
        assert_eq!(host.live_references(id), 1);
    }

    document.shapes().unwrap().dispose();
    assert_eq!(host.live_references(shapes_id), 0);
    assert_eq!(host.live_references(doc), 1);
    assert!(!document.is_disposed());
    assert_eq!(document.name().unwrap(), "a.docx");

    // Members handed out by the collection belong to the caller.
    assert_eq!(added[2].text().unwrap(), "box 2");
    for shape in &added {
        shape.dispose();
    }
    for &id in &members {
        assert_eq!(host.live_references(id), 0, "shape {id} still referenced");
        assert_eq!(host.releases(id), 1);
    }

    assert_eq!(document.shapes().unwrap().count().unwrap(), 3);
    assert_eq!(host.live_references(shapes_id), 1);
    assert_eq!(host.live_references(doc), 1);
}

#[test]
fn live_wrapper_count_tracks_outstanding_references() {
    let host = FakeHost::word();
    host.add_document("a.docx", &[]);
    let app = host.application().unwrap();
    assert_eq!(app.live_wrappers(), 0);

    let document = app.documents().unwrap().item(0).unwrap();
    assert_eq!(app.live_wrappers(), 2);
    let window = document.windows().unwrap().item(0).unwrap();
    assert_eq!(app.live_wrappers(), 4);

    window.dispose();
    document.dispose();
    assert_eq!(app.live_wrappers(), 1, "the cached Documents collection remains");

    app.dispose();
    assert_eq!(host.live_references(host.app_id()), 0);
    assert_eq!(host.total_live_references(), 0);
}

#[test]
fn wrappers_outliving_the_application_are_still_released() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &[]);
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();

    drop(app);
    assert_eq!(host.live_references(doc), 1);
    assert!(document.application().is_err());
    drop(document);
    assert_eq!(host.total_live_references(), 0);
}

#[test]
fn close_disposes_the_document() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &["one"]);
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();
    let _ = document.paragraphs().unwrap();

    document.close(SaveOptions::DoNotSaveChanges).unwrap();
    assert!(document.is_disposed());
    assert!(host.is_deleted(doc));
    assert_eq!(host.live_references(host.object(doc, "Paragraphs")), 0);
    assert_eq!(app.documents().unwrap().count().unwrap(), 0);
}

#[test]
fn event_advise_follows_handler_count() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &[]);
    let app = host.application().unwrap();
    let first_calls = Rc::new(Cell::new(0));
    let second_calls = Rc::new(Cell::new(0));

    let counter = Rc::clone(&first_calls);
    let first = app
        .subscribe(EventKind::DocumentOpen, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();
    let counter = Rc::clone(&second_calls);
    let second = app
        .subscribe(EventKind::DocumentOpen, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        })
        .unwrap();
    assert_eq!(host.subscriptions_for(EventKind::DocumentOpen), 1);
    assert_eq!(app.handler_count(EventKind::DocumentOpen), 2);

    host.fire(EventKind::DocumentOpen, &[doc]);
    assert_eq!((first_calls.get(), second_calls.get()), (1, 1));

    assert!(app.unsubscribe(first).unwrap());
    assert!(!app.unsubscribe(first).unwrap());
    assert!(app.is_advised(EventKind::DocumentOpen));

    host.fire(EventKind::DocumentOpen, &[doc]);
    assert_eq!((first_calls.get(), second_calls.get()), (1, 2));

    assert!(app.unsubscribe(second).unwrap());
    assert!(!app.is_advised(EventKind::DocumentOpen));
    assert_eq!(host.subscriptions(), 0);

    host.fire(EventKind::DocumentOpen, &[doc]);
    assert_eq!((first_calls.get(), second_calls.get()), (1, 2));
}

#[test]
fn failed_unadvise_keeps_the_registration() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &[]);
    let app = host.application().unwrap();

    let first = app.subscribe(EventKind::DocumentOpen, |_| Ok(())).unwrap();
    host.fail(host.app_id(), "Unadvise", codes::RPC_E_CALL_REJECTED);
    let err = app.unsubscribe(first).unwrap_err();
    assert_eq!(err.native_code(), Some(codes::RPC_E_CALL_REJECTED));
    assert_eq!(app.handler_count(EventKind::DocumentOpen), 0);
    assert!(app.is_advised(EventKind::DocumentOpen));
    host.clear_fault(host.app_id(), "Unadvise");

    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    app.subscribe(EventKind::DocumentOpen, move |_| {
        counter.set(counter.get() + 1);
        Ok(())
    })
    .unwrap();
    assert_eq!(host.subscriptions_for(EventKind::DocumentOpen), 1);

    host.fire(EventKind::DocumentOpen, &[doc]);
    assert_eq!(calls.get(), 1);

    app.dispose();
    assert_eq!(host.subscriptions(), 0);
}

#[test]
fn shutdown_retries_an_unadvise_that_failed_earlier() {
    let host = FakeHost::word();
    let app = host.application().unwrap();

    let id = app.subscribe(EventKind::Quit, |_| Ok(())).unwrap();
    host.fail(host.app_id(), "Unadvise", codes::RPC_E_SERVERCALL_RETRYLATER);
    assert!(app.unsubscribe(id).is_err());
    assert_eq!(host.subscriptions(), 1);
    host.clear_fault(host.app_id(), "Unadvise");

    app.dispose();
    assert_eq!(host.subscriptions(), 0);
    assert!(!app.is_advised(EventKind::Quit));
}

#[test]
fn disposing_the_application_unadvises_everything() {
    let host = FakeHost::word();
    let app = host.application().unwrap();
    app.subscribe(EventKind::Quit, |_| Ok(())).unwrap();
    app.subscribe(EventKind::DocumentChange, |_| Ok(())).unwrap();
    assert_eq!(host.subscriptions(), 2);

    app.dispose();
    assert_eq!(host.subscriptions(), 0);
    assert_eq!(app.handler_count(EventKind::Quit), 0);
}

#[test]
fn failing_handlers_do_not_stop_delivery() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &[]);
    let app = host.application().unwrap();
    let names = Rc::new(std::cell::RefCell::new(Vec::new()));

    app.subscribe(EventKind::DocumentOpen, |_| panic!("handler bug")).unwrap();
    app.subscribe(EventKind::DocumentOpen, |_| Err(anyhow::anyhow!("handler error")))
        .unwrap();
    let sink = Rc::clone(&names);
    app.subscribe(EventKind::DocumentOpen, move |event| {
        if let ApplicationEvent::DocumentOpen(document) = event {
            sink.borrow_mut().push(document.name()?);
        }
        Ok(())
    })
    .unwrap();

    host.fire(EventKind::DocumentOpen, &[doc]);
    assert_eq!(*names.borrow(), ["a.docx"]);
    assert_eq!(host.live_references(doc), 0, "event arguments are released after delivery");
}

#[test]
fn handler_may_unsubscribe_itself() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &[]);
    let window = host.members(host.object(doc, "Windows"))[0];
    let app = host.application().unwrap();
    let calls = Rc::new(Cell::new(0));
    let own_id = Rc::new(Cell::new(None));

    let (counter, id_slot) = (Rc::clone(&calls), Rc::clone(&own_id));
    let id = app
        .subscribe(EventKind::WindowActivate, move |event| {
            counter.set(counter.get() + 1);
            let document = event.document().ok_or_else(|| anyhow::anyhow!("no document"))?;
            if let Some(id) = id_slot.get() {
                document.application()?.unsubscribe(id)?;
            }
            Ok(())
        })
        .unwrap();
    own_id.set(Some(id));

    host.fire(EventKind::WindowActivate, &[doc, window]);
    host.fire(EventKind::WindowActivate, &[doc, window]);
    assert_eq!(calls.get(), 1);
    assert_eq!(host.subscriptions(), 0);
}

#[test]
fn malformed_events_are_dropped() {
    let host = FakeHost::word();
    let app = host.application().unwrap();
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    app.subscribe(EventKind::NewDocument, move |_| {
        counter.set(counter.get() + 1);
        Ok(())
    })
    .unwrap();

    host.fire_raw(EventKind::NewDocument, Vec::new);
    host.fire_raw(EventKind::NewDocument, || vec![crate::native::Variant::Int(4)]);
    assert_eq!(calls.get(), 0);
}

#[test]
fn before_close_is_delivered_with_its_cancel_flag() {
    let host = FakeHost::word();
    let doc = host.add_document("a.docx", &[]);
    let app = host.application().unwrap();
    let closing = Rc::new(std::cell::RefCell::new(Vec::new()));

    let sink = Rc::clone(&closing);
    app.subscribe(EventKind::DocumentBeforeClose, move |event| {
        if let ApplicationEvent::DocumentBeforeClose(document) = event {
            sink.borrow_mut().push(document.name()?);
        }
        Ok(())
    })
    .unwrap();

    host.fire_raw(EventKind::DocumentBeforeClose, || {
        vec![crate::native::Variant::Object(host.handle(doc)), crate::native::Variant::Bool(false)]
    });
    assert_eq!(*closing.borrow(), ["a.docx"]);
    assert_eq!(host.live_references(doc), 0);
}

#[test]
fn powerpoint_events_are_unsupported() {
    let host = FakeHost::powerpoint();
    let app = host.application().unwrap();
    let err = app.subscribe(EventKind::Quit, |_| Ok(())).unwrap_err();
    assert!(matches!(err, InteropError::Unsupported(_)));
    assert_eq!(host.subscriptions(), 0);
}

#[test]
fn advise_failure_leaves_no_handler_behind() {
    let host = FakeHost::word();
    host.fail(host.app_id(), "Advise", crate::native::codes::E_ACCESSDENIED);
    let app = host.application().unwrap();
    assert!(app.subscribe(EventKind::Quit, |_| Ok(())).is_err());
    assert_eq!(app.handler_count(EventKind::Quit), 0);
    assert!(!app.is_advised(EventKind::Quit));

    host.clear_fault(host.app_id(), "Advise");
    app.subscribe(EventKind::Quit, |_| Ok(())).unwrap();
    assert_eq!(host.subscriptions(), 1);
}

#[test]
fn slides_insert_validates_position() {
    let host = FakeHost::powerpoint();
    host.add_presentation("deck.pptx", 2);
    let app = host.application().unwrap();
    let deck = app.presentations().unwrap().item(0).unwrap();
    let slides = deck.slides().unwrap();

    let inserted = slides.insert(2, SlideLayout::Blank).unwrap();
    assert_eq!(inserted.slide_index().unwrap(), 3);
    assert_eq!(inserted.layout().unwrap(), SlideLayout::Blank);
    let front = slides.insert(0, SlideLayout::Title).unwrap();
    assert_eq!(front.slide_index().unwrap(), 1);

    assert!(matches!(
        slides.insert(5, SlideLayout::Blank).unwrap_err(),
        InteropError::OutOfRange { index: 5, count: 4 }
    ));
    assert_eq!(host.out_of_range_accesses(), 0);
}

#[test]
fn shapes_round_trip_text_through_the_text_frame() {
    let host = FakeHost::word();
    host.add_document("a.docx", &[]);
    let app = host.application().unwrap();
    let document = app.documents().unwrap().item(0).unwrap();
    let shapes = document.shapes().unwrap();

    let shape = shapes
        .add_textbox(crate::convert::TextOrientation::Horizontal, (10.0, 10.0, 200.0, 50.0))
        .unwrap();
    shape.set_text("Hello").unwrap();
    assert_eq!(shape.text().unwrap(), "Hello");
    assert!(shape.has_text_frame().unwrap());
    assert_eq!(shapes.count().unwrap(), 1);

    shape.delete().unwrap();
    assert_eq!(shapes.count().unwrap(), 0);
}
