//! Word object model slice.

mod document;
mod range;
mod window;

pub use document::{Document, PageSetup};
pub use range::{Font, Paragraph, Range};
pub use window::{Selection, Window};

use crate::collection::Collection;
use crate::error::InteropResult;
use crate::native::{NativeObject, Variant};
use crate::wrapper::Wrapper as _;

pub type Documents<H> = Collection<H, Document<H>>;
pub type Paragraphs<H> = Collection<H, Paragraph<H>>;
pub type Windows<H> = Collection<H, Window<H>>;

impl<H: NativeObject> Collection<H, Document<H>> {
    /// Creates a blank document.
    pub fn create(&self) -> InteropResult<Document<H>> {
        self.add(&[])
    }

    /// `Documents.Open(FileName, ConfirmConversions, ReadOnly)`.
    pub fn open(&self, path: &str, read_only: bool) -> InteropResult<Document<H>> {
        let args = [
            Variant::from(path),
            Variant::Bool(false),
            Variant::Bool(read_only),
        ];
        self.core().required_call("Open", &args)
    }
}

impl<H: NativeObject> Collection<H, Paragraph<H>> {
    /// Appends an empty paragraph at the end of the document.
    pub fn append(&self) -> InteropResult<Paragraph<H>> {
        self.add(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{Orientation, PaperSize, TriState, WindowState};
    use crate::application::Application;
    use crate::testing::{FakeHandle, FakeHost, Value};
    use crate::wrapper::Dispose;

    fn first_document(host: &FakeHost) -> (Application<FakeHandle>, Document<FakeHandle>) {
        let app = host.application().unwrap();
        let document = app.documents().unwrap().item(0).unwrap();
        (app, document)
    }

    #[test]
    fn page_setup_is_read_through_a_transient_wrapper() {
        let host = FakeHost::word();
        let doc = host.add_document("a.docx", &[]);
        let setup = host.property(doc, "PageSetup").and_then(|v| v.as_object()).unwrap();
        let (_app, document) = first_document(&host);

        assert_eq!(document.orientation().unwrap(), Orientation::Portrait);
        assert_eq!(document.paper_size().unwrap(), PaperSize::Letter);
        document.set_orientation(Orientation::Landscape).unwrap();
        document.set_paper_size(PaperSize::A4).unwrap();
        assert_eq!(host.property(setup, "Orientation"), Some(Value::Int(1)));
        assert_eq!(host.property(setup, "PaperSize"), Some(Value::Int(7)));
        assert_eq!(host.live_references(setup), 0);
    }

    #[test]
    fn range_editing() {
        let host = FakeHost::word();
        host.add_document("a.docx", &["middle"]);
        let (_app, document) = first_document(&host);
        let content = document.content().unwrap();

        content.insert_before("<").unwrap();
        content.insert_after(">").unwrap();
        assert_eq!(content.text().unwrap(), "<middle\r>");
        assert_eq!(content.bold().unwrap(), TriState::False);
        content.set_bold(true).unwrap();
        assert_eq!(content.bold().unwrap(), TriState::True);

        let font = content.font().unwrap();
        assert_eq!(font.name().unwrap(), "Calibri");
        font.set_size(14.0).unwrap();
        assert!((font.size().unwrap() - 14.0).abs() < f64::EPSILON);

        content.delete().unwrap();
        assert_eq!(content.text().unwrap(), "");

        let span = document.range(2, 5).unwrap();
        assert_eq!((span.start().unwrap(), span.end().unwrap()), (2, 5));
    }

    #[test]
    fn mixed_bold_reads_as_mixed() {
        let host = FakeHost::word();
        let doc = host.add_document("a.docx", &["x"]);
        let content = host.property(doc, "Content").and_then(|v| v.as_object()).unwrap();
        host.set_property(content, "Bold", Value::Int(crate::convert::WD_UNDEFINED));
        let (_app, document) = first_document(&host);
        assert_eq!(document.content().unwrap().bold().unwrap(), TriState::Mixed);
    }

    #[test]
    fn create_open_and_save_as() {
        let host = FakeHost::word();
        let app = host.application().unwrap();
        let documents = app.documents().unwrap();

        let blank = documents.create().unwrap();
        assert_eq!(blank.name().unwrap(), "Document1");
        blank.save_as("C:\\out\\blank.docx").unwrap();
        assert_eq!(blank.full_name().unwrap(), "C:\\out\\blank.docx");
        assert!(blank.saved().unwrap());

        let opened = documents.open("C:\\in\\report.docx", true).unwrap();
        assert_eq!(opened.name().unwrap(), "report.docx");
        assert_eq!(documents.count().unwrap(), 2);

        let paragraph = opened.paragraphs().unwrap().append().unwrap();
        assert_eq!(paragraph.text().unwrap(), "");
        paragraph.delete().unwrap();
        assert_eq!(opened.paragraphs().unwrap().count().unwrap(), 1);
    }

    #[test]
    fn windows_and_selection() {
        let host = FakeHost::word();
        host.add_document("a.docx", &[]);
        let (app, document) = first_document(&host);

        let window = document.windows().unwrap().item(0).unwrap();
        assert_eq!(window.window_state().unwrap(), WindowState::Normal);
        window.set_window_state(WindowState::Maximize).unwrap();
        assert_eq!(window.window_state().unwrap(), WindowState::Maximize);
        window.activate().unwrap();

        let shown = window.document().unwrap();
        assert_eq!(shown.name().unwrap(), "a.docx");
        shown.dispose();

        let selection = app.selection().unwrap().unwrap();
        selection.type_text("typed").unwrap();
        assert_eq!(selection.text().unwrap(), "typed");
        assert_eq!(selection.range().unwrap().text().unwrap(), "");
    }
}
