use std::cell::Ref;

use crate::convert::{Orientation, PaperSize, SaveOptions, to_native};
use crate::error::InteropResult;
use crate::native::{NativeObject, Variant};
use crate::shape::Shapes;
use crate::word::{Paragraphs, Range, Windows};
use crate::wrapper::{Dispose, define_wrapper};

define_wrapper! {
    /// A Word document.
    ///
    /// Owns its `Paragraphs`, `Shapes` and `Windows` collections once they
    /// have been requested; disposing the document disposes them first.
    Document = "Document", collection = "Documents", owns {
        paragraphs: Paragraphs<H>,
        shapes: Shapes<H>,
        windows: Windows<H>,
    }
}

impl<H: NativeObject> Document<H> {
    pub fn name(&self) -> InteropResult<String> {
        self.core.get_string("Name")
    }

    pub fn full_name(&self) -> InteropResult<String> {
        self.core.get_string("FullName")
    }

    /// `false` when there are unsaved changes.
    pub fn saved(&self) -> InteropResult<bool> {
        self.core.get_bool("Saved")
    }

    pub fn set_saved(&self, saved: bool) -> InteropResult<()> {
        self.core.put("Saved", saved)
    }

    /// The main story as a fresh range.
    pub fn content(&self) -> InteropResult<Range<H>> {
        self.core.required_child("Content")
    }

    /// Character range `start..end` of the main story.
    pub fn range(&self, start: i32, end: i32) -> InteropResult<Range<H>> {
        self.core
            .required_call("Range", &[Variant::Int(start), Variant::Int(end)])
    }

    pub fn paragraphs(&self) -> InteropResult<Ref<'_, Paragraphs<H>>> {
        self.paragraphs
            .get_or_try_init(|| self.core.required_child("Paragraphs"))
    }

    pub fn shapes(&self) -> InteropResult<Ref<'_, Shapes<H>>> {
        self.shapes
            .get_or_try_init(|| self.core.required_child("Shapes"))
    }

    pub fn windows(&self) -> InteropResult<Ref<'_, Windows<H>>> {
        self.windows
            .get_or_try_init(|| self.core.required_child("Windows"))
    }

    pub fn page_setup(&self) -> InteropResult<PageSetup<H>> {
        self.core.required_child("PageSetup")
    }

    pub fn orientation(&self) -> InteropResult<Orientation> {
        self.with_page_setup(|setup| setup.orientation())
    }

    pub fn set_orientation(&self, orientation: Orientation) -> InteropResult<()> {
        self.with_page_setup(|setup| setup.set_orientation(orientation))
    }

    pub fn paper_size(&self) -> InteropResult<PaperSize> {
        self.with_page_setup(|setup| setup.paper_size())
    }

    pub fn set_paper_size(&self, size: PaperSize) -> InteropResult<()> {
        self.with_page_setup(|setup| setup.set_paper_size(size))
    }

    fn with_page_setup<R>(&self, op: impl FnOnce(&PageSetup<H>) -> InteropResult<R>) -> InteropResult<R> {
        let setup = self.page_setup()?;
        let result = op(&setup);
        setup.dispose();
        result
    }

    pub fn activate(&self) -> InteropResult<()> {
        self.core.call("Activate", &[]).map(drop)
    }

    pub fn save(&self) -> InteropResult<()> {
        self.core.call("Save", &[]).map(drop)
    }

    pub fn save_as(&self, path: &str) -> InteropResult<()> {
        self.core.call("SaveAs2", &[Variant::from(path)]).map(drop)
    }

    /// Closes the document in the host, then disposes this wrapper.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::Native`](crate::InteropError::Native) when the host refuses to close; the
    /// wrapper stays live so the caller can retry or dispose it.
    pub fn close(&self, save: SaveOptions) -> InteropResult<()> {
        self.core
            .call("Close", &[Variant::Int(to_native(save))])?;
        self.dispose();
        Ok(())
    }
}

define_wrapper! {
    /// Page layout of a document or section.
    PageSetup = "PageSetup"
}

impl<H: NativeObject> PageSetup<H> {
    pub fn orientation(&self) -> InteropResult<Orientation> {
        self.core.get_enum("Orientation")
    }

    pub fn set_orientation(&self, orientation: Orientation) -> InteropResult<()> {
        self.core.put_enum("Orientation", orientation)
    }

    pub fn paper_size(&self) -> InteropResult<PaperSize> {
        self.core.get_enum("PaperSize")
    }

    pub fn set_paper_size(&self, size: PaperSize) -> InteropResult<()> {
        self.core.put_enum("PaperSize", size)
    }

    /// Top margin in points.
    pub fn top_margin(&self) -> InteropResult<f64> {
        self.core.get_f64("TopMargin")
    }
}
