use crate::convert::{TriState, to_tri_state};
use crate::error::InteropResult;
use crate::native::{NativeObject, Variant};
use crate::wrapper::define_wrapper;

define_wrapper! {
    /// A contiguous span of a story.
    Range = "Range"
}

impl<H: NativeObject> Range<H> {
    pub fn text(&self) -> InteropResult<String> {
        self.core.get_string("Text")
    }

    pub fn set_text(&self, text: &str) -> InteropResult<()> {
        self.core.put("Text", text)
    }

    pub fn start(&self) -> InteropResult<i32> {
        self.core.get_i32("Start")
    }

    pub fn end(&self) -> InteropResult<i32> {
        self.core.get_i32("End")
    }

    /// `Mixed` when only part of the range is bold.
    pub fn bold(&self) -> InteropResult<TriState> {
        self.core.get_i32("Bold").map(TriState::from_font_value)
    }

    pub fn set_bold(&self, bold: bool) -> InteropResult<()> {
        self.core.put_enum("Bold", to_tri_state(bold))
    }

    pub fn font(&self) -> InteropResult<Font<H>> {
        self.core.required_child("Font")
    }

    pub fn insert_after(&self, text: &str) -> InteropResult<()> {
        self.core.call("InsertAfter", &[Variant::from(text)]).map(drop)
    }

    pub fn insert_before(&self, text: &str) -> InteropResult<()> {
        self.core.call("InsertBefore", &[Variant::from(text)]).map(drop)
    }

    pub fn delete(&self) -> InteropResult<()> {
        self.core.call("Delete", &[]).map(drop)
    }
}

define_wrapper! {
    /// Character formatting of a range.
    Font = "Font"
}

impl<H: NativeObject> Font<H> {
    pub fn name(&self) -> InteropResult<String> {
        self.core.get_string("Name")
    }

    pub fn set_name(&self, name: &str) -> InteropResult<()> {
        self.core.put("Name", name)
    }

    /// Size in points.
    pub fn size(&self) -> InteropResult<f64> {
        self.core.get_f64("Size")
    }

    pub fn set_size(&self, points: f64) -> InteropResult<()> {
        self.core.put("Size", points)
    }
}

define_wrapper! {
    Paragraph = "Paragraph", collection = "Paragraphs"
}

impl<H: NativeObject> Paragraph<H> {
    pub fn range(&self) -> InteropResult<Range<H>> {
        self.core.required_child("Range")
    }

    /// Paragraph text without the trailing paragraph mark.
    pub fn text(&self) -> InteropResult<String> {
        let range = self.range()?;
        let text = range.text();
        crate::wrapper::Dispose::dispose(&range);
        text.map(|t| t.trim_end_matches(['\r', '\u{7}']).to_string())
    }

    pub fn delete(&self) -> InteropResult<()> {
        self.core.call("Delete", &[]).map(drop)
    }
}
