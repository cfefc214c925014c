//! Drawing-layer shapes, shared by Word documents and PowerPoint slides.

use crate::collection::Collection;
use crate::convert::{ShapeType, TextOrientation, TriState, to_bool, to_native, to_tri_state};
use crate::error::InteropResult;
use crate::native::{NativeObject, Variant};
use crate::wrapper::{Dispose, Object, define_wrapper};

pub type Shapes<H> = Collection<H, Shape<H>>;

define_wrapper! {
    /// A floating shape.
    Shape = "Shape", collection = "Shapes"
}

impl<H: NativeObject> Shape<H> {
    pub fn name(&self) -> InteropResult<String> {
        self.core.get_string("Name")
    }

    pub fn set_name(&self, name: &str) -> InteropResult<()> {
        self.core.put("Name", name)
    }

    pub fn shape_type(&self) -> InteropResult<ShapeType> {
        self.core.get_enum("Type")
    }

    pub fn visible(&self) -> InteropResult<TriState> {
        self.core.get_tri_state("Visible")
    }

    pub fn set_visible(&self, visible: bool) -> InteropResult<()> {
        self.core.put_enum("Visible", to_tri_state(visible))
    }

    pub fn has_text_frame(&self) -> InteropResult<bool> {
        self.core.get_tri_state("HasTextFrame").map(to_bool)
    }

    /// Text of the shape's text frame.
    pub fn text(&self) -> InteropResult<String> {
        self.with_text_range(|range| range.get_string("Text"))
    }

    pub fn set_text(&self, text: &str) -> InteropResult<()> {
        self.with_text_range(|range| range.put("Text", text))
    }

    /// Walks `TextFrame.TextRange`, disposing both intermediates.
    fn with_text_range<R>(&self, op: impl FnOnce(&Object<H>) -> InteropResult<R>) -> InteropResult<R> {
        let frame: Object<H> = self.core.required_child("TextFrame")?;
        let result = frame.object("TextRange").and_then(|range| {
            let result = op(&range);
            range.dispose();
            result
        });
        frame.dispose();
        result
    }

    /// Position and size in points: `(left, top, width, height)`.
    pub fn bounds(&self) -> InteropResult<(f64, f64, f64, f64)> {
        Ok((
            self.core.get_f64("Left")?,
            self.core.get_f64("Top")?,
            self.core.get_f64("Width")?,
            self.core.get_f64("Height")?,
        ))
    }

    pub fn delete(&self) -> InteropResult<()> {
        self.core.call("Delete", &[]).map(drop)
    }
}

impl<H: NativeObject> Collection<H, Shape<H>> {
    /// `AddTextbox(Orientation, Left, Top, Width, Height)`.
    pub fn add_textbox(
        &self,
        orientation: TextOrientation,
        (left, top, width, height): (f64, f64, f64, f64),
    ) -> InteropResult<Shape<H>> {
        use crate::wrapper::Wrapper;
        self.core().required_call(
            "AddTextbox",
            &[
                Variant::Int(to_native(orientation)),
                Variant::Double(left),
                Variant::Double(top),
                Variant::Double(width),
                Variant::Double(height),
            ],
        )
    }
}
