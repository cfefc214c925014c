use std::cell::Ref;

use crate::collection::Collection;
use crate::convert::{TriState, to_bool, to_native, to_tri_state};
use crate::error::InteropResult;
use crate::native::{NativeObject, Variant};
use crate::powerpoint::Slides;
use crate::shape::Shapes;
use crate::wrapper::{Dispose, Wrapper, define_wrapper};

crate::native_enum! {
    /// `PpSlideLayout`.
    pub enum SlideLayout {
        Title = 1,
        Text = 2,
        TwoColumnText = 3,
        Table = 4,
        TextAndChart = 5,
        ChartAndText = 6,
        OrgChart = 7,
        Chart = 8,
        TextAndClipArt = 9,
        ClipArtAndText = 10,
        TitleOnly = 11,
        Blank = 12,
    }
}

define_wrapper! {
    /// A PowerPoint presentation. Owns its `Slides` collection.
    Presentation = "Presentation", collection = "Presentations", owns {
        slides: Slides<H>,
    }
}

impl<H: NativeObject> Presentation<H> {
    pub fn name(&self) -> InteropResult<String> {
        self.core.get_string("Name")
    }

    pub fn full_name(&self) -> InteropResult<String> {
        self.core.get_string("FullName")
    }

    /// PowerPoint reports `Saved` as an `MsoTriState`.
    pub fn saved(&self) -> InteropResult<bool> {
        self.core.get_tri_state("Saved").map(to_bool)
    }

    pub fn slides(&self) -> InteropResult<Ref<'_, Slides<H>>> {
        self.slides
            .get_or_try_init(|| self.core.required_child("Slides"))
    }

    pub fn save(&self) -> InteropResult<()> {
        self.core.call("Save", &[]).map(drop)
    }

    pub fn save_as(&self, path: &str) -> InteropResult<()> {
        self.core.call("SaveAs", &[Variant::from(path)]).map(drop)
    }

    /// Closes the presentation without saving, then disposes this wrapper.
    pub fn close(&self) -> InteropResult<()> {
        self.core.call("Close", &[])?;
        self.dispose();
        Ok(())
    }
}

impl<H: NativeObject> Collection<H, Presentation<H>> {
    pub fn create(&self, with_window: bool) -> InteropResult<Presentation<H>> {
        self.add(&[Variant::Int(to_native(to_tri_state(with_window)))])
    }

    /// `Presentations.Open(FileName, ReadOnly, Untitled, WithWindow)`.
    pub fn open(&self, path: &str, read_only: bool) -> InteropResult<Presentation<H>> {
        let args = [
            Variant::from(path),
            Variant::Int(to_native(to_tri_state(read_only))),
            Variant::Int(to_native(TriState::False)),
            Variant::Int(to_native(TriState::False)),
        ];
        self.core().required_call("Open", &args)
    }
}

define_wrapper! {
    /// One slide. Owns its `Shapes` collection.
    Slide = "Slide", collection = "Slides", owns {
        shapes: Shapes<H>,
    }
}

impl<H: NativeObject> Slide<H> {
    pub fn name(&self) -> InteropResult<String> {
        self.core.get_string("Name")
    }

    /// One-based position in the presentation, as the host reports it.
    pub fn slide_index(&self) -> InteropResult<i32> {
        self.core.get_i32("SlideIndex")
    }

    pub fn layout(&self) -> InteropResult<SlideLayout> {
        self.core.get_enum("Layout")
    }

    pub fn shapes(&self) -> InteropResult<Ref<'_, Shapes<H>>> {
        self.shapes
            .get_or_try_init(|| self.core.required_child("Shapes"))
    }

    pub fn delete(&self) -> InteropResult<()> {
        self.core.call("Delete", &[]).map(drop)
    }
}

impl<H: NativeObject> Collection<H, Slide<H>> {
    /// Inserts a slide at zero-based `index`; `index == count` appends.
    pub fn insert(&self, index: i32, layout: SlideLayout) -> InteropResult<Slide<H>> {
        let count = self.count()?;
        if index < 0 || index > count {
            return Err(crate::error::InteropError::OutOfRange { index, count });
        }
        self.add(&[Variant::Int(index + 1), Variant::Int(to_native(layout))])
    }
}
