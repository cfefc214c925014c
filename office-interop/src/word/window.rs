use crate::convert::WindowState;
use crate::error::InteropResult;
use crate::native::NativeObject;
use crate::word::{Document, Range};
use crate::wrapper::define_wrapper;

define_wrapper! {
    /// A document window.
    Window = "Window", collection = "Windows"
}

impl<H: NativeObject> Window<H> {
    pub fn caption(&self) -> InteropResult<String> {
        self.core.get_string("Caption")
    }

    pub fn window_state(&self) -> InteropResult<WindowState> {
        self.core.get_enum("WindowState")
    }

    pub fn set_window_state(&self, state: WindowState) -> InteropResult<()> {
        self.core.put_enum("WindowState", state)
    }

    pub fn activate(&self) -> InteropResult<()> {
        self.core.call("Activate", &[]).map(drop)
    }

    /// The document shown in this window, as a fresh wrapper.
    pub fn document(&self) -> InteropResult<Document<H>> {
        self.core.required_child("Document")
    }
}

define_wrapper! {
    /// The insertion point or highlighted span in a window.
    Selection = "Selection"
}

impl<H: NativeObject> Selection<H> {
    pub fn text(&self) -> InteropResult<String> {
        self.core.get_string("Text")
    }

    pub fn start(&self) -> InteropResult<i32> {
        self.core.get_i32("Start")
    }

    pub fn end(&self) -> InteropResult<i32> {
        self.core.get_i32("End")
    }

    /// `true` for a collapsed selection (an insertion point).
    pub fn is_collapsed(&self) -> InteropResult<bool> {
        Ok(self.start()? == self.end()?)
    }

    pub fn range(&self) -> InteropResult<Range<H>> {
        self.core.required_child("Range")
    }

    pub fn type_text(&self, text: &str) -> InteropResult<()> {
        self.core
            .call("TypeText", &[crate::native::Variant::from(text)])
            .map(drop)
    }
}
