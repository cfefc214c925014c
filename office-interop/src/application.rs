//! The root wrapper.
//!
//! [`Application`] is the only owner of an application's shared state.
//! Every other wrapper reaches it through a non-owning [`ApplicationRef`],
//! so a child can never keep the host alive or dispose it.

use std::cell::{Cell, Ref};
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use tracing::{debug, info, warn};

use crate::convert::SaveOptions;
use crate::error::{InteropError, InteropResult};
use crate::events::{ApplicationEvent, EventBridge, EventKind, HandlerId};
use crate::native::{NativeObject, Variant};
use crate::powerpoint::Presentations;
use crate::word::{Document, Documents, Selection, Window};
use crate::wrapper::{ChildSlot, Lookup, NO_ACTIVE_OBJECT, WrapperCore};

/// Office applications this crate knows how to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfficeApp {
    Word,
    Excel,
    PowerPoint,
}

impl OfficeApp {
    pub const fn prog_id(self) -> &'static str {
        match self {
            Self::Word => "Word.Application",
            Self::Excel => "Excel.Application",
            Self::PowerPoint => "PowerPoint.Application",
        }
    }

    /// Whether the event bridge understands this application's events.
    pub const fn supports_events(self) -> bool {
        matches!(self, Self::Word)
    }
}

impl fmt::Display for OfficeApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Word => "Word",
            Self::Excel => "Excel",
            Self::PowerPoint => "PowerPoint",
        })
    }
}

/// State shared by an application and every wrapper created from it.
pub struct AppShared<H: NativeObject> {
    kind: OfficeApp,
    documents: ChildSlot<Documents<H>>,
    presentations: ChildSlot<Presentations<H>>,
    events: EventBridge<H>,
    live: Cell<usize>,
    core: WrapperCore<H>,
}

/// Owning handle to an application.
///
/// Dropping it disposes the application: event subscriptions are removed,
/// cached collections are disposed, then the application reference is
/// released.
pub struct Application<H: NativeObject> {
    shared: Rc<AppShared<H>>,
}

/// Non-owning handle to an application, returned by
/// [`Wrapper::application`](crate::wrapper::Wrapper::application).
pub struct ApplicationRef<H: NativeObject> {
    shared: Rc<AppShared<H>>,
}

impl<H: NativeObject> Application<H> {
    /// Takes ownership of an application reference.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::NullHandle`] when `handle` is `None`.
    pub fn new(handle: Option<H>, kind: OfficeApp) -> InteropResult<Self> {
        let handle = handle.ok_or(InteropError::NullHandle {
            type_name: "Application",
        })?;
        let shared = Rc::new_cyclic(|weak| AppShared {
            kind,
            documents: ChildSlot::new(),
            presentations: ChildSlot::new(),
            events: EventBridge::new(weak.clone()),
            live: Cell::new(0),
            core: WrapperCore::from_handle("Application", handle, weak.clone()),
        });
        info!(app = %kind, "application attached");
        Ok(Self { shared })
    }

    /// Non-owning handle to this application.
    pub fn downgrade(&self) -> ApplicationRef<H> {
        ApplicationRef::new(Rc::clone(&self.shared))
    }

    /// Tears the application down. Idempotent.
    ///
    /// Wrappers still alive afterwards keep their own references until they
    /// are disposed or dropped; they are reported at warn level.
    pub fn dispose(&self) {
        let shared = &self.shared;
        if shared.core.is_disposed() {
            return;
        }
        shared.events.shutdown(&shared.core);
        shared.documents.dispose();
        shared.presentations.dispose();
        let orphans = shared.live.get();
        if orphans > 0 {
            warn!(app = %shared.kind, orphans, "wrappers still hold native references at application shutdown");
        }
        shared.core.release();
        info!(app = %shared.kind, "application disposed");
    }
}

impl<H: NativeObject> Drop for Application<H> {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl<H: NativeObject> Deref for Application<H> {
    type Target = AppShared<H>;

    fn deref(&self) -> &Self::Target {
        &self.shared
    }
}

impl<H: NativeObject> ApplicationRef<H> {
    pub(crate) fn new(shared: Rc<AppShared<H>>) -> Self {
        Self { shared }
    }
}

impl<H: NativeObject> Clone for ApplicationRef<H> {
    fn clone(&self) -> Self {
        Self::new(Rc::clone(&self.shared))
    }
}

impl<H: NativeObject> Deref for ApplicationRef<H> {
    type Target = AppShared<H>;

    fn deref(&self) -> &Self::Target {
        &self.shared
    }
}

impl<H: NativeObject> AppShared<H> {
    pub fn kind(&self) -> OfficeApp {
        self.kind
    }

    pub fn is_disposed(&self) -> bool {
        self.core.is_disposed()
    }

    /// Wrappers created from this application whose native reference has
    /// not been released yet. The application itself is not counted.
    pub fn live_wrappers(&self) -> usize {
        self.live.get()
    }

    pub(crate) fn track_acquire(&self) {
        self.live.set(self.live.get() + 1);
    }

    pub(crate) fn track_release(&self) {
        self.live.set(self.live.get().saturating_sub(1));
    }

    fn weak(&self) -> std::rc::Weak<Self> {
        self.core.application_weak()
    }

    // ── Properties ─────────────────────────────────────────────────

    pub fn name(&self) -> InteropResult<String> {
        self.core.get_string("Name")
    }

    pub fn version(&self) -> InteropResult<String> {
        self.core.get_string("Version")
    }

    pub fn visible(&self) -> InteropResult<bool> {
        self.core.get_bool("Visible")
    }

    pub fn set_visible(&self, visible: bool) -> InteropResult<()> {
        self.core.put("Visible", visible)
    }

    pub fn display_alerts(&self) -> InteropResult<bool> {
        let value = self.core.get_i32("DisplayAlerts")?;
        Ok(match self.kind {
            OfficeApp::PowerPoint => value == 2,
            _ => value != 0,
        })
    }

    /// Word takes `wdAlertsNone` (0) / `wdAlertsAll` (-1); PowerPoint takes
    /// `ppAlertsNone` (1) / `ppAlertsAll` (2).
    pub fn set_display_alerts(&self, enabled: bool) -> InteropResult<()> {
        let value = match (self.kind, enabled) {
            (OfficeApp::PowerPoint, true) => 2,
            (OfficeApp::PowerPoint, false) => 1,
            (_, true) => -1,
            (_, false) => 0,
        };
        self.core.put("DisplayAlerts", value)
    }

    // ── Children ───────────────────────────────────────────────────

    /// The cached `Documents` collection.
    pub fn documents(&self) -> InteropResult<Ref<'_, Documents<H>>> {
        self.documents
            .get_or_try_init(|| self.core.required_child("Documents"))
    }

    /// The cached `Presentations` collection.
    pub fn presentations(&self) -> InteropResult<Ref<'_, Presentations<H>>> {
        self.presentations
            .get_or_try_init(|| self.core.required_child("Presentations"))
    }

    /// `None` when no document is open.
    pub fn active_document(&self) -> InteropResult<Option<Document<H>>> {
        self.core.child("ActiveDocument", Lookup::AbsentOn(NO_ACTIVE_OBJECT))
    }

    /// `None` when no window is open.
    pub fn active_window(&self) -> InteropResult<Option<Window<H>>> {
        self.core.child("ActiveWindow", Lookup::AbsentOn(NO_ACTIVE_OBJECT))
    }

    /// The current selection. Any failure reads as "no selection".
    pub fn selection(&self) -> InteropResult<Option<Selection<H>>> {
        self.core.child("Selection", Lookup::Lenient)
    }

    /// Asks the host to exit. The wrapper still needs disposing afterwards.
    pub fn quit(&self, save: SaveOptions) -> InteropResult<()> {
        use crate::convert::NativeEnum;
        let args = match self.kind {
            OfficeApp::Word => vec![Variant::Int(save.to_native())],
            _ => Vec::new(),
        };
        self.core.call("Quit", &args).map(drop)
    }

    // ── Events ─────────────────────────────────────────────────────

    /// Registers `handler` for `kind`. The host is advised on the first
    /// handler per kind.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::Unsupported`] for hosts whose events are not
    /// bridged, and [`InteropError::Native`] when advising fails. No handler
    /// is kept in either case.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use office_interop::{Application, ApplicationEvent, EventKind, InteropResult, NativeObject};
    /// # fn demo<H: NativeObject>(app: &Application<H>) -> InteropResult<()> {
    /// let id = app.subscribe(EventKind::DocumentOpen, |event| {
    ///     if let ApplicationEvent::DocumentOpen(document) = event {
    ///         println!("opened {}", document.name()?);
    ///     }
    ///     Ok(())
    /// })?;
    /// // ...
    /// app.unsubscribe(id)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> InteropResult<HandlerId>
    where
        F: Fn(&ApplicationEvent<H>) -> anyhow::Result<()> + 'static,
    {
        if !self.kind.supports_events() {
            return Err(InteropError::Unsupported(format!(
                "{} events are not bridged",
                self.kind
            )));
        }
        let id = self.events.subscribe(&self.core, kind, Rc::new(handler))?;
        debug!(event = %kind, ?id, "handler subscribed");
        Ok(id)
    }

    /// Removes a handler. Returns `false` when it was not registered.
    ///
    /// # Errors
    ///
    /// Returns [`InteropError::Native`] when removing the last handler and
    /// the host refuses to unadvise. The handler is gone regardless; the
    /// host registration is kept and retried at shutdown.
    pub fn unsubscribe(&self, id: HandlerId) -> InteropResult<bool> {
        self.events.unsubscribe(&self.core, id)
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.events.handler_count(kind)
    }

    pub fn is_advised(&self, kind: EventKind) -> bool {
        self.events.is_advised(kind)
    }

    /// Wraps an arbitrary object value with this application as owner.
    pub fn wrap<W: crate::wrapper::Wrapper<H>>(&self, value: Variant<H>) -> InteropResult<Option<W>> {
        crate::wrapper::wrap_child(value, self.weak())
    }
}

impl<H: NativeObject> fmt::Debug for AppShared<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("kind", &self.kind)
            .field("disposed", &self.is_disposed())
            .field("live_wrappers", &self.live.get())
            .field("events", &self.events)
            .finish()
    }
}

impl<H: NativeObject> fmt::Debug for Application<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.fmt(f)
    }
}

impl<H: NativeObject> fmt::Debug for ApplicationRef<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shared.fmt(f)
    }
}
