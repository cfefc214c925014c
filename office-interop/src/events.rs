//! Application event bridge.
//!
//! Each [`EventKind`] is a separate channel. The first handler on a channel
//! advises the host's event source, the last one removed unadvises it, and
//! disposing the application unadvises everything. Native arguments are
//! wrapped fresh for each delivery and disposed right after the handlers
//! return, so handlers must not keep them.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::{Rc, Weak};

use tracing::{debug, error, warn};

use crate::application::AppShared;
use crate::error::{InteropError, InteropResult};
use crate::native::{EventSink, NativeObject, Variant};
use crate::word::{Document, Selection, Window};
use crate::wrapper::{Dispose, WrapperCore, wrap_child};

/// Word `ApplicationEvents4` members the bridge forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    Quit,
    DocumentChange,
    DocumentOpen,
    DocumentBeforeClose,
    NewDocument,
    WindowActivate,
    WindowDeactivate,
    WindowSelectionChange,
}

impl EventKind {
    pub const ALL: [Self; 8] = [
        Self::Quit,
        Self::DocumentChange,
        Self::DocumentOpen,
        Self::DocumentBeforeClose,
        Self::NewDocument,
        Self::WindowActivate,
        Self::WindowDeactivate,
        Self::WindowSelectionChange,
    ];

    /// DISPID of the member on the source dispinterface.
    pub const fn dispid(self) -> i32 {
        match self {
            Self::Quit => 2,
            Self::DocumentChange => 3,
            Self::DocumentOpen => 4,
            Self::DocumentBeforeClose => 6,
            Self::NewDocument => 9,
            Self::WindowActivate => 10,
            Self::WindowDeactivate => 11,
            Self::WindowSelectionChange => 12,
        }
    }

    pub fn from_dispid(dispid: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.dispid() == dispid)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Quit => "Quit",
            Self::DocumentChange => "DocumentChange",
            Self::DocumentOpen => "DocumentOpen",
            Self::DocumentBeforeClose => "DocumentBeforeClose",
            Self::NewDocument => "NewDocument",
            Self::WindowActivate => "WindowActivate",
            Self::WindowDeactivate => "WindowDeactivate",
            Self::WindowSelectionChange => "WindowSelectionChange",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One delivered event with its arguments wrapped.
///
/// `DocumentBeforeClose` also carries a `Cancel` flag in the host; the
/// bridge delivers it as a notification only.
#[derive(Debug)]
pub enum ApplicationEvent<H: NativeObject> {
    Quit,
    DocumentChange,
    DocumentOpen(Document<H>),
    DocumentBeforeClose(Document<H>),
    NewDocument(Document<H>),
    WindowActivate { document: Document<H>, window: Window<H> },
    WindowDeactivate { document: Document<H>, window: Window<H> },
    WindowSelectionChange(Selection<H>),
}

impl<H: NativeObject> ApplicationEvent<H> {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Quit => EventKind::Quit,
            Self::DocumentChange => EventKind::DocumentChange,
            Self::DocumentOpen(_) => EventKind::DocumentOpen,
            Self::DocumentBeforeClose(_) => EventKind::DocumentBeforeClose,
            Self::NewDocument(_) => EventKind::NewDocument,
            Self::WindowActivate { .. } => EventKind::WindowActivate,
            Self::WindowDeactivate { .. } => EventKind::WindowDeactivate,
            Self::WindowSelectionChange(_) => EventKind::WindowSelectionChange,
        }
    }

    /// The document the event concerns, if any.
    pub fn document(&self) -> Option<&Document<H>> {
        match self {
            Self::DocumentOpen(d) | Self::DocumentBeforeClose(d) | Self::NewDocument(d) => Some(d),
            Self::WindowActivate { document, .. } | Self::WindowDeactivate { document, .. } => {
                Some(document)
            }
            _ => None,
        }
    }

    fn decode(
        kind: EventKind,
        args: Vec<Variant<H>>,
        app: &Weak<AppShared<H>>,
    ) -> InteropResult<Self> {
        let mut args = args.into_iter();
        let mut next = |what: &'static str| {
            args.next()
                .ok_or_else(|| InteropError::Conversion(format!("{kind} is missing its {what} argument")))
        };
        fn object<H: NativeObject, W: crate::wrapper::Wrapper<H>>(
            value: Variant<H>,
            app: &Weak<AppShared<H>>,
        ) -> InteropResult<W> {
            wrap_child(value, app.clone())?.ok_or_else(|| {
                InteropError::Conversion(format!("event argument {} was Nothing", W::TYPE_NAME))
            })
        }
        Ok(match kind {
            EventKind::Quit => Self::Quit,
            EventKind::DocumentChange => Self::DocumentChange,
            EventKind::DocumentOpen => Self::DocumentOpen(object(next("Doc")?, app)?),
            EventKind::DocumentBeforeClose => Self::DocumentBeforeClose(object(next("Doc")?, app)?),
            EventKind::NewDocument => Self::NewDocument(object(next("Doc")?, app)?),
            EventKind::WindowActivate => Self::WindowActivate {
                document: object(next("Doc")?, app)?,
                window: object(next("Wn")?, app)?,
            },
            EventKind::WindowDeactivate => Self::WindowDeactivate {
                document: object(next("Doc")?, app)?,
                window: object(next("Wn")?, app)?,
            },
            EventKind::WindowSelectionChange => Self::WindowSelectionChange(object(next("Sel")?, app)?),
        })
    }

    fn dispose(&self) {
        match self {
            Self::Quit | Self::DocumentChange => {}
            Self::DocumentOpen(d) | Self::DocumentBeforeClose(d) | Self::NewDocument(d) => d.dispose(),
            Self::WindowActivate { document, window } | Self::WindowDeactivate { document, window } => {
                window.dispose();
                document.dispose();
            }
            Self::WindowSelectionChange(s) => s.dispose(),
        }
    }
}

/// Event handler. An `Err` is logged and does not reach the host.
pub type Handler<H> = Rc<dyn Fn(&ApplicationEvent<H>) -> anyhow::Result<()>>;

/// Identifies one subscription for [`EventBridge::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type HandlerList<H> = Rc<RefCell<Vec<(HandlerId, Handler<H>)>>>;

struct Channel<H: NativeObject> {
    cookie: Option<u32>,
    handlers: HandlerList<H>,
}

/// Per-application event subscriptions.
pub struct EventBridge<H: NativeObject> {
    channels: RefCell<BTreeMap<EventKind, Channel<H>>>,
    next_id: Cell<u64>,
    app: Weak<AppShared<H>>,
}

impl<H: NativeObject> EventBridge<H> {
    pub(crate) fn new(app: Weak<AppShared<H>>) -> Self {
        Self {
            channels: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(1),
            app,
        }
    }

    /// Adds `handler` to the `kind` channel, advising the host if this is
    /// the channel's first handler.
    pub(crate) fn subscribe(
        &self,
        source: &WrapperCore<H>,
        kind: EventKind,
        handler: Handler<H>,
    ) -> InteropResult<HandlerId> {
        let id = HandlerId(self.next_id.get());
        let mut channels = self.channels.borrow_mut();
        let channel = channels.entry(kind).or_insert_with(|| Channel {
            cookie: None,
            handlers: Rc::new(RefCell::new(Vec::new())),
        });
        if channel.cookie.is_none() {
            let sink = self.sink(kind, &channel.handlers);
            let cookie = source.with_native(|h| {
                h.advise(kind, sink)
                    .map_err(|e| InteropError::native(format!("advise {kind}"), "Application", e))
            })?;
            debug!(event = %kind, cookie, "advised event source");
            channel.cookie = Some(cookie);
        }
        channel.handlers.borrow_mut().push((id, handler));
        self.next_id.set(id.0 + 1);
        Ok(id)
    }

    /// Removes a handler. Returns `false` when `id` is unknown.
    pub(crate) fn unsubscribe(&self, source: &WrapperCore<H>, id: HandlerId) -> InteropResult<bool> {
        let mut channels = self.channels.borrow_mut();
        let Some((kind, channel)) = channels
            .iter_mut()
            .find(|(_, c)| c.handlers.borrow().iter().any(|(h, _)| *h == id))
        else {
            return Ok(false);
        };
        channel.handlers.borrow_mut().retain(|(h, _)| *h != id);
        if channel.handlers.borrow().is_empty() {
            // The cookie is kept until the host confirms, so a failed
            // unadvise leaves the channel advised and its sink reused.
            if let Some(cookie) = channel.cookie {
                Self::unadvise(source, *kind, cookie)?;
                channel.cookie = None;
            }
        }
        Ok(true)
    }

    /// Unadvises every channel and drops all handlers.
    pub(crate) fn shutdown(&self, source: &WrapperCore<H>) {
        let mut channels = self.channels.borrow_mut();
        for (kind, channel) in channels.iter_mut() {
            channel.handlers.borrow_mut().clear();
            if let Some(cookie) = channel.cookie.take() {
                if let Err(e) = Self::unadvise(source, *kind, cookie) {
                    warn!(event = %kind, error = %e, "unadvise failed during shutdown");
                }
            }
        }
        channels.clear();
    }

    /// Handlers currently registered for `kind`.
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.channels
            .borrow()
            .get(&kind)
            .map_or(0, |c| c.handlers.borrow().len())
    }

    /// Whether the host is currently advised for `kind`.
    pub fn is_advised(&self, kind: EventKind) -> bool {
        self.channels
            .borrow()
            .get(&kind)
            .is_some_and(|c| c.cookie.is_some())
    }

    fn unadvise(source: &WrapperCore<H>, kind: EventKind, cookie: u32) -> InteropResult<()> {
        if source.is_disposed() {
            return Ok(());
        }
        source.with_native(|h| {
            h.unadvise(cookie)
                .map_err(|e| InteropError::native(format!("unadvise {kind}"), "Application", e))
        })?;
        debug!(event = %kind, cookie, "unadvised event source");
        Ok(())
    }

    fn sink(&self, kind: EventKind, handlers: &HandlerList<H>) -> EventSink<H> {
        let handlers = Rc::downgrade(handlers);
        let app = self.app.clone();
        Rc::new(move |args: Vec<Variant<H>>| {
            let Some(handlers) = handlers.upgrade() else {
                return;
            };
            // Snapshot so handlers may (un)subscribe while being called.
            let snapshot: Vec<Handler<H>> = handlers.borrow().iter().map(|(_, h)| Rc::clone(h)).collect();
            if snapshot.is_empty() {
                return;
            }
            let event = match ApplicationEvent::decode(kind, args, &app) {
                Ok(event) => event,
                Err(e) => {
                    warn!(event = %kind, error = %e, "dropping undecodable event");
                    return;
                }
            };
            for handler in snapshot {
                deliver(&event, &handler);
            }
            event.dispose();
        })
    }
}

/// Runs one handler. Errors and panics stay on this side of the host.
fn deliver<H: NativeObject>(event: &ApplicationEvent<H>, handler: &Handler<H>) {
    match catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(event = %event.kind(), error = %e, "event handler failed"),
        Err(_) => error!(event = %event.kind(), "event handler panicked"),
    }
}

impl<H: NativeObject> fmt::Debug for EventBridge<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channels = self.channels.borrow();
        f.debug_map()
            .entries(channels.iter().map(|(k, c)| (k, c.handlers.borrow().len())))
            .finish()
    }
}
