//! The contract every wrapper follows.
//!
//! A wrapper exclusively owns one native reference through its
//! [`WrapperCore`]. Disposal is explicit ([`Dispose::dispose`]) and
//! idempotent; `Drop` is the safety net for wrappers nobody disposed.
//! Children cached in a [`ChildSlot`] are disposed before their owner.

use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::Weak;

use tracing::{debug, trace, warn};

use crate::application::{AppShared, ApplicationRef};
use crate::convert::{NativeEnum, TriState};
use crate::error::{InteropError, InteropResult};
use crate::native::{NativeObject, NativeResult, Variant, codes};

/// Codes meaning "there is no active object right now" for
/// `ActiveDocument`, `ActiveWindow` and friends.
pub const NO_ACTIVE_OBJECT: &[i32] = &[
    codes::WORD_NO_DOCUMENT_OPEN,
    codes::WORD_COMMAND_NOT_AVAILABLE,
    codes::E_FAIL,
];

/// Explicit, idempotent release of native resources.
pub trait Dispose {
    /// Releases cached children, then this wrapper's own reference.
    fn dispose(&self);

    fn is_disposed(&self) -> bool;
}

/// A typed view over a [`WrapperCore`].
pub trait Wrapper<H: NativeObject>: Dispose + Sized {
    /// Name used in errors and logs.
    const TYPE_NAME: &'static str;

    /// Name of the host collection holding this type, e.g. `Paragraphs`.
    const COLLECTION_NAME: &'static str = "Collection";

    fn from_core(core: WrapperCore<H>) -> Self;

    fn core(&self) -> &WrapperCore<H>;

    /// Takes ownership of `handle`. Fails with
    /// [`InteropError::NullHandle`] when there is no handle.
    fn adopt(handle: Option<H>, application: Weak<AppShared<H>>) -> InteropResult<Self> {
        WrapperCore::new(Self::TYPE_NAME, handle, application).map(Self::from_core)
    }

    /// The owning application, without taking ownership of it.
    fn application(&self) -> InteropResult<ApplicationRef<H>> {
        self.core().application()
    }

    /// The host's `Parent` object, untyped. `None` when the host has none.
    fn parent(&self) -> InteropResult<Option<Object<H>>> {
        self.core().child("Parent", Lookup::Strict)
    }
}

/// How a child accessor treats a native failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// Every failure is an error.
    Strict,
    /// The listed codes mean "absent" and yield `None`; others are errors.
    AbsentOn(&'static [i32]),
    /// Any failure yields `None`. Logged at warn level.
    Lenient,
}

/// Owned native reference plus disposal state.
pub struct WrapperCore<H: NativeObject> {
    type_name: &'static str,
    native: RefCell<Option<H>>,
    disposed: Cell<bool>,
    application: Weak<AppShared<H>>,
}

impl<H: NativeObject> WrapperCore<H> {
    /// # Errors
    ///
    /// Returns [`InteropError::NullHandle`] when `handle` is `None`.
    pub fn new(
        type_name: &'static str,
        handle: Option<H>,
        application: Weak<AppShared<H>>,
    ) -> InteropResult<Self> {
        let handle = handle.ok_or(InteropError::NullHandle { type_name })?;
        Ok(Self::from_handle(type_name, handle, application))
    }

    pub(crate) fn from_handle(
        type_name: &'static str,
        handle: H,
        application: Weak<AppShared<H>>,
    ) -> Self {
        if let Some(app) = application.upgrade() {
            app.track_acquire();
        }
        trace!(wrapper = type_name, "adopted native reference");
        Self {
            type_name,
            native: RefCell::new(Some(handle)),
            disposed: Cell::new(false),
            application,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Runs `op` against the live handle.
    pub fn with_native<R>(&self, op: impl FnOnce(&H) -> InteropResult<R>) -> InteropResult<R> {
        let disposed = || InteropError::Disposed {
            type_name: self.type_name,
        };
        if self.disposed.get() {
            return Err(disposed());
        }
        let guard = self.native.try_borrow().map_err(|_| disposed())?;
        let native = guard.as_ref().ok_or_else(disposed)?;
        op(native)
    }

    /// Marks the wrapper disposed and releases its reference. Safe to call
    /// any number of times.
    pub fn release(&self) {
        if self.disposed.replace(true) {
            return;
        }
        match self.native.try_borrow_mut() {
            Ok(mut slot) => {
                if let Some(handle) = slot.take() {
                    drop(handle);
                    self.track_release();
                    debug!(wrapper = self.type_name, "released native reference");
                }
            }
            // A call on this wrapper is still on the stack (re-entrant
            // dispose from an event handler); Drop releases the handle.
            Err(_) => debug!(wrapper = self.type_name, "release deferred to drop"),
        }
    }

    fn track_release(&self) {
        if let Some(app) = self.application.upgrade() {
            app.track_release();
        }
    }

    pub fn application(&self) -> InteropResult<ApplicationRef<H>> {
        let shared = self.application.upgrade().ok_or(InteropError::Disposed {
            type_name: "Application",
        })?;
        if shared.is_disposed() {
            return Err(InteropError::Disposed {
                type_name: "Application",
            });
        }
        Ok(ApplicationRef::new(shared))
    }

    pub(crate) fn application_weak(&self) -> Weak<AppShared<H>> {
        self.application.clone()
    }

    fn fault(&self, verb: &str, member: &str) -> impl FnOnce(crate::native::NativeError) -> InteropError {
        let operation = format!("{verb} {member}");
        let target = self.type_name;
        move |source| InteropError::native(operation, target, source)
    }

    // ── Raw access ─────────────────────────────────────────────────

    pub fn get(&self, member: &str) -> InteropResult<Variant<H>> {
        self.get_with(member, &[])
    }

    pub fn get_with(&self, member: &str, args: &[Variant<H>]) -> InteropResult<Variant<H>> {
        self.with_native(|h| h.get(member, args).map_err(self.fault("get", member)))
    }

    pub fn put(&self, member: &str, value: impl Into<Variant<H>>) -> InteropResult<()> {
        let value = value.into();
        self.with_native(|h| h.put(member, &value).map_err(self.fault("set", member)))
    }

    pub fn call(&self, method: &str, args: &[Variant<H>]) -> InteropResult<Variant<H>> {
        self.with_native(|h| h.call(method, args).map_err(self.fault("call", method)))
    }

    // ── Typed properties ───────────────────────────────────────────

    fn mismatch(&self, member: &str, expected: &str, got: &Variant<H>) -> InteropError {
        InteropError::Conversion(format!(
            "{}.{member}: expected {expected}, got {}",
            self.type_name,
            got.kind()
        ))
    }

    pub fn get_string(&self, member: &str) -> InteropResult<String> {
        match self.get(member)? {
            Variant::Text(s) => Ok(s),
            Variant::Empty | Variant::Null => Ok(String::new()),
            other => Err(self.mismatch(member, "Text", &other)),
        }
    }

    pub fn get_i32(&self, member: &str) -> InteropResult<i32> {
        let value = self.get(member)?;
        value.as_i32().ok_or_else(|| self.mismatch(member, "Int", &value))
    }

    pub fn get_f64(&self, member: &str) -> InteropResult<f64> {
        let value = self.get(member)?;
        value.as_f64().ok_or_else(|| self.mismatch(member, "Double", &value))
    }

    pub fn get_bool(&self, member: &str) -> InteropResult<bool> {
        let value = self.get(member)?;
        value.as_bool().ok_or_else(|| self.mismatch(member, "Bool", &value))
    }

    pub fn get_enum<T: NativeEnum>(&self, member: &str) -> InteropResult<T> {
        self.get_i32(member).map(T::from_native)
    }

    pub fn get_tri_state(&self, member: &str) -> InteropResult<TriState> {
        self.get_enum(member)
    }

    pub fn put_enum<T: NativeEnum>(&self, member: &str, value: T) -> InteropResult<()> {
        self.put(member, value.to_native())
    }

    // ── Children ───────────────────────────────────────────────────

    /// Reads an object-valued property into a fresh wrapper.
    pub fn child<W: Wrapper<H>>(&self, member: &str, lookup: Lookup) -> InteropResult<Option<W>> {
        self.child_with(member, &[], lookup)
    }

    pub fn child_with<W: Wrapper<H>>(
        &self,
        member: &str,
        args: &[Variant<H>],
        lookup: Lookup,
    ) -> InteropResult<Option<W>> {
        let raw = self.with_native(|h| Ok(h.get(member, args)))?;
        self.resolve("get", member, raw, lookup)
    }

    /// Invokes a method returning an object.
    pub fn call_child<W: Wrapper<H>>(
        &self,
        method: &str,
        args: &[Variant<H>],
        lookup: Lookup,
    ) -> InteropResult<Option<W>> {
        let raw = self.with_native(|h| Ok(h.call(method, args)))?;
        self.resolve("call", method, raw, lookup)
    }

    /// Like [`WrapperCore::child`], but a missing object is an error.
    pub fn required_child<W: Wrapper<H>>(&self, member: &str) -> InteropResult<W> {
        self.child(member, Lookup::Strict)?
            .ok_or_else(|| self.nothing(member))
    }

    pub fn required_call<W: Wrapper<H>>(&self, method: &str, args: &[Variant<H>]) -> InteropResult<W> {
        self.call_child(method, args, Lookup::Strict)?
            .ok_or_else(|| self.nothing(method))
    }

    fn nothing(&self, member: &str) -> InteropError {
        InteropError::Conversion(format!("{}.{member} returned no object", self.type_name))
    }

    fn resolve<W: Wrapper<H>>(
        &self,
        verb: &str,
        member: &str,
        raw: NativeResult<Variant<H>>,
        lookup: Lookup,
    ) -> InteropResult<Option<W>> {
        match raw {
            Ok(value) => wrap_child(value, self.application.clone()),
            Err(err) => match lookup {
                Lookup::AbsentOn(absent) if absent.contains(&err.code) => {
                    debug!(wrapper = self.type_name, member, code = %crate::native::format_code(err.code), "treated as absent");
                    Ok(None)
                }
                Lookup::Lenient => {
                    warn!(wrapper = self.type_name, member, error = %err, "lookup failed, treated as absent");
                    Ok(None)
                }
                _ => Err(self.fault(verb, member)(err)),
            },
        }
    }
}

impl<H: NativeObject> Drop for WrapperCore<H> {
    fn drop(&mut self) {
        if let Some(handle) = self.native.get_mut().take() {
            if !self.disposed.get() {
                debug!(wrapper = self.type_name, "released by drop without dispose");
            }
            drop(handle);
            self.track_release();
        }
    }
}

impl<H: NativeObject> fmt::Debug for WrapperCore<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapperCore")
            .field("type_name", &self.type_name)
            .field("disposed", &self.disposed.get())
            .finish_non_exhaustive()
    }
}

/// Wraps an object-valued result. `Empty`/`Null` (the host's "Nothing")
/// become `None`; non-object values are a conversion error.
pub fn wrap_child<H: NativeObject, W: Wrapper<H>>(
    value: Variant<H>,
    application: Weak<AppShared<H>>,
) -> InteropResult<Option<W>> {
    match value {
        Variant::Empty | Variant::Null => Ok(None),
        Variant::Object(handle) => W::adopt(Some(handle), application).map(Some),
        other => Err(InteropError::Conversion(format!(
            "expected {} object, got {}",
            W::TYPE_NAME,
            other.kind()
        ))),
    }
}

/// A lazily created child owned by its parent wrapper.
///
/// The first access creates the child and later accesses return the same
/// instance. If the cached child was disposed independently, the next
/// access builds a fresh one.
pub struct ChildSlot<W> {
    cell: RefCell<Option<W>>,
}

impl<W: Dispose> ChildSlot<W> {
    pub fn new() -> Self {
        Self {
            cell: RefCell::new(None),
        }
    }

    /// Returns the cached child, building it with `init` when the slot is
    /// empty or holds a disposed child.
    ///
    /// # Errors
    ///
    /// Whatever `init` returns, or [`InteropError::StillBorrowed`] when the
    /// cached child was disposed while a `Ref` to it is still alive. The
    /// slot cannot swap in a replacement under that borrow, and `init` is
    /// not called.
    pub fn get_or_try_init(&self, init: impl FnOnce() -> InteropResult<W>) -> InteropResult<Ref<'_, W>> {
        let reusable = matches!(&*self.cell.borrow(), Some(child) if !child.is_disposed());
        if !reusable {
            let mut slot = self.cell.try_borrow_mut().map_err(|_| InteropError::StillBorrowed)?;
            *slot = Some(init()?);
        }
        Ref::filter_map(self.cell.borrow(), Option::as_ref)
            .map_err(|_| InteropError::Internal("cached child vanished".into()))
    }

    pub fn is_cached(&self) -> bool {
        matches!(self.cell.try_borrow().as_deref(), Ok(Some(_)))
    }

    /// Disposes the cached child, if any. The slot keeps the disposed
    /// instance so the next access rebuilds it.
    pub fn dispose(&self) {
        if let Ok(slot) = self.cell.try_borrow() {
            if let Some(child) = slot.as_ref() {
                child.dispose();
            }
        }
    }
}

impl<W: Dispose> Default for ChildSlot<W> {
    fn default() -> Self {
        Self::new()
    }
}

/// Declares a wrapper struct, its [`Wrapper`] and [`Dispose`] impls, and
/// the cached children it owns.
macro_rules! define_wrapper {
    (
        $(#[$meta:meta])*
        $name:ident = $type_name:literal
        $(, collection = $collection:literal)?
        $(, owns { $($slot:ident : $slot_ty:ty),* $(,)? })?
    ) => {
        $(#[$meta])*
        pub struct $name<H: $crate::native::NativeObject> {
            $($($slot: $crate::wrapper::ChildSlot<$slot_ty>,)*)?
            core: $crate::wrapper::WrapperCore<H>,
        }

        impl<H: $crate::native::NativeObject> $crate::wrapper::Wrapper<H> for $name<H> {
            const TYPE_NAME: &'static str = $type_name;
            $(const COLLECTION_NAME: &'static str = $collection;)?

            fn from_core(core: $crate::wrapper::WrapperCore<H>) -> Self {
                Self {
                    $($($slot: $crate::wrapper::ChildSlot::new(),)*)?
                    core,
                }
            }

            fn core(&self) -> &$crate::wrapper::WrapperCore<H> {
                &self.core
            }
        }

        impl<H: $crate::native::NativeObject> $crate::wrapper::Dispose for $name<H> {
            fn dispose(&self) {
                $($(self.$slot.dispose();)*)?
                self.core.release();
            }

            fn is_disposed(&self) -> bool {
                self.core.is_disposed()
            }
        }

        impl<H: $crate::native::NativeObject> ::std::fmt::Debug for $name<H> {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("disposed", &self.core.is_disposed())
                    .finish_non_exhaustive()
            }
        }
    };
}

pub(crate) use define_wrapper;

define_wrapper! {
    /// An object without a dedicated wrapper type, such as a `Parent`.
    Object = "Object"
}

impl<H: NativeObject> Object<H> {
    pub fn get(&self, member: &str) -> InteropResult<Variant<H>> {
        self.core.get(member)
    }

    pub fn get_string(&self, member: &str) -> InteropResult<String> {
        self.core.get_string(member)
    }

    pub fn get_i32(&self, member: &str) -> InteropResult<i32> {
        self.core.get_i32(member)
    }

    pub fn put(&self, member: &str, value: impl Into<Variant<H>>) -> InteropResult<()> {
        self.core.put(member, value)
    }

    pub fn call(&self, method: &str, args: &[Variant<H>]) -> InteropResult<Variant<H>> {
        self.core.call(method, args)
    }

    /// Reads an object-valued property as another untyped wrapper.
    pub fn object(&self, member: &str) -> InteropResult<Self> {
        self.core.required_child(member)
    }

    /// Reinterprets this reference as a typed wrapper. The untyped wrapper
    /// is consumed and its reference moves to the result.
    pub fn cast<W: Wrapper<H>>(self) -> InteropResult<W> {
        let handle = self.core.native.try_borrow_mut().ok().and_then(|mut slot| slot.take());
        let application = self.core.application_weak();
        if handle.is_some() {
            self.core.track_release();
        }
        self.core.disposed.set(true);
        W::adopt(handle, application)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeHost;

    #[test]
    fn adopting_nothing_fails_with_null_handle() {
        let err = Object::<crate::testing::FakeHandle>::adopt(None, Weak::new()).unwrap_err();
        assert!(matches!(err, InteropError::NullHandle { type_name: "Object" }));
    }

    #[test]
    fn rebuilding_under_an_outstanding_borrow_is_refused() {
        let host = FakeHost::word();
        let documents = host.object(host.app_id(), "Documents");
        let app = host.application().unwrap();

        let held = app.documents().unwrap();
        held.dispose();
        assert!(matches!(app.documents(), Err(InteropError::StillBorrowed)));
        assert_eq!(host.live_references(documents), 0, "no replacement was acquired");

        drop(held);
        assert_eq!(app.documents().unwrap().count().unwrap(), 0);
        assert_eq!(host.live_references(documents), 1);
    }

    #[test]
    fn dispose_is_idempotent_and_releases_once() {
        let host = FakeHost::word();
        let id = host.add_document("a.docx", &["one"]);
        let object = Object::adopt(Some(host.handle(id)), Weak::new()).unwrap();
        assert_eq!(host.live_references(id), 1);

        object.dispose();
        object.dispose();
        assert!(object.is_disposed());
        assert_eq!(host.live_references(id), 0);
        assert_eq!(host.releases(id), 1);

        drop(object);
        assert_eq!(host.releases(id), 1);
    }

    #[test]
    fn use_after_dispose_is_an_error() {
        let host = FakeHost::word();
        let id = host.add_document("a.docx", &[]);
        let object = Object::adopt(Some(host.handle(id)), Weak::new()).unwrap();
        object.dispose();
        let err = object.get_string("Name").unwrap_err();
        assert!(matches!(err, InteropError::Disposed { type_name: "Object" }));
    }

    #[test]
    fn drop_releases_undisposed_wrapper() {
        let host = FakeHost::word();
        let id = host.add_document("a.docx", &[]);
        drop(Object::adopt(Some(host.handle(id)), Weak::new()).unwrap());
        assert_eq!(host.live_references(id), 0);
        assert_eq!(host.releases(id), 1);
    }

    #[test]
    fn native_faults_name_operation_and_wrapper() {
        let host = FakeHost::word();
        let id = host.add_document("a.docx", &[]);
        host.fail(id, "Name", codes::RPC_E_CALL_REJECTED);
        let object = Object::adopt(Some(host.handle(id)), Weak::new()).unwrap();
        let err = object.get_string("Name").unwrap_err();
        assert_eq!(err.native_code(), Some(codes::RPC_E_CALL_REJECTED));
        assert!(err.to_string().starts_with("get Name on Object failed"));
    }

    #[test]
    fn lookup_policies() {
        let host = FakeHost::word();
        let id = host.add_document("a.docx", &[]);
        host.fail(id, "Missing", codes::WORD_NO_DOCUMENT_OPEN);
        let object = Object::adopt(Some(host.handle(id)), Weak::new()).unwrap();

        let absent: Option<Object<_>> = object
            .core()
            .child("Missing", Lookup::AbsentOn(NO_ACTIVE_OBJECT))
            .unwrap();
        assert!(absent.is_none());

        let strict = object.core().child::<Object<_>>("Missing", Lookup::Strict);
        assert!(strict.is_err());

        let other = object
            .core()
            .child::<Object<_>>("Bogus", Lookup::AbsentOn(NO_ACTIVE_OBJECT));
        assert!(other.is_err(), "unrelated codes are not absence");

        let lenient: Option<Object<_>> = object.core().child("Bogus", Lookup::Lenient).unwrap();
        assert!(lenient.is_none());
    }

    #[test]
    fn non_object_values_do_not_wrap() {
        let err = wrap_child::<crate::testing::FakeHandle, Object<_>>(Variant::Int(3), Weak::new())
            .unwrap_err();
        assert!(matches!(err, InteropError::Conversion(_)));
        let none = wrap_child::<crate::testing::FakeHandle, Object<_>>(Variant::Null, Weak::new())
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn cast_moves_the_reference() {
        let host = FakeHost::word();
        let id = host.add_document("a.docx", &[]);
        let object = Object::adopt(Some(host.handle(id)), Weak::new()).unwrap();
        let document: crate::word::Document<_> = object.cast().unwrap();
        assert_eq!(host.live_references(id), 1);
        assert_eq!(document.name().unwrap(), "a.docx");
        document.dispose();
        assert_eq!(host.live_references(id), 0);
        assert_eq!(host.releases(id), 1);
    }
}
