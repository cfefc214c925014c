//! Host-neutral view of an Automation object.
//!
//! Every backend (the COM backend on Windows, the in-memory host used by the
//! tests) implements [`NativeObject`]. A value of that type *is* one native
//! reference: dropping it releases the reference. The wrapper layer above
//! never clones handles, so each reference is released exactly once.

#![allow(clippy::cast_possible_wrap)]

use std::borrow::Borrow;
use std::rc::Rc;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::events::EventKind;

/// Result type alias for raw native calls.
pub type NativeResult<T> = Result<T, NativeError>;

/// Callback registered with a native event source.
///
/// Receives the event arguments in natural (left to right) order.
pub type EventSink<H> = Rc<dyn Fn(Vec<Variant<H>>)>;

/// A fault reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {message}", format_code(.code))]
pub struct NativeError {
    /// HRESULT-style status code.
    pub code: i32,
    /// Host-provided description, possibly empty.
    pub message: String,
}

/// Formats a status code the way HRESULTs are usually written.
#[allow(clippy::needless_pass_by_value, clippy::cast_sign_loss)]
pub fn format_code(code: impl Borrow<i32>) -> String {
    format!("0x{:08X}", *code.borrow() as u32)
}

impl NativeError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_code(&self, code: i32) -> bool {
        self.code == code
    }

    /// `true` when the host process is gone and every reference into it
    /// is dead.
    pub fn is_host_lost(&self) -> bool {
        matches!(
            self.code,
            codes::RPC_S_SERVER_UNAVAILABLE | codes::RPC_E_DISCONNECTED | codes::CO_E_SERVER_EXEC_FAILURE
        )
    }
}

/// Status codes the wrapper layer inspects.
pub mod codes {
    pub const E_NOTIMPL: i32 = 0x8000_4001_u32 as i32;
    pub const E_POINTER: i32 = 0x8000_4003_u32 as i32;
    pub const E_FAIL: i32 = 0x8000_4005_u32 as i32;
    pub const E_ACCESSDENIED: i32 = 0x8007_0005_u32 as i32;
    pub const RPC_E_CALL_REJECTED: i32 = 0x8001_0001_u32 as i32;
    pub const RPC_E_SERVERCALL_RETRYLATER: i32 = 0x8001_010A_u32 as i32;
    pub const RPC_S_SERVER_UNAVAILABLE: i32 = 0x8007_06BA_u32 as i32;
    pub const RPC_E_DISCONNECTED: i32 = 0x8001_0108_u32 as i32;
    pub const CO_E_SERVER_EXEC_FAILURE: i32 = 0x8008_0005_u32 as i32;
    pub const REGDB_E_CLASSNOTREG: i32 = 0x8004_0154_u32 as i32;
    pub const DISP_E_MEMBERNOTFOUND: i32 = 0x8002_0003_u32 as i32;
    pub const DISP_E_UNKNOWNNAME: i32 = 0x8002_0006_u32 as i32;
    pub const DISP_E_TYPEMISMATCH: i32 = 0x8002_0005_u32 as i32;
    pub const DISP_E_EXCEPTION: i32 = 0x8002_0009_u32 as i32;
    pub const DISP_E_BADINDEX: i32 = 0x8002_000B_u32 as i32;
    pub const CONNECT_E_NOCONNECTION: i32 = 0x8004_0200_u32 as i32;
    /// Word run-time error 4248: no document is open.
    pub const WORD_NO_DOCUMENT_OPEN: i32 = 0x800A_1098_u32 as i32;
    /// Word run-time error 4605: the command is not available.
    pub const WORD_COMMAND_NOT_AVAILABLE: i32 = 0x800A_11FD_u32 as i32;
}

/// An Automation value.
///
/// `Object` carries an owned native reference. Nothing else in this enum
/// holds host resources.
#[derive(Debug)]
pub enum Variant<H> {
    Empty,
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Text(String),
    Date(NaiveDateTime),
    Object(H),
}

impl<H> Variant<H> {
    /// `true` for `Empty` and `Null`, the two ways a host says "nothing".
    pub fn is_nothing(&self) -> bool {
        matches!(self, Self::Empty | Self::Null)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Bool(b) => Some(if *b { -1 } else { 0 }),
            Self::Double(d) if d.fract() == 0.0 && d.abs() <= f64::from(i32::MAX) => {
                Some(*d as i32)
            }
            _ => None,
        }
    }

    /// Automation booleans arrive either as `VT_BOOL` or as a `Long`
    /// where any non-zero value is true.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Int(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(d) => Some(*d),
            Self::Int(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<H> {
        match self {
            Self::Object(h) => Some(h),
            _ => None,
        }
    }

    /// Short name of the active arm, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Null => "Null",
            Self::Bool(_) => "Bool",
            Self::Int(_) => "Int",
            Self::Double(_) => "Double",
            Self::Text(_) => "Text",
            Self::Date(_) => "Date",
            Self::Object(_) => "Object",
        }
    }
}

impl<H> From<bool> for Variant<H> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<H> From<i32> for Variant<H> {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl<H> From<f64> for Variant<H> {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl<H> From<&str> for Variant<H> {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl<H> From<String> for Variant<H> {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<H> From<NaiveDateTime> for Variant<H> {
    fn from(value: NaiveDateTime) -> Self {
        Self::Date(value)
    }
}

/// One native Automation reference.
///
/// Implementations release the reference in `Drop`. All calls are
/// synchronous and must happen on the apartment thread that produced the
/// reference, which is why no `Send` bound is required or expected.
pub trait NativeObject: Sized + 'static {
    /// Reads a property; `args` are index arguments (e.g. `Item(3)`).
    fn get(&self, member: &str, args: &[Variant<Self>]) -> NativeResult<Variant<Self>>;

    /// Writes a property.
    fn put(&self, member: &str, value: &Variant<Self>) -> NativeResult<()>;

    /// Invokes a method.
    fn call(&self, member: &str, args: &[Variant<Self>]) -> NativeResult<Variant<Self>>;

    /// Registers `sink` for `event` on this object's event source.
    /// Returns a cookie for [`NativeObject::unadvise`].
    fn advise(&self, event: EventKind, sink: EventSink<Self>) -> NativeResult<u32>;

    /// Removes a registration made by [`NativeObject::advise`].
    fn unadvise(&self, cookie: u32) -> NativeResult<()>;
}
