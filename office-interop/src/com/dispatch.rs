//! Late-bound IDispatch access.

use std::fmt;

use windows::Win32::Foundation::DISP_E_EXCEPTION;
use windows::Win32::System::Com::{
    CLSCTX_LOCAL_SERVER, CLSIDFromProgID, CoCreateInstance, DISPATCH_FLAGS, DISPATCH_METHOD,
    DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT, DISPPARAMS, EXCEPINFO, IConnectionPoint,
    IConnectionPointContainer, IDispatch,
};
use windows::Win32::System::Ole::DISPID_PROPERTYPUT;
use windows::Win32::System::Variant::VARIANT;
use windows::core::{GUID, HSTRING, Interface as _, PCWSTR};

use super::sink::{APPLICATION_EVENTS4, EventSinkObject};
use super::variant;
use crate::events::EventKind;
use crate::native::{EventSink, NativeError, NativeObject, NativeResult, Variant, codes};

/// `LOCALE_USER_DEFAULT`.
const LCID: u32 = 0x0400;

pub(crate) fn native_error(err: &windows::core::Error) -> NativeError {
    NativeError::new(err.code().0, err.message())
}

/// Folds `EXCEPINFO` into the error when the host raised an exception.
/// Office reports its own error number in `scode`.
fn invoke_error(err: &windows::core::Error, except: &EXCEPINFO, member: &str) -> NativeError {
    if err.code() == DISP_E_EXCEPTION {
        let code = if except.scode != 0 { except.scode } else { err.code().0 };
        let description = if except.bstrDescription.is_empty() {
            format!("{member} raised an exception")
        } else {
            except.bstrDescription.to_string()
        };
        return NativeError::new(code, description);
    }
    NativeError::new(err.code().0, format!("Invoke({member}) failed: {}", err.message()))
}

/// One IDispatch reference. Dropping it calls `Release`.
pub struct ComObject {
    dispatch: IDispatch,
}

impl ComObject {
    /// Starts (or attaches to) the local server registered for `prog_id`.
    pub fn create(prog_id: &str) -> NativeResult<Self> {
        let prog_id = HSTRING::from(prog_id);
        // SAFETY: `prog_id` outlives both calls; the returned interface is
        // owned by the windows-rs smart pointer.
        let dispatch: IDispatch = unsafe {
            let clsid = CLSIDFromProgID(&prog_id).map_err(|e| native_error(&e))?;
            CoCreateInstance(&clsid, None, CLSCTX_LOCAL_SERVER).map_err(|e| native_error(&e))?
        };
        Ok(Self { dispatch })
    }

    pub fn from_dispatch(dispatch: IDispatch) -> Self {
        Self { dispatch }
    }

    pub fn dispatch(&self) -> &IDispatch {
        &self.dispatch
    }

    fn dispid(&self, name: &str) -> NativeResult<i32> {
        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let names = [PCWSTR(wide.as_ptr())];
        let mut dispid = 0i32;
        // SAFETY: `names` holds one NUL-terminated string that lives until
        // the call returns; `dispid` receives exactly one value.
        unsafe {
            self.dispatch
                .GetIDsOfNames(&GUID::zeroed(), names.as_ptr(), 1, LCID, &mut dispid)
                .map_err(|e| native_error(&e))?;
        }
        Ok(dispid)
    }

    fn invoke(
        &self,
        member: &str,
        flags: DISPATCH_FLAGS,
        args: &[Variant<Self>],
        put: bool,
    ) -> NativeResult<Variant<Self>> {
        let dispid = self.dispid(member)?;
        // DISPPARAMS takes arguments right to left.
        let mut raw: Vec<VARIANT> = args.iter().rev().map(variant::to_raw).collect();
        let mut named = [DISPID_PROPERTYPUT];
        let count = u32::try_from(raw.len())
            .map_err(|_| NativeError::new(codes::E_FAIL, "too many arguments"))?;
        let params = DISPPARAMS {
            rgvarg: if raw.is_empty() { std::ptr::null_mut() } else { raw.as_mut_ptr() },
            rgdispidNamedArgs: if put { named.as_mut_ptr() } else { std::ptr::null_mut() },
            cArgs: count,
            cNamedArgs: u32::from(put),
        };
        let mut result = VARIANT::default();
        let mut except = EXCEPINFO::default();
        // SAFETY: `params` points into `raw` and `named`, both alive for
        // the duration of the call; `result` and `except` are valid
        // out-parameters.
        let outcome = unsafe {
            self.dispatch.Invoke(
                dispid,
                &GUID::zeroed(),
                LCID,
                flags,
                &params,
                if put { None } else { Some(&mut result) },
                Some(&mut except),
                None,
            )
        };
        for arg in &mut raw {
            variant::clear(arg);
        }
        outcome.map_err(|e| invoke_error(&e, &except, member))?;
        let value = variant::from_raw(&result);
        variant::clear(&mut result);
        value
    }

    fn connection_point(&self) -> NativeResult<IConnectionPoint> {
        let container: IConnectionPointContainer = self.dispatch.cast().map_err(|e| native_error(&e))?;
        // SAFETY: `container` is a live interface obtained just above.
        unsafe { container.FindConnectionPoint(&APPLICATION_EVENTS4) }.map_err(|e| native_error(&e))
    }
}

impl NativeObject for ComObject {
    fn get(&self, member: &str, args: &[Variant<Self>]) -> NativeResult<Variant<Self>> {
        self.invoke(member, DISPATCH_PROPERTYGET, args, false)
    }

    fn put(&self, member: &str, value: &Variant<Self>) -> NativeResult<()> {
        self.invoke(member, DISPATCH_PROPERTYPUT, std::slice::from_ref(value), true)
            .map(drop)
    }

    fn call(&self, member: &str, args: &[Variant<Self>]) -> NativeResult<Variant<Self>> {
        // Collection `Item` and friends are methods in some hosts and
        // parameterized properties in others.
        self.invoke(member, DISPATCH_METHOD | DISPATCH_PROPERTYGET, args, false)
    }

    fn advise(&self, event: EventKind, sink: EventSink<Self>) -> NativeResult<u32> {
        let point = self.connection_point()?;
        let sink = EventSinkObject::create(event, sink);
        // SAFETY: `point` and `sink` are live interfaces; the host takes its
        // own reference to the sink.
        unsafe { point.Advise(&sink) }.map_err(|e| native_error(&e))
    }

    fn unadvise(&self, cookie: u32) -> NativeResult<()> {
        let point = self.connection_point()?;
        // SAFETY: `point` is a live interface; an unknown cookie is reported
        // as CONNECT_E_NOCONNECTION.
        unsafe { point.Unadvise(cookie) }.map_err(|e| native_error(&e))
    }
}

impl fmt::Debug for ComObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComObject").field(&self.dispatch.as_raw()).finish()
    }
}
