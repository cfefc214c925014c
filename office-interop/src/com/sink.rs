//! Connection-point sink for Word application events.

#![allow(non_snake_case)]

use windows::Win32::System::Com::{
    DISPATCH_FLAGS, DISPPARAMS, EXCEPINFO, IDispatch, IDispatch_Impl, ITypeInfo,
};
use windows::Win32::Foundation::{E_NOTIMPL, S_OK};
use windows::Win32::System::Variant::VARIANT;
use windows::core::{GUID, IUnknown, PCWSTR, implement, interface};

use super::dispatch::ComObject;
use super::variant;
use crate::events::EventKind;
use crate::native::EventSink;

/// IID of Word's `ApplicationEvents4` source dispinterface.
pub const APPLICATION_EVENTS4: GUID = GUID::from_u128(0x00020a01_0000_0000_c000_000000000046);

/// The source interface as the host sees it. `Advise` queries the sink for
/// this IID.
#[interface("00020A01-0000-0000-C000-000000000046")]
unsafe trait ApplicationEvents4: IDispatch {}

/// Forwards one [`EventKind`] to a Rust callback.
#[implement(ApplicationEvents4)]
pub struct EventSinkObject {
    event: EventKind,
    sink: EventSink<ComObject>,
}

impl EventSinkObject {
    pub fn create(event: EventKind, sink: EventSink<ComObject>) -> IUnknown {
        Self { event, sink }.into()
    }
}

impl ApplicationEvents4_Impl for EventSinkObject_Impl {}

impl IDispatch_Impl for EventSinkObject_Impl {
    fn GetTypeInfoCount(&self) -> windows::core::Result<u32> {
        Ok(0)
    }

    fn GetTypeInfo(&self, _itinfo: u32, _lcid: u32) -> windows::core::Result<ITypeInfo> {
        Err(E_NOTIMPL.into())
    }

    fn GetIDsOfNames(
        &self,
        _riid: *const GUID,
        _rgsznames: *const PCWSTR,
        _cnames: u32,
        _lcid: u32,
        _rgdispid: *mut i32,
    ) -> windows::core::Result<()> {
        Err(E_NOTIMPL.into())
    }

    fn Invoke(
        &self,
        dispidmember: i32,
        _riid: *const GUID,
        _lcid: u32,
        _wflags: DISPATCH_FLAGS,
        pdispparams: *const DISPPARAMS,
        _pvarresult: *mut VARIANT,
        _pexcepinfo: *mut EXCEPINFO,
        _puargerr: *mut u32,
    ) -> windows::core::Result<()> {
        if dispidmember != self.event.dispid() || pdispparams.is_null() {
            return S_OK.ok();
        }
        // SAFETY: the host passes a valid DISPPARAMS for the duration of
        // the call; `rgvarg` holds `cArgs` variants when non-null.
        let raw: &[VARIANT] = unsafe {
            let params = &*pdispparams;
            if params.rgvarg.is_null() || params.cArgs == 0 {
                &[]
            } else {
                std::slice::from_raw_parts(params.rgvarg, params.cArgs as usize)
            }
        };
        // DISPPARAMS arrive right to left; handlers get them left to right.
        let mut args = Vec::with_capacity(raw.len());
        for value in raw.iter().rev() {
            match variant::from_raw(value) {
                Ok(v) => args.push(v),
                Err(e) => {
                    tracing::warn!(event = %self.event, error = %e, "skipping event with unreadable arguments");
                    return S_OK.ok();
                }
            }
        }
        (self.sink)(args);
        S_OK.ok()
    }
}
