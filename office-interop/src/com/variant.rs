//! `VARIANT` <-> [`Variant`] conversion.
//!
//! `VARIANT` wraps its unions in `ManuallyDrop`, so fields are written with
//! `ptr::write` and owned contents are freed with `VariantClear`.

use std::mem::ManuallyDrop;
use std::ptr;

use windows::Win32::Foundation::VARIANT_BOOL;
use windows::Win32::System::Com::IDispatch;
use windows::Win32::System::Variant::{
    VARENUM, VARIANT, VT_BOOL, VT_BSTR, VT_BYREF, VT_DATE, VT_DISPATCH, VT_EMPTY, VT_ERROR, VT_I2,
    VT_I4, VT_INT, VT_NULL, VT_R4, VT_R8, VT_UI1, VT_UNKNOWN, VT_VARIANT, VariantClear,
};
use windows::core::{BSTR, IUnknown, Interface as _};

use super::dispatch::{ComObject, native_error};
use crate::convert::{datetime_to_ole_date, ole_date_to_datetime};
use crate::native::{NativeError, NativeResult, Variant, codes};

/// Builds an owned `VARIANT`. Release it with [`clear`].
pub fn to_raw(value: &Variant<ComObject>) -> VARIANT {
    let mut v = VARIANT::default();
    // SAFETY: `v` is a fresh VT_EMPTY variant. Each arm writes the tag and
    // the union member that belongs to it, so the pair stays consistent.
    unsafe {
        let inner = &mut *v.Anonymous.Anonymous;
        match value {
            Variant::Empty => {}
            Variant::Null => ptr::write(&mut inner.vt, VT_NULL),
            Variant::Bool(b) => {
                ptr::write(&mut inner.vt, VT_BOOL);
                ptr::write(&mut inner.Anonymous.boolVal, VARIANT_BOOL(if *b { -1 } else { 0 }));
            }
            Variant::Int(i) => {
                ptr::write(&mut inner.vt, VT_I4);
                ptr::write(&mut inner.Anonymous.lVal, *i);
            }
            Variant::Double(d) => {
                ptr::write(&mut inner.vt, VT_R8);
                ptr::write(&mut inner.Anonymous.dblVal, *d);
            }
            Variant::Text(s) => {
                ptr::write(&mut inner.vt, VT_BSTR);
                ptr::write(&mut inner.Anonymous.bstrVal, ManuallyDrop::new(BSTR::from(s.as_str())));
            }
            Variant::Date(d) => {
                ptr::write(&mut inner.vt, VT_DATE);
                ptr::write(&mut inner.Anonymous.date, datetime_to_ole_date(*d));
            }
            Variant::Object(object) => {
                ptr::write(&mut inner.vt, VT_DISPATCH);
                ptr::write(
                    &mut inner.Anonymous.pdispVal,
                    ManuallyDrop::new(Some(object.dispatch().clone())),
                );
            }
        }
    }
    v
}

/// Reads a `VARIANT` without taking ownership of it. Object values get
/// their own reference.
///
/// By-reference values (event `Cancel` flags, for instance) are read
/// through their pointer; the pointee is left untouched.
///
/// # Errors
///
/// `DISP_E_TYPEMISMATCH` for types with no [`Variant`] counterpart.
pub fn from_raw(v: &VARIANT) -> NativeResult<Variant<ComObject>> {
    // SAFETY: the union member read in each arm is the one selected by
    // `vt`, which the host set together with the payload. By-reference
    // pointers are checked for null and only read for the call's duration.
    unsafe {
        let inner = &v.Anonymous.Anonymous;
        let data = &inner.Anonymous;
        let vt = inner.vt;
        if vt.0 & VT_BYREF.0 != 0 {
            let base = VARENUM(vt.0 & !VT_BYREF.0);
            return if base == VT_VARIANT && !data.pvarVal.is_null() {
                from_raw(&*data.pvarVal)
            } else if base == VT_BOOL && !data.pboolVal.is_null() {
                Ok(Variant::Bool((*data.pboolVal).0 != 0))
            } else if base == VT_I4 && !data.plVal.is_null() {
                Ok(Variant::Int(*data.plVal))
            } else if base == VT_R8 && !data.pdblVal.is_null() {
                Ok(Variant::Double(*data.pdblVal))
            } else if base == VT_BSTR && !data.pbstrVal.is_null() {
                Ok(Variant::Text((*data.pbstrVal).to_string()))
            } else if base == VT_DISPATCH && !data.ppdispVal.is_null() {
                Ok((*data.ppdispVal)
                    .clone()
                    .map_or(Variant::Null, |d| Variant::Object(ComObject::from_dispatch(d))))
            } else {
                Err(NativeError::new(
                    codes::DISP_E_TYPEMISMATCH,
                    format!("unsupported by-reference VARIANT type {}", base.0),
                ))
            };
        }
        let value = if vt == VT_EMPTY || vt == VT_ERROR {
            Variant::Empty
        } else if vt == VT_NULL {
            Variant::Null
        } else if vt == VT_BOOL {
            Variant::Bool(data.boolVal.0 != 0)
        } else if vt == VT_I4 {
            Variant::Int(data.lVal)
        } else if vt == VT_INT {
            Variant::Int(data.intVal)
        } else if vt == VT_I2 {
            Variant::Int(i32::from(data.iVal))
        } else if vt == VT_UI1 {
            Variant::Int(i32::from(data.bVal))
        } else if vt == VT_R8 {
            Variant::Double(data.dblVal)
        } else if vt == VT_R4 {
            Variant::Double(f64::from(data.fltVal))
        } else if vt == VT_BSTR {
            Variant::Text(data.bstrVal.to_string())
        } else if vt == VT_DATE {
            ole_date_to_datetime(data.date).map_or(Variant::Null, Variant::Date)
        } else if vt == VT_DISPATCH {
            let dispatch: &Option<IDispatch> = &data.pdispVal;
            dispatch
                .clone()
                .map_or(Variant::Null, |d| Variant::Object(ComObject::from_dispatch(d)))
        } else if vt == VT_UNKNOWN {
            let unknown: &Option<IUnknown> = &data.punkVal;
            match unknown {
                Some(u) => Variant::Object(ComObject::from_dispatch(
                    u.cast::<IDispatch>().map_err(|e| native_error(&e))?,
                )),
                None => Variant::Null,
            }
        } else {
            return Err(NativeError::new(
                codes::DISP_E_TYPEMISMATCH,
                format!("unsupported VARIANT type {}", vt.0),
            ));
        };
        Ok(value)
    }
}

/// Frees whatever `v` owns and resets it to `VT_EMPTY`.
pub fn clear(v: &mut VARIANT) {
    // SAFETY: `v` was produced by `to_raw` or filled by the host, so its
    // tag matches its payload. VariantClear leaves it VT_EMPTY, making a
    // second clear harmless.
    if let Err(e) = unsafe { VariantClear(v) } {
        tracing::warn!(error = %e, "VariantClear failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn by_reference(vt: VARENUM, write: impl FnOnce(&mut VARIANT)) -> VARIANT {
        let mut v = VARIANT::default();
        // SAFETY: only the tag is written here; `write` fills the matching
        // pointer member.
        unsafe {
            ptr::write(&mut (*v.Anonymous.Anonymous).vt, VARENUM(vt.0 | VT_BYREF.0));
        }
        write(&mut v);
        v
    }

    #[test]
    fn by_reference_bool_is_read_through_its_pointer() {
        let mut cancel = VARIANT_BOOL(-1);
        let v = by_reference(VT_BOOL, |v| {
            // SAFETY: `cancel` outlives `v`; the tag says VT_BOOL|VT_BYREF.
            unsafe { ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.pboolVal, &raw mut cancel) }
        });
        assert!(matches!(from_raw(&v), Ok(Variant::Bool(true))));
        assert_eq!(cancel, VARIANT_BOOL(-1));
    }

    #[test]
    fn by_reference_variant_is_unwrapped() {
        let mut target = to_raw(&Variant::Int(7));
        let v = by_reference(VT_VARIANT, |v| {
            // SAFETY: `target` outlives `v`; the tag says VT_VARIANT|VT_BYREF.
            unsafe { ptr::write(&mut (*v.Anonymous.Anonymous).Anonymous.pvarVal, &raw mut target) }
        });
        assert!(matches!(from_raw(&v), Ok(Variant::Int(7))));
        drop(v);
        clear(&mut target);
    }

    #[test]
    fn null_by_reference_pointer_is_a_type_mismatch() {
        let v = by_reference(VT_BOOL, |_| {});
        let err = from_raw(&v).err().map(|e| e.code);
        assert_eq!(err, Some(codes::DISP_E_TYPEMISMATCH));
    }
}
