//! RAII guard for single-threaded apartment setup and teardown.

use std::marker::PhantomData;

use windows::Win32::System::Com::{COINIT_APARTMENTTHREADED, CoInitializeEx, CoUninitialize};

use crate::error::{InteropError, InteropResult};

/// Keeps the current thread in a single-threaded apartment.
///
/// Office automation servers expect STA callers; their event callbacks are
/// delivered on the apartment thread. `CoUninitialize` runs on drop.
///
/// The guard is `!Send` and `!Sync`: apartment membership belongs to the
/// OS thread that entered it.
#[derive(Debug)]
pub struct ApartmentGuard {
    _not_send: PhantomData<*mut ()>,
}

impl ApartmentGuard {
    /// Enters an STA on the calling thread. `S_FALSE` (already
    /// initialized) counts as success and is balanced the same way.
    pub fn new() -> InteropResult<Self> {
        // SAFETY: plain Win32 call with no pointer arguments. A successful
        // result (S_OK or S_FALSE) is paired with `CoUninitialize` in Drop.
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED) };

        if let Err(e) = hr.ok() {
            tracing::error!(error = ?e, "COM STA initialization failed");
            return Err(InteropError::Internal(format!("CoInitializeEx failed: {e}")));
        }

        tracing::debug!("COM STA initialized");

        Ok(Self {
            _not_send: PhantomData,
        })
    }
}

impl Drop for ApartmentGuard {
    fn drop(&mut self) {
        tracing::debug!("COM STA teardown");
        // SAFETY: balanced with the successful `CoInitializeEx` in `new()`,
        // on the same thread because the guard is `!Send`.
        unsafe {
            CoUninitialize();
        }
    }
}
