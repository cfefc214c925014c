use thiserror::Error;

use crate::native::{NativeError, codes};

/// Result type alias for wrapper operations.
pub type InteropResult<T> = Result<T, InteropError>;

/// Centralized error enum for the wrapper layer.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum InteropError {
    /// A wrapper was asked to adopt a null native handle.
    #[error("Cannot wrap a null {type_name} handle")]
    NullHandle { type_name: &'static str },

    /// An operation was invoked on a wrapper after `dispose`.
    #[error("{type_name} was used after it was disposed")]
    Disposed { type_name: &'static str },

    /// A 0-based collection index fell outside `0..count`.
    #[error("Index {index} is out of range for a collection of {count} items")]
    OutOfRange { index: i32, count: i32 },

    /// The host reported a fault while running `operation` on `target`.
    #[error("{operation} on {target} failed: {source} ({})", friendly_hresult_hint(.source.code).unwrap_or("No hint available"))]
    Native {
        operation: String,
        target: &'static str,
        source: NativeError,
    },

    /// A cached child was disposed and accessed again while an earlier
    /// borrow of it was still held.
    #[error("A disposed cached child is still borrowed; drop the earlier reference before accessing it again")]
    StillBorrowed,

    /// A native value had an unexpected shape.
    #[error("Data conversion failed: {0}")]
    Conversion(String),

    /// The backend or platform cannot perform the request.
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// Catch-all for worker and channel failures.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl InteropError {
    /// Wraps a native fault with the operation and wrapper it came from.
    pub fn native(operation: impl Into<String>, target: &'static str, source: NativeError) -> Self {
        Self::Native {
            operation: operation.into(),
            target,
            source,
        }
    }

    /// `true` when the error means the host process is gone.
    pub fn is_host_lost(&self) -> bool {
        matches!(self, Self::Native { source, .. } if source.is_host_lost())
    }

    /// Native status code, when the error came from the host.
    pub fn native_code(&self) -> Option<i32> {
        match self {
            Self::Native { source, .. } => Some(source.code),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for InteropError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<tokio::task::JoinError> for InteropError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("Async task join failed: {err}"))
    }
}

/// Maps known COM and Office error codes to actionable user hints.
pub fn friendly_hresult_hint(code: i32) -> Option<&'static str> {
    match code {
        codes::RPC_E_CALL_REJECTED => {
            Some("The Office application is busy (modal dialog open?) and rejected the call")
        }
        codes::RPC_E_SERVERCALL_RETRYLATER => {
            Some("The Office application asked to retry later; it is still processing")
        }
        codes::RPC_S_SERVER_UNAVAILABLE | codes::RPC_E_DISCONNECTED => {
            Some("The Office process exited or crashed; create a new Application")
        }
        codes::CO_E_SERVER_EXEC_FAILURE => {
            Some("The Office process failed to start; check that it is installed and licensed")
        }
        codes::REGDB_E_CLASSNOTREG => Some("The Office application is not registered on this machine"),
        codes::E_ACCESSDENIED => {
            Some("Access denied; the caller and Office run at different integrity levels")
        }
        codes::DISP_E_EXCEPTION => Some("The Office object model raised an error for this call"),
        codes::DISP_E_MEMBERNOTFOUND | codes::DISP_E_UNKNOWNNAME => {
            Some("Member not found; the host version may not expose it")
        }
        codes::DISP_E_BADINDEX => Some("The host rejected the collection index"),
        codes::WORD_NO_DOCUMENT_OPEN => Some("No document is open in Word"),
        _ => None,
    }
}

/// Maps an [`InteropError`] to a friendly hint if it wraps a native fault.
pub fn friendly_error_hint(error: &InteropError) -> Option<&'static str> {
    match error {
        InteropError::Native { source, .. } => friendly_hresult_hint(source.code),
        _ => None,
    }
}
