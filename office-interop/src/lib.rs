//! # office-interop
//!
//! Disposable wrappers over Office Automation objects.
//!
//! Every wrapper owns exactly one native reference and gives it back
//! deterministically: explicitly through [`Dispose::dispose`], or on drop.
//! Objects reached through a wrapper are either cached and owned by it
//! (disposed with it) or handed to the caller as fresh wrappers.
//!
//! ## Features
//! - `com-backend` (default): IDispatch backend for Windows (`com` module)
//! - `test-support`: in-memory host (`testing` module) and `MockBatchProvider`

pub mod application;
pub mod collection;
pub mod convert;
pub mod error;
pub mod events;
pub mod native;
pub mod powerpoint;
pub mod provider;
pub mod shape;
pub mod word;
pub mod worker;
pub mod wrapper;

#[cfg(all(windows, feature = "com-backend"))]
pub mod com;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod tests;

// Stable public API
pub use application::{Application, ApplicationRef, OfficeApp};
pub use collection::{BatchReport, Collection};
pub use error::{InteropError, InteropResult, friendly_error_hint, friendly_hresult_hint};
pub use events::{ApplicationEvent, EventKind, HandlerId};
pub use native::{NativeError, NativeObject, Variant};
pub use provider::{BatchProvider, ItemReport, JobOptions, WorkerPool};
pub use worker::{ApartmentFactory, ApartmentWorker};
pub use wrapper::{ChildSlot, Dispose, Lookup, Object, Wrapper, WrapperCore};

// Test support re-export
#[cfg(feature = "test-support")]
pub use provider::MockBatchProvider;
