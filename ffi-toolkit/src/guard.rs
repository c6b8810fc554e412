//! Producer-side wrapper for exported calls.
//!
//! Runs the body of an exported function under `catch_unwind` so a panic never
//! crosses `extern "C"`, and turns its outcome into a `*mut ExternResult`.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::bridge::result::ExternResult;
use crate::error::ToolkitError;

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn run<R>(
    name: &'static str,
    f: impl FnOnce() -> Result<R, ToolkitError>,
) -> Result<R, ToolkitError> {
    let _span = tracing::debug_span!("ffi_call", name).entered();
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!(name, "panic in exported call: {msg}");
            Err(ToolkitError::Other(format!("internal error in {name}: {msg}")))
        }
    }
}

/// Run `f` and hand its value or error across the boundary.
pub fn call<T, F>(name: &'static str, f: F) -> *mut ExternResult
where
    F: FnOnce() -> Result<T, ToolkitError>,
{
    ExternResult::from_result(run(name, f))
}

/// Like [`call`], with `None` becoming a success whose `ok` is null.
pub fn call_optional<T, F>(name: &'static str, f: F) -> *mut ExternResult
where
    F: FnOnce() -> Result<Option<T>, ToolkitError>,
{
    match run(name, f) {
        Ok(value) => ExternResult::ok_optional(value),
        Err(e) => ExternResult::from_error(&e),
    }
}

/// Like [`call`] for producers written against `anyhow`.
pub fn call_anyhow<T, F>(name: &'static str, f: F) -> *mut ExternResult
where
    F: FnOnce() -> anyhow::Result<T>,
{
    call(name, || f().map_err(ToolkitError::from))
}
