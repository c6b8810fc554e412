//! C representation of `Result` handed to the consumer.

use std::ffi::{c_char, c_void};

use uuid::Uuid;

use crate::bridge::ledger::{self, Kind};
use crate::bridge::raw_uuid::uuid_to_raw;
use crate::bridge::string::string_to_c_char;
use crate::error::{ErrorCode, ToolkitError};

/// An error code and a description string (`ErrorC` in `ffi_toolkit.h`).
///
/// # Safety
///
/// The descriptor owns `message`. Release both with `destroy_extern_error`,
/// or by releasing the enclosing `ExternResult`. The message may be released
/// early with `destroy_c_char`; the descriptor then leaves it alone.
///
/// Only built through [`ExternError::new`], which records the message as
/// owned by the boxed descriptor.
#[repr(C)]
#[derive(Debug)]
pub struct ExternError {
    pub(crate) code: ErrorCode,
    /// Never null, always NUL-terminated.
    pub(crate) message: *const c_char,
}

impl ExternError {
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> *const c_char {
        self.message
    }

    pub fn new<S>(code: ErrorCode, message: S) -> *mut Self
    where
        S: Into<String>,
    {
        let message = string_to_c_char(message);
        let err = ledger::hand_out(ExternError { code, message }, Kind::Error);
        ledger::adopt(message.cast(), Kind::CString, err.cast_const().cast());
        err
    }
}

impl Drop for ExternError {
    fn drop(&mut self) {
        let owner = (self as *const Self).cast::<c_void>();
        unsafe { ledger::reclaim(self.message as *mut c_void, Kind::CString, owner) };
    }
}

/// A C representation of Rust's [Result](std::result::Result)
/// (`Result` in `ffi_toolkit.h`).
///
/// The constructors only ever produce three states:
/// - success: `ok` holds the payload, `err` is null;
/// - success without a value: both are null;
/// - failure: `ok` is null, `err` holds the descriptor.
///
/// # Safety
///
/// Release the envelope with `extern_result_destroy` (or `destroy`); that
/// also releases `err`. The `ok` payload belongs to the consumer once read
/// and is released separately with the destructor for its kind: `destroy`
/// for values, `destroy_c_char` for strings, `destroy_raw_uuid` for ids.
#[repr(C)]
#[derive(Debug)]
pub struct ExternResult {
    // One `free` function covers every payload type, so no `*const T` here.
    pub ok: *const c_void,
    pub err: *const ExternError,
}

impl ExternResult {
    fn boxed(ok: *const c_void, err: *const ExternError) -> *mut Self {
        let result = ledger::hand_out(ExternResult { ok, err }, Kind::Result);
        if !err.is_null() {
            ledger::adopt(err as *mut c_void, Kind::Error, result.cast_const().cast());
        }
        result
    }

    pub fn ok<T>(value: T) -> *mut Self {
        let payload = ledger::hand_out(value, Kind::Payload);
        Self::boxed(payload.cast::<c_void>(), std::ptr::null())
    }

    /// Wrap a payload that is already boxed.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or come from `Box::<T>::into_raw` and not be
    /// released by anyone else. It must not come from `into_boundary`, which
    /// already records it; such a pointer is wrapped as-is and stays tracked
    /// once.
    pub unsafe fn ok_ptr<T>(ptr: *mut T) -> *mut Self {
        if ptr.is_null() {
            return Self::ok_null();
        }
        ledger::track(
            ptr.cast(),
            Kind::Payload,
            std::any::type_name::<T>(),
            std::mem::size_of::<T>(),
            ledger::drop_box::<T>,
        );
        Self::boxed(ptr.cast::<c_void>(), std::ptr::null())
    }

    /// Success without a value. Distinct from a zero-sized payload, whose
    /// `ok` is non-null.
    pub fn ok_null() -> *mut Self {
        Self::boxed(std::ptr::null(), std::ptr::null())
    }

    pub fn ok_optional<T>(value: Option<T>) -> *mut Self {
        match value {
            Some(v) => Self::ok(v),
            None => Self::ok_null(),
        }
    }

    /// Success carrying a string; `ok` is released with `destroy_c_char`.
    pub fn ok_c_char<S>(value: S) -> *mut Self
    where
        S: Into<String>,
    {
        Self::boxed(string_to_c_char(value).cast::<c_void>(), std::ptr::null())
    }

    /// Success carrying an identifier; `ok` is released with `destroy_raw_uuid`.
    pub fn ok_uuid(id: Uuid) -> *mut Self {
        Self::boxed(uuid_to_raw(id).cast::<c_void>(), std::ptr::null())
    }

    pub fn err<S>(code: ErrorCode, msg: S) -> *mut Self
    where
        S: Into<String>,
    {
        Self::boxed(std::ptr::null(), ExternError::new(code, msg))
    }

    pub fn from_error(err: &ToolkitError) -> *mut Self {
        tracing::debug!(code = %err.code(), "returning error across boundary: {err}");
        Self::err(err.code(), err.boundary_message())
    }

    pub fn from_result<T>(result: Result<T, ToolkitError>) -> *mut Self {
        match result {
            Ok(v) => Self::ok(v),
            Err(e) => Self::from_error(&e),
        }
    }
}

impl Drop for ExternResult {
    fn drop(&mut self) {
        let owner = (self as *const Self).cast::<c_void>();
        unsafe { ledger::reclaim(self.err as *mut c_void, Kind::Error, owner) };
    }
}

/// Release an error descriptor and, if still owned, its message.
///
/// # Safety
///
/// `err` must be null or a descriptor produced by this library that the
/// caller will not use again.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn destroy_extern_error(err: *mut ExternError) {
    if err.is_null() {
        return;
    }
    unsafe { ledger::release(err.cast(), &[Kind::Error], "destroy_extern_error") }
}

/// Release a result envelope and its error descriptor. The `ok` payload is
/// not released.
///
/// # Safety
///
/// `result` must be null or a pointer produced by this library that the
/// caller will not use again.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn extern_result_destroy(result: *mut ExternResult) {
    if result.is_null() {
        return;
    }
    unsafe { ledger::release(result.cast(), &[Kind::Result], "extern_result_destroy") }
}
