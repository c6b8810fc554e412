//! Conversions between Rust strings and boundary C strings.

use std::ffi::{CStr, CString, c_char, c_void};

use crate::bridge::ledger::{self, Kind};
use crate::error::ToolkitError;

unsafe fn drop_c_string(ptr: *mut c_void) {
    drop(unsafe { CString::from_raw(ptr.cast::<c_char>()) });
}

/// Hand a Rust string across the boundary as a NUL-terminated C string.
///
/// Interior NUL bytes would truncate the string on the C side, so they are
/// replaced with U+FFFD. The result is never null and must be released with
/// `destroy_c_char`.
pub fn string_to_c_char<S>(value: S) -> *mut c_char
where
    S: Into<String>,
{
    let value = value.into();
    let cstring = match CString::new(value) {
        Ok(cstring) => cstring,
        Err(err) => {
            tracing::warn!("string contained interior NUL byte, replacing");
            let bytes = err.into_vec();
            let lossy = String::from_utf8_lossy(&bytes).replace('\0', "\u{FFFD}");
            CString::new(lossy).unwrap_or_default()
        }
    };
    let size = cstring.as_bytes_with_nul().len();
    let ptr = cstring.into_raw();
    ledger::track(ptr.cast(), Kind::CString, "CString", size, drop_c_string);
    ptr
}

/// Borrow a C string as `&str`.
///
/// # Safety
///
/// `ptr` must be null or point at a NUL-terminated string that outlives `'a`.
pub unsafe fn c_char_to_str<'a>(ptr: *const c_char) -> Result<&'a str, ToolkitError> {
    if ptr.is_null() {
        return Err(ToolkitError::NullPointer("c string"));
    }
    Ok(unsafe { CStr::from_ptr(ptr) }.to_str()?)
}

/// Copy a C string into an owned `String`.
///
/// # Safety
///
/// Same as [`c_char_to_str`].
pub unsafe fn c_char_to_string(ptr: *const c_char) -> Result<String, ToolkitError> {
    unsafe { c_char_to_str(ptr) }.map(String::from)
}

/// Read an optional C string argument, returning None on null or invalid UTF-8.
pub(crate) unsafe fn read_c_str(ptr: *const c_char) -> Option<String> {
    unsafe { c_char_to_string(ptr) }.ok()
}
