//! Toolkit-level C ABI exports: initialisation and diagnostics.
//!
//! The destructors live next to the types they release (`memory`, `result`).

use std::ffi::c_char;

use crate::bridge::ledger;
use crate::bridge::string::read_c_str;
use crate::config::{self, ToolkitConfig};
use crate::error::FfiStatus;
use crate::logging;

/// Configure the toolkit and install logging.
///
/// `config_json` may be null for the defaults; see [`ToolkitConfig`] for the
/// schema. Calling again replaces the configuration but keeps the first
/// installed subscriber.
///
/// # Safety
///
/// `config_json` must be null or a valid, NUL-terminated UTF-8 C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn ffi_toolkit_init(config_json: *const c_char) -> i32 {
    let config = if config_json.is_null() {
        ToolkitConfig::default()
    } else {
        let Some(json_str) = (unsafe { read_c_str(config_json) }) else {
            tracing::error!("ffi_toolkit_init: config_json is not valid UTF-8");
            return FfiStatus::InvalidArgument as i32;
        };
        match ToolkitConfig::from_json(&json_str) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!("ffi_toolkit_init: {e}");
                return FfiStatus::InvalidArgument as i32;
            }
        }
    };

    if !logging::init(&config) {
        tracing::debug!("ffi_toolkit_init: subscriber already installed");
    }
    config::install(config);
    FfiStatus::Ok as i32
}

/// Number of boundary allocations not yet released. Consumers can compare it
/// before and after a call sequence to check for leaks.
#[unsafe(no_mangle)]
pub extern "C" fn ffi_toolkit_live_allocations() -> u64 {
    ledger::live_allocations() as u64
}
