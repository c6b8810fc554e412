//! Result/error protocol for handing values from a Rust core library to an
//! Apple-platform consumer over the C ABI.
//!
//! Producers return `*mut ExternResult` built with the constructors in
//! [`bridge::result`] or through [`guard::call`]. The consumer reads it and
//! releases every pointer with the destructor for its kind (`destroy`,
//! `destroy_c_char`, `destroy_raw_uuid`, `extern_result_destroy`). The C
//! mapping of these types lives in `include/ffi_toolkit.h`.

pub mod bridge;
pub mod config;
pub mod consumer;
pub mod error;
pub mod guard;
pub mod logging;

pub use bridge::memory::{destroy, destroy_c_char, destroy_raw_uuid, into_boundary};
pub use bridge::raw_uuid::{raw_to_uuid, uuid_to_raw};
pub use bridge::result::{ExternError, ExternResult, destroy_extern_error, extern_result_destroy};
pub use bridge::string::{c_char_to_str, c_char_to_string, string_to_c_char};
pub use consumer::{Outcome, ReceivedResult};
pub use error::{ErrorCode, FfiStatus, ToolkitError};
