//! Consumer-side reading of an `ExternResult`.
//!
//! Rust hosts (and the integration tests) receive the same `*mut ExternResult`
//! a Swift caller does. [`ReceivedResult`] borrows its fields until it is
//! dropped, at which point the envelope is released.

use std::ffi::{CStr, c_void};
use std::ptr::NonNull;

use crate::bridge::ledger;
use crate::bridge::result::{ExternResult, extern_result_destroy};
use crate::error::{ErrorCode, ToolkitError};

/// What a result says once the two-pointer shape has been checked.
#[derive(Debug)]
pub enum Outcome<'a> {
    /// Success. `None` when the producer returned no value.
    Ok(Option<NonNull<c_void>>),
    Err { code: ErrorCode, message: &'a CStr },
}

/// An `ExternResult` received from a producer.
#[derive(Debug)]
pub struct ReceivedResult {
    raw: NonNull<ExternResult>,
}

impl ReceivedResult {
    /// # Safety
    ///
    /// `ptr` must be a result produced by this library and not yet released.
    pub unsafe fn from_raw(ptr: *mut ExternResult) -> Result<Self, ToolkitError> {
        NonNull::new(ptr)
            .map(|raw| Self { raw })
            .ok_or(ToolkitError::NullPointer("result"))
    }

    fn fields(&self) -> &ExternResult {
        unsafe { self.raw.as_ref() }
    }

    /// Both fields populated is never produced by the constructors and is
    /// rejected rather than resolved by precedence.
    pub fn outcome(&self) -> Result<Outcome<'_>, ToolkitError> {
        let fields = self.fields();
        match (fields.ok.is_null(), fields.err.is_null()) {
            (_, true) => Ok(Outcome::Ok(NonNull::new(fields.ok as *mut c_void))),
            (true, false) => {
                let err = unsafe { &*fields.err };
                if err.message.is_null() {
                    return Err(ToolkitError::ContractViolation(
                        "error descriptor without a message".into(),
                    ));
                }
                Ok(Outcome::Err {
                    code: err.code,
                    message: unsafe { CStr::from_ptr(err.message) },
                })
            }
            (false, false) => Err(ToolkitError::ContractViolation(
                "result has both ok and err populated".into(),
            )),
        }
    }

    /// Take the payload back as a `T`, or the descriptor as an error.
    ///
    /// # Safety
    ///
    /// On success the payload is no longer valid for anyone else holding
    /// a copy of `ok`.
    pub unsafe fn into_result<T>(self) -> Result<Option<T>, ToolkitError> {
        match self.outcome()? {
            Outcome::Ok(None) => Ok(None),
            Outcome::Ok(Some(ptr)) => {
                let value = unsafe { ledger::claim::<T>(ptr.as_ptr()) }?;
                Ok(Some(*value))
            }
            Outcome::Err { code, message } => Err(ToolkitError::from_code(
                code,
                message.to_string_lossy().into_owned(),
            )),
        }
    }
}

impl Drop for ReceivedResult {
    fn drop(&mut self) {
        unsafe { extern_result_destroy(self.raw.as_ptr()) };
    }
}
