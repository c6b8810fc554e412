//! Destructors for memory handed across the boundary.
//!
//! Every allocation crossing the boundary has exactly one destructor, named
//! by payload kind. Destructors validate the pointer against the allocation
//! ledger first, so the wrong destructor or a second release is reported and
//! ignored instead of corrupting the heap.

use std::ffi::{c_char, c_void};

use crate::bridge::ledger::{self, Kind};

/// Create an exported function `$name` that releases a boxed `$t`.
///
/// The pointer must come from [`into_boundary`] or one of the `ExternResult`
/// constructors and hold a `$t`; anything else is refused like any other
/// wrong-destructor call. `$t = c_void` releases any payload or envelope.
/// Null is a no-op.
#[macro_export]
macro_rules! define_destructor (
    ($name:ident, $t:ty) => (
        #[doc = concat!("Release a boxed `", stringify!($t), "` handed across the boundary.")]
        ///
        /// # Safety
        ///
        /// `obj` must be null or a pointer produced by this library that the
        /// caller will not use again.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn $name(obj: *mut $t) {
            if obj.is_null() {
                return;
            }
            unsafe {
                $crate::bridge::memory::release_boxed(
                    obj.cast(),
                    ::std::any::type_name::<$t>(),
                    stringify!($name),
                )
            }
        }
    )
);

/// Panic unless every pointer argument is non-null.
///
/// Meant for producer bodies run under [`crate::guard::call`], which turns
/// the panic into an `ErrorCode::Other` result.
#[macro_export]
macro_rules! assert_pointer_not_null {
    ($($e:expr),+ $(,)*) => ($(
        assert!(!$e.is_null(), concat!("Unexpected null pointer: ", stringify!($e)));
    )+);
}

/// Box `value` for the consumer and record it as a payload.
pub fn into_boundary<T>(value: T) -> *mut T {
    ledger::hand_out(value, Kind::Payload)
}

const BOXED: &[Kind] = &[Kind::Payload, Kind::Result, Kind::Error];

/// Release a boxed boundary value of type `type_name`: a payload, an
/// `ExternResult` or an `ExternError`. `c_void` stands for any of them.
///
/// # Safety
///
/// The caller must not use `obj` after this returns.
pub unsafe fn release_boxed(obj: *mut c_void, type_name: &str, caller: &'static str) {
    if type_name == std::any::type_name::<c_void>() {
        unsafe { ledger::release(obj, BOXED, caller) }
    } else {
        unsafe { ledger::release_as(obj, BOXED, type_name, caller) }
    }
}

define_destructor!(destroy, c_void);

/// Release a 16-byte identifier previously returned across the boundary.
///
/// # Safety
///
/// `obj` must be null or a pointer produced by this library that the caller
/// will not use again.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn destroy_raw_uuid(obj: *mut [u8; 16]) {
    if obj.is_null() {
        return;
    }
    unsafe { ledger::release(obj.cast(), &[Kind::RawUuid], "destroy_raw_uuid") }
}

/// Release a string previously returned across the boundary, including an
/// `ExternError.message`.
///
/// # Safety
///
/// `s` must be a pointer produced by this library that the caller will not
/// use again. Null breaks the contract; it is logged and ignored.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn destroy_c_char(s: *mut c_char) {
    if s.is_null() {
        tracing::warn!("destroy_c_char called with null");
        return;
    }
    unsafe { ledger::release(s.cast(), &[Kind::CString], "destroy_c_char") }
}
