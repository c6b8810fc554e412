//! End-to-end exchanges across the boundary: a producer exported the way a
//! wrapped library would export it, and a consumer releasing what it gets.

use std::ffi::{CStr, c_char, c_void};

use ffi_toolkit::bridge::abi::ffi_toolkit_live_allocations;
use ffi_toolkit::bridge::ledger;
use ffi_toolkit::{
    ErrorCode, ExternError, ExternResult, Outcome, ReceivedResult, ToolkitError,
    assert_pointer_not_null, c_char_to_str, destroy, destroy_c_char, destroy_extern_error,
    destroy_raw_uuid, extern_result_destroy, guard,
};
use parking_lot::Mutex;
use uuid::Uuid;

/// Every test here checks the process-wide live allocation count.
static SERIAL: Mutex<()> = Mutex::new(());

#[repr(C)]
pub struct Session {
    expires_in: u32,
    user: *mut c_char,
}

impl Drop for Session {
    fn drop(&mut self) {
        unsafe { destroy_c_char(self.user) };
    }
}

ffi_toolkit::define_destructor!(destroy_session, Session);

unsafe extern "C" fn authenticate(
    user: *const c_char,
    password: *const c_char,
) -> *mut ExternResult {
    guard::call("authenticate", || {
        assert_pointer_not_null!(user, password);
        let user = unsafe { c_char_to_str(user) }?;
        let password = unsafe { c_char_to_str(password) }?;
        if user != "alice" || password != "hunter2" {
            return Err(ToolkitError::Authentication("invalid credentials".into()));
        }
        Ok(Session {
            expires_in: 3600,
            user: ffi_toolkit::string_to_c_char(user),
        })
    })
}

unsafe extern "C" fn session_id(user: *const c_char) -> *mut ExternResult {
    guard::call_optional("session_id", || {
        let user = unsafe { c_char_to_str(user) }?;
        Ok((user == "alice").then(|| *Uuid::from_u128(0x5eed).as_bytes()))
    })
}

#[test]
fn test_successful_authentication() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = unsafe { authenticate(c"alice".as_ptr(), c"hunter2".as_ptr()) };
    unsafe {
        let ok = (*result).ok;
        assert!(!ok.is_null());
        assert!((*result).err.is_null());

        let session = &*(ok as *const Session);
        assert_eq!(session.expires_in, 3600);
        assert_eq!(CStr::from_ptr(session.user).to_str().unwrap(), "alice");

        destroy(ok as *mut c_void);
        extern_result_destroy(result);
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_session_destructor_only_takes_sessions() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = unsafe { authenticate(c"alice".as_ptr(), c"hunter2".as_ptr()) };
    unsafe {
        let ok = (*result).ok as *mut Session;
        destroy_session(result.cast());
        assert!(ledger::is_tracked(result));

        destroy_session(ok);
        assert!(!ledger::is_tracked(ok));
        extern_result_destroy(result);
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_failed_authentication_release_message_first() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = unsafe { authenticate(c"alice".as_ptr(), c"wrong".as_ptr()) };
    unsafe {
        assert!((*result).ok.is_null());
        let err = (*result).err;
        assert!(!err.is_null());
        assert_eq!((*err).code(), ErrorCode::AuthenticationError);
        let message = (*err).message();
        assert!(!message.is_null());
        assert_eq!(CStr::from_ptr(message).to_str().unwrap(), "invalid credentials");

        destroy_c_char(message as *mut c_char);
        destroy_extern_error(err as *mut ExternError);
        extern_result_destroy(result);
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_failed_authentication_combined_release() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = unsafe { authenticate(c"mallory".as_ptr(), c"hunter2".as_ptr()) };
    let received = unsafe { ReceivedResult::from_raw(result) }.unwrap();
    match received.outcome().unwrap() {
        Outcome::Err { code, message } => {
            assert_eq!(code, ErrorCode::AuthenticationError);
            assert_eq!(message.to_str().unwrap(), "invalid credentials");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    drop(received);
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_null_argument_reported_as_other() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = unsafe { authenticate(c"alice".as_ptr(), std::ptr::null()) };
    let received = unsafe { ReceivedResult::from_raw(result) }.unwrap();
    match unsafe { received.into_result::<Session>() } {
        Err(ToolkitError::Other(msg)) => {
            assert!(msg.contains("Unexpected null pointer: password"), "{msg}");
        }
        other => panic!("expected Other, got {:?}", other.map(|s| s.map(|s| s.expires_in))),
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_optional_identifier() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    unsafe {
        let found = session_id(c"alice".as_ptr());
        let raw = (*found).ok as *mut [u8; 16];
        assert!(!raw.is_null());
        assert_eq!(
            ffi_toolkit::raw_to_uuid(raw).unwrap(),
            Uuid::from_u128(0x5eed)
        );
        // Released through the generic path since it was handed out as a payload.
        destroy(raw.cast());
        extern_result_destroy(found);

        let missing = session_id(c"bob".as_ptr());
        assert!((*missing).ok.is_null());
        assert!((*missing).err.is_null());
        extern_result_destroy(missing);
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_uuid_payload_needs_uuid_destructor() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = ExternResult::ok_uuid(Uuid::from_u128(7));
    unsafe {
        let raw = (*result).ok as *mut [u8; 16];
        destroy(raw.cast());
        assert_eq!(ledger::kind_of(raw), Some(ledger::Kind::RawUuid));
        destroy_raw_uuid(raw);
        extern_result_destroy(result);
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_double_release_is_ignored() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let result = unsafe { authenticate(c"alice".as_ptr(), c"hunter2".as_ptr()) };
    unsafe {
        let ok = (*result).ok as *mut c_void;
        destroy(ok);
        destroy(ok);
        extern_result_destroy(result);
        extern_result_destroy(result);
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}

#[test]
fn test_independent_calls_across_threads() {
    let _serial = SERIAL.lock();
    let baseline = ffi_toolkit_live_allocations();

    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let password = if i % 2 == 0 { c"hunter2" } else { c"nope" };
                let result = unsafe { authenticate(c"alice".as_ptr(), password.as_ptr()) };
                let received = unsafe { ReceivedResult::from_raw(result) }.unwrap();
                let outcome = unsafe { received.into_result::<Session>() };
                match (i % 2, outcome) {
                    (0, Ok(Some(session))) => assert_eq!(session.expires_in, 3600),
                    (1, Err(err)) => assert_eq!(err.code(), ErrorCode::AuthenticationError),
                    (_, other) => panic!("unexpected outcome for call {i}: {:?}", other.is_ok()),
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(ffi_toolkit_live_allocations(), baseline);
}
