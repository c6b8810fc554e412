//! 16-byte identifiers handed across as `uuid_t`.

use uuid::Uuid;

use crate::bridge::ledger::{self, Kind};
use crate::error::ToolkitError;

/// Box the raw bytes of `id` for the consumer. Release with `destroy_raw_uuid`.
pub fn uuid_to_raw(id: Uuid) -> *mut [u8; 16] {
    ledger::hand_out(*id.as_bytes(), Kind::RawUuid)
}

/// Read a raw identifier without taking ownership.
///
/// # Safety
///
/// `ptr` must be null or point at 16 readable bytes.
pub unsafe fn raw_to_uuid(ptr: *const [u8; 16]) -> Result<Uuid, ToolkitError> {
    if ptr.is_null() {
        return Err(ToolkitError::NullPointer("uuid"));
    }
    Ok(Uuid::from_bytes(unsafe { *ptr }))
}
