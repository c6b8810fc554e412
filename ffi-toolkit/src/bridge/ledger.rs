//! Allocation ledger for every pointer handed across the boundary.
//!
//! Each allocation is recorded with its payload kind and the typed function
//! that releases it, so a destructor never frees memory with a layout other
//! than the one it was allocated with. Unknown pointers (double free, foreign
//! allocations) and pointers passed to the wrong destructor are reported and
//! left alone.

use std::ffi::c_void;

use dashmap::DashMap;
use once_cell::sync::Lazy;

use crate::error::ToolkitError;

/// What a boundary pointer points at. Decides which destructor may free it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// A boxed value handed out as `ExternResult.ok`.
    Payload,
    /// A NUL-terminated string allocated as a `CString`.
    CString,
    /// A boxed `[u8; 16]`.
    RawUuid,
    /// A boxed `ExternError`.
    Error,
    /// A boxed `ExternResult`.
    Result,
}

impl Kind {
    /// The exported function the consumer should have called for this kind.
    pub fn destructor(self) -> &'static str {
        match self {
            Kind::Payload => "destroy",
            Kind::CString => "destroy_c_char",
            Kind::RawUuid => "destroy_raw_uuid",
            Kind::Error => "destroy_extern_error",
            Kind::Result => "extern_result_destroy",
        }
    }
}

pub(crate) type Release = unsafe fn(*mut c_void);

struct Entry {
    kind: Kind,
    type_name: &'static str,
    release: Release,
    /// Address of the enclosing allocation that releases this one, or 0.
    owner: usize,
}

/// Keyed by address. Zero-sized payloads share a dangling address, hence
/// the vector; every other address holds exactly one entry.
static LEDGER: Lazy<DashMap<usize, Vec<Entry>>> = Lazy::new(DashMap::new);

enum Miss {
    WrongKind(Kind, &'static str),
    /// Zero-sized values of different types share the address and the
    /// caller did not say which one it means.
    Ambiguous,
    Unknown,
}

/// Release function for any `Box<T>`.
pub(crate) unsafe fn drop_box<T>(ptr: *mut c_void) {
    drop(unsafe { Box::from_raw(ptr.cast::<T>()) });
}

/// Record `ptr` as a live `kind` allocation of `size` bytes.
///
/// Only zero-sized values may share an address. Tracking a sized allocation
/// that is already live is refused, so it still has a single entry and is
/// released once.
pub(crate) fn track(
    ptr: *mut c_void,
    kind: Kind,
    type_name: &'static str,
    size: usize,
    release: Release,
) -> bool {
    let mut entries = LEDGER.entry(ptr as usize).or_default();
    if size != 0 {
        if let Some(live) = entries.first() {
            let (live_kind, live_type) = (live.kind, live.type_name);
            drop(entries);
            tracing::error!(
                ?kind,
                type_name,
                ?live_kind,
                live_type,
                "{ptr:p} is already a live boundary allocation; not tracking it twice"
            );
            on_violation();
            return false;
        }
    }
    entries.push(Entry {
        kind,
        type_name,
        release,
        owner: 0,
    });
    drop(entries);
    tracing::trace!(?kind, type_name, "tracked {ptr:p}");
    true
}

/// Box `value` and record it under `kind`.
pub(crate) fn hand_out<T>(value: T, kind: Kind) -> *mut T {
    let ptr = Box::into_raw(Box::new(value));
    track(
        ptr.cast(),
        kind,
        std::any::type_name::<T>(),
        std::mem::size_of::<T>(),
        drop_box::<T>,
    );
    ptr
}

/// Mark the live `kind` allocation at `ptr` as owned by `owner`.
pub(crate) fn adopt(ptr: *mut c_void, kind: Kind, owner: *const c_void) {
    if let Some(mut entries) = LEDGER.get_mut(&(ptr as usize)) {
        if let Some(entry) = entries.iter_mut().find(|e| e.kind == kind && e.owner == 0) {
            entry.owner = owner as usize;
        }
    }
}

fn take(addr: usize, accept: impl Fn(&Entry) -> bool) -> Result<Entry, Miss> {
    let entry = {
        let Some(mut entries) = LEDGER.get_mut(&addr) else {
            return Err(Miss::Unknown);
        };
        let mut matching = entries.iter().enumerate().filter(|&(_, e)| accept(e));
        let Some((pos, first)) = matching.next() else {
            return Err(entries
                .first()
                .map(|e| Miss::WrongKind(e.kind, e.type_name))
                .unwrap_or(Miss::Unknown));
        };
        let type_name = first.type_name;
        if matching.any(|(_, e)| e.type_name != type_name) {
            return Err(Miss::Ambiguous);
        }
        entries.swap_remove(pos)
    };
    LEDGER.remove_if(&addr, |_, entries| entries.is_empty());
    Ok(entry)
}

/// Release `ptr` if it is live and of one of the `accepted` kinds.
///
/// Anything else is logged against `caller` and nothing is freed.
///
/// # Safety
///
/// No other reference to the pointee may be used after this returns.
pub(crate) unsafe fn release(ptr: *mut c_void, accepted: &[Kind], caller: &'static str) {
    unsafe { release_where(ptr, caller, |e| accepted.contains(&e.kind)) }
}

/// Like [`release`], also requiring the allocation to hold a `type_name`.
///
/// # Safety
///
/// Same as [`release`].
pub(crate) unsafe fn release_as(
    ptr: *mut c_void,
    accepted: &[Kind],
    type_name: &str,
    caller: &'static str,
) {
    unsafe {
        release_where(ptr, caller, |e| {
            accepted.contains(&e.kind) && e.type_name == type_name
        })
    }
}

unsafe fn release_where(ptr: *mut c_void, caller: &'static str, accept: impl Fn(&Entry) -> bool) {
    match take(ptr as usize, accept) {
        Ok(entry) => {
            tracing::trace!(caller, kind = ?entry.kind, "releasing {ptr:p}");
            unsafe { (entry.release)(ptr) }
        }
        Err(Miss::WrongKind(kind, type_name)) => {
            tracing::error!(
                caller,
                ?kind,
                type_name,
                expected = kind.destructor(),
                "pointer {ptr:p} passed to the wrong destructor; leaking it"
            );
            on_violation();
        }
        Err(Miss::Ambiguous) => {
            tracing::error!(
                caller,
                "zero-sized values of different types share {ptr:p}; release them through a typed destructor"
            );
            on_violation();
        }
        Err(Miss::Unknown) => {
            tracing::warn!(
                caller,
                "pointer {ptr:p} is not a live boundary allocation (double free or foreign pointer); ignoring"
            );
            on_violation();
        }
    }
}

/// Release `ptr` if still live under `kind` and owned by `owner`; silent
/// otherwise.
///
/// Used for allocations owned by an enclosing value that the consumer may
/// already have released on their own. The owner check keeps a reused
/// address from being mistaken for the original allocation.
pub(crate) unsafe fn reclaim(ptr: *mut c_void, kind: Kind, owner: *const c_void) -> bool {
    if ptr.is_null() {
        return false;
    }
    match take(ptr as usize, |e| e.kind == kind && e.owner == owner as usize) {
        Ok(entry) => {
            unsafe { (entry.release)(ptr) };
            true
        }
        Err(_) => false,
    }
}

/// Take ownership of a `Payload` back as a `Box<T>` without dropping it.
///
/// Fails without touching the allocation when `ptr` is not a live payload
/// of type `T`.
pub(crate) unsafe fn claim<T>(ptr: *mut c_void) -> Result<Box<T>, ToolkitError> {
    let wanted = std::any::type_name::<T>();
    match take(ptr as usize, |e| e.kind == Kind::Payload && e.type_name == wanted) {
        Ok(_) => Ok(unsafe { Box::from_raw(ptr.cast::<T>()) }),
        Err(Miss::WrongKind(kind, type_name)) => Err(ToolkitError::ContractViolation(format!(
            "{ptr:p} is a {kind:?} allocation of {type_name}, not a {wanted} payload"
        ))),
        Err(Miss::Ambiguous | Miss::Unknown) => Err(ToolkitError::ContractViolation(format!(
            "{ptr:p} is not a live payload"
        ))),
    }
}

fn on_violation() {
    if crate::config::is_strict() {
        tracing::error!("strict mode: aborting on boundary contract violation");
        std::process::abort();
    }
}

/// Whether `ptr` is currently a live boundary allocation.
pub fn is_tracked<T>(ptr: *const T) -> bool {
    LEDGER.contains_key(&(ptr as usize))
}

/// Kind of the live allocation at `ptr`, if any.
pub fn kind_of<T>(ptr: *const T) -> Option<Kind> {
    LEDGER
        .get(&(ptr as usize))
        .and_then(|entries| entries.first().map(|e| e.kind))
}

/// Number of live boundary allocations in the process.
pub fn live_allocations() -> usize {
    LEDGER.iter().map(|entries| entries.len()).sum()
}

/// Tests that release a pointer twice must not run alongside tests that
/// allocate, or the freed address may be handed out again in between.
#[cfg(test)]
pub(crate) fn serial() -> parking_lot::MutexGuard<'static, ()> {
    static LOCK: parking_lot::Mutex<()> = parking_lot::Mutex::new(());
    LOCK.lock()
}
