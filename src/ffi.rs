//! C-callable entry points.
//!
//! Each table is handed out as an opaque, heap-allocated handle created by a
//! `*_new` function and released by the matching `*_free`. Keys and values
//! are never copied or freed by the table: the caller keeps every key buffer
//! and value alive until the handle is freed.
//!
//! Byte keys are passed as a pointer and a length. A null pointer is only
//! accepted together with a length of zero. Panics do not unwind across these
//! functions; a failed allocation aborts the process.

use alloc::boxed::Box;
use core::ffi::c_void;
use core::ptr;

use crate::BorrowedHashMap;
use crate::BorrowedHashSet;
use crate::IntMap;

/// Opaque handle to a set of byte-buffer keys.
pub struct SwissSet(BorrowedHashSet<'static>);

/// Opaque handle to a map from byte-buffer keys to value pointers.
pub struct SwissMap(BorrowedHashMap<'static, *mut c_void>);

/// Opaque handle to a map from native integers to value pointers.
pub struct SwissIntMap(IntMap<usize, *mut c_void>);

/// Visitor for [`swiss_set_foreach`].
pub type SwissSetVisitor =
    Option<unsafe extern "C" fn(key: *const u8, len: usize, user_data: *mut c_void)>;

/// Visitor for [`swiss_map_foreach`].
pub type SwissMapVisitor = Option<
    unsafe extern "C" fn(key: *const u8, len: usize, value: *mut c_void, user_data: *mut c_void),
>;

/// Visitor for [`swiss_intmap_foreach`].
pub type SwissIntMapVisitor =
    Option<unsafe extern "C" fn(key: usize, value: *mut c_void, user_data: *mut c_void)>;

/// Builds the key slice for a caller-supplied buffer.
///
/// # Safety
///
/// `key` must be valid for reads of `len` bytes for `'a`, or be null with
/// `len == 0`.
#[inline]
unsafe fn key_bytes<'a>(key: *const u8, len: usize) -> &'a [u8] {
    if key.is_null() {
        debug_assert_eq!(len, 0, "null key with non-zero length");
        &[]
    } else {
        // SAFETY: Caller guarantees `len` readable bytes at `key`.
        unsafe { core::slice::from_raw_parts(key, len) }
    }
}

/// Creates an empty set.
#[unsafe(no_mangle)]
pub extern "C" fn swiss_set_new() -> *mut SwissSet {
    swiss_set_with_capacity(0)
}

/// Creates an empty set able to hold `capacity` keys without resizing.
#[unsafe(no_mangle)]
pub extern "C" fn swiss_set_with_capacity(capacity: usize) -> *mut SwissSet {
    Box::into_raw(Box::new(SwissSet(BorrowedHashSet::with_capacity(capacity))))
}

/// Frees a set. The key buffers themselves are untouched.
///
/// # Safety
///
/// `set` must be null or a handle from [`swiss_set_new`] that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_set_free(set: *mut SwissSet) {
    if !set.is_null() {
        // SAFETY: The handle was created by `Box::into_raw` and is freed once.
        drop(unsafe { Box::from_raw(set) });
    }
}

/// Inserts a key and returns the pointer of the stored key: `key` itself for
/// a new entry, or the pointer from the earlier insert of equal bytes.
///
/// # Safety
///
/// `set` must be a live handle. The `len` bytes at `key` must stay valid and
/// unmodified until the set is freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_set_insert(
    set: *mut SwissSet,
    key: *const u8,
    len: usize,
) -> *const u8 {
    // SAFETY: Caller guarantees a live handle and a key that outlives it.
    unsafe { (*set).0.insert(key_bytes(key, len)).as_ptr() }
}

/// Returns the stored key pointer equal to the given bytes, or null.
///
/// # Safety
///
/// `set` must be a live handle and `key` valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_set_search(
    set: *const SwissSet,
    key: *const u8,
    len: usize,
) -> *const u8 {
    // SAFETY: Caller guarantees a live handle and a readable key.
    unsafe {
        (*set)
            .0
            .get(key_bytes(key, len))
            .map_or(ptr::null(), |stored| stored.as_ptr())
    }
}

/// Calls `visit` once for every key. A null `visit` does nothing.
///
/// # Safety
///
/// `set` must be a live handle. `visit` must not insert into or free the set.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_set_foreach(
    set: *const SwissSet,
    visit: SwissSetVisitor,
    user_data: *mut c_void,
) {
    let Some(visit) = visit else {
        return;
    };
    // SAFETY: Caller guarantees a live handle that `visit` leaves unchanged.
    unsafe {
        for key in (*set).0.iter() {
            visit(key.as_ptr(), key.len(), user_data);
        }
    }
}

/// Ensures the set can hold `size_hint` keys in total without resizing.
///
/// # Safety
///
/// `set` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_set_reserve(set: *mut SwissSet, size_hint: usize) {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*set).0.reserve(size_hint) }
}

/// Returns the number of keys in the set.
///
/// # Safety
///
/// `set` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_set_len(set: *const SwissSet) -> usize {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*set).0.len() }
}

/// Creates an empty map.
#[unsafe(no_mangle)]
pub extern "C" fn swiss_map_new() -> *mut SwissMap {
    swiss_map_with_capacity(0)
}

/// Creates an empty map able to hold `capacity` entries without resizing.
#[unsafe(no_mangle)]
pub extern "C" fn swiss_map_with_capacity(capacity: usize) -> *mut SwissMap {
    Box::into_raw(Box::new(SwissMap(BorrowedHashMap::with_capacity(capacity))))
}

/// Frees a map. Keys and values are untouched.
///
/// # Safety
///
/// `map` must be null or a handle from [`swiss_map_new`] that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_map_free(map: *mut SwissMap) {
    if !map.is_null() {
        // SAFETY: The handle was created by `Box::into_raw` and is freed once.
        drop(unsafe { Box::from_raw(map) });
    }
}

/// Inserts `key -> value` unless the key is present, and returns the stored
/// key pointer. An existing value is never replaced.
///
/// # Safety
///
/// `map` must be a live handle. The `len` bytes at `key` must stay valid and
/// unmodified until the map is freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_map_insert(
    map: *mut SwissMap,
    key: *const u8,
    len: usize,
    value: *mut c_void,
) -> *const u8 {
    // SAFETY: Caller guarantees a live handle and a key that outlives it.
    unsafe { (*map).0.insert(key_bytes(key, len), value).as_ptr() }
}

/// Returns the value stored under the given bytes, or null.
///
/// A stored null value is indistinguishable from a miss.
///
/// # Safety
///
/// `map` must be a live handle and `key` valid for reads of `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_map_search(
    map: *const SwissMap,
    key: *const u8,
    len: usize,
) -> *mut c_void {
    // SAFETY: Caller guarantees a live handle and a readable key.
    unsafe {
        (*map)
            .0
            .get(key_bytes(key, len))
            .copied()
            .unwrap_or(ptr::null_mut())
    }
}

/// Calls `visit` once for every entry. A null `visit` does nothing.
///
/// # Safety
///
/// `map` must be a live handle. `visit` must not insert into or free the map.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_map_foreach(
    map: *const SwissMap,
    visit: SwissMapVisitor,
    user_data: *mut c_void,
) {
    let Some(visit) = visit else {
        return;
    };
    // SAFETY: Caller guarantees a live handle that `visit` leaves unchanged.
    unsafe {
        for (key, &value) in (*map).0.iter() {
            visit(key.as_ptr(), key.len(), value, user_data);
        }
    }
}

/// Ensures the map can hold `size_hint` entries in total without resizing.
///
/// # Safety
///
/// `map` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_map_reserve(map: *mut SwissMap, size_hint: usize) {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*map).0.reserve(size_hint) }
}

/// Returns the number of entries in the map.
///
/// # Safety
///
/// `map` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_map_len(map: *const SwissMap) -> usize {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*map).0.len() }
}

/// Creates an empty integer map.
#[unsafe(no_mangle)]
pub extern "C" fn swiss_intmap_new() -> *mut SwissIntMap {
    swiss_intmap_with_capacity(0)
}

/// Creates an empty integer map able to hold `capacity` entries without
/// resizing.
#[unsafe(no_mangle)]
pub extern "C" fn swiss_intmap_with_capacity(capacity: usize) -> *mut SwissIntMap {
    Box::into_raw(Box::new(SwissIntMap(IntMap::with_capacity(capacity))))
}

/// Frees an integer map. Values are untouched.
///
/// # Safety
///
/// `map` must be null or a handle from [`swiss_intmap_new`] that has not been
/// freed yet.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_intmap_free(map: *mut SwissIntMap) {
    if !map.is_null() {
        // SAFETY: The handle was created by `Box::into_raw` and is freed once.
        drop(unsafe { Box::from_raw(map) });
    }
}

/// Inserts `key -> value` unless the key is present, and returns the stored
/// key, which always equals `key`.
///
/// # Safety
///
/// `map` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_intmap_insert(
    map: *mut SwissIntMap,
    key: usize,
    value: *mut c_void,
) -> usize {
    // SAFETY: Caller guarantees a live handle.
    unsafe { *(*map).0.insert(key, value) }
}

/// Returns the value stored under `key`, or null.
///
/// # Safety
///
/// `map` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_intmap_search(map: *const SwissIntMap, key: usize) -> *mut c_void {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*map).0.get(key).copied().unwrap_or(ptr::null_mut()) }
}

/// Calls `visit` once for every entry. A null `visit` does nothing.
///
/// # Safety
///
/// `map` must be a live handle. `visit` must not insert into or free the map.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_intmap_foreach(
    map: *const SwissIntMap,
    visit: SwissIntMapVisitor,
    user_data: *mut c_void,
) {
    let Some(visit) = visit else {
        return;
    };
    // SAFETY: Caller guarantees a live handle that `visit` leaves unchanged.
    unsafe {
        for (&key, &value) in (*map).0.iter() {
            visit(key, value, user_data);
        }
    }
}

/// Ensures the map can hold `size_hint` entries in total without resizing.
///
/// # Safety
///
/// `map` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_intmap_reserve(map: *mut SwissIntMap, size_hint: usize) {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*map).0.reserve(size_hint) }
}

/// Returns the number of entries in the map.
///
/// # Safety
///
/// `map` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn swiss_intmap_len(map: *const SwissIntMap) -> usize {
    // SAFETY: Caller guarantees a live handle.
    unsafe { (*map).0.len() }
}
