//! Allocator shim matching a third-party serializer's allocator-callback
//! ABI, modeled on the `extern "C"` conventions the teacher uses for its own
//! C API (`src/ffi/c_api.rs`): an opaque pointer plus a pair of raw
//! function pointers.

use std::ffi::c_void;

use super::context::Context;

/// Allocator callbacks bound to a single [`Context`]. `free` is a no-op —
/// nothing is ever released except by the context being dropped as a whole.
///
/// # Safety
///
/// `opaque` is only valid for as long as the `Context` it was derived from
/// is alive and not concurrently touched from another thread. Callers must
/// not let a `SerializerAllocator` outlive its `Context`.
#[repr(C)]
pub struct SerializerAllocator {
    pub opaque: *mut c_void,
    pub alloc: unsafe extern "C" fn(*mut c_void, usize) -> *mut u8,
    pub free: unsafe extern "C" fn(*mut c_void, *mut u8),
}

/// # Safety
/// `opaque` must point at a live `Context` not concurrently touched on
/// another thread.
unsafe extern "C" fn shim_alloc(opaque: *mut c_void, size: usize) -> *mut u8 {
    let ctx = &*(opaque as *const Context);
    match ctx.alloc(size) {
        Ok(ptr) => ptr.as_ptr(),
        Err(_) => std::ptr::null_mut(),
    }
}

unsafe extern "C" fn shim_free(_opaque: *mut c_void, _ptr: *mut u8) {}

impl Context {
    /// Packages this context as a serializer-facing allocator. The
    /// returned value borrows `self`'s address as its opaque pointer and
    /// must not outlive it.
    pub fn as_serializer_allocator(&self) -> SerializerAllocator {
        SerializerAllocator {
            opaque: self as *const Context as *mut c_void,
            alloc: shim_alloc,
            free: shim_free,
        }
    }
}
