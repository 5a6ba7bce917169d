//! Control Block - refcount + destructor milik caller

use std::ffi::c_void;
use std::sync::atomic::AtomicI32;

/// Destructor yang disuplai caller
///
/// Dipanggil tepat sekali saat reference terakhir di-drop, dengan context
/// yang disimpan saat konstruksi. Bertanggung jawab membebaskan data
/// region DAN control block.
pub type DestroyFn = unsafe fn(context: *mut c_void, data: *mut c_void, control: *mut ControlBlock);

/// Control block dari satu shared value
///
/// Satu-satunya field yang di-share antar thread adalah `refcount`
/// (interlocked); sisanya immutable setelah konstruksi.
#[repr(C)]
pub struct ControlBlock {
    pub(crate) refcount: AtomicI32,
    pub(crate) destroy_context: *mut c_void,
    pub(crate) destroy: DestroyFn,
}

impl ControlBlock {
    /// Inisialisasi control block dengan refcount awal
    pub fn new(refcount: i32, destroy_context: *mut c_void, destroy: DestroyFn) -> Self {
        Self {
            refcount: AtomicI32::new(refcount),
            destroy_context,
            destroy,
        }
    }
}
