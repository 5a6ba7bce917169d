//! Slot storage untuk buffer elemen milik caller
//!
//! Coordinator tidak pernah menyentuh storage; tipe ini hanya membantu
//! caller membangun array backing yang aman di-share antar thread.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;

/// Satu slot elemen - cache line aligned untuk menghindari false sharing
#[repr(C, align(64))]
pub struct Slot<T> {
    data: UnsafeCell<MaybeUninit<T>>,
}

// SAFETY: protokol claim/commit menjamin tepat satu producer memegang slot
// antara begin_write dan commit_write, dan tepat satu consumer antara
// begin_read dan commit_read. Di luar window itu slot tidak dimutasi.
unsafe impl<T: Send> Send for Slot<T> {}
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub const fn new() -> Self {
        Self {
            data: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }
}

impl<T> Default for Slot<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy> Slot<T> {
    /// Tulis nilai ke slot
    ///
    /// # Safety
    /// Caller harus memegang klaim write eksklusif atas slot ini
    /// (antara `begin_write` dan `commit_write`).
    #[inline(always)]
    pub unsafe fn write(&self, value: T) {
        (*self.data.get()).write(value);
    }

    /// Baca nilai dari slot
    ///
    /// # Safety
    /// Caller harus memegang klaim read eksklusif, dan slot harus sudah
    /// ditulis oleh producer yang commit-nya sudah terlihat.
    #[inline(always)]
    pub unsafe fn read(&self) -> T {
        (*self.data.get()).assume_init_read()
    }
}

/// Alokasi array slot di heap untuk dipakai sebagai backing buffer.
///
/// Helper di sisi caller; core sendiri tidak pernah alokasi.
pub fn slot_array<T>(capacity: usize) -> Box<[Slot<T>]> {
    let mut buffer = Vec::with_capacity(capacity);
    for _ in 0..capacity {
        buffer.push(Slot::new());
    }
    buffer.into_boxed_slice()
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_write_then_read() {
        let slot: Slot<u64> = Slot::new();

        unsafe {
            slot.write(42);
            assert_eq!(slot.read(), 42);
        }
    }

    #[test]
    fn test_slot_array_len() {
        let slots: Box<[Slot<u32>]> = slot_array(16);
        assert_eq!(slots.len(), 16);
    }
}
