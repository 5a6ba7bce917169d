//! Shared Ring State - watermark global untuk koordinasi MPMC
//!
//! RingState adalah control structure; buffer elemennya dialokasikan
//! terpisah oleh caller (bisa sesederhana array `Slot<T>`) dan di-index
//! dengan posisi yang dikembalikan cursor.

#[cfg(loom)]
use loom::sync::atomic::{AtomicI32, Ordering};
#[cfg(not(loom))]
use std::sync::atomic::{AtomicI32, Ordering};

/// Padding untuk cache line isolation (64 bytes pada x86-64)
#[repr(C, align(64))]
pub(crate) struct CacheLinePadded<T> {
    value: T,
}

impl<T> CacheLinePadded<T> {
    const fn new(value: T) -> Self {
        Self { value }
    }
}

/// Shared state dari satu ring
///
/// Empat watermark 32-bit signed, semua mulai dari -1 sehingga increment
/// pertama menghasilkan sequence 0 dan aritmetika availability bebas
/// special-case. Counter boleh wrap di 2^31 selama jumlah participant
/// (producer + consumer) tetap <= capacity/2; melebihi batas itu adalah
/// caller bug yang tidak terdeteksi runtime.
#[repr(C)]
pub struct RingState {
    // Producer side - cache line aligned
    next_write: CacheLinePadded<AtomicI32>,
    last_write: CacheLinePadded<AtomicI32>,
    // Consumer side - cache line aligned
    next_read: CacheLinePadded<AtomicI32>,
    last_read: CacheLinePadded<AtomicI32>,
    // Immutable setelah init
    capacity: i32,
    mask: i32,
}

impl RingState {
    /// Membuat ring state baru. `capacity` HARUS power of 2 dan >= 2.
    ///
    /// # Panics
    /// Panic jika `capacity` bukan power of 2, < 2, atau > 2^30.
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity >= 2 && capacity.is_power_of_two(),
            "capacity must be power of 2 and >= 2"
        );
        // Headroom untuk aritmetika signed 32-bit
        assert!(capacity <= 1 << 30, "capacity must be <= 2^30");

        Self {
            next_write: CacheLinePadded::new(AtomicI32::new(-1)),
            last_write: CacheLinePadded::new(AtomicI32::new(-1)),
            next_read: CacheLinePadded::new(AtomicI32::new(-1)),
            last_read: CacheLinePadded::new(AtomicI32::new(-1)),
            capacity: capacity as i32,
            mask: capacity as i32 - 1,
        }
    }

    /// Kapasitas buffer
    #[inline(always)]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Sequence klaim producer terakhir (-1 jika belum ada)
    #[inline(always)]
    pub fn next_write_pos(&self) -> i32 {
        self.next_write.value.load(Ordering::Acquire)
    }

    /// Watermark write yang sudah dipublikasikan (-1 jika belum ada)
    #[inline(always)]
    pub fn last_write_pos(&self) -> i32 {
        self.last_write.value.load(Ordering::Acquire)
    }

    /// Sequence klaim consumer terakhir (-1 jika belum ada)
    #[inline(always)]
    pub fn next_read_pos(&self) -> i32 {
        self.next_read.value.load(Ordering::Acquire)
    }

    /// Watermark read yang sudah dipublikasikan (-1 jika belum ada)
    #[inline(always)]
    pub fn last_read_pos(&self) -> i32 {
        self.last_read.value.load(Ordering::Acquire)
    }

    #[inline(always)]
    pub(crate) fn next_write(&self) -> &AtomicI32 {
        &self.next_write.value
    }

    #[inline(always)]
    pub(crate) fn last_write(&self) -> &AtomicI32 {
        &self.last_write.value
    }

    #[inline(always)]
    pub(crate) fn next_read(&self) -> &AtomicI32 {
        &self.next_read.value
    }

    #[inline(always)]
    pub(crate) fn last_read(&self) -> &AtomicI32 {
        &self.last_read.value
    }

    #[inline(always)]
    pub(crate) fn capacity_i32(&self) -> i32 {
        self.capacity
    }

    #[inline(always)]
    pub(crate) fn mask(&self) -> i32 {
        self.mask
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;

    #[test]
    fn test_initial_watermarks() {
        let ring = RingState::new(8);

        assert_eq!(ring.capacity(), 8);
        assert_eq!(ring.next_write_pos(), -1);
        assert_eq!(ring.last_write_pos(), -1);
        assert_eq!(ring.next_read_pos(), -1);
        assert_eq!(ring.last_read_pos(), -1);
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn test_rejects_non_power_of_two() {
        let _ = RingState::new(6);
    }

    #[test]
    #[should_panic(expected = "power of 2")]
    fn test_rejects_capacity_one() {
        let _ = RingState::new(1);
    }
}
