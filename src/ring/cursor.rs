//! Stream Cursor - posisi per-thread dalam ring
//!
//! Setiap thread yang menulis/membaca stream memerlukan cursor lokalnya
//! sendiri. Jumlah thread bebas (MPMC), dengan batas: total participant
//! hidup (producer + consumer) tidak boleh melebihi capacity/2, karena
//! di atas itu aritmetika sequence signed 32-bit bisa alias dengan klaim
//! yang masih in-flight.
//!
//! Akses synchronous dan asynchronous boleh dicampur pada ring yang sama:
//! satu thread menulis blocking sementara thread lain membaca via poll
//! supaya bisa melayani beberapa ring sekaligus (round-robin).

#[cfg(loom)]
use loom::sync::atomic::{fence, Ordering};
#[cfg(not(loom))]
use std::sync::atomic::{fence, Ordering};

use super::state::RingState;

/// Cursor per-thread: shared borrow ke ring + sequence klaim saat ini
pub struct StreamCursor<'a> {
    ring: &'a RingState,
    current_pos: i32,
}

impl<'a> StreamCursor<'a> {
    /// Bind cursor ke ring; belum ada klaim (current_pos = -1)
    pub fn new(ring: &'a RingState) -> Self {
        Self {
            ring,
            current_pos: -1,
        }
    }

    /// Sequence yang terakhir diklaim cursor ini (-1 sebelum klaim pertama)
    #[inline(always)]
    pub fn current_pos(&self) -> i32 {
        self.current_pos
    }

    /// Ruang tersedia untuk menulis, dilihat dari klaim cursor ini
    ///
    /// `capacity + last_read - current_pos + 1`, dihitung wrapping karena
    /// sequence boleh wrap di 2^31.
    #[inline(always)]
    pub fn available_write(&self) -> i32 {
        let last_read = self.ring.last_read().load(Ordering::Acquire);
        self.ring
            .capacity_i32()
            .wrapping_add(last_read.wrapping_sub(self.current_pos))
            .wrapping_add(1)
    }

    /// Elemen tersedia untuk dibaca, dilihat dari klaim cursor ini
    #[inline(always)]
    pub fn available_read(&self) -> i32 {
        let last_write = self.ring.last_write().load(Ordering::Acquire);
        last_write.wrapping_sub(self.current_pos).wrapping_add(1)
    }

    /// Klaim satu slot untuk ditulis (blocking)
    ///
    /// Increment atomik pada `next_write` memberi total ordering antar
    /// producer, lalu spin sampai slot bebas dari consumer. Returns index
    /// slot dalam buffer caller; cursor memegang slot itu eksklusif sampai
    /// `commit_write`.
    #[inline]
    pub fn begin_write(&mut self) -> usize {
        self.current_pos = self
            .ring
            .next_write()
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1);

        while self.available_write() < 1 {
            // Full fence tiap iterasi supaya watermark tidak dibaca stale
            fence(Ordering::SeqCst);
            std::hint::spin_loop();
        }

        self.slot_index()
    }

    /// Publikasikan hasil write klaim saat ini
    ///
    /// Watermark maju tepat 1, berurutan sequence: commit menunggu sampai
    /// predecessor-nya sudah publish. Payload store harus selesai sebelum
    /// memanggil ini.
    #[inline]
    pub fn commit_write(&mut self) {
        let prev = self.current_pos.wrapping_sub(1);

        while self
            .ring
            .last_write()
            .compare_exchange(prev, self.current_pos, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    /// Klaim satu elemen untuk dibaca (blocking)
    ///
    /// Simetris dengan `begin_write`: spin sampai producer dari sequence
    /// ini sudah commit.
    #[inline]
    pub fn begin_read(&mut self) -> usize {
        self.current_pos = self
            .ring
            .next_read()
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1);

        while self.available_read() < 1 {
            fence(Ordering::SeqCst);
            std::hint::spin_loop();
        }

        self.slot_index()
    }

    /// Publikasikan selesainya read klaim saat ini (membebaskan slot)
    #[inline]
    pub fn commit_read(&mut self) {
        let prev = self.current_pos.wrapping_sub(1);

        while self
            .ring
            .last_read()
            .compare_exchange(prev, self.current_pos, Ordering::AcqRel, Ordering::Relaxed)
            .is_err()
        {
            std::hint::spin_loop();
        }
    }

    //
    // Poll (async) API
    //
    // Klaim diambil eagerly dan TIDAK bisa dibatalkan: claimant yang tidak
    // pernah commit akan menghentikan semua commit setelahnya selamanya.
    // Pemanggil poll_begin_* berkomitmen menyelesaikan transaksinya.
    //

    /// Klaim slot write tanpa menunggu. Slot BELUM writable; cek dengan
    /// `poll_write_ready` sebelum menyentuh buffer.
    #[inline(always)]
    pub fn poll_begin_write(&mut self) -> usize {
        self.current_pos = self
            .ring
            .next_write()
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1);

        self.slot_index()
    }

    /// Klaim elemen read tanpa menunggu. Elemen BELUM readable; cek dengan
    /// `poll_read_ready` sebelum menyentuh buffer.
    #[inline(always)]
    pub fn poll_begin_read(&mut self) -> usize {
        self.current_pos = self
            .ring
            .next_read()
            .fetch_add(1, Ordering::AcqRel)
            .wrapping_add(1);

        self.slot_index()
    }

    /// True jika slot klaim write sudah boleh ditulis
    #[inline(always)]
    pub fn poll_write_ready(&self) -> bool {
        fence(Ordering::SeqCst);
        self.available_write() >= 1
    }

    /// True jika elemen klaim read sudah boleh dibaca
    #[inline(always)]
    pub fn poll_read_ready(&self) -> bool {
        fence(Ordering::SeqCst);
        self.available_read() >= 1
    }

    /// Satu percobaan commit write. False berarti predecessor belum
    /// publish; panggil lagi nanti.
    #[inline(always)]
    pub fn poll_commit_write(&mut self) -> bool {
        let prev = self.current_pos.wrapping_sub(1);

        self.ring
            .last_write()
            .compare_exchange(prev, self.current_pos, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Satu percobaan commit read. False berarti predecessor belum
    /// publish; panggil lagi nanti.
    #[inline(always)]
    pub fn poll_commit_read(&mut self) -> bool {
        let prev = self.current_pos.wrapping_sub(1);

        self.ring
            .last_read()
            .compare_exchange(prev, self.current_pos, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }

    /// Index slot = current_pos & (capacity - 1); valid juga saat
    /// current_pos wrap ke negatif karena bitand two's complement
    /// ekivalen modulo untuk power of 2
    #[inline(always)]
    fn slot_index(&self) -> usize {
        (self.current_pos & self.ring.mask()) as usize
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::ring::{slot_array, Slot};

    #[test]
    fn test_first_claim_is_sequence_zero() {
        let ring = RingState::new(8);
        let mut writer = StreamCursor::new(&ring);

        let idx = writer.begin_write();
        assert_eq!(idx, 0);
        assert_eq!(writer.current_pos(), 0);
        assert_eq!(ring.next_write_pos(), 0);
        assert_eq!(ring.last_write_pos(), -1);

        writer.commit_write();
        assert_eq!(ring.last_write_pos(), 0);
    }

    #[test]
    fn test_availability_accounting() {
        let ring = RingState::new(8);
        let mut writer = StreamCursor::new(&ring);
        let mut reader = StreamCursor::new(&ring);

        // Ring kosong: klaim write pertama melihat seluruh kapasitas
        writer.begin_write();
        assert_eq!(writer.available_write(), 8);
        writer.commit_write();

        // Klaim read pertama melihat tepat satu elemen committed
        reader.begin_read();
        assert_eq!(reader.available_read(), 1);
        reader.commit_read();

        // Slot kembali bebas setelah read di-commit
        writer.begin_write();
        assert_eq!(writer.available_write(), 8);
    }

    #[test]
    fn test_spsc_fifo_across_wraparound() {
        let ring = RingState::new(8);
        let slots: Box<[Slot<u64>]> = slot_array(ring.capacity());
        let mut writer = StreamCursor::new(&ring);
        let mut reader = StreamCursor::new(&ring);

        // Isi dan kuras beberapa putaran untuk menguji index masking
        let mut next_value = 1u64;
        let mut expect = 1u64;
        for _ in 0..4 {
            for _ in 0..8 {
                let idx = writer.begin_write();
                unsafe { slots[idx].write(next_value) };
                writer.commit_write();
                next_value += 1;
            }
            for _ in 0..8 {
                let idx = reader.begin_read();
                let value = unsafe { slots[idx].read() };
                reader.commit_read();
                assert_eq!(value, expect);
                expect += 1;
            }
        }
    }

    #[test]
    fn test_slot_indices_cycle_with_mask() {
        let ring = RingState::new(4);
        let mut writer = StreamCursor::new(&ring);
        let mut reader = StreamCursor::new(&ring);

        for round in 0..3 {
            for i in 0..4 {
                assert_eq!(writer.begin_write(), i);
                writer.commit_write();
            }
            for i in 0..4 {
                assert_eq!(reader.begin_read(), i);
                reader.commit_read();
            }
            assert_eq!(ring.last_write_pos(), round * 4 + 3);
        }
    }

    #[test]
    fn test_poll_commit_requires_predecessor() {
        let ring = RingState::new(8);
        let mut first = StreamCursor::new(&ring);
        let mut second = StreamCursor::new(&ring);

        let idx_a = first.poll_begin_write();
        let idx_b = second.poll_begin_write();
        assert_eq!(idx_a, 0);
        assert_eq!(idx_b, 1);
        assert!(first.poll_write_ready());
        assert!(second.poll_write_ready());

        // Sequence 1 tidak bisa publish sebelum sequence 0
        assert!(!second.poll_commit_write());
        assert_eq!(ring.last_write_pos(), -1);

        assert!(first.poll_commit_write());
        assert!(second.poll_commit_write());
        assert_eq!(ring.last_write_pos(), 1);
    }

    #[test]
    fn test_poll_read_not_ready_on_empty_ring() {
        let ring = RingState::new(8);
        let mut writer = StreamCursor::new(&ring);
        let mut reader = StreamCursor::new(&ring);

        reader.poll_begin_read();
        assert!(!reader.poll_read_ready());

        writer.begin_write();
        assert!(!reader.poll_read_ready());

        writer.commit_write();
        assert!(reader.poll_read_ready());
        assert!(reader.poll_commit_read());
    }
}
