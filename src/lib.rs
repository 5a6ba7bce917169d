//! Talaria - Lock-Free Concurrency Primitives
//!
//! Dua primitive inti untuk pipeline low-latency:
//! - Ring Coordinator: klaim slot FIFO MPMC dengan transaksi dua fase
//!   (begin/commit), buffer elemen dimiliki caller
//! - ArcCell: atomic shared pointer, pair (control block, data) diganti
//!   atomik via 128-bit CAS
//!
//! Prinsip desain:
//! - Lock-Free: hanya atomic operations, tidak ada Mutex/RwLock
//! - No-Allocation: core tidak pernah alokasi, semua storage dari caller
//! - Kernel-Capable: tidak ada syscall, tidak ada blocking OS primitive,
//!   semua wait adalah busy-spin dengan fence eksplisit

pub mod cell;
pub mod ring;

pub use cell::{ArcCell, ControlBlock, DestroyFn, SharedRef};
pub use ring::{slot_array, RingState, Slot, StreamCursor};
