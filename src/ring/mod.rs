//! Ring Coordinator: Lock-Free MPMC slot claiming
//!
//! Prinsip desain:
//! - Two-Phase: reserve slot (begin) lalu publikasikan (commit)
//! - External Storage: coordinator hanya membagikan index, buffer elemen
//!   dialokasikan dan dimiliki caller
//! - Queue Semantics: FIFO untuk SPSC/MPSC; pada MPMC setiap elemen
//!   dikonsumsi oleh tepat satu consumer, urutan antar consumer tidak
//!   dipertahankan (bukan pub-sub)

mod cursor;
mod slot;
mod state;

pub use cursor::StreamCursor;
pub use slot::{slot_array, Slot};
pub use state::RingState;
