//! Atomic Reference Cell: lock-free atomic shared pointer
//!
//! Prinsip desain:
//! - Pair (control block, data) selalu diganti atomik via 128-bit CAS,
//!   reader tidak pernah melihat pair yang sobek
//! - Refcount hidup di control block yang dialokasikan caller; destructor
//!   caller membebaskan kedua alokasi
//! - Sentinel BUSY menutup celah increment-after-free pada store/load

mod control;
mod shared;

pub use control::{ControlBlock, DestroyFn};
pub use shared::{ArcCell, SharedRef};
