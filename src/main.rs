//! Talaria - Lock-Free Concurrency Primitives
//!
//! Driver benchmark cepat untuk kedua komponen core:
//! - Ring Coordinator: claim/commit cycle, sync dan polling
//! - ArcCell: atomic load/store dengan refcount accounting

use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::time::Instant;

use talaria::{slot_array, ArcCell, ControlBlock, RingState, SharedRef, Slot, StreamCursor};

fn main() {
    println!("Talaria Lock-Free Primitives - v0.2");
    println!("===================================\n");

    benchmark_ring();
    benchmark_ring_polling();
    benchmark_arc_cell();

    println!("\nAll benchmarks complete.");
    println!("\nDemo drivers:");
    println!("  cargo run --release --bin talaria_relay");
    println!("  cargo run --release --bin talaria_config");
}

fn benchmark_ring() {
    println!("Ring Coordinator (sync claim/commit)");
    println!("------------------------------------");

    const ITERATIONS: usize = 1_000_000;

    let ring = RingState::new(65536);
    let slots: Box<[Slot<u64>]> = slot_array(ring.capacity());
    let mut writer = StreamCursor::new(&ring);
    let mut reader = StreamCursor::new(&ring);

    // Warm up
    for i in 0..1000u64 {
        let idx = writer.begin_write();
        unsafe { slots[idx].write(i) };
        writer.commit_write();

        let idx = reader.begin_read();
        let _ = unsafe { slots[idx].read() };
        reader.commit_read();
    }

    let start = Instant::now();
    for i in 0..ITERATIONS {
        let idx = writer.begin_write();
        unsafe { slots[idx].write(i as u64) };
        writer.commit_write();

        let idx = reader.begin_read();
        let _ = unsafe { slots[idx].read() };
        reader.commit_read();
    }
    let duration = start.elapsed();

    let cycle_ns = duration.as_nanos() as f64 / ITERATIONS as f64;
    println!("  Operations: {}", ITERATIONS);
    println!("  Write+read cycle: {:.2} ns/op", cycle_ns);
    println!(
        "  Throughput: {:.2} M cycles/sec\n",
        ITERATIONS as f64 / duration.as_secs_f64() / 1_000_000.0
    );
}

fn benchmark_ring_polling() {
    println!("Ring Coordinator (polling)");
    println!("--------------------------");

    const ITERATIONS: usize = 1_000_000;

    let ring = RingState::new(65536);
    let slots: Box<[Slot<u64>]> = slot_array(ring.capacity());
    let mut writer = StreamCursor::new(&ring);
    let mut reader = StreamCursor::new(&ring);

    let start = Instant::now();
    for i in 0..ITERATIONS {
        let idx = writer.poll_begin_write();
        while !writer.poll_write_ready() {}
        unsafe { slots[idx].write(i as u64) };
        while !writer.poll_commit_write() {}

        let idx = reader.poll_begin_read();
        while !reader.poll_read_ready() {}
        let _ = unsafe { slots[idx].read() };
        while !reader.poll_commit_read() {}
    }
    let duration = start.elapsed();

    let cycle_ns = duration.as_nanos() as f64 / ITERATIONS as f64;
    println!("  Operations: {}", ITERATIONS);
    println!("  Poll cycle: {:.2} ns/op", cycle_ns);
    println!(
        "  Throughput: {:.2} M cycles/sec\n",
        ITERATIONS as f64 / duration.as_secs_f64() / 1_000_000.0
    );
}

struct Config {
    threshold: u64,
}

unsafe fn destroy_config(_context: *mut c_void, data: *mut c_void, control: *mut ControlBlock) {
    drop(Box::from_raw(data.cast::<Config>()));
    drop(Box::from_raw(control.cast::<MaybeUninit<ControlBlock>>()));
}

fn make_config(threshold: u64) -> SharedRef<Config> {
    let data = Box::into_raw(Box::new(Config { threshold }));
    let control =
        Box::into_raw(Box::new(MaybeUninit::<ControlBlock>::uninit())).cast::<ControlBlock>();

    unsafe { SharedRef::new(data, std::ptr::null_mut(), destroy_config, control) }
}

fn benchmark_arc_cell() {
    println!("ArcCell (atomic shared pointer)");
    println!("-------------------------------");

    const LOADS: usize = 1_000_000;
    const STORES: usize = 100_000;

    let cell: ArcCell<Config> = ArcCell::new();
    let initial = make_config(0);
    cell.store(&initial);

    let start = Instant::now();
    for _ in 0..LOADS {
        let local = cell.load();
        let _ = unsafe { (*local.as_ptr()).threshold };
        local.drop();
    }
    let load_duration = start.elapsed();

    let start = Instant::now();
    for i in 0..STORES {
        let fresh = make_config(i as u64);
        cell.store(&fresh);
        fresh.drop();
    }
    let store_duration = start.elapsed();

    initial.drop();
    cell.store(&SharedRef::null());

    let load_ns = load_duration.as_nanos() as f64 / LOADS as f64;
    let store_ns = store_duration.as_nanos() as f64 / STORES as f64;
    println!("  Load+drop:  {:.2} ns/op ({} ops)", load_ns, LOADS);
    println!("  Store:      {:.2} ns/op ({} ops)", store_ns, STORES);
    println!(
        "  Load throughput: {:.2} M ops/sec",
        LOADS as f64 / load_duration.as_secs_f64() / 1_000_000.0
    );
}
