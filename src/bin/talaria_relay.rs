//! Talaria Relay - demo driver ring coordinator
//!
//! Menjalankan pipeline producer -> ring -> consumer dua cara:
//! 1. Single-threaded: tulis satu batch penuh, lalu baca semuanya
//! 2. Multi-threaded: producer mengirim dalam burst dengan jeda menurun
//!    untuk memvariasikan tekanan race, consumer memvalidasi urutan
//!
//! Usage:
//!   cargo run --release --bin talaria_relay [OPTIONS]
//!
//! Options:
//!   --bursts <N>     Jumlah burst per run multi-threaded (default: 4)
//!   --burst-size <N> Item per burst (default: 3)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use talaria::{slot_array, RingState, Slot, StreamCursor};

const RING_CAPACITY: usize = 8;

/// Elemen demo: pasangan berurutan (x, x + 1) seperti stream harga bid/ask
#[derive(Clone, Copy)]
struct Quote {
    bid: u64,
    ask: u64,
}

struct RelayConfig {
    bursts: u64,
    burst_size: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bursts: 4,
            burst_size: 3,
        }
    }
}

fn parse_args() -> RelayConfig {
    let mut config = RelayConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bursts" if i + 1 < args.len() => {
                i += 1;
                config.bursts = args[i].parse().unwrap_or(config.bursts);
            }
            "--burst-size" if i + 1 < args.len() => {
                i += 1;
                config.burst_size = args[i].parse().unwrap_or(config.burst_size);
            }
            other => eprintln!("Unknown option: {}", other),
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();

    println!("Talaria Relay Demo");
    println!("==================\n");

    run_single_threaded();

    // Jeda besar = producer dan consumer bergantian; jeda kecil = keduanya
    // berebut slot secara riil
    for sleep_ms in [1000, 100, 10, 1] {
        run_multi_threaded(&config, sleep_ms);
    }

    println!("\nDone.");
}

fn run_single_threaded() {
    println!("Single-threaded pass (capacity {})", RING_CAPACITY);

    let ring = RingState::new(RING_CAPACITY);
    let slots: Box<[Slot<Quote>]> = slot_array(ring.capacity());
    let mut writer = StreamCursor::new(&ring);
    let mut reader = StreamCursor::new(&ring);

    // Satu batch penuh muat persis dalam ring
    let mut price = 1u64;
    for _ in 0..RING_CAPACITY {
        let idx = writer.begin_write();
        unsafe {
            slots[idx].write(Quote {
                bid: price,
                ask: price + 1,
            })
        };
        writer.commit_write();
        price += 1;
    }

    for _ in 0..RING_CAPACITY {
        let idx = reader.begin_read();
        let quote = unsafe { slots[idx].read() };
        reader.commit_read();
        println!("  received: bid = {}, ask = {}", quote.bid, quote.ask);
        assert_eq!(quote.ask, quote.bid + 1);
    }

    println!();
}

fn run_multi_threaded(config: &RelayConfig, sleep_ms: u64) {
    let total = config.bursts * config.burst_size;
    println!(
        "Multi-threaded run: {} bursts x {} items, sleep {} ms",
        config.bursts, config.burst_size, sleep_ms
    );

    let ring = Arc::new(RingState::new(RING_CAPACITY));
    let slots: Arc<Box<[Slot<Quote>]>> = Arc::new(slot_array(ring.capacity()));
    let produced = Arc::new(AtomicU64::new(0));

    let start = Instant::now();

    let producer = {
        let ring = Arc::clone(&ring);
        let slots = Arc::clone(&slots);
        let produced = Arc::clone(&produced);
        let bursts = config.bursts;
        let burst_size = config.burst_size;
        thread::spawn(move || {
            let mut cursor = StreamCursor::new(&ring);
            let mut price = 1u64;
            for _ in 0..bursts {
                for _ in 0..burst_size {
                    let idx = cursor.begin_write();
                    unsafe {
                        slots[idx].write(Quote {
                            bid: price,
                            ask: price + 1,
                        })
                    };
                    cursor.commit_write();
                    produced.fetch_add(1, Ordering::Relaxed);
                    price += 1;
                }
                thread::sleep(Duration::from_millis(sleep_ms));
            }
        })
    };

    let consumer = {
        let ring = Arc::clone(&ring);
        let slots = Arc::clone(&slots);
        thread::spawn(move || {
            let mut cursor = StreamCursor::new(&ring);
            let mut expect_bid = 1u64;
            for _ in 0..total {
                let idx = cursor.begin_read();
                let quote = unsafe { slots[idx].read() };
                cursor.commit_read();

                // SPSC: urutan dan kontiguitas harus utuh
                assert_eq!(quote.bid, expect_bid);
                assert_eq!(quote.ask, quote.bid + 1);
                expect_bid += 1;
            }
            expect_bid - 1
        })
    };

    producer.join().unwrap();
    let consumed = consumer.join().unwrap();
    let elapsed = start.elapsed();

    println!(
        "  produced {}, consumed through bid {}, elapsed {:.2}s - order intact",
        produced.load(Ordering::Relaxed),
        consumed,
        elapsed.as_secs_f64()
    );
}
