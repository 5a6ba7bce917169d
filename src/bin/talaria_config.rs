//! Talaria Config - demo driver ArcCell
//!
//! Hot config reload tanpa lock: satu writer mem-publish revisi config
//! baru lewat atomic store, reader thread mengambil snapshot lewat atomic
//! load dan men-drop-nya setelah pakai. Reference yang dipegang reader
//! tetap valid walaupun writer sudah mengganti isi cell.
//!
//! Usage:
//!   cargo run --release --bin talaria_config [OPTIONS]
//!
//! Options:
//!   --revisions <N>  Jumlah revisi config yang dipublish (default: 1000)
//!   --readers <N>    Jumlah reader thread (default: 4)

use std::ffi::c_void;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use talaria::{ArcCell, ControlBlock, SharedRef};

/// Config snapshot yang dishare antar thread
struct RiskConfig {
    revision: u64,
    max_risk_score: u8,
    min_liquidity_usd: u64,
}

unsafe fn destroy_risk_config(
    context: *mut c_void,
    data: *mut c_void,
    control: *mut ControlBlock,
) {
    drop(Box::from_raw(data.cast::<RiskConfig>()));
    drop(Box::from_raw(control.cast::<MaybeUninit<ControlBlock>>()));
    (*context.cast::<AtomicU64>()).fetch_add(1, Ordering::Relaxed);
}

/// Alokasi di sisi caller: data + control block dari heap; destructor
/// membebaskan keduanya dan menghitung lewat context
fn make_config(revision: u64, destroyed: &Arc<AtomicU64>) -> SharedRef<RiskConfig> {
    let data = Box::into_raw(Box::new(RiskConfig {
        revision,
        max_risk_score: 60 + (revision % 40) as u8,
        min_liquidity_usd: 10_000 + revision * 100,
    }));
    let control =
        Box::into_raw(Box::new(MaybeUninit::<ControlBlock>::uninit())).cast::<ControlBlock>();

    unsafe {
        SharedRef::new(
            data,
            Arc::as_ptr(destroyed) as *mut c_void,
            destroy_risk_config,
            control,
        )
    }
}

struct DemoConfig {
    revisions: u64,
    readers: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            revisions: 1000,
            readers: 4,
        }
    }
}

fn parse_args() -> DemoConfig {
    let mut config = DemoConfig::default();
    let args: Vec<String> = std::env::args().collect();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--revisions" if i + 1 < args.len() => {
                i += 1;
                config.revisions = args[i].parse().unwrap_or(config.revisions);
            }
            "--readers" if i + 1 < args.len() => {
                i += 1;
                config.readers = args[i].parse().unwrap_or(config.readers);
            }
            other => eprintln!("Unknown option: {}", other),
        }
        i += 1;
    }

    config
}

fn main() {
    let config = parse_args();

    println!("Talaria Config Demo");
    println!("===================\n");
    println!(
        "Publishing {} revisions to {} readers...\n",
        config.revisions, config.readers
    );

    let destroyed = Arc::new(AtomicU64::new(0));
    let cell: Arc<ArcCell<RiskConfig>> = Arc::new(ArcCell::new());
    let stop = Arc::new(AtomicBool::new(false));
    let loads = Arc::new(AtomicU64::new(0));

    // Publish revisi 0 supaya reader tidak pernah melihat null
    let initial = make_config(0, &destroyed);
    cell.store(&initial);
    initial.drop();

    let start = Instant::now();

    let readers: Vec<_> = (0..config.readers)
        .map(|_| {
            let cell = Arc::clone(&cell);
            let stop = Arc::clone(&stop);
            let loads = Arc::clone(&loads);
            thread::spawn(move || {
                let mut last_revision = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let snapshot = cell.load();

                    // Snapshot tetap valid sampai kita drop, walau writer
                    // sudah mengganti isi cell
                    let (revision, score) = unsafe {
                        let config = &*snapshot.as_ptr();
                        (config.revision, config.max_risk_score)
                    };
                    assert!(score >= 60);
                    // Store di-serialize, jadi revisi per-reader monoton
                    assert!(revision >= last_revision);
                    last_revision = revision;

                    snapshot.drop();
                    loads.fetch_add(1, Ordering::Relaxed);
                }
                last_revision
            })
        })
        .collect();

    for revision in 1..=config.revisions {
        let fresh = make_config(revision, &destroyed);
        cell.store(&fresh);
        fresh.drop();
    }

    stop.store(true, Ordering::Relaxed);
    let mut max_seen = 0u64;
    for handle in readers {
        max_seen = max_seen.max(handle.join().unwrap());
    }

    // Kuras cell; revisi terakhir ikut hancur di sini
    cell.store(&SharedRef::null());
    let elapsed = start.elapsed();

    let created = config.revisions + 1;
    let destroyed_count = destroyed.load(Ordering::Relaxed);

    println!("Results");
    println!("-------");
    println!("  Revisions published: {}", config.revisions);
    println!("  Snapshot loads:      {}", loads.load(Ordering::Relaxed));
    println!("  Max revision seen:   {}", max_seen);
    println!(
        "  Destroyed:           {} / {} created",
        destroyed_count, created
    );
    println!("  Elapsed:             {:.2}s", elapsed.as_secs_f64());

    if destroyed_count == created {
        println!("\nAll revisions destroyed exactly once.");
    } else {
        eprintln!("\nLEAK: {} revisions unaccounted!", created - destroyed_count);
    }
}
