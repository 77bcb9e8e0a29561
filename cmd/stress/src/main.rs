//! Stress test - mutual exclusion and wake accounting
//!
//! Usage: stress [THREADS] [ITERATIONS]
//!
//! Phase 1 hammers one `Mutex<u64>` from many OS threads and checks the
//! final count. Phase 2 parks batches of threads on a shared address and
//! checks that every wake is accounted for exactly once.

use parklot::{Mutex, WaitAddress};
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

const WAKE_ROUNDS: usize = 50;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("PARKLOT_LOG"))
        .with_target(false)
        .init();

    println!("=== parklot Stress Test ===\n");

    let mut args = std::env::args().skip(1);
    let threads: usize = args.next().and_then(|s| s.parse().ok()).unwrap_or(8);
    let iterations: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(100_000);

    tracing::info!(
        threads,
        iterations,
        parker = parklot::platform_parker_name(),
        "stress run starting"
    );

    let mutex_ok = stress_mutex(threads, iterations);
    let wake_ok = stress_wake_accounting(threads);

    println!("\n=== Results ===");
    println!("Mutual exclusion: {}", if mutex_ok { "PASS" } else { "FAIL" });
    println!("Wake accounting:  {}", if wake_ok { "PASS" } else { "FAIL" });
    println!("Table buckets:    {}", parklot::bucket_count());

    if mutex_ok && wake_ok {
        ExitCode::SUCCESS
    } else {
        tracing::error!(mutex_ok, wake_ok, "stress run failed");
        ExitCode::FAILURE
    }
}

fn stress_mutex(threads: usize, iterations: u64) -> bool {
    println!("Phase 1: {} threads x {} lock/unlock", threads, iterations);

    let counter = Arc::new(Mutex::new(0u64));
    let start = Instant::now();

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..iterations {
                    *counter.lock() += 1;
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    let elapsed = start.elapsed();
    let expected = threads as u64 * iterations;
    let actual = *counter.lock();

    println!("  counter:  {} (expected {})", actual, expected);
    println!("  elapsed:  {:?}", elapsed);
    println!(
        "  rate:     {:.0} locks/sec",
        expected as f64 / elapsed.as_secs_f64()
    );
    actual == expected
}

fn stress_wake_accounting(threads: usize) -> bool {
    println!("\nPhase 2: {} rounds of {} parked threads", WAKE_ROUNDS, threads);

    let slot = Box::new(0u64);
    let address = WaitAddress::of(&*slot);
    let returned_woken = Arc::new(AtomicUsize::new(0));
    let mut reported_woken = 0;
    let start = Instant::now();

    for _ in 0..WAKE_ROUNDS {
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let returned_woken = Arc::clone(&returned_woken);
                thread::spawn(move || {
                    if parklot::wait(address, || true, || {}).did_wake {
                        returned_woken.fetch_add(1, Ordering::Relaxed);
                    }
                })
            })
            .collect();

        let deadline = Instant::now() + Duration::from_secs(10);
        while parklot::waiter_count(address) < threads {
            if Instant::now() > deadline {
                println!("  Timeout! threads never parked");
                return false;
            }
            thread::yield_now();
        }

        // One at a time first, then everyone left.
        if parklot::wake_one(address).did_wake {
            reported_woken += 1;
        }
        reported_woken += parklot::wake_all(address);

        for h in handles {
            h.join().unwrap();
        }
    }

    let expected = WAKE_ROUNDS * threads;
    let returned = returned_woken.load(Ordering::Relaxed);
    println!("  wakers reported: {}", reported_woken);
    println!("  waiters woken:   {}", returned);
    println!("  expected:        {}", expected);
    println!("  elapsed:         {:?}", start.elapsed());

    reported_woken == expected && returned == expected && parklot::waiter_count(address) == 0
}
