//! Basic walkthrough of the parklot API
//!
//! Parks a thread on a plain address, hands a token over, then uses the
//! word mutex and condition variable together.
//!
//! Set `PARKLOT_LOG=debug` to see the lot's own logging.

use parklot::{Mutex, WaitAddress, WordCondvar};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("PARKLOT_LOG"))
        .with_target(false)
        .init();
}

fn main() {
    init_logging();
    println!("=== parklot basic ===\n");
    tracing::info!(
        parker = parklot::platform_parker_name(),
        spin_limit = parklot::config::global().spin_limit,
        "starting walkthrough"
    );

    // 1. Raw parking with a token
    println!("Test 1: wait / wake_one_with");
    let flag = Arc::new(AtomicBool::new(false));
    let waiter = {
        let flag = Arc::clone(&flag);
        thread::spawn(move || {
            let address = WaitAddress::of(&*flag);
            let state = parklot::wait(address, || !flag.load(Ordering::Acquire), || {});
            println!("  waiter: {:?}", state);
        })
    };

    let address = WaitAddress::of(&*flag);
    while parklot::waiter_count(address) == 0 {
        thread::sleep(Duration::from_millis(1));
    }
    let woke = parklot::wake_one_with(address, |_| {
        flag.store(true, Ordering::Release);
        42
    });
    waiter.join().unwrap();
    println!("  waker:  {:?}\n", woke);

    // 2. Timeout
    println!("Test 2: wait_for timeout");
    let state = parklot::wait_for(address, || true, || {}, Duration::from_millis(50));
    println!("  timed out: {}\n", state.timed_out());

    // 3. Mutex + condvar
    println!("Test 3: Mutex + WordCondvar");
    let pair = Arc::new((Mutex::new(0u32), WordCondvar::new()));
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let pair = Arc::clone(&pair);
            thread::spawn(move || {
                let (lock, cvar) = &*pair;
                let mut count = lock.lock();
                *count += 1;
                println!("  worker {} checked in ({})", i, *count);
                cvar.notify_all();
            })
        })
        .collect();

    {
        let (lock, cvar) = &*pair;
        let mut count = lock.lock();
        cvar.wait_while(&mut count, |count| *count < 4);
        println!("  all {} workers checked in", *count);
    }
    for w in workers {
        w.join().unwrap();
    }

    println!("\nBuckets in table: {}", parklot::bucket_count());
    println!("=== done ===");
}
