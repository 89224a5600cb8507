//! Fans 26 jobs of random duration out across a 4-worker pool and prints
//! the order they actually finished in, to show the scheduling isn't FIFO.
//!
//! Run with: `cargo run --example thread_pool_fanout -p rill`

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use rill::ThreadPool;

fn main() {
    tracing_subscriber::fmt::init();

    let pool = ThreadPool::new(4);
    let order = Arc::new(Mutex::new(Vec::new()));

    for c in b'a'..=b'z' {
        let order = Arc::clone(&order);
        pool.insert(move || {
            let sleep_ms = 1 + (u64::from(c) * 13) % 90;
            thread::sleep(Duration::from_millis(sleep_ms));
            order.lock().unwrap().push(c as char);
        });
    }

    pool.wait();
    println!("completion order: {:?}", order.lock().unwrap());
}
