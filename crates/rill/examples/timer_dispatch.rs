//! Registers a 10ms timer with Dispatch and lets it tick 20 times before
//! closing itself.
//!
//! Run with: `cargo run --example timer_dispatch -p rill`

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rill::channel::{Channel, TimerChannel};
use rill::Dispatch;

fn main() {
    tracing_subscriber::fmt::init();

    let timer = Arc::new(TimerChannel::new(Duration::from_millis(10)));
    let ticks = Arc::new(AtomicUsize::new(0));

    let dispatch = Dispatch::new();
    let handler_ticks = Arc::clone(&ticks);
    let handler_timer = Arc::clone(&timer);
    dispatch
        .add(Arc::clone(&timer), move || {
            let n = handler_ticks.fetch_add(1, Ordering::SeqCst) + 1;
            println!("tick {n}");
            if n == 20 {
                handler_timer.close();
            }
            Ok(())
        })
        .expect("timer is not already registered");

    let result = dispatch.run();
    println!(
        "dispatch finished: channel={:?} error={:?}",
        result.channel, result.error
    );
}
