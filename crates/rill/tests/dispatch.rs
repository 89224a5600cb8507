//! End-to-end Dispatch scenarios, driven only through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rill::channel::{BufferChannel, Channel, QueueChannel, StreamChannel, TimerChannel};
use rill::waiter::Waiter;
use rill::Dispatch;

/// Forces `Dispatch::run` to poll rather than spawn a worker thread, so
/// these tests don't depend on real-time thread scheduling.
struct SyncTimer(TimerChannel);

impl Waiter for SyncTimer {
    fn wait_for(&self, t: Duration) -> bool {
        self.0.wait_for(t)
    }
}

impl Channel for SyncTimer {
    fn close(&self) {
        self.0.close();
    }

    fn is_closed(&self) -> bool {
        self.0.is_closed()
    }

    fn is_synchronous(&self) -> bool {
        true
    }
}

#[test]
fn timer_cycles_one_hundred_times_then_closes() {
    let timer = Arc::new(SyncTimer(TimerChannel::new(Duration::from_millis(1))));
    let count = Arc::new(AtomicUsize::new(0));

    let dispatch = Dispatch::new();
    let handler_count = Arc::clone(&count);
    let handler_timer = Arc::clone(&timer);
    dispatch
        .add(Arc::clone(&timer), move || {
            if handler_count.fetch_add(1, Ordering::SeqCst) + 1 == 100 {
                handler_timer.close();
            }
            Ok(())
        })
        .unwrap();

    let result = dispatch.run();
    assert!(result.channel.is_some());
    assert!(result.error.is_none());
    assert_eq!(count.load(Ordering::SeqCst), 100);
}

#[test]
fn buffer_echo_stops_at_first_newline() {
    let buffer = Arc::new(BufferChannel::new());
    buffer.set_block_size(5);
    buffer.write(b"Hello world\n");

    let acc = Arc::new(Mutex::new(Vec::new()));
    let dispatch = Dispatch::new();
    let handler_acc = Arc::clone(&acc);
    let handler_buffer = Arc::clone(&buffer);
    dispatch
        .add(Arc::clone(&buffer), move || {
            let mut acc = handler_acc.lock().unwrap();
            handler_buffer.append(&mut acc);
            if acc.contains(&b'\n') {
                handler_buffer.close();
            }
            Ok(())
        })
        .unwrap();

    dispatch.run();
    assert_eq!(*acc.lock().unwrap(), b"Hello world\n");
}

#[test]
fn queue_drain_stops_after_the_fifth_item() {
    let queue: Arc<QueueChannel<i32>> = Arc::new(QueueChannel::new());
    for i in 1..=10 {
        queue.write(i);
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let dispatch = Dispatch::new();
    let handler_seen = Arc::clone(&seen);
    let handler_queue = Arc::clone(&queue);
    dispatch
        .add_message(Arc::clone(&queue), move |v| {
            handler_seen.lock().unwrap().push(v);
            if v == 5 {
                handler_queue.close();
            }
            Ok(())
        })
        .unwrap();

    dispatch.run();
    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn heterogeneous_dispatch_reports_the_synchronous_fault() {
    let a = Arc::new(SyncTimer(TimerChannel::new(Duration::from_millis(1))));
    let b = Arc::new(TimerChannel::new(Duration::from_millis(1)));

    let a_count = Arc::new(AtomicUsize::new(0));
    let b_count = Arc::new(AtomicUsize::new(0));

    let dispatch = Dispatch::new();

    let handler_a_count = Arc::clone(&a_count);
    dispatch
        .add(Arc::clone(&a), move || {
            if handler_a_count.fetch_add(1, Ordering::SeqCst) + 1 == 100 {
                return Err(Box::<dyn std::error::Error + Send + Sync>::from("fault on a"));
            }
            Ok(())
        })
        .unwrap();

    let handler_b_count = Arc::clone(&b_count);
    dispatch
        .add(Arc::clone(&b), move || {
            handler_b_count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

    let result = dispatch.run();
    assert!(result.error.is_some());
    assert!(a.is_closed());

    dispatch.stop();
    assert!(b.is_closed());
}
