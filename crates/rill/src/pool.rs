//! thread pool
//!
//! A general-purpose work-stealing job executor, independent of
//! [`crate::Dispatch`]. Each worker owns a mutex-protected deque: a worker
//! pops its own back (LIFO, cache-friendly for the common case of a thread
//! re-queuing follow-up work) and, when empty, steals from a random peer's
//! front (FIFO, so a stolen job is the oldest one waiting).

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;
use tracing::debug;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct WorkerQueue {
    jobs: Mutex<VecDeque<Job>>,
}

struct Shared {
    queues: Vec<CachePadded<WorkerQueue>>,
    next_worker: AtomicUsize,
    unfinished: AtomicUsize,
    clear_count: AtomicUsize,
    shutting_down: AtomicBool,
}

/// A fixed-size pool of worker threads, each with its own job deque.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    /// `threads == 0` picks the host's available parallelism, falling back
    /// to a single worker if that can't be determined.
    pub fn new(threads: usize) -> Self {
        let threads = if threads == 0 {
            thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            threads
        };

        let shared = Arc::new(Shared {
            queues: (0..threads)
                .map(|_| {
                    CachePadded::new(WorkerQueue {
                        jobs: Mutex::new(VecDeque::new()),
                    })
                })
                .collect(),
            next_worker: AtomicUsize::new(0),
            unfinished: AtomicUsize::new(0),
            clear_count: AtomicUsize::new(0),
            shutting_down: AtomicBool::new(false),
        });

        let workers = (0..threads)
            .map(|id| {
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(id, shared))
            })
            .collect();

        Self { shared, workers }
    }

    /// Number of worker threads in the pool.
    pub fn threads(&self) -> usize {
        self.workers.len()
    }

    /// Queue `job` on the next worker in round-robin order. Dropped
    /// (without running) while a [`clear`](ThreadPool::clear) is in
    /// progress.
    pub fn insert(&self, job: impl FnOnce() + Send + 'static) {
        if self.shared.clear_count.load(Ordering::SeqCst) > 0 {
            return;
        }
        let n = self.shared.queues.len();
        let idx = self.shared.next_worker.fetch_add(1, Ordering::SeqCst) % n;
        self.shared.unfinished.fetch_add(1, Ordering::SeqCst);
        self.shared.queues[idx]
            .jobs
            .lock()
            .push_back(Box::new(job));
    }

    /// Drop every pending job and wait for whatever is already running to
    /// finish. Jobs submitted while a clear is in flight are ignored.
    pub fn clear(&self) {
        self.shared.clear_count.fetch_add(1, Ordering::SeqCst);
        let mut total_purged = 0;
        for queue in &self.shared.queues {
            let mut jobs = queue.jobs.lock();
            let purged = jobs.len();
            jobs.clear();
            if purged > 0 {
                total_purged += purged;
                self.shared.unfinished.fetch_sub(purged, Ordering::SeqCst);
            }
        }
        debug!(total_purged, "thread pool cleared, waiting for running jobs");
        self.wait();
        self.shared.clear_count.fetch_sub(1, Ordering::SeqCst);
    }

    /// Block until every job submitted since construction or the last
    /// `clear` has completed.
    pub fn wait(&self) {
        while self.shared.unfinished.load(Ordering::SeqCst) != 0 {
            thread::sleep(Duration::from_millis(1));
        }
    }

    pub fn wait_for(&self, t: Duration) -> bool {
        self.wait_until(Instant::now() + t)
    }

    pub fn wait_until(&self, deadline: Instant) -> bool {
        loop {
            if self.shared.unfinished.load(Ordering::SeqCst) == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    /// Non-blocking check: true iff there is no outstanding work.
    pub fn poll(&self) -> bool {
        self.shared.unfinished.load(Ordering::SeqCst) == 0
    }
}

impl Default for ThreadPool {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.clear();
        self.shared.shutting_down.store(true, Ordering::SeqCst);
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

fn worker_loop(id: usize, shared: Arc<Shared>) {
    let seed = &shared.queues[id] as *const CachePadded<WorkerQueue> as u64;
    let mut rng = SmallRng::seed_from_u64(seed);
    let peers = shared.queues.len();

    loop {
        if let Some(job) = shared.queues[id].jobs.lock().pop_back() {
            job();
            shared.unfinished.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        let stolen = if peers > 1 {
            let mut peer = rng.gen_range(0..peers);
            if peer == id {
                peer = (peer + 1) % peers;
            }
            shared.queues[peer].jobs.lock().pop_front()
        } else {
            None
        };

        if let Some(job) = stolen {
            job();
            shared.unfinished.fetch_sub(1, Ordering::SeqCst);
            continue;
        }

        if shared.shutting_down.load(Ordering::SeqCst) {
            break;
        }
        thread::sleep(Duration::from_millis(1));
    }
}
