//! dispatch
//!
//! Binds channels to handlers and runs them until the first fault. A
//! synchronous channel is polled from [`Dispatch::run`]'s own thread; an
//! asynchronous channel gets a dedicated worker thread blocked in
//! `Channel::wait`. Both paths report termination through one FIFO fault
//! queue.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::channel::{Channel, MessageChannel};
use crate::error::{BoxError, DuplicateRegistration};

/// Identifies a registered channel. Derived from the channel's `Arc` data
/// address, so it stays stable for the life of the registration without
/// requiring the channel to carry an id of its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(usize);

impl ChannelId {
    fn of(channel: &Arc<dyn Channel>) -> Self {
        Self(Arc::as_ptr(channel) as *const () as usize)
    }
}

/// Outcome of a [`Dispatch::run`] call.
///
/// Both fields absent means no registered channel produced a result (the
/// task set was empty). `channel` present with `error` absent means that
/// channel closed normally. Both present means its handler, or the wait
/// that fed it, reported a failure.
#[derive(Debug, Default)]
pub struct DispatchResult {
    pub channel: Option<ChannelId>,
    pub error: Option<BoxError>,
}

impl DispatchResult {
    fn empty() -> Self {
        Self::default()
    }
}

struct Fault {
    channel: ChannelId,
    error: Option<BoxError>,
}

type Invoke = Box<dyn FnMut() -> Result<(), BoxError> + Send>;

enum TaskKind {
    Sync(Arc<Mutex<Invoke>>),
    Async(JoinHandle<()>),
}

struct TaskEntry {
    channel: Arc<dyn Channel>,
    kind: TaskKind,
}

#[derive(Default)]
struct Inner {
    tasks: Mutex<HashMap<ChannelId, TaskEntry>>,
    sync_order: Mutex<Vec<ChannelId>>,
    faults: Mutex<VecDeque<Fault>>,
}

impl Inner {
    fn push_fault(&self, fault: Fault) {
        self.faults.lock().push_back(fault);
    }

    fn pop_fault(&self) -> Option<Fault> {
        self.faults.lock().pop_front()
    }
}

/// Coordinates channel readiness and handler invocation.
///
/// Construct empty, [`add`](Dispatch::add) or
/// [`add_message`](Dispatch::add_message) each channel, then call
/// [`run`](Dispatch::run) in a loop (it returns on the first fault).
/// Dropping a `Dispatch` calls [`stop`](Dispatch::stop) so every worker
/// thread it owns is joined before the struct goes away.
#[derive(Default)]
pub struct Dispatch {
    inner: Arc<Inner>,
}

impl Dispatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a readiness-only or stream channel. `handler` is invoked
    /// with no arguments on every ready event; a stream handler reads or
    /// appends from `channel` itself.
    pub fn add<C>(
        &self,
        channel: Arc<C>,
        handler: impl FnMut() -> Result<(), BoxError> + Send + 'static,
    ) -> Result<ChannelId, DuplicateRegistration>
    where
        C: Channel + 'static,
    {
        let channel: Arc<dyn Channel> = channel;
        self.register(channel, Box::new(handler))
    }

    /// Register a message channel. `handler` receives the value produced by
    /// each ready event; the read that extracts it from `channel` happens
    /// before the handler is invoked.
    pub fn add_message<C>(
        &self,
        channel: Arc<C>,
        mut handler: impl FnMut(C::Item) -> Result<(), BoxError> + Send + 'static,
    ) -> Result<ChannelId, DuplicateRegistration>
    where
        C: MessageChannel + 'static,
    {
        let reader = Arc::clone(&channel);
        let channel: Arc<dyn Channel> = channel;
        self.register(
            channel,
            Box::new(move || match reader.read() {
                Some(item) => handler(item),
                None => Ok(()),
            }),
        )
    }

    fn register(
        &self,
        channel: Arc<dyn Channel>,
        handler: Invoke,
    ) -> Result<ChannelId, DuplicateRegistration> {
        let id = ChannelId::of(&channel);
        if self.inner.tasks.lock().contains_key(&id) {
            warn!(?id, "channel already registered with this dispatcher");
            return Err(DuplicateRegistration);
        }
        debug!(?id, synchronous = channel.is_synchronous(), "registering channel");

        if channel.is_synchronous() {
            let invoke = Arc::new(Mutex::new(handler));
            self.inner.tasks.lock().insert(
                id,
                TaskEntry {
                    channel,
                    kind: TaskKind::Sync(invoke),
                },
            );
            self.inner.sync_order.lock().push(id);
        } else {
            let worker_channel = Arc::clone(&channel);
            let inner = Arc::clone(&self.inner);
            let mut handler = handler;
            let worker = thread::spawn(move || loop {
                worker_channel.wait();
                if worker_channel.is_closed() {
                    debug!(?id, "async channel closed, worker exiting");
                    inner.push_fault(Fault {
                        channel: id,
                        error: None,
                    });
                    break;
                }
                match handler() {
                    Ok(()) => {}
                    Err(err) => {
                        warn!(?id, error = %err, "async handler failed");
                        worker_channel.close();
                        inner.push_fault(Fault {
                            channel: id,
                            error: Some(err),
                        });
                        break;
                    }
                }
            });
            self.inner.tasks.lock().insert(
                id,
                TaskEntry {
                    channel,
                    kind: TaskKind::Async(worker),
                },
            );
        }
        Ok(id)
    }

    /// Poll synchronous channels and drain async worker faults until one
    /// terminates (closed or errored), or until there is nothing left to
    /// run. Call repeatedly to keep draining faults after each one.
    pub fn run(&self) -> DispatchResult {
        if self.inner.tasks.lock().is_empty() {
            return DispatchResult::empty();
        }

        let mut backoff = Duration::from_micros(1);
        loop {
            let mut fired = false;
            let order = self.inner.sync_order.lock().clone();
            for id in order {
                let handle = {
                    let tasks = self.inner.tasks.lock();
                    match tasks.get(&id).map(|entry| (&entry.channel, &entry.kind)) {
                        Some((channel, TaskKind::Sync(invoke))) => {
                            Some((Arc::clone(channel), Arc::clone(invoke)))
                        }
                        _ => None,
                    }
                };
                let Some((channel, invoke)) = handle else {
                    continue;
                };
                if !channel.poll() {
                    continue;
                }
                fired = true;
                if channel.is_closed() {
                    self.inner.push_fault(Fault {
                        channel: id,
                        error: None,
                    });
                    break;
                }
                if let Err(err) = (invoke.lock())() {
                    channel.close();
                    self.inner.push_fault(Fault {
                        channel: id,
                        error: Some(err),
                    });
                    break;
                }
            }

            if let Some(fault) = self.inner.pop_fault() {
                self.drop_channel(fault.channel);
                return DispatchResult {
                    channel: Some(fault.channel),
                    error: fault.error,
                };
            }

            if self.inner.tasks.lock().is_empty() {
                return DispatchResult::empty();
            }

            if fired {
                backoff = Duration::from_micros(1);
                thread::yield_now();
            } else {
                thread::sleep(backoff);
                backoff = (backoff * 2).min(Duration::from_millis(1));
            }
        }
    }

    /// Close every registered channel and drain `run` until nothing is left
    /// registered. Called automatically on drop.
    pub fn stop(&self) {
        for entry in self.inner.tasks.lock().values() {
            entry.channel.close();
        }
        while !self.inner.tasks.lock().is_empty() {
            self.run();
        }
    }

    fn drop_channel(&self, id: ChannelId) {
        self.inner.sync_order.lock().retain(|existing| *existing != id);
        if let Some(entry) = self.inner.tasks.lock().remove(&id) {
            if let TaskKind::Async(worker) = entry.kind {
                let _ = worker.join();
            }
        }
    }
}

impl Drop for Dispatch {
    fn drop(&mut self) {
        self.stop();
    }
}
