//! `ThreadWorker`: the OS-thread-backed `WorkerContext` the core only
//! specifies as a contract (spec §4.3, §6). FIFO within a priority,
//! priorities served highest first, matching `relay_core::worker::Priority`'s
//! documented ordering.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use relay_core::worker::{Invoker, Priority, WorkerContext};

struct QueuedMessage {
    message: Box<dyn Invoker>,
    priority: Priority,
    /// Tiebreaker for FIFO-within-priority: earlier enqueues sort first.
    sequence: u64,
}

impl PartialEq for QueuedMessage {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}
impl Eq for QueuedMessage {}

impl Ord for QueuedMessage {
    fn cmp(&self, other: &Self) -> Ordering {
        // `BinaryHeap` is a max-heap: higher priority first, and within the
        // same priority, the *smaller* sequence (the older message) first —
        // so reverse the sequence comparison.
        self.priority.cmp(&other.priority).then_with(|| other.sequence.cmp(&self.sequence))
    }
}
impl PartialOrd for QueuedMessage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Shared {
    queue: Mutex<BinaryHeap<QueuedMessage>>,
    available: Condvar,
    shutdown: Mutex<bool>,
}

/// A worker context backed by a pool of OS threads sharing one
/// priority-ordered queue.
pub struct ThreadWorker {
    shared: Arc<Shared>,
    next_sequence: AtomicU64,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl ThreadWorker {
    pub fn spawn(thread_count: usize) -> Arc<Self> {
        let shared = Arc::new(Shared {
            queue: Mutex::new(BinaryHeap::new()),
            available: Condvar::new(),
            shutdown: Mutex::new(false),
        });

        let mut threads = Vec::with_capacity(thread_count);
        for id in 0..thread_count.max(1) {
            let shared = Arc::clone(&shared);
            threads.push(
                thread::Builder::new()
                    .name(format!("relay-worker-{}", id))
                    .spawn(move || worker_loop(shared))
                    .expect("failed to spawn worker thread"),
            );
        }

        Arc::new(ThreadWorker { shared, next_sequence: AtomicU64::new(0), threads: Mutex::new(threads) })
    }

    /// Signal every worker thread to exit once its queue is drained, and
    /// join them. Messages still queued when `shutdown` is called are
    /// dropped without being invoked.
    pub fn shutdown(&self) {
        *self.shared.shutdown.lock().unwrap() = true;
        self.shared.available.notify_all();
        let mut threads = self.threads.lock().unwrap();
        for handle in threads.drain(..) {
            let _ = handle.join();
        }
    }
}

fn worker_loop(shared: Arc<Shared>) {
    loop {
        let mut queue = shared.queue.lock().unwrap();
        loop {
            if let Some(mut queued) = queue.pop() {
                drop(queue);
                if !queued.message.invoke() {
                    log::warn!("worker dropped a message that failed to downcast/invoke");
                }
                break;
            }
            if *shared.shutdown.lock().unwrap() {
                return;
            }
            queue = shared.available.wait(queue).unwrap();
        }
    }
}

impl WorkerContext for ThreadWorker {
    fn dispatch(&self, message: Box<dyn Invoker>) {
        let priority = message.priority();
        let sequence = self.next_sequence.fetch_add(1, AtomicOrdering::Relaxed);
        self.shared.queue.lock().unwrap().push(QueuedMessage { message, priority, sequence });
        self.shared.available.notify_one();
    }
}
