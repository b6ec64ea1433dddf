//! A recursive mutex: a small hand-rolled primitive rather than a crate
//! dependency, because the thread-safe containers and the transport
//! monitor/retry decorator need a lock a subscriber callback can safely
//! re-acquire from within its own critical section (spec §4.2, §4.6, §4.7).
//!
//! Unlike a fail-fast cell, this lock blocks: the multicast broadcast path
//! and the monitor's `process()` sweep are expected to be held briefly and
//! are allowed to contend across threads.

use std::cell::UnsafeCell;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex};
use std::thread::{self, ThreadId};

struct Owner {
    thread: Option<ThreadId>,
    depth: usize,
}

/// A mutex that the thread currently holding it may re-lock without
/// deadlocking.
pub struct ReentrantMutex<T> {
    owner: Mutex<Owner>,
    available: Condvar,
    waiters: AtomicUsize,
    item: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for ReentrantMutex<T> {}
unsafe impl<T: Send> Sync for ReentrantMutex<T> {}

impl<T> ReentrantMutex<T> {
    pub fn new(item: T) -> Self {
        ReentrantMutex {
            owner: Mutex::new(Owner { thread: None, depth: 0 }),
            available: Condvar::new(),
            waiters: AtomicUsize::new(0),
            item: UnsafeCell::new(item),
        }
    }

    /// Acquire the lock, blocking until available. Re-entrant on the
    /// holding thread: a nested `lock()` call from inside a callback that is
    /// itself running under the lock succeeds immediately.
    pub fn lock(&self) -> ReentrantGuard<'_, T> {
        let this_thread = thread::current().id();
        let mut owner = self.owner.lock().unwrap();

        loop {
            match owner.thread {
                Some(holder) if holder == this_thread => {
                    owner.depth += 1;
                    break;
                }
                None => {
                    owner.thread = Some(this_thread);
                    owner.depth = 1;
                    break;
                }
                Some(_) => {
                    self.waiters.fetch_add(1, Ordering::SeqCst);
                    owner = self.available.wait(owner).unwrap();
                    self.waiters.fetch_sub(1, Ordering::SeqCst);
                }
            }
        }

        drop(owner);
        ReentrantGuard { lock: self }
    }

    fn unlock(&self) {
        let mut owner = self.owner.lock().unwrap();
        owner.depth -= 1;
        if owner.depth == 0 {
            owner.thread = None;
            if self.waiters.load(Ordering::SeqCst) > 0 {
                self.available.notify_one();
            }
        }
    }
}

pub struct ReentrantGuard<'a, T> {
    lock: &'a ReentrantMutex<T>,
}

impl<T> Deref for ReentrantGuard<'_, T> {
    type Target = T;

    #[inline]
    fn deref(&self) -> &T {
        unsafe { &*self.lock.item.get() }
    }
}

impl<T> DerefMut for ReentrantGuard<'_, T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut T {
        unsafe { &mut *self.lock.item.get() }
    }
}

impl<T> Drop for ReentrantGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn basic_mutation() {
        let lock = ReentrantMutex::new(5);
        {
            let mut guard = lock.lock();
            *guard += 1;
        }
        assert_eq!(*lock.lock(), 6);
    }

    #[test]
    fn reentrant_from_same_thread() {
        let lock = ReentrantMutex::new(Vec::<i32>::new());
        let outer = lock.lock();
        {
            // A nested lock on the same thread must not deadlock.
            let mut inner = lock.lock();
            inner.push(1);
        }
        drop(outer);
        assert_eq!(*lock.lock(), vec![1]);
    }

    #[test]
    fn contended_across_threads() {
        let lock = Arc::new(ReentrantMutex::new(0usize));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let lock = Arc::clone(&lock);
            handles.push(thread::spawn(move || {
                for _ in 0..1000 {
                    *lock.lock() += 1;
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*lock.lock(), 8000);
    }
}
