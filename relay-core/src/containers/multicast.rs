//! Multicast holder: ordered fan-out with insertion-order dispatch (spec
//! §3, §4.2, §8 property 4, scenario S2).

use crate::delegate::Delegate;
use crate::lock::ReentrantMutex;

/// Single-owner multicast holder. Duplicates are allowed; insertion order
/// is the dispatch order.
pub struct Multicast<Args, Ret = ()> {
    delegates: Vec<Delegate<Args, Ret>>,
}

impl<Args, Ret> Default for Multicast<Args, Ret> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, Ret> Multicast<Args, Ret> {
    pub fn new() -> Self {
        Multicast { delegates: Vec::new() }
    }

    pub fn push_back(&mut self, delegate: Delegate<Args, Ret>) {
        self.delegates.push(delegate);
    }

    /// Remove the first element equal to `delegate`. No-op if absent.
    pub fn remove(&mut self, delegate: &Delegate<Args, Ret>) {
        if let Some(pos) = self.delegates.iter().position(|d| d == delegate) {
            self.delegates.remove(pos);
        }
    }

    pub fn clear(&mut self) {
        self.delegates.clear();
    }

    pub fn size(&self) -> usize {
        self.delegates.len()
    }
}

impl<Args: Clone, Ret: Default> Multicast<Args, Ret> {
    /// Invoke every stored delegate in insertion order. Return values are
    /// discarded.
    pub fn broadcast(&self, args: Args) {
        for d in &self.delegates {
            d.invoke(args.clone());
        }
    }
}

/// Thread-safe multicast holder. A recursive lock guards every operation so
/// a target may re-enter the holder (e.g. to subscribe/unsubscribe) without
/// deadlocking; `broadcast` snapshots the dispatch list so a concurrent
/// `remove` cannot invalidate an in-flight iteration (spec §4.2).
pub struct MulticastSync<Args, Ret = ()> {
    delegates: ReentrantMutex<Vec<Delegate<Args, Ret>>>,
}

impl<Args, Ret> Default for MulticastSync<Args, Ret> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, Ret> MulticastSync<Args, Ret> {
    pub fn new() -> Self {
        MulticastSync { delegates: ReentrantMutex::new(Vec::new()) }
    }

    pub fn push_back(&self, delegate: Delegate<Args, Ret>) {
        self.delegates.lock().push(delegate);
    }

    pub fn remove(&self, delegate: &Delegate<Args, Ret>) {
        let mut guard = self.delegates.lock();
        if let Some(pos) = guard.iter().position(|d| d == delegate) {
            guard.remove(pos);
        }
    }

    pub fn clear(&self) {
        self.delegates.lock().clear();
    }

    pub fn size(&self) -> usize {
        self.delegates.lock().len()
    }
}

impl<Args: Clone, Ret: Default> MulticastSync<Args, Ret> {
    pub fn broadcast(&self, args: Args) {
        // Hold the lock for the whole broadcast: same-thread reentry (a
        // subscriber adding/removing during its own invocation) still
        // succeeds against `delegates` via the recursive lock, while a
        // concurrent `remove` on another thread blocks until this broadcast
        // returns — a removed delegate must never be invoked after its
        // `remove()` call already returned (spec §4.2, §5).
        let guard = self.delegates.lock();
        let snapshot: Vec<Delegate<Args, Ret>> = guard.clone();
        for d in &snapshot {
            d.invoke(args.clone());
        }
    }
}

impl<Args, Ret> Clone for MulticastSync<Args, Ret> {
    fn clone(&self) -> Self {
        MulticastSync { delegates: ReentrantMutex::new(self.delegates.lock().clone()) }
    }
}
