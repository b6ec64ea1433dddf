//! Signal: a thread-safe multicast holder that can issue RAII subscription
//! handles (spec §3, §4.2, §4.9 "Signal subscription" state machine).
//!
//! The source this is modeled on requires the signal instance to be
//! reachable through `enable_shared_from_this` before `connect` is safe to
//! call, and fails at runtime with a precondition error otherwise. Here
//! that precondition is enforced at the type level instead (spec §9
//! "should be expressed as a construction precondition... stack-allocated
//! signals should either be rejected at the type level"): [`Signal::connect`]
//! only exists on `&Arc<Signal<_>>`, so a signal that was never placed
//! behind an `Arc` simply has no way to call it.

use std::sync::{Arc, Weak};

use crate::containers::multicast::MulticastSync;
use crate::delegate::Delegate;

pub struct Signal<Args, Ret = ()> {
    multicast: MulticastSync<Args, Ret>,
    self_ref: Weak<Signal<Args, Ret>>,
}

impl<Args, Ret> Signal<Args, Ret> {
    /// Construct a signal already wrapped in the shared-owning handle
    /// `connect` requires.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Signal {
            multicast: MulticastSync::new(),
            self_ref: weak.clone(),
        })
    }

    /// Subscribe `delegate`, returning a handle that disconnects it.
    pub fn connect(self: &Arc<Self>, delegate: Delegate<Args, Ret>) -> Subscription<Args, Ret>
    where
        Args: 'static,
        Ret: 'static,
    {
        self.multicast.push_back(delegate.clone());
        Subscription {
            signal: self.self_ref.clone(),
            target: delegate,
            disconnected: false,
        }
    }

    pub fn size(&self) -> usize {
        self.multicast.size()
    }

    pub fn clear(&self) {
        self.multicast.clear();
    }
}

impl<Args: Clone, Ret: Default> Signal<Args, Ret> {
    pub fn broadcast(&self, args: Args) {
        self.multicast.broadcast(args);
    }
}

/// A handle returned by [`Signal::connect`]. Disconnecting is idempotent
/// and is a no-op once the signal itself has been dropped.
pub struct Subscription<Args, Ret = ()> {
    signal: Weak<Signal<Args, Ret>>,
    target: Delegate<Args, Ret>,
    disconnected: bool,
}

impl<Args, Ret> Subscription<Args, Ret> {
    /// Remove, at most once, the delegate this handle was issued for. A
    /// no-op if already disconnected or if the signal no longer exists.
    pub fn disconnect(&mut self) {
        if self.disconnected {
            return;
        }
        self.disconnected = true;
        if let Some(signal) = self.signal.upgrade() {
            signal.multicast.remove(&self.target);
        }
    }

    pub fn is_connected(&self) -> bool {
        !self.disconnected
    }

    /// Wrap this handle so it disconnects on every exit path, including
    /// unwinding, instead of requiring an explicit call.
    pub fn into_scoped(self) -> ScopedSubscription<Args, Ret> {
        ScopedSubscription(self)
    }
}

/// RAII wrapper around [`Subscription`] that disconnects on drop.
pub struct ScopedSubscription<Args, Ret = ()>(Subscription<Args, Ret>);

impl<Args, Ret> Drop for ScopedSubscription<Args, Ret> {
    fn drop(&mut self) {
        self.0.disconnect();
    }
}
