//! Unicast holder: assignment replaces contents, invoking an empty holder
//! returns the default (spec §4.2, §8 property 3).

use crate::delegate::Delegate;
use crate::lock::ReentrantMutex;

/// Single-owner unicast holder. Not safe to share across threads; use
/// [`UnicastSync`] for that.
#[derive(Default)]
pub struct Unicast<Args, Ret = ()> {
    slot: Option<Delegate<Args, Ret>>,
}

impl<Args, Ret> Unicast<Args, Ret> {
    pub fn new() -> Self {
        Unicast { slot: None }
    }

    /// Replace the held delegate. Passing [`Delegate::empty`] clears it.
    pub fn assign(&mut self, delegate: Delegate<Args, Ret>) {
        self.slot = if delegate.is_empty() { None } else { Some(delegate) };
    }

    pub fn clear(&mut self) {
        self.slot = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.is_none()
    }
}

impl<Args, Ret: Default> Unicast<Args, Ret> {
    pub fn invoke(&self, args: Args) -> Ret {
        match &self.slot {
            Some(d) => d.invoke(args),
            None => Ret::default(),
        }
    }
}

/// Thread-safe unicast holder. All mutation and invocation serialize under
/// a single lock (spec §4.2).
pub struct UnicastSync<Args, Ret = ()> {
    slot: ReentrantMutex<Option<Delegate<Args, Ret>>>,
}

impl<Args, Ret> Default for UnicastSync<Args, Ret> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args, Ret> UnicastSync<Args, Ret> {
    pub fn new() -> Self {
        UnicastSync { slot: ReentrantMutex::new(None) }
    }

    pub fn assign(&self, delegate: Delegate<Args, Ret>) {
        let mut guard = self.slot.lock();
        *guard = if delegate.is_empty() { None } else { Some(delegate) };
    }

    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

impl<Args, Ret: Default> UnicastSync<Args, Ret> {
    /// Resolves the documented open question in spec §9: return the
    /// target's result when occupied, the return type's default when
    /// empty — one explicit match, no implicit fallthrough.
    pub fn invoke(&self, args: Args) -> Ret {
        let guard = self.slot.lock();
        match &*guard {
            Some(d) => d.invoke(args),
            None => Ret::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double(x: i32) -> i32 {
        x * 2
    }

    #[test]
    fn unicast_assign_and_invoke_matches_delegate() {
        let d: Delegate<i32, i32> = Delegate::free(double);
        let mut u = Unicast::new();
        u.assign(d.clone());

        assert_eq!(u.invoke(5), d.invoke(5));
    }

    #[test]
    fn unicast_clear_makes_it_empty_and_noop() {
        let mut u = Unicast::new();
        u.assign(Delegate::free(double));
        u.clear();

        assert!(u.is_empty());
        assert_eq!(u.invoke(5), 0);
    }

    #[test]
    fn assigning_an_empty_delegate_clears_the_holder() {
        let mut u: Unicast<i32, i32> = Unicast::new();
        u.assign(Delegate::free(double));
        u.assign(Delegate::empty());

        assert!(u.is_empty());
    }

    #[test]
    fn sync_unicast_behaves_like_unicast() {
        let u = UnicastSync::new();
        u.assign(Delegate::free(double));
        assert_eq!(u.invoke(4), 8);

        u.clear();
        assert!(u.is_empty());
        assert_eq!(u.invoke(4), 0);
    }
}
