//! The polymorphic callable handle at the center of this crate.
//!
//! A [`Delegate`] is a tagged sum over the four bindable target shapes
//! (free function, raw-receiver method, shared-receiver method, opaque
//! closure) rather than a base-class-plus-downcast hierarchy: each arm
//! already carries everything `invoke` needs, so the sync call path never
//! has to guess what it is holding.

use std::sync::Arc;

/// Binds a receiver and a method selector and knows how to call them.
///
/// Implemented once for raw-pointer receivers and once for `Arc`-owned
/// receivers; both report an `identity()` pair so two delegates can compare
/// structurally without knowing which kind of receiver they hold.
trait MemberThunk<Args, Ret>: Send + Sync {
    fn call(&self, args: Args) -> Ret;
    /// `(receiver_address, method_address)` — the two fields member
    /// delegates compare for equality.
    fn identity(&self) -> (usize, usize);
}

struct RawMember<R, Args, Ret> {
    receiver: *mut R,
    method: fn(&R, Args) -> Ret,
}

// SAFETY: a raw-receiver delegate is only as `Send`/`Sync` as the caller's
// own promise that the receiver outlives every clone invoking it; the type
// itself adds no additional unsafety beyond holding the pointer.
unsafe impl<R, Args, Ret> Send for RawMember<R, Args, Ret> {}
unsafe impl<R, Args, Ret> Sync for RawMember<R, Args, Ret> {}

impl<R, Args, Ret> MemberThunk<Args, Ret> for RawMember<R, Args, Ret> {
    fn call(&self, args: Args) -> Ret {
        (self.method)(unsafe { &*self.receiver }, args)
    }

    fn identity(&self) -> (usize, usize) {
        (self.receiver as usize, self.method as usize)
    }
}

struct SharedMember<R, Args, Ret> {
    receiver: Arc<R>,
    method: fn(&R, Args) -> Ret,
}

impl<R: Send + Sync, Args, Ret> MemberThunk<Args, Ret> for SharedMember<R, Args, Ret> {
    fn call(&self, args: Args) -> Ret {
        (self.method)(&self.receiver, args)
    }

    fn identity(&self) -> (usize, usize) {
        (Arc::as_ptr(&self.receiver) as usize, self.method as usize)
    }
}

/// A bound, callable target: free function, method on a borrowed or
/// shared-owned receiver, or a type-erased closure.
pub enum Delegate<Args, Ret = ()> {
    /// Either never bound, or explicitly [`Delegate::clear`]ed.
    Empty,
    Free(fn(Args) -> Ret),
    MemberRaw(Arc<dyn MemberThunk<Args, Ret> + 'static>),
    MemberShared(Arc<dyn MemberThunk<Args, Ret> + 'static>),
    Opaque(Arc<dyn Fn(Args) -> Ret + Send + Sync>),
}

impl<Args, Ret> Delegate<Args, Ret> {
    pub fn empty() -> Self {
        Delegate::Empty
    }

    pub fn free(f: fn(Args) -> Ret) -> Self {
        Delegate::Free(f)
    }

    /// Bind a method on a receiver the caller promises outlives every
    /// clone of the returned delegate: a non-owning receiver pointer.
    ///
    /// # Safety
    /// `receiver` must remain valid for as long as any clone of this
    /// delegate may be invoked.
    pub unsafe fn member_raw<R>(receiver: &R, method: fn(&R, Args) -> Ret) -> Self
    where
        R: 'static,
        Args: 'static,
        Ret: 'static,
    {
        Delegate::MemberRaw(Arc::new(RawMember {
            receiver: receiver as *const R as *mut R,
            method,
        }))
    }

    /// Bind a method on a shared-owned receiver. The receiver is kept alive
    /// for as long as this delegate (or any of its clones) exists.
    pub fn member_shared<R>(receiver: Arc<R>, method: fn(&R, Args) -> Ret) -> Self
    where
        R: Send + Sync + 'static,
        Args: 'static,
        Ret: 'static,
    {
        Delegate::MemberShared(Arc::new(SharedMember { receiver, method }))
    }

    /// Bind a type-erased closure. Equality between two opaque delegates
    /// degrades to address identity of the stored closure.
    pub fn opaque<F>(f: F) -> Self
    where
        F: Fn(Args) -> Ret + Send + Sync + 'static,
    {
        Delegate::Opaque(Arc::new(f))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Delegate::Empty)
    }

    /// Clear the delegate back to [`Delegate::Empty`].
    pub fn clear(&mut self) {
        *self = Delegate::Empty;
    }

    /// Alias for [`Delegate::clear`]. A shared-receiver delegate whose
    /// receiver went away independently of other clones collapses onto the
    /// same "either empty or fully bound" invariant every other variant
    /// already holds, so `reset_to_null` and `clear` are the same operation.
    pub fn reset_to_null(&mut self) {
        self.clear();
    }
}

impl<Args, Ret: Default> Delegate<Args, Ret> {
    /// Invoke the bound target synchronously. An empty delegate returns the
    /// return type's default and performs no observable side effect.
    pub fn invoke(&self, args: Args) -> Ret {
        match self {
            Delegate::Empty => Ret::default(),
            Delegate::Free(f) => f(args),
            Delegate::MemberRaw(thunk) => thunk.call(args),
            Delegate::MemberShared(thunk) => thunk.call(args),
            Delegate::Opaque(f) => f(args),
        }
    }
}

impl<Args, Ret> Clone for Delegate<Args, Ret> {
    fn clone(&self) -> Self {
        match self {
            Delegate::Empty => Delegate::Empty,
            Delegate::Free(f) => Delegate::Free(*f),
            Delegate::MemberRaw(t) => Delegate::MemberRaw(Arc::clone(t)),
            Delegate::MemberShared(t) => Delegate::MemberShared(Arc::clone(t)),
            Delegate::Opaque(f) => Delegate::Opaque(Arc::clone(f)),
        }
    }
}

impl<Args, Ret> PartialEq for Delegate<Args, Ret> {
    /// Structural equality: same variant and same identifying fields.
    /// Opaque delegates compare by stored-object address only.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Delegate::Empty, Delegate::Empty) => true,
            (Delegate::Free(a), Delegate::Free(b)) => a == b,
            (Delegate::MemberRaw(a), Delegate::MemberRaw(b)) => a.identity() == b.identity(),
            (Delegate::MemberShared(a), Delegate::MemberShared(b)) => a.identity() == b.identity(),
            (Delegate::Opaque(a), Delegate::Opaque(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<Args, Ret> Eq for Delegate<Args, Ret> {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};

    fn square(x: i32) -> i32 {
        x * x
    }

    fn cube(x: i32) -> i32 {
        x * x * x
    }

    #[test]
    fn sync_free_invoke_and_clone_equal() {
        let d: Delegate<i32, i32> = Delegate::free(square);
        assert_eq!(d.invoke(3), 9);
        assert_eq!(d, d.clone());
    }

    #[test]
    fn free_delegates_with_different_targets_are_unequal() {
        let a: Delegate<i32, i32> = Delegate::free(square);
        let b: Delegate<i32, i32> = Delegate::free(cube);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_delegate_returns_default_with_no_side_effect() {
        let touched = AtomicI32::new(0);
        let d: Delegate<i32, i32> = Delegate::empty();
        assert_eq!(d.invoke(5), 0);
        assert_eq!(touched.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn member_shared_keeps_receiver_alive_across_clones() {
        struct Counter {
            value: AtomicI32,
        }
        fn bump(c: &Counter, by: i32) -> i32 {
            c.value.fetch_add(by, Ordering::SeqCst) + by
        }

        let receiver = Arc::new(Counter { value: AtomicI32::new(0) });
        let d: Delegate<i32, i32> = Delegate::member_shared(Arc::clone(&receiver), bump);
        let clone = d.clone();
        drop(d);

        assert_eq!(clone.invoke(4), 4);
        assert_eq!(receiver.value.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn member_shared_equality_is_by_receiver_and_method() {
        struct R;
        fn m(_: &R, _: ()) {}

        let r1 = Arc::new(R);
        let r2 = Arc::new(R);
        let a: Delegate<(), ()> = Delegate::member_shared(Arc::clone(&r1), m);
        let b: Delegate<(), ()> = Delegate::member_shared(Arc::clone(&r1), m);
        let c: Delegate<(), ()> = Delegate::member_shared(r2, m);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn member_raw_equality_is_by_receiver_address_and_selector() {
        struct R(i32);
        fn get(r: &R, _: ()) -> i32 {
            r.0
        }
        fn other(r: &R, _: ()) -> i32 {
            r.0 + 1
        }

        let receiver = R(7);
        let a: Delegate<(), i32> = unsafe { Delegate::member_raw(&receiver, get) };
        let b: Delegate<(), i32> = unsafe { Delegate::member_raw(&receiver, get) };
        let c: Delegate<(), i32> = unsafe { Delegate::member_raw(&receiver, other) };

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.invoke(()), 7);
    }

    #[test]
    fn opaque_equality_is_address_identity_only() {
        let shared: Delegate<i32, i32> = Delegate::opaque(|x| x + 1);
        let same = shared.clone();
        let different: Delegate<i32, i32> = Delegate::opaque(|x| x + 1);

        assert_eq!(shared, same);
        assert_ne!(shared, different);
        assert_eq!(shared.invoke(1), 2);
    }

    #[test]
    fn clear_transitions_to_empty_and_invoke_is_noop() {
        let mut d: Delegate<i32, i32> = Delegate::free(square);
        d.clear();
        assert!(d.is_empty());
        assert_eq!(d.invoke(9), 0);
    }

    #[test]
    fn reset_to_null_is_an_alias_for_clear() {
        struct R;
        fn m(_: &R, _: ()) {}
        let mut d: Delegate<(), ()> = Delegate::member_shared(Arc::new(R), m);
        d.reset_to_null();
        assert!(d.is_empty());
    }
}
