//! Asynchronous invocation (spec §4.3) and its blocking-with-deadline
//! variant (spec §4.4).
//!
//! A note on argument ownership: the original source this is modeled on
//! must explicitly deep-copy every argument into message-owned storage,
//! because C++ references/pointers do not survive a handoff to another
//! thread. In Rust, passing `Args` by value into `invoke` already moves
//! ownership into the call; wrapping that moved value in the async message
//! *is* the deep copy spec §4.3 asks for, with no extra marshalling step.
//! The "forbidden argument shapes" spec §4.3 calls out (raw untyped
//! pointers, rvalue references, a shared-owning pointer passed by
//! reference) are rejected by construction rather than at a runtime bind
//! check: `Args: Send + 'static` already excludes raw pointers (`!Send`)
//! and borrowed data that does not outlive the hop to the worker thread,
//! and Rust has no reference-to-reference argument convention to forbid in
//! the first place — see DESIGN.md.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::config::AsyncDelegateConfig;
use crate::delegate::Delegate;
use crate::error::DelegateError;
use crate::worker::{Invoker, Priority, WorkerContext};

/// How long a blocking async call is willing to wait (spec §3
/// "Blocking-async delegate").
#[derive(Debug, Clone, Copy)]
pub enum Deadline {
    Forever,
    After(Duration),
}

impl Deadline {
    fn instant(self) -> Option<Instant> {
        match self {
            Deadline::Forever => None,
            Deadline::After(d) => Some(Instant::now() + d),
        }
    }
}

/// An async delegate bound to a worker context and a dispatch priority.
/// Invoking it never blocks the caller and always returns the default of
/// `Ret`; see [`BlockingAsyncDelegate`] for a variant that returns the real
/// result.
pub struct AsyncDelegate<Args, Ret = ()> {
    target: Delegate<Args, Ret>,
    worker: Option<Arc<dyn WorkerContext>>,
    priority: Priority,
}

impl<Args, Ret> AsyncDelegate<Args, Ret> {
    pub fn new(target: Delegate<Args, Ret>, worker: Arc<dyn WorkerContext>) -> Self {
        AsyncDelegate { target, worker: Some(worker), priority: Priority::default() }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.target.is_empty()
    }
}

impl<Args, Ret> AsyncDelegate<Args, Ret>
where
    Args: Send + 'static,
    Ret: Default + Send + 'static,
{
    /// Clone the delegate, construct an async-message owning the clone and
    /// the argument, and hand it to the worker. Fire-and-forget: the
    /// source never blocks beyond the handoff and always gets back the
    /// default of `Ret` (spec §4.3, §5).
    pub fn invoke(&self, args: Args) -> Ret {
        if self.target.is_empty() {
            return Ret::default();
        }
        match &self.worker {
            Some(worker) => {
                let message = Box::new(FireAndForgetMessage {
                    target: self.target.clone(),
                    args: Some(args),
                    priority: self.priority,
                });
                log::trace!("dispatching fire-and-forget message at priority {:?}", self.priority);
                worker.dispatch(message);
            }
            None => {
                // Worker unavailability is a silent drop for fire-and-forget
                // async dispatch (spec §4.10): `DelegateError::NoWorker`
                // is never raised to a caller here, only logged.
                log::warn!("dropping async invoke: {}", DelegateError::NoWorker);
            }
        }
        Ret::default()
    }
}

struct FireAndForgetMessage<Args, Ret> {
    target: Delegate<Args, Ret>,
    args: Option<Args>,
    priority: Priority,
}

impl<Args, Ret> Invoker for FireAndForgetMessage<Args, Ret>
where
    Args: Send,
    Ret: Default + Send,
{
    fn invoke(&mut self) -> bool {
        match self.args.take() {
            Some(args) => {
                self.target.invoke(args);
                true
            }
            None => false,
        }
    }

    fn priority(&self) -> Priority {
        self.priority
    }
}

/// Outcome of a [`BlockingAsyncDelegate`] call. On timeout the source must
/// not read the (possibly target-mutated) arguments back — enforced here
/// by simply not handing them back in that variant (spec §4.4, §5).
pub enum BlockingOutcome<Args, Ret> {
    Completed { result: Ret, args: Args },
    TimedOut,
}

impl<Args, Ret> BlockingOutcome<Args, Ret> {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, BlockingOutcome::TimedOut)
    }

    pub fn result(self) -> Option<Ret> {
        match self {
            BlockingOutcome::Completed { result, .. } => Some(result),
            BlockingOutcome::TimedOut => None,
        }
    }
}

enum SlotState<Args, Ret> {
    Pending,
    Completed(Ret, Args),
    Abandoned,
}

/// The per-call completion signal carried by a blocking async message.
/// Completion may be raised at most once: whichever of "source gives up at
/// the deadline" or "worker finishes the call" gets there first wins, and
/// the other side's action becomes a no-op (spec §4.4 "Exactly-one
/// completion semantics").
struct CompletionSlot<Args, Ret> {
    state: Mutex<SlotState<Args, Ret>>,
    condvar: Condvar,
}

impl<Args, Ret> CompletionSlot<Args, Ret> {
    fn new() -> Self {
        CompletionSlot { state: Mutex::new(SlotState::Pending), condvar: Condvar::new() }
    }

    /// Called by the worker after invoking the target. A no-op if the
    /// source already abandoned the call.
    fn complete(&self, result: Ret, args: Args) {
        let mut guard = self.state.lock().unwrap();
        if matches!(*guard, SlotState::Pending) {
            *guard = SlotState::Completed(result, args);
            self.condvar.notify_all();
        }
    }

    /// Called by the source. Waits up to `deadline`; if it elapses first,
    /// marks the slot abandoned so a late `complete()` is discarded.
    fn wait(&self, deadline: Deadline) -> BlockingOutcome<Args, Ret> {
        let mut guard = self.state.lock().unwrap();
        loop {
            match &*guard {
                SlotState::Completed(..) => {
                    let SlotState::Completed(result, args) =
                        std::mem::replace(&mut *guard, SlotState::Abandoned)
                    else {
                        unreachable!()
                    };
                    return BlockingOutcome::Completed { result, args };
                }
                SlotState::Abandoned => return BlockingOutcome::TimedOut,
                SlotState::Pending => match deadline.instant() {
                    None => {
                        guard = self.condvar.wait(guard).unwrap();
                    }
                    Some(until) => {
                        let now = Instant::now();
                        if now >= until {
                            *guard = SlotState::Abandoned;
                            return BlockingOutcome::TimedOut;
                        }
                        let (next, timed_out) =
                            self.condvar.wait_timeout(guard, until - now).unwrap();
                        guard = next;
                        if timed_out.timed_out() && matches!(*guard, SlotState::Pending) {
                            *guard = SlotState::Abandoned;
                            return BlockingOutcome::TimedOut;
                        }
                    }
                },
            }
        }
    }
}

/// A blocking-async delegate: dispatches like [`AsyncDelegate`] but the
/// source waits (up to a deadline) on a completion signal carried by the
/// message, and reads back the true result (spec §3, §4.4).
pub struct BlockingAsyncDelegate<Args, Ret = ()> {
    inner: AsyncDelegate<Args, Ret>,
    deadline: Deadline,
}

impl<Args, Ret> BlockingAsyncDelegate<Args, Ret> {
    pub fn new(target: Delegate<Args, Ret>, worker: Arc<dyn WorkerContext>, deadline: Deadline) -> Self {
        BlockingAsyncDelegate { inner: AsyncDelegate::new(target, worker), deadline }
    }

    /// Construct with the deadline taken from a [`crate::config::AsyncDelegateConfig`]
    /// instead of a caller-supplied [`Deadline`] directly.
    pub fn from_config(
        target: Delegate<Args, Ret>,
        worker: Arc<dyn WorkerContext>,
        config: &AsyncDelegateConfig,
    ) -> Self {
        BlockingAsyncDelegate::new(target, worker, Deadline::After(config.default_deadline))
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.inner = self.inner.with_priority(priority);
        self
    }
}

impl<Args, Ret> BlockingAsyncDelegate<Args, Ret>
where
    Args: Clone + Send + 'static,
    Ret: Default + Send + 'static,
{
    pub fn invoke(&self, args: Args) -> BlockingOutcome<Args, Ret> {
        if self.inner.target.is_empty() {
            return BlockingOutcome::Completed { result: Ret::default(), args };
        }
        let worker = match &self.inner.worker {
            Some(w) => w,
            None => {
                log::warn!("dropping blocking async invoke: {}", DelegateError::NoWorker);
                return BlockingOutcome::Completed { result: Ret::default(), args };
            }
        };

        let slot = Arc::new(CompletionSlot::new());
        let message = Box::new(BlockingMessage {
            target: self.inner.target.clone(),
            args: Some(args),
            priority: self.inner.priority,
            slot: Arc::clone(&slot),
        });
        worker.dispatch(message);
        let outcome = slot.wait(self.deadline);
        if outcome.is_timed_out() {
            log::debug!("blocking async invoke timed out before deadline");
        }
        outcome
    }
}

struct BlockingMessage<Args, Ret> {
    target: Delegate<Args, Ret>,
    args: Option<Args>,
    priority: Priority,
    slot: Arc<CompletionSlot<Args, Ret>>,
}

impl<Args, Ret> Invoker for BlockingMessage<Args, Ret>
where
    Args: Clone + Send,
    Ret: Default + Send,
{
    fn invoke(&mut self) -> bool {
        match self.args.take() {
            Some(args) => {
                // The completion slot needs to hand the (possibly
                // target-mutated) argument storage back to the source, but
                // `Delegate::invoke` consumes its argument. Cloning here is
                // the price of that: callers whose `Args` carries
                // interior-mutable fields (`Arc<Mutex<_>>`, `Cell`, ...) see
                // the target's writes through the shared handle regardless
                // of which clone comes back; plain value arguments are
                // unaffected since the target only computes `Ret` from them.
                let result = self.target.invoke(args.clone());
                self.slot.complete(result, args);
                true
            }
            None => false,
        }
    }

    fn priority(&self) -> Priority {
        self.priority
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    /// A minimal FIFO worker good enough to exercise ordering and priority
    /// properties without pulling in the demo crate's real thread worker.
    struct TestWorker {
        sender: mpsc::Sender<Box<dyn Invoker>>,
    }

    impl TestWorker {
        fn spawn() -> Arc<Self> {
            let (tx, rx) = mpsc::channel::<Box<dyn Invoker>>();
            thread::spawn(move || {
                for mut msg in rx {
                    msg.invoke();
                }
            });
            Arc::new(TestWorker { sender: tx })
        }
    }

    impl WorkerContext for TestWorker {
        fn dispatch(&self, message: Box<dyn Invoker>) {
            self.sender.send(message).unwrap();
        }
    }

    fn sum(args: (i32, i32)) -> i32 {
        args.0 + args.1
    }

    #[test]
    fn empty_async_delegate_invoke_is_noop() {
        let worker = TestWorker::spawn();
        let target: Delegate<i32, i32> = Delegate::empty();
        let async_d = AsyncDelegate::new(target, worker);
        assert_eq!(async_d.invoke(5), 0);
    }

    #[test]
    fn async_fifo_preserves_submission_order() {
        let worker = TestWorker::spawn();
        let (tx, rx) = mpsc::channel::<i32>();

        let target = Delegate::opaque(move |x: i32| {
            tx.send(x).unwrap();
        });
        let async_d = AsyncDelegate::new(target, worker);

        async_d.invoke(1);
        async_d.invoke(2);
        async_d.invoke(3);

        let observed: Vec<i32> = rx.iter().take(3).collect();
        assert_eq!(observed, vec![1, 2, 3]);
    }

    #[test]
    fn from_config_uses_the_configured_default_deadline() {
        let worker = TestWorker::spawn();
        let blocking = BlockingAsyncDelegate::from_config(
            Delegate::free(sum),
            worker,
            &AsyncDelegateConfig { default_deadline: Duration::from_secs(1) },
        );

        match blocking.invoke((4, 5)) {
            BlockingOutcome::Completed { result, .. } => assert_eq!(result, 9),
            BlockingOutcome::TimedOut => panic!("expected completion"),
        }
    }

    #[test]
    fn blocking_async_returns_target_result() {
        let worker = TestWorker::spawn();
        let blocking = BlockingAsyncDelegate::new(
            Delegate::free(sum),
            worker,
            Deadline::After(Duration::from_secs(1)),
        );

        match blocking.invoke((4, 5)) {
            BlockingOutcome::Completed { result, .. } => assert_eq!(result, 9),
            BlockingOutcome::TimedOut => panic!("expected completion"),
        }
    }

    #[test]
    fn blocking_async_times_out_when_worker_never_runs() {
        struct DeadWorker;
        impl WorkerContext for DeadWorker {
            fn dispatch(&self, _message: Box<dyn Invoker>) {
                // Deliberately never invoked, to force a timeout.
            }
        }

        let blocking = BlockingAsyncDelegate::new(
            Delegate::free(sum),
            Arc::new(DeadWorker),
            Deadline::After(Duration::from_millis(20)),
        );

        assert!(blocking.invoke((1, 1)).is_timed_out());
    }

    #[test]
    fn completion_after_timeout_is_discarded() {
        let called = Arc::new(AtomicUsize::new(0));
        let slot: Arc<CompletionSlot<i32, i32>> = Arc::new(CompletionSlot::new());

        let outcome = slot.wait(Deadline::After(Duration::from_millis(5)));
        assert!(outcome.is_timed_out());

        // A late completion (as if the worker finally ran) must be a no-op.
        slot.complete(99, 1);
        called.fetch_add(1, Ordering::SeqCst);
        assert!(matches!(*slot.state.lock().unwrap(), SlotState::Abandoned));
    }
}
