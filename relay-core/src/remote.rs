//! Remote invocation: serialize → dispatch on the sender, deserialize →
//! call-through on the receiver.
//!
//! The two directions are two plainly named methods —
//! [`RemoteDelegate::invoke`] for the sender and
//! [`RemoteDelegate::invoke_local`] for the receiver — rather than one
//! shared entrypoint behind a mode flag, so there is no flag or shared
//! mutable state for the two directions to get out of sync over.

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::delegate::Delegate;
use crate::error::{DelegateError, ErrorKind, Result};
use crate::header::{self, Header};

pub type RemoteId = u16;

/// Reserved id for zero-payload acknowledgement frames (spec §6 "Reserved
/// identifiers").
pub const ACK_ID: RemoteId = 0;

/// Reserved id marking an invalid or unset remote delegate (spec §6).
pub const INVALID_ID: RemoteId = RemoteId::MAX;

/// Marshals one remote delegate's argument list to and from bytes.
pub trait Serializer<Args>: Send + Sync {
    fn write(&self, sink: &mut dyn Write, args: &Args) -> io::Result<()>;
    fn read(&self, source: &mut dyn Read, slots: &mut Args) -> io::Result<()>;
}

/// Carries a framed payload to and from the wire. Implementations decide
/// their own encoding of [`Header`] (spec §4.8 leaves byte order up to the
/// transport).
pub trait Transport: Send + Sync {
    /// Returns 0 on success, a transport-defined non-zero code otherwise.
    fn send(&self, payload: &[u8], header: &Header) -> i32;
    fn receive(&self) -> Result<(Header, Vec<u8>)>;
}

/// Fronts a transport: allocates the header (id + next sequence) and hands
/// the framed payload to `send` (spec §4.5 "Dispatcher").
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, payload: &[u8], id: RemoteId) -> i32;
}

/// The default dispatcher: one [`Transport`], one monotonic sequence
/// source.
pub struct TransportDispatcher<T> {
    transport: Arc<T>,
}

impl<T: Transport> TransportDispatcher<T> {
    pub fn new(transport: Arc<T>) -> Self {
        TransportDispatcher { transport }
    }
}

impl<T: Transport> Dispatcher for TransportDispatcher<T> {
    fn dispatch(&self, payload: &[u8], id: RemoteId) -> i32 {
        let header = Header::new(id, header::next_sequence(), payload.len() as u16);
        log::trace!("dispatching {} payload bytes to remote id {} as seq {}", payload.len(), id, header.seq);
        self.transport.send(payload, &header)
    }
}

/// The callback delegate an error sink is: `(remote_id, error_kind, aux_code)`.
pub type ErrorSink = Delegate<(RemoteId, ErrorKind, i32), ()>;

/// A delegate whose sender side serializes its arguments and hands them to
/// a dispatcher instead of calling a local target directly, and whose
/// receiver side deserializes incoming bytes and calls through to a local
/// target (spec §3 "Remote delegate", §4.5).
pub struct RemoteDelegate<Args, Ret = ()> {
    id: RemoteId,
    /// The local implementation invoked on the receiving side once
    /// arguments have been deserialized. Empty on a pure sender proxy.
    target: Delegate<Args, Ret>,
    serializer: Option<Arc<dyn Serializer<Args>>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    error_sink: Option<ErrorSink>,
}

impl<Args, Ret> RemoteDelegate<Args, Ret> {
    pub fn new(id: RemoteId, target: Delegate<Args, Ret>) -> Self {
        RemoteDelegate { id, target, serializer: None, dispatcher: None, error_sink: None }
    }

    pub fn with_serializer(mut self, serializer: Arc<dyn Serializer<Args>>) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_error_sink(mut self, sink: ErrorSink) -> Self {
        self.error_sink = Some(sink);
        self
    }

    pub fn id(&self) -> RemoteId {
        self.id
    }

    fn report(&self, err: &DelegateError) {
        log::error!("remote delegate {} error: {}", self.id, err);
        match &self.error_sink {
            Some(sink) => sink.invoke((self.id, ErrorKind::from(err), aux_code(err))),
            // Spec §4.10: no configured sink means the failure must
            // surface as a fatal condition, not be silently swallowed.
            None => panic!("unhandled remote delegate error on id {}: {}", self.id, err),
        }
    }
}

fn aux_code(err: &DelegateError) -> i32 {
    match err {
        DelegateError::Dispatch(code) => *code,
        _ => 0,
    }
}

impl<Args, Ret> RemoteDelegate<Args, Ret>
where
    Ret: Default,
{
    /// Sender side (spec §4.5 steps 1-5, minus the sync-flag short-circuit
    /// — see the module doc). Always returns the default of `Ret`; the only
    /// feedback channel for a remote call is the ack frame the monitor
    /// observes.
    pub fn invoke(&self, args: Args) -> Ret {
        if let Err(err) = self.send(&args) {
            self.report(&err);
        }
        Ret::default()
    }

    fn send(&self, args: &Args) -> Result<()> {
        let serializer = self.serializer.as_ref().ok_or(DelegateError::NoSerializer)?;
        let mut sink = Vec::new();
        serializer.write(&mut sink, args).map_err(DelegateError::Serialize)?;

        let dispatcher = self.dispatcher.as_ref().ok_or(DelegateError::NoDispatcher)?;
        let status = dispatcher.dispatch(&sink, self.id);
        if status != 0 {
            return Err(DelegateError::Dispatch(status));
        }
        Ok(())
    }
}

impl<Args, Ret> RemoteDelegate<Args, Ret>
where
    Args: Default,
    Ret: Default,
{
    /// Receiver side (spec §4.5 "Receiver side"). Deserializes `source`
    /// into a default-constructed argument slot and calls the local target
    /// synchronously. Returns `false` (and reports to the error sink,
    /// or panics with none configured) if no serializer is bound or
    /// deserialization fails.
    ///
    /// The source this mirrors distinguishes "read raised an exception"
    /// from "the stream was left in a bad state with no exception"; `Read`
    /// implementations in this crate turn the latter into an
    /// `UnexpectedEof` error instead, so only one failure path applies here
    /// (see DESIGN.md).
    pub fn invoke_local(&self, mut source: impl Read) -> bool {
        let serializer = match &self.serializer {
            Some(s) => s,
            None => {
                self.report(&DelegateError::NoSerializer);
                return false;
            }
        };

        let mut slots = Args::default();
        if let Err(e) = serializer.read(&mut source, &mut slots) {
            self.report(&DelegateError::DeserializeException(e));
            return false;
        }

        self.target.invoke(slots);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Mutex;

    struct EchoSerializer;
    impl Serializer<i32> for EchoSerializer {
        fn write(&self, sink: &mut dyn Write, args: &i32) -> io::Result<()> {
            sink.write_all(&args.to_be_bytes())
        }
        fn read(&self, source: &mut dyn Read, slots: &mut i32) -> io::Result<()> {
            let mut buf = [0u8; 4];
            source.read_exact(&mut buf)?;
            *slots = i32::from_be_bytes(buf);
            Ok(())
        }
    }

    struct RecordingTransport {
        sent: Mutex<Vec<(RemoteId, Vec<u8>)>>,
    }
    impl RecordingTransport {
        fn new() -> Self {
            RecordingTransport { sent: Mutex::new(Vec::new()) }
        }
    }
    impl Transport for RecordingTransport {
        fn send(&self, payload: &[u8], header: &Header) -> i32 {
            self.sent.lock().unwrap().push((header.id, payload.to_vec()));
            0
        }
        fn receive(&self) -> Result<(Header, Vec<u8>)> {
            unimplemented!("not exercised by these tests")
        }
    }

    #[test]
    fn sender_path_serializes_and_dispatches() {
        let transport = Arc::new(RecordingTransport::new());
        let remote: RemoteDelegate<i32, ()> = RemoteDelegate::new(9, Delegate::empty())
            .with_serializer(Arc::new(EchoSerializer))
            .with_dispatcher(Arc::new(TransportDispatcher::new(Arc::clone(&transport))));

        remote.invoke(42);

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, 9);
        assert_eq!(sent[0].1, 42i32.to_be_bytes().to_vec());
    }

    #[test]
    fn missing_dispatcher_reports_to_error_sink() {
        let reported = Arc::new(AtomicI32::new(-1));
        let reported_clone = Arc::clone(&reported);
        let sink: ErrorSink = Delegate::opaque(move |(_, kind, _): (RemoteId, ErrorKind, i32)| {
            reported_clone.store(kind as i32, Ordering::SeqCst);
        });

        let remote: RemoteDelegate<i32, ()> = RemoteDelegate::new(1, Delegate::empty())
            .with_serializer(Arc::new(EchoSerializer))
            .with_error_sink(sink);

        remote.invoke(7);
        assert_eq!(reported.load(Ordering::SeqCst), ErrorKind::NoDispatcher as i32);
    }

    #[test]
    fn receiver_path_deserializes_and_calls_local_target() {
        let observed = Arc::new(AtomicI32::new(0));
        let observed_clone = Arc::clone(&observed);
        let target: Delegate<i32, ()> = Delegate::opaque(move |x: i32| {
            observed_clone.store(x, Ordering::SeqCst);
        });

        let remote: RemoteDelegate<i32, ()> =
            RemoteDelegate::new(1, target).with_serializer(Arc::new(EchoSerializer));

        let bytes = 99i32.to_be_bytes();
        assert!(remote.invoke_local(&bytes[..]));
        assert_eq!(observed.load(Ordering::SeqCst), 99);
    }

    #[test]
    fn receiver_path_reports_deserialize_exception() {
        let reported = Arc::new(AtomicI32::new(-1));
        let reported_clone = Arc::clone(&reported);
        let sink: ErrorSink = Delegate::opaque(move |(_, kind, _): (RemoteId, ErrorKind, i32)| {
            reported_clone.store(kind as i32, Ordering::SeqCst);
        });

        let remote: RemoteDelegate<i32, ()> = RemoteDelegate::new(1, Delegate::empty())
            .with_serializer(Arc::new(EchoSerializer))
            .with_error_sink(sink);

        // Too short to satisfy `read_exact`.
        let bytes = [0u8; 1];
        assert!(!remote.invoke_local(&bytes[..]));
        assert_eq!(reported.load(Ordering::SeqCst), ErrorKind::DeserializeException as i32);
    }
}
