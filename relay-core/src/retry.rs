//! Retry decorator: wraps any [`Transport`] and resends under the monitor's
//! timeout signal, preserving the sequence number across attempts so
//! receivers can detect duplicates (spec §3, §4.7).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::RetryConfig;
use crate::containers::Subscription;
use crate::delegate::Delegate;
use crate::error::Result as RemoteResult;
use crate::header::Header;
use crate::lock::ReentrantMutex;
use crate::monitor::{SendStatus, SendStatusKind, TransportMonitor};
use crate::remote::Transport;

struct RetryEntry {
    header: Header,
    payload: Vec<u8>,
    attempts_remaining: u32,
}

/// Decorates a [`Transport`], re-sending a message under the same sequence
/// number each time the paired [`TransportMonitor`] reports a timeout,
/// until `max_retries` is exhausted (spec §4.7).
///
/// Must be constructed via [`RetryTransport::new`], which returns an `Arc`:
/// the retry callback subscribed to the monitor's signal needs a
/// shared handle back to this decorator's own state, the same
/// shared-ownership requirement [`crate::containers::Signal`] has.
pub struct RetryTransport<T> {
    inner: Arc<T>,
    monitor: Arc<TransportMonitor>,
    max_retries: u32,
    entries: ReentrantMutex<HashMap<u16, RetryEntry>>,
    subscription: Mutex<Option<Subscription<SendStatus, ()>>>,
}

impl<T: Transport + 'static> RetryTransport<T> {
    pub fn new(inner: Arc<T>, monitor: Arc<TransportMonitor>, max_retries: u32) -> Arc<Self> {
        let this = Arc::new(RetryTransport {
            inner,
            monitor: Arc::clone(&monitor),
            max_retries,
            entries: ReentrantMutex::new(HashMap::new()),
            subscription: Mutex::new(None),
        });

        let weak = Arc::downgrade(&this);
        let subscription = monitor.status_signal().connect(Delegate::opaque(move |status: SendStatus| {
            if let Some(this) = weak.upgrade() {
                this.on_status(status);
            }
        }));
        *this.subscription.lock().unwrap() = Some(subscription);
        this
    }

    /// Construct from a [`crate::config::RetryConfig`] instead of a raw
    /// `u32` retry budget.
    pub fn from_config(inner: Arc<T>, monitor: Arc<TransportMonitor>, config: &RetryConfig) -> Arc<Self> {
        RetryTransport::new(inner, monitor, config.max_retries)
    }

    fn on_status(&self, status: SendStatus) {
        match status.status {
            SendStatusKind::Success => {
                self.entries.lock().remove(&status.seq);
            }
            SendStatusKind::Timeout => self.on_timeout(status.seq),
        }
    }

    fn on_timeout(&self, seq: u16) {
        enum Outcome {
            Resend(Header, Vec<u8>),
            Exhausted,
            Untracked,
        }

        let outcome = {
            let mut guard = self.entries.lock();
            match guard.get_mut(&seq) {
                Some(entry) if entry.attempts_remaining > 0 => {
                    entry.attempts_remaining -= 1;
                    Outcome::Resend(entry.header, entry.payload.clone())
                }
                Some(_) => {
                    guard.remove(&seq);
                    Outcome::Exhausted
                }
                None => Outcome::Untracked,
            }
        };

        match outcome {
            Outcome::Resend(header, payload) => {
                log::debug!("resending seq {} for id {} after timeout", seq, header.id);
                self.inner.send(&payload, &header);
                self.monitor.add(seq, header.id);
            }
            Outcome::Exhausted => log::error!("retry budget exhausted for seq {}", seq),
            Outcome::Untracked => {}
        }
    }

    /// Number of sends still awaiting resolution.
    pub fn pending_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<T: Transport> Transport for RetryTransport<T> {
    fn send(&self, payload: &[u8], header: &Header) -> i32 {
        self.entries.lock().insert(
            header.seq,
            RetryEntry { header: *header, payload: payload.to_vec(), attempts_remaining: self.max_retries },
        );
        // Lock released above before this call, per spec: the decorator
        // must not hold its map lock across a transport send.
        log::trace!("sending seq {} for id {}, {} retries available", header.seq, header.id, self.max_retries);
        let status = self.inner.send(payload, header);
        self.monitor.add(header.seq, header.id);
        status
    }

    fn receive(&self) -> RemoteResult<(Header, Vec<u8>)> {
        self.inner.receive()
    }
}
