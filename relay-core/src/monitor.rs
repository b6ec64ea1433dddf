//! Transport reliability monitor: tracks in-flight sends and raises a
//! signal on acknowledgement or timeout (spec §3, §4.6).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::MonitorConfig;
use crate::containers::Signal;
use crate::lock::ReentrantMutex;
use crate::remote::RemoteId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatusKind {
    Success,
    Timeout,
}

/// Event raised to monitor subscribers on ack or timeout (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct SendStatus {
    pub id: RemoteId,
    pub seq: u16,
    pub status: SendStatusKind,
}

struct Entry {
    remote_id: RemoteId,
    sent_at: Instant,
}

/// Tracks `seq -> (remote_id, send_timestamp)` for every send awaiting an
/// ack, and raises [`SendStatus`] on resolution (spec §4.6). All operations
/// serialize under a recursive lock so a subscriber may re-enter the
/// monitor (e.g. to unsubscribe) from inside its own callback.
pub struct TransportMonitor {
    entries: ReentrantMutex<HashMap<u16, Entry>>,
    timeout: Duration,
    signal: Arc<Signal<SendStatus>>,
}

impl TransportMonitor {
    pub fn new(timeout: Duration) -> Self {
        TransportMonitor {
            entries: ReentrantMutex::new(HashMap::new()),
            timeout,
            signal: Signal::new(),
        }
    }

    /// Construct from a [`crate::config::MonitorConfig`] instead of a raw
    /// `Duration`.
    pub fn from_config(config: &MonitorConfig) -> Self {
        TransportMonitor::new(config.timeout)
    }

    /// Subscribers are notified of [`SendStatus`] through this signal.
    pub fn status_signal(&self) -> &Arc<Signal<SendStatus>> {
        &self.signal
    }

    /// Record a send awaiting acknowledgement. Called by the send path
    /// immediately after a non-ack message goes out.
    pub fn add(&self, seq: u16, id: RemoteId) {
        self.entries.lock().insert(seq, Entry { remote_id: id, sent_at: Instant::now() });
    }

    /// Resolve `seq` as acknowledged. Called by the receive path on ack.
    /// No-op (no event raised) if `seq` is not outstanding.
    pub fn remove(&self, seq: u16) {
        let removed = self.entries.lock().remove(&seq);
        if let Some(entry) = removed {
            log::trace!("ack received for id {} seq {}", entry.remote_id, seq);
            self.signal.broadcast(SendStatus { id: entry.remote_id, seq, status: SendStatusKind::Success });
        }
    }

    /// Sweep every outstanding entry whose age exceeds the configured
    /// timeout, removing it and raising a terminal timeout event. Must be
    /// driven periodically by some external timer.
    pub fn process(&self) {
        let now = Instant::now();
        let expired: Vec<(u16, RemoteId)> = {
            let guard = self.entries.lock();
            guard
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.sent_at) > self.timeout)
                .map(|(seq, entry)| (*seq, entry.remote_id))
                .collect()
        };

        if expired.is_empty() {
            return;
        }

        let mut guard = self.entries.lock();
        for (seq, _) in &expired {
            guard.remove(seq);
        }
        drop(guard);

        for (seq, id) in expired {
            log::warn!("send timed out for id {} seq {}", id, seq);
            self.signal.broadcast(SendStatus { id, seq, status: SendStatusKind::Timeout });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn from_config_uses_the_configured_timeout() {
        let monitor = TransportMonitor::from_config(&MonitorConfig { timeout: Duration::from_millis(10) });
        let timeouts = Arc::new(AtomicUsize::new(0));

        let t = Arc::clone(&timeouts);
        let _sub = monitor.status_signal().connect(crate::delegate::Delegate::opaque(move |status: SendStatus| {
            if status.status == SendStatusKind::Timeout {
                t.fetch_add(1, Ordering::SeqCst);
            }
        }));

        monitor.add(1, 1);
        thread::sleep(Duration::from_millis(30));
        monitor.process();

        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn ack_before_timeout_raises_success_only() {
        let monitor = TransportMonitor::new(Duration::from_secs(60));
        let successes = Arc::new(AtomicUsize::new(0));
        let timeouts = Arc::new(AtomicUsize::new(0));

        let s = Arc::clone(&successes);
        let t = Arc::clone(&timeouts);
        let _sub = monitor.status_signal().connect(crate::delegate::Delegate::opaque(move |status: SendStatus| {
            match status.status {
                SendStatusKind::Success => s.fetch_add(1, Ordering::SeqCst),
                SendStatusKind::Timeout => t.fetch_add(1, Ordering::SeqCst),
            };
        }));

        monitor.add(1, 7);
        monitor.remove(1);
        monitor.process();

        assert_eq!(successes.load(Ordering::SeqCst), 1);
        assert_eq!(timeouts.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unacked_entry_times_out_exactly_once() {
        let monitor = TransportMonitor::new(Duration::from_millis(10));
        let timeouts = Arc::new(AtomicUsize::new(0));

        let t = Arc::clone(&timeouts);
        let _sub = monitor.status_signal().connect(crate::delegate::Delegate::opaque(move |status: SendStatus| {
            if status.status == SendStatusKind::Timeout {
                t.fetch_add(1, Ordering::SeqCst);
            }
        }));

        monitor.add(2, 3);
        thread::sleep(Duration::from_millis(30));
        monitor.process();
        monitor.process();

        assert_eq!(timeouts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removing_unknown_seq_raises_nothing() {
        let monitor = TransportMonitor::new(Duration::from_secs(1));
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        let _sub = monitor
            .status_signal()
            .connect(crate::delegate::Delegate::opaque(move |_: SendStatus| {
                h.fetch_add(1, Ordering::SeqCst);
            }));

        monitor.remove(999);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
