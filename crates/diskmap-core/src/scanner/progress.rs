/// Scan progress reporting.
///
/// Two surfaces: a [`ProgressCounter`] that a UI timer polls for a
/// `(bytes_processed, bytes_total_estimate)` pair, and a bounded channel of
/// [`ScanProgress`] events for phase changes, recoverable errors, and the
/// final outcome.
use crossbeam_channel::{Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::Duration;

/// Pipeline stage currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Scanning,
    Aggregating,
    Collapsing,
    Writing,
}

/// Events sent from the scan thread to whoever holds the receiver.
#[derive(Debug)]
pub enum ScanProgress {
    /// The scan root was resolved and the volume estimate taken.
    Started { root: String, total_estimate: u64 },
    /// A new pipeline stage began.
    Phase(ScanPhase),
    /// A non-fatal error (e.g. permission denied on one entry).
    Error { path: String, message: String },
    /// The result was written to the store.
    Complete {
        duration: Duration,
        dirs_scanned: u64,
        error_count: u64,
        used_size: u64,
        store_path: PathBuf,
    },
    /// The scan was cancelled; nothing was written.
    Cancelled,
    /// The scan failed; the previous store, if any, is untouched.
    Failed { message: String },
}

/// Point-in-time copy of the progress counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub bytes_processed: u64,
    /// Used space of the volume. Only an estimate; zero when unknown.
    pub bytes_total_estimate: u64,
}

impl ProgressSnapshot {
    /// Completion in `0.0..=1.0`, or `None` when no estimate exists.
    pub fn fraction(&self) -> Option<f64> {
        if self.bytes_total_estimate == 0 {
            return None;
        }
        Some((self.bytes_processed as f64 / self.bytes_total_estimate as f64).min(1.0))
    }
}

/// Shared byte counter fed by workers on every directory commit.
#[derive(Debug, Default)]
pub struct ProgressCounter {
    inner: Mutex<ProgressSnapshot>,
}

impl ProgressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_total_estimate(&self, bytes: u64) {
        self.inner.lock().bytes_total_estimate = bytes;
    }

    pub fn add_processed(&self, bytes: u64) {
        if bytes > 0 {
            self.inner.lock().bytes_processed += bytes;
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.inner.lock()
    }
}

/// Optional sender for [`ScanProgress`] events.
///
/// Nothing here ever blocks. Intermediate events are dropped when the
/// channel is full. A terminal event evicts the oldest queued events until
/// it fits, so it is always delivered even to a reader that never drained.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    tx: Option<Sender<ScanProgress>>,
    /// Second handle on the same channel, used only for eviction.
    evict: Option<Receiver<ScanProgress>>,
}

impl EventSink {
    /// A sink over a fresh channel holding at most `capacity` events.
    pub fn bounded(capacity: usize) -> (Self, Receiver<ScanProgress>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity.max(1));
        let sink = Self {
            tx: Some(tx),
            evict: Some(rx.clone()),
        };
        (sink, rx)
    }

    /// A sink that discards everything.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn report(&self, event: ScanProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(event);
        }
    }

    pub fn finish(&self, event: ScanProgress) {
        let (Some(tx), Some(evict)) = (&self.tx, &self.evict) else {
            return;
        };
        let mut event = event;
        loop {
            match tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    event = back;
                    let _ = evict.try_recv();
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_accumulates() {
        let counter = ProgressCounter::new();
        counter.set_total_estimate(1000);
        counter.add_processed(250);
        counter.add_processed(0);
        counter.add_processed(250);
        let snap = counter.snapshot();
        assert_eq!(snap.bytes_processed, 500);
        assert_eq!(snap.fraction(), Some(0.5));
    }

    #[test]
    fn fraction_without_estimate() {
        let snap = ProgressSnapshot {
            bytes_processed: 10,
            bytes_total_estimate: 0,
        };
        assert_eq!(snap.fraction(), None);
        let over = ProgressSnapshot {
            bytes_processed: 20,
            bytes_total_estimate: 10,
        };
        assert_eq!(over.fraction(), Some(1.0));
    }

    #[test]
    fn full_channel_drops_reports() {
        let (sink, rx) = EventSink::bounded(1);
        sink.report(ScanProgress::Phase(ScanPhase::Scanning));
        sink.report(ScanProgress::Phase(ScanPhase::Aggregating));
        assert!(matches!(
            rx.try_recv(),
            Ok(ScanProgress::Phase(ScanPhase::Scanning))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn terminal_event_on_full_channel_does_not_block() {
        let (sink, rx) = EventSink::bounded(4);
        for i in 0..10 {
            sink.report(ScanProgress::Error {
                path: format!("/d{i}"),
                message: "denied".into(),
            });
        }
        assert_eq!(rx.len(), 4);

        // Runs on this thread: a blocking send would hang the test.
        sink.finish(ScanProgress::Cancelled);

        let events: Vec<_> = rx.try_iter().collect();
        assert_eq!(events.len(), 4);
        assert!(matches!(events.last(), Some(ScanProgress::Cancelled)));
        // The oldest error was evicted to make room.
        assert!(matches!(&events[0], ScanProgress::Error { path, .. } if path == "/d1"));
    }

    #[test]
    fn finish_after_reader_dropped_returns() {
        let (sink, rx) = EventSink::bounded(2);
        drop(rx);
        sink.report(ScanProgress::Phase(ScanPhase::Writing));
        sink.finish(ScanProgress::Cancelled);
    }

    #[test]
    fn empty_sink_is_silent() {
        EventSink::none().finish(ScanProgress::Cancelled);
    }
}
