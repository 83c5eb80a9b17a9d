//! Progress and status reporting.
//!
//! Long-running operations never return raw failures to a UI. Instead they
//! push [`StatusEvent`]s to a [`ProgressObserver`]: document progress ticks,
//! human-readable status lines, and the final answer of a question.

use std::sync::Mutex;

use serde::Serialize;
use tokio::sync::mpsc;

/// Something a driving UI wants to know about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    /// `completed` of `total` documents have been processed.
    Progress {
        /// Documents finished so far.
        completed: usize,
        /// Documents in this run.
        total: usize,
    },
    /// A status line (including terminal success and error messages).
    Status {
        /// The message.
        message: String,
    },
    /// A synthesized answer.
    Answer {
        /// The question that was asked.
        query: String,
        /// The answer text.
        text: String,
    },
}

/// Receives progress and status updates from pipeline operations.
pub trait ProgressObserver: Send + Sync {
    /// Deliver one event.
    fn notify(&self, event: StatusEvent);

    /// Report that `completed` of `total` documents are done.
    fn progress(&self, completed: usize, total: usize) {
        self.notify(StatusEvent::Progress { completed, total });
    }

    /// Report a status line.
    fn status(&self, message: &str) {
        self.notify(StatusEvent::Status { message: message.to_string() });
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {
    fn notify(&self, _event: StatusEvent) {}
}

/// Forwards events into an unbounded `tokio` channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<StatusEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<StatusEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressObserver for ChannelObserver {
    fn notify(&self, event: StatusEvent) {
        let _ = self.tx.send(event);
    }
}

/// Keeps every event in memory. Handy for tests and batch drivers.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingObserver {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events received so far.
    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// All status lines received so far.
    pub fn statuses(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                StatusEvent::Status { message } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// The most recent status line.
    pub fn last_status(&self) -> Option<String> {
        self.statuses().pop()
    }
}

impl ProgressObserver for RecordingObserver {
    fn notify(&self, event: StatusEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
