//! Events delivered from a conversion worker to its invoker.
//!
//! The pipeline never calls into the invoking layer directly. It pushes
//! [`ConversionEvent`]s into an [`EventSink`]; the invoker drains the paired
//! [`EventStream`] on its own thread or task, in emission order.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// ConversionEvent
// ---------------------------------------------------------------------------

/// Terminal verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStatus {
    Success,
    Failure,
}

/// Notification sent to the invoking layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversionEvent {
    /// Fraction of the current stage completed, in `[0, 1]`.
    ProgressUpdated { fraction: f64 },
    /// The run reached a terminal state.
    Completed {
        status: CompletionStatus,
        message: String,
    },
    /// A run started (`true`) or finished (`false`). Drives enabling of the
    /// invoker's start control.
    BusyChanged { busy: bool },
}

impl ConversionEvent {
    pub fn success(message: impl Into<String>) -> Self {
        ConversionEvent::Completed {
            status: CompletionStatus::Success,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ConversionEvent::Completed {
            status: CompletionStatus::Failure,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// Create a connected sink/stream pair.
pub fn channel() -> (EventSink, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSink { tx }, EventStream { rx })
}

/// Sending half, held by the worker. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<ConversionEvent>,
}

impl EventSink {
    /// Emit an event. A dropped invoker is not an error for the worker.
    pub fn emit(&self, event: ConversionEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event receiver dropped; discarding event");
        }
    }

    pub fn progress(&self, fraction: f64) {
        self.emit(ConversionEvent::ProgressUpdated { fraction });
    }

    pub fn busy(&self, busy: bool) {
        self.emit(ConversionEvent::BusyChanged { busy });
    }
}

/// Receiving half, drained by the invoker.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<ConversionEvent>,
}

impl EventStream {
    /// Wait for the next event. Returns `None` once every sink is dropped.
    pub async fn recv(&mut self) -> Option<ConversionEvent> {
        self.rx.recv().await
    }

    /// Blocking receive for invokers running on a plain thread.
    pub fn blocking_recv(&mut self) -> Option<ConversionEvent> {
        self.rx.blocking_recv()
    }

    /// Non-blocking receive; `None` when nothing is queued.
    pub fn try_recv(&mut self) -> Option<ConversionEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain everything queued right now.
    pub fn drain(&mut self) -> Vec<ConversionEvent> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_arrive_in_order() {
        let (sink, mut stream) = channel();
        sink.busy(true);
        sink.progress(0.25);
        sink.emit(ConversionEvent::success("done"));
        sink.busy(false);

        assert_eq!(
            stream.drain(),
            vec![
                ConversionEvent::BusyChanged { busy: true },
                ConversionEvent::ProgressUpdated { fraction: 0.25 },
                ConversionEvent::Completed {
                    status: CompletionStatus::Success,
                    message: "done".into()
                },
                ConversionEvent::BusyChanged { busy: false },
            ]
        );
    }

    #[test]
    fn emit_after_receiver_dropped_does_not_panic() {
        let (sink, stream) = channel();
        drop(stream);
        sink.progress(1.0);
    }

    #[tokio::test]
    async fn recv_ends_when_sinks_dropped() {
        let (sink, mut stream) = channel();
        let clone = sink.clone();
        clone.emit(ConversionEvent::failure("boom"));
        drop(sink);
        drop(clone);

        assert_eq!(stream.recv().await, Some(ConversionEvent::failure("boom")));
        assert_eq!(stream.recv().await, None);
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_string(&ConversionEvent::BusyChanged { busy: true }).unwrap();
        assert_eq!(json, r#"{"type":"busy_changed","busy":true}"#);
    }
}
