//! Async channel bridge between Tokio runtime and the capture thread

use async_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use protocol::{ControlKind, JobRecord};
use tracing::warn;

/// Commands from Tokio runtime to the capture thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureCommand {
    /// Stop after the current iteration, flushing any pending job
    Shutdown,
}

/// Totals reported when the capture loop terminates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureSummary {
    /// Jobs persisted during the session
    pub jobs_captured: u64,
    /// Document bytes persisted during the session
    pub bytes_captured: u64,
    /// Control frames answered during the session
    pub control_frames: u64,
}

/// Operator-facing events emitted by the capture engine
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// First document chunk after the buffer was empty
    TransferStarted,

    /// Document chunk appended to the pending job
    DataReceived {
        /// Bytes in this chunk
        chunk: usize,
        /// Bytes buffered so far
        total: usize,
    },

    /// Handshake frame observed on the channel
    ControlFrame {
        /// Recognised handshake kind
        kind: ControlKind,
        /// Raw bytes of the frame
        raw: Vec<u8>,
    },

    /// Response written back to the host
    ResponseSent {
        /// Bytes written
        bytes: Vec<u8>,
    },

    /// Host went silent for longer than the idle timeout
    TransferTimedOut {
        /// Bytes buffered at the time of the timeout
        buffered: usize,
    },

    /// Job persisted to the capture directory
    JobCaptured {
        /// The written record
        record: JobRecord,
    },

    /// Buffer below the minimum job size was dropped
    JobDiscarded {
        /// Bytes dropped
        len: usize,
    },

    /// Job could not be written; its bytes are lost
    PersistFailed {
        /// Underlying cause
        reason: String,
    },

    /// Loop is exiting and flushing what is left
    FinalFlush {
        /// Bytes buffered at shutdown
        buffered: usize,
    },

    /// Loop has terminated
    Stopped {
        /// Session totals
        summary: CaptureSummary,
    },
}

impl CaptureEvent {
    /// Per-chunk and per-handshake traffic, shed first when the console lags
    pub fn is_progress(&self) -> bool {
        matches!(
            self,
            CaptureEvent::DataReceived { .. }
                | CaptureEvent::ControlFrame { .. }
                | CaptureEvent::ResponseSent { .. }
        )
    }
}

/// Handle for Tokio runtime (async)
#[derive(Clone)]
pub struct CaptureBridge {
    cmd_tx: Sender<CaptureCommand>,
    event_rx: Receiver<CaptureEvent>,
}

impl CaptureBridge {
    /// Send a command to the capture thread
    pub async fn send_command(&self, cmd: CaptureCommand) -> crate::Result<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Ask the capture loop to stop
    pub async fn request_shutdown(&self) -> crate::Result<()> {
        self.send_command(CaptureCommand::Shutdown).await
    }

    /// Ask the capture loop to stop from a non-async context
    pub fn request_shutdown_blocking(&self) -> crate::Result<()> {
        self.cmd_tx
            .send_blocking(CaptureCommand::Shutdown)
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Receive an event from the capture thread
    ///
    /// Fails once the capture thread has exited and all events are drained.
    pub async fn recv_event(&self) -> crate::Result<CaptureEvent> {
        self.event_rx
            .recv()
            .await
            .map_err(|e| crate::Error::Channel(e.to_string()))
    }

    /// Take the next queued event without waiting
    pub fn try_recv_event(&self) -> Option<CaptureEvent> {
        self.event_rx.try_recv().ok()
    }
}

/// Handle for the capture thread (blocking)
pub struct CaptureWorker {
    cmd_rx: Receiver<CaptureCommand>,
    event_tx: Sender<CaptureEvent>,
}

impl CaptureWorker {
    /// Check for a pending shutdown without blocking
    ///
    /// A closed command channel counts as a shutdown request.
    pub fn shutdown_requested(&self) -> bool {
        match self.cmd_rx.try_recv() {
            Ok(CaptureCommand::Shutdown) => true,
            Err(TryRecvError::Closed) => true,
            Err(TryRecvError::Empty) => false,
        }
    }

    /// Publish an event without blocking the capture loop
    ///
    /// Progress events stop being queued once only the lifecycle reserve is
    /// left, so job summaries still get through to a slow console. Events are
    /// dropped silently when nobody is listening.
    pub fn send_event(&self, event: CaptureEvent) {
        if event.is_progress() && self.event_tx.len() >= EVENT_QUEUE_CAPACITY - LIFECYCLE_RESERVE {
            return;
        }

        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => warn!("Event queue full, dropping {:?}", event),
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

/// Capacity of the event queue
const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Slots only lifecycle events may use
const LIFECYCLE_RESERVE: usize = 64;

/// Create the channel bridge between Tokio and the capture thread
///
/// Returns (CaptureBridge for Tokio, CaptureWorker for the capture thread)
pub fn create_capture_bridge() -> (CaptureBridge, CaptureWorker) {
    let (cmd_tx, cmd_rx) = bounded(16);
    let (event_tx, event_rx) = bounded(EVENT_QUEUE_CAPACITY);

    (
        CaptureBridge { cmd_tx, event_rx },
        CaptureWorker { cmd_rx, event_tx },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_bridge() {
        let (bridge, worker) = create_capture_bridge();

        let handle = std::thread::spawn(move || {
            while !worker.shutdown_requested() {
                std::thread::yield_now();
            }
            worker.send_event(CaptureEvent::Stopped {
                summary: CaptureSummary::default(),
            });
        });

        bridge.request_shutdown().await.unwrap();
        let event = bridge.recv_event().await.unwrap();
        assert!(matches!(event, CaptureEvent::Stopped { .. }));

        handle.join().unwrap();
        assert!(bridge.recv_event().await.is_err());
    }

    #[test]
    fn test_dropped_bridge_requests_shutdown() {
        let (bridge, worker) = create_capture_bridge();
        assert!(!worker.shutdown_requested());
        drop(bridge);
        assert!(worker.shutdown_requested());
    }

    #[test]
    fn test_full_queue_does_not_block() {
        let (bridge, worker) = create_capture_bridge();
        for _ in 0..EVENT_QUEUE_CAPACITY + 10 {
            worker.send_event(CaptureEvent::TransferStarted);
        }

        let mut count = 0;
        while bridge.try_recv_event().is_some() {
            count += 1;
        }
        assert_eq!(count, EVENT_QUEUE_CAPACITY);
    }

    #[test]
    fn test_progress_flood_keeps_lifecycle_slots() {
        let (bridge, worker) = create_capture_bridge();
        for total in 0..EVENT_QUEUE_CAPACITY + 100 {
            worker.send_event(CaptureEvent::DataReceived { chunk: 1, total });
        }
        worker.send_event(CaptureEvent::PersistFailed {
            reason: "disk full".to_string(),
        });
        worker.send_event(CaptureEvent::Stopped {
            summary: CaptureSummary::default(),
        });

        let events: Vec<CaptureEvent> = std::iter::from_fn(|| bridge.try_recv_event()).collect();
        let progress = events.iter().filter(|e| e.is_progress()).count();
        assert_eq!(progress, EVENT_QUEUE_CAPACITY - LIFECYCLE_RESERVE);
        assert!(matches!(events[progress], CaptureEvent::PersistFailed { .. }));
        assert!(matches!(events.last(), Some(CaptureEvent::Stopped { .. })));
    }
}
