//! Capture loop and completion policy
//!
//! The loop has two logical states, Idle (nothing buffered) and Accumulating.
//! Each iteration does one non-blocking read and then either answers a
//! handshake, appends document bytes, or, when nothing arrived, checks
//! whether the host has been silent long enough to call the job finished.
//!
//! There is no end-of-job marker in the byte stream, so a job ends on one of:
//! - a control frame arriving while enough document bytes are buffered
//! - the idle timeout elapsing with enough bytes buffered
//! - loop shutdown (cancellation or fatal device error)

use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};

use common::{CaptureEvent, CaptureSummary, CaptureWorker, Error, Result};
use protocol::{ControlFrame, ControlKind, classify, respond};
use tracing::{debug, error, info};

use crate::accumulator::{FlushOutcome, JobAccumulator};
use crate::store::JobStore;

/// Tunables for the capture loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Maximum bytes taken from the device per read
    pub read_buffer_size: usize,
    /// Sleep after a read that returned nothing
    pub poll_interval: Duration,
    /// Silence after which a buffered job is considered complete
    pub idle_timeout: Duration,
    /// Buffers shorter than this are dropped instead of persisted
    pub min_job_bytes: usize,
    /// A control frame flushes the buffer once it holds at least this many bytes
    pub interrupt_flush_bytes: usize,
    /// The idle timeout only flushes buffers longer than this
    pub idle_flush_bytes: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            read_buffer_size: 4096,
            poll_interval: Duration::from_millis(100),
            idle_timeout: Duration::from_secs(3),
            min_job_bytes: 10,
            interrupt_flush_bytes: 50,
            idle_flush_bytes: 50,
        }
    }
}

/// What a single loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Document bytes were buffered
    Data { len: usize },
    /// A handshake was answered
    Control(ControlKind),
    /// The device had nothing to read
    Empty,
}

/// Single-threaded capture engine
///
/// Owns the device channel, the pending job and the job store. Dropping the
/// engine closes the device.
pub struct CaptureEngine<D> {
    device: D,
    accumulator: JobAccumulator,
    store: JobStore,
    settings: EngineSettings,
    worker: CaptureWorker,
    read_buf: Vec<u8>,
    summary: CaptureSummary,
}

impl<D: Read + Write> CaptureEngine<D> {
    pub fn new(device: D, store: JobStore, settings: EngineSettings, worker: CaptureWorker) -> Self {
        Self {
            device,
            accumulator: JobAccumulator::new(settings.min_job_bytes),
            store,
            read_buf: vec![0u8; settings.read_buffer_size.max(1)],
            settings,
            worker,
            summary: CaptureSummary::default(),
        }
    }

    /// The pending job
    pub fn accumulator(&self) -> &JobAccumulator {
        &self.accumulator
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Totals so far
    pub fn summary(&self) -> CaptureSummary {
        self.summary
    }

    /// Run until shutdown is requested or the device fails
    ///
    /// Whatever is buffered is flushed before returning on every exit path,
    /// then the device is dropped with the engine.
    pub fn run(mut self) -> Result<CaptureSummary> {
        info!("Capture loop started");

        let result = self.drive();
        if let Err(e) = &result {
            error!("Capture loop stopped: {}", e);
        }

        let summary = self.finish();
        result.map(|()| summary)
    }

    fn drive(&mut self) -> Result<()> {
        loop {
            if self.worker.shutdown_requested() {
                info!("Shutdown requested");
                return Ok(());
            }

            if self.step(Instant::now())? == Step::Empty && !self.settings.poll_interval.is_zero() {
                std::thread::sleep(self.settings.poll_interval);
            }
        }
    }

    /// One read-dispatch-check iteration, without sleeping
    ///
    /// Would-block, interrupted and zero-length reads are all "no data" and
    /// run the idle-timeout check against `now`. Any other device error is
    /// fatal and returned.
    pub fn step(&mut self, now: Instant) -> Result<Step> {
        let len = match self.device.read(&mut self.read_buf) {
            Ok(0) => return Ok(self.on_empty_read(now)),
            Ok(len) => len,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                return Ok(self.on_empty_read(now));
            }
            Err(e) => return Err(Error::Device(format!("read failed: {}", e))),
        };

        self.accumulator.touch(now);

        if let Some(frame) = classify(&self.read_buf[..len]) {
            let kind = frame.kind;
            self.on_control_frame(frame)?;
            return Ok(Step::Control(kind));
        }

        if self.accumulator.append(&self.read_buf[..len], now) {
            info!("Document transfer starting");
            self.worker.send_event(CaptureEvent::TransferStarted);
        }

        let total = self.accumulator.len();
        debug!("+{} bytes, total: {}", len, total);
        self.worker
            .send_event(CaptureEvent::DataReceived { chunk: len, total });

        Ok(Step::Data { len })
    }

    fn on_control_frame(&mut self, frame: ControlFrame) -> Result<()> {
        debug!("Printer command {}: {:02x?}", frame.kind, frame.raw);
        self.summary.control_frames += 1;

        let response = respond(&frame);
        self.worker.send_event(CaptureEvent::ControlFrame {
            kind: frame.kind,
            raw: frame.raw,
        });

        self.device
            .write_all(response)
            .and_then(|()| self.device.flush())
            .map_err(|e| Error::Device(format!("write failed: {}", e)))?;

        debug!("Sent response: {:02x?}", response);
        self.worker.send_event(CaptureEvent::ResponseSent {
            bytes: response.to_vec(),
        });

        // Short accumulations may be a false start; leave them for later
        if !self.accumulator.is_empty()
            && self.accumulator.len() >= self.settings.interrupt_flush_bytes
        {
            self.flush_pending();
        }

        Ok(())
    }

    fn on_empty_read(&mut self, now: Instant) -> Step {
        let buffered = self.accumulator.len();
        if buffered > self.settings.idle_flush_bytes
            && self.accumulator.idle_for(now) > self.settings.idle_timeout
        {
            info!("Transfer complete (timeout), {} bytes buffered", buffered);
            self.worker
                .send_event(CaptureEvent::TransferTimedOut { buffered });
            self.flush_pending();
        }
        Step::Empty
    }

    /// Flush the pending job, reporting rather than propagating store failures
    fn flush_pending(&mut self) {
        match self.accumulator.flush(&mut self.store) {
            Ok(FlushOutcome::Captured(record)) => {
                self.summary.jobs_captured += 1;
                self.summary.bytes_captured += record.byte_length;
                self.worker.send_event(CaptureEvent::JobCaptured { record });
            }
            Ok(FlushOutcome::Discarded { len }) => {
                debug!("Discarded {} bytes below minimum job size", len);
                self.worker.send_event(CaptureEvent::JobDiscarded { len });
            }
            Ok(FlushOutcome::Empty) => {}
            Err(e) => {
                error!("Job lost: {}", e);
                self.worker.send_event(CaptureEvent::PersistFailed {
                    reason: e.to_string(),
                });
            }
        }
    }

    fn finish(&mut self) -> CaptureSummary {
        let buffered = self.accumulator.len();
        if buffered > 0 {
            info!("Saving final data ({} bytes)", buffered);
            self.worker.send_event(CaptureEvent::FinalFlush { buffered });
            self.flush_pending();
        }

        info!(
            "Capture loop stopped: {} job(s), {} bytes",
            self.summary.jobs_captured, self.summary.bytes_captured
        );
        self.worker.send_event(CaptureEvent::Stopped {
            summary: self.summary,
        });
        self.summary
    }
}
