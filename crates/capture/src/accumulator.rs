//! Pending job buffer

use std::time::{Duration, Instant};

use common::Result;
use protocol::JobRecord;

use crate::store::JobStore;

/// Result of flushing the pending buffer
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing was buffered; no state changed
    Empty,
    /// Buffer was below the minimum job size and was dropped
    Discarded { len: usize },
    /// Buffer was written as a job
    Captured(JobRecord),
}

impl FlushOutcome {
    /// The written record, if any
    pub fn record(&self) -> Option<&JobRecord> {
        match self {
            FlushOutcome::Captured(record) => Some(record),
            _ => None,
        }
    }

    pub fn into_record(self) -> Option<JobRecord> {
        match self {
            FlushOutcome::Captured(record) => Some(record),
            _ => None,
        }
    }
}

/// The single in-flight document
///
/// The buffer is only ever appended to or cleared as a whole, and only
/// [`JobAccumulator::flush`] clears it.
#[derive(Debug)]
pub struct JobAccumulator {
    buffer: Vec<u8>,
    last_activity: Option<Instant>,
    min_job_bytes: usize,
}

impl JobAccumulator {
    /// Create an empty accumulator
    ///
    /// Buffers shorter than `min_job_bytes` are discarded on flush.
    pub fn new(min_job_bytes: usize) -> Self {
        Self {
            buffer: Vec::new(),
            last_activity: None,
            min_job_bytes,
        }
    }

    /// Append a document chunk
    ///
    /// Returns true when this chunk starts a new transfer (the buffer was
    /// empty before).
    pub fn append(&mut self, chunk: &[u8], now: Instant) -> bool {
        let started = self.buffer.is_empty();
        self.buffer.extend_from_slice(chunk);
        self.last_activity = Some(now);
        started
    }

    /// Record channel activity without buffering anything
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    /// Bytes currently buffered
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered bytes
    pub fn data(&self) -> &[u8] {
        &self.buffer
    }

    /// Time since the last channel activity, zero if there was none
    pub fn idle_for(&self, now: Instant) -> Duration {
        self.last_activity
            .map(|at| now.saturating_duration_since(at))
            .unwrap_or_default()
    }

    /// Persist and clear the buffer
    ///
    /// An empty buffer is a no-op. A buffer below the minimum job size is
    /// dropped without touching the store. On a store failure the buffer is
    /// still cleared; those bytes are lost.
    pub fn flush(&mut self, store: &mut JobStore) -> Result<FlushOutcome> {
        if self.buffer.is_empty() {
            return Ok(FlushOutcome::Empty);
        }

        let data = std::mem::take(&mut self.buffer);
        if data.len() < self.min_job_bytes {
            return Ok(FlushOutcome::Discarded { len: data.len() });
        }

        store.persist(&data).map(FlushOutcome::Captured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_marks_transfer_start() {
        let mut acc = JobAccumulator::new(10);
        let now = Instant::now();

        assert!(acc.append(b"%!PS", now));
        assert!(!acc.append(b"-Adobe", now));
        assert_eq!(acc.data(), b"%!PS-Adobe");
    }

    #[test]
    fn test_idle_for() {
        let mut acc = JobAccumulator::new(10);
        let start = Instant::now();
        assert_eq!(acc.idle_for(start), Duration::ZERO);

        acc.touch(start);
        assert_eq!(
            acc.idle_for(start + Duration::from_secs(4)),
            Duration::from_secs(4)
        );
    }

    #[test]
    fn test_flush_empty_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JobStore::new(dir.path());
        let mut acc = JobAccumulator::new(10);

        assert_eq!(acc.flush(&mut store).unwrap(), FlushOutcome::Empty);
        assert_eq!(acc.flush(&mut store).unwrap(), FlushOutcome::Empty);
        assert_eq!(store.next_sequence(), 1);
    }

    #[test]
    fn test_flush_discards_noise() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JobStore::new(dir.path());
        let mut acc = JobAccumulator::new(10);

        acc.append(b"\x1b%-12", Instant::now());
        assert_eq!(
            acc.flush(&mut store).unwrap(),
            FlushOutcome::Discarded { len: 5 }
        );
        assert!(acc.is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
