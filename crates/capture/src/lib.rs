//! Print-job capture engine
//!
//! Drives a non-blocking printer gadget channel: answers handshakes,
//! accumulates document bytes into a single pending job, and persists the
//! job when the host signals a page end or goes quiet.
//!
//! The engine is single threaded. It owns the device and the pending buffer
//! for its whole lifetime and only talks to the outside world through a
//! [`common::CaptureWorker`].

pub mod accumulator;
pub mod engine;
pub mod store;

pub use accumulator::{FlushOutcome, JobAccumulator};
pub use engine::{CaptureEngine, EngineSettings, Step};
pub use store::{JobStore, StoredJob, list_jobs, parse_job_file_name, sniff_file};
