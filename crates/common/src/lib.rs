//! Common utilities for usb-printer-capture
//!
//! This crate provides functionality shared by the capture engine and the
//! server binary: error handling, logging setup, the channel bridge between
//! the async runtime and the blocking capture thread, and test utilities.

pub mod channel;
pub mod error;
pub mod logging;
pub mod test_utils;

pub use channel::{
    CaptureBridge, CaptureCommand, CaptureEvent, CaptureSummary, CaptureWorker,
    create_capture_bridge,
};
pub use error::{Error, Result};
pub use logging::setup_logging;
