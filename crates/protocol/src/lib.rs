//! Printer-channel protocol library for usb-printer-capture
//!
//! This crate holds the byte-level rules shared by the capture engine and the
//! command-line tools: telling printer handshakes apart from document data,
//! answering those handshakes, and sniffing the container format of a
//! captured document.
//!
//! # Example
//!
//! ```
//! use protocol::{ControlKind, DocumentFormat, classify, detect, respond};
//!
//! // A lone ENQ is a status poll, answered with ACK
//! let frame = classify(b"\x05").unwrap();
//! assert_eq!(frame.kind, ControlKind::Enq);
//! assert_eq!(respond(&frame), b"\x06");
//!
//! // Document payloads are identified by their leading signature
//! assert_eq!(detect(b"%PDF-1.7\n"), DocumentFormat::Pdf);
//! ```

pub mod control;
pub mod format;
pub mod response;
pub mod types;

pub use control::{
    ACK, ControlFrame, ControlKind, ENQ, EOT, ESC, FORM_FEED, MAX_CONTROL_FRAME_LEN,
    MAX_OPAQUE_CONTROL_LEN, classify,
};
pub use format::{
    ConversionTarget, DocumentFormat, SNIFF_WINDOW, detect, text_preview,
};
pub use response::respond;
pub use types::JobRecord;
