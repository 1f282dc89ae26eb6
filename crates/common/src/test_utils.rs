//! Test utilities for usb-printer-capture
//!
//! Provides a scripted stand-in for the printer gadget endpoint and helpers
//! for building document payloads.
//!
//! # Example
//!
//! ```
//! use common::test_utils::MockDevice;
//! use std::io::{ErrorKind, Read, Write};
//!
//! let mut device = MockDevice::new().with_chunk(b"\x05").with_would_block();
//! let writes = device.write_log();
//!
//! let mut buf = [0u8; 16];
//! assert_eq!(device.read(&mut buf).unwrap(), 1);
//! assert_eq!(device.read(&mut buf).unwrap_err().kind(), ErrorKind::WouldBlock);
//!
//! device.write_all(b"\x06").unwrap();
//! assert_eq!(writes.lock().unwrap().concat(), b"\x06");
//! ```

use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex};

/// Shared record of every buffer written to a [`MockDevice`]
pub type WriteLog = Arc<Mutex<Vec<Vec<u8>>>>;

/// One scripted outcome of a device read
#[derive(Debug, Clone)]
pub enum ReadStep {
    /// Read returns these bytes
    Chunk(Vec<u8>),
    /// Read fails with `WouldBlock`
    WouldBlock,
    /// Read fails with the given error kind
    Fail(ErrorKind),
}

/// Scripted non-blocking device channel
///
/// Reads follow the script; once it is exhausted every read would block.
/// Writes are appended to a shared log that outlives the device.
#[derive(Debug, Default)]
pub struct MockDevice {
    script: VecDeque<ReadStep>,
    writes: WriteLog,
    fail_writes: bool,
}

impl MockDevice {
    /// Create a device with an empty script
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a chunk to be returned by the next read
    pub fn with_chunk(mut self, chunk: &[u8]) -> Self {
        self.script.push_back(ReadStep::Chunk(chunk.to_vec()));
        self
    }

    /// Queue an empty (would-block) read
    pub fn with_would_block(mut self) -> Self {
        self.script.push_back(ReadStep::WouldBlock);
        self
    }

    /// Queue a failing read
    pub fn with_read_error(mut self, kind: ErrorKind) -> Self {
        self.script.push_back(ReadStep::Fail(kind));
        self
    }

    /// Make every write fail with `BrokenPipe`
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Handle to the write log
    pub fn write_log(&self) -> WriteLog {
        Arc::clone(&self.writes)
    }

    /// Number of scripted reads not yet consumed
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl Read for MockDevice {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.script.pop_front() {
            Some(ReadStep::Chunk(mut chunk)) => {
                if chunk.len() > buf.len() {
                    let rest = chunk.split_off(buf.len());
                    self.script.push_front(ReadStep::Chunk(rest));
                }
                buf[..chunk.len()].copy_from_slice(&chunk);
                Ok(chunk.len())
            }
            Some(ReadStep::Fail(kind)) => Err(io::Error::new(kind, "scripted read failure")),
            Some(ReadStep::WouldBlock) | None => Err(io::Error::from(ErrorKind::WouldBlock)),
        }
    }
}

impl Write for MockDevice {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail_writes {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "scripted write failure"));
        }
        self.writes
            .lock()
            .map_err(|_| io::Error::other("write log poisoned"))?
            .push(buf.to_vec());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Build a document of exactly `len` bytes starting with `header`
///
/// The remainder is filled with printable ASCII.
pub fn document(header: &[u8], len: usize) -> Vec<u8> {
    let mut data = header.to_vec();
    let mut fill = b"abcdefghijklmnopqrstuvwxyz0123456789\n".iter().cycle();
    while data.len() < len {
        data.push(*fill.next().unwrap_or(&b'x'));
    }
    data.truncate(len);
    data
}

/// PostScript document of `len` bytes
pub fn postscript_document(len: usize) -> Vec<u8> {
    document(b"%!PS-Adobe-3.0\n", len)
}

/// Minimal XPS-looking ZIP container of `len` bytes
pub fn xps_document(len: usize) -> Vec<u8> {
    document(b"PK\x03\x04\x14\x00\x00\x00[Content_Types].xml", len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_split_across_reads() {
        let mut device = MockDevice::new().with_chunk(b"abcdef");
        let mut buf = [0u8; 4];
        assert_eq!(device.read(&mut buf).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(device.read(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(device.remaining(), 0);
    }

    #[test]
    fn test_document_length() {
        let doc = postscript_document(200);
        assert_eq!(doc.len(), 200);
        assert!(doc.starts_with(b"%!PS"));

        let short = document(b"%PDF-1.7", 4);
        assert_eq!(short, b"%PDF");
    }

    #[test]
    fn test_failing_writes() {
        let mut device = MockDevice::new().with_failing_writes();
        let err = device.write_all(b"\x06").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BrokenPipe);
        assert!(device.write_log().lock().unwrap().is_empty());
    }
}
