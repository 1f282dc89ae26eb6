//! Control-frame classification
//!
//! The printer gadget endpoint carries no framing: handshakes and document
//! payload arrive interleaved on the same bulk-OUT stream, one read chunk at a
//! time. A chunk is treated as a control frame only when it is short and made
//! entirely of non-printable bytes; everything else is document data.

use serde::{Deserialize, Serialize};

/// Enquiry (status poll from the host spooler)
pub const ENQ: u8 = 0x05;
/// End of transmission
pub const EOT: u8 = 0x04;
/// Form feed (end-of-page signal)
pub const FORM_FEED: u8 = 0x0C;
/// Acknowledge
pub const ACK: u8 = 0x06;
/// Escape, leading byte of PCL command sequences
pub const ESC: u8 = 0x1B;

/// Chunks longer than this are always document data
pub const MAX_CONTROL_FRAME_LEN: usize = 100;

/// Longest run of unrecognised non-printable bytes still taken as a handshake
pub const MAX_OPAQUE_CONTROL_LEN: usize = 10;

/// Kind of printer-protocol handshake observed on the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    /// Single ENQ status poll
    Enq,
    /// One or two form feeds
    FormFeed,
    /// Single EOT
    Eot,
    /// Short run of other non-printable bytes
    OtherControl,
}

impl std::fmt::Display for ControlKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ControlKind::Enq => "ENQ",
            ControlKind::FormFeed => "FORM_FEED",
            ControlKind::Eot => "EOT",
            ControlKind::OtherControl => "OTHER_CONTROL",
        };
        f.write_str(name)
    }
}

/// A chunk classified as protocol control traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFrame {
    /// Bytes exactly as read from the device
    pub raw: Vec<u8>,
    /// Recognised handshake kind
    pub kind: ControlKind,
}

impl ControlFrame {
    /// Length of the raw frame in bytes
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Control frames are never empty; provided for API symmetry
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Classify one read chunk
///
/// Returns `Some(frame)` when the chunk is a handshake that must be answered
/// and kept out of the document buffer, `None` when it is document data.
pub fn classify(chunk: &[u8]) -> Option<ControlFrame> {
    if chunk.is_empty() || chunk.len() > MAX_CONTROL_FRAME_LEN {
        return None;
    }

    let kind = match chunk {
        [ENQ] => ControlKind::Enq,
        [EOT] => ControlKind::Eot,
        [FORM_FEED] | [FORM_FEED, FORM_FEED] => ControlKind::FormFeed,
        _ if chunk.len() <= MAX_OPAQUE_CONTROL_LEN && chunk.iter().all(|&b| !is_printable(b)) => {
            ControlKind::OtherControl
        }
        _ => return None,
    };

    Some(ControlFrame {
        raw: chunk.to_vec(),
        kind,
    })
}

/// Printable ASCII excluding space (0x21..=0x7E)
fn is_printable(byte: u8) -> bool {
    byte > 0x20 && byte < 0x7F
}
