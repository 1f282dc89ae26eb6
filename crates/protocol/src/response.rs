//! Handshake responses
//!
//! The emulated printer answers every control frame with a single ACK. That is
//! enough to keep the host spooler from marking the port unresponsive; no
//! IEEE 1284 status negotiation is attempted.

use crate::control::{ACK, ControlFrame};

/// Bytes to write back to the host for a classified control frame
pub fn respond(_frame: &ControlFrame) -> &'static [u8] {
    &[ACK]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::ControlKind;

    #[test]
    fn test_every_kind_gets_ack() {
        for kind in [
            ControlKind::Enq,
            ControlKind::FormFeed,
            ControlKind::Eot,
            ControlKind::OtherControl,
        ] {
            let frame = ControlFrame {
                raw: vec![0x00],
                kind,
            };
            assert_eq!(respond(&frame), &[0x06]);
        }
    }
}
