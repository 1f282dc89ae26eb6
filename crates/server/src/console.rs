//! Operator console
//!
//! Prints capture events as line-oriented status messages. Wording is for
//! people; anything machine-readable lives in the job metadata sidecars.

use chrono::Local;
use common::{CaptureBridge, CaptureEvent};

const RULE_WIDTH: usize = 50;

/// Print events until the capture thread exits
pub async fn run(bridge: CaptureBridge) {
    while let Ok(event) = bridge.recv_event().await {
        let stamp = Local::now().format("%H:%M:%S").to_string();
        for line in render(&event, &stamp) {
            println!("{}", line);
        }
    }
}

/// Lines printed for one event
pub fn render(event: &CaptureEvent, stamp: &str) -> Vec<String> {
    match event {
        CaptureEvent::TransferStarted => {
            vec![format!("[{}] Document transfer starting...", stamp)]
        }
        CaptureEvent::DataReceived { chunk, total } => {
            vec![format!("[{}] +{} bytes, total: {}", stamp, chunk, total)]
        }
        CaptureEvent::ControlFrame { kind, raw } => vec![format!(
            "[{}] Printer command: {} {:02x?} ({} bytes)",
            stamp,
            kind,
            raw,
            raw.len()
        )],
        CaptureEvent::ResponseSent { bytes } => {
            vec![format!("[{}] Sent response: {:02x?}", stamp, bytes)]
        }
        CaptureEvent::TransferTimedOut { .. } => {
            vec![format!("[{}] Transfer complete (timeout)", stamp)]
        }
        CaptureEvent::JobCaptured { record } => {
            let mut lines = vec![
                String::new(),
                format!("\u{2713} CAPTURED JOB #{}", record.sequence),
                format!("  File: {}", record.file_name()),
                format!("  Type: {}", record.label()),
                format!("  Size: {} bytes", record.byte_length),
                format!("  Path: {}", record.storage_path.display()),
            ];
            if let Some(preview) = &record.preview {
                lines.push(format!("  Preview: {}...", preview));
            }
            let conversions = record.format.conversion_targets();
            if !conversions.is_empty() {
                let targets: Vec<String> = conversions.iter().map(|t| t.to_string()).collect();
                lines.push(format!("  Convertible to: {}", targets.join(", ")));
            }
            lines.push("=".repeat(RULE_WIDTH));
            lines
        }
        CaptureEvent::JobDiscarded { len } => {
            vec![format!("[{}] Discarded {} stray bytes", stamp, len)]
        }
        CaptureEvent::PersistFailed { reason } => {
            vec![format!("[{}] Failed to save job: {}", stamp, reason)]
        }
        CaptureEvent::FinalFlush { .. } => vec![format!("[{}] Saving final data", stamp)],
        CaptureEvent::Stopped { summary } => vec![format!(
            "[{}] Printer capture stopped ({} job(s), {} bytes)",
            stamp, summary.jobs_captured, summary.bytes_captured
        )],
    }
}
