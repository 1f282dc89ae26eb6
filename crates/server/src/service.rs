//! Systemd service integration
//!
//! Minimal sd-notify support so the capture daemon can run as a
//! `Type=notify` unit with an optional watchdog.

use anyhow::{Context, Result};
use std::env;
use std::os::unix::net::UnixDatagram;
use tracing::{debug, error, info};

/// Send one sd-notify datagram; a no-op outside systemd
fn notify(message: &str) -> Result<()> {
    let Ok(socket_path) = env::var("NOTIFY_SOCKET") else {
        debug!("NOTIFY_SOCKET not set, skipping systemd notification");
        return Ok(());
    };

    let socket = UnixDatagram::unbound().context("Failed to create Unix socket")?;
    socket
        .send_to(message.as_bytes(), &socket_path)
        .with_context(|| format!("Failed to send {} to systemd", message))?;
    debug!("Notified systemd: {}", message);
    Ok(())
}

/// Capture loop is running
pub fn notify_ready() -> Result<()> {
    notify("READY=1")?;
    if is_systemd() {
        info!("Notified systemd: service ready");
    }
    Ok(())
}

/// Shutdown has begun
pub fn notify_stopping() -> Result<()> {
    notify("STOPPING=1")
}

/// Status line shown by `systemctl status`
pub fn notify_status(status: &str) -> Result<()> {
    notify(&format!("STATUS={}", status))
}

/// Watchdog timeout configured by systemd, in microseconds
pub fn get_watchdog_timeout() -> Option<u64> {
    env::var("WATCHDOG_USEC").ok().and_then(|s| s.parse().ok())
}

/// Check if running under systemd
pub fn is_systemd() -> bool {
    env::var("NOTIFY_SOCKET").is_ok()
}

/// Spawn a task sending WATCHDOG=1 at half the configured interval
///
/// Returns `None` when the watchdog is not enabled.
pub fn spawn_watchdog_task() -> Option<tokio::task::JoinHandle<()>> {
    let timeout_usec = get_watchdog_timeout()?;
    let interval = std::time::Duration::from_micros(timeout_usec / 2)
        .max(std::time::Duration::from_secs(1));

    info!("Systemd watchdog enabled, interval: {}s", interval.as_secs());

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            if let Err(e) = notify("WATCHDOG=1") {
                error!("Failed to send watchdog keepalive: {:#}", e);
            }
        }
    }))
}
