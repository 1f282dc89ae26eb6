//! Common error types

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Device not found: {}", .0.display())]
    DeviceNotFound(PathBuf),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Device error: {0}")]
    Device(String),

    #[error("Failed to persist job to {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::DeviceNotFound(PathBuf::from("/dev/g_printer0"));
        assert_eq!(err.to_string(), "Device not found: /dev/g_printer0");

        let err = Error::Persist {
            path: PathBuf::from("/captures/job_1_20240101_000000.pdf"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let msg = err.to_string();
        assert!(msg.contains("Failed to persist job"));
        assert!(msg.contains("job_1_20240101_000000.pdf"));
    }
}
