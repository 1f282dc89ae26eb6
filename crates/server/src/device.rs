//! Printer gadget device access
//!
//! The gadget node (usually `/dev/g_printer0`) is opened read-write and
//! non-blocking; the capture loop polls it and sleeps between empty reads.

use common::{Error, Result};
use nix::fcntl::OFlag;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::os::unix::fs::{FileTypeExt, OpenOptionsExt};
use std::path::Path;
use tracing::{info, warn};

/// Check that the device can be opened before starting capture
pub fn check_preconditions(path: &Path, require_root: bool) -> Result<()> {
    if require_root && !nix::unistd::geteuid().is_root() {
        return Err(Error::PermissionDenied(
            "must run as root to open the printer gadget".to_string(),
        ));
    }

    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(Error::DeviceNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(Error::Io(e)),
    };

    if !metadata.file_type().is_char_device() {
        warn!(
            "{} is not a character device; is the printer gadget loaded?",
            path.display()
        );
    }

    Ok(())
}

/// Open the printer gadget for non-blocking bidirectional I/O
pub fn open_printer(path: &Path) -> Result<File> {
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(OFlag::O_NONBLOCK.bits())
        .open(path)
        .map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::DeviceNotFound(path.to_path_buf()),
            ErrorKind::PermissionDenied => {
                Error::PermissionDenied(format!("cannot open {}: {}", path.display(), e))
            }
            _ => Error::Device(format!("cannot open {}: {}", path.display(), e)),
        })?;

    info!("Device opened in bidirectional mode: {}", path.display());
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn test_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("g_printer0");

        let err = check_preconditions(&path, false).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(_)));

        let err = open_printer(&path).unwrap_err();
        assert!(matches!(err, Error::DeviceNotFound(_)));
    }

    #[test]
    fn test_open_regular_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake_printer");
        std::fs::write(&path, b"\x05").unwrap();

        assert!(check_preconditions(&path, false).is_ok());

        let mut file = open_printer(&path).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(file.read(&mut buf).unwrap(), 1);
        file.write_all(b"\x06").unwrap();
    }
}
