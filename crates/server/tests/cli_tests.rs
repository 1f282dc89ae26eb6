//! Command-line tests for usb-printer-capture
//!
//! Runs the built binary for the offline modes and the startup
//! precondition check. Capturing from a real gadget is not exercised here.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::tempdir;

fn run(args: &[&str], config_dir: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_usb-printer-capture"))
        .args(args)
        .env("XDG_CONFIG_HOME", config_dir)
        .env("HOME", config_dir)
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to run binary")
}

mod offline {
    use super::*;

    #[test]
    fn test_sniff_reports_format() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("job_1_20240101_120000.bin");
        std::fs::write(&file, b"%!PS-Adobe-3.0\nshowpage\n").unwrap();

        let output = run(&["--sniff", file.to_str().unwrap()], dir.path());
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("PostScript (.ps)"));
    }

    #[test]
    fn test_list_jobs() {
        let dir = tempdir().unwrap();
        let jobs = dir.path().join("jobs");
        std::fs::create_dir(&jobs).unwrap();
        std::fs::write(jobs.join("job_2_20240101_120500.xps"), b"PK\x03\x04[Content_Types].xml").unwrap();
        std::fs::write(jobs.join("job_1_20240101_120000.ps"), b"%!PS-Adobe-3.0\n").unwrap();
        std::fs::write(jobs.join("job_1_20240101_120000.ps.json"), b"{}").unwrap();

        let output = run(
            &["--list-jobs", "--capture-dir", jobs.to_str().unwrap()],
            dir.path(),
        );
        assert!(output.status.success());

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Found 2 captured job(s)"));
        let first = stdout.find("[1]").unwrap();
        let second = stdout.find("[2]").unwrap();
        assert!(first < second);
        assert!(stdout.contains("convert: pdf, png, txt"));
        assert!(stdout.contains("XPS"));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let dir = tempdir().unwrap();
        let output = run(&["--list-jobs", "--log-level", "loud"], dir.path());
        assert!(!output.status.success());
    }
}

mod startup {
    use super::*;

    #[test]
    fn test_missing_device_is_fatal() {
        let dir = tempdir().unwrap();
        let device = dir.path().join("g_printer_missing");
        let config = dir.path().join("capture.toml");
        std::fs::write(
            &config,
            format!(
                "[server]\nrequire_root = false\n\n[capture]\ndevice = \"{}\"\ncapture_dir = \"{}\"\n",
                device.display(),
                dir.path().join("jobs").display()
            ),
        )
        .unwrap();

        let output = run(&["--config", config.to_str().unwrap()], dir.path());

        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Printer gadget unavailable"));
        assert!(stderr.contains("Device not found"));
        assert!(!dir.path().join("jobs").exists());
    }
}
