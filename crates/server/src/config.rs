//! Capture server configuration management

use anyhow::{Context, Result, anyhow};
use capture::EngineSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub capture: CaptureSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_log_level")]
    pub log_level: String,
    /// Headless mode with systemd notifications
    #[serde(default)]
    pub service_mode: bool,
    /// Refuse to start unless running as root
    #[serde(default = "ServerSettings::default_require_root")]
    pub require_root: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            log_level: Self::default_log_level(),
            service_mode: false,
            require_root: Self::default_require_root(),
        }
    }
}

impl ServerSettings {
    fn default_log_level() -> String {
        "info".to_string()
    }

    fn default_require_root() -> bool {
        true
    }
}

/// Capture engine configuration
///
/// # Example Configuration
/// ```toml
/// [capture]
/// device = "/dev/g_printer0"
/// capture_dir = "~/captured_print_jobs"
/// idle_timeout_ms = 5000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Printer gadget character device
    #[serde(default = "CaptureSettings::default_device")]
    pub device: PathBuf,
    /// Directory job files are written to (`~` is expanded)
    #[serde(default = "CaptureSettings::default_capture_dir")]
    pub capture_dir: String,
    /// Bytes requested per device read
    #[serde(default = "CaptureSettings::default_read_buffer_size")]
    pub read_buffer_size: usize,
    /// Sleep between empty reads
    #[serde(default = "CaptureSettings::default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Host silence that completes a job
    #[serde(default = "CaptureSettings::default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
    /// Smaller buffers are dropped as noise
    #[serde(default = "CaptureSettings::default_min_job_bytes")]
    pub min_job_bytes: usize,
    /// Buffered bytes needed before a control frame ends the job
    #[serde(default = "CaptureSettings::default_flush_bytes")]
    pub interrupt_flush_bytes: usize,
    /// Buffered bytes needed before the idle timeout ends the job
    #[serde(default = "CaptureSettings::default_flush_bytes")]
    pub idle_flush_bytes: usize,
    /// Write a JSON sidecar next to every job file
    #[serde(default = "CaptureSettings::default_write_metadata")]
    pub write_metadata: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device: Self::default_device(),
            capture_dir: Self::default_capture_dir(),
            read_buffer_size: Self::default_read_buffer_size(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            idle_timeout_ms: Self::default_idle_timeout_ms(),
            min_job_bytes: Self::default_min_job_bytes(),
            interrupt_flush_bytes: Self::default_flush_bytes(),
            idle_flush_bytes: Self::default_flush_bytes(),
            write_metadata: Self::default_write_metadata(),
        }
    }
}

impl CaptureSettings {
    fn default_device() -> PathBuf {
        PathBuf::from("/dev/g_printer0")
    }

    fn default_capture_dir() -> String {
        "captured_print_jobs".to_string()
    }

    fn default_read_buffer_size() -> usize {
        4096
    }

    fn default_poll_interval_ms() -> u64 {
        100
    }

    fn default_idle_timeout_ms() -> u64 {
        3000
    }

    fn default_min_job_bytes() -> usize {
        10
    }

    fn default_flush_bytes() -> usize {
        50
    }

    fn default_write_metadata() -> bool {
        true
    }
}

impl ServerConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usb-printer-capture/capture.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ServerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usb-printer-capture").join("capture.toml")
        } else {
            PathBuf::from(".config/usb-printer-capture/capture.toml")
        }
    }

    /// Capture directory with `~` expanded
    pub fn capture_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.capture.capture_dir).as_ref())
    }

    /// Engine tunables derived from the `[capture]` section
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            read_buffer_size: self.capture.read_buffer_size,
            poll_interval: Duration::from_millis(self.capture.poll_interval_ms),
            idle_timeout: Duration::from_millis(self.capture.idle_timeout_ms),
            min_job_bytes: self.capture.min_job_bytes,
            interrupt_flush_bytes: self.capture.interrupt_flush_bytes,
            idle_flush_bytes: self.capture.idle_flush_bytes,
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.server.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.server.log_level,
                valid_levels.join(", ")
            ));
        }

        let capture = &self.capture;
        if capture.device.as_os_str().is_empty() {
            return Err(anyhow!("Device path must not be empty"));
        }
        if capture.capture_dir.trim().is_empty() {
            return Err(anyhow!("Capture directory must not be empty"));
        }
        if capture.read_buffer_size == 0 {
            return Err(anyhow!("read_buffer_size must be greater than 0"));
        }
        if capture.poll_interval_ms == 0 {
            return Err(anyhow!("poll_interval_ms must be greater than 0"));
        }
        if capture.idle_timeout_ms == 0 {
            return Err(anyhow!("idle_timeout_ms must be greater than 0"));
        }
        if capture.min_job_bytes > capture.interrupt_flush_bytes
            || capture.min_job_bytes > capture.idle_flush_bytes
        {
            return Err(anyhow!(
                "min_job_bytes ({}) must not exceed interrupt_flush_bytes ({}) or idle_flush_bytes ({})",
                capture.min_job_bytes,
                capture.interrupt_flush_bytes,
                capture.idle_flush_bytes
            ));
        }

        Ok(())
    }
}
