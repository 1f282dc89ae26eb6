//! Job persistence and capture directory listing
//!
//! Jobs are written as `job_<sequence>_<YYYYMMDD_HHMMSS><ext>` with an
//! optional `<job file>.json` sidecar holding the serialized [`JobRecord`].

use chrono::{DateTime, Local, NaiveDateTime};
use common::{Error, Result};
use protocol::{DocumentFormat, JobRecord, SNIFF_WINDOW, detect, text_preview};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const SIDECAR_SUFFIX: &str = ".json";

/// Writes flushed jobs into the capture directory
#[derive(Debug)]
pub struct JobStore {
    dir: PathBuf,
    next_sequence: u64,
    write_metadata: bool,
}

impl JobStore {
    /// Create a store rooted at `dir`
    ///
    /// The directory is created lazily on the first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            next_sequence: 1,
            write_metadata: false,
        }
    }

    /// Create a store and make sure its directory exists
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self::new(dir);
        store.ensure_dir()?;
        Ok(store)
    }

    /// Enable or disable metadata sidecars
    pub fn with_metadata(mut self, enabled: bool) -> Self {
        self.write_metadata = enabled;
        self
    }

    /// Capture directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Sequence number the next job will get
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    /// Sniff, name and write one job, stamped with the current local time
    pub fn persist(&mut self, data: &[u8]) -> Result<JobRecord> {
        self.persist_at(data, Local::now())
    }

    /// Sniff, name and write one job with an explicit timestamp
    ///
    /// The sequence number is only consumed when the job file is written.
    pub fn persist_at(&mut self, data: &[u8], timestamp: DateTime<Local>) -> Result<JobRecord> {
        self.ensure_dir()?;

        let format = detect(data);
        let file_name = JobRecord::file_name_for(self.next_sequence, &timestamp, format);
        let path = self.dir.join(&file_name);

        fs::write(&path, data).map_err(|source| Error::Persist {
            path: path.clone(),
            source,
        })?;

        let record = JobRecord {
            sequence: self.next_sequence,
            timestamp,
            format,
            byte_length: data.len() as u64,
            storage_path: path,
            preview: match format {
                DocumentFormat::Text => text_preview(data),
                _ => None,
            },
        };
        self.next_sequence += 1;

        if self.write_metadata {
            // The job file is already on disk; a missing sidecar is not fatal
            if let Err(e) = write_sidecar(&record) {
                warn!("Failed to write metadata for {}: {}", file_name, e);
            }
        }

        info!(
            "Captured job #{} ({}, {} bytes) -> {}",
            record.sequence,
            record.label(),
            record.byte_length,
            record.storage_path.display()
        );
        Ok(record)
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir).map_err(|source| Error::Persist {
            path: self.dir.clone(),
            source,
        })
    }
}

fn sidecar_path(job_path: &Path) -> PathBuf {
    let mut name = job_path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn write_sidecar(record: &JobRecord) -> Result<()> {
    let path = sidecar_path(&record.storage_path);
    let json = serde_json::to_vec_pretty(record)
        .map_err(|e| Error::Io(std::io::Error::other(e)))?;
    fs::write(&path, json).map_err(|source| Error::Persist { path, source })
}

/// A job file found in the capture directory
#[derive(Debug, Clone, PartialEq)]
pub struct StoredJob {
    pub sequence: u64,
    pub timestamp: NaiveDateTime,
    pub path: PathBuf,
    pub size: u64,
    /// Format sniffed from the file contents, not the extension
    pub format: DocumentFormat,
}

impl StoredJob {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Parse `job_<sequence>_<YYYYMMDD_HHMMSS><ext>` into sequence and timestamp
///
/// Metadata sidecars and unrelated files yield `None`.
pub fn parse_job_file_name(name: &str) -> Option<(u64, NaiveDateTime)> {
    if name.ends_with(SIDECAR_SUFFIX) {
        return None;
    }

    let rest = name.strip_prefix("job_")?;
    let (sequence, rest) = rest.split_once('_')?;
    let sequence = sequence.parse().ok()?;

    let stamp = rest.get(..15)?;
    let ext = rest.get(15..)?;
    if !ext.starts_with('.') {
        return None;
    }

    let timestamp = NaiveDateTime::parse_from_str(stamp, "%Y%m%d_%H%M%S").ok()?;
    Some((sequence, timestamp))
}

/// Sniff the format of a file from its leading bytes
pub fn sniff_file(path: &Path) -> Result<DocumentFormat> {
    let file = fs::File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_WINDOW);
    file.take(SNIFF_WINDOW as u64).read_to_end(&mut head)?;
    Ok(detect(&head))
}

/// List captured jobs in `dir`, ordered by sequence number
pub fn list_jobs(dir: &Path) -> Result<Vec<StoredJob>> {
    let mut jobs = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some((sequence, timestamp)) = parse_job_file_name(&name.to_string_lossy()) else {
            continue;
        };

        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }

        let path = entry.path();
        let format = match sniff_file(&path) {
            Ok(format) => format,
            Err(e) => {
                debug!("Skipping unreadable job {}: {}", path.display(), e);
                continue;
            }
        };

        jobs.push(StoredJob {
            sequence,
            timestamp,
            path,
            size: metadata.len(),
            format,
        });
    }

    jobs.sort_by(|a, b| {
        a.sequence
            .cmp(&b.sequence)
            .then(a.timestamp.cmp(&b.timestamp))
    });
    Ok(jobs)
}
