//! Shared job types

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::format::DocumentFormat;

/// Durable record of one captured print job
///
/// Written once by the job store when a document buffer is flushed; the
/// same record is serialized next to the job file as its metadata sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Session-local job number, starting at 1
    pub sequence: u64,
    /// Wall-clock time the job was flushed
    pub timestamp: DateTime<Local>,
    /// Sniffed container format
    pub format: DocumentFormat,
    /// Number of document bytes written
    pub byte_length: u64,
    /// Location of the job file
    pub storage_path: PathBuf,
    /// Leading text of the document, for `Text` jobs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl JobRecord {
    /// Detected file extension, e.g. `.ps`
    pub fn extension(&self) -> &'static str {
        self.format.extension()
    }

    /// Detected format label, e.g. `PostScript`
    pub fn label(&self) -> &'static str {
        self.format.label()
    }

    /// File name component of the storage path
    pub fn file_name(&self) -> String {
        self.storage_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// File name for a job: `job_<sequence>_<YYYYMMDD_HHMMSS><ext>`
    pub fn file_name_for(
        sequence: u64,
        timestamp: &DateTime<Local>,
        format: DocumentFormat,
    ) -> String {
        format!(
            "job_{}_{}{}",
            sequence,
            timestamp.format("%Y%m%d_%H%M%S"),
            format.extension()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_name_pattern() {
        let ts = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            JobRecord::file_name_for(12, &ts, DocumentFormat::PostScript),
            "job_12_20240307_090501.ps"
        );
    }

    #[test]
    fn test_record_json_roundtrip() {
        let ts = Local.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let record = JobRecord {
            sequence: 1,
            timestamp: ts,
            format: DocumentFormat::Xps,
            byte_length: 4096,
            storage_path: PathBuf::from("/tmp/jobs/job_1_20240307_090501.xps"),
            preview: None,
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"format\":\"xps\""));
        assert!(!json.contains("preview"));

        let parsed: JobRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.file_name(), "job_1_20240307_090501.xps");
        assert_eq!(parsed.label(), "XPS");
    }
}
