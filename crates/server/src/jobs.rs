//! Offline inspection of captured jobs

use anyhow::{Context, Result};
use capture::{StoredJob, list_jobs, sniff_file};
use std::path::Path;

/// Print the jobs stored in the capture directory
pub fn list_jobs_mode(dir: &Path) -> Result<()> {
    if !dir.exists() {
        println!("No captured jobs ({} does not exist).", dir.display());
        return Ok(());
    }

    let jobs = list_jobs(dir)
        .with_context(|| format!("Failed to list capture directory: {}", dir.display()))?;

    if jobs.is_empty() {
        println!("No captured jobs in {}.", dir.display());
        return Ok(());
    }

    println!("Found {} captured job(s) in {}:\n", jobs.len(), dir.display());
    for job in &jobs {
        println!("{}", describe(job));
    }

    Ok(())
}

/// Print the sniffed format of a single file
pub fn sniff_mode(path: &Path) -> Result<()> {
    let format = sniff_file(path).with_context(|| format!("Failed to read {}", path.display()))?;
    println!(
        "{}: {} ({})",
        path.display(),
        format.label(),
        format.extension()
    );
    Ok(())
}

fn describe(job: &StoredJob) -> String {
    let targets: Vec<String> = job
        .format
        .conversion_targets()
        .iter()
        .map(|t| t.to_string())
        .collect();
    let conversions = if targets.is_empty() {
        "-".to_string()
    } else {
        targets.join(", ")
    };

    format!(
        "  [{}] {}  {}  {} bytes  {}  convert: {}",
        job.sequence,
        job.timestamp.format("%Y-%m-%d %H:%M:%S"),
        job.format.label(),
        job.size,
        job.file_name(),
        conversions
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use protocol::DocumentFormat;
    use std::path::PathBuf;

    #[test]
    fn test_describe() {
        let job = StoredJob {
            sequence: 4,
            timestamp: NaiveDate::from_ymd_opt(2024, 2, 29)
                .unwrap()
                .and_hms_opt(23, 59, 58)
                .unwrap(),
            path: PathBuf::from("/jobs/job_4_20240229_235958.pcl"),
            size: 2048,
            format: DocumentFormat::Pcl,
        };

        assert_eq!(
            describe(&job),
            "  [4] 2024-02-29 23:59:58  PCL  2048 bytes  job_4_20240229_235958.pcl  convert: pdf, txt"
        );
    }

    #[test]
    fn test_list_missing_dir_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_jobs_mode(&dir.path().join("absent")).is_ok());
    }
}
