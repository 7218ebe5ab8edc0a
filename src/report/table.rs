//! Plain text rendering for job results and catalogue listings.

use crate::catalog::FileRecord;
use crate::engine::JobResult;
use crate::util::format_bytes;

pub fn render(results: &[JobResult]) -> String {
    if results.is_empty() {
        return String::from("No jobs to run.\n");
    }

    let mut output = String::new();

    output.push_str(&format!(
        "{:<20} {:>7} {:>7} {:>9} {:>7} {:>10} {:>8}  {}\n",
        "Job", "Added", "Updated", "Unchanged", "Deleted", "Copied", "Time", "Status"
    ));
    output.push_str(&"-".repeat(88));
    output.push('\n');

    for result in results {
        let status = if result.is_success() { "ok" } else { "FAILED" };
        output.push_str(&format!(
            "{:<20} {:>7} {:>7} {:>9} {:>7} {:>10} {:>7.2}s  {}\n",
            truncate(&result.job, 20),
            result.added,
            result.updated,
            result.unchanged,
            result.deleted,
            format_bytes(result.bytes_copied),
            result.duration_ms as f64 / 1000.0,
            status
        ));
    }

    output
}

pub fn render_records(records: &[FileRecord]) -> String {
    if records.is_empty() {
        return String::from("No files catalogued.\n");
    }

    let mut output = String::new();

    for record in records {
        let modified = chrono::DateTime::from_timestamp(
            record.modified_ns.div_euclid(1_000_000_000),
            record.modified_ns.rem_euclid(1_000_000_000) as u32,
        )
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "unknown".to_string());

        let digest = record
            .content_hash
            .as_deref()
            .map(hex::encode)
            .unwrap_or_else(|| "-".to_string());

        output.push_str(&format!(
            "{:<19}  {:<32}  {} -> {}\n",
            modified,
            digest,
            record.source_path.display(),
            record.dest_path.display()
        ));
    }

    output.push_str(&format!("\n{} files catalogued\n", records.len()));
    output
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn long_names_are_truncated() {
        assert_eq!(truncate("short", 20), "short");
        assert_eq!(truncate("a-very-long-profile-name-indeed", 10), "a-very-...");
    }

    #[test]
    fn record_listing_shows_time_and_digest() {
        let record = FileRecord {
            source_path: PathBuf::from("/src/a.txt"),
            dest_path: PathBuf::from("/dst/a.txt"),
            file_name: "a.txt".into(),
            modified_ns: 0,
            content_hash: Some(vec![0x01, 0xff]),
        };

        let rendered = render_records(&[record]);
        assert!(rendered.contains("1970-01-01 00:00:00"));
        assert!(rendered.contains("01ff"));
        assert!(rendered.contains("/src/a.txt -> /dst/a.txt"));
        assert!(rendered.contains("1 files catalogued"));
    }

    #[test]
    fn empty_listing_says_so() {
        assert_eq!(render_records(&[]), "No files catalogued.\n");
        assert_eq!(render(&[]), "No jobs to run.\n");
    }
}
