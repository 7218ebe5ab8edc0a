//! JSON output for job results and catalogue listings.

use serde::Serialize;

use crate::catalog::FileRecord;
use crate::engine::JobResult;

pub fn render(results: &[JobResult]) -> String {
    to_json(results)
}

pub fn render_records(records: &[FileRecord]) -> String {
    to_json(records)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn digests_render_as_hex() {
        let record = FileRecord {
            source_path: PathBuf::from("/src/a.txt"),
            dest_path: PathBuf::from("/dst/a.txt"),
            file_name: "a.txt".into(),
            modified_ns: 5,
            content_hash: Some(vec![0xab, 0xcd]),
        };

        let value: serde_json::Value = serde_json::from_str(&render_records(&[record])).unwrap();
        assert_eq!(value[0]["content_hash"], "abcd");
        assert_eq!(value[0]["file_name"], "a.txt");
    }

    #[test]
    fn records_without_digest_omit_the_field() {
        let record = FileRecord {
            source_path: PathBuf::from("/src/a.txt"),
            dest_path: PathBuf::from("/dst/a.txt"),
            file_name: "a.txt".into(),
            modified_ns: 5,
            content_hash: None,
        };

        let value: serde_json::Value = serde_json::from_str(&render_records(&[record])).unwrap();
        assert!(value[0].get("content_hash").is_none());
    }
}
