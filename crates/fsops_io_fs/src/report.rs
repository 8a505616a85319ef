//! Per-call report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;

/// Counters and advisory warnings for one successful operation.
///
/// Primary failures are returned as [`crate::FsOpError`]; anything recorded
/// here did not fail the call.
#[derive(Debug, Default, Clone)]
pub struct ReportFsOp {
    /// Number of regular files whose bytes were copied.
    pub cnt_files_copied: u64,
    /// Number of destination directories created.
    pub cnt_dirs_created: u64,
    /// Total bytes written to destination files.
    pub cnt_bytes_copied: u64,
    /// Number of filesystem entries removed.
    pub cnt_deleted: u64,
    /// Number of entries skipped by filter or symlink policy.
    pub cnt_skipped: u64,
    /// `true` when a delete found nothing to remove.
    pub if_target_missing: bool,
    /// Non-fatal warnings (timestamp/attribute preservation, skipped entries).
    pub warnings: Vec<String>,
}

impl ReportFsOp {
    /// Number of collected warnings.
    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_files_copied".to_string(), self.cnt_files_copied);
        dict_counts.insert("cnt_dirs_created".to_string(), self.cnt_dirs_created);
        dict_counts.insert("cnt_bytes_copied".to_string(), self.cnt_bytes_copied);
        dict_counts.insert("cnt_deleted".to_string(), self.cnt_deleted);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts.insert("cnt_warnings".to_string(), self.warning_count() as u64);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} files={} dirs={} bytes={} deleted={} skipped={} warnings={}",
            dict_counts["cnt_files_copied"],
            dict_counts["cnt_dirs_created"],
            dict_counts["cnt_bytes_copied"],
            dict_counts["cnt_deleted"],
            dict_counts["cnt_skipped"],
            dict_counts["cnt_warnings"]
        )
    }
}

impl fmt::Display for ReportFsOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[FS]"))
    }
}

/// Mutable accumulator threaded through recursive operations.
#[derive(Debug, Default, Clone)]
pub struct ReportFsOpBuilder {
    report: ReportFsOp,
}

impl ReportFsOpBuilder {
    pub fn add_file_copied(&mut self, n_bytes: u64) {
        self.report.cnt_files_copied += 1;
        self.report.cnt_bytes_copied = self.report.cnt_bytes_copied.saturating_add(n_bytes);
    }

    pub fn add_dir_created(&mut self) {
        self.report.cnt_dirs_created += 1;
    }

    pub fn add_deleted(&mut self) {
        self.report.cnt_deleted += 1;
    }

    pub fn add_skipped(&mut self) {
        self.report.cnt_skipped += 1;
    }

    pub fn mark_target_missing(&mut self) {
        self.report.if_target_missing = true;
    }

    /// Record an advisory failure and emit it on the `log` facade.
    pub fn add_warning(&mut self, warning: String) {
        log::warn!("{warning}");
        self.report.warnings.push(warning);
    }

    /// Fold a finished sub-report into this one.
    pub fn merge(&mut self, other: ReportFsOp) {
        self.report.cnt_files_copied += other.cnt_files_copied;
        self.report.cnt_dirs_created += other.cnt_dirs_created;
        self.report.cnt_bytes_copied = self
            .report
            .cnt_bytes_copied
            .saturating_add(other.cnt_bytes_copied);
        self.report.cnt_deleted += other.cnt_deleted;
        self.report.cnt_skipped += other.cnt_skipped;
        self.report.warnings.extend(other.warnings);
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportFsOp {
        self.report
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportFsOp, ReportFsOpBuilder};

    #[test]
    fn report_to_dict_and_format_are_consistent() {
        let report = ReportFsOp {
            cnt_files_copied: 3,
            cnt_dirs_created: 2,
            cnt_bytes_copied: 8,
            cnt_deleted: 0,
            cnt_skipped: 1,
            if_target_missing: false,
            warnings: vec!["w".to_string()],
        };

        let dict_counts = report.to_dict();
        assert_eq!(dict_counts["cnt_files_copied"], 3);
        assert_eq!(dict_counts["cnt_dirs_created"], 2);
        assert_eq!(dict_counts["cnt_bytes_copied"], 8);
        assert_eq!(dict_counts["cnt_warnings"], 1);

        let txt = report.format("[COPY]");
        assert_eq!(
            txt,
            "[COPY] files=3 dirs=2 bytes=8 deleted=0 skipped=1 warnings=1"
        );
        assert_eq!(
            report.to_string(),
            "[FS] files=3 dirs=2 bytes=8 deleted=0 skipped=1 warnings=1"
        );
    }

    #[test]
    fn builder_merge_accumulates_sub_reports() {
        let mut builder = ReportFsOpBuilder::default();
        builder.add_file_copied(5);
        builder.add_dir_created();

        let mut builder_sub = ReportFsOpBuilder::default();
        builder_sub.add_file_copied(3);
        builder_sub.add_warning("timestamp not preserved".to_string());
        builder.merge(builder_sub.build());

        let report = builder.build();
        assert_eq!(report.cnt_files_copied, 2);
        assert_eq!(report.cnt_bytes_copied, 8);
        assert_eq!(report.cnt_dirs_created, 1);
        assert_eq!(report.warning_count(), 1);
    }
}
