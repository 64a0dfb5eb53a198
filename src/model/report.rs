//! Per-mbox and per-run processing results.

use std::path::PathBuf;

use serde::Serialize;

/// Outcome of deduplicating a single MBOX file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MboxReport {
    pub path: PathBuf,
    /// Messages in the file before processing.
    pub messages_before: usize,
    /// Messages removed as later duplicates.
    pub deleted: usize,
    /// Human-readable line, empty when nothing was deleted.
    pub message: String,
}

impl MboxReport {
    /// Whether the file was rewritten.
    pub fn changed(&self) -> bool {
        self.deleted > 0
    }
}

/// An MBOX that could not be processed while the batch carried on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedMbox {
    pub path: PathBuf,
    pub reason: String,
}

/// Aggregated result of a batch run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    /// Per-file reports, in processing order.
    pub reports: Vec<MboxReport>,
    /// Files that failed (only populated when failures do not halt the batch).
    pub failed: Vec<FailedMbox>,
    pub total_deleted: usize,
    /// The batch stopped early on a cancellation request.
    pub cancelled: bool,
}

impl BatchReport {
    /// Paths that were processed successfully, in order.
    pub fn updated_paths(&self) -> Vec<PathBuf> {
        self.reports.iter().map(|r| r.path.clone()).collect()
    }

    /// Concatenated report lines, one per changed file.
    pub fn combined_text(&self) -> String {
        let mut out = String::new();
        for report in &self.reports {
            if report.message.is_empty() {
                continue;
            }
            out.push_str(&report.message);
            out.push('\n');
        }
        out
    }

    /// Closing line shown to the user.
    pub fn summary(&self) -> String {
        if self.total_deleted == 0 {
            "No duplicates were found".to_string()
        } else {
            format!(
                "Total duplicate messages deleted across all mailboxes: {}",
                self.total_deleted
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(path: &str, deleted: usize) -> MboxReport {
        MboxReport {
            path: PathBuf::from(path),
            messages_before: 10,
            deleted,
            message: if deleted > 0 {
                format!("Deleted {deleted} duplicate messages from mbox {path}")
            } else {
                String::new()
            },
        }
    }

    #[test]
    fn test_combined_text_skips_empty() {
        let batch = BatchReport {
            reports: vec![report("a", 2), report("b", 0), report("c", 1)],
            total_deleted: 3,
            ..Default::default()
        };
        assert_eq!(
            batch.combined_text(),
            "Deleted 2 duplicate messages from mbox a\nDeleted 1 duplicate messages from mbox c\n"
        );
    }

    #[test]
    fn test_summary() {
        let empty = BatchReport::default();
        assert_eq!(empty.summary(), "No duplicates were found");

        let batch = BatchReport {
            total_deleted: 7,
            ..Default::default()
        };
        assert!(batch.summary().ends_with(": 7"));
    }
}
