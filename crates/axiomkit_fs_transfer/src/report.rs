//! Batch report model and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// One failed path with its error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecPathError {
    /// Path the failure is about.
    pub path: PathBuf,
    /// User-facing error text.
    pub exception: String,
}

/// Result of one subtree operation (copy, filtered delete, suffix delete).
///
/// Sibling results are kept individually; callers choose their own pass/fail
/// policy via [`ReportBatch::is_all_succeeded`] or [`ReportBatch::outcome_last`].
#[derive(Debug, Default, Clone)]
pub struct ReportBatch {
    /// Paths whose action completed (files copied/deleted, directories created).
    pub succeeded: Vec<PathBuf>,
    /// Paths whose action failed.
    pub failed: Vec<SpecPathError>,
    /// Entries removed by the exclude filter or exclude set.
    pub cnt_skipped: u64,
    outcome_last: Option<bool>,
}

impl ReportBatch {
    /// `true` when nothing failed.
    pub fn is_all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    /// Outcome of the last entry processed at the top level.
    ///
    /// A subdirectory's outcome is its own last entry's outcome; an empty
    /// subdirectory counts as succeeded. `None` when nothing was processed.
    /// This is the loose "last sibling wins" result; most callers want
    /// [`ReportBatch::is_all_succeeded`].
    pub fn outcome_last(&self) -> Option<bool> {
        self.outcome_last
    }

    pub fn succeeded_count(&self) -> usize {
        self.succeeded.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }

    /// Failed paths only.
    pub fn failed_paths(&self) -> Vec<&Path> {
        self.failed.iter().map(|v| v.path.as_path()).collect()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_succeeded".to_string(), self.succeeded_count() as u64);
        dict_counts.insert("cnt_failed".to_string(), self.failed_count() as u64);
        dict_counts.insert("cnt_skipped".to_string(), self.cnt_skipped);
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} succeeded={} failed={} skipped={}",
            dict_counts["cnt_succeeded"], dict_counts["cnt_failed"], dict_counts["cnt_skipped"]
        )
    }
}

impl fmt::Display for ReportBatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[BATCH]"))
    }
}

/// Mutable accumulator used while a walk is in progress.
///
/// Keeps one "last outcome" slot per open directory level so the legacy
/// [`ReportBatch::outcome_last`] can be derived alongside the full lists.
#[derive(Debug, Clone)]
pub struct ReportBatchBuilder {
    succeeded: Vec<PathBuf>,
    failed: Vec<SpecPathError>,
    cnt_skipped: u64,
    l_levels: Vec<Option<bool>>,
}

impl Default for ReportBatchBuilder {
    fn default() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
            cnt_skipped: 0,
            l_levels: vec![None],
        }
    }
}

impl ReportBatchBuilder {
    fn set_level_outcome(&mut self, b_outcome: bool) {
        if let Some(slot) = self.l_levels.last_mut() {
            *slot = Some(b_outcome);
        }
    }

    /// Record one successful action at the current level.
    pub fn add_success(&mut self, path: PathBuf) {
        self.succeeded.push(path);
        self.set_level_outcome(true);
    }

    /// Record one failed action at the current level.
    pub fn add_error(&mut self, path: PathBuf, exception: String) {
        self.failed.push(SpecPathError { path, exception });
        self.set_level_outcome(false);
    }

    pub fn add_skipped(&mut self) {
        self.cnt_skipped += 1;
    }

    /// Open a nested directory level.
    pub fn begin_level(&mut self) {
        self.l_levels.push(None);
    }

    /// Close the innermost level; its outcome becomes the parent's latest.
    pub fn end_level(&mut self) {
        if self.l_levels.len() <= 1 {
            return;
        }
        let outcome_child = self.l_levels.pop().flatten().unwrap_or(true);
        self.set_level_outcome(outcome_child);
    }

    /// Finalize builder into immutable report.
    pub fn build(mut self) -> ReportBatch {
        while self.l_levels.len() > 1 {
            self.end_level();
        }
        ReportBatch {
            succeeded: self.succeeded,
            failed: self.failed,
            cnt_skipped: self.cnt_skipped,
            outcome_last: self.l_levels.first().copied().flatten(),
        }
    }
}
