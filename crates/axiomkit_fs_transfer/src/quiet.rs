//! Non-raising adapters: log the failure and return `false` (or an empty report).
//!
//! For callers that only need a yes/no answer. The raising functions in
//! [`crate::copy`], [`crate::delete`] and [`crate::rename`] remain the
//! primary API.

use std::path::Path;

use tracing::warn;

use crate::copy::{copy_directory, copy_file};
use crate::delete::{delete, delete_with_filter};
use crate::rename::{change_extension, rename_or_move};
use crate::report::ReportBatch;
use crate::spec::{SpecTransferPolicy, TreeError};

fn _log_failure(c_action: &str, err: &TreeError) {
    warn!("{c_action} failed: {err}");
}

/// [`copy_file`]; `true` on success.
pub fn copy_file_quietly<P: AsRef<Path>, Q: AsRef<Path>>(
    file_source: P,
    file_destination: Q,
    spec_policy: &SpecTransferPolicy,
) -> bool {
    match copy_file(file_source, file_destination, spec_policy) {
        Ok(()) => true,
        Err(e) => {
            _log_failure("copy", &e);
            false
        }
    }
}

/// [`copy_directory`]; `true` only when every entry was copied.
pub fn copy_directory_quietly<P: AsRef<Path>, Q: AsRef<Path>>(
    dir_source: P,
    dir_destination: Q,
    spec_policy: &SpecTransferPolicy,
) -> bool {
    match copy_directory(dir_source, dir_destination, spec_policy) {
        Ok(report) => {
            for spec_err in &report.failed {
                warn!(
                    "copy failed: {} ({})",
                    spec_err.path.display(),
                    spec_err.exception
                );
            }
            report.is_all_succeeded()
        }
        Err(e) => {
            _log_failure("copy", &e);
            false
        }
    }
}

pub fn delete_quietly<P: AsRef<Path>>(path: P) -> bool {
    match delete(path) {
        Ok(()) => true,
        Err(e) => {
            _log_failure("delete", &e);
            false
        }
    }
}

/// [`delete_with_filter`]; an empty report when the walk cannot start.
pub fn delete_with_filter_quietly<P: AsRef<Path>>(
    dir_source: P,
    spec_policy: &SpecTransferPolicy,
) -> ReportBatch {
    delete_with_filter(dir_source, spec_policy).unwrap_or_else(|e| {
        _log_failure("delete", &e);
        ReportBatch::default()
    })
}

pub fn rename_or_move_quietly<P: AsRef<Path>, Q: AsRef<Path>>(
    path_source: P,
    path_destination: Q,
    if_allow_fallback: bool,
) -> bool {
    match rename_or_move(path_source, path_destination, if_allow_fallback) {
        Ok(_) => true,
        Err(e) => {
            _log_failure("rename", &e);
            false
        }
    }
}

pub fn change_extension_quietly<P: AsRef<Path>>(
    file: P,
    suffix_new: &str,
    if_allow_fallback: bool,
) -> bool {
    match change_extension(file, suffix_new, if_allow_fallback) {
        Ok(_) => true,
        Err(e) => {
            _log_failure("rename", &e);
            false
        }
    }
}
