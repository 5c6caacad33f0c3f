//! Rename with copy+delete fallback, and name derivations built on it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{debug, warn};

use crate::copy::{copy_directory, copy_file};
use crate::delete::delete;
use crate::digest::{ContentDigest, digest_file};
use crate::entry::Entry;
use crate::search::find_by_extensions;
use crate::spec::{EnumRenameOutcome, SpecTransferPolicy, TreeError};
use crate::util::{
    absolute_path, extension_of, normalize_path, path_exists_nofollow, strip_extension,
    strip_suffix_ignore_case,
};

/// `chrono` format of the stamp inserted by [`append_timestamp_to_name`].
pub const FMT_NAME_TIMESTAMP: &str = "%H%M%S%3f";

////////////////////////////////////////////////////////////////////////////////
// #region Move

fn _copy_then_delete(
    path_src: &Path,
    path_dst: &Path,
    digest: Option<&dyn ContentDigest>,
) -> Result<(), String> {
    let entry_src = Entry::from_path(path_src);
    if entry_src.is_dir() && !entry_src.is_symlink() {
        let report = copy_directory(path_src, path_dst, &SpecTransferPolicy::default())
            .map_err(|e| e.to_string())?;
        if !report.is_all_succeeded() {
            return Err(format!(
                "copy incomplete ({} entries failed), source kept",
                report.failed_count()
            ));
        }
    } else {
        copy_file(path_src, path_dst, &SpecTransferPolicy::default())
            .map_err(|e| e.to_string())?;
        if let Some(digest) = digest {
            let digest_src = digest_file(path_src, digest).map_err(|e| e.to_string())?;
            let digest_dst = digest_file(path_dst, digest).map_err(|e| e.to_string())?;
            if digest_src != digest_dst {
                return Err(format!(
                    "digest mismatch after copy ({digest_src} != {digest_dst}), source kept"
                ));
            }
        }
    }
    delete(path_src).map_err(|e| format!("copied, but source was not removed: {e}"))
}

fn _rename_with<F>(
    path_src: &Path,
    path_dst: &Path,
    if_allow_fallback: bool,
    digest: Option<&dyn ContentDigest>,
    f_rename: F,
) -> Result<EnumRenameOutcome, TreeError>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    if !path_exists_nofollow(path_src) {
        return Err(TreeError::NotFound {
            path: absolute_path(path_src),
        });
    }

    let err_atomic = match f_rename(path_src, path_dst) {
        Ok(()) => {
            debug!("mv {} -> {}", path_src.display(), path_dst.display());
            return Ok(EnumRenameOutcome::Atomic);
        }
        Err(e) => e,
    };
    let fail = |message: String| TreeError::RenameFailed {
        path_src: path_src.to_path_buf(),
        path_dst: path_dst.to_path_buf(),
        message,
    };
    if !if_allow_fallback {
        return Err(fail(err_atomic.to_string()));
    }

    debug!(
        "mv {} -> {}: atomic rename failed ({err_atomic}), copying instead",
        path_src.display(),
        path_dst.display()
    );
    _copy_then_delete(path_src, path_dst, digest)
        .map_err(|message| fail(format!("{err_atomic}; fallback: {message}")))?;
    Ok(EnumRenameOutcome::Fallback)
}

/// Rename `path_source` to `path_destination`.
///
/// Tries a single OS rename first. When that is rejected (for example across
/// filesystems) and `if_allow_fallback` is set, the source is copied to the
/// destination and deleted only after the copy fully succeeded. A failed or
/// partial copy leaves the source in place and returns
/// [`TreeError::RenameFailed`].
pub fn rename_or_move<P: AsRef<Path>, Q: AsRef<Path>>(
    path_source: P,
    path_destination: Q,
    if_allow_fallback: bool,
) -> Result<EnumRenameOutcome, TreeError> {
    _rename_with(
        path_source.as_ref(),
        path_destination.as_ref(),
        if_allow_fallback,
        None,
        |a, b| fs::rename(a, b),
    )
}

/// [`rename_or_move`] with fallback always allowed and file contents checked
/// with `digest` before the source is deleted.
pub fn rename_or_move_verified<P: AsRef<Path>, Q: AsRef<Path>>(
    path_source: P,
    path_destination: Q,
    digest: &dyn ContentDigest,
) -> Result<EnumRenameOutcome, TreeError> {
    _rename_with(
        path_source.as_ref(),
        path_destination.as_ref(),
        true,
        Some(digest),
        |a, b| fs::rename(a, b),
    )
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region NameDerivation

fn _name_of(path: &Path) -> Result<String, TreeError> {
    path.file_name()
        .map(|v| v.to_string_lossy().to_string())
        .ok_or_else(|| TreeError::NotFound {
            path: absolute_path(path),
        })
}

fn _rename_to_sibling(
    path_src: &Path,
    name_new: &str,
    if_allow_fallback: bool,
) -> Result<PathBuf, TreeError> {
    if !path_exists_nofollow(path_src) {
        return Err(TreeError::NotFound {
            path: absolute_path(path_src),
        });
    }
    let path_dst = path_src.with_file_name(name_new);
    if path_exists_nofollow(&path_dst) && normalize_path(&path_dst) != normalize_path(path_src) {
        return Err(TreeError::AlreadyExists {
            path: absolute_path(&path_dst),
        });
    }
    rename_or_move(path_src, &path_dst, if_allow_fallback)?;
    Ok(path_dst)
}

/// Rename a file within its own directory. Returns the new path.
///
/// An existing entry with the new name is never replaced.
pub fn rename_with_new_name<P: AsRef<Path>>(
    file: P,
    name_new: &str,
) -> Result<PathBuf, TreeError> {
    _rename_to_sibling(file.as_ref(), name_new, false)
}

/// Replace the last extension of `file` with `suffix_new` (e.g. `".rtf"`).
///
/// A name without an extension gets `suffix_new` appended.
pub fn change_extension<P: AsRef<Path>>(
    file: P,
    suffix_new: &str,
    if_allow_fallback: bool,
) -> Result<PathBuf, TreeError> {
    let path_file = file.as_ref();
    if !path_exists_nofollow(path_file) {
        return Err(TreeError::NotFound {
            path: absolute_path(path_file),
        });
    }
    let name_file = _name_of(path_file)?;
    let name_new = format!("{}{suffix_new}", strip_extension(&name_file));
    _rename_to_sibling(path_file, &name_new, if_allow_fallback)
}

/// `path` with `HHmmssSSS` of `when` (default: now) inserted before the extension.
///
/// Pure; nothing on disk is touched.
pub fn append_timestamp_to_name<P: AsRef<Path>>(
    path: P,
    when: Option<DateTime<Local>>,
) -> PathBuf {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_default();
    let c_stamp = when.unwrap_or_else(Local::now).format(FMT_NAME_TIMESTAMP);
    path.with_file_name(format!(
        "{}{c_stamp}{}",
        strip_extension(&name),
        extension_of(&name)
    ))
}

fn _replace_suffix(name: &str, suffix_old: &str, suffix_new: &str) -> Option<String> {
    let name_stem = strip_suffix_ignore_case(name, &suffix_old.to_lowercase())?;
    Some(format!("{name_stem}{suffix_new}"))
}

/// Rename every file below `root` ending with `suffix_old` (case-insensitive)
/// to end with `suffix_new` instead.
///
/// Returns the files that could not be renamed; empty means all succeeded.
pub fn change_extension_recursively<P: AsRef<Path>>(
    root: P,
    suffix_old: &str,
    suffix_new: &str,
    if_allow_fallback: bool,
) -> Result<Vec<PathBuf>, TreeError> {
    let path_root = root.as_ref();
    if !path_root.is_dir() {
        return Err(TreeError::NotADirectory {
            path: absolute_path(path_root),
        });
    }

    let mut l_failed = Vec::new();
    for entry in find_by_extensions(path_root, &[suffix_old], true) {
        if entry.is_dir() {
            continue;
        }
        let Some(name_new) = _replace_suffix(entry.name(), suffix_old, suffix_new) else {
            l_failed.push(entry.into_path());
            continue;
        };
        if let Err(e) = _rename_to_sibling(entry.path(), &name_new, if_allow_fallback) {
            warn!("Failed to change extension of {} ({e})", entry.path().display());
            l_failed.push(entry.into_path());
        }
    }
    Ok(l_failed)
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
