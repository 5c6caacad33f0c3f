//! Recursive lookups by wildcard, regex or extension, plus membership and counts.
//!
//! Search never fails: unreadable subtrees are logged and skipped, and a root
//! that is not a directory yields an empty result. Directory symlinks are
//! reported when they match but not descended into.

use std::path::Path;

use tracing::warn;

use crate::entry::Entry;
use crate::filter::{EntryFilter, FilterExtensions, FilterNameGlob, FilterRegex};
use crate::util::normalize_path;
use crate::walk::list_directory;

fn _list_or_warn(path_dir: &Path) -> Vec<Entry> {
    match list_directory(path_dir) {
        Ok(v) => v,
        Err(e) => {
            warn!("search: skipping {} ({e})", path_dir.display());
            Vec::new()
        }
    }
}

fn _is_descendable(entry: &Entry) -> bool {
    entry.is_dir() && !entry.is_symlink()
}

fn _collect_matching(
    path_dir: &Path,
    filter: &dyn EntryFilter,
    if_recursive: bool,
    l_found: &mut Vec<Entry>,
) {
    for entry in _list_or_warn(path_dir) {
        let if_descend = if_recursive && _is_descendable(&entry);
        if filter.matches(&entry) {
            l_found.push(entry.clone());
        }
        if if_descend {
            _collect_matching(entry.path(), filter, true, l_found);
        }
    }
}

fn _search(root: &Path, filter: &dyn EntryFilter, if_recursive: bool) -> Vec<Entry> {
    let mut l_found = Vec::new();
    if Entry::from_path(root).is_dir() {
        _collect_matching(root, filter, if_recursive, &mut l_found);
    }
    l_found
}

/// Entries below `root` whose bare name matches the `*`/`?` `pattern`.
///
/// Every subdirectory is searched; directories themselves are returned only
/// when their own name matches.
pub fn find_recursive<P: AsRef<Path>>(root: P, pattern: &str) -> Vec<Entry> {
    match FilterNameGlob::new(pattern) {
        Ok(filter_name) => _search(root.as_ref(), &filter_name, true),
        Err(e) => {
            warn!("search: {e}");
            Vec::new()
        }
    }
}

/// Regex counterpart of [`find_recursive`].
pub fn find_recursive_regex<P: AsRef<Path>>(root: P, filter_regex: &FilterRegex) -> Vec<Entry> {
    _search(root.as_ref(), filter_regex, true)
}

/// Entries whose name ends with any of `extensions`, case-insensitively.
pub fn find_by_extensions<P: AsRef<Path>, S: AsRef<str>>(
    root: P,
    extensions: &[S],
    if_recursive: bool,
) -> Vec<Entry> {
    _search(
        root.as_ref(),
        &FilterExtensions::new(extensions, false),
        if_recursive,
    )
}

/// `true` when `parent` directly holds an entry called `name`.
pub fn contains<P: AsRef<Path>>(parent: P, name: &str) -> bool {
    let path_parent = parent.as_ref();
    if !Entry::from_path(path_parent).is_dir() {
        return false;
    }
    _list_or_warn(path_parent).iter().any(|e| e.name() == name)
}

fn _contains_resolved(path_dir: &Path, path_target: &Path) -> bool {
    for entry in _list_or_warn(path_dir) {
        if normalize_path(entry.path()) == path_target {
            return true;
        }
        if _is_descendable(&entry) && _contains_resolved(entry.path(), path_target) {
            return true;
        }
    }
    false
}

/// `true` when `candidate` is somewhere below `parent`, comparing resolved paths.
pub fn contains_recursive<P: AsRef<Path>, Q: AsRef<Path>>(parent: P, candidate: Q) -> bool {
    let path_parent = parent.as_ref();
    if !Entry::from_path(path_parent).is_dir() {
        return false;
    }
    _contains_resolved(path_parent, &normalize_path(candidate.as_ref()))
}

/// Number of files below `dir`, plus directories when `if_count_dirs`.
pub fn count_all<P: AsRef<Path>>(dir: P, if_count_dirs: bool) -> u64 {
    fn _count(path_dir: &Path, if_count_dirs: bool) -> u64 {
        let mut n_total = 0;
        for entry in _list_or_warn(path_dir) {
            if entry.is_dir() {
                if if_count_dirs {
                    n_total += 1;
                }
                if _is_descendable(&entry) {
                    n_total += _count(entry.path(), if_count_dirs);
                }
            } else {
                n_total += 1;
            }
        }
        n_total
    }

    let path_dir = dir.as_ref();
    if !Entry::from_path(path_dir).is_dir() {
        return 0;
    }
    _count(path_dir, if_count_dirs)
}
