//! Filtered depth-first tree walk shared by the copy, delete and search engines.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::entry::Entry;
use crate::spec::{EnumWalkDecision, SpecTransferPolicy, TreeError};

/// Engine-specific callbacks driven by [`walk`].
///
/// Directories are visited pre-order: `enter_directory` runs before any of
/// the directory's children, `leave_directory` after all of them.
pub trait TreeVisitor {
    /// Called for each selected subdirectory. Return `false` to skip descent
    /// (`leave_directory` is then not called).
    fn enter_directory(&mut self, entry: &Entry, path_rel: &Path) -> bool {
        let _ = (entry, path_rel);
        true
    }

    /// Called for each selected non-directory entry.
    fn visit_file(&mut self, entry: &Entry, path_rel: &Path);

    fn leave_directory(&mut self, entry: &Entry, path_rel: &Path) {
        let _ = (entry, path_rel);
    }

    /// Called for entries removed by the exclude filter or exclude set.
    fn skip_entry(&mut self, entry: &Entry) {
        let _ = entry;
    }

    /// A nested directory could not be listed; its siblings still proceed.
    fn fail_directory(&mut self, path: &Path, error: TreeError);
}

/// List the direct children of `path_dir`, sorted by name.
///
/// An accessible empty directory yields an empty list. A refused listing is
/// [`TreeError::SecurityRestricted`]; any other listing failure is
/// [`TreeError::NoContent`].
pub fn list_directory(path_dir: &Path) -> Result<Vec<Entry>, TreeError> {
    let iter_entries = fs::read_dir(path_dir).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => TreeError::SecurityRestricted {
            path: path_dir.to_path_buf(),
        },
        _ => TreeError::NoContent {
            path: path_dir.to_path_buf(),
            source: e,
        },
    })?;

    let mut l_entries = Vec::new();
    for _entry_res in iter_entries {
        match _entry_res {
            Ok(v) => l_entries.push(Entry::from_path(v.path())),
            Err(e) => warn!(
                "Failed to read directory entry under {} ({e})",
                path_dir.display()
            ),
        }
    }
    l_entries.sort_by(|a, b| a.path().cmp(b.path()));
    Ok(l_entries)
}

/// Decide what happens to each child of `path_dir` under `spec_policy`.
///
/// Children rejected by the include filter are dropped entirely. The exclude
/// set is built once for the directory as the explicit
/// [`SpecTransferPolicy::set_exclude`] members plus every child matched by
/// the exclude filter; included children in that set become
/// [`EnumWalkDecision::Skip`].
pub fn plan_directory(
    path_dir: &Path,
    spec_policy: &SpecTransferPolicy,
) -> Result<Vec<(Entry, EnumWalkDecision)>, TreeError> {
    let l_entries = list_directory(path_dir)?;

    let set_excluded: HashSet<PathBuf> = l_entries
        .iter()
        .filter(|e| {
            spec_policy
                .filter_exclude
                .as_ref()
                .is_some_and(|f| f.matches(e))
                || spec_policy.set_exclude.contains(e.path())
        })
        .map(|e| e.path().to_path_buf())
        .collect();

    let l_plan = l_entries
        .into_iter()
        .filter(|e| {
            spec_policy
                .filter_include
                .as_ref()
                .is_none_or(|f| f.matches(e))
        })
        .map(|e| {
            let enum_decision = if set_excluded.contains(e.path()) {
                EnumWalkDecision::Skip
            } else if e.is_dir() {
                EnumWalkDecision::Recurse
            } else {
                EnumWalkDecision::Process
            };
            (e, enum_decision)
        })
        .collect();
    Ok(l_plan)
}

/// Walk `path_root` depth-first, pre-order, handing selected entries to `visitor`.
///
/// Fails up front with [`TreeError::NotADirectory`] when the root is not an
/// existing directory, or with the listing error of the root itself. Nested
/// listing failures go to [`TreeVisitor::fail_directory`]. Nothing already
/// done is undone when a later entry fails.
pub fn walk<V: TreeVisitor + ?Sized>(
    path_root: &Path,
    spec_policy: &SpecTransferPolicy,
    visitor: &mut V,
) -> Result<(), TreeError> {
    if !Entry::from_path(path_root).is_dir() {
        return Err(TreeError::NotADirectory {
            path: path_root.to_path_buf(),
        });
    }
    let l_plan = plan_directory(path_root, spec_policy)?;
    walk_plan(l_plan, Path::new(""), spec_policy, visitor);
    Ok(())
}

fn walk_plan<V: TreeVisitor + ?Sized>(
    l_plan: Vec<(Entry, EnumWalkDecision)>,
    path_rel_parent: &Path,
    spec_policy: &SpecTransferPolicy,
    visitor: &mut V,
) {
    for (entry, enum_decision) in l_plan {
        let path_rel = path_rel_parent.join(entry.path().file_name().unwrap_or_default());
        match enum_decision {
            EnumWalkDecision::Skip => {
                debug!("walk: skip {}", entry.path().display());
                visitor.skip_entry(&entry);
            }
            EnumWalkDecision::Process => visitor.visit_file(&entry, &path_rel),
            EnumWalkDecision::Recurse => {
                if !visitor.enter_directory(&entry, &path_rel) {
                    continue;
                }
                match plan_directory(entry.path(), spec_policy) {
                    Ok(l_plan_sub) => walk_plan(l_plan_sub, &path_rel, spec_policy, visitor),
                    Err(e) => visitor.fail_directory(entry.path(), e),
                }
                visitor.leave_directory(&entry, &path_rel);
            }
        }
    }
}
