//! Recursive and filtered deletion.

use std::fs;
use std::io;
use std::path::Path;

use regex::escape;
use tracing::{debug, warn};

use crate::entry::Entry;
use crate::filter::FilterRegex;
use crate::report::{ReportBatch, ReportBatchBuilder};
use crate::search::find_recursive_regex;
use crate::spec::{SpecTransferPolicy, TreeError};
use crate::util::{absolute_path, path_exists_nofollow};
use crate::walk::{TreeVisitor, list_directory, walk};

struct SpecDeleteContext {
    builder_report: ReportBatchBuilder,
}

impl TreeVisitor for SpecDeleteContext {
    fn enter_directory(&mut self, entry: &Entry, _path_rel: &Path) -> bool {
        if entry.is_symlink() {
            debug!("rm: not following directory link {}", entry.path().display());
            self.builder_report.add_skipped();
            return false;
        }
        self.builder_report.begin_level();
        true
    }

    fn visit_file(&mut self, entry: &Entry, _path_rel: &Path) {
        match delete(entry.path()) {
            Ok(()) => self.builder_report.add_success(entry.path().to_path_buf()),
            Err(e) => self
                .builder_report
                .add_error(entry.path().to_path_buf(), e.to_string()),
        }
    }

    fn leave_directory(&mut self, _entry: &Entry, _path_rel: &Path) {
        self.builder_report.end_level();
    }

    fn skip_entry(&mut self, _entry: &Entry) {
        self.builder_report.add_skipped();
    }

    fn fail_directory(&mut self, path: &Path, error: TreeError) {
        warn!("rm: skipping unreadable directory {} ({error})", path.display());
        self.builder_report.add_error(path.to_path_buf(), error.to_string());
    }
}

/// Advisory pre-flight check. Returns what would stop a delete, or `None`.
///
/// With `if_require_dir`, anything but a directory is reported as
/// [`TreeError::NotADirectory`]. Directories must also be listable.
pub fn check_deletable<P: AsRef<Path>>(path: P, if_require_dir: bool) -> Option<TreeError> {
    let path = path.as_ref();
    if !path_exists_nofollow(path) {
        return Some(TreeError::NotFound {
            path: absolute_path(path),
        });
    }
    let entry = Entry::from_path(path);
    if if_require_dir && !entry.is_dir() {
        return Some(TreeError::NotADirectory {
            path: absolute_path(path),
        });
    }
    if entry.is_dir() && !entry.is_symlink() {
        return list_directory(path).err();
    }
    None
}

/// Delete a file, symlink or whole directory tree.
///
/// A missing path is not an error. Symlinks are removed, never followed.
/// A file that survives `remove_file` has its read-only attribute cleared
/// and is removed once more before [`TreeError::DeleteFailed`] is raised.
/// On Unix, unlinking is governed by the parent directory's permissions, so
/// this second attempt only differs from the first on Windows.
pub fn delete<P: AsRef<Path>>(path: P) -> Result<(), TreeError> {
    let path = path.as_ref();
    let Ok(meta) = fs::symlink_metadata(path) else {
        return Ok(());
    };
    if meta.is_dir() {
        return delete_tree(path);
    }

    match fs::remove_file(path) {
        Ok(()) => {
            debug!("rm {}", path.display());
            Ok(())
        }
        Err(_) if !path_exists_nofollow(path) => Ok(()),
        Err(e) => {
            debug!("rm {} failed ({e}); trying alternate removal", path.display());
            remove_file_alternate(path).map_err(|e| TreeError::DeleteFailed {
                path: absolute_path(path),
                message: e.to_string(),
            })
        }
    }
}

/// Clear the read-only attribute of a regular file, then retry the removal.
fn remove_file_alternate(path: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(path)?;
    if meta.file_type().is_file() && meta.permissions().readonly() {
        fs::set_permissions(path, _permissions_writable(meta.permissions()))?;
    }
    fs::remove_file(path)
}

#[cfg(unix)]
fn _permissions_writable(perms: fs::Permissions) -> fs::Permissions {
    use std::os::unix::fs::PermissionsExt;
    fs::Permissions::from_mode(perms.mode() | 0o200)
}

#[cfg(not(unix))]
fn _permissions_writable(mut perms: fs::Permissions) -> fs::Permissions {
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    perms
}

/// Delete every child of `dir` (recursively), then `dir` itself.
///
/// A missing directory is not an error. The first child that cannot be
/// deleted aborts the call; children deleted before it stay deleted.
pub fn delete_tree<P: AsRef<Path>>(dir: P) -> Result<(), TreeError> {
    let path_dir = dir.as_ref();
    let Ok(meta) = fs::symlink_metadata(path_dir) else {
        return Ok(());
    };
    if !meta.is_dir() {
        return Err(TreeError::NotADirectory {
            path: absolute_path(path_dir),
        });
    }

    for entry in list_directory(path_dir)? {
        delete(entry.path())?;
    }
    fs::remove_dir(path_dir).map_err(|e| TreeError::DeleteFailed {
        path: absolute_path(path_dir),
        message: e.to_string(),
    })?;
    debug!("rmdir {}", path_dir.display());
    Ok(())
}

/// Delete the files under `dir_source` selected by the policy filters.
///
/// Selected subdirectories are descended into with the same filters and are
/// left in place, possibly empty. Per-file failures are collected in the
/// report; nothing is restored.
pub fn delete_with_filter<P: AsRef<Path>>(
    dir_source: P,
    spec_policy: &SpecTransferPolicy,
) -> Result<ReportBatch, TreeError> {
    let mut spec_rm_ctx = SpecDeleteContext {
        builder_report: ReportBatchBuilder::default(),
    };
    walk(dir_source.as_ref(), spec_policy, &mut spec_rm_ctx)?;
    Ok(spec_rm_ctx.builder_report.build())
}

/// Delete every file below `dir` whose name ends with `suffix`.
pub fn delete_all_with_suffix<P: AsRef<Path>>(
    dir: P,
    suffix: &str,
) -> Result<ReportBatch, TreeError> {
    delete_all_matching(dir.as_ref(), &format!("{}$", escape(suffix)))
}

/// Delete every file below `dir` whose name starts with `prefix`.
pub fn delete_all_with_prefix<P: AsRef<Path>>(
    dir: P,
    prefix: &str,
) -> Result<ReportBatch, TreeError> {
    delete_all_matching(dir.as_ref(), &format!("^{}", escape(prefix)))
}

fn delete_all_matching(path_dir: &Path, pattern: &str) -> Result<ReportBatch, TreeError> {
    if !path_dir.is_dir() {
        return Err(TreeError::NotADirectory {
            path: absolute_path(path_dir),
        });
    }
    let filter_name = FilterRegex::new(pattern)?;

    let mut builder_report = ReportBatchBuilder::default();
    for entry in find_recursive_regex(path_dir, &filter_name) {
        if entry.is_dir() && !entry.is_symlink() {
            continue;
        }
        match delete(entry.path()) {
            Ok(()) => builder_report.add_success(entry.into_path()),
            Err(e) => builder_report.add_error(entry.into_path(), e.to_string()),
        }
    }
    Ok(builder_report.build())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{
        check_deletable, delete, delete_all_with_prefix, delete_all_with_suffix, delete_tree,
        delete_with_filter,
    };
    use crate::filter::FilterNameGlob;
    use crate::spec::{SpecTransferPolicy, TreeError};

    fn write_text(path: &Path, txt: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent");
        }
        std::fs::write(path, txt).expect("write text");
    }

    #[test]
    fn delete_removes_file_and_tree() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("a.txt");
        write_text(&path_file, "a");
        write_text(&tmp.path().join("tree/x/y/z.txt"), "z");
        write_text(&tmp.path().join("tree/top.txt"), "t");

        delete(&path_file).expect("delete file");
        assert!(!path_file.exists());

        delete(tmp.path().join("tree")).expect("delete tree");
        assert!(!tmp.path().join("tree").exists());
    }

    #[test]
    fn deleting_missing_path_is_a_no_op() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_gone = tmp.path().join("gone");
        delete(&path_gone).expect("missing file");
        delete_tree(&path_gone).expect("missing tree");

        std::fs::create_dir(&path_gone).expect("mkdir");
        delete_tree(&path_gone).expect("first delete");
        delete_tree(&path_gone).expect("second delete");
    }

    #[test]
    fn delete_tree_rejects_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("f.txt");
        write_text(&path_file, "f");
        assert!(matches!(
            delete_tree(&path_file),
            Err(TreeError::NotADirectory { .. })
        ));
        assert!(path_file.exists());
    }

    #[test]
    fn check_deletable_is_advisory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("f.txt");
        write_text(&path_file, "f");

        assert!(check_deletable(tmp.path(), true).is_none());
        assert!(check_deletable(&path_file, false).is_none());
        assert!(matches!(
            check_deletable(&path_file, true),
            Some(TreeError::NotADirectory { .. })
        ));
        assert!(matches!(
            check_deletable(tmp.path().join("missing"), false),
            Some(TreeError::NotFound { .. })
        ));
        assert!(path_file.exists());
    }

    #[test]
    fn filtered_delete_keeps_excluded_files_and_directory_shells() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let d = tmp.path().join("d");
        write_text(&d.join("keep.txt"), "k");
        write_text(&d.join("drop.txt"), "d");
        write_text(&d.join("sub/keep2.txt"), "k2");

        let spec_policy = SpecTransferPolicy::default()
            .with_include(FilterNameGlob::new("*.txt").expect("glob").accept_directories(true))
            .with_exclude(FilterNameGlob::new("drop.*").expect("glob"));
        let report = delete_with_filter(&d, &spec_policy).expect("delete");

        assert!(report.is_all_succeeded());
        assert_eq!(report.succeeded_count(), 2);
        assert_eq!(report.cnt_skipped, 1);
        assert!(d.join("drop.txt").exists());
        assert!(!d.join("keep.txt").exists());
        assert!(!d.join("sub/keep2.txt").exists());
        assert!(d.join("sub").is_dir());
        assert_eq!(std::fs::read_dir(d.join("sub")).expect("list").count(), 0);
    }

    #[test]
    fn suffix_and_prefix_deletes_are_recursive_and_literal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        write_text(&tmp.path().join("a.bak"), "a");
        write_text(&tmp.path().join("nested/b.bak"), "b");
        write_text(&tmp.path().join("nested/cxbak"), "c");
        write_text(&tmp.path().join("tmp_1.txt"), "t");
        write_text(&tmp.path().join("nested/tmp_2.txt"), "t");
        write_text(&tmp.path().join("keep.txt"), "k");
        std::fs::create_dir_all(tmp.path().join("dir.bak")).expect("mkdir");

        let report = delete_all_with_suffix(tmp.path(), ".bak").expect("suffix delete");
        assert_eq!(report.succeeded_count(), 2);
        assert!(!tmp.path().join("a.bak").exists());
        assert!(!tmp.path().join("nested/b.bak").exists());
        assert!(tmp.path().join("nested/cxbak").exists());
        assert!(tmp.path().join("dir.bak").is_dir());

        let report = delete_all_with_prefix(tmp.path(), "tmp_").expect("prefix delete");
        assert_eq!(report.succeeded_count(), 2);
        assert!(!tmp.path().join("tmp_1.txt").exists());
        assert!(!tmp.path().join("nested/tmp_2.txt").exists());
        assert!(tmp.path().join("keep.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn delete_in_read_only_parent_fails_with_absolute_path() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_dir = tmp.path().join("sealed");
        let path_file = path_dir.join("f.txt");
        write_text(&path_file, "f");
        std::fs::set_permissions(&path_file, std::fs::Permissions::from_mode(0o444))
            .expect("chmod file");
        std::fs::set_permissions(&path_dir, std::fs::Permissions::from_mode(0o555))
            .expect("chmod dir");

        // root ignores permission bits
        if std::fs::write(path_dir.join("canary"), "c").is_ok() {
            std::fs::set_permissions(&path_dir, std::fs::Permissions::from_mode(0o755))
                .expect("chmod back");
            return;
        }

        let res_delete = delete(&path_file);
        let n_mode_after = std::fs::metadata(&path_file)
            .expect("still present")
            .permissions()
            .mode();
        std::fs::set_permissions(&path_dir, std::fs::Permissions::from_mode(0o755))
            .expect("chmod back");

        let err = res_delete.expect_err("parent is read-only");
        assert!(matches!(
            err,
            TreeError::DeleteFailed { ref path, .. } if path.is_absolute() && *path == path_file
        ));
        assert_eq!(n_mode_after & 0o200, 0o200);
        assert!(path_file.exists());
    }

    #[cfg(unix)]
    #[test]
    fn check_deletable_reports_unlistable_directory() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_locked = tmp.path().join("locked");
        write_text(&path_locked.join("secret.txt"), "s");
        std::fs::set_permissions(&path_locked, std::fs::Permissions::from_mode(0o000))
            .expect("chmod");

        // root ignores permission bits
        if std::fs::read_dir(&path_locked).is_ok() {
            std::fs::set_permissions(&path_locked, std::fs::Permissions::from_mode(0o755))
                .expect("chmod back");
            return;
        }

        let res_check = check_deletable(&path_locked, true);
        std::fs::set_permissions(&path_locked, std::fs::Permissions::from_mode(0o755))
            .expect("chmod back");
        assert!(matches!(
            res_check,
            Some(TreeError::SecurityRestricted { ref path }) if *path == path_locked
        ));
    }

    #[cfg(unix)]
    #[test]
    fn filtered_delete_counts_directory_links_as_skipped() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_target = tmp.path().join("target");
        write_text(&path_target.join("precious.txt"), "p");
        let path_tree = tmp.path().join("tree");
        write_text(&path_tree.join("a.txt"), "a");
        symlink(&path_target, path_tree.join("link")).expect("symlink");

        let report =
            delete_with_filter(&path_tree, &SpecTransferPolicy::default()).expect("delete");
        assert_eq!(report.succeeded_count(), 1);
        assert_eq!(report.cnt_skipped, 1);
        assert!(path_tree.join("link").exists());
        assert!(path_target.join("precious.txt").exists());
    }

    #[cfg(unix)]
    #[test]
    fn delete_removes_links_without_touching_targets() {
        use std::os::unix::fs::symlink;

        let tmp = tempfile::tempdir().expect("tempdir");
        let path_target = tmp.path().join("target");
        write_text(&path_target.join("precious.txt"), "p");
        let path_tree = tmp.path().join("tree");
        std::fs::create_dir(&path_tree).expect("mkdir");
        symlink(&path_target, path_tree.join("link")).expect("symlink");

        delete_tree(&path_tree).expect("delete tree");
        assert!(!path_tree.exists());
        assert!(path_target.join("precious.txt").exists());
    }
}
