//! Directory entry snapshot consumed by filters and engines.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A filesystem path plus metadata read once at construction.
///
/// Filters only look at these fields, so matching never touches the
/// filesystem. Call [`Entry::refresh`] to re-read the OS state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    path: PathBuf,
    name: String,
    if_exists: bool,
    if_is_dir: bool,
    if_is_symlink: bool,
    time_modified: Option<SystemTime>,
    n_bytes: u64,
}

impl Entry {
    /// Snapshot `path`. Symlinks are followed for the directory/size/mtime
    /// fields; `is_symlink` reports the link itself.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default();
        let if_is_symlink = fs::symlink_metadata(&path)
            .map(|v| v.file_type().is_symlink())
            .unwrap_or(false);

        match fs::metadata(&path) {
            Ok(meta) => Self {
                path,
                name,
                if_exists: true,
                if_is_dir: meta.is_dir(),
                if_is_symlink,
                time_modified: meta.modified().ok(),
                n_bytes: meta.len(),
            },
            // dangling symlinks still exist as entries
            Err(_) => Self {
                path,
                name,
                if_exists: if_is_symlink,
                if_is_dir: false,
                if_is_symlink,
                time_modified: None,
                n_bytes: 0,
            },
        }
    }

    /// Re-read metadata from the OS.
    pub fn refresh(&self) -> Self {
        Self::from_path(&self.path)
    }

    /// Full path as given (not resolved).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bare name, the last path component.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn exists(&self) -> bool {
        self.if_exists
    }

    pub fn is_dir(&self) -> bool {
        self.if_is_dir
    }

    pub fn is_file(&self) -> bool {
        self.if_exists && !self.if_is_dir
    }

    pub fn is_symlink(&self) -> bool {
        self.if_is_symlink
    }

    /// Last modification time, if the platform reports one.
    pub fn last_modified(&self) -> Option<SystemTime> {
        self.time_modified
    }

    /// Size in bytes (0 for missing entries).
    pub fn byte_len(&self) -> u64 {
        self.n_bytes
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }
}

#[cfg(test)]
mod tests {
    use super::Entry;

    #[test]
    fn snapshot_reads_file_and_directory_properties() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("a.txt");
        std::fs::write(&path_file, "hello").expect("write");

        let entry_file = Entry::from_path(&path_file);
        assert!(entry_file.exists());
        assert!(entry_file.is_file());
        assert!(!entry_file.is_dir());
        assert_eq!(entry_file.name(), "a.txt");
        assert_eq!(entry_file.byte_len(), 5);
        assert!(entry_file.last_modified().is_some());

        let entry_dir = Entry::from_path(tmp.path());
        assert!(entry_dir.is_dir());
        assert!(!entry_dir.is_file());
    }

    #[test]
    fn snapshot_is_not_live_until_refreshed() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_file = tmp.path().join("gone.txt");
        std::fs::write(&path_file, "x").expect("write");

        let entry = Entry::from_path(&path_file);
        std::fs::remove_file(&path_file).expect("remove");
        assert!(entry.exists());
        assert!(!entry.refresh().exists());
    }

    #[cfg(unix)]
    #[test]
    fn dangling_symlink_exists_as_link() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path_link = tmp.path().join("dangling");
        std::os::unix::fs::symlink(tmp.path().join("nowhere"), &path_link).expect("symlink");

        let entry = Entry::from_path(&path_link);
        assert!(entry.exists());
        assert!(entry.is_symlink());
        assert!(!entry.is_dir());
    }
}
