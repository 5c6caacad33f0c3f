//! Transfer policy, outcome enums and top-level error types.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::filter::{EntryFilter, SetExclude};

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Per-entry decision produced by the tree walker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumWalkDecision {
    /// Hand the entry (a file) to the engine-specific action.
    Process,
    /// Entry is a directory; descend with the same policy.
    Recurse,
    /// Entry is in the exclude set.
    Skip,
}

/// Result of a directory creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnumCreateOutcome {
    /// Directory did not exist and was created.
    Created,
    /// A directory was already present at the path.
    AlreadyExists,
    /// Creation failed, or the path exists but is not a directory.
    Failed(String),
}

impl EnumCreateOutcome {
    /// `true` when a directory is present at the path afterwards.
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Created | Self::AlreadyExists)
    }
}

/// Which path a successful rename took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumRenameOutcome {
    /// Single OS rename call.
    Atomic,
    /// Copy to destination, then delete of the source.
    Fallback,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Policy

/// Default streaming chunk size for file copies.
pub const N_BYTES_CHUNK_DEFAULT: usize = 8192;

/// Options shared by the copy, delete and rename engines.
#[derive(Debug, Clone)]
pub struct SpecTransferPolicy {
    /// Entries must match this filter to participate. `None` accepts all.
    pub filter_include: Option<Arc<dyn EntryFilter>>,
    /// Entries matching this filter are removed from each directory listing.
    pub filter_exclude: Option<Arc<dyn EntryFilter>>,
    /// Explicit paths to skip, unioned with `filter_exclude` matches.
    pub set_exclude: SetExclude,
    /// Copy the source modification time onto each copied file.
    pub if_preserve_last_modified: bool,
    /// Encoding label used to decode the source of a text copy.
    pub encoding_source: Option<String>,
    /// Encoding label used to encode the destination of a text copy.
    pub encoding_destination: Option<String>,
    /// Allow copy+delete when an atomic rename is rejected.
    pub if_delete_on_rename_failure: bool,
    /// Copy extended attributes after a byte copy (Linux only).
    pub if_preserve_xattrs: bool,
    /// Chunk size for streamed copies.
    pub n_bytes_chunk: usize,
}

impl Default for SpecTransferPolicy {
    fn default() -> Self {
        Self {
            filter_include: None,
            filter_exclude: None,
            set_exclude: SetExclude::default(),
            if_preserve_last_modified: true,
            encoding_source: None,
            encoding_destination: None,
            if_delete_on_rename_failure: false,
            if_preserve_xattrs: false,
            n_bytes_chunk: N_BYTES_CHUNK_DEFAULT,
        }
    }
}

impl SpecTransferPolicy {
    /// Set the include filter.
    pub fn with_include<F: EntryFilter + 'static>(mut self, filter: F) -> Self {
        self.filter_include = Some(Arc::new(filter));
        self
    }

    /// Set the exclude filter.
    pub fn with_exclude<F: EntryFilter + 'static>(mut self, filter: F) -> Self {
        self.filter_exclude = Some(Arc::new(filter));
        self
    }

    /// Add one path to the explicit exclude set.
    pub fn with_excluded_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.set_exclude.insert(path);
        self
    }

    /// Set source and destination encodings for text copies.
    pub fn with_encodings(
        mut self,
        encoding_source: Option<&str>,
        encoding_destination: Option<&str>,
    ) -> Self {
        self.encoding_source = encoding_source.map(str::to_string);
        self.encoding_destination = encoding_destination.map(str::to_string);
        self
    }

    /// Toggle modification-time propagation.
    pub fn with_preserve_last_modified(mut self, if_preserve: bool) -> Self {
        self.if_preserve_last_modified = if_preserve;
        self
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region Errors

/// Errors raised by walker, copy, delete and rename operations.
///
/// Every variant names the path involved.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// Path does not exist where existence was required.
    #[error("Path does not exist: {}", path.display())]
    NotFound {
        /// Missing path.
        path: PathBuf,
    },
    /// Path is expected to be a directory but is not.
    #[error("Not a directory: {}", path.display())]
    NotADirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// A file operation was given a directory as its source.
    #[error("Source is a directory: {}", path.display())]
    SourceIsDirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// A file operation was given a directory as its destination.
    #[error("Destination is a directory: {}", path.display())]
    DestinationIsDirectory {
        /// Offending path.
        path: PathBuf,
    },
    /// Target was present where absence was required.
    #[error("Path already exists: {}", path.display())]
    AlreadyExists {
        /// Existing path.
        path: PathBuf,
    },
    /// The OS refused to list or access the path.
    #[error("Access denied: {}", path.display())]
    SecurityRestricted {
        /// Restricted path.
        path: PathBuf,
    },
    /// Directory listing could not be produced at all.
    #[error("Cannot enumerate directory {}: {source}", path.display())]
    NoContent {
        /// Directory path.
        path: PathBuf,
        /// Underlying listing error.
        source: io::Error,
    },
    /// Rename or move did not happen.
    #[error("Failed to rename {} to {}: {message}", path_src.display(), path_dst.display())]
    RenameFailed {
        /// Path that was to be renamed.
        path_src: PathBuf,
        /// Requested new path.
        path_dst: PathBuf,
        /// Reason, including fallback failure details.
        message: String,
    },
    /// Delete did not happen, after the alternate delete attempt.
    #[error("Failed to delete {}: {message}", path.display())]
    DeleteFailed {
        /// Absolute path that is still present.
        path: PathBuf,
        /// Underlying error text.
        message: String,
    },
    /// Source and destination are the same path or contain one another.
    #[error(
        "Source and destination overlap: {} <-> {}",
        source_dir.display(),
        destination_dir.display()
    )]
    SourceDestinationOverlap {
        /// Source path.
        source_dir: PathBuf,
        /// Destination path.
        destination_dir: PathBuf,
    },
    /// Filter pattern failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),
    /// Any other I/O failure on a named path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read, written or inspected.
        path: PathBuf,
        /// Underlying error.
        source: io::Error,
    },
}

impl TreeError {
    /// Path the error is about (source side for renames and overlaps).
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::NotFound { path }
            | Self::NotADirectory { path }
            | Self::SourceIsDirectory { path }
            | Self::DestinationIsDirectory { path }
            | Self::AlreadyExists { path }
            | Self::SecurityRestricted { path }
            | Self::NoContent { path, .. }
            | Self::DeleteFailed { path, .. }
            | Self::Io { path, .. } => Some(path),
            Self::RenameFailed { path_src, .. } => Some(path_src),
            Self::SourceDestinationOverlap { source_dir, .. } => Some(source_dir),
            Self::InvalidPattern(_) => None,
        }
    }

    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result alias used across the engines.
pub type Result<T> = std::result::Result<T, TreeError>;

// #endregion
////////////////////////////////////////////////////////////////////////////////
