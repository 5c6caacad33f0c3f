//! File and directory copy on top of the tree walker.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::entry::Entry;
use crate::report::{ReportBatch, ReportBatchBuilder};
use crate::spec::{EnumCreateOutcome, SpecTransferPolicy, TreeError};
use crate::util::{
    copy_bytes, copy_last_modified, copy_xattrs, is_overlap, normalize_path, resolve_encoding,
    transcode_stream,
};
use crate::walk::{TreeVisitor, walk};

/// Suffix appended by [`new_backup_of`].
pub const SUFFIX_BACKUP: &str = ".bak";

struct SpecCopyContext<'a> {
    path_dir_dst: PathBuf,
    spec_policy: &'a SpecTransferPolicy,
    builder_report: ReportBatchBuilder,
}

impl TreeVisitor for SpecCopyContext<'_> {
    fn enter_directory(&mut self, entry: &Entry, path_rel: &Path) -> bool {
        let path_dir_dst_sub = self.path_dir_dst.join(path_rel);
        match create_directory(&path_dir_dst_sub) {
            EnumCreateOutcome::Created | EnumCreateOutcome::AlreadyExists => {
                self.builder_report.add_success(path_dir_dst_sub);
                self.builder_report.begin_level();
                true
            }
            EnumCreateOutcome::Failed(message) => {
                debug!(
                    "copy: cannot mirror {} ({message})",
                    entry.path().display()
                );
                self.builder_report.add_error(path_dir_dst_sub, message);
                false
            }
        }
    }

    fn visit_file(&mut self, entry: &Entry, path_rel: &Path) {
        let path_file_dst = self.path_dir_dst.join(path_rel);
        match copy_file(entry.path(), &path_file_dst, self.spec_policy) {
            Ok(()) => self.builder_report.add_success(path_file_dst),
            Err(e) => self.builder_report.add_error(path_file_dst, e.to_string()),
        }
    }

    fn leave_directory(&mut self, _entry: &Entry, _path_rel: &Path) {
        self.builder_report.end_level();
    }

    fn skip_entry(&mut self, _entry: &Entry) {
        self.builder_report.add_skipped();
    }

    fn fail_directory(&mut self, path: &Path, error: TreeError) {
        warn!("copy: skipping unreadable directory {} ({error})", path.display());
        self.builder_report.add_error(path.to_path_buf(), error.to_string());
    }
}

/// Create `path` (and missing parents) unless a directory is already there.
pub fn create_directory<P: AsRef<Path>>(path: P) -> EnumCreateOutcome {
    let path = path.as_ref();
    if path.is_dir() {
        return EnumCreateOutcome::AlreadyExists;
    }
    if path.exists() {
        return EnumCreateOutcome::Failed(format!(
            "Destination is a file, expected directory: {}",
            path.display()
        ));
    }
    match fs::create_dir_all(path) {
        Ok(()) => {
            debug!("mkdir {}", path.display());
            EnumCreateOutcome::Created
        }
        Err(e) => EnumCreateOutcome::Failed(e.to_string()),
    }
}

/// Copy one regular file.
///
/// When the source and destination encodings resolve to the same encoding
/// (the default), bytes are copied verbatim; otherwise text is decoded and
/// re-encoded chunk by chunk. The destination is always created/truncated.
/// On success the source modification time is applied when
/// [`SpecTransferPolicy::if_preserve_last_modified`] is set.
pub fn copy_file<P, Q>(
    file_source: P,
    file_destination: Q,
    spec_policy: &SpecTransferPolicy,
) -> Result<(), TreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = file_source.as_ref();
    let path_file_dst = file_destination.as_ref();

    if !path_file_src.exists() {
        return Err(TreeError::NotFound {
            path: path_file_src.to_path_buf(),
        });
    }
    if path_file_src.is_dir() {
        return Err(TreeError::SourceIsDirectory {
            path: path_file_src.to_path_buf(),
        });
    }
    if path_file_dst.is_dir() {
        return Err(TreeError::DestinationIsDirectory {
            path: path_file_dst.to_path_buf(),
        });
    }
    // truncating the destination would wipe the source
    if normalize_path(path_file_src) == normalize_path(path_file_dst) {
        return Err(TreeError::SourceDestinationOverlap {
            source_dir: path_file_src.to_path_buf(),
            destination_dir: path_file_dst.to_path_buf(),
        });
    }

    let encoding_src = resolve_encoding(spec_policy.encoding_source.as_deref());
    let encoding_dst = resolve_encoding(spec_policy.encoding_destination.as_deref());

    let file_src = File::open(path_file_src).map_err(|e| TreeError::io(path_file_src, e))?;
    let file_dst = File::create(path_file_dst).map_err(|e| TreeError::io(path_file_dst, e))?;
    let mut reader = BufReader::with_capacity(spec_policy.n_bytes_chunk.max(1), file_src);
    let mut writer = BufWriter::with_capacity(spec_policy.n_bytes_chunk.max(1), file_dst);

    let b_verbatim = encoding_src == encoding_dst;
    let res_stream = if b_verbatim {
        copy_bytes(&mut reader, &mut writer, spec_policy.n_bytes_chunk)
    } else {
        transcode_stream(
            &mut reader,
            &mut writer,
            encoding_src,
            encoding_dst,
            spec_policy.n_bytes_chunk,
        )
    };
    let n_bytes = res_stream.map_err(|e| TreeError::io(path_file_dst, e))?;
    writer.flush().map_err(|e| TreeError::io(path_file_dst, e))?;
    drop(writer);
    debug!(
        "copy {} -> {} ({n_bytes} bytes, {} -> {})",
        path_file_src.display(),
        path_file_dst.display(),
        encoding_src.name(),
        encoding_dst.name()
    );

    if spec_policy.if_preserve_xattrs && b_verbatim {
        copy_xattrs(path_file_src, path_file_dst);
    }
    if spec_policy.if_preserve_last_modified {
        copy_last_modified(path_file_src, path_file_dst)
            .map_err(|e| TreeError::io(path_file_dst, e))?;
    }
    Ok(())
}

/// Copy `file_source` into `dir_destination` under the same name.
///
/// Returns the destination path.
pub fn copy_file_to_directory<P, Q>(
    file_source: P,
    dir_destination: Q,
    spec_policy: &SpecTransferPolicy,
) -> Result<PathBuf, TreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_file_src = file_source.as_ref();
    let path_dir_dst = dir_destination.as_ref();
    if !path_dir_dst.exists() {
        return Err(TreeError::NotFound {
            path: path_dir_dst.to_path_buf(),
        });
    }
    if !path_dir_dst.is_dir() {
        return Err(TreeError::NotADirectory {
            path: path_dir_dst.to_path_buf(),
        });
    }
    let Some(name_file) = path_file_src.file_name() else {
        return Err(TreeError::NotFound {
            path: path_file_src.to_path_buf(),
        });
    };
    let path_file_dst = path_dir_dst.join(name_file);
    copy_file(path_file_src, &path_file_dst, spec_policy)?;
    Ok(path_file_dst)
}

/// Copy a directory tree from `dir_source` to `dir_destination`.
///
/// The destination is created when absent and merged into when present.
/// Selection follows [`crate::walk::plan_directory`]: include filter, then
/// exclude filter and exclude set as a per-directory set difference.
///
/// Returns [`ReportBatch`] once the walk completes, with per-entry failures
/// stored in the report and nothing rolled back. Returns [`TreeError`] only
/// for setup and validation failures.
pub fn copy_directory<P, Q>(
    dir_source: P,
    dir_destination: Q,
    spec_policy: &SpecTransferPolicy,
) -> Result<ReportBatch, TreeError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let path_dir_src = dir_source.as_ref();
    let path_dir_dst = dir_destination.as_ref();

    if !path_dir_src.is_dir() {
        return Err(TreeError::NotADirectory {
            path: path_dir_src.to_path_buf(),
        });
    }
    if is_overlap(path_dir_src, path_dir_dst) {
        return Err(TreeError::SourceDestinationOverlap {
            source_dir: path_dir_src.to_path_buf(),
            destination_dir: path_dir_dst.to_path_buf(),
        });
    }
    match create_directory(path_dir_dst) {
        EnumCreateOutcome::Created | EnumCreateOutcome::AlreadyExists => {}
        EnumCreateOutcome::Failed(_) if path_dir_dst.exists() => {
            return Err(TreeError::NotADirectory {
                path: path_dir_dst.to_path_buf(),
            });
        }
        EnumCreateOutcome::Failed(message) => {
            return Err(TreeError::io(path_dir_dst, std::io::Error::other(message)));
        }
    }

    let mut spec_cp_ctx = SpecCopyContext {
        path_dir_dst: path_dir_dst.to_path_buf(),
        spec_policy,
        builder_report: ReportBatchBuilder::default(),
    };
    walk(path_dir_src, spec_policy, &mut spec_cp_ctx)?;
    Ok(spec_cp_ctx.builder_report.build())
}

/// Copy `file` to `<file>.bak`, always keeping the modification time.
///
/// Returns the backup path.
pub fn new_backup_of<P: AsRef<Path>>(
    file: P,
    encoding_source: Option<&str>,
    encoding_destination: Option<&str>,
) -> Result<PathBuf, TreeError> {
    let path_file = file.as_ref();
    let mut os_backup = path_file.as_os_str().to_os_string();
    os_backup.push(SUFFIX_BACKUP);
    let path_backup = PathBuf::from(os_backup);

    let spec_policy = SpecTransferPolicy::default()
        .with_encodings(encoding_source, encoding_destination)
        .with_preserve_last_modified(true);
    copy_file(path_file, &path_backup, &spec_policy)?;
    Ok(path_backup)
}
