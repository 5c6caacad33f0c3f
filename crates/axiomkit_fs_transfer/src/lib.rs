//! `axiomkit_fs_transfer` v1:
//! Filtered recursive file-tree transfer engine.
//!
//! Modules, leaf-first:
//! - `entry`  : path plus one-shot metadata snapshot
//! - `filter` : entry predicates and the explicit exclude set
//! - `walk`   : include/exclude planning and depth-first traversal
//! - `copy`   : file/directory copy, transcoding, backups
//! - `delete` : recursive, filtered and suffix/prefix deletes
//! - `rename` : atomic rename with copy+delete fallback, name derivations
//! - `search` : wildcard/regex/extension lookups, membership, counts
//! - `spec`   : policy/enums/errors
//! - `report` : per-call batch report model
//! - `digest` : content digests for verified moves
//! - `quiet`  : log-and-return-bool adapters
//!
//! Everything runs synchronously on the caller's thread. The crate emits
//! `tracing` events and installs no subscriber.

pub mod copy;
pub mod delete;
pub mod digest;
pub mod entry;
pub mod filter;
pub mod quiet;
pub mod rename;
pub mod report;
pub mod search;
pub mod spec;
mod util;
pub mod walk;

pub use copy::{
    SUFFIX_BACKUP, copy_directory, copy_file, copy_file_to_directory, create_directory,
    new_backup_of,
};
pub use delete::{
    check_deletable, delete, delete_all_with_prefix, delete_all_with_suffix, delete_tree,
    delete_with_filter,
};
pub use digest::{ContentDigest, Sha256Digest, digest_file};
pub use entry::Entry;
pub use filter::{
    EntryFilter, FilterExtensions, FilterGlobSet, FilterNameGlob, FilterPredicate, FilterRegex,
    SetExclude,
};
pub use rename::{
    append_timestamp_to_name, change_extension, change_extension_recursively, rename_or_move,
    rename_or_move_verified, rename_with_new_name,
};
pub use report::{ReportBatch, ReportBatchBuilder, SpecPathError};
pub use search::{
    contains, contains_recursive, count_all, find_by_extensions, find_recursive,
    find_recursive_regex,
};
pub use spec::{
    EnumCreateOutcome, EnumRenameOutcome, EnumWalkDecision, N_BYTES_CHUNK_DEFAULT, Result,
    SpecTransferPolicy, TreeError,
};
pub use walk::{TreeVisitor, list_directory, plan_directory, walk};
