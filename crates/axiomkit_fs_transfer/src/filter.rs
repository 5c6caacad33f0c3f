//! Entry filters: pure predicates over an [`Entry`] snapshot.
//!
//! Filters see only the bare name and the metadata already captured in the
//! entry. They are combined by the walker as `include && !exclude_set`, where
//! the exclude set is computed once per directory listing.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use regex::Regex;

use crate::entry::Entry;
use crate::spec::TreeError;
use crate::util::{normalize_path, strip_suffix_ignore_case, wildcard_to_regex};

/// Predicate used to select directory entries.
pub trait EntryFilter: fmt::Debug + Send + Sync {
    /// `true` when `entry` is selected. Must not panic or touch the filesystem.
    fn matches(&self, entry: &Entry) -> bool;
}

impl<T: EntryFilter + ?Sized> EntryFilter for Arc<T> {
    fn matches(&self, entry: &Entry) -> bool {
        (**self).matches(entry)
    }
}

////////////////////////////////////////////////////////////////////////////////
// #region NameFilters

/// `*`/`?` wildcard over the bare name, case-sensitive and anchored.
#[derive(Debug, Clone)]
pub struct FilterNameGlob {
    pattern: String,
    regex: Regex,
    if_accept_dirs: bool,
}

impl FilterNameGlob {
    pub fn new(pattern: &str) -> Result<Self, TreeError> {
        let regex = Regex::new(&wildcard_to_regex(pattern))
            .map_err(|e| TreeError::InvalidPattern(format!("{pattern}: {e}")))?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            if_accept_dirs: false,
        })
    }

    /// Accept every directory so a walk can descend past non-matching names.
    pub fn accept_directories(mut self, if_accept_dirs: bool) -> Self {
        self.if_accept_dirs = if_accept_dirs;
        self
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Match a bare name, ignoring the directory flag.
    pub fn is_match_name(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }
}

impl EntryFilter for FilterNameGlob {
    fn matches(&self, entry: &Entry) -> bool {
        (self.if_accept_dirs && entry.is_dir()) || self.regex.is_match(entry.name())
    }
}

/// Raw regular expression over the bare name (unanchored unless the pattern is).
#[derive(Debug, Clone)]
pub struct FilterRegex {
    regex: Regex,
    if_accept_dirs: bool,
}

impl FilterRegex {
    pub fn new(pattern: &str) -> Result<Self, TreeError> {
        let regex = Regex::new(pattern)
            .map_err(|e| TreeError::InvalidPattern(format!("{pattern}: {e}")))?;
        Ok(Self {
            regex,
            if_accept_dirs: false,
        })
    }

    pub fn accept_directories(mut self, if_accept_dirs: bool) -> Self {
        self.if_accept_dirs = if_accept_dirs;
        self
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}

impl EntryFilter for FilterRegex {
    fn matches(&self, entry: &Entry) -> bool {
        (self.if_accept_dirs && entry.is_dir()) || self.regex.is_match(entry.name())
    }
}

/// Any of several shell globs (`*`, `?`, `[...]`, `{a,b}`) over the bare name.
#[derive(Debug, Clone)]
pub struct FilterGlobSet {
    l_patterns: Vec<String>,
    glob_set: GlobSet,
    if_accept_dirs: bool,
}

impl FilterGlobSet {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, TreeError> {
        let mut builder = GlobSetBuilder::new();
        let mut l_patterns = Vec::with_capacity(patterns.len());
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern)
                .map_err(|e| TreeError::InvalidPattern(format!("{pattern}: {e}")))?;
            builder.add(glob);
            l_patterns.push(pattern.to_string());
        }
        let glob_set = builder
            .build()
            .map_err(|e| TreeError::InvalidPattern(e.to_string()))?;
        Ok(Self {
            l_patterns,
            glob_set,
            if_accept_dirs: false,
        })
    }

    pub fn accept_directories(mut self, if_accept_dirs: bool) -> Self {
        self.if_accept_dirs = if_accept_dirs;
        self
    }

    pub fn patterns(&self) -> &[String] {
        &self.l_patterns
    }
}

impl EntryFilter for FilterGlobSet {
    fn matches(&self, entry: &Entry) -> bool {
        (self.if_accept_dirs && entry.is_dir()) || self.glob_set.is_match(entry.name())
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExtensionAndPredicate

/// Case-insensitive suffix set.
///
/// With `if_accept_dirs`, directories always match so that a recursive walk
/// is not cut off by an extension check meant for files.
#[derive(Debug, Clone)]
pub struct FilterExtensions {
    l_suffixes: Vec<String>,
    if_accept_dirs: bool,
}

impl FilterExtensions {
    pub fn new<S: AsRef<str>>(suffixes: &[S], if_accept_dirs: bool) -> Self {
        Self {
            l_suffixes: suffixes
                .iter()
                .map(|s| s.as_ref().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            if_accept_dirs,
        }
    }

    pub fn is_match_name(&self, name: &str) -> bool {
        self.l_suffixes
            .iter()
            .any(|s| strip_suffix_ignore_case(name, s).is_some())
    }
}

impl EntryFilter for FilterExtensions {
    fn matches(&self, entry: &Entry) -> bool {
        if entry.is_dir() {
            return self.if_accept_dirs || self.is_match_name(entry.name());
        }
        self.is_match_name(entry.name())
    }
}

/// Caller-supplied predicate.
pub struct FilterPredicate<F>
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    label: String,
    f_test: F,
}

impl<F> FilterPredicate<F>
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    /// `label` only shows up in `Debug` output.
    pub fn new(label: &str, f_test: F) -> Self {
        Self {
            label: label.to_string(),
            f_test,
        }
    }
}

impl<F> fmt::Debug for FilterPredicate<F>
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterPredicate")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

impl<F> EntryFilter for FilterPredicate<F>
where
    F: Fn(&Entry) -> bool + Send + Sync,
{
    fn matches(&self, entry: &Entry) -> bool {
        (self.f_test)(entry)
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region ExcludeSet

/// Explicit paths to skip. Membership compares resolved paths.
#[derive(Debug, Clone, Default)]
pub struct SetExclude {
    set_paths: HashSet<PathBuf>,
}

impl SetExclude {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<P: AsRef<Path>>(&mut self, path: P) -> bool {
        self.set_paths.insert(normalize_path(path.as_ref()))
    }

    pub fn contains<P: AsRef<Path>>(&self, path: P) -> bool {
        if self.set_paths.is_empty() {
            return false;
        }
        self.set_paths.contains(&normalize_path(path.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.set_paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set_paths.is_empty()
    }
}

impl<P: AsRef<Path>> FromIterator<P> for SetExclude {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut set_exclude = Self::new();
        for path in iter {
            set_exclude.insert(path);
        }
        set_exclude
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::{
        EntryFilter, FilterExtensions, FilterGlobSet, FilterNameGlob, FilterPredicate,
        FilterRegex, SetExclude,
    };
    use crate::entry::Entry;
    use crate::spec::TreeError;

    fn touch(dir: &std::path::Path, name: &str) -> Entry {
        let path = dir.join(name);
        std::fs::write(&path, "x").expect("write");
        Entry::from_path(path)
    }

    #[test]
    fn glob_matches_bare_name_case_sensitively() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let filter = FilterNameGlob::new("*.txt").expect("glob");

        assert!(filter.matches(&touch(tmp.path(), "a.txt")));
        assert!(!filter.matches(&touch(tmp.path(), "b.TXT")));
        assert!(!filter.matches(&touch(tmp.path(), "atxt")));
        assert!(!filter.matches(&touch(tmp.path(), "a.txt.bak")));
    }

    #[test]
    fn glob_question_mark_is_single_char() {
        let filter = FilterNameGlob::new("file?.log").expect("glob");
        assert!(filter.is_match_name("file1.log"));
        assert!(!filter.is_match_name("file10.log"));
    }

    #[test]
    fn glob_directories_only_pass_when_accepted() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(tmp.path().join("sub")).expect("mkdir");
        let entry_dir = Entry::from_path(tmp.path().join("sub"));

        let filter = FilterNameGlob::new("*.txt").expect("glob");
        assert!(!filter.matches(&entry_dir));
        assert!(filter.accept_directories(true).matches(&entry_dir));
    }

    #[test]
    fn extensions_are_case_insensitive() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let filter = FilterExtensions::new(&[".JPG", ".png"], false);

        assert!(filter.matches(&touch(tmp.path(), "photo.jpg")));
        assert!(filter.matches(&touch(tmp.path(), "Shot.PNG")));
        assert!(!filter.matches(&touch(tmp.path(), "doc.txt")));

        let filter_accented = FilterExtensions::new(&[".ÉTÉ"], false);
        assert!(filter_accented.matches(&touch(tmp.path(), "a.été")));
        assert!(filter_accented.is_match_name("B.Été"));
        assert!(!filter_accented.is_match_name("c.ete"));
    }

    #[test]
    fn extensions_directory_flag_controls_descent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(tmp.path().join("album")).expect("mkdir");
        let entry_dir = Entry::from_path(tmp.path().join("album"));

        assert!(FilterExtensions::new(&[".jpg"], true).matches(&entry_dir));
        assert!(!FilterExtensions::new(&[".jpg"], false).matches(&entry_dir));
    }

    #[test]
    fn predicate_and_regex_filters() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let entry_big = {
            let path = tmp.path().join("big.bin");
            std::fs::write(&path, vec![0u8; 64]).expect("write");
            Entry::from_path(path)
        };
        let entry_small = touch(tmp.path(), "report_01.csv");

        let filter_size = FilterPredicate::new("larger than 10 bytes", |e: &Entry| {
            e.byte_len() > 10
        });
        assert!(filter_size.matches(&entry_big));
        assert!(!filter_size.matches(&entry_small));
        assert!(format!("{filter_size:?}").contains("larger than 10 bytes"));

        let filter_regex = FilterRegex::new(r"^report_\d+\.csv$").expect("regex");
        assert!(filter_regex.matches(&entry_small));
        assert!(!filter_regex.matches(&entry_big));
    }

    #[test]
    fn glob_set_supports_char_classes() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let filter = FilterGlobSet::new(&["file[0-9].txt", "*.md"]).expect("globset");

        assert!(filter.matches(&touch(tmp.path(), "file1.txt")));
        assert!(filter.matches(&touch(tmp.path(), "notes.md")));
        assert!(!filter.matches(&touch(tmp.path(), "filea.txt")));
        assert_eq!(filter.patterns().len(), 2);
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        assert!(matches!(
            FilterRegex::new("("),
            Err(TreeError::InvalidPattern(_))
        ));
        assert!(matches!(
            FilterGlobSet::new(&["["]),
            Err(TreeError::InvalidPattern(_))
        ));
    }

    #[test]
    fn exclude_set_compares_resolved_paths() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir(tmp.path().join("sub")).expect("mkdir");
        let entry = touch(tmp.path(), "a.txt");

        let set_exclude: SetExclude = [tmp.path().join("sub").join("..").join("a.txt")]
            .into_iter()
            .collect();
        assert!(set_exclude.contains(entry.path()));
        assert!(!set_exclude.contains(tmp.path().join("b.txt")));
        assert_eq!(set_exclude.len(), 1);
    }
}
