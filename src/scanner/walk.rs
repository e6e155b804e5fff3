//! Recursive repository walker.
//!
//! Yields every regular file under the root as a [`ScannedFile`]. Files
//! matching the ignore specification are still reported, with a `None`
//! fingerprint, so the indexer can tombstone anything it indexed before the
//! path became ignored. File contents are read once for hashing and
//! dropped; the walker never accumulates them.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use tracing::debug;

use super::fingerprint::blob_fingerprint;
use super::ignore::{IgnoreMatcher, to_posix};
use crate::error::ScanError;

/// One scanned file entry.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// POSIX-normalized repo-relative path.
    pub rel_path: String,
    /// File size in bytes (0 for ignored files, which are never read).
    pub size: u64,
    /// Git blob fingerprint, or `None` when the path is ignored.
    pub fingerprint: Option<String>,
}

/// Walks a repository root and fingerprints its regular files.
#[derive(Debug)]
pub struct FileScanner<'a> {
    root: PathBuf,
    matcher: &'a IgnoreMatcher,
}

impl<'a> FileScanner<'a> {
    /// Creates a scanner over `root` with the given ignore matcher.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, matcher: &'a IgnoreMatcher) -> Self {
        Self {
            root: root.into(),
            matcher,
        }
    }

    /// Returns a lazy iterator over all regular files under the root.
    ///
    /// The walker disables every built-in filter of the underlying crate:
    /// the `.ignore` file handed to [`IgnoreMatcher`] is the single source
    /// of exclusion truth. Only `.git` directories are skipped outright,
    /// since object databases are never indexable content.
    pub fn scan(&self) -> impl Iterator<Item = Result<ScannedFile, ScanError>> + '_ {
        let walk = WalkBuilder::new(&self.root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();

        walk.filter_map(move |entry| match entry {
            Ok(entry) => {
                let is_file = entry.file_type().is_some_and(|t| t.is_file());
                if !is_file {
                    return None;
                }
                Some(self.scan_entry(entry.path()))
            }
            Err(err) => Some(Err(ScanError::Walk(err))),
        })
    }

    /// Produces the scan record for a single file path.
    fn scan_entry(&self, path: &Path) -> Result<ScannedFile, ScanError> {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let rel_path = to_posix(&rel.to_string_lossy());

        if self.matcher.is_ignored(&rel_path) {
            debug!(path = %rel_path, "ignored");
            return Ok(ScannedFile {
                rel_path,
                size: 0,
                fingerprint: None,
            });
        }

        let bytes = std::fs::read(path).map_err(|source| ScanError::Unreadable {
            path: rel_path.clone(),
            source,
        })?;
        let fingerprint = blob_fingerprint(&bytes);
        Ok(ScannedFile {
            rel_path,
            size: bytes.len() as u64,
            fingerprint: Some(fingerprint),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn write_file(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap_or_else(|_| unreachable!());
        }
        fs::write(path, contents).unwrap_or_else(|_| unreachable!());
    }

    fn scan_to_map(scanner: &FileScanner<'_>) -> HashMap<String, Option<String>> {
        scanner
            .scan()
            .map(|r| r.unwrap_or_else(|_| unreachable!()))
            .map(|f| (f.rel_path, f.fingerprint))
            .collect()
    }

    #[test]
    fn test_scan_yields_fingerprints() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        write_file(dir.path(), "demo/main.py", "print('hi')\n");
        write_file(dir.path(), "README.md", "# demo\n");

        let matcher = IgnoreMatcher::from_lines(Vec::<&str>::new()).unwrap_or_else(|_| unreachable!());
        let scanner = FileScanner::new(dir.path(), &matcher);
        let files = scan_to_map(&scanner);

        assert_eq!(files.len(), 2);
        assert_eq!(
            files["demo/main.py"].as_deref(),
            Some(blob_fingerprint(b"print('hi')\n").as_str())
        );
        assert!(files["README.md"].is_some());
    }

    #[test]
    fn test_ignored_files_reported_with_nil_fingerprint() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        write_file(dir.path(), "src/lib.rs", "pub fn x() {}\n");
        write_file(dir.path(), "build/out.o", "\x00\x01");

        let matcher =
            IgnoreMatcher::from_lines(["build/"]).unwrap_or_else(|_| unreachable!());
        let scanner = FileScanner::new(dir.path(), &matcher);
        let files = scan_to_map(&scanner);

        assert!(files["src/lib.rs"].is_some());
        assert_eq!(files["build/out.o"], None);
    }

    #[test]
    fn test_git_directory_skipped() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        write_file(dir.path(), ".git/HEAD", "ref: refs/heads/main\n");
        write_file(dir.path(), "a.txt", "a\n");

        let matcher = IgnoreMatcher::from_lines(Vec::<&str>::new()).unwrap_or_else(|_| unreachable!());
        let scanner = FileScanner::new(dir.path(), &matcher);
        let files = scan_to_map(&scanner);

        assert_eq!(files.len(), 1);
        assert!(files.contains_key("a.txt"));
    }

    #[test]
    fn test_identical_content_same_fingerprint_across_paths() {
        let dir = tempfile::tempdir().unwrap_or_else(|_| unreachable!());
        write_file(dir.path(), "one.txt", "same bytes\n");
        write_file(dir.path(), "two.txt", "same bytes\n");

        let matcher = IgnoreMatcher::from_lines(Vec::<&str>::new()).unwrap_or_else(|_| unreachable!());
        let scanner = FileScanner::new(dir.path(), &matcher);
        let files = scan_to_map(&scanner);

        assert_eq!(files["one.txt"], files["two.txt"]);
    }
}
