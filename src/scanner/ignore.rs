//! Ignore specification loaded from a single gitignore-syntax file.
//!
//! Patterns are matched against POSIX-normalized repo-relative paths. A
//! matching path is treated as absent for all purposes: no chunks, no
//! manifest entry, and existing chunks are deleted on the next run.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::error::ConfigError;

/// Normalizes a path string to POSIX form: forward slashes, no duplicate
/// separators, no leading `./`.
#[must_use]
pub fn to_posix(path: &str) -> String {
    let mut s = path.replace('\\', "/");
    while s.contains("//") {
        s = s.replace("//", "/");
    }
    if let Some(stripped) = s.strip_prefix("./") {
        s = stripped.to_string();
    }
    s
}

/// Gitignore-syntax matcher over repo-relative paths.
#[derive(Debug)]
pub struct IgnoreMatcher {
    inner: Gitignore,
}

impl IgnoreMatcher {
    /// Loads the ignore file. The file must exist; an index run without an
    /// exclusion list would happily ingest build artifacts and secrets
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IgnoreFileMissing`] when the file does not
    /// exist and [`ConfigError::InvalidValue`] when a pattern fails to
    /// parse.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::IgnoreFileMissing {
                path: path.to_path_buf(),
            });
        }
        let mut builder = GitignoreBuilder::new("");
        if let Some(err) = builder.add(path) {
            return Err(ConfigError::InvalidValue {
                name: "ignore_file",
                value: err.to_string(),
            });
        }
        let inner = builder.build().map_err(|err| ConfigError::InvalidValue {
            name: "ignore_file",
            value: err.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// Builds a matcher from in-memory pattern lines (used by tests and
    /// embedded defaults).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when a pattern fails to parse.
    pub fn from_lines<I, S>(lines: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GitignoreBuilder::new("");
        for line in lines {
            builder
                .add_line(None, line.as_ref())
                .map_err(|err| ConfigError::InvalidValue {
                    name: "ignore_file",
                    value: err.to_string(),
                })?;
        }
        let inner = builder.build().map_err(|err| ConfigError::InvalidValue {
            name: "ignore_file",
            value: err.to_string(),
        })?;
        Ok(Self { inner })
    }

    /// Returns `true` when the POSIX-normalized relative path matches the
    /// ignore specification (directly or through an ignored parent).
    #[must_use]
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        let posix = to_posix(rel_path);
        self.inner
            .matched_path_or_any_parents(Path::new(&posix), false)
            .is_ignore()
    }
}
