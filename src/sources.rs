//! Source inventory
//!
//! Scans the native and binding source directories and produces validated,
//! ordered source sets for the builders.

use crate::build::BuildError;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Language of a source set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    /// Native C++ sources compiled into the core static library (`.cc`)
    Native,
    /// Cython binding sources, one per extension module (`.pyx`)
    Binding,
}

impl Language {
    /// File extension (without the dot) expected for this language
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Native => "cc",
            Self::Binding => "pyx",
        }
    }

    /// Whether `path` carries this language's extension
    #[must_use]
    pub fn matches(self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(self.extension()))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Native => write!(f, "native (.cc)"),
            Self::Binding => write!(f, "binding (.pyx)"),
        }
    }
}

/// Ordered, validated list of source files of one language
///
/// Every path exists, is a regular file and has the language's extension.
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    language: Language,
    paths: Vec<PathBuf>,
}

impl SourceSet {
    /// Build a source set from explicit paths, keeping their order.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSource` for a missing path, a non-file, or a path with
    /// the wrong extension.
    pub fn new(language: Language, paths: Vec<PathBuf>) -> Result<Self, BuildError> {
        for path in &paths {
            validate(language, path)?;
        }

        Ok(Self { language, paths })
    }

    /// Scan `dir` (non-recursively) for files of `language`, sorted by path.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be read.
    pub fn scan(dir: &Path, language: Language) -> Result<Self, BuildError> {
        Self::scan_with_extra(dir, language, Vec::new())
    }

    /// Scan `dir` and append `extra` paths after the scanned ones.
    ///
    /// Extra paths are validated like scanned ones. A path that the scan
    /// already found is not added twice.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the directory cannot be read, or
    /// `InvalidSource` if an extra path is invalid.
    pub fn scan_with_extra(
        dir: &Path,
        language: Language,
        extra: Vec<PathBuf>,
    ) -> Result<Self, BuildError> {
        let entries = fs::read_dir(dir).map_err(|e| BuildError::io(dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| BuildError::io(dir, e))?;
            let path = entry.path();

            if path.is_file() && language.matches(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        for path in extra {
            if !paths.contains(&path) {
                paths.push(path);
            }
        }

        Self::new(language, paths)
    }

    /// Language of every file in the set
    #[must_use]
    pub const fn language(&self) -> Language {
        self.language
    }

    /// Source paths, in build order
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    /// Number of sources
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether the set is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Directories containing the sources, deduplicated in first-seen order
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for dir in self.paths.iter().filter_map(|p| p.parent()) {
            if !dirs.iter().any(|d| d == dir) {
                dirs.push(dir.to_path_buf());
            }
        }
        dirs
    }
}

fn validate(language: Language, path: &Path) -> Result<(), BuildError> {
    if !path.exists() {
        return Err(BuildError::InvalidSource {
            path: path.to_path_buf(),
            reason: "file does not exist".to_string(),
        });
    }

    if !path.is_file() {
        return Err(BuildError::InvalidSource {
            path: path.to_path_buf(),
            reason: "not a regular file".to_string(),
        });
    }

    if !language.matches(path) {
        return Err(BuildError::InvalidSource {
            path: path.to_path_buf(),
            reason: format!("expected a .{} file", language.extension()),
        });
    }

    Ok(())
}

/// Module stem of a source file (`pyborist/forest.pyx` -> `forest`)
#[must_use]
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map_or_else(String::new, |s| s.to_string_lossy().into_owned())
}
