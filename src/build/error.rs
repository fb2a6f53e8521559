//! Build error taxonomy

use super::toolchain::ToolchainKind;
use crate::sources::Language;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building the static library or extension modules
///
/// Compile and link failures carry the toolchain kind and the flags that were
/// in effect so the failing command can be reproduced by hand.
#[derive(Error, Debug)]
pub enum BuildError {
    /// Compiler driver not recognized; fallback flags were applied
    #[error("Unrecognized compiler driver '{driver}', using {fallback} flags")]
    ToolchainUnrecognized {
        driver: String,
        fallback: ToolchainKind,
    },

    /// A source file failed to compile
    #[error(
        "Failed to compile {} with {toolchain} toolchain (flags: {}): {detail}",
        .file.display(),
        .flags.join(" ")
    )]
    SourceCompileFailed {
        file: PathBuf,
        toolchain: ToolchainKind,
        flags: Vec<String>,
        detail: String,
    },

    /// An extension module failed to link
    #[error(
        "Failed to link {target} with {toolchain} toolchain (flags: {}): {detail}",
        .flags.join(" ")
    )]
    LinkFailed {
        target: String,
        toolchain: ToolchainKind,
        flags: Vec<String>,
        detail: String,
    },

    /// The static library could not be archived
    #[error("Failed to archive static library {}: {detail}", .library.display())]
    ArchiveFailed { library: PathBuf, detail: String },

    /// A source path does not belong in its source set
    #[error("Invalid source {}: {reason}", .path.display())]
    InvalidSource { path: PathBuf, reason: String },

    /// Nothing to build
    #[error("No {language} sources to build")]
    EmptySourceSet { language: Language },

    /// Filesystem error around the build directories
    #[error("IO error for '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BuildError {
    /// Wrap an IO error with the path it happened on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether the build can continue after this error
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, Self::ToolchainUnrecognized { .. })
    }
}
