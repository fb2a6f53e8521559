//! Build artifact, target and outcome types

use super::error::BuildError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What kind of file a build step produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// Compiled object file (`.o` / `.obj`)
    Object,
    /// Archive of the core objects (`libfoo.a` / `foo.lib`)
    StaticLibrary,
    /// Loadable extension module (`.so` / `.pyd`)
    ExtensionModule,
}

/// A file produced by exactly one build step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifact {
    /// Artifact kind
    pub kind: ArtifactKind,
    /// Final location on disk
    pub path: PathBuf,
}

impl BuildArtifact {
    /// Create an artifact record
    #[must_use]
    pub fn new(kind: ArtifactKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

/// One requested output, enumerated before the build starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildTarget {
    /// The core static library (many sources -> one archive)
    StaticLibrary {
        /// Library name without prefix or extension
        name: String,
        /// Number of native sources archived into it
        sources: usize,
    },
    /// One extension module (one binding source -> one module)
    Extension {
        /// Dotted module name (`pyborist.forest`)
        module: String,
        /// Binding source
        source: PathBuf,
    },
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StaticLibrary { name, sources } => {
                write!(f, "library '{name}' ({sources} sources)")
            }
            Self::Extension { module, source } => {
                write!(f, "extension '{module}' ({})", source.display())
            }
        }
    }
}

/// Preprocessor macro definition (`NAME` or `NAME=VALUE`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    pub value: Option<String>,
}

impl Macro {
    /// Parse `NAME` or `NAME=VALUE`. Returns `None` for an empty name.
    #[must_use]
    pub fn parse(spec: &str) -> Option<Self> {
        let (name, value) = match spec.split_once('=') {
            Some((name, value)) => (name.trim(), Some(value.trim().to_string())),
            None => (spec.trim(), None),
        };

        (!name.is_empty()).then(|| Self {
            name: name.to_string(),
            value,
        })
    }
}

impl fmt::Display for Macro {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{}={value}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// What happened to one extension module
#[derive(Debug)]
pub enum ExtensionStatus {
    /// Module built and moved into place
    Built(BuildArtifact),
    /// Translate, compile or link failed
    Failed(BuildError),
    /// Not attempted because an earlier module failed under fail-fast
    Skipped,
}

/// Result of building one extension module
#[derive(Debug)]
pub struct ExtensionOutcome {
    /// Dotted module name
    pub module: String,

    /// Binding source the module was built from
    pub source: PathBuf,

    /// Outcome
    pub status: ExtensionStatus,

    /// Build duration
    pub duration: Duration,
}

impl ExtensionOutcome {
    /// Create a successful outcome
    #[must_use]
    pub fn built(
        module: String,
        source: &Path,
        artifact: BuildArtifact,
        duration: Duration,
    ) -> Self {
        Self {
            module,
            source: source.to_path_buf(),
            status: ExtensionStatus::Built(artifact),
            duration,
        }
    }

    /// Create a failed outcome
    #[must_use]
    pub fn failed(module: String, source: &Path, error: BuildError, duration: Duration) -> Self {
        Self {
            module,
            source: source.to_path_buf(),
            status: ExtensionStatus::Failed(error),
            duration,
        }
    }

    /// Create an outcome for a module that was never attempted
    #[must_use]
    pub fn skipped(module: String, source: &Path) -> Self {
        Self {
            module,
            source: source.to_path_buf(),
            status: ExtensionStatus::Skipped,
            duration: Duration::ZERO,
        }
    }

    /// Whether the module was built
    #[must_use]
    pub const fn is_built(&self) -> bool {
        matches!(self.status, ExtensionStatus::Built(_))
    }

    /// Artifact, if built
    #[must_use]
    pub const fn artifact(&self) -> Option<&BuildArtifact> {
        match &self.status {
            ExtensionStatus::Built(artifact) => Some(artifact),
            _ => None,
        }
    }

    /// Error, if failed
    #[must_use]
    pub const fn error(&self) -> Option<&BuildError> {
        match &self.status {
            ExtensionStatus::Failed(error) => Some(error),
            _ => None,
        }
    }
}
