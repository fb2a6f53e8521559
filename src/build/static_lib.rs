//! Static library building
//!
//! Compiles every native source into an object file and archives the
//! objects into one static library:
//! ```bash
//! c++ -c core/a.cc -o build/temp/native/a.o <flags>
//! c++ -c core/b.cc -o build/temp/native/b.o <flags>
//! ar rcs build/libaboristcore.a build/temp/native/a.o build/temp/native/b.o
//! ```
//!
//! The archive is written into a scratch directory and renamed into place,
//! so the final path only ever holds a complete library.

use super::driver::{ArchiveJob, CompileJob, CompilerDriver};
use super::error::BuildError;
use super::flags::FlagSet;
use super::toolchain::ToolchainKind;
use super::types::{ArtifactKind, BuildArtifact, Macro};
use crate::sources::{Language, SourceSet, source_stem};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Static library builder
///
/// Compile loop is fail-fast: the first source that fails to compile aborts
/// the step and no later source is attempted.
#[derive(Debug, Clone)]
pub struct StaticLibBuilder {
    /// Library name without prefix or extension (`aboristcore`)
    name: String,
    /// Include directories for every native compile
    include_dirs: Vec<PathBuf>,
    /// Preprocessor macros for every native compile
    macros: Vec<Macro>,
    /// Enable verbose output
    verbose: bool,
}

impl StaticLibBuilder {
    /// Create a new static library builder
    #[must_use]
    pub fn new(name: &str, include_dirs: Vec<PathBuf>, macros: Vec<Macro>, verbose: bool) -> Self {
        Self {
            name: name.to_string(),
            include_dirs,
            macros,
            verbose,
        }
    }

    /// Library name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Final path of the library inside `out_dir`
    #[must_use]
    pub fn library_path(&self, toolchain: ToolchainKind, out_dir: &Path) -> PathBuf {
        out_dir.join(toolchain.static_library_file(&self.name))
    }

    /// Object paths for `sources`, one per source
    ///
    /// Objects are named after the source stem. A stem seen before gets a
    /// numeric suffix (`util.o`, `util-1.o`) so no object is overwritten.
    #[must_use]
    pub fn object_paths(
        toolchain: ToolchainKind,
        sources: &SourceSet,
        object_dir: &Path,
    ) -> Vec<PathBuf> {
        let ext = toolchain.object_extension();
        let mut seen = HashSet::new();

        sources
            .paths()
            .iter()
            .map(|source| {
                let stem = source_stem(source);
                let mut name = stem.clone();
                let mut counter = 1;
                while !seen.insert(name.clone()) {
                    name = format!("{stem}-{counter}");
                    counter += 1;
                }
                object_dir.join(format!("{name}.{ext}"))
            })
            .collect()
    }

    /// Build the static library.
    ///
    /// # Errors
    ///
    /// - `EmptySourceSet` / `InvalidSource` if `sources` is not a non-empty native set
    /// - `SourceCompileFailed` naming the first source that failed
    /// - `ArchiveFailed` if the archiver fails or the library cannot be moved into place
    /// - `Io` if the output directories cannot be prepared
    pub fn build(
        &self,
        driver: &dyn CompilerDriver,
        toolchain: ToolchainKind,
        flags: &FlagSet,
        sources: &SourceSet,
        out_dir: &Path,
    ) -> Result<BuildArtifact, BuildError> {
        if sources.language() != Language::Native {
            return Err(BuildError::InvalidSource {
                path: sources.paths().first().cloned().unwrap_or_default(),
                reason: "static library sources must be native".to_string(),
            });
        }
        if sources.is_empty() {
            return Err(BuildError::EmptySourceSet {
                language: Language::Native,
            });
        }

        let library = self.library_path(toolchain, out_dir);
        let object_dir = out_dir.join("temp").join("native");
        fs::create_dir_all(&object_dir).map_err(|e| BuildError::io(&object_dir, e))?;

        // A library from an earlier run must not survive a failed rebuild
        if library.exists() {
            fs::remove_file(&library).map_err(|e| BuildError::io(&library, e))?;
        }

        if self.verbose {
            println!("building '{}' library", self.name);
        }

        let objects = Self::object_paths(toolchain, sources, &object_dir);
        for (source, object) in sources.paths().iter().zip(&objects) {
            crate::debug!("compiling {} -> {}", source.display(), object.display());

            let job = CompileJob {
                toolchain,
                source,
                object,
                flags,
                include_dirs: &self.include_dirs,
                macros: &self.macros,
            };
            driver
                .compile(&job)
                .map_err(|failure| BuildError::SourceCompileFailed {
                    file: source.clone(),
                    toolchain,
                    flags: flags.compile_vec(),
                    detail: failure.to_string(),
                })?;
        }

        self.archive(driver, toolchain, &objects, &library, out_dir)?;

        Ok(BuildArtifact::new(ArtifactKind::StaticLibrary, library))
    }

    /// Archive into a scratch directory, then rename over the final path
    fn archive(
        &self,
        driver: &dyn CompilerDriver,
        toolchain: ToolchainKind,
        objects: &[PathBuf],
        library: &Path,
        out_dir: &Path,
    ) -> Result<(), BuildError> {
        let archive_failed = |detail: String| BuildError::ArchiveFailed {
            library: library.to_path_buf(),
            detail,
        };

        let staging = tempfile::Builder::new()
            .prefix(".archive-")
            .tempdir_in(out_dir)
            .map_err(|e| archive_failed(format!("cannot create staging directory: {e}")))?;
        let staged = staging
            .path()
            .join(toolchain.static_library_file(&self.name));

        let job = ArchiveJob {
            toolchain,
            objects,
            library: &staged,
        };
        driver
            .archive(&job)
            .map_err(|failure| archive_failed(failure.to_string()))?;

        if !staged.is_file() {
            return Err(archive_failed("archiver produced no library".to_string()));
        }

        fs::rename(&staged, library)
            .map_err(|e| archive_failed(format!("cannot move library into place: {e}")))?;

        if self.verbose {
            println!(
                "  Archived {} objects into {}",
                objects.len(),
                library.display()
            );
        }

        Ok(())
    }
}
