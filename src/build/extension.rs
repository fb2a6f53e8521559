//! Extension module building
//!
//! Builds one loadable module per binding source:
//! ```bash
//! cython --cplus -3 pyborist/forest.pyx -o build/temp/binding/forest.cpp
//! c++ -c build/temp/binding/forest.cpp -o build/temp/binding/forest.o <flags>
//! c++ -shared -o build/pyborist/forest.so build/temp/binding/forest.o build/libaboristcore.a <link flags>
//! ```
//!
//! Modules are independent of one another and may be built in parallel.

use super::driver::{CompileJob, CompilerDriver, LinkJob, TranslateJob};
use super::error::BuildError;
use super::flags::FlagSet;
use super::toolchain::ToolchainKind;
use super::types::{ArtifactKind, BuildArtifact, ExtensionOutcome, Macro};
use crate::sources::source_stem;
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// What to do with the remaining modules after one fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Attempt every module; the build fails if any module failed
    #[default]
    Continue,
    /// Stop at the first failed module; the rest are recorded as skipped
    FailFast,
}

/// Shared inputs for every extension in one build
#[derive(Debug, Clone, Copy)]
pub struct ExtensionContext<'a> {
    pub toolchain: ToolchainKind,
    pub flags: &'a FlagSet,
    /// Static library every module links against
    pub static_library: &'a BuildArtifact,
    pub out_dir: &'a Path,
}

/// Extension module builder
#[derive(Debug, Clone)]
pub struct ExtensionBuilder {
    /// Package the modules belong to (`pyborist`)
    package: String,
    /// Include directories for translate and compile steps
    include_dirs: Vec<PathBuf>,
    /// Extra library search directories for the link step
    library_dirs: Vec<PathBuf>,
    /// Runtime libraries linked into every module
    libraries: Vec<String>,
    /// Preprocessor macros for every compile
    macros: Vec<Macro>,
    /// File suffix of built modules (`.so`, `.cpython-312-x86_64-linux-gnu.so`, `.pyd`)
    extension_suffix: String,
    /// Number of modules built at once
    jobs: usize,
    /// Enable verbose output
    verbose: bool,
}

impl ExtensionBuilder {
    /// Create a new extension builder for modules of `package`
    #[must_use]
    pub fn new(package: &str, extension_suffix: &str) -> Self {
        Self {
            package: package.to_string(),
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            libraries: Vec::new(),
            macros: Vec::new(),
            extension_suffix: extension_suffix.to_string(),
            jobs: 1,
            verbose: false,
        }
    }

    /// Set include directories
    #[must_use]
    pub fn include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    /// Set library search directories
    #[must_use]
    pub fn library_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.library_dirs = dirs;
        self
    }

    /// Set runtime libraries
    #[must_use]
    pub fn libraries(mut self, libraries: Vec<String>) -> Self {
        self.libraries = libraries;
        self
    }

    /// Set preprocessor macros
    #[must_use]
    pub fn macros(mut self, macros: Vec<Macro>) -> Self {
        self.macros = macros;
        self
    }

    /// Set the number of modules built at once (minimum 1)
    #[must_use]
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Enable verbose output
    #[must_use]
    pub const fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Dotted module name for a binding source (`pyborist.forest`)
    #[must_use]
    pub fn module_name(&self, source: &Path) -> String {
        format!("{}.{}", self.package, source_stem(source))
    }

    /// Final path of the module built from `source`
    #[must_use]
    pub fn module_path(&self, source: &Path, out_dir: &Path) -> PathBuf {
        out_dir
            .join(&self.package)
            .join(format!("{}{}", source_stem(source), self.extension_suffix))
    }

    /// Build every module in `sources`.
    ///
    /// Outcomes keep the order of `sources`. Under [`FailurePolicy::Continue`]
    /// with more than one job, modules are built on a thread pool.
    pub fn build_all(
        &self,
        driver: &dyn CompilerDriver,
        ctx: &ExtensionContext<'_>,
        sources: &[PathBuf],
        policy: FailurePolicy,
    ) -> Vec<ExtensionOutcome> {
        if policy == FailurePolicy::Continue && self.jobs > 1 && sources.len() > 1 {
            match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
                Ok(pool) => {
                    return pool.install(|| {
                        sources
                            .par_iter()
                            .map(|source| self.build_one(driver, ctx, source))
                            .collect()
                    });
                }
                Err(e) => {
                    crate::debug!("thread pool unavailable ({e}), building sequentially");
                }
            }
        }

        let mut outcomes = Vec::with_capacity(sources.len());
        let mut stopped = false;

        for source in sources {
            if stopped {
                outcomes.push(ExtensionOutcome::skipped(self.module_name(source), source));
                continue;
            }

            let outcome = self.build_one(driver, ctx, source);
            if !outcome.is_built() && policy == FailurePolicy::FailFast {
                stopped = true;
            }
            outcomes.push(outcome);
        }

        outcomes
    }

    /// Build the module for one binding source.
    ///
    /// Never panics and never touches other modules' files: a failure is
    /// recorded in the returned outcome.
    pub fn build_one(
        &self,
        driver: &dyn CompilerDriver,
        ctx: &ExtensionContext<'_>,
        source: &Path,
    ) -> ExtensionOutcome {
        let start_time = Instant::now();
        let module = self.module_name(source);

        if self.verbose {
            println!("building '{module}' extension");
        }

        match self.try_build(driver, ctx, source, &module) {
            Ok(artifact) => {
                ExtensionOutcome::built(module, source, artifact, start_time.elapsed())
            }
            Err(error) => {
                crate::debug!("extension {module} failed: {error}");
                ExtensionOutcome::failed(module, source, error, start_time.elapsed())
            }
        }
    }

    fn try_build(
        &self,
        driver: &dyn CompilerDriver,
        ctx: &ExtensionContext<'_>,
        source: &Path,
        module: &str,
    ) -> Result<BuildArtifact, BuildError> {
        let stem = source_stem(source);
        let temp_dir = ctx.out_dir.join("temp").join("binding");
        let module_dir = ctx.out_dir.join(&self.package);
        let output = self.module_path(source, ctx.out_dir);

        fs::create_dir_all(&temp_dir).map_err(|e| BuildError::io(&temp_dir, e))?;
        fs::create_dir_all(&module_dir).map_err(|e| BuildError::io(&module_dir, e))?;

        // A module from an earlier run must not survive a failed rebuild
        if output.exists() {
            fs::remove_file(&output).map_err(|e| BuildError::io(&output, e))?;
        }

        let compile_failed = |file: &Path, detail: String| BuildError::SourceCompileFailed {
            file: file.to_path_buf(),
            toolchain: ctx.toolchain,
            flags: ctx.flags.compile_vec(),
            detail,
        };

        // Step 1: binding source -> C++
        let generated = temp_dir.join(format!("{stem}.cpp"));
        driver
            .translate(&TranslateJob {
                source,
                output: &generated,
                include_dirs: &self.include_dirs,
            })
            .map_err(|failure| compile_failed(source, failure.to_string()))?;

        // Step 2: C++ -> object, with the library's compile flags
        let object = temp_dir.join(format!("{stem}.{}", ctx.toolchain.object_extension()));
        driver
            .compile(&CompileJob {
                toolchain: ctx.toolchain,
                source: &generated,
                object: &object,
                flags: ctx.flags,
                include_dirs: &self.include_dirs,
                macros: &self.macros,
            })
            .map_err(|failure| compile_failed(source, failure.to_string()))?;

        // Step 3: link into a scratch path, then move into place
        let link_failed = |detail: String| BuildError::LinkFailed {
            target: module.to_string(),
            toolchain: ctx.toolchain,
            flags: ctx.flags.link_vec(),
            detail,
        };

        let staging = tempfile::Builder::new()
            .prefix(".link-")
            .tempdir_in(&module_dir)
            .map_err(|e| BuildError::io(&module_dir, e))?;
        let staged = staging
            .path()
            .join(format!("{stem}{}", self.extension_suffix));
        let export_symbol = format!("PyInit_{stem}");

        driver
            .link(&LinkJob {
                toolchain: ctx.toolchain,
                object: &object,
                static_library: &ctx.static_library.path,
                output: &staged,
                flags: ctx.flags,
                library_dirs: &self.library_dirs,
                libraries: &self.libraries,
                export_symbol: &export_symbol,
            })
            .map_err(|failure| link_failed(failure.to_string()))?;

        if !staged.is_file() {
            return Err(link_failed("linker produced no module".to_string()));
        }

        fs::rename(&staged, &output)
            .map_err(|e| link_failed(format!("cannot move module into place: {e}")))?;

        Ok(BuildArtifact::new(ArtifactKind::ExtensionModule, output))
    }
}
