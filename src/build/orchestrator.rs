//! Build orchestration
//!
//! Drives one build invocation through its steps, in dependency order:
//!
//! ```text
//! Init -> ToolchainDetected -> StaticLibBuilt -> ExtensionsBuilt -> Done
//!   \__________________\______________\________________\-----> Error
//! ```
//!
//! The toolchain is identified once, and the flag set derived from it is
//! handed explicitly to both builders. Every extension links against the
//! static library, so a library failure ends the build before any
//! extension is attempted. Failed steps are never retried.

use super::driver::CompilerDriver;
use super::error::BuildError;
use super::extension::{ExtensionBuilder, ExtensionContext, FailurePolicy};
use super::flags::{FlagPolicy, FlagSet};
use super::static_lib::StaticLibBuilder;
use super::toolchain::ToolchainKind;
use super::types::{BuildArtifact, BuildTarget, ExtensionOutcome, ExtensionStatus};
use crate::sources::{Language, SourceSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Orchestrator state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Init,
    ToolchainDetected,
    StaticLibBuilt,
    ExtensionsBuilt,
    Done,
    /// Absorbing: reached from any step on a fatal failure
    Error,
}

/// Step a fatal failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStep {
    /// Validating the requested targets
    Plan,
    /// Compiling and archiving the static library
    StaticLibrary,
    /// Building extension modules
    Extensions,
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plan => write!(f, "planning"),
            Self::StaticLibrary => write!(f, "static library"),
            Self::Extensions => write!(f, "extension"),
        }
    }
}

/// Fatal failure of a whole step
#[derive(Debug)]
pub struct StepFailure {
    pub step: BuildStep,
    pub error: BuildError,
}

/// Everything one build invocation produced
#[derive(Debug)]
pub struct BuildReport {
    /// Toolchain in effect
    pub toolchain: ToolchainKind,
    /// Flags every unit was built with
    pub flags: &'static FlagSet,
    /// Non-fatal problems (unrecognized toolchain)
    pub warnings: Vec<BuildError>,
    /// Targets enumerated at the start of the build
    pub targets: Vec<BuildTarget>,
    /// Static library, if built
    pub library: Option<BuildArtifact>,
    /// Fatal failure of the planning or static library step
    pub failure: Option<StepFailure>,
    /// Per-module outcomes, in binding source order
    pub extensions: Vec<ExtensionOutcome>,
    /// Final orchestrator state (`Done` or `Error`)
    pub state: BuildState,
    /// Wall time of the whole build
    pub duration: Duration,
}

impl BuildReport {
    /// Whether every requested artifact was built
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.state == BuildState::Done
            && self.failure.is_none()
            && self.extensions.iter().all(ExtensionOutcome::is_built)
    }

    /// Step that failed, if any
    #[must_use]
    pub fn failed_step(&self) -> Option<BuildStep> {
        if let Some(failure) = &self.failure {
            return Some(failure.step);
        }
        self.extensions
            .iter()
            .any(|o| !o.is_built())
            .then_some(BuildStep::Extensions)
    }

    /// First failure of the build, if any
    #[must_use]
    pub fn first_failure(&self) -> Option<&BuildError> {
        self.failure
            .as_ref()
            .map(|f| &f.error)
            .or_else(|| self.extensions.iter().find_map(ExtensionOutcome::error))
    }

    /// Successfully produced artifacts: the library, then every built module
    ///
    /// Failed and skipped modules are never listed.
    #[must_use]
    pub fn artifacts(&self) -> Vec<&BuildArtifact> {
        self.library
            .iter()
            .chain(self.extensions.iter().filter_map(ExtensionOutcome::artifact))
            .collect()
    }

    /// One-line description of the failing step and artifact
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        if let Some(failure) = &self.failure {
            return Some(format!("{} step failed: {}", failure.step, failure.error));
        }

        self.extensions.iter().find_map(|outcome| match &outcome.status {
            ExtensionStatus::Failed(error) => Some(format!(
                "extension step failed for '{}': {error}",
                outcome.module
            )),
            _ => None,
        })
    }

    /// (`built`, `failed`, `skipped`) extension counts
    #[must_use]
    pub fn summarize(&self) -> (usize, usize, usize) {
        self.extensions
            .iter()
            .fold((0, 0, 0), |(built, failed, skipped), o| match o.status {
                ExtensionStatus::Built(_) => (built + 1, failed, skipped),
                ExtensionStatus::Failed(_) => (built, failed + 1, skipped),
                ExtensionStatus::Skipped => (built, failed, skipped + 1),
            })
    }
}

/// Build orchestrator
///
/// Owns the two builders and the output directory, and walks the build
/// state machine once per [`BuildOrchestrator::run`].
#[derive(Debug)]
pub struct BuildOrchestrator {
    library: StaticLibBuilder,
    extensions: ExtensionBuilder,
    out_dir: PathBuf,
    policy: FailurePolicy,
    state: BuildState,
}

impl BuildOrchestrator {
    /// Create an orchestrator writing into `out_dir`
    #[must_use]
    pub fn new(
        library: StaticLibBuilder,
        extensions: ExtensionBuilder,
        out_dir: impl Into<PathBuf>,
        policy: FailurePolicy,
    ) -> Self {
        Self {
            library,
            extensions,
            out_dir: out_dir.into(),
            policy,
            state: BuildState::Init,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> BuildState {
        self.state
    }

    /// Output directory
    #[must_use]
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Enumerate the targets a build of these sources produces
    #[must_use]
    pub fn plan(&self, native: &SourceSet, binding: &SourceSet) -> Vec<BuildTarget> {
        let mut targets = vec![BuildTarget::StaticLibrary {
            name: self.library.name().to_string(),
            sources: native.len(),
        }];
        targets.extend(binding.paths().iter().map(|source| BuildTarget::Extension {
            module: self.extensions.module_name(source),
            source: source.clone(),
        }));
        targets
    }

    /// Run a full build.
    ///
    /// `compiler` is the active compiler driver's identifying name. It is
    /// classified once; the resulting kind and flags are used for every step.
    pub fn run(
        &mut self,
        driver: &dyn CompilerDriver,
        compiler: &str,
        native: &SourceSet,
        binding: &SourceSet,
    ) -> BuildReport {
        let start_time = Instant::now();
        self.state = BuildState::Init;

        let mut warnings = Vec::new();
        let toolchain = ToolchainKind::recognize(compiler).unwrap_or_else(|| {
            let fallback = ToolchainKind::default();
            warnings.push(BuildError::ToolchainUnrecognized {
                driver: compiler.to_string(),
                fallback,
            });
            fallback
        });
        let flags = FlagPolicy::for_kind(toolchain);
        self.transition(BuildState::ToolchainDetected);
        crate::debug!("toolchain {toolchain} from driver '{compiler}', {flags}");

        let targets = self.plan(native, binding);
        let mut report = BuildReport {
            toolchain,
            flags,
            warnings,
            targets,
            library: None,
            failure: None,
            extensions: Vec::new(),
            state: self.state,
            duration: Duration::ZERO,
        };

        if binding.language() != Language::Binding {
            report.failure = Some(StepFailure {
                step: BuildStep::Plan,
                error: BuildError::InvalidSource {
                    path: binding.paths().first().cloned().unwrap_or_default(),
                    reason: "extension sources must be binding sources".to_string(),
                },
            });
            return self.finish(report, BuildState::Error, start_time);
        }

        let library = match self
            .library
            .build(driver, toolchain, flags, native, &self.out_dir)
        {
            Ok(artifact) => artifact,
            Err(error) => {
                report.failure = Some(StepFailure {
                    step: BuildStep::StaticLibrary,
                    error,
                });
                return self.finish(report, BuildState::Error, start_time);
            }
        };
        self.transition(BuildState::StaticLibBuilt);

        let ctx = ExtensionContext {
            toolchain,
            flags,
            static_library: &library,
            out_dir: &self.out_dir,
        };
        report.extensions = self
            .extensions
            .build_all(driver, &ctx, binding.paths(), self.policy);
        report.library = Some(library);

        let aborted = self.policy == FailurePolicy::FailFast
            && report.extensions.iter().any(|o| !o.is_built());
        if aborted {
            return self.finish(report, BuildState::Error, start_time);
        }

        self.transition(BuildState::ExtensionsBuilt);
        self.finish(report, BuildState::Done, start_time)
    }

    fn transition(&mut self, next: BuildState) {
        crate::debug!("build state {:?} -> {next:?}", self.state);
        self.state = next;
    }

    fn finish(
        &mut self,
        mut report: BuildReport,
        state: BuildState,
        start_time: Instant,
    ) -> BuildReport {
        self.transition(state);
        report.state = state;
        report.duration = start_time.elapsed();
        report
    }
}
