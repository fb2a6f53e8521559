//! arborist-build internal library code

pub mod build;
pub mod config;
pub mod debug;
pub mod env_vars;
pub mod python;
pub mod sources;

#[cfg(test)]
pub mod test_utils;

// Re-export common types for convenience
pub use build::{
    ArtifactKind, BuildArtifact, BuildError, BuildOrchestrator, BuildReport, BuildState,
    BuildStep, BuildTarget, CompilerDriver, ExtensionBuilder, ExtensionOutcome, ExtensionStatus,
    FailurePolicy, FlagPolicy, FlagSet, Macro, ProcessDriver, StaticLibBuilder, ToolFailure,
    ToolchainKind,
};
pub use config::Config;
pub use debug::{init_debug, is_debug_enabled};
pub use python::{PythonEnv, default_extension_suffix};
pub use sources::{Language, SourceSet};
