//! Native library and extension module building
//!
//! Builds the core static library from the native sources, then one Python
//! extension module per binding source, all with the flag set selected for
//! the active toolchain.
//!
//! Steps, in order:
//! - Toolchain identification (`toolchain`)
//! - Flag lookup (`flags`)
//! - Static library (`static_lib`)
//! - Extension modules (`extension`)
//!
//! `orchestrator` wires the steps together; `driver` runs the external tools.

pub mod driver;
pub mod error;
pub mod extension;
pub mod flags;
pub mod orchestrator;
pub mod static_lib;
pub mod toolchain;
pub mod types;

pub use driver::{CompilerDriver, ProcessDriver, ToolFailure};
pub use error::BuildError;
pub use extension::{ExtensionBuilder, FailurePolicy};
pub use flags::{FlagPolicy, FlagSet};
pub use orchestrator::{BuildOrchestrator, BuildReport, BuildState, BuildStep};
pub use static_lib::StaticLibBuilder;
pub use toolchain::ToolchainKind;
pub use types::{ArtifactKind, BuildArtifact, BuildTarget, ExtensionOutcome, ExtensionStatus, Macro};
