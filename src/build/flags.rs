//! Compile and link flag policy
//!
//! The core library and every extension module must be compiled with the
//! same optimization and parallelism flags, otherwise floating point results
//! differ between the static library and the modules linking against it.
//! Both builders take their flags from this table.

use super::toolchain::ToolchainKind;
use std::fmt;

/// Ordered compile and link flags for one toolchain kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagSet {
    /// Flags appended to every compile command
    pub compile: &'static [&'static str],
    /// Flags appended to every link command
    pub link: &'static [&'static str],
}

/// OpenMP, maximum speed, fast floating point
static MSVC_FLAGS: FlagSet = FlagSet {
    compile: &["/openmp", "/Ox", "/fp:fast"],
    link: &[],
};

/// C++11, OpenMP, `-O3`, fast-math; OpenMP at link time
static GCC_FLAGS: FlagSet = FlagSet {
    compile: &["-std=c++11", "-fopenmp", "-O3", "-ffast-math"],
    link: &["-fopenmp"],
};

impl FlagSet {
    /// Owned copy of the compile flags, for error reports
    #[must_use]
    pub fn compile_vec(&self) -> Vec<String> {
        self.compile.iter().map(ToString::to_string).collect()
    }

    /// Owned copy of the link flags, for error reports
    #[must_use]
    pub fn link_vec(&self) -> Vec<String> {
        self.link.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for FlagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "compile: [{}], link: [{}]",
            self.compile.join(" "),
            self.link.join(" ")
        )
    }
}

/// Lookup table from toolchain kind to flag set
#[derive(Debug, Clone, Copy, Default)]
pub struct FlagPolicy;

impl FlagPolicy {
    /// Flags for `kind`. Total over every [`ToolchainKind`].
    #[must_use]
    pub fn for_kind(kind: ToolchainKind) -> &'static FlagSet {
        match kind {
            ToolchainKind::MsvcLike => &MSVC_FLAGS,
            ToolchainKind::GccLike => &GCC_FLAGS,
        }
    }

    /// Flags for a compiler driver name (identify, then look up)
    #[must_use]
    pub fn for_driver(driver: &str) -> &'static FlagSet {
        Self::for_kind(ToolchainKind::identify(driver))
    }
}
