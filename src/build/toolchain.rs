//! Toolchain identification
//!
//! Classifies the active compiler driver into one of the toolchain kinds we
//! know how to drive. The classification is a pure function of the driver's
//! identifying name, so it can be computed once at the start of a build and
//! passed down to every later step.

use std::fmt;

/// Driver names that select the MSVC-style command line
const MSVC_DRIVERS: &[&str] = &["msvc", "cl", "clang-cl", "intelw"];

/// Driver names that select the GCC-style command line
const GCC_DRIVERS: &[&str] = &[
    "unix", "unix-cc", "cc", "c++", "gcc", "g++", "clang", "clang++", "mingw32", "cygwin", "icc",
    "icpc",
];

/// Driver names that are also compiler executables
const COMPILER_EXECUTABLES: &[&str] = &[
    "cl", "clang-cl", "cc", "c++", "gcc", "g++", "clang", "clang++", "icc", "icpc",
];

/// Kind of native toolchain in effect for a build
///
/// Determined from the compiler driver's name:
/// - `msvc`, `cl`, `clang-cl` -> `MsvcLike`
/// - `unix`, `gcc`, `clang`, `mingw32`, ... -> `GccLike`
/// - anything else -> `GccLike` (best-effort fallback)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ToolchainKind {
    /// GCC, Clang and compatible drivers (`-O3`, `-fopenmp`, `ar`)
    #[default]
    GccLike,
    /// Microsoft Visual C++ and compatible drivers (`/Ox`, `/openmp`, `lib.exe`)
    MsvcLike,
}

impl ToolchainKind {
    /// Every toolchain kind, in declaration order
    pub const ALL: [Self; 2] = [Self::GccLike, Self::MsvcLike];

    /// Classify a compiler driver name.
    ///
    /// Never fails: unknown drivers fall back to [`ToolchainKind::GccLike`].
    ///
    /// # Example
    ///
    /// ```
    /// use arborist_build::ToolchainKind;
    ///
    /// assert_eq!(ToolchainKind::identify("msvc"), ToolchainKind::MsvcLike);
    /// assert_eq!(ToolchainKind::identify("unix-cc"), ToolchainKind::GccLike);
    /// assert_eq!(ToolchainKind::identify("tcc"), ToolchainKind::GccLike);
    /// ```
    #[must_use]
    pub fn identify(driver: &str) -> Self {
        Self::recognize(driver).unwrap_or_default()
    }

    /// Classify a compiler driver name, returning `None` for unknown drivers.
    #[must_use]
    pub fn recognize(driver: &str) -> Option<Self> {
        let name = normalize_driver(driver);

        if MSVC_DRIVERS.contains(&name.as_str()) {
            Some(Self::MsvcLike)
        } else if GCC_DRIVERS.contains(&name.as_str()) {
            Some(Self::GccLike)
        } else {
            None
        }
    }

    /// Compiler to run for a driver name that is an executable
    ///
    /// `clang-cl` and `/opt/llvm/bin/clang++` name a compiler; `unix` and
    /// `msvc` only name a kind and return `None`.
    #[must_use]
    pub fn compiler_executable(driver: &str) -> Option<String> {
        let name = normalize_driver(driver);
        COMPILER_EXECUTABLES
            .contains(&name.as_str())
            .then(|| driver.trim().to_string())
    }

    /// File extension of object files produced by this toolchain
    #[must_use]
    pub const fn object_extension(self) -> &'static str {
        match self {
            Self::GccLike => "o",
            Self::MsvcLike => "obj",
        }
    }

    /// File name of a static library called `name`
    ///
    /// `libfoo.a` for GCC-like toolchains, `foo.lib` for MSVC-like ones.
    #[must_use]
    pub fn static_library_file(self, name: &str) -> String {
        match self {
            Self::GccLike => format!("lib{name}.a"),
            Self::MsvcLike => format!("{name}.lib"),
        }
    }

    /// Driver name used when nothing else identifies the toolchain
    #[must_use]
    pub const fn host_default_driver() -> &'static str {
        if cfg!(windows) { "msvc" } else { "unix" }
    }
}

impl fmt::Display for ToolchainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GccLike => write!(f, "gcc-like"),
            Self::MsvcLike => write!(f, "msvc-like"),
        }
    }
}

/// Reduce a driver string to a bare lowercase name
///
/// `/usr/bin/Clang++` -> `clang++`, `C:\VC\bin\cl.exe` -> `cl`.
fn normalize_driver(driver: &str) -> String {
    let trimmed = driver.trim();
    let base = trimmed
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(trimmed);
    let lower = base.to_lowercase();

    lower.strip_suffix(".exe").unwrap_or(&lower).to_string()
}
