//! Build environment variable handling.

use std::env;

// Helper for boolean environment variables that accept "1", "true", "yes"
fn is_enabled(var: &str) -> bool {
    env::var(var).ok().is_some_and(|s| {
        let s = s.to_lowercase();
        s == "1" || s == "true" || s == "yes"
    })
}

// Helper for non-empty string variables
fn non_empty(var: &str) -> Option<String> {
    env::var(var).ok().filter(|s| !s.trim().is_empty())
}

/// Split a flag string (`CXXFLAGS`, `LDFLAGS`) on whitespace.
#[must_use]
pub fn split_flags(flags: &str) -> Vec<String> {
    flags
        .split_whitespace()
        .map(std::string::ToString::to_string)
        .collect()
}

// Toolchain selection - ARBORIST_COMPILER, CXX, AR

/// Get the compiler driver name override (`ARBORIST_COMPILER`).
pub fn compiler() -> Option<String> {
    non_empty("ARBORIST_COMPILER")
}

/// Get the C++ compiler (`CXX`).
pub fn cxx() -> Option<String> {
    non_empty("CXX")
}

/// Get the archiver (`AR`).
pub fn ar() -> Option<String> {
    non_empty("AR")
}

/// Get extra compile flags (`CXXFLAGS`), appended after the flag policy.
pub fn cxxflags() -> Option<Vec<String>> {
    non_empty("CXXFLAGS").map(|s| split_flags(&s))
}

/// Get extra link flags (`LDFLAGS`), appended after the flag policy.
pub fn ldflags() -> Option<Vec<String>> {
    non_empty("LDFLAGS").map(|s| split_flags(&s))
}

// Binding toolchain - CYTHON, PYTHON, EXT_SUFFIX

/// Get the Cython executable (`CYTHON`).
pub fn cython() -> Option<String> {
    non_empty("CYTHON")
}

/// Get the Python interpreter used to locate headers (`PYTHON`).
pub fn python() -> Option<String> {
    non_empty("PYTHON")
}

/// Get the extension module file suffix override (`EXT_SUFFIX`).
pub fn ext_suffix() -> Option<String> {
    non_empty("EXT_SUFFIX")
}

// Build behavior - ARBORIST_JOBS, ARBORIST_DEBUG

/// Get number of extension modules built at once (returns None if not set or invalid).
pub fn jobs() -> Option<usize> {
    env::var("ARBORIST_JOBS").ok().and_then(|s| s.parse().ok())
}

/// Check if debug logging is enabled.
pub fn debug() -> bool {
    is_enabled("ARBORIST_DEBUG")
}
