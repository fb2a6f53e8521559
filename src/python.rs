//! Host Python detection
//!
//! Extension modules need the Python and NumPy headers, the interpreter's
//! extension suffix and, on Windows, the directory holding `pythonXY.lib`.
//! All of it is asked from the interpreter itself.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::process::Command;

/// Probe script: one value per line
const PROBE: &str = "\
import os, sys, sysconfig
import numpy
print(sysconfig.get_paths()['include'])
print(numpy.get_include())
print(sysconfig.get_config_var('EXT_SUFFIX') or '')
print(os.path.join(sys.base_prefix, 'libs'))
";

/// What the host Python reports about its build environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PythonEnv {
    /// Directory containing `Python.h`
    pub include_dir: PathBuf,
    /// Directory containing `numpy/arrayobject.h`
    pub numpy_include_dir: PathBuf,
    /// Extension module suffix (`.cpython-312-x86_64-linux-gnu.so`)
    pub ext_suffix: Option<String>,
    /// Import library directory (Windows only)
    pub library_dir: Option<PathBuf>,
}

impl PythonEnv {
    /// Run the host interpreter and collect its build environment.
    ///
    /// Uses `PYTHON` if set, else `python3`.
    ///
    /// # Errors
    ///
    /// Returns an error if the interpreter cannot be run, NumPy is missing,
    /// or the output is malformed.
    pub fn detect() -> Result<Self> {
        let python = crate::env_vars::python().unwrap_or_else(|| "python3".to_string());

        let output = Command::new(&python)
            .args(["-c", PROBE])
            .output()
            .with_context(|| format!("Failed to run {python}"))?;

        if !output.status.success() {
            anyhow::bail!(
                "{python} could not report its include paths (is numpy installed?): {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Self::parse(&String::from_utf8_lossy(&output.stdout))
    }

    /// Parse the probe's output.
    ///
    /// # Errors
    ///
    /// Returns an error if either include directory is missing.
    pub fn parse(output: &str) -> Result<Self> {
        let mut lines = output.lines().map(str::trim);

        let include_dir = lines
            .next()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .context("Python did not report its include directory")?;
        let numpy_include_dir = lines
            .next()
            .filter(|l| !l.is_empty())
            .map(PathBuf::from)
            .context("Python did not report the NumPy include directory")?;
        let ext_suffix = lines
            .next()
            .filter(|l| !l.is_empty())
            .map(str::to_string);
        let library_dir = lines
            .next()
            .filter(|l| cfg!(windows) && !l.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            include_dir,
            numpy_include_dir,
            ext_suffix,
            library_dir,
        })
    }

    /// Include directories in compile order
    #[must_use]
    pub fn include_dirs(&self) -> Vec<PathBuf> {
        vec![self.include_dir.clone(), self.numpy_include_dir.clone()]
    }
}

/// Suffix used when neither config, environment nor Python provides one
#[must_use]
pub const fn default_extension_suffix() -> &'static str {
    if cfg!(windows) { ".pyd" } else { ".so" }
}
