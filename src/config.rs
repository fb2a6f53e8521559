//! Configuration file management
//!
//! Handles reading arborist-build's TOML configuration from project and
//! global locations, and resolving settings that can also come from the
//! command line or the environment.

use crate::build::{FailurePolicy, Macro, ToolchainKind};
use crate::env_vars;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Project-local config file name
pub const CONFIG_FILE: &str = "arborist-build.toml";

/// Build configuration loaded from TOML files
///
/// Every field has a default matching the standard source layout, so an
/// empty file (or no file) is a valid configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Python package the extension modules belong to
    pub package: String,

    /// Directory scanned for native `.cc` sources
    pub native_dir: PathBuf,

    /// Directory scanned for `.pyx` binding sources
    pub binding_dir: PathBuf,

    /// Native sources compiled into the library in addition to `native_dir`
    ///
    /// Unset means `<binding_dir>/callback.cc`; see [`Config::extra_sources`].
    pub extra_native_sources: Option<Vec<PathBuf>>,

    /// Output directory for objects, the static library and modules
    pub out_dir: PathBuf,

    /// Static library name (without `lib` prefix or extension)
    pub library_name: String,

    /// Compiler driver name (`unix`, `msvc`, ...)
    pub compiler: Option<String>,

    /// Additional include directories for every compile
    pub include_dirs: Vec<PathBuf>,

    /// Additional library directories for extension links
    pub library_dirs: Vec<PathBuf>,

    /// Runtime libraries linked into every extension
    pub libraries: Vec<String>,

    /// Preprocessor macros (`NAME` or `NAME=VALUE`)
    pub macros: Vec<String>,

    /// Extension module suffix override
    pub extension_suffix: Option<String>,

    /// Extension modules built at once
    pub jobs: Option<usize>,

    /// Stop at the first failed extension module
    pub fail_fast: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            package: "pyborist".to_string(),
            native_dir: PathBuf::from("../ArboristCore"),
            binding_dir: PathBuf::from("pyborist"),
            extra_native_sources: None,
            out_dir: PathBuf::from("build"),
            library_name: "aboristcore".to_string(),
            compiler: None,
            include_dirs: Vec::new(),
            library_dirs: Vec::new(),
            libraries: Vec::new(),
            macros: Vec::new(),
            extension_suffix: None,
            jobs: None,
            fail_fast: false,
        }
    }
}

impl Config {
    /// Load configuration from TOML files.
    /// Priority: ./arborist-build.toml -> ~/.config/arborist-build/config.toml
    ///
    /// # Errors
    ///
    /// Returns an error if config file parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_with_options(None)
    }

    /// Load configuration, preferring `custom_path` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly requested file cannot be read or
    /// parsed, or if a discovered file fails to parse.
    pub fn load_with_options(custom_path: Option<&Path>) -> Result<Self> {
        // If custom path provided, load from that
        if let Some(path) = custom_path {
            return Self::load_from(path)
                .with_context(|| format!("Failed to load config: {}", path.display()));
        }

        // Try local config first, then user config
        let candidates = std::iter::once(PathBuf::from(CONFIG_FILE))
            .chain(Self::user_config_dir().map(|dir| dir.join("config.toml")));

        for path in candidates {
            if path.is_file() {
                return Self::load_from(&path)
                    .with_context(|| format!("Failed to load config: {}", path.display()));
            }
        }

        // Return default config
        Ok(Self::default())
    }

    fn load_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse a TOML config document
    ///
    /// # Errors
    ///
    /// Returns an error on invalid TOML or mistyped fields.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        Ok(config)
    }

    fn user_config_dir() -> Option<PathBuf> {
        // Check XDG_CONFIG_HOME first
        if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
            return Some(PathBuf::from(xdg_config).join("arborist-build"));
        }

        // Fall back to ~/.config/arborist-build
        dirs::home_dir().map(|home| home.join(".config").join("arborist-build"))
    }

    /// Resolve the compiler driver name.
    ///
    /// Priority: `cli` -> `ARBORIST_COMPILER` -> config `compiler` ->
    /// file stem of `CXX` -> host default (`msvc` on Windows, `unix` elsewhere).
    #[must_use]
    pub fn compiler_driver(&self, cli: Option<&str>) -> String {
        self.resolve_compiler_driver(cli, env_vars::compiler(), env_vars::cxx())
    }

    fn resolve_compiler_driver(
        &self,
        cli: Option<&str>,
        env_compiler: Option<String>,
        cxx: Option<String>,
    ) -> String {
        cli.map(str::to_string)
            .or(env_compiler)
            .or_else(|| self.compiler.clone())
            .or_else(|| cxx.and_then(|cxx| driver_from_cxx(&cxx)))
            .unwrap_or_else(|| ToolchainKind::host_default_driver().to_string())
    }

    /// Native sources added to the library besides the `native_dir` scan
    ///
    /// The callback unit lives next to the bindings, so the default follows
    /// `binding_dir`.
    #[must_use]
    pub fn extra_sources(&self) -> Vec<PathBuf> {
        self.extra_native_sources
            .clone()
            .unwrap_or_else(|| vec![self.binding_dir.join("callback.cc")])
    }

    /// Resolve the extension failure policy (`--fail-fast` or config)
    #[must_use]
    pub const fn failure_policy(&self, fail_fast: bool) -> FailurePolicy {
        if fail_fast || self.fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Continue
        }
    }

    /// Resolve the number of parallel extension builds.
    /// Priority: `cli` -> `ARBORIST_JOBS` -> config `jobs` -> 1.
    #[must_use]
    pub fn jobs(&self, cli: Option<usize>) -> usize {
        cli.or_else(env_vars::jobs)
            .or(self.jobs)
            .unwrap_or(1)
            .max(1)
    }

    /// Parsed preprocessor macros
    ///
    /// # Errors
    ///
    /// Returns an error for an entry with an empty name.
    pub fn parsed_macros(&self) -> Result<Vec<Macro>> {
        self.macros
            .iter()
            .map(|spec| {
                Macro::parse(spec).with_context(|| format!("Invalid macro definition '{spec}'"))
            })
            .collect()
    }
}

/// Driver name from a `CXX` value (`/usr/bin/clang++` -> `clang++`)
fn driver_from_cxx(cxx: &str) -> Option<String> {
    let first = cxx.split_whitespace().next()?;
    Path::new(first)
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}
