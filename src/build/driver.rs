//! Toolchain invocation
//!
//! The builders describe *what* to compile, archive or link as job structs
//! and hand them to a [`CompilerDriver`]. [`ProcessDriver`] turns each job
//! into an external compiler process, the equivalent of running:
//! ```bash
//! c++ -c a.cc -o a.o -std=c++11 -fopenmp -O3 -ffast-math
//! ar rcs libaboristcore.a a.o b.o
//! cython --cplus -3 forest.pyx -o forest.cpp
//! c++ -shared -o forest.so forest.o libaboristcore.a -fopenmp
//! ```

use super::flags::FlagSet;
use super::toolchain::ToolchainKind;
use super::types::Macro;
use crate::env_vars;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Compile one source into one object
#[derive(Debug, Clone, Copy)]
pub struct CompileJob<'a> {
    pub toolchain: ToolchainKind,
    pub source: &'a Path,
    pub object: &'a Path,
    pub flags: &'a FlagSet,
    pub include_dirs: &'a [PathBuf],
    pub macros: &'a [Macro],
}

/// Archive objects into a static library
#[derive(Debug, Clone, Copy)]
pub struct ArchiveJob<'a> {
    pub toolchain: ToolchainKind,
    pub objects: &'a [PathBuf],
    pub library: &'a Path,
}

/// Translate a binding source into C++
#[derive(Debug, Clone, Copy)]
pub struct TranslateJob<'a> {
    pub source: &'a Path,
    pub output: &'a Path,
    pub include_dirs: &'a [PathBuf],
}

/// Link one extension object against the static library
#[derive(Debug, Clone, Copy)]
pub struct LinkJob<'a> {
    pub toolchain: ToolchainKind,
    pub object: &'a Path,
    pub static_library: &'a Path,
    pub output: &'a Path,
    pub flags: &'a FlagSet,
    pub library_dirs: &'a [PathBuf],
    pub libraries: &'a [String],
    /// Module init symbol to export (`PyInit_<stem>`)
    pub export_symbol: &'a str,
}

/// A failed tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolFailure {
    /// Command line that was run
    pub command: String,
    /// Why it failed (exit status or spawn error)
    pub reason: String,
    /// Captured stdout + stderr
    pub output: String,
}

impl fmt::Display for ToolFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.command, self.reason)?;
        let output = self.output.trim();
        if !output.is_empty() {
            write!(f, "\n{output}")?;
        }
        Ok(())
    }
}

/// Runs the external tools a build needs
///
/// Implementations must be shareable across threads: extension modules may
/// be built in parallel.
pub trait CompilerDriver: Sync {
    /// Compile `job.source` into `job.object`
    fn compile(&self, job: &CompileJob<'_>) -> Result<(), ToolFailure>;

    /// Archive `job.objects` into `job.library`
    fn archive(&self, job: &ArchiveJob<'_>) -> Result<(), ToolFailure>;

    /// Translate a binding source into a C++ compile unit
    fn translate(&self, job: &TranslateJob<'_>) -> Result<(), ToolFailure>;

    /// Link an extension module
    fn link(&self, job: &LinkJob<'_>) -> Result<(), ToolFailure>;
}

/// Driver that spawns the real compiler, archiver, linker and translator
///
/// Tool lookup order:
/// 1. `CXX` / `AR` / `CYTHON` environment variables
/// 2. The compiler driver name, when it names an executable (`clang++`, `clang-cl`)
/// 3. Toolchain default (`c++`, `ar` / `cl`, `lib`, `link`; `cython`)
#[derive(Debug, Clone)]
pub struct ProcessDriver {
    /// C++ compiler for GCC-like toolchains
    cxx: String,
    /// Whether `cxx` was set explicitly and must not follow the driver name
    cxx_pinned: bool,
    /// C++ compiler for MSVC-like toolchains
    cl: String,
    /// Archiver for GCC-like toolchains
    ar: String,
    /// Binding translator
    cython: String,
    /// Extra compile flags from `CXXFLAGS`, appended after the policy
    extra_compile: Vec<String>,
    /// Extra link flags from `LDFLAGS`, appended after the policy
    extra_link: Vec<String>,
    /// Echo each command before running it
    verbose: bool,
}

impl Default for ProcessDriver {
    /// Toolchain default tools, no extra flags
    fn default() -> Self {
        Self {
            cxx: "c++".to_string(),
            cxx_pinned: false,
            cl: "cl".to_string(),
            ar: "ar".to_string(),
            cython: "cython".to_string(),
            extra_compile: Vec::new(),
            extra_link: Vec::new(),
            verbose: false,
        }
    }
}

impl ProcessDriver {
    /// Create a driver configured from the environment
    #[must_use]
    pub fn from_env(verbose: bool) -> Self {
        let mut driver = Self {
            verbose,
            ..Self::default()
        };

        if let Some(cxx) = env_vars::cxx() {
            driver.cxx = cxx;
            driver.cxx_pinned = true;
        }
        if let Some(ar) = env_vars::ar() {
            driver.ar = ar;
        }
        if let Some(cython) = env_vars::cython() {
            driver.cython = cython;
        }
        driver.with_extra_flags(
            env_vars::cxxflags().unwrap_or_default(),
            env_vars::ldflags().unwrap_or_default(),
        )
    }

    /// Create a driver with explicit tools and no extra flags
    #[must_use]
    pub fn with_tools(cxx: &str, ar: &str, cython: &str) -> Self {
        Self {
            cxx: cxx.to_string(),
            cxx_pinned: true,
            ar: ar.to_string(),
            cython: cython.to_string(),
            ..Self::default()
        }
    }

    /// Replace the flags appended after the policy flags
    #[must_use]
    pub fn with_extra_flags(mut self, compile: Vec<String>, link: Vec<String>) -> Self {
        self.extra_compile = compile;
        self.extra_link = link;
        self
    }

    /// Run the compiler a driver name points at, if it names one
    ///
    /// `clang-cl` replaces `cl`. `clang++` or `g++` replaces `c++` unless
    /// `CXX` (or [`ProcessDriver::with_tools`]) already chose the compiler.
    /// Kind-only names such as `unix` or `msvc` change nothing.
    #[must_use]
    pub fn use_driver(mut self, driver: &str) -> Self {
        let Some(exe) = ToolchainKind::compiler_executable(driver) else {
            return self;
        };

        match ToolchainKind::identify(driver) {
            ToolchainKind::MsvcLike => self.cl = exe,
            ToolchainKind::GccLike if !self.cxx_pinned => self.cxx = exe,
            ToolchainKind::GccLike => {}
        }
        self
    }

    /// Command line for a compile job
    #[must_use]
    pub fn compile_command(&self, job: &CompileJob<'_>) -> Command {
        match job.toolchain {
            ToolchainKind::GccLike => {
                let mut cmd = Command::new(&self.cxx);
                cmd.arg("-c")
                    .arg(job.source)
                    .arg("-o")
                    .arg(job.object)
                    .arg("-fPIC");
                for dir in job.include_dirs {
                    cmd.arg(format!("-I{}", dir.display()));
                }
                for m in job.macros {
                    cmd.arg(format!("-D{m}"));
                }
                cmd.args(job.flags.compile).args(&self.extra_compile);
                cmd
            }
            ToolchainKind::MsvcLike => {
                let mut cmd = Command::new(&self.cl);
                cmd.args(["/nologo", "/c", "/EHsc"])
                    .arg(job.source)
                    .arg(format!("/Fo{}", job.object.display()));
                for dir in job.include_dirs {
                    cmd.arg(format!("/I{}", dir.display()));
                }
                for m in job.macros {
                    cmd.arg(format!("/D{m}"));
                }
                cmd.args(job.flags.compile).args(&self.extra_compile);
                cmd
            }
        }
    }

    /// Command line for an archive job
    #[must_use]
    pub fn archive_command(&self, job: &ArchiveJob<'_>) -> Command {
        match job.toolchain {
            ToolchainKind::GccLike => {
                let mut cmd = Command::new(&self.ar);
                cmd.arg("rcs").arg(job.library).args(job.objects);
                cmd
            }
            ToolchainKind::MsvcLike => {
                let mut cmd = Command::new("lib");
                cmd.arg("/nologo")
                    .arg(format!("/OUT:{}", job.library.display()))
                    .args(job.objects);
                cmd
            }
        }
    }

    /// Command line for a translate job
    #[must_use]
    pub fn translate_command(&self, job: &TranslateJob<'_>) -> Command {
        let mut cmd = Command::new(&self.cython);
        cmd.args(["--cplus", "-3"]);
        for dir in job.include_dirs {
            cmd.arg(format!("-I{}", dir.display()));
        }
        cmd.arg(job.source).arg("-o").arg(job.output);
        cmd
    }

    /// Command line for a link job
    #[must_use]
    pub fn link_command(&self, job: &LinkJob<'_>) -> Command {
        match job.toolchain {
            ToolchainKind::GccLike => {
                let mut cmd = Command::new(&self.cxx);
                cmd.arg("-shared")
                    .arg("-o")
                    .arg(job.output)
                    .arg(job.object)
                    .arg(job.static_library);
                for dir in job.library_dirs {
                    cmd.arg(format!("-L{}", dir.display()));
                }
                for lib in job.libraries {
                    cmd.arg(format!("-l{lib}"));
                }
                cmd.args(job.flags.link).args(&self.extra_link);
                cmd
            }
            ToolchainKind::MsvcLike => {
                let mut cmd = Command::new("link");
                cmd.args(["/nologo", "/DLL"])
                    .arg(format!("/OUT:{}", job.output.display()))
                    .arg(format!("/EXPORT:{}", job.export_symbol))
                    .arg(job.object)
                    .arg(job.static_library);
                for dir in job.library_dirs {
                    cmd.arg(format!("/LIBPATH:{}", dir.display()));
                }
                for lib in job.libraries {
                    cmd.arg(format!("{lib}.lib"));
                }
                cmd.args(job.flags.link).args(&self.extra_link);
                cmd
            }
        }
    }

    fn run(&self, mut cmd: Command) -> Result<(), ToolFailure> {
        let command = render(&cmd);

        if self.verbose {
            println!("  Running: {command}");
        }
        crate::debug!("spawning {command}");

        let output: Output = cmd.output().map_err(|e| ToolFailure {
            command: command.clone(),
            reason: format!("could not be started: {e}"),
            output: String::new(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        let mut captured = String::from_utf8_lossy(&output.stdout).into_owned();
        captured.push_str(&String::from_utf8_lossy(&output.stderr));

        Err(ToolFailure {
            command,
            reason: format!(
                "failed with exit code: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string())
            ),
            output: captured,
        })
    }
}

impl CompilerDriver for ProcessDriver {
    fn compile(&self, job: &CompileJob<'_>) -> Result<(), ToolFailure> {
        self.run(self.compile_command(job))
    }

    fn archive(&self, job: &ArchiveJob<'_>) -> Result<(), ToolFailure> {
        self.run(self.archive_command(job))
    }

    fn translate(&self, job: &TranslateJob<'_>) -> Result<(), ToolFailure> {
        self.run(self.translate_command(job))
    }

    fn link(&self, job: &LinkJob<'_>) -> Result<(), ToolFailure> {
        self.run(self.link_command(job))
    }
}

/// Render a command for logs and error messages
fn render(cmd: &Command) -> String {
    let mut parts = vec![cmd.get_program().to_string_lossy().into_owned()];
    parts.extend(cmd.get_args().map(|a| a.to_string_lossy().into_owned()));
    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::flags::FlagPolicy;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    fn driver() -> ProcessDriver {
        ProcessDriver::with_tools("g++", "ar", "cython")
    }

    #[test]
    fn gcc_compile_command() {
        let includes = vec![PathBuf::from("core")];
        let macros = vec![Macro::parse("NDEBUG").unwrap()];
        let job = CompileJob {
            toolchain: ToolchainKind::GccLike,
            source: Path::new("core/a.cc"),
            object: Path::new("build/temp/a.o"),
            flags: FlagPolicy::for_kind(ToolchainKind::GccLike),
            include_dirs: &includes,
            macros: &macros,
        };

        let cmd = driver().compile_command(&job);

        assert_eq!(cmd.get_program(), "g++");
        assert_eq!(
            args(&cmd),
            vec![
                "-c",
                "core/a.cc",
                "-o",
                "build/temp/a.o",
                "-fPIC",
                "-Icore",
                "-DNDEBUG",
                "-std=c++11",
                "-fopenmp",
                "-O3",
                "-ffast-math",
            ]
        );
    }

    #[test]
    fn msvc_compile_command_uses_policy_flags() {
        let job = CompileJob {
            toolchain: ToolchainKind::MsvcLike,
            source: Path::new("core/a.cc"),
            object: Path::new("a.obj"),
            flags: FlagPolicy::for_kind(ToolchainKind::MsvcLike),
            include_dirs: &[],
            macros: &[],
        };

        let cmd = driver().compile_command(&job);
        let args = args(&cmd);

        assert_eq!(cmd.get_program(), "cl");
        assert!(args.contains(&"/Foa.obj".to_string()));
        assert!(args.ends_with(&[
            "/openmp".to_string(),
            "/Ox".to_string(),
            "/fp:fast".to_string()
        ]));
    }

    #[test]
    fn gcc_archive_command() {
        let objects = vec![PathBuf::from("a.o"), PathBuf::from("b.o")];
        let job = ArchiveJob {
            toolchain: ToolchainKind::GccLike,
            objects: &objects,
            library: Path::new("libcore.a"),
        };

        let cmd = driver().archive_command(&job);

        assert_eq!(cmd.get_program(), "ar");
        assert_eq!(args(&cmd), vec!["rcs", "libcore.a", "a.o", "b.o"]);
    }

    #[test]
    fn gcc_link_command_links_static_library_with_link_flags() {
        let libs = vec!["m".to_string()];
        let job = LinkJob {
            toolchain: ToolchainKind::GccLike,
            object: Path::new("x.o"),
            static_library: Path::new("libcore.a"),
            output: Path::new("x.so"),
            flags: FlagPolicy::for_kind(ToolchainKind::GccLike),
            library_dirs: &[],
            libraries: &libs,
            export_symbol: "PyInit_x",
        };

        let cmd = driver().link_command(&job);

        assert_eq!(
            args(&cmd),
            vec!["-shared", "-o", "x.so", "x.o", "libcore.a", "-lm", "-fopenmp"]
        );
    }

    #[test]
    fn msvc_link_command_exports_init_symbol() {
        let job = LinkJob {
            toolchain: ToolchainKind::MsvcLike,
            object: Path::new("x.obj"),
            static_library: Path::new("core.lib"),
            output: Path::new("x.pyd"),
            flags: FlagPolicy::for_kind(ToolchainKind::MsvcLike),
            library_dirs: &[],
            libraries: &[],
            export_symbol: "PyInit_x",
        };

        let cmd = driver().link_command(&job);

        assert_eq!(cmd.get_program(), "link");
        assert!(args(&cmd).contains(&"/EXPORT:PyInit_x".to_string()));
    }

    #[test]
    fn translate_command() {
        let includes = vec![PathBuf::from("pyborist")];
        let job = TranslateJob {
            source: Path::new("pyborist/x.pyx"),
            output: Path::new("build/x.cpp"),
            include_dirs: &includes,
        };

        let cmd = driver().translate_command(&job);

        assert_eq!(
            args(&cmd),
            vec!["--cplus", "-3", "-Ipyborist", "pyborist/x.pyx", "-o", "build/x.cpp"]
        );
    }

    #[test]
    fn user_flags_follow_policy_flags() {
        let driver = driver().with_extra_flags(
            vec!["-O0".to_string(), "-g".to_string()],
            vec!["-Wl,--as-needed".to_string()],
        );
        let compile = CompileJob {
            toolchain: ToolchainKind::GccLike,
            source: Path::new("a.cc"),
            object: Path::new("a.o"),
            flags: FlagPolicy::for_kind(ToolchainKind::GccLike),
            include_dirs: &[],
            macros: &[],
        };
        let link = LinkJob {
            toolchain: ToolchainKind::GccLike,
            object: Path::new("x.o"),
            static_library: Path::new("libcore.a"),
            output: Path::new("x.so"),
            flags: FlagPolicy::for_kind(ToolchainKind::GccLike),
            library_dirs: &[],
            libraries: &[],
            export_symbol: "PyInit_x",
        };

        let compile_args = args(&driver.compile_command(&compile));
        assert!(compile_args.ends_with(&[
            "-ffast-math".to_string(),
            "-O0".to_string(),
            "-g".to_string()
        ]));

        let link_args = args(&driver.link_command(&link));
        assert!(link_args.ends_with(&["-fopenmp".to_string(), "-Wl,--as-needed".to_string()]));
    }

    #[test]
    fn msvc_user_flags_follow_policy_flags() {
        let driver = driver().with_extra_flags(vec!["/Zi".to_string()], Vec::new());
        let job = CompileJob {
            toolchain: ToolchainKind::MsvcLike,
            source: Path::new("a.cc"),
            object: Path::new("a.obj"),
            flags: FlagPolicy::for_kind(ToolchainKind::MsvcLike),
            include_dirs: &[],
            macros: &[],
        };

        let args = args(&driver.compile_command(&job));

        assert!(args.ends_with(&["/fp:fast".to_string(), "/Zi".to_string()]));
    }

    fn msvc_compile(driver: &ProcessDriver) -> Command {
        driver.compile_command(&CompileJob {
            toolchain: ToolchainKind::MsvcLike,
            source: Path::new("a.cc"),
            object: Path::new("a.obj"),
            flags: FlagPolicy::for_kind(ToolchainKind::MsvcLike),
            include_dirs: &[],
            macros: &[],
        })
    }

    fn gcc_compile(driver: &ProcessDriver) -> Command {
        driver.compile_command(&CompileJob {
            toolchain: ToolchainKind::GccLike,
            source: Path::new("a.cc"),
            object: Path::new("a.o"),
            flags: FlagPolicy::for_kind(ToolchainKind::GccLike),
            include_dirs: &[],
            macros: &[],
        })
    }

    #[test]
    fn executable_driver_name_selects_compiler() {
        let clang_cl = ProcessDriver::default().use_driver("clang-cl");
        assert_eq!(msvc_compile(&clang_cl).get_program(), "clang-cl");

        let clang = ProcessDriver::default().use_driver("/opt/llvm/bin/clang++");
        assert_eq!(gcc_compile(&clang).get_program(), "/opt/llvm/bin/clang++");
    }

    #[test]
    fn kind_only_driver_name_keeps_defaults() {
        let unix = ProcessDriver::default().use_driver("unix");
        assert_eq!(gcc_compile(&unix).get_program(), "c++");

        let msvc = ProcessDriver::default().use_driver("msvc");
        assert_eq!(msvc_compile(&msvc).get_program(), "cl");
    }

    #[test]
    fn explicit_cxx_beats_driver_name() {
        let pinned = driver().use_driver("clang++");
        assert_eq!(gcc_compile(&pinned).get_program(), "g++");
    }

    #[test]
    fn missing_tool_reports_command() {
        let driver = ProcessDriver::with_tools("/nonexistent/arborist-test-cxx", "ar", "cython");
        let job = CompileJob {
            toolchain: ToolchainKind::GccLike,
            source: Path::new("a.cc"),
            object: Path::new("a.o"),
            flags: FlagPolicy::for_kind(ToolchainKind::GccLike),
            include_dirs: &[],
            macros: &[],
        };

        let failure = driver.compile(&job).unwrap_err();

        assert!(failure.command.starts_with("/nonexistent/arborist-test-cxx -c a.cc"));
        assert!(failure.reason.contains("could not be started"));
    }

    #[test]
    fn failure_display_includes_output() {
        let failure = ToolFailure {
            command: "c++ -c a.cc".to_string(),
            reason: "failed with exit code: 1".to_string(),
            output: "a.cc:1: error: expected ';'\n".to_string(),
        };

        assert_eq!(
            failure.to_string(),
            "`c++ -c a.cc` failed with exit code: 1\na.cc:1: error: expected ';'"
        );
    }
}
