//! Shared test helpers and utilities

use arborist_build::build::driver::{ArchiveJob, CompileJob, LinkJob, TranslateJob};
use arborist_build::{CompilerDriver, ToolFailure};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::TempDir;

/// Get the path to the arborist-build binary built for this test run
#[allow(dead_code)]
pub(crate) fn get_binary() -> String {
    env!("CARGO_BIN_EXE_arborist-build").to_string()
}

/// Create a project with `core/<native>` and `bind/<binding>` sources
///
/// Also writes `arborist-build.toml` pointing at those directories, with no
/// extra native sources and `build/` as output directory.
#[allow(dead_code)]
pub(crate) fn create_project(native: &[&str], binding: &[&str]) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let core = temp_dir.path().join("core");
    let bind = temp_dir.path().join("bind");
    fs::create_dir_all(&core).expect("Failed to create core dir");
    fs::create_dir_all(&bind).expect("Failed to create bind dir");

    for file in native {
        fs::write(core.join(file), "int f() { return 0; }\n").expect("Failed to write source");
    }
    for file in binding {
        fs::write(bind.join(file), "def g():\n    pass\n").expect("Failed to write source");
    }

    let config = format!(
        "package = \"pyborist\"\n\
         native_dir = \"{}\"\n\
         binding_dir = \"{}\"\n\
         out_dir = \"{}\"\n\
         extra_native_sources = []\n\
         extension_suffix = \".so\"\n",
        toml_path(&core),
        toml_path(&bind),
        toml_path(&temp_dir.path().join("build")),
    );
    let config_path = temp_dir.path().join("arborist-build.toml");
    fs::write(&config_path, config).expect("Failed to write config");

    (temp_dir, config_path)
}

#[allow(dead_code)]
fn toml_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

#[allow(dead_code)]
#[derive(Debug, Default)]
struct Log {
    steps: Vec<String>,
}

/// Compiler driver that writes placeholder files and logs each step
///
/// Log entries look like `compile a.cc`, `archive 2`, `translate x.pyx`,
/// `link x`, in the order the builders issued them.
#[allow(dead_code)]
#[derive(Debug, Default)]
pub(crate) struct ScriptedDriver {
    fail_compile: Option<String>,
    log: Mutex<Log>,
}

#[allow(dead_code)]
impl ScriptedDriver {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_compile(name: &str) -> Self {
        Self {
            fail_compile: Some(name.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn steps(&self) -> Vec<String> {
        self.log.lock().expect("log lock").steps.clone()
    }

    fn record(&self, step: String) {
        self.log.lock().expect("log lock").steps.push(step);
    }
}

#[allow(dead_code)]
fn name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[allow(dead_code)]
fn write(path: &Path, content: &str) -> Result<(), ToolFailure> {
    fs::write(path, content).map_err(|e| ToolFailure {
        command: format!("write {}", path.display()),
        reason: e.to_string(),
        output: String::new(),
    })
}

impl CompilerDriver for ScriptedDriver {
    fn compile(&self, job: &CompileJob<'_>) -> Result<(), ToolFailure> {
        let source = name(job.source);
        self.record(format!("compile {source}"));

        if self.fail_compile.as_deref() == Some(source.as_str()) {
            return Err(ToolFailure {
                command: format!("c++ -c {}", job.source.display()),
                reason: "failed with exit code: 1".to_string(),
                output: format!("{source}:1:1: error: expected unqualified-id"),
            });
        }

        write(job.object, &job.flags.compile.join(" "))
    }

    fn archive(&self, job: &ArchiveJob<'_>) -> Result<(), ToolFailure> {
        self.record(format!("archive {}", job.objects.len()));
        write(job.library, &format!("{}", job.objects.len()))
    }

    fn translate(&self, job: &TranslateJob<'_>) -> Result<(), ToolFailure> {
        self.record(format!("translate {}", name(job.source)));
        write(job.output, "// generated\n")
    }

    fn link(&self, job: &LinkJob<'_>) -> Result<(), ToolFailure> {
        let stem = job
            .object
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.record(format!("link {stem}"));
        write(job.output, &job.flags.link.join(" "))
    }
}
