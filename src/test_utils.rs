//! Shared test utilities for arborist-build tests
//!
//! This module provides common fixtures and a fake compiler driver so the
//! builders can be exercised without a native toolchain installed.

#[cfg(test)]
pub mod fixtures {
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Create a temporary directory holding the given (empty-bodied) sources
    ///
    /// Paths are relative to the temp dir; parents are created as needed.
    pub fn create_source_tree(files: &[&str]) -> (TempDir, Vec<PathBuf>) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");

        let paths = files
            .iter()
            .map(|file| {
                let path = temp_dir.path().join(file);
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).expect("Failed to create source dir");
                }
                fs::write(&path, format!("// {file}\n")).expect("Failed to write source");
                path
            })
            .collect();

        (temp_dir, paths)
    }

    /// Write a config file into `dir` and return its path
    pub fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("arborist-build.toml");
        fs::write(&path, content).expect("Failed to write config");
        path
    }
}

#[cfg(test)]
pub mod fake {
    use crate::build::driver::{
        ArchiveJob, CompileJob, CompilerDriver, LinkJob, ToolFailure, TranslateJob,
    };
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct Calls {
        compiled: Vec<PathBuf>,
        compile_flags: Vec<Vec<String>>,
        translated: Vec<PathBuf>,
        archives: usize,
        link_flags: Vec<Vec<String>>,
        linked_libraries: Vec<PathBuf>,
        exported_symbols: Vec<String>,
    }

    /// Compiler driver that writes placeholder outputs and records each job
    ///
    /// Objects contain their source path, archives list their members one per
    /// line, and modules list their object and library.
    #[derive(Debug, Default)]
    pub struct FakeDriver {
        fail_compile: Option<String>,
        fail_translate: Option<String>,
        fail_link: Option<String>,
        fail_archive: bool,
        calls: Mutex<Calls>,
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn stem(path: &Path) -> String {
        path.file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn failure(what: &str, path: &Path) -> ToolFailure {
        ToolFailure {
            command: format!("fake-{what} {}", path.display()),
            reason: "failed with exit code: 1".to_string(),
            output: format!("{}: error: injected failure", path.display()),
        }
    }

    fn to_strings(flags: &[&str]) -> Vec<String> {
        flags.iter().map(ToString::to_string).collect()
    }

    impl FakeDriver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail compiling the source whose file name is `name`
        pub fn fail_compile(mut self, name: &str) -> Self {
            self.fail_compile = Some(name.to_string());
            self
        }

        /// Fail translating the binding source whose file name is `name`
        pub fn fail_translate(mut self, name: &str) -> Self {
            self.fail_translate = Some(name.to_string());
            self
        }

        /// Fail linking the module whose object stem is `stem`
        pub fn fail_link(mut self, stem: &str) -> Self {
            self.fail_link = Some(stem.to_string());
            self
        }

        /// Fail every archive job
        pub fn fail_archive(mut self) -> Self {
            self.fail_archive = true;
            self
        }

        fn calls(&self) -> std::sync::MutexGuard<'_, Calls> {
            self.calls.lock().expect("fake driver lock poisoned")
        }

        pub fn compiled(&self) -> Vec<PathBuf> {
            self.calls().compiled.clone()
        }

        pub fn compile_flags(&self) -> Vec<Vec<String>> {
            self.calls().compile_flags.clone()
        }

        pub fn translated(&self) -> Vec<PathBuf> {
            self.calls().translated.clone()
        }

        pub fn archive_calls(&self) -> usize {
            self.calls().archives
        }

        pub fn link_flags(&self) -> Vec<Vec<String>> {
            self.calls().link_flags.clone()
        }

        pub fn linked_libraries(&self) -> Vec<PathBuf> {
            self.calls().linked_libraries.clone()
        }

        pub fn exported_symbols(&self) -> Vec<String> {
            self.calls().exported_symbols.clone()
        }

        /// Members recorded in an archive written by this driver
        pub fn archived_members(library: &Path) -> Vec<PathBuf> {
            fs::read_to_string(library)
                .unwrap_or_default()
                .lines()
                .filter(|l| !l.is_empty())
                .map(PathBuf::from)
                .collect()
        }
    }

    impl CompilerDriver for FakeDriver {
        fn compile(&self, job: &CompileJob<'_>) -> Result<(), ToolFailure> {
            {
                let mut calls = self.calls();
                calls.compiled.push(job.source.to_path_buf());
                calls.compile_flags.push(to_strings(job.flags.compile));
            }

            if self.fail_compile.as_deref() == Some(file_name(job.source).as_str()) {
                return Err(failure("cc", job.source));
            }

            fs::write(job.object, job.source.display().to_string())
                .map_err(|e| failure(&format!("cc ({e})"), job.object))
        }

        fn archive(&self, job: &ArchiveJob<'_>) -> Result<(), ToolFailure> {
            self.calls().archives += 1;

            if self.fail_archive {
                return Err(failure("ar", job.library));
            }

            let members: Vec<String> = job
                .objects
                .iter()
                .map(|o| o.display().to_string())
                .collect();
            fs::write(job.library, members.join("\n"))
                .map_err(|e| failure(&format!("ar ({e})"), job.library))
        }

        fn translate(&self, job: &TranslateJob<'_>) -> Result<(), ToolFailure> {
            self.calls().translated.push(job.source.to_path_buf());

            if self.fail_translate.as_deref() == Some(file_name(job.source).as_str()) {
                return Err(failure("cython", job.source));
            }

            fs::write(job.output, job.source.display().to_string())
                .map_err(|e| failure(&format!("cython ({e})"), job.output))
        }

        fn link(&self, job: &LinkJob<'_>) -> Result<(), ToolFailure> {
            {
                let mut calls = self.calls();
                calls.link_flags.push(to_strings(job.flags.link));
                calls
                    .linked_libraries
                    .push(job.static_library.to_path_buf());
                calls.exported_symbols.push(job.export_symbol.to_string());
            }

            if self.fail_link.as_deref() == Some(stem(job.object).as_str()) {
                return Err(failure("ld", job.output));
            }

            fs::write(
                job.output,
                format!("{}\n{}", job.object.display(), job.static_library.display()),
            )
            .map_err(|e| failure(&format!("ld ({e})"), job.output))
        }
    }
}
