//! Build command
//!
//! Build the core static library and every extension module

use anyhow::Result;
use arborist_build::{
    BuildOrchestrator, BuildReport, Config, ExtensionBuilder, ExtensionStatus, ProcessDriver,
    PythonEnv, StaticLibBuilder, default_extension_suffix, env_vars,
};
use std::path::PathBuf;

/// Options for the build command
#[derive(Debug)]
pub(crate) struct BuildOptions<'a> {
    pub(crate) config: Option<&'a str>,
    pub(crate) compiler: Option<&'a str>,
    pub(crate) out_dir: Option<&'a str>,
    pub(crate) jobs: Option<usize>,
    pub(crate) fail_fast: bool,
    pub(crate) verbose: bool,
    pub(crate) quiet: bool,
}

/// Run a full build and report the outcome
pub(crate) fn run(options: &BuildOptions<'_>) -> Result<()> {
    let cfg = super::load_config(options.config)?;
    let (native, binding) = super::load_sources(&cfg)?;

    let out_dir = options
        .out_dir
        .map_or_else(|| cfg.out_dir.clone(), PathBuf::from);
    let compiler = cfg.compiler_driver(options.compiler);

    let python = match PythonEnv::detect() {
        Ok(env) => Some(env),
        Err(e) => {
            if !options.quiet {
                eprintln!("warning: {e}; building without Python/NumPy include paths");
            }
            None
        }
    };

    let mut orchestrator = BuildOrchestrator::new(
        library_builder(&cfg, options.verbose)?,
        extension_builder(&cfg, python.as_ref(), options)?,
        &out_dir,
        cfg.failure_policy(options.fail_fast),
    );

    if !options.quiet {
        println!(
            "Building {} native sources and {} extension modules into {}",
            native.len(),
            binding.len(),
            out_dir.display()
        );
    }

    let driver = ProcessDriver::from_env(options.verbose).use_driver(&compiler);
    let report = orchestrator.run(&driver, &compiler, &native, &binding);

    if !options.quiet {
        print_report(&report);
    }

    if let Some(summary) = report.failure_summary() {
        anyhow::bail!(summary);
    }
    if !report.is_success() {
        anyhow::bail!("build did not complete");
    }

    Ok(())
}

/// Static library builder: native and binding dirs are on the include path
fn library_builder(cfg: &Config, verbose: bool) -> Result<StaticLibBuilder> {
    let mut include_dirs = vec![cfg.native_dir.clone(), cfg.binding_dir.clone()];
    include_dirs.extend(cfg.include_dirs.iter().cloned());

    Ok(StaticLibBuilder::new(
        &cfg.library_name,
        include_dirs,
        cfg.parsed_macros()?,
        verbose,
    ))
}

/// Extension builder: adds Python/NumPy headers and the library search path
fn extension_builder(
    cfg: &Config,
    python: Option<&PythonEnv>,
    options: &BuildOptions<'_>,
) -> Result<ExtensionBuilder> {
    let mut include_dirs = vec![cfg.binding_dir.clone(), cfg.native_dir.clone()];
    if let Some(env) = python {
        include_dirs.extend(env.include_dirs());
    }
    include_dirs.extend(cfg.include_dirs.iter().cloned());

    let mut library_dirs = vec![cfg.binding_dir.clone(), cfg.native_dir.clone()];
    library_dirs.extend(cfg.library_dirs.iter().cloned());
    if let Some(dir) = python.and_then(|env| env.library_dir.clone()) {
        library_dirs.push(dir);
    }

    let suffix = cfg
        .extension_suffix
        .clone()
        .or_else(env_vars::ext_suffix)
        .or_else(|| python.and_then(|env| env.ext_suffix.clone()))
        .unwrap_or_else(|| default_extension_suffix().to_string());

    Ok(ExtensionBuilder::new(&cfg.package, &suffix)
        .include_dirs(include_dirs)
        .library_dirs(library_dirs)
        .libraries(cfg.libraries.clone())
        .macros(cfg.parsed_macros()?)
        .jobs(cfg.jobs(options.jobs))
        .verbose(options.verbose))
}

fn print_report(report: &BuildReport) {
    for warning in &report.warnings {
        eprintln!("warning: {warning}");
    }

    println!("Toolchain: {} ({})", report.toolchain, report.flags);

    if let Some(library) = &report.library {
        println!("  Built library {}", library.path.display());
    }

    for outcome in &report.extensions {
        match &outcome.status {
            ExtensionStatus::Built(artifact) => println!(
                "  Built {} -> {} in {:?}",
                outcome.module,
                artifact.path.display(),
                outcome.duration
            ),
            ExtensionStatus::Failed(error) => {
                eprintln!("  Failed to build {}: {error}", outcome.module);
            }
            ExtensionStatus::Skipped => println!("  Skipped {}", outcome.module),
        }
    }

    let (built, failed, skipped) = report.summarize();
    println!(
        "\nBuilt {built} extension(s), {failed} failed, {skipped} skipped in {:?}",
        report.duration
    );
}
