//! Flags command
//!
//! Show the toolchain a build would detect and the flags it selects

use anyhow::Result;
use arborist_build::{FlagPolicy, ToolchainKind};

/// Print the detected toolchain kind and its compile/link flags
pub(crate) fn run(config: Option<&str>, compiler: Option<&str>) -> Result<()> {
    let cfg = super::load_config(config)?;
    let driver = cfg.compiler_driver(compiler);

    let kind = ToolchainKind::recognize(&driver).unwrap_or_else(|| {
        eprintln!("warning: unrecognized compiler driver '{driver}', using fallback flags");
        ToolchainKind::default()
    });
    let flags = FlagPolicy::for_kind(kind);

    println!("driver:    {driver}");
    println!("toolchain: {kind}");
    println!("compile:   {}", flags.compile.join(" "));
    println!("link:      {}", flags.link.join(" "));

    Ok(())
}
