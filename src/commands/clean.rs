//! Clean command
//!
//! Remove the build output directory

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

/// Remove the output directory (objects, static library and modules)
pub(crate) fn run(config: Option<&str>, out_dir_override: Option<&str>) -> Result<()> {
    let out_dir = match out_dir_override {
        Some(dir) => PathBuf::from(dir),
        None => super::load_config(config)?.out_dir,
    };

    if !out_dir.exists() {
        println!("Nothing to clean at {}", out_dir.display());
        return Ok(());
    }

    fs::remove_dir_all(&out_dir)
        .with_context(|| format!("Failed to remove {}", out_dir.display()))?;
    println!("Removed {}", out_dir.display());

    Ok(())
}
