//! Subcommand implementations

pub(crate) mod build;
pub(crate) mod clean;
pub(crate) mod completion;
pub(crate) mod flags;
pub(crate) mod sources;

use anyhow::{Context, Result};
use arborist_build::{Config, Language, SourceSet};
use std::path::Path;

/// Load the config named on the command line, or discover one
pub(crate) fn load_config(path: Option<&str>) -> Result<Config> {
    Config::load_with_options(path.map(Path::new)).context("Failed to load configuration")
}

/// Scan the native and binding source sets described by `cfg`
///
/// Extra native sources that do not exist are skipped with a warning, the
/// way an optional callback unit may be absent from a checkout.
pub(crate) fn load_sources(cfg: &Config) -> Result<(SourceSet, SourceSet)> {
    let extra = cfg
        .extra_sources()
        .into_iter()
        .filter(|path| {
            let exists = path.is_file();
            if !exists {
                eprintln!(
                    "warning: extra native source {} not found, skipping",
                    path.display()
                );
            }
            exists
        })
        .collect();

    let native = SourceSet::scan_with_extra(&cfg.native_dir, Language::Native, extra)
        .with_context(|| {
            format!(
                "Failed to collect native sources from {}",
                cfg.native_dir.display()
            )
        })?;

    let binding = SourceSet::scan(&cfg.binding_dir, Language::Binding).with_context(|| {
        format!(
            "Failed to collect binding sources from {}",
            cfg.binding_dir.display()
        )
    })?;

    Ok((native, binding))
}
