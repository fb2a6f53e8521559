//! Sources command
//!
//! List the source inventory a build would use

use anyhow::Result;
use arborist_build::SourceSet;

/// Print native and binding sources, one per line
pub(crate) fn run(config: Option<&str>) -> Result<()> {
    let cfg = super::load_config(config)?;
    let (native, binding) = super::load_sources(&cfg)?;

    print_set(&native);
    println!();
    print_set(&binding);

    Ok(())
}

fn print_set(set: &SourceSet) {
    println!("{} sources ({}):", set.language(), set.len());
    for path in set.paths() {
        println!("  {}", path.display());
    }
}
