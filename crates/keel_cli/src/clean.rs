//! `keel clean`, removal of build outputs.

use keel_build::{clean, Project};
use keel_config::CompilerOverrides;
use keel_source::DiskHost;

use crate::pipeline::resolve_config_path;
use crate::GlobalArgs;

/// Runs the `keel clean` command.
///
/// Removes every output of the last build and its snapshot. Sources are
/// never touched.
pub fn run(global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(global)?;
    let host = DiskHost::default();
    let project = Project::load(&host, &config_path, &CompilerOverrides::default())?;

    let removed = clean(&host, &project)?;
    if !global.quiet {
        for path in &removed {
            eprintln!("     Removed {}", path.display());
        }
        eprintln!("    Cleaned {} file(s)", removed.len());
    }
    Ok(0)
}
