//! Shared helpers for CLI commands.
//!
//! Project root resolution, override merging, and diagnostic reporting used
//! by `build`, `watch` and `clean`.

use std::path::{Path, PathBuf};

use keel_build::{BuildOutcome, Project};
use keel_config::{CompilerOverrides, CONFIG_FILE};
use keel_diagnostics::{CompactRenderer, Diagnostic, DiagnosticRenderer, TerminalRenderer};
use keel_source::path::normalize;
use keel_source::SourceDb;

use crate::{GlobalArgs, OverrideArgs, ReportFormat};

/// Walks up from `start` looking for the nearest directory containing `keel.toml`.
///
/// Returns the directory containing `keel.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the configuration file from global CLI args.
///
/// If `--config` names a directory, its `keel.toml` is used. Otherwise walks
/// up from the current directory. The result is absolute.
pub fn resolve_config_path(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let path = match &global.config {
        Some(config_path) => {
            let p = cwd.join(config_path);
            if p.is_dir() {
                p.join(CONFIG_FILE)
            } else {
                p
            }
        }
        None => find_project_root(&cwd)?.join(CONFIG_FILE),
    };
    Ok(normalize(&path))
}

/// Converts command-line flags into configuration overrides.
pub fn overrides(args: &OverrideArgs) -> CompilerOverrides {
    CompilerOverrides {
        module: args.module,
        out_file: args.out_file.clone(),
        out_dir: args.out_dir.clone(),
        declaration: args.declaration.then_some(true),
        incremental: None,
    }
}

/// Prints the diagnostics of a build in the requested format.
pub fn render_diagnostics(
    diagnostics: &[Diagnostic],
    program: &SourceDb,
    base_dir: &Path,
    format: ReportFormat,
    global: &GlobalArgs,
) {
    if diagnostics.is_empty() {
        return;
    }

    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(global.color, Some(base_dir.to_path_buf()));
            for diag in diagnostics {
                eprintln!("{}", renderer.render(diag, program));
            }
        }
        ReportFormat::Compact => {
            let renderer = CompactRenderer::new(Some(base_dir.to_path_buf()));
            for diag in diagnostics {
                eprint!("{}", renderer.render(diag, program));
            }
        }
        ReportFormat::Json => {
            let json =
                serde_json::to_string_pretty(diagnostics).unwrap_or_else(|_| "[]".to_string());
            println!("{json}");
        }
    }
}

/// Prints diagnostics and the summary lines of a finished build.
///
/// Returns the process exit code: 1 if any diagnostic is an error.
pub fn report_outcome(
    outcome: &BuildOutcome,
    project: &Project,
    program: &SourceDb,
    format: ReportFormat,
    global: &GlobalArgs,
) -> i32 {
    render_diagnostics(&outcome.diagnostics, program, &project.root, format, global);

    if !global.quiet && format != ReportFormat::Json {
        let summary = &outcome.summary;
        let mode = if summary.full_rebuild { "full" } else { "incremental" };
        eprintln!(
            "    Emitted {} of {} file(s) ({mode}), {} checked, {} reused",
            summary.emitted, summary.files, summary.checked, summary.reused
        );
        let errors = outcome.error_count();
        let warnings = outcome.diagnostics.len() - errors;
        eprintln!("     Result: {errors} error(s), {warnings} warning(s)");
    }

    i32::from(outcome.has_errors())
}
