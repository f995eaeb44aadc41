//! `keel build`, a one-shot incremental build.
//!
//! Loads the project, builds it against the snapshot left by the previous
//! build, and reports diagnostics. Returns exit code 1 if any diagnostic is
//! an error; outputs and the snapshot are written either way.

use keel_build::{build_project, Project, ScriptBackend};
use keel_source::DiskHost;

use crate::pipeline::{overrides, report_outcome, resolve_config_path};
use crate::{BuildArgs, GlobalArgs};

/// Runs the `keel build` command.
pub fn run(args: &BuildArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config_path = resolve_config_path(global)?;
    let host = DiskHost::default();
    let project = Project::load(&host, &config_path, &overrides(&args.overrides))?;

    if !global.quiet {
        eprintln!(
            "   Building {} v{}",
            project.config.project.name, project.config.project.version
        );
    }

    let backend = ScriptBackend::new();
    let outcome = build_project(&host, &project, &backend, args.force)?;
    let program = project.load_program(&host)?;
    Ok(report_outcome(&outcome, &project, &program, args.format, global))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OverrideArgs, ReportFormat};
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn project(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keel.toml"), "[project]\nname = \"demo\"\n").unwrap();
        for (rel, text) in files {
            let path = tmp.path().join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        tmp
    }

    fn global(dir: &Path) -> GlobalArgs {
        GlobalArgs {
            quiet: true,
            verbose: false,
            color: false,
            config: Some(dir.display().to_string()),
        }
    }

    fn args(force: bool) -> BuildArgs {
        BuildArgs {
            force,
            format: ReportFormat::Compact,
            overrides: OverrideArgs::default(),
        }
    }

    #[test]
    fn build_writes_outputs_and_snapshot() {
        let tmp = project(&[("src/a.ts", "const a = 1;")]);
        let code = run(&args(false), &global(tmp.path())).unwrap();
        assert_eq!(code, 0);
        assert_eq!(
            fs::read_to_string(tmp.path().join("src/a.js")).unwrap(),
            "var a = 1;\n"
        );
        let snapshot = fs::read_to_string(tmp.path().join("keel.buildinfo")).unwrap();
        assert!(snapshot.contains("\"version\""));
    }

    #[test]
    fn type_error_exits_with_one() {
        let tmp = project(&[("src/a.ts", "const y: string = 20;")]);
        let code = run(&args(false), &global(tmp.path())).unwrap();
        assert_eq!(code, 1);
        assert!(tmp.path().join("src/a.js").exists());
    }

    #[test]
    fn second_build_leaves_outputs_untouched() {
        let tmp = project(&[("src/a.ts", "const a = 1;")]);
        run(&args(false), &global(tmp.path())).unwrap();
        let js = tmp.path().join("src/a.js");
        fs::write(&js, "sentinel").unwrap();

        run(&args(false), &global(tmp.path())).unwrap();
        assert_eq!(fs::read_to_string(&js).unwrap(), "sentinel");

        run(&args(true), &global(tmp.path())).unwrap();
        assert_eq!(fs::read_to_string(&js).unwrap(), "var a = 1;\n");
    }

    #[test]
    fn out_dir_override_relocates_outputs() {
        let tmp = project(&[("src/nested/a.ts", "const a = 1;")]);
        let mut build_args = args(false);
        build_args.overrides.out_dir = Some("dist".into());
        run(&build_args, &global(tmp.path())).unwrap();
        assert!(tmp.path().join("dist/a.js").exists());
        assert!(tmp.path().join("dist/keel.buildinfo").exists());
    }

    #[test]
    fn missing_project_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut g = global(tmp.path());
        g.config = Some(tmp.path().join("keel.toml").display().to_string());
        assert!(run(&args(false), &g).is_err());
    }
}
