//! Build orchestration: snapshot in, snapshot out.
//!
//! [`build`] takes the previous snapshot (if any) and returns the new one
//! together with the outputs it wrote and the diagnostics to report. Outputs
//! are committed before the snapshot, and the snapshot is committed through
//! a temp file and a rename, so a failed build leaves the previous snapshot
//! in place.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use keel_cache::{load_snapshot, save_snapshot, BuildInfo, BundleBuildInfo, ProgramBuilder};
use keel_common::{InternalError, KeelResult};
use keel_config::ModuleKind;
use keel_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use keel_source::path::{canonical_key, with_extension};
use keel_source::{SourceDb, SourceFile, SourceHost};
use tracing::{debug, info};

use crate::backend::{is_declaration_file, CompilerBackend, EmitTarget};
use crate::emit::{assemble_bundle, EmitWriter};
use crate::error::BuildError;
use crate::planner::{plan, plan_bundle};
use crate::project::Project;

/// Counts describing what a build did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildSummary {
    /// Input files in the program.
    pub files: usize,
    /// Files whose output was written.
    pub emitted: usize,
    /// Files whose diagnostics were recomputed.
    pub checked: usize,
    /// Files whose diagnostics were carried over from the previous build.
    pub reused: usize,
    /// Whether the previous snapshot was unusable.
    pub full_rebuild: bool,
}

/// The result of a successful build.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    /// The snapshot describing this build.
    pub snapshot: BuildInfo,
    /// Where the snapshot belongs.
    pub snapshot_path: PathBuf,
    /// Output files written, in write order (snapshot excluded).
    pub written: Vec<PathBuf>,
    /// Diagnostics to report, in program order.
    pub diagnostics: Vec<Diagnostic>,
    /// What the build did.
    pub summary: BuildSummary,
}

impl BuildOutcome {
    /// Number of error diagnostics.
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// Returns `true` if any diagnostic is an error.
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Loads the previous snapshot (unless `force` is set or the project is not
/// incremental) and runs [`build`].
pub fn build_project<H: SourceHost + ?Sized>(
    host: &H,
    project: &Project,
    backend: &dyn CompilerBackend,
    force: bool,
) -> Result<BuildOutcome, BuildError> {
    let prior = if force || !project.config.compiler.incremental {
        None
    } else {
        load_snapshot(host, &project.snapshot_path())
    };
    build(host, project, backend, prior.as_ref())
}

/// Runs one build against `prior` and commits its outputs and snapshot.
///
/// The snapshot is only written when the project is incremental.
pub fn build<H: SourceHost + ?Sized>(
    host: &H,
    project: &Project,
    backend: &dyn CompilerBackend,
    prior: Option<&BuildInfo>,
) -> Result<BuildOutcome, BuildError> {
    project.check_inputs()?;
    let program = project.load_program(host)?;
    let snapshot_path = project.snapshot_path();

    let mut writer = EmitWriter::new(project.case);
    for input in project.input_files() {
        writer.protect_input(input);
    }
    writer.reserve_snapshot(&snapshot_path);

    let (snapshot, diagnostics, summary) = match project.out_file() {
        Some(out_file) => {
            build_bundle(host, project, backend, &program, prior, &out_file, &mut writer)?
        }
        None => build_program(project, backend, &program, prior, &mut writer)?,
    };

    let written = writer.commit(host)?;
    if project.config.compiler.incremental {
        save_snapshot(host, &snapshot_path, &snapshot)?;
    }
    info!(
        files = summary.files,
        emitted = summary.emitted,
        checked = summary.checked,
        reused = summary.reused,
        errors = diagnostics.iter().filter(|d| d.is_error()).count(),
        "build finished"
    );

    Ok(BuildOutcome {
        snapshot,
        snapshot_path,
        written,
        diagnostics,
        summary,
    })
}

fn check(backend: &dyn CompilerBackend, file: &SourceFile, program: &SourceDb) -> Vec<Diagnostic> {
    let sink = DiagnosticSink::new();
    backend.check(file, program, &sink);
    sink.take_sorted()
}

/// Looks up a planned file; the plan is built from `program`, so a miss is a bug.
fn program_file<'a>(program: &'a SourceDb, path: &Path) -> KeelResult<&'a SourceFile> {
    program.get(path).ok_or_else(|| {
        InternalError::new(format!("{} was planned but not loaded", path.display()))
    })
}

type Built = (BuildInfo, Vec<Diagnostic>, BuildSummary);

fn build_program(
    project: &Project,
    backend: &dyn CompilerBackend,
    program: &SourceDb,
    prior: Option<&BuildInfo>,
    writer: &mut EmitWriter,
) -> Result<Built, BuildError> {
    let paths = project.snapshot_paths();
    let options = project.options();
    let plan = plan(program, prior, &paths, &options, backend);

    let mut summary = BuildSummary {
        files: plan.files.len(),
        full_rebuild: plan.is_full_rebuild(),
        ..Default::default()
    };
    let mut diagnostics = Vec::new();
    let mut builder = ProgramBuilder::new(paths);
    builder.options(&options);

    for planned in &plan.files {
        let file_diags = match &planned.reusable_diagnostics {
            Some(reused) => {
                summary.reused += 1;
                reused.clone()
            }
            None => {
                summary.checked += 1;
                check(backend, program_file(program, &planned.path)?, program)
            }
        };
        builder
            .file(&planned.path, planned.info)
            .references(&planned.path, &planned.references)
            .exported_modules(&planned.path, &planned.exported_modules)
            .diagnostics(&planned.path, &file_diags);
        diagnostics.extend(file_diags);
    }

    let layout = project.output_layout();
    for kept in plan.files.iter().filter(|f| !f.needs_emit() && !is_declaration_file(&f.path)) {
        writer.reserve_output(&layout.js_path(&kept.path));
        if let Some(dts) = layout.dts_path(&kept.path) {
            writer.reserve_output(&dts);
        }
    }
    let target = EmitTarget::file(project.config.compiler.module);
    for planned in plan.to_emit() {
        let file = program_file(program, &planned.path)?;
        writer.stage(layout.js_path(&file.path), backend.emit(file, program, &target))?;
        if let Some(dts) = layout.dts_path(&file.path) {
            writer.stage(dts, backend.declaration(file))?;
        }
        summary.emitted += 1;
    }

    Ok((BuildInfo::program(builder.finish()), diagnostics, summary))
}

fn build_bundle<H: SourceHost + ?Sized>(
    host: &H,
    project: &Project,
    backend: &dyn CompilerBackend,
    program: &SourceDb,
    prior: Option<&BuildInfo>,
    out_file: &Path,
    writer: &mut EmitWriter,
) -> Result<Built, BuildError> {
    let paths = project.snapshot_paths();
    let options = project.options();
    let module = project.config.compiler.module;
    let plan = plan_bundle(program, prior, &paths, &options, backend);

    let mut summary = BuildSummary {
        files: program.len(),
        full_rebuild: plan.invalidation.is_some(),
        ..Default::default()
    };

    let mut diagnostics = Vec::new();
    let sources: Vec<&SourceFile> = program
        .iter()
        .filter(|f| !is_declaration_file(&f.path))
        .collect();
    if module == ModuleKind::None && sources.iter().any(|f| backend.is_module(f)) {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::OUT_FILE_REQUIRES_AMD,
            "Cannot compile modules using '--outFile' unless '--module' is 'amd'.",
        ));
    }
    for file in program.iter() {
        diagnostics.extend(check(backend, file, program));
        summary.checked += 1;
    }

    let dts_file = with_extension(out_file, ".d.ts");
    let declaration = project.config.compiler.declaration;
    let outputs_exist =
        host.file_exists(out_file) && (!declaration || host.file_exists(&dts_file));
    if plan.is_up_to_date() && outputs_exist {
        if let Some(previous) = prior.and_then(BuildInfo::as_bundle) {
            debug!(out_file = %out_file.display(), "bundle is up to date");
            return Ok((BuildInfo::bundle(previous.clone()), diagnostics, summary));
        }
    }

    let common_dir = project.common_source_dir();
    let target = EmitTarget::bundle(module, &common_dir);
    let bundle = assemble_bundle(program, backend, &target, declaration);

    let mut info = BundleBuildInfo::new(
        &paths,
        &common_dir,
        sources.iter().map(|f| f.path.as_path()),
        bundle.js.layout,
    );
    info.record_files(&paths, &plan.store);
    info.options = options;

    writer.stage(out_file.to_path_buf(), bundle.js.text)?;
    if let Some(dts) = bundle.dts {
        info.dts = Some(dts.layout);
        writer.stage(dts_file, dts.text)?;
    }
    summary.emitted = sources.len();

    Ok((BuildInfo::bundle(info), diagnostics, summary))
}

/// Groups diagnostics by file, keeping global diagnostics under `None`.
pub fn diagnostics_by_file(
    diagnostics: &[Diagnostic],
) -> BTreeMap<Option<&Path>, Vec<&Diagnostic>> {
    let mut grouped: BTreeMap<Option<&Path>, Vec<&Diagnostic>> = BTreeMap::new();
    for diag in diagnostics {
        grouped.entry(diag.file.as_deref()).or_default().push(diag);
    }
    grouped
}

/// Deletes the outputs of the last build and its snapshot.
///
/// Outputs are those of the current inputs plus those of every source the
/// snapshot still records, so files of since-deleted sources go too.
/// Returns the files actually removed.
pub fn clean<H: SourceHost + ?Sized>(
    host: &H,
    project: &Project,
) -> Result<Vec<PathBuf>, BuildError> {
    let snapshot_path = project.snapshot_path();
    let mut sources: Vec<PathBuf> = project.sources.clone();
    if let Some(program) = load_snapshot(host, &snapshot_path)
        .as_ref()
        .and_then(BuildInfo::as_program)
    {
        let recorded = program.resolve(&project.snapshot_paths()).files;
        sources.extend(
            recorded
                .iter()
                .map(|(path, _)| path.to_path_buf())
                .filter(|path| !project.lib_files.contains(path)),
        );
    }

    let mut targets = project.outputs_of(sources.iter().map(PathBuf::as_path));
    targets.push(snapshot_path);
    let mut seen = BTreeSet::new();
    let mut removed = Vec::new();
    for path in targets {
        if !seen.insert(canonical_key(&path, project.case)) || !host.file_exists(&path) {
            continue;
        }
        host.remove_file(&path).map_err(|e| BuildError::Remove {
            path: path.clone(),
            source: e,
        })?;
        debug!(path = %path.display(), "removed");
        removed.push(path);
    }
    info!(removed = removed.len(), "clean finished");
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptBackend;
    use keel_config::CompilerOverrides;
    use keel_source::{MemoryHost, PathCase};

    fn project(host: &MemoryHost) -> Project {
        Project::load(host, Path::new("/p/keel.toml"), &CompilerOverrides::default()).unwrap()
    }

    fn host(compiler: &str, files: &[(&str, &str)]) -> MemoryHost {
        let config = format!(
            "[project]\nname = \"demo\"\n\n[compiler]\n{compiler}\n\n[files]\ninclude = [\"src\"]\n"
        );
        let mut all: Vec<(String, String)> = vec![("/p/keel.toml".into(), config)];
        all.extend(files.iter().map(|(p, c)| (p.to_string(), c.to_string())));
        MemoryHost::with_files(PathCase::Sensitive, all)
    }

    #[test]
    fn first_build_writes_outputs_then_snapshot() {
        let host = host("", &[("/p/src/a.ts", "const a = 1;")]);
        let project = project(&host);
        let outcome = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();

        assert_eq!(outcome.written, vec![PathBuf::from("/p/src/a.js")]);
        assert_eq!(host.content(Path::new("/p/src/a.js")).as_deref(), Some("var a = 1;\n"));
        assert!(host.file_exists(&outcome.snapshot_path));
        assert!(!host.file_exists(Path::new("/p/keel.buildinfo.tmp")));
        let writes = host.take_writes();
        assert_eq!(writes.first(), Some(&PathBuf::from("/p/src/a.js")));
        assert!(outcome.summary.full_rebuild);
        assert_eq!(outcome.summary.emitted, 1);
    }

    #[test]
    fn not_incremental_skips_snapshot() {
        let host = host("incremental = false", &[("/p/src/a.ts", "const a = 1;")]);
        let project = project(&host);
        let outcome = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        assert!(!host.file_exists(&outcome.snapshot_path));
        assert_eq!(outcome.written.len(), 1);
    }

    #[test]
    fn force_ignores_snapshot() {
        let host = host("", &[("/p/src/a.ts", "const a = 1;")]);
        let project = project(&host);
        build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        let again = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        assert!(again.written.is_empty());
        let forced = build_project(&host, &project, &ScriptBackend::new(), true).unwrap();
        assert_eq!(forced.written, vec![PathBuf::from("/p/src/a.js")]);
    }

    #[test]
    fn declarations_and_out_dir() {
        let host = host(
            "declaration = true\nout_dir = \"dist\"",
            &[("/p/src/a.ts", "const a = 1;"), ("/p/src/lib/b.ts", "let b: string = \"x\";")],
        );
        let project = project(&host);
        let outcome = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        assert_eq!(
            outcome.written,
            vec![
                PathBuf::from("/p/dist/a.js"),
                PathBuf::from("/p/dist/a.d.ts"),
                PathBuf::from("/p/dist/lib/b.js"),
                PathBuf::from("/p/dist/lib/b.d.ts"),
            ]
        );
        assert_eq!(
            host.content(Path::new("/p/dist/lib/b.d.ts")).as_deref(),
            Some("declare let b: string;\n")
        );
        assert_eq!(outcome.snapshot_path, PathBuf::from("/p/dist/keel.buildinfo"));
    }

    #[test]
    fn outfile_with_script_modules_reports_6131() {
        let host = host("out_file = \"out.js\"", &[("/p/src/a.ts", "export const a = 1;")]);
        let project = project(&host);
        let outcome = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        assert_eq!(outcome.diagnostics[0].code, DiagnosticCode::OUT_FILE_REQUIRES_AMD);
        assert!(outcome.diagnostics[0].file.is_none());
        assert!(host.file_exists(Path::new("/p/out.js")));
    }

    #[test]
    fn diagnostics_grouped_by_file() {
        let diags = vec![
            Diagnostic::error(DiagnosticCode(1), "a").at(Path::new("/p/b.ts"), 0, 1),
            Diagnostic::error(DiagnosticCode(2), "b"),
            Diagnostic::error(DiagnosticCode(3), "c").at(Path::new("/p/b.ts"), 2, 1),
        ];
        let grouped = diagnostics_by_file(&diags);
        assert_eq!(grouped[&None].len(), 1);
        assert_eq!(grouped[&Some(Path::new("/p/b.ts"))].len(), 2);
    }

    #[test]
    fn clean_removes_outputs_of_deleted_sources() {
        let host = host(
            "declaration = true",
            &[("/p/src/a.ts", "const a = 1;"), ("/p/src/b.ts", "const b = 1;")],
        );
        build_project(&host, &project(&host), &ScriptBackend::new(), false).unwrap();
        host.remove_file(Path::new("/p/src/b.ts")).unwrap();
        host.write_file(Path::new("/p/src/notes.txt"), "keep").unwrap();

        let mut removed = clean(&host, &project(&host)).unwrap();
        removed.sort();
        assert_eq!(
            removed,
            vec![
                PathBuf::from("/p/keel.buildinfo"),
                PathBuf::from("/p/src/a.d.ts"),
                PathBuf::from("/p/src/a.js"),
                PathBuf::from("/p/src/b.d.ts"),
                PathBuf::from("/p/src/b.js"),
            ]
        );
        assert!(host.file_exists(Path::new("/p/src/a.ts")));
        assert!(host.file_exists(Path::new("/p/src/notes.txt")));
        assert!(clean(&host, &project(&host)).unwrap().is_empty());
    }

    #[test]
    fn clean_removes_bundle() {
        let host = host("out_file = \"out.js\"", &[("/p/src/a.ts", "const a = 1;")]);
        build_project(&host, &project(&host), &ScriptBackend::new(), false).unwrap();
        let removed = clean(&host, &project(&host)).unwrap();
        assert_eq!(
            removed,
            vec![PathBuf::from("/p/out.js"), PathBuf::from("/p/out.buildinfo")]
        );
    }

    #[test]
    fn builds_on_disk() {
        use keel_source::DiskHost;

        let tmp = tempfile::TempDir::new().unwrap();
        let root = tmp.path();
        std::fs::write(root.join("keel.toml"), "[project]\nname = \"disk\"\n").unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/a.ts"), "const a = 1;").unwrap();

        let host = DiskHost::new(PathCase::Sensitive);
        let config = root.join("keel.toml");
        let project = Project::load(&host, &config, &CompilerOverrides::default()).unwrap();
        let first = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        assert_eq!(first.written, vec![root.join("src/a.js")]);
        assert!(root.join("keel.buildinfo").is_file());
        assert!(!root.join("keel.buildinfo.tmp").exists());

        let second = build_project(&host, &project, &ScriptBackend::new(), false).unwrap();
        assert!(second.written.is_empty());
        assert!(!second.summary.full_rebuild);
    }
}
