//! Incremental build planning.
//!
//! The planner compares the current program against the previous build's
//! snapshot and decides, per file, whether its previous results can be
//! reused. Emit is signature-driven: a file whose *text* changed is always
//! re-emitted, but its dependents are only re-emitted when its *signature*
//! (the hash of its declaration text) changed.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};

use keel_cache::{
    BuildInfo, ChangeSet, FileInfo, FileInfoStore, OptionValue, ResolvedProgram, SnapshotPaths,
    SourceHasher,
};
use keel_common::ContentHash;
use keel_diagnostics::Diagnostic;
use keel_source::path::canonical_key;
use keel_source::SourceDb;
use tracing::debug;

use crate::backend::{is_declaration_file, CompilerBackend};

/// Why the previous snapshot could not be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// There was no usable snapshot.
    NoSnapshot,
    /// The snapshot was recorded with different compiler options.
    OptionsChanged,
    /// The snapshot describes a bundle build but this is a program build, or
    /// the other way round.
    KindChanged,
}

impl fmt::Display for Invalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Invalidation::NoSnapshot => "no prior snapshot",
            Invalidation::OptionsChanged => "compiler options changed",
            Invalidation::KindChanged => "output mode changed",
        })
    }
}

/// What the planner decided for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    /// Same version as in the previous build; previous results are reused.
    Unchanged,
    /// No record in the previous build.
    Added,
    /// The text changed.
    Modified {
        /// Whether the declaration text changed too.
        signature_changed: bool,
    },
    /// The text is unchanged but a file it depends on changed its interface
    /// (or was added or deleted).
    Affected,
}

/// The plan for one file of the program.
#[derive(Debug, Clone)]
pub struct PlannedFile {
    /// Path of the file.
    pub path: PathBuf,
    /// Version and signature for the new snapshot.
    pub info: FileInfo,
    /// The decision.
    pub state: FileState,
    /// Files this file depends on.
    pub references: Vec<PathBuf>,
    /// Files whose exports this file re-exports.
    pub exported_modules: Vec<PathBuf>,
    /// Diagnostics carried over from the previous build, if reusable.
    pub reusable_diagnostics: Option<Vec<Diagnostic>>,
}

impl PlannedFile {
    /// Returns `true` if the file's output must be written in this build.
    pub fn needs_emit(&self) -> bool {
        self.state != FileState::Unchanged && !is_declaration_file(&self.path)
    }

    /// Returns `true` if the file's diagnostics must be recomputed.
    pub fn needs_check(&self) -> bool {
        self.reusable_diagnostics.is_none()
    }
}

/// The result of planning a program build.
#[derive(Debug, Clone)]
pub struct BuildPlan {
    /// Every current file, in program order.
    pub files: Vec<PlannedFile>,
    /// Version and signature of every current file.
    pub store: FileInfoStore,
    /// Files recorded by the previous build that no longer exist.
    pub deleted: Vec<PathBuf>,
    /// Version comparison against the previous build.
    pub changes: ChangeSet,
    /// Set when the previous snapshot was not used at all.
    pub invalidation: Option<Invalidation>,
}

impl BuildPlan {
    /// Files whose output must be written, in program order.
    pub fn to_emit(&self) -> impl Iterator<Item = &PlannedFile> {
        self.files.iter().filter(|f| f.needs_emit())
    }

    /// Diagnostics reusable without recomputation, keyed by file.
    pub fn reusable_diagnostics(&self) -> BTreeMap<&Path, &[Diagnostic]> {
        self.files
            .iter()
            .filter_map(|f| {
                f.reusable_diagnostics
                    .as_deref()
                    .map(|d| (f.path.as_path(), d))
            })
            .collect()
    }

    /// Returns `true` if every file is treated as changed.
    pub fn is_full_rebuild(&self) -> bool {
        self.invalidation.is_some()
    }
}

fn usable_program(
    prior: Option<&BuildInfo>,
    paths: &SnapshotPaths,
    options: &BTreeMap<String, OptionValue>,
) -> Result<ResolvedProgram, Invalidation> {
    let info = prior.ok_or(Invalidation::NoSnapshot)?;
    let program = info.as_program().ok_or(Invalidation::KindChanged)?;
    if &program.options != options {
        return Err(Invalidation::OptionsChanged);
    }
    Ok(program.resolve(paths))
}

/// Plans a program build.
///
/// * A file whose version matches the previous build keeps its signature,
///   references and diagnostics.
/// * A changed or new file is dirty: its signature, references and
///   diagnostics are recomputed.
/// * When a dirty file's signature changed, or a file was added or deleted,
///   every direct and transitive dependent (through the reverse reference
///   map) is re-emitted and re-checked.
/// * Without a usable snapshot (none, wrong kind, or different options)
///   every file is dirty.
pub fn plan(
    program: &SourceDb,
    prior: Option<&BuildInfo>,
    paths: &SnapshotPaths,
    options: &BTreeMap<String, OptionValue>,
    backend: &dyn CompilerBackend,
) -> BuildPlan {
    let case = program.path_case();
    let (prior, invalidation) = match usable_program(prior, paths, options) {
        Ok(resolved) => (Some(resolved), None),
        Err(reason) => {
            debug!(%reason, "planning a full rebuild");
            (None, Some(reason))
        }
    };

    let current: Vec<(PathBuf, ContentHash)> =
        program.iter().map(|f| (f.path.clone(), f.version)).collect();
    let mut store = prior
        .as_ref()
        .map(|p| p.files.clone())
        .unwrap_or_else(|| FileInfoStore::new(case));
    let changes = SourceHasher::detect_changes(&current, &store);
    for deleted in &changes.deleted_files {
        store.remove(deleted);
    }

    let mut files = Vec::with_capacity(program.len());
    let mut seeds: Vec<PathBuf> = changes.deleted_files.clone();
    for file in program.iter() {
        let previous = prior.as_ref().and_then(|p| p.files.get(&file.path).map(|i| (p, i)));
        let planned = match previous {
            Some((p, info)) if info.version == file.version => PlannedFile {
                path: file.path.clone(),
                info,
                state: FileState::Unchanged,
                references: p.references(&file.path).to_vec(),
                exported_modules: p.exported_modules(&file.path).to_vec(),
                reusable_diagnostics: p.diagnostics(&file.path).map(<[Diagnostic]>::to_vec),
            },
            _ => {
                let info = backend.file_info(file);
                let state = match previous {
                    Some((_, old)) => FileState::Modified {
                        signature_changed: old.signature != info.signature,
                    },
                    None => FileState::Added,
                };
                if matches!(
                    state,
                    FileState::Added | FileState::Modified { signature_changed: true }
                ) {
                    seeds.push(file.path.clone());
                }
                store.set(&file.path, info);
                PlannedFile {
                    path: file.path.clone(),
                    info,
                    state,
                    references: backend.references(file, program),
                    exported_modules: backend.exported_modules(file, program),
                    reusable_diagnostics: None,
                }
            }
        };
        files.push(planned);
    }

    // A new file can take over an import that used to resolve elsewhere
    // (`./util` moving from `util/index.ts` to `util.ts`) or not at all.
    let mut rebound = BTreeSet::new();
    if !changes.new_files.is_empty() {
        for (idx, f) in files.iter_mut().enumerate() {
            if f.state != FileState::Unchanged {
                continue;
            }
            let Some(source) = program.get(&f.path) else {
                continue;
            };
            let references = backend.references(source, program);
            if same_paths(&references, &f.references, case) {
                continue;
            }
            let exported_modules = backend.exported_modules(source, program);
            if !same_paths(&exported_modules, &f.exported_modules, case) {
                seeds.push(f.path.clone());
            }
            f.references = references;
            f.exported_modules = exported_modules;
            rebound.insert(idx);
        }
    }

    let mut affected = propagate(&files, &seeds, case);
    affected.extend(rebound);

    for idx in affected {
        let f = &mut files[idx];
        if f.state != FileState::Unchanged {
            continue;
        }
        f.state = FileState::Affected;
        f.reusable_diagnostics = None;
        if let Some(source) = program.get(&f.path) {
            f.references = backend.references(source, program);
            f.exported_modules = backend.exported_modules(source, program);
        }
    }

    let plan = BuildPlan {
        files,
        store,
        deleted: changes.deleted_files.clone(),
        changes,
        invalidation,
    };
    debug!(
        files = plan.files.len(),
        dirty = plan.changes.dirty_count(),
        deleted = plan.deleted.len(),
        emit = plan.to_emit().count(),
        "build planned"
    );
    plan
}

fn same_paths(a: &[PathBuf], b: &[PathBuf], case: keel_source::PathCase) -> bool {
    let keys = |paths: &[PathBuf]| -> BTreeSet<String> {
        paths.iter().map(|p| canonical_key(p, case)).collect()
    };
    keys(a) == keys(b)
}

/// Breadth-first walk of the reverse reference graph from `seeds`.
///
/// Returns the indices (into `files`) of every direct and transitive
/// dependent of a seed.
fn propagate(
    files: &[PlannedFile],
    seeds: &[PathBuf],
    case: keel_source::PathCase,
) -> BTreeSet<usize> {
    let mut dependents: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (idx, f) in files.iter().enumerate() {
        for target in &f.references {
            dependents
                .entry(canonical_key(target, case))
                .or_default()
                .push(idx);
        }
    }

    let mut visited: BTreeSet<String> = seeds.iter().map(|p| canonical_key(p, case)).collect();
    let mut queue: VecDeque<String> = visited.iter().cloned().collect();
    let mut affected = BTreeSet::new();

    while let Some(key) = queue.pop_front() {
        let Some(deps) = dependents.get(&key) else {
            continue;
        };
        for &idx in deps {
            affected.insert(idx);
            let dep_key = canonical_key(&files[idx].path, case);
            if visited.insert(dep_key.clone()) {
                queue.push_back(dep_key);
            }
        }
    }
    affected
}

/// The result of planning a bundle build.
#[derive(Debug, Clone)]
pub struct BundlePlan {
    /// Version and signature of every current file.
    pub store: FileInfoStore,
    /// Version comparison against the previous build.
    pub changes: ChangeSet,
    /// Set when the previous snapshot was not used at all.
    pub invalidation: Option<Invalidation>,
}

impl BundlePlan {
    /// Returns `true` if the previous bundle is still valid.
    ///
    /// Any added, modified or removed input forces a full bundle re-emit.
    pub fn is_up_to_date(&self) -> bool {
        self.invalidation.is_none() && self.changes.is_empty()
    }
}

/// Plans a bundle build.
pub fn plan_bundle(
    program: &SourceDb,
    prior: Option<&BuildInfo>,
    paths: &SnapshotPaths,
    options: &BTreeMap<String, OptionValue>,
    backend: &dyn CompilerBackend,
) -> BundlePlan {
    let prior_files = match prior {
        None => Err(Invalidation::NoSnapshot),
        Some(info) => match info.as_bundle() {
            None => Err(Invalidation::KindChanged),
            Some(b) if &b.options != options => Err(Invalidation::OptionsChanged),
            Some(b) if b.file_infos.is_empty() => Err(Invalidation::NoSnapshot),
            Some(b) => Ok(b.resolve_files(paths)),
        },
    };
    let (prior_files, invalidation) = match prior_files {
        Ok(files) => (files, None),
        Err(reason) => {
            debug!(%reason, "bundle will be re-emitted");
            (FileInfoStore::new(program.path_case()), Some(reason))
        }
    };

    let current: Vec<(PathBuf, ContentHash)> =
        program.iter().map(|f| (f.path.clone(), f.version)).collect();
    let changes = SourceHasher::detect_changes(&current, &prior_files);

    let mut store = FileInfoStore::new(program.path_case());
    for file in program.iter() {
        let info = match prior_files.get(&file.path) {
            Some(info) if info.version == file.version => info,
            _ => backend.file_info(file),
        };
        store.set(&file.path, info);
    }

    BundlePlan {
        store,
        changes,
        invalidation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::ScriptBackend;
    use keel_cache::{BundleBuildInfo, BundleFileInfo, ProgramBuilder};
    use keel_diagnostics::DiagnosticCode;
    use keel_source::PathCase;

    fn paths() -> SnapshotPaths {
        SnapshotPaths::new(Path::new("/p/keel.buildinfo"), PathCase::Sensitive)
    }

    fn options() -> BTreeMap<String, OptionValue> {
        let mut o = BTreeMap::new();
        o.insert("incremental".to_string(), OptionValue::Bool(true));
        o
    }

    fn db(files: &[(&str, &str)]) -> SourceDb {
        let mut db = SourceDb::new(PathCase::Sensitive);
        for (path, text) in files {
            db.add_source(Path::new(path), text.to_string());
        }
        db
    }

    /// Records `plan` as the snapshot of a completed build, checking every
    /// file that needed it.
    fn snapshot_of(plan: &BuildPlan, program: &SourceDb) -> BuildInfo {
        let backend = ScriptBackend::new();
        let mut b = ProgramBuilder::new(paths());
        b.options(&options());
        for f in &plan.files {
            b.file(&f.path, f.info)
                .references(&f.path, &f.references)
                .exported_modules(&f.path, &f.exported_modules);
            let diags = match &f.reusable_diagnostics {
                Some(d) => d.clone(),
                None => {
                    let sink = keel_diagnostics::DiagnosticSink::new();
                    backend.check(program.get(&f.path).unwrap(), program, &sink);
                    sink.take_sorted()
                }
            };
            b.diagnostics(&f.path, &diags);
        }
        BuildInfo::program(b.finish())
    }

    fn build_twice(before: &[(&str, &str)], after: &[(&str, &str)]) -> BuildPlan {
        let backend = ScriptBackend::new();
        let first = db(before);
        let p1 = plan(&first, None, &paths(), &options(), &backend);
        let snapshot = snapshot_of(&p1, &first);
        let second = db(after);
        plan(&second, Some(&snapshot), &paths(), &options(), &backend)
    }

    fn emitted(plan: &BuildPlan) -> Vec<&str> {
        plan.to_emit().map(|f| f.path.to_str().unwrap()).collect()
    }

    #[test]
    fn first_build_everything_dirty() {
        let program = db(&[
            ("/a/lib/lib.d.ts", "interface Array<T> {}"),
            ("/p/file1.ts", "const x = 10;"),
        ]);
        let p = plan(&program, None, &paths(), &options(), &ScriptBackend::new());
        assert_eq!(p.invalidation, Some(Invalidation::NoSnapshot));
        assert!(p.is_full_rebuild());
        assert!(p.files.iter().all(|f| f.state == FileState::Added));
        assert_eq!(emitted(&p), vec!["/p/file1.ts"]);
        assert_eq!(p.store.len(), 2);
        let lib = p.store.get(Path::new("/a/lib/lib.d.ts")).unwrap();
        assert_eq!(lib.version, lib.signature);
    }

    #[test]
    fn unchanged_rebuild_emits_nothing() {
        let files = [("/p/file1.ts", "const x = 10;"), ("/p/file2.ts", "const y = 20;")];
        let p = build_twice(&files, &files);
        assert!(p.invalidation.is_none());
        assert!(p.changes.is_empty());
        assert!(emitted(&p).is_empty());
        assert!(p.files.iter().all(|f| !f.needs_check()));
    }

    #[test]
    fn script_change_reemits_only_that_file() {
        let p = build_twice(
            &[("/p/file1.ts", "const x = 10;"), ("/p/file2.ts", "const y = 20;")],
            &[("/p/file1.ts", "const x = 10;"), ("/p/file2.ts", "const z = 10;")],
        );
        assert_eq!(emitted(&p), vec!["/p/file2.ts"]);
        assert_eq!(p.changes.modified_files, vec![PathBuf::from("/p/file2.ts")]);
        assert_eq!(p.files[0].state, FileState::Unchanged);
        assert_eq!(p.files[1].state, FileState::Modified { signature_changed: true });
    }

    #[test]
    fn reusable_diagnostics_carried_over() {
        let files = [("/p/file1.ts", "const x = 10;"), ("/p/file2.ts", "const y: string = 20;")];
        let p = build_twice(&files, &files);
        let reusable = p.reusable_diagnostics();
        let diags = reusable[Path::new("/p/file2.ts")];
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].code, DiagnosticCode::TYPE_NOT_ASSIGNABLE);
        assert!(reusable[Path::new("/p/file1.ts")].is_empty());
    }

    #[test]
    fn body_change_does_not_propagate() {
        let p = build_twice(
            &[
                ("/p/a.ts", "export const a: number = 1;\nconst hidden = 1;"),
                ("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;"),
            ],
            &[
                ("/p/a.ts", "export const a: number = 2;\nconst hidden = 2;"),
                ("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;"),
            ],
        );
        assert_eq!(p.files[0].state, FileState::Modified { signature_changed: false });
        assert_eq!(p.files[1].state, FileState::Unchanged);
        assert_eq!(emitted(&p), vec!["/p/a.ts"]);
    }

    #[test]
    fn signature_change_propagates_transitively() {
        let before = [
            ("/p/a.ts", "export const a = 1;"),
            ("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;"),
            ("/p/c.ts", "import { b } from \"./b\";\nexport const c = b;"),
            ("/p/d.ts", "export const d = 4;"),
        ];
        let mut after = before;
        after[0] = ("/p/a.ts", "export const a = 1;\nexport const extra = 2;");
        let p = build_twice(&before, &after);
        assert_eq!(p.files[1].state, FileState::Affected);
        assert_eq!(p.files[2].state, FileState::Affected);
        assert_eq!(p.files[3].state, FileState::Unchanged);
        assert_eq!(emitted(&p), vec!["/p/a.ts", "/p/b.ts", "/p/c.ts"]);
        assert!(p.files[1].needs_check());
    }

    #[test]
    fn deleted_file_affects_importers() {
        let p = build_twice(
            &[
                ("/p/a.ts", "export const a = 1;"),
                ("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;"),
            ],
            &[("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;")],
        );
        assert_eq!(p.deleted, vec![PathBuf::from("/p/a.ts")]);
        assert!(!p.store.contains(Path::new("/p/a.ts")));
        assert_eq!(p.files[0].state, FileState::Affected);
        assert!(p.files[0].references.is_empty());
    }

    #[test]
    fn added_file_rechecks_unresolved_importers() {
        let p = build_twice(
            &[("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;")],
            &[
                ("/p/a.ts", "export const a = 1;"),
                ("/p/b.ts", "import { a } from \"./a\";\nexport const b = a;"),
            ],
        );
        assert_eq!(p.files[0].state, FileState::Added);
        assert_eq!(p.files[1].state, FileState::Affected);
        assert_eq!(p.files[1].references, vec![PathBuf::from("/p/a.ts")]);
    }

    #[test]
    fn added_file_that_wins_resolution_rebinds_importer() {
        let before = [
            ("/p/main.ts", "import { a } from \"./util\";\nexport const m = a;"),
            ("/p/other.ts", "export const o = 1;"),
            ("/p/util/index.ts", "export const a = 1;"),
        ];
        let p = build_twice(
            &before,
            &[
                before[0],
                before[1],
                ("/p/util.ts", "export const other = 1;"),
                before[2],
            ],
        );
        assert_eq!(p.files[0].state, FileState::Affected);
        assert_eq!(p.files[0].references, vec![PathBuf::from("/p/util.ts")]);
        assert!(p.files[0].needs_check());
        assert_eq!(p.files[1].state, FileState::Unchanged);
        assert_eq!(p.files[3].state, FileState::Unchanged);
        assert_eq!(emitted(&p), vec!["/p/main.ts", "/p/util.ts"]);
    }

    #[test]
    fn rebound_reexport_propagates_to_importers() {
        let before = [
            ("/p/barrel.ts", "export * from \"./util\";"),
            ("/p/main.ts", "import { a } from \"./barrel\";\nexport const m = a;"),
            ("/p/util/index.ts", "export const a = 1;"),
        ];
        let p = build_twice(
            &before,
            &[
                before[0],
                before[1],
                ("/p/util.ts", "export const other = 1;"),
                before[2],
            ],
        );
        assert_eq!(p.files[0].state, FileState::Affected);
        assert_eq!(p.files[0].exported_modules, vec![PathBuf::from("/p/util.ts")]);
        assert_eq!(p.files[1].state, FileState::Affected);
        assert_eq!(p.files[3].state, FileState::Unchanged);
    }

    #[test]
    fn options_change_invalidates_everything() {
        let backend = ScriptBackend::new();
        let program = db(&[("/p/file1.ts", "const x = 10;")]);
        let p1 = plan(&program, None, &paths(), &options(), &backend);
        let snapshot = snapshot_of(&p1, &program);

        let mut changed = options();
        changed.insert("module".to_string(), OptionValue::from("amd"));
        let p2 = plan(&program, Some(&snapshot), &paths(), &changed, &backend);
        assert_eq!(p2.invalidation, Some(Invalidation::OptionsChanged));
        assert_eq!(emitted(&p2), vec!["/p/file1.ts"]);
    }

    #[test]
    fn bundle_snapshot_invalidates_program_build() {
        let program = db(&[("/p/file1.ts", "const x = 10;")]);
        let bundle = BuildInfo::bundle(BundleBuildInfo::new(
            &paths(),
            Path::new("/p"),
            [Path::new("/p/file1.ts")],
            BundleFileInfo::text(0),
        ));
        let p = plan(&program, Some(&bundle), &paths(), &options(), &ScriptBackend::new());
        assert_eq!(p.invalidation, Some(Invalidation::KindChanged));
    }

    fn bundle_snapshot(plan: &BundlePlan) -> BuildInfo {
        let mut b = BundleBuildInfo::new(
            &paths(),
            Path::new("/p"),
            plan.store.iter().map(|(p, _)| p),
            BundleFileInfo::text(10),
        );
        b.record_files(&paths(), &plan.store);
        b.options = options();
        BuildInfo::bundle(b)
    }

    #[test]
    fn bundle_up_to_date_only_without_changes() {
        let backend = ScriptBackend::new();
        let files = [("/p/file1.ts", "const x = 10;"), ("/p/file2.ts", "const y = 20;")];
        let first = plan_bundle(&db(&files), None, &paths(), &options(), &backend);
        assert!(!first.is_up_to_date());
        let snapshot = bundle_snapshot(&first);

        let same = plan_bundle(&db(&files), Some(&snapshot), &paths(), &options(), &backend);
        assert!(same.is_up_to_date());

        let edited = [("/p/file1.ts", "const x = 10;"), ("/p/file2.ts", "const y = 21;")];
        let changed = plan_bundle(&db(&edited), Some(&snapshot), &paths(), &options(), &backend);
        assert!(!changed.is_up_to_date());
        assert_eq!(changed.changes.modified_files, vec![PathBuf::from("/p/file2.ts")]);

        let removed = plan_bundle(&db(&files[..1]), Some(&snapshot), &paths(), &options(), &backend);
        assert!(!removed.is_up_to_date());
    }

    #[test]
    fn invalidation_display() {
        assert_eq!(Invalidation::OptionsChanged.to_string(), "compiler options changed");
    }
}
