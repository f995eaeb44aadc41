//! The persisted build snapshot.
//!
//! A snapshot is either a *program* snapshot (one record per file, used for
//! per-file incremental emit) or a *bundle* snapshot (one combined output).
//! Every path inside a snapshot is stored relative to the snapshot file's
//! directory; [`SnapshotPaths`] converts in both directions.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keel_diagnostics::{Category, Diagnostic, DiagnosticCode};
use keel_source::path::{canonical_key, relative_path_from_dir, resolve_relative};
use keel_source::PathCase;
use serde::{Deserialize, Serialize};

use crate::file_info::{FileInfo, FileInfoStore};

/// Version stamp written into every snapshot.
///
/// A snapshot carrying any other stamp is treated as absent.
pub const SNAPSHOT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// A complete build snapshot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildInfo {
    /// The program or bundle payload.
    #[serde(flatten)]
    pub kind: SnapshotKind,
    /// Version stamp of the toolchain that wrote the snapshot.
    pub version: String,
}

/// Payload of a [`BuildInfo`], serialized under a `program` or `bundle` key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SnapshotKind {
    /// Per-file build state.
    Program(ProgramBuildInfo),
    /// Single-output build state.
    Bundle(BundleBuildInfo),
}

impl BuildInfo {
    /// Wraps a program snapshot with the current version stamp.
    pub fn program(info: ProgramBuildInfo) -> Self {
        Self {
            kind: SnapshotKind::Program(info),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }

    /// Wraps a bundle snapshot with the current version stamp.
    pub fn bundle(info: BundleBuildInfo) -> Self {
        Self {
            kind: SnapshotKind::Bundle(info),
            version: SNAPSHOT_VERSION.to_string(),
        }
    }

    /// Returns the program payload, if this is a program snapshot.
    pub fn as_program(&self) -> Option<&ProgramBuildInfo> {
        match &self.kind {
            SnapshotKind::Program(p) => Some(p),
            SnapshotKind::Bundle(_) => None,
        }
    }

    /// Returns the bundle payload, if this is a bundle snapshot.
    pub fn as_bundle(&self) -> Option<&BundleBuildInfo> {
        match &self.kind {
            SnapshotKind::Bundle(b) => Some(b),
            SnapshotKind::Program(_) => None,
        }
    }
}

/// A recorded compiler option value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// A boolean flag.
    Bool(bool),
    /// An integer setting.
    Number(i64),
    /// A string setting.
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Number(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Text(v)
    }
}

/// A diagnostic as stored in a snapshot.
///
/// Only offsets are stored; line and column are derived when rendering.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDiagnostic {
    /// Snapshot-relative path of the file, if the diagnostic has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Byte offset of the flagged range.
    pub start: u32,
    /// Length of the flagged range.
    pub length: u32,
    /// Numeric diagnostic code.
    pub code: DiagnosticCode,
    /// Numeric category tag.
    pub category: Category,
    /// Message text.
    pub message_text: String,
}

impl StoredDiagnostic {
    /// Converts a diagnostic into its stored form.
    pub fn from_diagnostic(diag: &Diagnostic, paths: &SnapshotPaths) -> Self {
        Self {
            file: diag.file.as_deref().map(|f| paths.relative(f)),
            start: diag.start,
            length: diag.length,
            code: diag.code,
            category: diag.category,
            message_text: diag.message.clone(),
        }
    }

    /// Converts a stored diagnostic back, resolving its path.
    pub fn to_diagnostic(&self, paths: &SnapshotPaths) -> Diagnostic {
        let diag = Diagnostic::new(self.category, self.code, self.message_text.clone());
        match &self.file {
            Some(file) => diag.at(&paths.resolve(file), self.start, self.length),
            None => Diagnostic {
                start: self.start,
                length: self.length,
                ..diag
            },
        }
    }
}

/// One element of `semanticDiagnosticsPerFile`.
///
/// A bare path means the file has no diagnostics. A `[path, diagnostics]`
/// pair means the diagnostics still apply and are re-reported as long as the
/// file's version is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DiagnosticEntry {
    /// A file with no diagnostics.
    Clean(String),
    /// A file with stored diagnostics.
    WithDiagnostics(String, Vec<StoredDiagnostic>),
}

impl DiagnosticEntry {
    /// The snapshot-relative path this entry belongs to.
    pub fn path(&self) -> &str {
        match self {
            DiagnosticEntry::Clean(path) | DiagnosticEntry::WithDiagnostics(path, _) => path,
        }
    }

    /// The stored diagnostics (empty for a clean entry).
    pub fn diagnostics(&self) -> &[StoredDiagnostic] {
        match self {
            DiagnosticEntry::Clean(_) => &[],
            DiagnosticEntry::WithDiagnostics(_, diags) => diags,
        }
    }
}

/// Per-file build state of a program build.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramBuildInfo {
    /// Version and signature per file.
    pub file_infos: BTreeMap<String, FileInfo>,
    /// Compiler options the build ran with.
    pub options: BTreeMap<String, OptionValue>,
    /// Files each file depends on.
    pub referenced_map: BTreeMap<String, Vec<String>>,
    /// Files whose exports each file re-exports.
    pub exported_modules_map: BTreeMap<String, Vec<String>>,
    /// Diagnostics per file, ordered by path.
    pub semantic_diagnostics_per_file: Vec<DiagnosticEntry>,
}

impl ProgramBuildInfo {
    /// Resolves every stored path against the snapshot location.
    pub fn resolve(&self, paths: &SnapshotPaths) -> ResolvedProgram {
        let case = paths.path_case();
        let mut files = FileInfoStore::new(case);
        for (rel, info) in &self.file_infos {
            files.set(&paths.resolve(rel), *info);
        }

        let resolve_map = |map: &BTreeMap<String, Vec<String>>| -> BTreeMap<String, Vec<PathBuf>> {
            map.iter()
                .map(|(from, to)| {
                    let key = canonical_key(&paths.resolve(from), case);
                    let targets: Vec<PathBuf> = to.iter().map(|t| paths.resolve(t)).collect();
                    (key, targets)
                })
                .collect()
        };

        let diagnostics: BTreeMap<String, Vec<Diagnostic>> = self
            .semantic_diagnostics_per_file
            .iter()
            .map(|entry| {
                let key = canonical_key(&paths.resolve(entry.path()), case);
                let diags: Vec<Diagnostic> = entry
                    .diagnostics()
                    .iter()
                    .map(|d| d.to_diagnostic(paths))
                    .collect();
                (key, diags)
            })
            .collect();

        ResolvedProgram {
            files,
            options: self.options.clone(),
            references: resolve_map(&self.referenced_map),
            exported_modules: resolve_map(&self.exported_modules_map),
            diagnostics,
        }
    }
}

/// A program snapshot with every path resolved to an absolute path.
#[derive(Clone, Debug, Default)]
pub struct ResolvedProgram {
    /// Version and signature per file.
    pub files: FileInfoStore,
    /// Compiler options the build ran with.
    pub options: BTreeMap<String, OptionValue>,
    references: BTreeMap<String, Vec<PathBuf>>,
    exported_modules: BTreeMap<String, Vec<PathBuf>>,
    diagnostics: BTreeMap<String, Vec<Diagnostic>>,
}

impl ResolvedProgram {
    /// Files `path` depended on in the previous build.
    pub fn references(&self, path: &Path) -> &[PathBuf] {
        self.lookup(&self.references, path)
            .map_or(&[], Vec::as_slice)
    }

    /// Files whose exports `path` re-exported in the previous build.
    pub fn exported_modules(&self, path: &Path) -> &[PathBuf] {
        self.lookup(&self.exported_modules, path)
            .map_or(&[], Vec::as_slice)
    }

    /// Diagnostics recorded for `path`, or `None` if the file had no entry.
    pub fn diagnostics(&self, path: &Path) -> Option<&[Diagnostic]> {
        self.lookup(&self.diagnostics, path).map(Vec::as_slice)
    }

    fn lookup<'a, T>(&self, map: &'a BTreeMap<String, T>, path: &Path) -> Option<&'a T> {
        map.get(&canonical_key(path, self.files.path_case()))
    }
}

/// Builds a [`ProgramBuildInfo`] from absolute paths.
pub struct ProgramBuilder {
    paths: SnapshotPaths,
    info: ProgramBuildInfo,
}

impl ProgramBuilder {
    /// Starts an empty program snapshot stored at `paths`.
    pub fn new(paths: SnapshotPaths) -> Self {
        Self {
            paths,
            info: ProgramBuildInfo::default(),
        }
    }

    /// Records a file's version and signature.
    pub fn file(&mut self, path: &Path, info: FileInfo) -> &mut Self {
        self.info.file_infos.insert(self.paths.relative(path), info);
        self
    }

    /// Records one compiler option.
    pub fn option(&mut self, key: &str, value: impl Into<OptionValue>) -> &mut Self {
        self.info.options.insert(key.to_string(), value.into());
        self
    }

    /// Records a whole option set.
    pub fn options(&mut self, options: &BTreeMap<String, OptionValue>) -> &mut Self {
        self.info
            .options
            .extend(options.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Records the files `from` depends on. Empty lists are omitted.
    pub fn references(&mut self, from: &Path, to: &[PathBuf]) -> &mut Self {
        if let Some((key, targets)) = self.relative_edges(from, to) {
            self.info.referenced_map.insert(key, targets);
        }
        self
    }

    /// Records the files `from` re-exports. Empty lists are omitted.
    pub fn exported_modules(&mut self, from: &Path, to: &[PathBuf]) -> &mut Self {
        if let Some((key, targets)) = self.relative_edges(from, to) {
            self.info.exported_modules_map.insert(key, targets);
        }
        self
    }

    /// Records the diagnostics of `file`; an empty slice records a clean file.
    pub fn diagnostics(&mut self, file: &Path, diags: &[Diagnostic]) -> &mut Self {
        let path = self.paths.relative(file);
        let entry = if diags.is_empty() {
            DiagnosticEntry::Clean(path)
        } else {
            let stored = diags
                .iter()
                .map(|d| StoredDiagnostic::from_diagnostic(d, &self.paths))
                .collect();
            DiagnosticEntry::WithDiagnostics(path, stored)
        };
        self.info.semantic_diagnostics_per_file.push(entry);
        self
    }

    /// Finishes the snapshot, ordering diagnostic entries by path.
    pub fn finish(mut self) -> ProgramBuildInfo {
        self.info
            .semantic_diagnostics_per_file
            .sort_by(|a, b| a.path().cmp(b.path()));
        self.info
            .semantic_diagnostics_per_file
            .dedup_by(|a, b| a.path() == b.path());
        self.info
    }

    fn relative_edges(&self, from: &Path, to: &[PathBuf]) -> Option<(String, Vec<String>)> {
        if to.is_empty() {
            return None;
        }
        let mut targets: Vec<String> = to.iter().map(|t| self.paths.relative(t)).collect();
        targets.sort();
        targets.dedup();
        Some((self.paths.relative(from), targets))
    }
}

/// Kind tag of a bundle section.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SectionKind {
    /// Directive prologue (`"use strict";`).
    Prologue,
    /// Emitted source text.
    Text,
}

/// A byte range of a bundle output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSection {
    /// Start offset.
    pub pos: u32,
    /// End offset (exclusive).
    pub end: u32,
    /// What the range contains.
    pub kind: SectionKind,
}

/// Section layout of one bundle output file.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleFileInfo {
    /// Sections in output order.
    pub sections: Vec<BundleSection>,
}

impl BundleFileInfo {
    /// Layout of an output consisting of a single text section.
    ///
    /// Offsets are `u32`; a longer output records `u32::MAX` as its end.
    pub fn text(len: usize) -> Self {
        Self {
            sections: vec![BundleSection {
                pos: 0,
                end: u32::try_from(len).unwrap_or(u32::MAX),
                kind: SectionKind::Text,
            }],
        }
    }
}

/// Build state of a bundle (single output file) build.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleBuildInfo {
    /// Directory module names and output layout are relative to, with a trailing `/`.
    pub common_source_directory: String,
    /// Bundled sources in output order.
    pub source_files: Vec<String>,
    /// Layout of the JavaScript bundle.
    pub js: BundleFileInfo,
    /// Layout of the declaration bundle, when declarations are emitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dts: Option<BundleFileInfo>,
    /// Version and signature per input file.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub file_infos: BTreeMap<String, FileInfo>,
    /// Compiler options the build ran with.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, OptionValue>,
}

impl BundleBuildInfo {
    /// Creates a bundle snapshot for `sources` stored at `paths`.
    pub fn new<'a>(
        paths: &SnapshotPaths,
        common_dir: &Path,
        sources: impl IntoIterator<Item = &'a Path>,
        js: BundleFileInfo,
    ) -> Self {
        Self {
            common_source_directory: paths.relative_dir(common_dir),
            source_files: sources.into_iter().map(|p| paths.relative(p)).collect(),
            js,
            dts: None,
            file_infos: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }

    /// Records the version and signature of every input.
    pub fn record_files(&mut self, paths: &SnapshotPaths, files: &FileInfoStore) {
        self.file_infos = files
            .iter()
            .map(|(path, info)| (paths.relative(path), info))
            .collect();
    }

    /// Resolves the recorded file infos against the snapshot location.
    pub fn resolve_files(&self, paths: &SnapshotPaths) -> FileInfoStore {
        let mut store = FileInfoStore::new(paths.path_case());
        for (rel, info) in &self.file_infos {
            store.set(&paths.resolve(rel), *info);
        }
        store
    }
}

/// Converts between absolute paths and paths relative to a snapshot file.
#[derive(Clone, Debug)]
pub struct SnapshotPaths {
    snapshot_file: PathBuf,
    base_dir: PathBuf,
    case: PathCase,
}

impl SnapshotPaths {
    /// Creates a converter for a snapshot stored at `snapshot_file`.
    pub fn new(snapshot_file: &Path, case: PathCase) -> Self {
        let base_dir = snapshot_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Self {
            snapshot_file: snapshot_file.to_path_buf(),
            base_dir,
            case,
        }
    }

    /// The snapshot file location.
    pub fn snapshot_file(&self) -> &Path {
        &self.snapshot_file
    }

    /// The directory stored paths are relative to.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// The path comparison mode.
    pub fn path_case(&self) -> PathCase {
        self.case
    }

    /// `path` relative to the snapshot directory (`./a.ts`, `../lib.d.ts`).
    pub fn relative(&self, path: &Path) -> String {
        relative_path_from_dir(&self.base_dir, path, self.case)
    }

    /// Like [`relative`](Self::relative) but always ending in `/`.
    pub fn relative_dir(&self, dir: &Path) -> String {
        let rel = self.relative(dir);
        if rel.ends_with('/') {
            rel
        } else {
            format!("{rel}/")
        }
    }

    /// Resolves a stored path to an absolute path.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        resolve_relative(&self.base_dir, relative)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_common::ContentHash;

    fn paths() -> SnapshotPaths {
        SnapshotPaths::new(Path::new("/users/project/keel.buildinfo"), PathCase::Sensitive)
    }

    fn script_info(text: &str) -> FileInfo {
        FileInfo::new(
            ContentHash::of_text(text),
            ContentHash::of_text(&format!("declare {text}\n")),
        )
    }

    fn type_error() -> Diagnostic {
        Diagnostic::error(
            DiagnosticCode::TYPE_NOT_ASSIGNABLE,
            "Type '20' is not assignable to type 'string'.",
        )
        .at(Path::new("/users/project/file2.ts"), 6, 1)
    }

    fn sample_program() -> ProgramBuildInfo {
        let lib = Path::new("/a/lib/lib.d.ts");
        let file1 = Path::new("/users/project/file1.ts");
        let file2 = Path::new("/users/project/file2.ts");
        let mut b = ProgramBuilder::new(paths());
        b.file(lib, FileInfo::declaration(ContentHash::of_text("interface Array<T> {}")))
            .file(file1, script_info("const x = 10;"))
            .file(file2, script_info("const y: string = 20;"))
            .option("incremental", true)
            .option("configFilePath", "./keel.toml")
            .diagnostics(file2, &[type_error()])
            .diagnostics(file1, &[])
            .diagnostics(lib, &[]);
        b.finish()
    }

    #[test]
    fn builder_stores_relative_paths() {
        let info = sample_program();
        let keys: Vec<&str> = info.file_infos.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["../../a/lib/lib.d.ts", "./file1.ts", "./file2.ts"]);
        assert!(info.referenced_map.is_empty());
    }

    #[test]
    fn diagnostic_entries_sorted_and_shaped() {
        let info = sample_program();
        let json = serde_json::to_value(&info).unwrap();
        let entries = json["semanticDiagnosticsPerFile"].as_array().unwrap();
        assert_eq!(entries[0], "../../a/lib/lib.d.ts");
        assert_eq!(entries[1], "./file1.ts");
        let pair = entries[2].as_array().unwrap();
        assert_eq!(pair[0], "./file2.ts");
        let diag = &pair[1][0];
        assert_eq!(diag["file"], "./file2.ts");
        assert_eq!(diag["start"], 6);
        assert_eq!(diag["length"], 1);
        assert_eq!(diag["code"], 2322);
        assert_eq!(diag["category"], 1);
        assert_eq!(
            diag["messageText"],
            "Type '20' is not assignable to type 'string'."
        );
    }

    #[test]
    fn build_info_top_level_shape() {
        let snapshot = BuildInfo::program(sample_program());
        let json = serde_json::to_value(&snapshot).unwrap();
        let obj = json.as_object().unwrap();
        assert!(obj.contains_key("program"));
        assert_eq!(obj["version"], SNAPSHOT_VERSION);
        let program = &obj["program"];
        for key in [
            "fileInfos",
            "options",
            "referencedMap",
            "exportedModulesMap",
            "semanticDiagnosticsPerFile",
        ] {
            assert!(program.get(key).is_some(), "missing {key}");
        }
    }

    #[test]
    fn program_round_trip() {
        let snapshot = BuildInfo::program(sample_program());
        let text = serde_json::to_string_pretty(&snapshot).unwrap();
        let back: BuildInfo = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snapshot);
        assert!(back.as_program().is_some());
        assert!(back.as_bundle().is_none());
    }

    #[test]
    fn resolve_restores_absolute_paths() {
        let resolved = sample_program().resolve(&paths());
        let file2 = Path::new("/users/project/file2.ts");
        assert_eq!(resolved.files.len(), 3);
        assert_eq!(resolved.files.get(file2), Some(script_info("const y: string = 20;")));
        assert_eq!(resolved.diagnostics(file2).unwrap(), &[type_error()]);
        assert_eq!(
            resolved.diagnostics(Path::new("/users/project/file1.ts")),
            Some(&[][..])
        );
        assert!(resolved.diagnostics(Path::new("/users/project/other.ts")).is_none());
    }

    #[test]
    fn references_recorded_sorted_and_resolved() {
        let a = Path::new("/users/project/a.ts");
        let b = PathBuf::from("/users/project/b.ts");
        let c = PathBuf::from("/users/project/lib/c.ts");
        let mut builder = ProgramBuilder::new(paths());
        builder
            .references(a, &[c.clone(), b.clone(), b.clone()])
            .exported_modules(a, &[b.clone()])
            .references(&b, &[]);
        let info = builder.finish();
        assert_eq!(
            info.referenced_map["./a.ts"],
            vec!["./b.ts".to_string(), "./lib/c.ts".to_string()]
        );
        assert!(!info.referenced_map.contains_key("./b.ts"));

        let resolved = info.resolve(&paths());
        assert_eq!(resolved.references(a), &[b.clone(), c]);
        assert_eq!(resolved.exported_modules(a), &[b.clone()]);
        assert!(resolved.references(&b).is_empty());
    }

    #[test]
    fn insensitive_resolution() {
        let p = SnapshotPaths::new(Path::new("/Users/Project/keel.buildinfo"), PathCase::Insensitive);
        let mut builder = ProgramBuilder::new(p.clone());
        builder.diagnostics(Path::new("/users/project/A.ts"), &[]);
        let resolved = builder.finish().resolve(&p);
        assert!(resolved.diagnostics(Path::new("/USERS/PROJECT/a.ts")).is_some());
    }

    #[test]
    fn oversized_bundle_length_saturates() {
        assert_eq!(BundleFileInfo::text(24).sections[0].end, 24);
        assert_eq!(BundleFileInfo::text(usize::MAX).sections[0].end, u32::MAX);
    }

    #[test]
    fn bundle_shape_and_round_trip() {
        let p = SnapshotPaths::new(Path::new("/users/project/out.buildinfo"), PathCase::Sensitive);
        let file1 = PathBuf::from("/users/project/file1.ts");
        let file2 = PathBuf::from("/users/project/file2.ts");
        let out = "var x = 10;\nvar y = 20;\n";
        let bundle = BundleBuildInfo::new(
            &p,
            Path::new("/users/project"),
            [file1.as_path(), file2.as_path()],
            BundleFileInfo::text(out.len()),
        );
        let snapshot = BuildInfo::bundle(bundle);
        let json = serde_json::to_value(&snapshot).unwrap();
        let b = &json["bundle"];
        assert_eq!(b["commonSourceDirectory"], "./");
        assert_eq!(b["sourceFiles"][0], "./file1.ts");
        assert_eq!(b["js"]["sections"][0]["pos"], 0);
        assert_eq!(b["js"]["sections"][0]["end"], out.len());
        assert_eq!(b["js"]["sections"][0]["kind"], "text");
        assert!(b.get("fileInfos").is_none());
        assert!(b.get("dts").is_none());

        let text = serde_json::to_string(&snapshot).unwrap();
        let back: BuildInfo = serde_json::from_str(&text).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn bundle_records_and_resolves_files() {
        let p = SnapshotPaths::new(Path::new("/p/out/app.buildinfo"), PathCase::Sensitive);
        let mut store = FileInfoStore::new(PathCase::Sensitive);
        store.set(Path::new("/p/src/a.ts"), script_info("const a = 1;"));
        let mut bundle = BundleBuildInfo::new(
            &p,
            Path::new("/p/src"),
            [Path::new("/p/src/a.ts")],
            BundleFileInfo::text(0),
        );
        bundle.record_files(&p, &store);
        assert_eq!(bundle.common_source_directory, "../src/");
        assert!(bundle.file_infos.contains_key("../src/a.ts"));
        assert_eq!(bundle.resolve_files(&p), store);
    }

    #[test]
    fn stored_diagnostic_without_file() {
        let diag = Diagnostic::error(DiagnosticCode(6131), "Cannot compile modules.");
        let stored = StoredDiagnostic::from_diagnostic(&diag, &paths());
        assert!(stored.file.is_none());
        let json = serde_json::to_value(&stored).unwrap();
        assert!(json.get("file").is_none());
        assert_eq!(stored.to_diagnostic(&paths()), diag);
    }

    #[test]
    fn option_values_untagged() {
        let mut options = BTreeMap::new();
        options.insert("incremental".to_string(), OptionValue::from(true));
        options.insert("module".to_string(), OptionValue::from("amd"));
        options.insert("target".to_string(), OptionValue::from(1_i64));
        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(json, r#"{"incremental":true,"module":"amd","target":1}"#);
        let back: BTreeMap<String, OptionValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, options);
    }

    #[test]
    fn snapshot_without_payload_is_rejected() {
        let result: Result<BuildInfo, _> = serde_json::from_str(r#"{"version":"0.1.0"}"#);
        assert!(result.is_err());
    }
}
