//! Staging and committing build outputs.
//!
//! Every output of a build is staged in an [`EmitWriter`] first. Staging
//! enforces write-once per canonical path, so a conflict aborts the build
//! before any file has been touched; only then are the outputs committed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use keel_cache::{temp_path, BundleFileInfo};
use keel_source::path::{canonical_key, normalize, relative_path_from_dir, with_extension};
use keel_source::{PathCase, SourceDb, SourceHost};
use tracing::debug;

use crate::backend::{is_declaration_file, CompilerBackend, EmitTarget};
use crate::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reservation {
    Input,
    Snapshot,
    Output,
}

/// Collects the outputs of one build and writes them in one go.
#[derive(Debug)]
pub struct EmitWriter {
    case: PathCase,
    reserved: BTreeMap<String, Reservation>,
    staged: Vec<(PathBuf, String)>,
    keys: BTreeMap<String, usize>,
}

impl EmitWriter {
    /// Creates an empty writer comparing paths under `case`.
    pub fn new(case: PathCase) -> Self {
        Self {
            case,
            reserved: BTreeMap::new(),
            staged: Vec::new(),
            keys: BTreeMap::new(),
        }
    }

    /// Marks an input file; staging an output over it fails.
    pub fn protect_input(&mut self, path: &Path) {
        self.reserved
            .insert(canonical_key(path, self.case), Reservation::Input);
    }

    /// Reserves the snapshot location (and its staging file) so no output
    /// can take it.
    pub fn reserve_snapshot(&mut self, path: &Path) {
        for p in [path.to_path_buf(), temp_path(path)] {
            self.reserved
                .insert(canonical_key(&p, self.case), Reservation::Snapshot);
        }
    }

    /// Claims the existing output of a file that is not re-emitted in this
    /// build; staging over it fails as a duplicate write.
    pub fn reserve_output(&mut self, path: &Path) {
        self.reserved
            .entry(canonical_key(path, self.case))
            .or_insert(Reservation::Output);
    }

    /// Stages `content` for `path`.
    pub fn stage(&mut self, path: PathBuf, content: String) -> Result<(), BuildError> {
        let key = canonical_key(&path, self.case);
        match self.reserved.get(&key) {
            Some(Reservation::Input) => return Err(BuildError::OverwritesInput { path }),
            Some(Reservation::Snapshot | Reservation::Output) => {
                return Err(BuildError::DuplicateWrite { path })
            }
            None => {}
        }
        if self.keys.contains_key(&key) {
            return Err(BuildError::DuplicateWrite { path });
        }
        self.keys.insert(key, self.staged.len());
        self.staged.push((path, content));
        Ok(())
    }

    /// The content staged for `path`, if any.
    pub fn staged(&self, path: &Path) -> Option<&str> {
        self.keys
            .get(&canonical_key(path, self.case))
            .map(|&idx| self.staged[idx].1.as_str())
    }

    /// Number of staged outputs.
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    /// Returns `true` if nothing is staged.
    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Writes every staged output in staging order and returns the paths.
    pub fn commit<H: SourceHost + ?Sized>(self, host: &H) -> Result<Vec<PathBuf>, BuildError> {
        let mut written = Vec::with_capacity(self.staged.len());
        for (path, content) in self.staged {
            host.write_file(&path, &content)
                .map_err(|e| BuildError::Write {
                    path: path.clone(),
                    source: e,
                })?;
            debug!(path = %path.display(), bytes = content.len(), "output written");
            written.push(path);
        }
        Ok(written)
    }
}

/// Maps sources to their output files.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    /// Directory outputs are relocated to, if any.
    pub out_dir: Option<PathBuf>,
    /// Directory whose layout is preserved under `out_dir`.
    pub source_root: PathBuf,
    /// Whether `.d.ts` files are emitted.
    pub declaration: bool,
    /// Path comparison mode.
    pub case: PathCase,
}

impl OutputLayout {
    fn relocate(&self, source: &Path) -> PathBuf {
        match &self.out_dir {
            Some(out_dir) => {
                let rel = relative_path_from_dir(&self.source_root, source, self.case);
                normalize(&out_dir.join(rel))
            }
            None => source.to_path_buf(),
        }
    }

    /// The JavaScript output of `source`.
    pub fn js_path(&self, source: &Path) -> PathBuf {
        with_extension(&self.relocate(source), ".js")
    }

    /// The declaration output of `source`, when declarations are emitted.
    pub fn dts_path(&self, source: &Path) -> Option<PathBuf> {
        self.declaration
            .then(|| with_extension(&self.relocate(source), ".d.ts"))
    }
}

/// One assembled output file and its section layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleOutput {
    /// The file content.
    pub text: String,
    /// Section offsets recorded in the snapshot.
    pub layout: BundleFileInfo,
}

impl BundleOutput {
    fn new(text: String) -> Self {
        let layout = BundleFileInfo::text(text.len());
        Self { text, layout }
    }
}

/// The outputs of a bundle build.
#[derive(Debug, Clone)]
pub struct Bundle {
    /// The JavaScript bundle.
    pub js: BundleOutput,
    /// The declaration bundle, when declarations are emitted.
    pub dts: Option<BundleOutput>,
}

/// Concatenates the outputs of every non-declaration file in program order.
pub fn assemble_bundle(
    program: &SourceDb,
    backend: &dyn CompilerBackend,
    target: &EmitTarget,
    declaration: bool,
) -> Bundle {
    let mut js = String::new();
    let mut dts = String::new();
    for file in program.iter().filter(|f| !is_declaration_file(&f.path)) {
        js.push_str(&backend.emit(file, program, target));
        if declaration {
            dts.push_str(&backend.bundle_declaration(file, target));
        }
    }
    Bundle {
        js: BundleOutput::new(js),
        dts: declaration.then(|| BundleOutput::new(dts)),
    }
}
