//! The seam between the build engine and the language front end.

use std::path::{Path, PathBuf};

use keel_cache::{FileInfo, SourceHasher};
use keel_config::ModuleKind;
use keel_diagnostics::DiagnosticSink;
use keel_source::{SourceDb, SourceFile};

/// Returns `true` for declaration inputs (`*.d.ts`).
///
/// Declaration inputs are never emitted or checked, and their signature is
/// their version.
pub fn is_declaration_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(".d.ts"))
        .unwrap_or(false)
}

/// How a file is being emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitTarget {
    /// Module format of the output.
    pub module: ModuleKind,
    /// In bundle mode, the directory module names are computed against.
    pub bundle_root: Option<PathBuf>,
}

impl EmitTarget {
    /// A per-file emit target.
    pub fn file(module: ModuleKind) -> Self {
        Self {
            module,
            bundle_root: None,
        }
    }

    /// A bundle emit target rooted at `root`.
    pub fn bundle(module: ModuleKind, root: &Path) -> Self {
        Self {
            module,
            bundle_root: Some(root.to_path_buf()),
        }
    }
}

/// Parsing, checking and code generation for one source language.
///
/// The engine decides *what* to recompute; the backend computes it. Every
/// method must be deterministic in its inputs: the same file text (and, for
/// the program-aware methods, the same program) yields the same result.
pub trait CompilerBackend {
    /// Returns `true` if the file is a module rather than a global script.
    fn is_module(&self, file: &SourceFile) -> bool;

    /// Files `file` depends on, resolved against `program`.
    fn references(&self, file: &SourceFile, program: &SourceDb) -> Vec<PathBuf>;

    /// Files whose exports `file` re-exports.
    fn exported_modules(&self, file: &SourceFile, program: &SourceDb) -> Vec<PathBuf>;

    /// The declaration text of `file`: its externally visible interface.
    fn declaration(&self, file: &SourceFile) -> String;

    /// Checks `file` and emits its semantic diagnostics into `sink`.
    fn check(&self, file: &SourceFile, program: &SourceDb, sink: &DiagnosticSink);

    /// Produces the JavaScript output of `file`.
    fn emit(&self, file: &SourceFile, program: &SourceDb, target: &EmitTarget) -> String;

    /// Produces the declaration text of `file` for a declaration bundle.
    fn bundle_declaration(&self, file: &SourceFile, _target: &EmitTarget) -> String {
        self.declaration(file)
    }

    /// Computes the `{version, signature}` record of `file`.
    fn file_info(&self, file: &SourceFile) -> FileInfo {
        if is_declaration_file(&file.path) {
            FileInfo::declaration(file.version)
        } else {
            FileInfo::new(
                file.version,
                SourceHasher::signature(&self.declaration(file)),
            )
        }
    }
}
