//! A reference [`CompilerBackend`] for a line-oriented toy language.
//!
//! Each non-blank line holds one statement: a `const`/`let`/`var`
//! declaration (optionally `export`ed, annotated or `declare`d), an
//! `import ... from "..."` or an `export * from "..."`. This is enough to
//! exercise scripts, modules, signatures and cross-file references without a
//! real front end.

mod check;
mod emit;
mod parse;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use keel_diagnostics::DiagnosticSink;
use keel_source::path::{canonical_key, normalize};
use keel_source::{SourceDb, SourceFile};

use crate::backend::{is_declaration_file, CompilerBackend, EmitTarget};
use parse::parse;

/// The reference backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScriptBackend;

impl ScriptBackend {
    /// Creates the backend.
    pub fn new() -> Self {
        Self
    }
}

impl CompilerBackend for ScriptBackend {
    fn is_module(&self, file: &SourceFile) -> bool {
        parse(&file.content).is_module()
    }

    fn references(&self, file: &SourceFile, program: &SourceDb) -> Vec<PathBuf> {
        let parsed = parse(&file.content);
        resolve_all(&file.path, parsed.specifiers().map(|s| s.text), program)
    }

    fn exported_modules(&self, file: &SourceFile, program: &SourceDb) -> Vec<PathBuf> {
        let parsed = parse(&file.content);
        resolve_all(&file.path, parsed.re_exports().map(|s| s.text), program)
    }

    fn declaration(&self, file: &SourceFile) -> String {
        if is_declaration_file(&file.path) {
            return file.content.clone();
        }
        emit::declaration(&parse(&file.content))
    }

    fn check(&self, file: &SourceFile, program: &SourceDb, sink: &DiagnosticSink) {
        if is_declaration_file(&file.path) {
            return;
        }
        check::check_file(file, &parse(&file.content), program, sink);
    }

    fn emit(&self, file: &SourceFile, program: &SourceDb, target: &EmitTarget) -> String {
        emit::transpile(file, &parse(&file.content), program, target)
    }

    fn bundle_declaration(&self, file: &SourceFile, target: &EmitTarget) -> String {
        emit::bundle_declaration(file, &parse(&file.content), target)
    }
}

/// Resolves a relative module specifier from `from` against the program.
///
/// Tries `<spec>.ts`, `<spec>.d.ts` and `<spec>/index.ts`; a specifier that
/// already names a `.ts` file is tried as is. Bare specifiers never resolve.
pub(crate) fn resolve_module(from: &Path, spec: &str, program: &SourceDb) -> Option<PathBuf> {
    if !(spec.starts_with("./") || spec.starts_with("../")) {
        return None;
    }
    let dir = from.parent().unwrap_or_else(|| Path::new(""));
    let base = normalize(&dir.join(spec));
    let base_str = base.to_string_lossy();
    let candidates = if base_str.ends_with(".ts") {
        vec![base.clone()]
    } else {
        vec![
            PathBuf::from(format!("{base_str}.ts")),
            PathBuf::from(format!("{base_str}.d.ts")),
            base.join("index.ts"),
        ]
    };
    candidates
        .into_iter()
        .find_map(|c| program.get(&c).map(|f| f.path.clone()))
}

fn resolve_all<'a>(
    from: &Path,
    specs: impl Iterator<Item = &'a str>,
    program: &SourceDb,
) -> Vec<PathBuf> {
    let mut seen = BTreeSet::new();
    specs
        .filter_map(|spec| resolve_module(from, spec, program))
        .filter(|p| seen.insert(canonical_key(p, program.path_case())))
        .collect()
}

/// Every name `path` exports, following `export * from` chains.
pub(crate) fn module_exports(path: &Path, program: &SourceDb) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut visited = BTreeSet::new();
    collect_exports(path, program, &mut visited, &mut names);
    names
}

fn collect_exports(
    path: &Path,
    program: &SourceDb,
    visited: &mut BTreeSet<String>,
    names: &mut BTreeSet<String>,
) {
    if !visited.insert(canonical_key(path, program.path_case())) {
        return;
    }
    let Some(file) = program.get(path) else {
        return;
    };
    let parsed = parse(&file.content);
    names.extend(parsed.exported_names().map(str::to_string));
    for spec in parsed.re_exports() {
        if let Some(target) = resolve_module(&file.path, spec.text, program) {
            collect_exports(&target, program, visited, names);
        }
    }
}

/// The primitive type of a literal initializer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LiteralType {
    Number,
    String,
    Boolean,
}

impl LiteralType {
    pub(crate) fn name(self) -> &'static str {
        match self {
            LiteralType::Number => "number",
            LiteralType::String => "string",
            LiteralType::Boolean => "boolean",
        }
    }
}

/// Classifies a literal initializer, or `None` for any other expression.
pub(crate) fn literal_type(init: &str) -> Option<LiteralType> {
    let bytes = init.as_bytes();
    match *bytes.first()? {
        b'"' | b'\'' if bytes.len() >= 2 && bytes[bytes.len() - 1] == bytes[0] => {
            Some(LiteralType::String)
        }
        b'0'..=b'9' | b'-' | b'.' if init.parse::<f64>().is_ok() => Some(LiteralType::Number),
        _ if init == "true" || init == "false" => Some(LiteralType::Boolean),
        _ => None,
    }
}
