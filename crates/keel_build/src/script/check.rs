use std::collections::BTreeMap;

use keel_diagnostics::{Diagnostic, DiagnosticCode, DiagnosticSink};
use keel_source::{SourceDb, SourceFile};

use super::parse::{ImportClause, ParsedFile, StatementKind};
use super::{literal_type, module_exports, resolve_module, LiteralType};

pub(super) fn check_file(
    file: &SourceFile,
    parsed: &ParsedFile<'_>,
    program: &SourceDb,
    sink: &DiagnosticSink,
) {
    let path = file.path.as_path();
    let redeclared = redeclared_names(parsed);

    for stmt in &parsed.statements {
        match &stmt.kind {
            StatementKind::Unknown => sink.emit(
                Diagnostic::error(
                    DiagnosticCode::DECLARATION_EXPECTED,
                    "Declaration or statement expected.",
                )
                .at(path, offset(stmt.offset), offset(stmt.text.len())),
            ),
            StatementKind::Variable(v) => {
                let (start, len) = (offset(v.name_offset), offset(v.name.len()));
                if redeclared.contains_key(v.name) && v.keyword != "var" {
                    sink.emit(
                        Diagnostic::error(
                            DiagnosticCode::CANNOT_REDECLARE,
                            format!("Cannot redeclare block-scoped variable '{}'.", v.name),
                        )
                        .at(path, start, len),
                    );
                }
                if v.keyword == "const" && v.init.is_none() && !v.ambient {
                    sink.emit(
                        Diagnostic::error(
                            DiagnosticCode::CONST_MUST_BE_INITIALIZED,
                            "'const' declarations must be initialized.",
                        )
                        .at(path, start, len),
                    );
                }
                if let (Some(ty), Some(init)) = (v.ty, v.init) {
                    if let Some(found) = literal_type(init) {
                        if is_primitive(ty) && found.name() != ty {
                            sink.emit(
                                Diagnostic::error(
                                    DiagnosticCode::TYPE_NOT_ASSIGNABLE,
                                    format!(
                                        "Type '{}' is not assignable to type '{ty}'.",
                                        display_literal(init, found)
                                    ),
                                )
                                .at(path, start, len),
                            );
                        }
                    }
                }
            }
            StatementKind::Import(import) => {
                let spec = &import.specifier;
                let Some(target) = resolve_module(path, spec.text, program) else {
                    sink.emit(cannot_find_module(file, spec.text, spec.offset, spec.len));
                    continue;
                };
                if let ImportClause::Named(names) = &import.clause {
                    let exports = module_exports(&target, program);
                    for (name, at) in names {
                        if !exports.contains(*name) {
                            sink.emit(
                                Diagnostic::error(
                                    DiagnosticCode::NO_EXPORTED_MEMBER,
                                    format!(
                                        "Module '\"{}\"' has no exported member '{name}'.",
                                        spec.text
                                    ),
                                )
                                .at(path, offset(*at), offset(name.len())),
                            );
                        }
                    }
                }
            }
            StatementKind::ExportAll(spec) => {
                if resolve_module(path, spec.text, program).is_none() {
                    sink.emit(cannot_find_module(file, spec.text, spec.offset, spec.len));
                }
            }
        }
    }
}

fn cannot_find_module(file: &SourceFile, spec: &str, start: usize, len: usize) -> Diagnostic {
    Diagnostic::error(
        DiagnosticCode::CANNOT_FIND_MODULE,
        format!("Cannot find module '{spec}'."),
    )
    .at(&file.path, offset(start), offset(len))
}

/// Diagnostic spans are `u32`; positions past 4 GiB are pinned to `u32::MAX`.
fn offset(pos: usize) -> u32 {
    u32::try_from(pos).unwrap_or(u32::MAX)
}

/// Names declared more than once where at least one declaration is block scoped.
fn redeclared_names<'a>(parsed: &ParsedFile<'a>) -> BTreeMap<&'a str, usize> {
    let mut counts: BTreeMap<&'a str, (usize, bool)> = BTreeMap::new();
    for stmt in &parsed.statements {
        if let StatementKind::Variable(v) = &stmt.kind {
            let entry = counts.entry(v.name).or_insert((0, false));
            entry.0 += 1;
            entry.1 |= v.keyword != "var";
        }
    }
    counts
        .into_iter()
        .filter(|(_, (count, block))| *count > 1 && *block)
        .map(|(name, (count, _))| (name, count))
        .collect()
}

fn is_primitive(ty: &str) -> bool {
    matches!(ty, "string" | "number" | "boolean")
}

/// Renders a literal the way type messages quote it: strings in double quotes.
fn display_literal(init: &str, ty: LiteralType) -> String {
    match ty {
        LiteralType::String => format!("\"{}\"", &init[1..init.len() - 1]),
        LiteralType::Number | LiteralType::Boolean => init.to_string(),
    }
}
