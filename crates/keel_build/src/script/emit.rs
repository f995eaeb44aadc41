use std::collections::HashMap;
use std::path::Path;

use keel_config::ModuleKind;
use keel_source::path::{relative_path_from_dir, with_extension};
use keel_source::{SourceDb, SourceFile};

use super::parse::{is_identifier, ImportClause, ParsedFile, StatementKind, VariableDecl};
use super::{literal_type, resolve_module};
use crate::backend::EmitTarget;

const EXPORT_HELPER: [&str; 3] = [
    "function __export(m) {",
    "    for (var p in m) if (!exports.hasOwnProperty(p)) exports[p] = m[p];",
    "}",
];

/// The declaration text of a parsed file.
pub(super) fn declaration(parsed: &ParsedFile<'_>) -> String {
    let mut lines = Vec::new();
    let module = parsed.is_module();
    for stmt in &parsed.statements {
        match &stmt.kind {
            StatementKind::Variable(v) if !module => lines.push(declare_variable(v, "")),
            StatementKind::Variable(v) if v.exported => lines.push(declare_variable(v, "export ")),
            StatementKind::ExportAll(spec) => {
                lines.push(format!("export * from \"{}\";", spec.text))
            }
            _ => {}
        }
    }
    if module && lines.is_empty() {
        lines.push("export {};".to_string());
    }
    join_lines(&lines)
}

fn declare_variable(v: &VariableDecl<'_>, prefix: &str) -> String {
    let tail = match (v.ty, v.init) {
        (Some(ty), _) => format!(": {ty}"),
        (None, Some(init)) if v.keyword == "const" && literal_type(init).is_some() => {
            format!(" = {init}")
        }
        (None, Some(init)) => format!(": {}", literal_type(init).map_or("any", |t| t.name())),
        (None, None) => ": any".to_string(),
    };
    format!("{prefix}declare {} {}{tail};", v.keyword, v.name)
}

/// Declaration text of a file inside a declaration bundle.
///
/// AMD modules are wrapped in `declare module "<name>"` blocks; everything
/// else contributes its plain declaration text.
pub(super) fn bundle_declaration(
    file: &SourceFile,
    parsed: &ParsedFile<'_>,
    target: &EmitTarget,
) -> String {
    let text = declaration(parsed);
    let (ModuleKind::Amd, Some(root), true) =
        (target.module, target.bundle_root.as_deref(), parsed.is_module())
    else {
        return text;
    };
    let mut out = format!("declare module \"{}\" {{\n", module_name(&file.path, root));
    for line in text.lines() {
        out.push_str("    ");
        out.push_str(&line.replacen("export declare ", "export ", 1));
        out.push('\n');
    }
    out.push_str("}\n");
    out
}

/// The AMD module name of `path` inside a bundle rooted at `root`.
pub(super) fn module_name(path: &Path, root: &Path) -> String {
    let rel = relative_path_from_dir(root, &with_extension(path, ""), Default::default());
    rel.strip_prefix("./").map(str::to_string).unwrap_or(rel)
}

/// The JavaScript output of a parsed file.
pub(super) fn transpile(
    file: &SourceFile,
    parsed: &ParsedFile<'_>,
    program: &SourceDb,
    target: &EmitTarget,
) -> String {
    if !parsed.is_module() {
        return script_output(parsed);
    }
    let bindings = ModuleBindings::new(file, parsed, program, target);
    match target.module {
        ModuleKind::Amd => amd_output(file, parsed, &bindings, target),
        ModuleKind::CommonJs | ModuleKind::None => commonjs_output(parsed, &bindings),
    }
}

fn script_output(parsed: &ParsedFile<'_>) -> String {
    let mut lines = Vec::new();
    for stmt in &parsed.statements {
        match &stmt.kind {
            StatementKind::Variable(v) if v.ambient => {}
            StatementKind::Variable(v) => lines.push(match v.init {
                Some(init) => format!("var {} = {init};", v.name),
                None => format!("var {};", v.name),
            }),
            StatementKind::Unknown => lines.push(stmt.text.to_string()),
            StatementKind::Import(_) | StatementKind::ExportAll(_) => {}
        }
    }
    join_lines(&lines)
}

/// Per-statement dependency bindings of a module.
struct ModuleBindings {
    /// Statement index → (dependency string, parameter name).
    deps: HashMap<usize, (String, Option<String>)>,
    /// Identifier → rewritten expression.
    rewrites: HashMap<String, String>,
}

impl ModuleBindings {
    fn new(
        file: &SourceFile,
        parsed: &ParsedFile<'_>,
        program: &SourceDb,
        target: &EmitTarget,
    ) -> Self {
        let mut deps = HashMap::new();
        let mut rewrites = HashMap::new();
        let mut used: HashMap<String, usize> = HashMap::new();

        for (idx, stmt) in parsed.statements.iter().enumerate() {
            let (spec, clause) = match &stmt.kind {
                StatementKind::Import(i) => (&i.specifier, Some(&i.clause)),
                StatementKind::ExportAll(spec) => (spec, None),
                StatementKind::Variable(v) => {
                    if v.exported {
                        rewrites.insert(v.name.to_string(), format!("exports.{}", v.name));
                    }
                    continue;
                }
                StatementKind::Unknown => continue,
            };

            let dep = match (&target.bundle_root, resolve_module(&file.path, spec.text, program)) {
                (Some(root), Some(resolved)) => module_name(&resolved, root),
                _ => spec.text.to_string(),
            };
            let param = match clause {
                Some(ImportClause::SideEffect) => None,
                Some(ImportClause::Namespace(ns)) => Some(ns.to_string()),
                Some(ImportClause::Named(_)) | None => Some(generated_name(spec.text, &mut used)),
            };
            if let (Some(ImportClause::Named(names)), Some(param)) = (clause, &param) {
                for (name, _) in names {
                    rewrites.insert(name.to_string(), format!("{param}.{name}"));
                }
            }
            deps.insert(idx, (dep, param));
        }
        Self { deps, rewrites }
    }

    fn rewrite(&self, init: &str) -> String {
        if is_identifier(init) {
            if let Some(replacement) = self.rewrites.get(init) {
                return replacement.clone();
            }
        }
        init.to_string()
    }

    fn param(&self, idx: usize) -> Option<&str> {
        self.deps.get(&idx).and_then(|(_, p)| p.as_deref())
    }

    fn dep(&self, idx: usize) -> &str {
        self.deps.get(&idx).map_or("", |(d, _)| d.as_str())
    }
}

/// `./lib/file-1` → `file_1_1`, numbering repeated bases.
fn generated_name(spec: &str, used: &mut HashMap<String, usize>) -> String {
    let base = spec.rsplit('/').next().unwrap_or(spec);
    let mut name: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    let count = used.entry(name.clone()).or_insert(0);
    *count += 1;
    format!("{name}_{count}")
}

fn prologue(parsed: &ParsedFile<'_>) -> Vec<String> {
    let mut lines = vec!["\"use strict\";".to_string()];
    if parsed.re_exports().next().is_some() {
        lines.extend(EXPORT_HELPER.iter().map(|l| l.to_string()));
    }
    lines.push("exports.__esModule = true;".to_string());
    lines
}

fn variable_line(v: &VariableDecl<'_>, bindings: &ModuleBindings) -> Option<String> {
    if v.ambient {
        return None;
    }
    match (v.exported, v.init) {
        (true, Some(init)) => Some(format!("exports.{} = {};", v.name, bindings.rewrite(init))),
        (true, None) => None,
        (false, Some(init)) => Some(format!("var {} = {};", v.name, bindings.rewrite(init))),
        (false, None) => Some(format!("var {};", v.name)),
    }
}

fn amd_output(
    file: &SourceFile,
    parsed: &ParsedFile<'_>,
    bindings: &ModuleBindings,
    target: &EmitTarget,
) -> String {
    let mut deps = vec!["\"require\"".to_string(), "\"exports\"".to_string()];
    let mut params = vec!["require".to_string(), "exports".to_string()];
    let mut side_effects = Vec::new();
    for idx in 0..parsed.statements.len() {
        if !bindings.deps.contains_key(&idx) {
            continue;
        }
        let dep = format!("\"{}\"", bindings.dep(idx));
        match bindings.param(idx) {
            Some(param) => {
                deps.push(dep);
                params.push(param.to_string());
            }
            None => side_effects.push(dep),
        }
    }
    deps.extend(side_effects);

    let mut body = prologue(parsed);
    for (idx, stmt) in parsed.statements.iter().enumerate() {
        match &stmt.kind {
            StatementKind::Variable(v) => body.extend(variable_line(v, bindings)),
            StatementKind::ExportAll(_) => {
                body.push(format!("__export({});", bindings.param(idx).unwrap_or("{}")));
            }
            StatementKind::Import(_) => {}
            StatementKind::Unknown => body.push(stmt.text.to_string()),
        }
    }

    let name = match &target.bundle_root {
        Some(root) => format!("\"{}\", ", module_name(&file.path, root)),
        None => String::new(),
    };
    let mut out = format!(
        "define({name}[{}], function ({}) {{\n",
        deps.join(", "),
        params.join(", ")
    );
    for line in body {
        out.push_str("    ");
        out.push_str(&line);
        out.push('\n');
    }
    out.push_str("});\n");
    out
}

fn commonjs_output(parsed: &ParsedFile<'_>, bindings: &ModuleBindings) -> String {
    let mut lines = prologue(parsed);
    for (idx, stmt) in parsed.statements.iter().enumerate() {
        match &stmt.kind {
            StatementKind::Variable(v) => lines.extend(variable_line(v, bindings)),
            StatementKind::Import(_) => {
                let require = format!("require(\"{}\")", bindings.dep(idx));
                lines.push(match bindings.param(idx) {
                    Some(param) => format!("var {param} = {require};"),
                    None => format!("{require};"),
                });
            }
            StatementKind::ExportAll(_) => {
                lines.push(format!("__export(require(\"{}\"));", bindings.dep(idx)));
            }
            StatementKind::Unknown => lines.push(stmt.text.to_string()),
        }
    }
    join_lines(&lines)
}

fn join_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}
