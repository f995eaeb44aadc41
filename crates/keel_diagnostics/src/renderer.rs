//! Diagnostic rendering backends.

use std::path::{Path, PathBuf};

use crate::diagnostic::Diagnostic;
use keel_source::path::{relative_path_from_dir, to_slash};
use keel_source::SourceDb;

/// Trait for rendering diagnostics into formatted output strings.
pub trait DiagnosticRenderer {
    /// Renders a single diagnostic into a formatted string.
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String;
}

/// Renders a path for display, relative to `base` when it lies below it.
fn display_path(path: &Path, base: Option<&Path>, source_db: &SourceDb) -> String {
    match base {
        Some(base) => {
            let rel = relative_path_from_dir(base, path, source_db.path_case());
            match rel.strip_prefix("./") {
                Some(inner) => inner.to_string(),
                None => rel,
            }
        }
        None => to_slash(path),
    }
}

/// Renders diagnostics one per line in the compact compiler format.
///
/// ```text
/// file2.ts(1,7): error TS2322: Type '20' is not assignable to type 'string'.
/// ```
///
/// Line and column are 1-based and derived from the diagnostic's byte offset
/// against the current source text.
pub struct CompactRenderer {
    /// Directory that displayed paths are made relative to.
    pub base_dir: Option<PathBuf>,
}

impl CompactRenderer {
    /// Creates a compact renderer displaying paths relative to `base_dir`.
    pub fn new(base_dir: Option<PathBuf>) -> Self {
        Self { base_dir }
    }
}

impl DiagnosticRenderer for CompactRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let header = format!("{} {}: {}", diag.category, diag.code, diag.message);
        let Some(file) = diag.file.as_deref() else {
            return format!("{header}\n");
        };
        let path = display_path(file, self.base_dir.as_deref(), source_db);
        match source_db.get(file) {
            Some(source) => {
                let (line, col) = source.line_col(diag.start);
                format!("{path}({line},{col}): {header}\n")
            }
            None => format!("{path}: {header}\n"),
        }
    }
}

/// Renders diagnostics in a rustc-style terminal format.
///
/// ```text
/// error[TS2322]: Type '20' is not assignable to type 'string'.
///   --> file2.ts:1:7
///    |
///  1 | const y: string = 20;
///    |       ^
/// ```
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    /// Directory that displayed paths are made relative to.
    pub base_dir: Option<PathBuf>,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool, base_dir: Option<PathBuf>) -> Self {
        Self { color, base_dir }
    }

    fn paint(&self, text: &str, ansi: &str) -> String {
        if self.color {
            format!("\x1b[{ansi}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }
}

impl DiagnosticRenderer for TerminalRenderer {
    fn render(&self, diag: &Diagnostic, source_db: &SourceDb) -> String {
        let mut out = String::new();

        let label = format!("{}[{}]", diag.category, diag.code);
        let ansi = if diag.is_error() { "1;31" } else { "1;33" };
        out.push_str(&format!("{}: {}\n", self.paint(&label, ansi), diag.message));

        let Some(file) = diag.file.as_deref() else {
            return out;
        };
        let path = display_path(file, self.base_dir.as_deref(), source_db);
        let Some(source) = source_db.get(file) else {
            out.push_str(&format!("  --> {path}\n"));
            return out;
        };

        let (line, col) = source.line_col(diag.start);
        out.push_str(&format!("  --> {path}:{line}:{col}\n"));

        let line_num = format!("{line}");
        let padding = " ".repeat(line_num.len());
        out.push_str(&format!("{padding} |\n"));
        out.push_str(&format!("{line_num} | {}\n", source.line_text(line)));

        let carets = "^".repeat(diag.length.max(1) as usize);
        let col_padding = " ".repeat((col as usize).saturating_sub(1));
        out.push_str(&format!(
            "{padding} | {col_padding}{}\n",
            self.paint(&carets, ansi)
        ));

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::DiagnosticCode;
    use keel_source::PathCase;

    fn type_error(file: &Path, start: u32) -> Diagnostic {
        Diagnostic::error(
            DiagnosticCode::TYPE_NOT_ASSIGNABLE,
            "Type '20' is not assignable to type 'string'.",
        )
        .at(file, start, 1)
    }

    #[test]
    fn compact_script_error() {
        let mut db = SourceDb::new(PathCase::Sensitive);
        let file = Path::new("/users/project/file2.ts");
        db.add_source(file, "const y: string = 20;".to_string());

        let renderer = CompactRenderer::new(Some(PathBuf::from("/users/project")));
        assert_eq!(
            renderer.render(&type_error(file, 6), &db),
            "file2.ts(1,7): error TS2322: Type '20' is not assignable to type 'string'.\n"
        );
    }

    #[test]
    fn compact_module_error() {
        let mut db = SourceDb::new(PathCase::Sensitive);
        let file = Path::new("/users/project/file2.ts");
        db.add_source(file, "export const y: string = 20;".to_string());

        let renderer = CompactRenderer::new(Some(PathBuf::from("/users/project")));
        assert_eq!(
            renderer.render(&type_error(file, 13), &db),
            "file2.ts(1,14): error TS2322: Type '20' is not assignable to type 'string'.\n"
        );
    }

    #[test]
    fn compact_global_diagnostic() {
        let db = SourceDb::new(PathCase::Sensitive);
        let diag = Diagnostic::error(DiagnosticCode(5055), "Cannot write file.");
        let renderer = CompactRenderer::new(None);
        assert_eq!(renderer.render(&diag, &db), "error TS5055: Cannot write file.\n");
    }

    #[test]
    fn compact_unknown_source_omits_position() {
        let db = SourceDb::new(PathCase::Sensitive);
        let renderer = CompactRenderer::new(None);
        let out = renderer.render(&type_error(Path::new("/p/gone.ts"), 3), &db);
        assert_eq!(
            out,
            "/p/gone.ts: error TS2322: Type '20' is not assignable to type 'string'.\n"
        );
    }

    #[test]
    fn terminal_render_with_source_line() {
        let mut db = SourceDb::new(PathCase::Sensitive);
        let file = Path::new("/p/file2.ts");
        db.add_source(file, "const a = 1;\nconst y: string = 20;\n".to_string());

        let renderer = TerminalRenderer::new(false, Some(PathBuf::from("/p")));
        let out = renderer.render(&type_error(file, 19), &db);
        assert!(out.contains("error[TS2322]: Type '20'"));
        assert!(out.contains("--> file2.ts:2:7"));
        assert!(out.contains("2 | const y: string = 20;"));
        assert!(out.contains("\n |       ^"));
    }

    #[test]
    fn terminal_color_codes() {
        let db = SourceDb::new(PathCase::Sensitive);
        let renderer = TerminalRenderer::new(true, None);
        let out = renderer.render(&Diagnostic::error(DiagnosticCode(1), "boom"), &db);
        assert!(out.contains("\x1b[1;31m"));
    }
}
