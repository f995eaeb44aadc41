//! One-statement-per-line parser for the reference backend.
//!
//! Recognises just enough syntax to drive incremental builds end to end:
//! variable declarations, imports and `export * from` re-exports. Anything
//! else is kept as an [`StatementKind::Unknown`] statement.

/// A parsed source file.
#[derive(Debug)]
pub(crate) struct ParsedFile<'a> {
    pub statements: Vec<Statement<'a>>,
}

/// One statement together with its location.
#[derive(Debug)]
pub(crate) struct Statement<'a> {
    /// Byte offset of the first non-blank character.
    pub offset: usize,
    /// The statement text without surrounding whitespace.
    pub text: &'a str,
    pub kind: StatementKind<'a>,
}

#[derive(Debug)]
pub(crate) enum StatementKind<'a> {
    Variable(VariableDecl<'a>),
    Import(ImportDecl<'a>),
    ExportAll(ModuleSpecifier<'a>),
    Unknown,
}

#[derive(Debug)]
pub(crate) struct VariableDecl<'a> {
    pub exported: bool,
    pub ambient: bool,
    /// `const`, `let` or `var`.
    pub keyword: &'a str,
    pub name: &'a str,
    pub name_offset: usize,
    pub ty: Option<&'a str>,
    pub init: Option<&'a str>,
}

#[derive(Debug)]
pub(crate) struct ImportDecl<'a> {
    pub clause: ImportClause<'a>,
    pub specifier: ModuleSpecifier<'a>,
}

#[derive(Debug)]
pub(crate) enum ImportClause<'a> {
    /// `import { a, b } from "..."`; each name with its offset.
    Named(Vec<(&'a str, usize)>),
    /// `import * as ns from "..."`.
    Namespace(&'a str),
    /// `import "..."`.
    SideEffect,
}

/// A quoted module specifier.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ModuleSpecifier<'a> {
    /// The specifier without quotes.
    pub text: &'a str,
    /// Offset of the opening quote.
    pub offset: usize,
    /// Length including both quotes.
    pub len: usize,
}

impl<'a> ParsedFile<'a> {
    /// A file with any import or export is a module; otherwise it is a script.
    pub fn is_module(&self) -> bool {
        self.statements.iter().any(|s| match &s.kind {
            StatementKind::Variable(v) => v.exported,
            StatementKind::Import(_) | StatementKind::ExportAll(_) => true,
            StatementKind::Unknown => false,
        })
    }

    /// Names of exported variables declared in this file.
    pub fn exported_names(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.statements.iter().filter_map(|s| match &s.kind {
            StatementKind::Variable(v) if v.exported => Some(v.name),
            _ => None,
        })
    }

    /// Every module specifier in source order.
    pub fn specifiers(&self) -> impl Iterator<Item = &ModuleSpecifier<'a>> + '_ {
        self.statements.iter().filter_map(|s| match &s.kind {
            StatementKind::Import(i) => Some(&i.specifier),
            StatementKind::ExportAll(spec) => Some(spec),
            _ => None,
        })
    }

    /// Specifiers of `export * from` statements.
    pub fn re_exports(&self) -> impl Iterator<Item = &ModuleSpecifier<'a>> + '_ {
        self.statements.iter().filter_map(|s| match &s.kind {
            StatementKind::ExportAll(spec) => Some(spec),
            _ => None,
        })
    }
}

/// Parses `text` line by line. Blank lines and `//` comments are skipped.
pub(crate) fn parse(text: &str) -> ParsedFile<'_> {
    let mut statements = Vec::new();
    let mut line_start = 0;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim();
        if !trimmed.is_empty() && !trimmed.starts_with("//") {
            let lead = line.len() - line.trim_start().len();
            let offset = line_start + lead;
            let kind = parse_statement(trimmed, offset).unwrap_or(StatementKind::Unknown);
            statements.push(Statement {
                offset,
                text: trimmed,
                kind,
            });
        }
        line_start += line.len();
    }
    ParsedFile { statements }
}

fn parse_statement(text: &str, base: usize) -> Option<StatementKind<'_>> {
    let mut c = Cursor::new(text, base);
    if c.eat_keyword("import") {
        return parse_import(&mut c).map(StatementKind::Import);
    }
    let exported = c.eat_keyword("export");
    if exported && c.eat_char('*') {
        if !c.eat_keyword("from") {
            return None;
        }
        let spec = c.string_literal()?;
        c.finish()?;
        return Some(StatementKind::ExportAll(spec));
    }
    let ambient = c.eat_keyword("declare");
    let keyword = ["const", "let", "var"]
        .into_iter()
        .find(|kw| c.eat_keyword(kw))?;
    let (name, name_offset) = c.ident()?;

    let ty = if c.eat_char(':') {
        Some(c.take_until(&['=', ';'])).filter(|t| !t.is_empty())
    } else {
        None
    };
    if c.peek() == Some(':') {
        return None;
    }
    let init = if c.eat_char('=') {
        let init = c.take_until(&[';']);
        if init.is_empty() {
            return None;
        }
        Some(init)
    } else {
        None
    };
    c.finish()?;

    Some(StatementKind::Variable(VariableDecl {
        exported,
        ambient,
        keyword,
        name,
        name_offset,
        ty,
        init,
    }))
}

fn parse_import<'a>(c: &mut Cursor<'a>) -> Option<ImportDecl<'a>> {
    let clause = if c.eat_char('{') {
        let mut names = Vec::new();
        loop {
            if c.eat_char('}') {
                break;
            }
            names.push(c.ident()?);
            if !c.eat_char(',') && c.peek() != Some('}') {
                return None;
            }
        }
        ImportClause::Named(names)
    } else if c.eat_char('*') {
        if !c.eat_keyword("as") {
            return None;
        }
        ImportClause::Namespace(c.ident()?.0)
    } else {
        ImportClause::SideEffect
    };
    if !matches!(clause, ImportClause::SideEffect) && !c.eat_keyword("from") {
        return None;
    }
    let specifier = c.string_literal()?;
    c.finish()?;
    Some(ImportDecl { clause, specifier })
}

/// Returns `true` if `s` is a plain identifier.
pub(crate) fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

struct Cursor<'a> {
    src: &'a str,
    pos: usize,
    base: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str, base: usize) -> Self {
        Self { src, pos: 0, base }
    }

    fn rest(&self) -> &'a str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn peek(&mut self) -> Option<char> {
        self.skip_ws();
        self.rest().chars().next()
    }

    fn eat_char(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.pos += ch.len_utf8();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        self.skip_ws();
        let rest = self.rest();
        if !rest.starts_with(kw) {
            return false;
        }
        let boundary = rest[kw.len()..]
            .chars()
            .next()
            .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'));
        if boundary {
            self.pos += kw.len();
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<(&'a str, usize)> {
        self.skip_ws();
        let rest = self.rest();
        let len = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '$'))
            .unwrap_or(rest.len());
        let ident = &rest[..len];
        if !is_identifier(ident) {
            return None;
        }
        let offset = self.base + self.pos;
        self.pos += len;
        Some((ident, offset))
    }

    fn string_literal(&mut self) -> Option<ModuleSpecifier<'a>> {
        self.skip_ws();
        let rest = self.rest();
        let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let close = rest[1..].find(quote)? + 1;
        let spec = ModuleSpecifier {
            text: &rest[1..close],
            offset: self.base + self.pos,
            len: close + 1,
        };
        self.pos += close + 1;
        Some(spec)
    }

    /// Takes trimmed text up to the first of `stops` (or the end).
    fn take_until(&mut self, stops: &[char]) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c| stops.contains(&c)).unwrap_or(rest.len());
        self.pos += len;
        rest[..len].trim()
    }

    /// Succeeds if only an optional `;` remains.
    fn finish(&mut self) -> Option<()> {
        self.eat_char(';');
        self.skip_ws();
        self.rest().is_empty().then_some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(text: &str) -> StatementKind<'_> {
        let mut parsed = parse(text);
        assert_eq!(parsed.statements.len(), 1);
        parsed.statements.remove(0).kind
    }

    #[test]
    fn script_const() {
        match single("const x = 10;") {
            StatementKind::Variable(v) => {
                assert!(!v.exported);
                assert_eq!(v.keyword, "const");
                assert_eq!(v.name, "x");
                assert_eq!(v.name_offset, 6);
                assert_eq!(v.ty, None);
                assert_eq!(v.init, Some("10"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exported_annotated_const() {
        match single("export const y: string = 20;") {
            StatementKind::Variable(v) => {
                assert!(v.exported);
                assert_eq!(v.name_offset, 13);
                assert_eq!(v.ty, Some("string"));
                assert_eq!(v.init, Some("20"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn ambient_declaration() {
        match single("declare let count: number;") {
            StatementKind::Variable(v) => {
                assert!(v.ambient);
                assert_eq!(v.keyword, "let");
                assert_eq!(v.init, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn named_import() {
        match single("import { a, b } from \"./file1\";") {
            StatementKind::Import(i) => {
                match i.clause {
                    ImportClause::Named(names) => {
                        assert_eq!(names, vec![("a", 9), ("b", 12)]);
                    }
                    other => panic!("unexpected {other:?}"),
                }
                assert_eq!(i.specifier.text, "./file1");
                assert_eq!(i.specifier.offset, 21);
                assert_eq!(i.specifier.len, 9);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn namespace_and_side_effect_imports() {
        assert!(matches!(
            single("import * as util from './util';"),
            StatementKind::Import(ImportDecl {
                clause: ImportClause::Namespace("util"),
                ..
            })
        ));
        assert!(matches!(
            single("import './polyfill';"),
            StatementKind::Import(ImportDecl {
                clause: ImportClause::SideEffect,
                ..
            })
        ));
    }

    #[test]
    fn export_star() {
        match single("export * from \"./base\";") {
            StatementKind::ExportAll(spec) => assert_eq!(spec.text, "./base"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_statements() {
        assert!(matches!(single("x +* 3"), StatementKind::Unknown));
        assert!(matches!(single("const = 4;"), StatementKind::Unknown));
        assert!(matches!(single("const a = ;"), StatementKind::Unknown));
        assert!(matches!(single("interface Array<T> {}"), StatementKind::Unknown));
    }

    #[test]
    fn offsets_across_lines_and_comments() {
        let parsed = parse("// header\n\n  let a = 1;\nconst b = 2;\n");
        assert_eq!(parsed.statements.len(), 2);
        assert_eq!(parsed.statements[0].offset, 13);
        assert_eq!(parsed.statements[1].offset, 24);
        match &parsed.statements[1].kind {
            StatementKind::Variable(v) => assert_eq!(v.name_offset, 30),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn module_detection() {
        assert!(!parse("const x = 10;").is_module());
        assert!(parse("export const x = 10;").is_module());
        assert!(parse("import './a';").is_module());
        let parsed = parse("export const a = 1;\nconst b = 2;\nexport let c = 3;\nexport * from './d';");
        assert_eq!(parsed.exported_names().collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(parsed.re_exports().count(), 1);
        assert_eq!(parsed.specifiers().count(), 1);
    }

    #[test]
    fn keyword_needs_boundary() {
        assert!(matches!(single("constant = 1;"), StatementKind::Unknown));
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("file_1"));
        assert!(is_identifier("$x"));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier(""));
    }
}
