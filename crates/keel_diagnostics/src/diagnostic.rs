//! Structured diagnostic messages with a location, code and category.

use crate::category::Category;
use crate::code::DiagnosticCode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A structured diagnostic produced while checking a source file.
///
/// Locations are byte offsets into the file's text; line and column are only
/// derived when the diagnostic is rendered, so persisted diagnostics stay
/// valid for as long as the file's version is unchanged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// The file this diagnostic belongs to, if any.
    pub file: Option<PathBuf>,
    /// Byte offset of the start of the flagged range.
    pub start: u32,
    /// Length of the flagged range in bytes.
    pub length: u32,
    /// The numeric code identifying the kind of diagnostic.
    pub code: DiagnosticCode,
    /// The category of this diagnostic.
    pub category: Category,
    /// The human-readable message.
    pub message: String,
}

impl Diagnostic {
    /// Creates a global error diagnostic with no file location.
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Category::Error, code, message)
    }

    /// Creates a global warning diagnostic with no file location.
    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(Category::Warning, code, message)
    }

    /// Creates a diagnostic of the given category with no file location.
    pub fn new(category: Category, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            file: None,
            start: 0,
            length: 0,
            code,
            category,
            message: message.into(),
        }
    }

    /// Attaches a file location to this diagnostic.
    pub fn at(mut self, file: &Path, start: u32, length: u32) -> Self {
        self.file = Some(file.to_path_buf());
        self.start = start;
        self.length = length;
        self
    }

    /// Returns `true` if this diagnostic is an error.
    pub fn is_error(&self) -> bool {
        self.category.is_error()
    }
}
