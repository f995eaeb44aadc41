//! Diagnostic creation, categories, accumulation and rendering.
//!
//! This crate provides structured [`Diagnostic`] messages carrying a file,
//! byte range, numeric code and [`Category`]. The [`DiagnosticSink`]
//! accumulates diagnostics during a build, and [`DiagnosticRenderer`]
//! implementations format them as compact `path(line,col)` lines or as
//! rustc-style terminal output.

#![warn(missing_docs)]

pub mod category;
pub mod code;
pub mod diagnostic;
pub mod renderer;
pub mod sink;

pub use category::Category;
pub use code::DiagnosticCode;
pub use diagnostic::Diagnostic;
pub use renderer::{CompactRenderer, DiagnosticRenderer, TerminalRenderer};
pub use sink::DiagnosticSink;
