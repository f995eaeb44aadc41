//! The incremental build engine.
//!
//! A build loads the project's inputs, asks the [`planner`] which files need
//! their outputs and diagnostics recomputed, stages the outputs in an
//! [`EmitWriter`], commits them, and finally commits the new snapshot. The
//! language itself sits behind the [`CompilerBackend`] trait; [`script`]
//! provides a small reference backend.

#![warn(missing_docs)]

pub mod backend;
pub mod builder;
pub mod emit;
pub mod error;
pub mod planner;
pub mod project;
pub mod script;
pub mod watch;

pub use backend::{is_declaration_file, CompilerBackend, EmitTarget};
pub use builder::{build, build_project, clean, diagnostics_by_file, BuildOutcome, BuildSummary};
pub use emit::{assemble_bundle, Bundle, BundleOutput, EmitWriter, OutputLayout};
pub use error::BuildError;
pub use planner::{plan, plan_bundle, BuildPlan, BundlePlan, FileState, Invalidation, PlannedFile};
pub use project::{Project, SNAPSHOT_EXTENSION};
pub use script::ScriptBackend;
pub use watch::{serve, ChangeDetector, RebuildQueue, RebuildRequest, WatchSession};
