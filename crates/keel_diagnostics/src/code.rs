//! Numeric diagnostic codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A numeric diagnostic code, displayed with a `TS` prefix (e.g. `TS2322`).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DiagnosticCode(pub u32);

impl DiagnosticCode {
    /// `Declaration or statement expected.`
    pub const DECLARATION_EXPECTED: DiagnosticCode = DiagnosticCode(1128);
    /// `'const' declarations must be initialized.`
    pub const CONST_MUST_BE_INITIALIZED: DiagnosticCode = DiagnosticCode(1155);
    /// `Cannot find module '{0}'.`
    pub const CANNOT_FIND_MODULE: DiagnosticCode = DiagnosticCode(2307);
    /// `Type '{0}' is not assignable to type '{1}'.`
    pub const TYPE_NOT_ASSIGNABLE: DiagnosticCode = DiagnosticCode(2322);
    /// `Cannot redeclare block-scoped variable '{0}'.`
    pub const CANNOT_REDECLARE: DiagnosticCode = DiagnosticCode(2451);
    /// `Module '{0}' has no exported member '{1}'.`
    pub const NO_EXPORTED_MEMBER: DiagnosticCode = DiagnosticCode(2305);
    /// `Cannot compile modules using '--outFile' unless '--module' is 'amd'.`
    pub const OUT_FILE_REQUIRES_AMD: DiagnosticCode = DiagnosticCode(6131);
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TS{}", self.0)
    }
}
