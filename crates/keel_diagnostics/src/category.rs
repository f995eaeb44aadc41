//! Diagnostic categories and their persisted numeric tags.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a diagnostic message.
///
/// Persisted in build snapshots as its numeric tag: `0` warning, `1` error,
/// `2` suggestion, `3` message.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Category {
    /// A potential issue that does not fail the build.
    Warning,
    /// A definite problem in the sources.
    Error,
    /// An editor-style suggestion.
    Suggestion,
    /// An informational message.
    Message,
}

impl Category {
    /// Returns `true` if this category is [`Error`](Category::Error).
    pub fn is_error(self) -> bool {
        self == Category::Error
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> u8 {
        match category {
            Category::Warning => 0,
            Category::Error => 1,
            Category::Suggestion => 2,
            Category::Message => 3,
        }
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(tag: u8) -> Result<Self, String> {
        match tag {
            0 => Ok(Category::Warning),
            1 => Ok(Category::Error),
            2 => Ok(Category::Suggestion),
            3 => Ok(Category::Message),
            other => Err(format!("unknown diagnostic category {other}")),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Category::Warning => write!(f, "warning"),
            Category::Error => write!(f, "error"),
            Category::Suggestion => write!(f, "suggestion"),
            Category::Message => write!(f, "message"),
        }
    }
}
