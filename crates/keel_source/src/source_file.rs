//! Source file representation with line-start indexing for fast line/column lookup.

use keel_common::ContentHash;
use std::path::PathBuf;

/// A source file loaded for a build.
///
/// Stores the file's content along with precomputed line-start offsets for
/// efficient line/column resolution during diagnostic rendering.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The normalised path of this file.
    pub path: PathBuf,
    /// The full text content of the file.
    pub content: String,
    /// Byte offsets of each line start (the first entry is always 0).
    line_starts: Vec<u32>,
    /// Hash of the raw content; the file's *version*.
    pub version: ContentHash,
}

impl SourceFile {
    /// Creates a new `SourceFile` with precomputed line starts and version hash.
    pub fn new(path: PathBuf, content: String) -> Self {
        let line_starts = compute_line_starts(&content);
        let version = ContentHash::of_text(&content);
        Self {
            path,
            content,
            line_starts,
            version,
        }
    }

    /// Converts a byte offset into 1-indexed (line, column) coordinates.
    ///
    /// Offsets past the end of the file clamp to the last line.
    pub fn line_col(&self, byte_offset: u32) -> (u32, u32) {
        let byte_offset = byte_offset.min(clamp(self.content.len()));
        let line_idx = match self.line_starts.binary_search(&byte_offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line = clamp(line_idx).saturating_add(1);
        let col = byte_offset - self.line_starts[line_idx] + 1;
        (line, col)
    }

    /// Returns the full text of the 1-indexed line, without its terminator.
    pub fn line_text(&self, line: u32) -> &str {
        let idx = (line.max(1) - 1) as usize;
        let Some(&start) = self.line_starts.get(idx) else {
            return "";
        };
        let end = self
            .line_starts
            .get(idx + 1)
            .map_or(self.content.len(), |&next| next as usize);
        self.content[start as usize..end].trim_end_matches(['\n', '\r'])
    }

    /// Returns a substring of the file content between byte offsets.
    pub fn snippet(&self, start: u32, end: u32) -> &str {
        &self.content[start as usize..end as usize]
    }
}

/// Offsets are stored as `u32`; anything past 4 GiB is pinned to `u32::MAX`.
fn clamp(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

/// Computes the byte offsets of each line start in the given content.
fn compute_line_starts(content: &str) -> Vec<u32> {
    let mut starts = vec![0u32];
    for (i, byte) in content.bytes().enumerate() {
        if byte == b'\n' {
            starts.push(clamp(i + 1));
        }
    }
    starts
}
