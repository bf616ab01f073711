//! Utilities module for eastconst.
//!
//! This module provides various utility functions used across the codebase.

mod paths;

pub use paths::{
    collect_cpp_files, has_cpp_extension, is_excluded, normalize_display_path,
    validate_path_within_root,
};

/// A utility struct to convert byte offsets to line numbers.
///
/// Findings are reported with 1-indexed lines and columns, while the tokens
/// and the engine work with byte offsets.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Stores the byte index of the start of each line.
    line_starts: Vec<usize>,
}

impl LineIndex {
    /// Creates a new `LineIndex` by scanning the source code for newlines.
    /// Uses byte iteration since '\n' is always a single byte in UTF-8.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, byte) in source.as_bytes().iter().enumerate() {
            if *byte == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self { line_starts }
    }

    /// Converts a byte offset to a 1-indexed line number.
    #[must_use]
    pub fn line_index(&self, offset: usize) -> usize {
        match self.line_starts.binary_search(&offset) {
            Ok(line) => line + 1,
            Err(line) => line,
        }
    }

    /// Byte offset at which the 1-indexed `line` starts. Lines past the end
    /// map to the start of the last line.
    #[must_use]
    pub fn line_start(&self, line: usize) -> usize {
        let idx = line.saturating_sub(1).min(self.line_starts.len() - 1);
        self.line_starts[idx]
    }

    /// Number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
