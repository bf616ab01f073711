//! Byte-range safe code rewriter.
//!
//! This module provides a reusable rewriter that applies code edits
//! using byte ranges, preserving formatting and handling overlaps safely.
//!
//! # Usage
//!
//! ```
//! use eastconst::fix::{ByteRangeRewriter, Edit};
//!
//! let source = "const int x;";
//! let mut rewriter = ByteRangeRewriter::new(source);
//! rewriter.add_edit(Edit::delete(0, 6));
//! rewriter.add_edit(Edit::insert(9, " const"));
//! let fixed = rewriter.apply().expect("should apply");
//! assert_eq!(fixed, "int const x;");
//! ```

use thiserror::Error;

use crate::frontend::cst::CstError;

/// A single edit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    /// Start byte offset (inclusive)
    pub start_byte: usize,
    /// End byte offset (exclusive)
    pub end_byte: usize,
    /// Replacement content
    pub replacement: String,
}

impl Edit {
    /// Create a new edit
    #[must_use]
    pub fn new(start_byte: usize, end_byte: usize, replacement: impl Into<String>) -> Self {
        Self {
            start_byte,
            end_byte,
            replacement: replacement.into(),
        }
    }

    /// Create a deletion edit
    #[must_use]
    pub fn delete(start_byte: usize, end_byte: usize) -> Self {
        Self::new(start_byte, end_byte, "")
    }

    /// Create an insertion edit (insert before position)
    #[must_use]
    pub fn insert(position: usize, content: impl Into<String>) -> Self {
        Self::new(position, position, content)
    }

    /// Check if this edit overlaps with another.
    ///
    /// An insertion touching either end of a range does not overlap it.
    #[must_use]
    pub const fn overlaps(&self, other: &Self) -> bool {
        self.start_byte < other.end_byte && other.start_byte < self.end_byte
    }
}

/// Error during rewriting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// Two or more edits have overlapping ranges
    #[error("Overlapping edits at indices {edit_a} and {edit_b}")]
    OverlappingEdits {
        /// Index of first overlapping edit
        edit_a: usize,
        /// Index of second overlapping edit
        edit_b: usize,
    },
    /// Edit range is out of bounds
    #[error("Edit {edit_index} out of bounds: end_byte {end_byte} > source length {source_len}")]
    OutOfBounds {
        /// Index of the bad edit
        edit_index: usize,
        /// End byte of the edit
        end_byte: usize,
        /// Length of the source
        source_len: usize,
    },
    /// An edit boundary falls inside a multi-byte character
    #[error("Edit {edit_index} does not fall on a character boundary")]
    InvalidUtf8 {
        /// Index of the bad edit
        edit_index: usize,
    },
    /// The source could not be parsed
    #[error(transparent)]
    Parse(#[from] CstError),
}

/// Safe code rewriter using byte ranges
///
/// This rewriter applies edits in reverse order to preserve byte positions,
/// and validates that edits don't overlap.
#[derive(Debug, Clone)]
pub struct ByteRangeRewriter {
    /// Original source code
    source: String,
    /// Pending edits
    edits: Vec<Edit>,
}

impl ByteRangeRewriter {
    /// Create a new rewriter for the given source
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            edits: Vec::new(),
        }
    }

    /// Add an edit to the pending list
    pub fn add_edit(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    /// Add multiple edits
    pub fn add_edits(&mut self, edits: impl IntoIterator<Item = Edit>) {
        self.edits.extend(edits);
    }

    /// Validate edits without applying them
    ///
    /// # Errors
    /// Returns error if edits overlap, are out of bounds or split a character
    pub fn validate(&self) -> Result<(), RewriteError> {
        for (i, edit) in self.edits.iter().enumerate() {
            if edit.end_byte > self.source.len() || edit.start_byte > edit.end_byte {
                return Err(RewriteError::OutOfBounds {
                    edit_index: i,
                    end_byte: edit.end_byte,
                    source_len: self.source.len(),
                });
            }
            if !self.source.is_char_boundary(edit.start_byte)
                || !self.source.is_char_boundary(edit.end_byte)
            {
                return Err(RewriteError::InvalidUtf8 { edit_index: i });
            }
        }

        for i in 0..self.edits.len() {
            for j in (i + 1)..self.edits.len() {
                if self.edits[i].overlaps(&self.edits[j]) {
                    return Err(RewriteError::OverlappingEdits {
                        edit_a: i,
                        edit_b: j,
                    });
                }
            }
        }

        Ok(())
    }

    /// Apply all edits and return the modified source
    ///
    /// Edits are applied from the end of the buffer towards the start. At a
    /// shared start offset the wider edit goes first, and among equal edits
    /// the later-added one goes first, so insertions at one offset keep the
    /// order they were added in.
    ///
    /// # Errors
    /// Returns error if edits overlap or are out of bounds
    pub fn apply(self) -> Result<String, RewriteError> {
        self.validate()?;

        let mut result = self.source;
        let mut sorted_edits: Vec<(usize, Edit)> = self.edits.into_iter().enumerate().collect();
        sorted_edits.sort_by(|(ia, a), (ib, b)| {
            b.start_byte
                .cmp(&a.start_byte)
                .then(b.end_byte.cmp(&a.end_byte))
                .then(ib.cmp(ia))
        });

        for (_, edit) in sorted_edits {
            result.replace_range(edit.start_byte..edit.end_byte, &edit.replacement);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_replacement() {
        let source = "hello world";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::new(0, 5, "hi"));

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "hi world");
    }

    #[test]
    fn test_multiple_non_overlapping_edits() {
        let source = "aaa bbb ccc";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::new(0, 3, "AAA"));
        rewriter.add_edit(Edit::new(8, 11, "CCC"));

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "AAA bbb CCC");
    }

    #[test]
    fn test_overlapping_edits_error() {
        let source = "hello world";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::new(0, 8, "hi"));
        rewriter.add_edit(Edit::new(5, 10, "there"));

        let result = rewriter.apply();
        assert!(matches!(result, Err(RewriteError::OverlappingEdits { .. })));
    }

    #[test]
    fn test_out_of_bounds_error() {
        let source = "short";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::new(0, 100, "long"));

        let result = rewriter.apply();
        assert!(matches!(result, Err(RewriteError::OutOfBounds { .. })));
    }

    #[test]
    fn test_split_character_error() {
        let source = "int é;";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::delete(5, 6));

        let result = rewriter.apply();
        assert!(matches!(result, Err(RewriteError::InvalidUtf8 { .. })));
    }

    #[test]
    fn test_qualifier_relocation() {
        let source = "const int x = 5;";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::delete(0, 6));
        rewriter.add_edit(Edit::insert(9, " const"));

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "int const x = 5;");
    }

    #[test]
    fn test_deletion_and_insertion_at_same_offset() {
        let source = "abcdef";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::insert(3, "X"));
        rewriter.add_edit(Edit::delete(3, 5));

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "abcXf");
    }

    #[test]
    fn test_insertions_at_same_offset_keep_order() {
        let source = "ab";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edit(Edit::insert(1, "1"));
        rewriter.add_edit(Edit::insert(1, "2"));

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "a12b");
    }

    #[test]
    fn test_preserves_comments() {
        let source = "const /* keep */ int x;";
        let mut rewriter = ByteRangeRewriter::new(source);
        let comment = source.find("/*").expect("comment");
        let int_end = source.find(" x;").expect("declarator");
        rewriter.add_edit(Edit::delete(0, comment));
        rewriter.add_edit(Edit::insert(int_end, " const"));

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "/* keep */ int const x;");
    }

    #[test]
    fn test_empty_edits() {
        let source = "hello world";
        let rewriter = ByteRangeRewriter::new(source);
        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, source);
    }

    #[test]
    fn test_adjacent_non_overlapping_edits() {
        let source = "abcdef";
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edits([Edit::new(0, 3, "XXX"), Edit::new(3, 6, "YYY")]);

        let result = rewriter.apply().expect("should apply");
        assert_eq!(result, "XXXYYY");
    }
}
