//! Edits collected per file, ready to be applied.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::rewriter::{ByteRangeRewriter, Edit, RewriteError};
use crate::engine::EditHandler;
use crate::frontend::source::{ByteRange, SourceFile};

/// Non-overlapping edits keyed by file path.
#[derive(Debug, Clone, Default)]
pub struct Replacements {
    files: FxHashMap<PathBuf, Vec<Edit>>,
}

impl Replacements {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one edit, rejecting it when it overlaps an edit already queued
    /// for the same file.
    ///
    /// # Errors
    /// Returns [`RewriteError::OverlappingEdits`] on conflict.
    pub fn add(&mut self, path: &Path, edit: Edit) -> Result<(), RewriteError> {
        let edits = self.files.entry(path.to_path_buf()).or_default();
        if let Some(existing) = edits.iter().position(|e| e.overlaps(&edit)) {
            return Err(RewriteError::OverlappingEdits {
                edit_a: existing,
                edit_b: edits.len(),
            });
        }
        edits.push(edit);
        Ok(())
    }

    /// Adds all of `group` or none of it.
    ///
    /// # Errors
    /// Returns [`RewriteError::OverlappingEdits`] when any edit conflicts with
    /// a queued edit or with another edit of the group.
    pub fn add_all(&mut self, path: &Path, group: Vec<Edit>) -> Result<(), RewriteError> {
        let queued = self.files.get(path).map_or(&[][..], Vec::as_slice);
        for (i, edit) in group.iter().enumerate() {
            if let Some(existing) = queued.iter().position(|e| e.overlaps(edit)) {
                return Err(RewriteError::OverlappingEdits {
                    edit_a: existing,
                    edit_b: queued.len() + i,
                });
            }
            if let Some(j) = group[..i].iter().position(|e| e.overlaps(edit)) {
                return Err(RewriteError::OverlappingEdits {
                    edit_a: queued.len() + j,
                    edit_b: queued.len() + i,
                });
            }
        }
        self.files
            .entry(path.to_path_buf())
            .or_default()
            .extend(group);
        Ok(())
    }

    /// Edits queued for `path`, in insertion order.
    #[must_use]
    pub fn edits_for(&self, path: &Path) -> &[Edit] {
        self.files.get(path).map_or(&[], Vec::as_slice)
    }

    /// Applies the edits queued for `path` to `source`.
    ///
    /// # Errors
    /// Returns the rewriter's error when an edit is out of bounds.
    pub fn apply_to(&self, path: &Path, source: &str) -> Result<String, RewriteError> {
        let mut rewriter = ByteRangeRewriter::new(source);
        rewriter.add_edits(self.edits_for(path).iter().cloned());
        rewriter.apply()
    }
}

impl EditHandler for Replacements {
    fn handle(
        &mut self,
        source: &SourceFile,
        range: ByteRange,
        text: &str,
    ) -> Result<(), RewriteError> {
        self.add(source.path(), Edit::new(range.start, range.end, text))
    }

    fn handle_group(
        &mut self,
        source: &SourceFile,
        edits: &[(ByteRange, String)],
    ) -> Result<(), RewriteError> {
        let group = edits
            .iter()
            .map(|(range, text)| Edit::new(range.start, range.end, text.as_str()))
            .collect();
        self.add_all(source.path(), group)
    }
}
