//! Turning resolved relocations into edits.

use rustc_hash::FxHashSet;
use smallvec::SmallVec;
use tracing::{debug, warn};

use super::scan::QualifierGroup;
use crate::fix::RewriteError;
use crate::frontend::source::{ByteRange, SourceFile};

/// Receives the edits of a run.
pub trait EditHandler {
    /// Records one edit replacing `range` of `source` with `text`.
    ///
    /// # Errors
    /// Returns an error when the edit cannot be accepted, e.g. because it
    /// overlaps an edit recorded earlier.
    fn handle(&mut self, source: &SourceFile, range: ByteRange, text: &str)
        -> Result<(), RewriteError>;

    /// Records a group of edits that belong to one relocation. Implementors
    /// that can check for conflicts up front should accept all or none.
    ///
    /// # Errors
    /// Returns the first error from [`EditHandler::handle`].
    fn handle_group(
        &mut self,
        source: &SourceFile,
        edits: &[(ByteRange, String)],
    ) -> Result<(), RewriteError> {
        for (range, text) in edits {
            self.handle(source, *range, text)?;
        }
        Ok(())
    }
}

/// A resolved move: what to delete, what to insert and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    /// Qualifier tokens and their removal ranges.
    pub group: QualifierGroup,
    /// Offset at which the qualifier suffix is inserted.
    pub insert_at: usize,
}

impl Relocation {
    /// `" const volatile"`: a leading space, then the keywords in order.
    #[must_use]
    pub fn suffix(&self) -> String {
        self.group
            .qualifiers
            .iter()
            .fold(String::new(), |mut acc, q| {
                acc.push(' ');
                acc.push_str(q.keyword());
                acc
            })
    }
}

/// Removal starts already scheduled during one run.
#[derive(Debug, Default)]
pub struct ProcessedStarts(FxHashSet<usize>);

impl ProcessedStarts {
    /// Records `start`; false when it was already recorded.
    pub fn insert(&mut self, start: usize) -> bool {
        self.0.insert(start)
    }
}

/// Hands relocations to an [`EditHandler`], at most once per removal start.
pub struct EditEmitter<'h> {
    handler: &'h mut dyn EditHandler,
    processed: ProcessedStarts,
    quiet: bool,
}

impl<'h> EditEmitter<'h> {
    /// Creates an emitter with an empty processed-start set.
    pub fn new(handler: &'h mut dyn EditHandler, quiet: bool) -> Self {
        Self {
            handler,
            processed: ProcessedStarts::default(),
            quiet,
        }
    }

    /// Emits the deletions and the insertion for `relocation`.
    ///
    /// Returns true when the edits were accepted. A removal start seen
    /// before, or a rejection by the handler, leaves nothing queued.
    pub fn emit(&mut self, source: &SourceFile, relocation: &Relocation) -> bool {
        let Some(start) = relocation.group.start() else {
            return false;
        };
        if !self.processed.insert(start) {
            if !self.quiet {
                debug!(offset = start, "qualifier already relocated");
            }
            return false;
        }

        let mut edits: SmallVec<[(ByteRange, String); 3]> = relocation
            .group
            .removals
            .iter()
            .map(|range| (*range, String::new()))
            .collect();
        let suffix = relocation.suffix();
        if !suffix.is_empty() {
            edits.push((ByteRange::empty(relocation.insert_at), suffix.clone()));
        }

        match self.handler.handle_group(source, &edits) {
            Ok(()) => {
                if !self.quiet {
                    debug!(
                        file = %source.path().display(),
                        suffix = %suffix,
                        "inserted qualifier suffix"
                    );
                }
                true
            }
            Err(err) => {
                if !self.quiet {
                    warn!(
                        file = %source.path().display(),
                        error = %err,
                        "error adding replacement"
                    );
                }
                false
            }
        }
    }
}
