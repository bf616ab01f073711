//! The qualifier-relocation engine.
//!
//! For every matched declaration the engine walks the declared type, finds
//! qualifiers written west of their base type and asks an [`EditHandler`] to
//! move them east:
//!
//! ```text
//! const std::vector<const int> v;   ->   std::vector<int const> const v;
//! ```
//!
//! Each qualified location is resolved structurally from its inner type's
//! position when that position can be trusted, and from the raw spelling
//! otherwise (`auto`, `decltype`, template parameters, macros).

pub mod classify;
mod emitter;
mod insertion;
mod locator;
mod scan;
mod spelling;
mod structural;
mod traversal;

use std::path::PathBuf;

use serde::Serialize;

pub use classify::Qualifier;
pub use emitter::{EditEmitter, EditHandler, ProcessedStarts, Relocation};
pub use insertion::insertion_point;
pub use scan::{scan_dangling, scan_qualifiers, QualifierGroup};
pub use spelling::needs_spelling_fallback;

use crate::fix::{Replacements, RewriteError};
use crate::frontend::matcher::{register_east_const_matchers, MatchCallback, MatchFinder, MatchResult};
use crate::frontend::source::{SourceFile, SourceOptions};
use crate::frontend::parse;

/// Settings for one engine run.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Silences the engine's diagnostic logging. Never changes the edits.
    pub quiet: bool,
}

/// A qualifier relocation the engine scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    /// File the qualifier was found in.
    pub file: String,
    /// 1-indexed line of the removed qualifier.
    pub line: usize,
    /// 1-indexed column of the removed qualifier.
    pub column: usize,
    /// Moved qualifiers in source order.
    pub qualifiers: Vec<Qualifier>,
    /// Human-readable description.
    pub message: String,
}

/// Engine state for one translation unit.
pub struct EastConstEngine<'h> {
    config: EngineConfig,
    emitter: EditEmitter<'h>,
    findings: Vec<Finding>,
}

impl<'h> EastConstEngine<'h> {
    /// Creates an engine that reports its edits to `handler`.
    pub fn new(config: EngineConfig, handler: &'h mut dyn EditHandler) -> Self {
        Self {
            config,
            emitter: EditEmitter::new(handler, config.quiet),
            findings: Vec::new(),
        }
    }

    /// Consumes the engine, returning its findings.
    #[must_use]
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl MatchCallback for EastConstEngine<'_> {
    fn run(&mut self, result: &MatchResult<'_>) {
        self.process_decl(result.source, result.decl);
    }
}

/// Result of rewriting one buffer.
#[derive(Debug, Clone)]
pub struct RewriteOutcome {
    /// The rewritten text; equal to the input when nothing moved.
    pub text: String,
    /// One entry per relocated qualifier group.
    pub findings: Vec<Finding>,
}

impl RewriteOutcome {
    /// True when the text differs from the input.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.findings.is_empty()
    }
}

/// Parses `text`, runs the engine over every matched declaration and applies
/// the resulting edits.
///
/// # Errors
///
/// Returns an error when `text` cannot be parsed or the collected edits
/// cannot be applied to it.
pub fn rewrite_source(
    path: impl Into<PathBuf>,
    text: &str,
    options: &SourceOptions,
    config: EngineConfig,
) -> Result<RewriteOutcome, RewriteError> {
    let source = SourceFile::new(path, text, options)?;
    let tu = parse(&source);

    let mut finder = MatchFinder::new();
    register_east_const_matchers(&mut finder);

    let mut replacements = Replacements::new();
    let mut engine = EastConstEngine::new(config, &mut replacements);
    finder.match_translation_unit(&source, &tu, &mut engine);
    let findings = engine.into_findings();

    let text = replacements.apply_to(source.path(), source.text())?;
    Ok(RewriteOutcome { text, findings })
}
