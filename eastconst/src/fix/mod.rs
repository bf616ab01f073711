//! Text-patching for qualifier relocations.
//!
//! The engine only produces edit requests. This module collects them per
//! file ([`Replacements`]) and applies them to the original bytes with
//! [`ByteRangeRewriter`], which validates bounds and overlaps before
//! touching anything.

mod replacements;
mod rewriter;

pub use replacements::Replacements;
pub use rewriter::{ByteRangeRewriter, Edit, RewriteError};
