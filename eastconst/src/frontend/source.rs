//! Source buffers, byte ranges and provenance queries.

use std::path::{Path, PathBuf};

use rustc_hash::FxHashSet;
use serde::Serialize;
use tree_sitter::Node;

use super::cst::{CstError, CstParser, CstTree};
use super::preprocess::{self, MacroTable, Preprocessed};
use super::tokens::{collect_tokens, Token, TokenKind};
use crate::constants::get_suppression_re;
use crate::utils::LineIndex;

/// Half-open byte range `[start, end)` into one source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct ByteRange {
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl ByteRange {
    /// Creates a range.
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// An empty range at `offset`.
    #[must_use]
    pub const fn empty(offset: usize) -> Self {
        Self::new(offset, offset)
    }

    /// True when `offset` lies inside the range.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }

    /// True when the range has no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Smallest range covering both.
    #[must_use]
    pub fn cover(&self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// Options that shape how a buffer is preprocessed.
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// `NAME` or `NAME=VALUE` macro definitions.
    pub defines: Vec<String>,
    /// Directories whose files count as system headers.
    pub system_paths: Vec<PathBuf>,
}

/// One file under transformation together with its syntax tree and
/// everything known about its tokens and provenance.
#[derive(Debug)]
pub struct SourceFile {
    path: PathBuf,
    text: String,
    tree: CstTree,
    tokens: Vec<Token>,
    line_index: LineIndex,
    preprocessed: Preprocessed,
    system_header: bool,
    suppressed_lines: FxHashSet<usize>,
}

impl SourceFile {
    /// Parses and preprocesses `text`.
    ///
    /// # Errors
    ///
    /// Returns an error if the C++ grammar cannot be loaded or tree-sitter
    /// produces no tree.
    pub fn new(
        path: impl Into<PathBuf>,
        text: impl Into<String>,
        options: &SourceOptions,
    ) -> Result<Self, CstError> {
        let path = path.into();
        let text = text.into();
        let mut parser = CstParser::new()?;
        let tree = parser.parse(&text)?;
        let tokens = collect_tokens(&tree, &text);
        let preprocessed = preprocess::scan(&text, &tokens, &options.defines, &mut parser);
        let line_index = LineIndex::new(&text);
        let system_header = options.system_paths.iter().any(|dir| path.starts_with(dir));
        let suppressed_lines = collect_suppressions(&text, &tokens, &line_index);
        Ok(Self {
            path,
            text,
            tree,
            tokens,
            line_index,
            preprocessed,
            system_header,
            suppressed_lines,
        })
    }

    /// Convenience constructor with default options.
    ///
    /// # Errors
    ///
    /// See [`SourceFile::new`].
    pub fn from_text(
        path: impl Into<PathBuf>,
        text: impl Into<String>,
    ) -> Result<Self, CstError> {
        Self::new(path, text, &SourceOptions::default())
    }

    /// Path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full text of the file.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text covered by `range`, or `""` when it is out of bounds.
    #[must_use]
    pub fn slice(&self, range: ByteRange) -> &str {
        self.text.get(range.start..range.end).unwrap_or("")
    }

    /// Root of the syntax tree.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root()
    }

    /// All tokens, comments and directives included.
    #[must_use]
    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Macro table built while scanning directives.
    #[must_use]
    pub fn macros(&self) -> &MacroTable {
        &self.preprocessed.macros
    }

    /// True when `offset` points into this buffer.
    #[must_use]
    pub fn is_in_main_file(&self, offset: usize) -> bool {
        offset <= self.text.len()
    }

    /// True when the whole range lies in this buffer.
    #[must_use]
    pub fn is_valid_range(&self, range: ByteRange) -> bool {
        range.start <= range.end && self.is_in_main_file(range.end)
    }

    /// True when the file lives under a configured system directory.
    #[must_use]
    pub const fn is_in_system_header(&self) -> bool {
        self.system_header
    }

    /// True when `offset` was written inside a directive or produced by a
    /// macro invocation.
    #[must_use]
    pub fn is_macro_location(&self, offset: usize) -> bool {
        self.macro_region_at(offset).is_some()
    }

    /// The directive line or macro invocation containing `offset`.
    #[must_use]
    pub fn macro_region_at(&self, offset: usize) -> Option<ByteRange> {
        find_containing(&self.preprocessed.macro_regions, offset)
    }

    /// True when `offset` is compiled out by a conditional.
    #[must_use]
    pub fn is_inactive(&self, offset: usize) -> bool {
        find_containing(&self.preprocessed.inactive, offset).is_some()
    }

    /// True when a suppression comment covers the line of `offset`.
    #[must_use]
    pub fn is_suppressed(&self, offset: usize) -> bool {
        self.suppressed_lines.contains(&self.line_of(offset))
    }

    /// 1-indexed line of `offset`.
    #[must_use]
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_index.line_index(offset)
    }

    /// 1-indexed column (in bytes) of `offset`.
    #[must_use]
    pub fn column_of(&self, offset: usize) -> usize {
        offset - self.line_index.line_start(self.line_of(offset)) + 1
    }

    /// Index of the first token starting at or after `offset`.
    #[must_use]
    pub fn token_index_at(&self, offset: usize) -> usize {
        self.tokens.partition_point(|t| t.start < offset)
    }
}

fn find_containing(sorted: &[ByteRange], offset: usize) -> Option<ByteRange> {
    let idx = sorted.partition_point(|r| r.start <= offset);
    let candidate = *sorted.get(idx.checked_sub(1)?)?;
    candidate.contains(offset).then_some(candidate)
}

/// Lines carrying `NOLINT`, `eastconst: ignore`, or following `NOLINTNEXTLINE`.
fn collect_suppressions(text: &str, tokens: &[Token], lines: &LineIndex) -> FxHashSet<usize> {
    let mut suppressed = FxHashSet::default();
    for tok in tokens.iter().filter(|t| t.kind == TokenKind::Comment) {
        let Some(caps) = get_suppression_re().captures(tok.text(text)) else {
            continue;
        };
        if let Some(checks) = caps.name("checks") {
            let applies = checks
                .as_str()
                .split(',')
                .map(str::trim)
                .any(|check| check == "*" || check.starts_with("east-const"));
            if !applies {
                continue;
            }
        }
        let line = lines.line_index(tok.start);
        if caps.name("next").is_some() {
            suppressed.insert(line + 1);
        } else {
            suppressed.insert(line);
        }
    }
    suppressed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_macro_and_inactive_queries() {
        let text = "#define M(x) x\nM(const int a);\n#if 0\nconst int b;\n#endif\nconst int c;\n";
        let file = SourceFile::from_text("a.cpp", text).unwrap();
        let call = text.find("M(const").unwrap();
        assert!(file.is_macro_location(call + 3));
        assert_eq!(
            file.macro_region_at(call + 3).map(|r| &text[r.start..r.end]),
            Some("M(const int a)")
        );
        assert!(file.is_inactive(text.find("const int b").unwrap()));
        assert!(!file.is_inactive(text.find("const int c").unwrap()));
        assert!(!file.is_macro_location(text.find("const int c").unwrap()));
    }

    #[test]
    fn test_tokens_and_tree_cover_the_file() {
        let text = "// c\nconst /* x */ int a;";
        let file = SourceFile::from_text("a.cpp", text).unwrap();
        let code: Vec<&str> = file
            .tokens()
            .iter()
            .filter(|t| !t.is_trivia())
            .map(|t| t.text(text))
            .collect();
        assert_eq!(code, vec!["const", "int", "a", ";"]);
        assert_eq!(file.root().kind(), "translation_unit");
        assert_eq!(file.token_index_at(text.find("int").unwrap()), 3);
    }

    #[test]
    fn test_line_and_column() {
        let file = SourceFile::from_text("a.cpp", "int a;\n  const int b;").unwrap();
        let offset = file.text().find("const").unwrap();
        assert_eq!(file.line_of(offset), 2);
        assert_eq!(file.column_of(offset), 3);
    }

    #[test]
    fn test_suppression_comments() {
        let text = "const int a; // NOLINT\n// NOLINTNEXTLINE(east-const)\nconst int b;\nconst int c; // NOLINT(readability-x)\nconst int d; // eastconst: ignore\n";
        let file = SourceFile::from_text("a.cpp", text).unwrap();
        assert!(file.is_suppressed(text.find("const int a").unwrap()));
        assert!(file.is_suppressed(text.find("const int b").unwrap()));
        assert!(!file.is_suppressed(text.find("const int c").unwrap()));
        assert!(file.is_suppressed(text.find("const int d").unwrap()));
    }

    #[test]
    fn test_system_header_detection() {
        let options = SourceOptions {
            defines: Vec::new(),
            system_paths: vec![PathBuf::from("/usr/include")],
        };
        let file = SourceFile::new("/usr/include/vector", "", &options).unwrap();
        assert!(file.is_in_system_header());
    }
}
