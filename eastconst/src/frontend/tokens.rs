//! Flat token stream read off the syntax tree.
//!
//! The engine scans backwards from a type to find the qualifiers written in
//! front of it, and that walk needs every token in source order: comments and
//! directive lines included, so they can be recognised and skipped. The stream
//! is the tree's leaves with literals kept whole and each directive collapsed
//! into one token spanning its logical line.

use tree_sitter::Node;

use super::cst::CstTree;
use super::source::ByteRange;

/// Lexical category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword.
    Ident,
    /// Numeric literal.
    Number,
    /// String literal, including prefixed and raw strings.
    Str,
    /// Character literal.
    Char,
    /// Operator or punctuator.
    Punct,
    /// Line or block comment.
    Comment,
    /// A whole preprocessor directive line, continuations included.
    Directive,
    /// Bytes the grammar could not place.
    Unknown,
}

/// A token with its byte span in the source buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    /// What kind of token this is.
    pub kind: TokenKind,
    /// Start offset (inclusive).
    pub start: usize,
    /// End offset (exclusive).
    pub end: usize,
}

impl Token {
    /// Returns the spelling of the token in `source`.
    #[must_use]
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }

    /// Returns the byte range of the token.
    #[must_use]
    pub const fn range(&self) -> ByteRange {
        ByteRange::new(self.start, self.end)
    }

    /// True for comments and directive lines.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Comment | TokenKind::Directive)
    }
}

/// Nodes with children that still read as one token.
const ATOMIC_KINDS: &[&str] = &[
    "string_literal",
    "raw_string_literal",
    "char_literal",
    "system_lib_string",
    "number_literal",
    "comment",
];

/// Collects the leaves of `tree` as tokens, in source order.
#[must_use]
pub fn collect_tokens(tree: &CstTree, source: &str) -> Vec<Token> {
    let mut collector = Collector {
        source,
        tokens: Vec::new(),
        directive_end: 0,
    };
    let mut cursor = tree.root().walk();
    if !cursor.goto_first_child() {
        return collector.tokens;
    }
    loop {
        let node = cursor.node();
        let atomic = node.child_count() == 0 || ATOMIC_KINDS.contains(&node.kind());
        if !atomic && cursor.goto_first_child() {
            continue;
        }
        collector.push(node);
        while !cursor.goto_next_sibling() {
            if !cursor.goto_parent() {
                return collector.tokens;
            }
        }
    }
}

struct Collector<'s> {
    source: &'s str,
    tokens: Vec<Token>,
    directive_end: usize,
}

impl Collector<'_> {
    fn push(&mut self, node: Node<'_>) {
        let (start, end) = (node.start_byte(), node.end_byte());
        let Some(spelling) = self.source.get(start..end) else {
            return;
        };
        // Missing nodes are zero-width and directive line ends are bare newlines.
        if spelling.trim().is_empty() {
            return;
        }
        let kind = match node.kind() {
            "comment" => TokenKind::Comment,
            _ if start < self.directive_end => return,
            _ if spelling.starts_with('#') && starts_line(self.source, start) => {
                self.directive_end = logical_line_end(self.source, start);
                self.tokens.push(Token {
                    kind: TokenKind::Directive,
                    start,
                    end: self.directive_end,
                });
                return;
            }
            "string_literal" | "raw_string_literal" | "system_lib_string" => TokenKind::Str,
            "char_literal" => TokenKind::Char,
            "number_literal" => TokenKind::Number,
            "ERROR" => TokenKind::Unknown,
            _ if spelling.starts_with(|c: char| c.is_alphabetic() || c == '_') => TokenKind::Ident,
            _ if spelling.starts_with(|c: char| c.is_ascii_digit()) => TokenKind::Number,
            _ => TokenKind::Punct,
        };
        self.tokens.push(Token { kind, start, end });
    }
}

fn starts_line(source: &str, offset: usize) -> bool {
    let line_start = source[..offset].rfind('\n').map_or(0, |i| i + 1);
    source[line_start..offset].trim().is_empty()
}

/// End of the line holding `offset`, following backslash continuations.
/// The newline itself is not included.
fn logical_line_end(source: &str, offset: usize) -> usize {
    let bytes = source.as_bytes();
    let mut pos = offset;
    while pos < bytes.len() {
        if bytes[pos] == b'\n' {
            let continued = source[..pos].trim_end_matches('\r').ends_with('\\');
            if !continued {
                let mut end = pos;
                if end > offset && bytes[end - 1] == b'\r' {
                    end -= 1;
                }
                return end;
            }
        }
        pos += 1;
    }
    bytes.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::cst::CstParser;

    fn tokenize(source: &str) -> Vec<Token> {
        let tree = CstParser::new().unwrap().parse(source).unwrap();
        collect_tokens(&tree, source)
    }

    fn spellings(source: &str) -> Vec<(TokenKind, &str)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.kind, t.text(source)))
            .collect()
    }

    #[test]
    fn test_declaration_tokens() {
        let toks = spellings("const std::vector<int>& v;");
        let texts: Vec<&str> = toks.iter().map(|(_, s)| *s).collect();
        assert_eq!(
            texts,
            vec!["const", "std", "::", "vector", "<", "int", ">", "&", "v", ";"]
        );
    }

    #[test]
    fn test_comments_are_tokens() {
        let toks = spellings("const /* Foo */ int // tail\nx;");
        assert_eq!(toks[1], (TokenKind::Comment, "/* Foo */"));
        assert_eq!(toks[3], (TokenKind::Comment, "// tail"));
    }

    #[test]
    fn test_directive_spans_continuations() {
        let source = "#define DECL(name) \\\n  const int name;\nint y;";
        let toks = tokenize(source);
        assert_eq!(toks[0].kind, TokenKind::Directive);
        assert_eq!(toks[0].text(source), "#define DECL(name) \\\n  const int name;");
        assert_eq!(toks[1].text(source), "int");
    }

    #[test]
    fn test_comment_inside_directive_is_kept() {
        let source = "#if 1 /* on */\nint y;\n#endif\n";
        let toks = spellings(source);
        assert_eq!(toks[0], (TokenKind::Directive, "#if 1 /* on */"));
        assert_eq!(toks[1], (TokenKind::Comment, "/* on */"));
        assert_eq!(toks[2].1, "int");
    }

    #[test]
    fn test_raw_string_swallows_const() {
        let source = "auto s = R\"cpp(const int x = 0;)cpp\"; int y;";
        let toks = spellings(source);
        assert_eq!(toks[3], (TokenKind::Str, "R\"cpp(const int x = 0;)cpp\""));
        assert_eq!(toks[5].1, "int");
    }

    #[test]
    fn test_literal_kinds() {
        let toks = spellings("auto a = u8\"a\"; char b = L'b'; long c = 1'000'000;");
        assert!(toks.contains(&(TokenKind::Str, "u8\"a\"")));
        assert!(toks.contains(&(TokenKind::Char, "L'b'")));
        assert!(toks.contains(&(TokenKind::Number, "1'000'000")));
    }

    #[test]
    fn test_continuation_is_whitespace() {
        let toks = spellings("const int continued \\\n= 1;");
        let texts: Vec<&str> = toks.iter().map(|(_, s)| *s).collect();
        assert_eq!(texts, vec!["const", "int", "continued", "=", "1", ";"]);
    }

    #[test]
    fn test_logical_line_end() {
        let source = "#define A \\\r\n  1\r\nint x;";
        assert_eq!(&source[..logical_line_end(source, 0)], "#define A \\\r\n  1");
    }
}
