//! Tree-sitter based concrete syntax tree for C and C++ sources.
//!
//! Every file is parsed with the C++ grammar, C sources included. The tree
//! keeps exact byte ranges and survives syntax errors, which is what the
//! declaration adapter and the token stream both build on.

use std::fmt;

use thiserror::Error;
use tree_sitter::{Node, Parser, Tree};

use super::source::ByteRange;

/// Errors raised while building a syntax tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CstError {
    /// The grammar could not be loaded into the parser.
    #[error("failed to create C++ parser: {0}")]
    ParserCreation(String),

    /// Tree-sitter gave up on the input.
    #[error("failed to parse source as C++")]
    ParseFailed,
}

/// Parser for C++ source code.
pub struct CstParser {
    parser: Parser,
}

impl CstParser {
    /// Create a new C++ parser.
    ///
    /// # Errors
    ///
    /// Returns an error if the grammar version does not match the runtime.
    pub fn new() -> Result<Self, CstError> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_cpp::LANGUAGE.into())
            .map_err(|e| CstError::ParserCreation(e.to_string()))?;
        Ok(Self { parser })
    }

    /// Parse C++ source code into a syntax tree.
    ///
    /// # Errors
    ///
    /// Returns an error if tree-sitter returns no tree.
    pub fn parse(&mut self, source: &str) -> Result<CstTree, CstError> {
        let tree = self
            .parser
            .parse(source, None)
            .ok_or(CstError::ParseFailed)?;
        Ok(CstTree { tree })
    }
}

/// A parsed syntax tree.
pub struct CstTree {
    tree: Tree,
}

impl CstTree {
    /// Root `translation_unit` node.
    #[must_use]
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// True when tree-sitter had to recover from a syntax error anywhere.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.root().has_error()
    }
}

impl fmt::Debug for CstTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CstTree")
            .field("range", &node_range(self.root()))
            .field("has_errors", &self.has_errors())
            .finish()
    }
}

/// Byte range covered by `node`.
#[must_use]
pub fn node_range(node: Node<'_>) -> ByteRange {
    ByteRange::new(node.start_byte(), node.end_byte())
}

/// Source text of `node`, or `""` when the range is not on a char boundary.
#[must_use]
pub fn node_text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// First direct child of `node` with the given kind.
#[must_use]
pub fn child_of_kind<'t>(node: Node<'t>, kind: &str) -> Option<Node<'t>> {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).find(|c| c.kind() == kind);
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declaration() {
        let mut parser = CstParser::new().unwrap();
        let source = "const int x = 1;";
        let tree = parser.parse(source).unwrap();
        let decl = child_of_kind(tree.root(), "declaration").unwrap();
        let qualifier = child_of_kind(decl, "type_qualifier").unwrap();
        assert_eq!(node_text(qualifier, source), "const");
        let ty = decl.child_by_field_name("type").unwrap();
        assert_eq!(node_range(ty), ByteRange::new(6, 9));
        assert!(!tree.has_errors());
    }

    #[test]
    fn test_errors_are_recovered() {
        let mut parser = CstParser::new().unwrap();
        let tree = parser.parse("int = ;\nconst int z = 1;").unwrap();
        assert!(tree.has_errors());
        assert_eq!(tree.root().kind(), "translation_unit");
    }
}
