//! The C++ front end the engine consumes: a tree-sitter syntax tree, the
//! token stream read off it, a directive scan, declaration building and
//! declaration matching.

pub mod ast;
pub mod cst;
pub mod matcher;
pub mod parser;
pub mod preprocess;
pub mod source;
pub mod tokens;

pub use parser::parse;
