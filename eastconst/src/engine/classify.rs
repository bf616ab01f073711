//! Lexical classification of tokens met while scanning for qualifiers.

use std::fmt;

use serde::Serialize;

use crate::frontend::tokens::{Token, TokenKind};

/// A movable type qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Qualifier {
    /// `const`
    Const,
    /// `volatile`
    Volatile,
    /// `restrict`
    Restrict,
}

impl Qualifier {
    /// Canonical keyword written when the qualifier is reinserted.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Const => "const",
            Self::Volatile => "volatile",
            Self::Restrict => "restrict",
        }
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Specifiers that may sit between qualifiers and the base type and are
/// stepped over, never moved.
pub const IGNORABLE_SPECIFIERS: &[&str] = &[
    "constexpr",
    "consteval",
    "constinit",
    "static",
    "inline",
    "extern",
    "register",
    "thread_local",
    "mutable",
    "friend",
    "typedef",
];

/// What a token means to the qualifier scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    /// One of the movable qualifiers.
    Qualifier(Qualifier),
    /// A specifier from [`IGNORABLE_SPECIFIERS`].
    Ignorable,
    /// A comment or an unrecognized byte.
    Trivia,
    /// Anything else; ends a scan.
    Other,
}

/// Maps a keyword or portability spelling to its qualifier.
#[must_use]
pub fn qualifier_of(spelling: &str) -> Option<Qualifier> {
    match spelling {
        "const" | "__const" | "__const__" => Some(Qualifier::Const),
        "volatile" | "__volatile" | "__volatile__" => Some(Qualifier::Volatile),
        "restrict" | "__restrict" | "__restrict__" => Some(Qualifier::Restrict),
        _ => None,
    }
}

/// Classifies `token`, whose text lives in `source`.
#[must_use]
pub fn classify(token: &Token, source: &str) -> TokenClass {
    match token.kind {
        TokenKind::Comment | TokenKind::Unknown => TokenClass::Trivia,
        TokenKind::Ident => {
            let text = token.text(source);
            if let Some(q) = qualifier_of(text) {
                TokenClass::Qualifier(q)
            } else if IGNORABLE_SPECIFIERS.contains(&text) {
                TokenClass::Ignorable
            } else {
                TokenClass::Other
            }
        }
        _ => TokenClass::Other,
    }
}
