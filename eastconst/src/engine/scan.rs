//! Backward qualifier scans over the raw token stream.
//!
//! Both resolvers share [`scan_qualifiers`]: starting right before an anchor
//! offset it walks tokens backwards, collecting qualifier tokens and stepping
//! over comments and ignorable specifiers, until anything else shows up.

use smallvec::SmallVec;

use super::classify::{classify, qualifier_of, Qualifier, TokenClass};
use crate::constants::MAX_QUALIFIER_LOOKBEHIND;
use crate::frontend::ast::Qualifiers;
use crate::frontend::source::{ByteRange, SourceFile};

/// Qualifier tokens found in front of a type, ready to be moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifierGroup {
    /// Ranges to delete, in source order. Comments and specifiers that sit
    /// between the moved qualifiers are not part of any range.
    pub removals: SmallVec<[ByteRange; 2]>,
    /// Qualifiers to reinsert, in source order.
    pub qualifiers: SmallVec<[Qualifier; 3]>,
}

impl QualifierGroup {
    /// Offset of the first deleted byte.
    #[must_use]
    pub fn start(&self) -> Option<usize> {
        self.removals.first().map(|r| r.start)
    }
}

#[derive(Debug, Clone, Copy)]
struct Scanned {
    range: ByteRange,
    qualifier: Option<Qualifier>,
}

/// Scans backwards from `anchor` for the qualifiers in `quals`.
///
/// Returns `None` when the anchor is not in user code, when no qualifier is
/// found, or when `quals` contains `const` but no `const` precedes the anchor
/// (the `const` is then already written east of the type).
#[must_use]
pub fn scan_qualifiers(
    source: &SourceFile,
    anchor: usize,
    quals: Qualifiers,
) -> Option<QualifierGroup> {
    if quals.is_empty() || !source.is_in_main_file(anchor) || source.is_macro_location(anchor) {
        return None;
    }
    let text = source.text();
    let tokens = source.tokens();
    let window_start = anchor.saturating_sub(MAX_QUALIFIER_LOOKBEHIND);
    let mut remaining = quals;
    let mut scanned: SmallVec<[Scanned; 6]> = SmallVec::new();

    for tok in tokens[..source.token_index_at(anchor)].iter().rev() {
        if tok.start < window_start || tok.end > anchor {
            break;
        }
        if source.is_macro_location(tok.start) || source.is_inactive(tok.start) {
            break;
        }
        match classify(tok, text) {
            TokenClass::Qualifier(q) if remaining.has(q) => {
                remaining.remove(q);
                scanned.push(Scanned {
                    range: tok.range(),
                    qualifier: Some(q),
                });
            }
            TokenClass::Trivia | TokenClass::Ignorable => scanned.push(Scanned {
                range: tok.range(),
                qualifier: None,
            }),
            TokenClass::Qualifier(_) | TokenClass::Other => break,
        }
    }
    scanned.reverse();

    let first_qualifier = scanned.iter().position(|s| s.qualifier.is_some())?;
    let anchor_idx = if quals.has(Qualifier::Const) {
        scanned
            .iter()
            .position(|s| s.qualifier == Some(Qualifier::Const))?
    } else {
        first_qualifier
    };

    let mut group = QualifierGroup {
        removals: SmallVec::new(),
        qualifiers: SmallVec::new(),
    };
    let mut run_start: Option<usize> = None;
    for item in &scanned[anchor_idx..] {
        match item.qualifier {
            Some(q) => {
                group.qualifiers.push(q);
                run_start.get_or_insert(item.range.start);
            }
            None => {
                if let Some(start) = run_start.take() {
                    group.removals.push(ByteRange::new(start, item.range.start));
                }
            }
        }
    }
    if let Some(start) = run_start {
        group.removals.push(ByteRange::new(start, anchor));
    }
    Some(group)
}

/// Scans raw text backwards from `begin` for qualifier words separated only
/// by whitespace. Used for qualifiers the type structure does not model.
#[must_use]
pub fn scan_dangling(source: &SourceFile, begin: usize) -> Option<QualifierGroup> {
    if !source.is_in_main_file(begin) || source.is_macro_location(begin) {
        return None;
    }
    let bytes = source.text().as_bytes();
    let floor = begin.saturating_sub(MAX_QUALIFIER_LOOKBEHIND);
    let mut cursor = begin;
    let mut found: SmallVec<[(usize, Qualifier); 3]> = SmallVec::new();

    loop {
        let mut end = cursor;
        while end > floor && bytes[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        let mut start = end;
        while start > floor && is_ident_byte(bytes[start - 1]) {
            start -= 1;
        }
        if start == end {
            break;
        }
        let word = source.slice(ByteRange::new(start, end));
        let Some(q) = qualifier_of(word) else {
            break;
        };
        if source.is_macro_location(start) {
            break;
        }
        found.push((start, q));
        cursor = start;
    }

    let (first, _) = *found.last()?;
    found.reverse();
    Some(QualifierGroup {
        removals: SmallVec::from_elem(ByteRange::new(first, begin), 1),
        qualifiers: found.iter().map(|(_, q)| *q).collect(),
    })
}

const fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
