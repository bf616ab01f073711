//! Resolution from the raw spelling, for types whose structure cannot be
//! trusted to give usable source positions.

use super::emitter::Relocation;
use super::scan::scan_qualifiers;
use crate::constants::{MAX_UNWRAP_STEPS, SPELLING_LOOKAHEAD};
use crate::frontend::ast::{TypeLoc, TypeLocKind};
use crate::frontend::source::SourceFile;

/// True when `qualified` must be resolved from its spelling.
///
/// That is the case when unwrapping the unqualified type reaches a deduced or
/// dependent category, when its range is unusable, or when the text right
/// after its start mentions `decltype` or `auto`.
#[must_use]
pub fn needs_spelling_fallback(source: &SourceFile, qualified: &TypeLoc) -> bool {
    if reaches_deduced_type(qualified.unqualified()) {
        return true;
    }
    let range = qualified.range;
    if !source.is_valid_range(range)
        || range.is_empty()
        || source.is_macro_location(range.start)
        || source.is_macro_location(range.end - 1)
    {
        return true;
    }
    let bytes = source.text().as_bytes();
    let window_end = (range.start + SPELLING_LOOKAHEAD).min(bytes.len());
    let window = &bytes[range.start..window_end];
    contains(window, b"decltype") || contains(window, b"auto")
}

fn reaches_deduced_type(unqualified: &TypeLoc) -> bool {
    let mut current = unqualified;
    for _ in 0..MAX_UNWRAP_STEPS {
        match &current.kind {
            TypeLocKind::Auto
            | TypeLocKind::DeducedTemplateSpecialization { .. }
            | TypeLocKind::Decltype { .. }
            | TypeLocKind::UnresolvedUsing { .. }
            | TypeLocKind::TemplateTypeParm { .. }
            | TypeLocKind::InjectedClassName { .. } => return true,
            TypeLocKind::Qualified { .. }
            | TypeLocKind::Pointer { .. }
            | TypeLocKind::LValueReference { .. }
            | TypeLocKind::RValueReference { .. }
            | TypeLocKind::MemberPointer { .. }
            | TypeLocKind::Paren { .. }
            | TypeLocKind::Attributed { .. }
            | TypeLocKind::Elaborated { .. } => match current.next() {
                Some(next) => current = next,
                None => return false,
            },
            _ => return false,
        }
    }
    false
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Resolves `qualified` by scanning from its own start and inserting after
/// its own end.
#[must_use]
pub fn resolve(source: &SourceFile, qualified: &TypeLoc) -> Option<Relocation> {
    let TypeLocKind::Qualified { quals, .. } = &qualified.kind else {
        return None;
    };
    let range = qualified.range;
    if !source.is_valid_range(range) || range.is_empty() || source.is_macro_location(range.start) {
        return None;
    }
    let group = scan_qualifiers(source, range.start, *quals)?;
    Some(Relocation {
        insert_at: range.end,
        group,
    })
}
