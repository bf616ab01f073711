//! Resolution driven by the type structure.

use super::emitter::Relocation;
use super::insertion::insertion_point;
use super::scan::scan_qualifiers;
use crate::frontend::ast::{TypeLoc, TypeLocKind};
use crate::frontend::source::SourceFile;

/// Resolves a qualified location from its unqualified inner location: the
/// scan starts at the inner type's first token and the qualifiers are
/// reinserted after its last one.
#[must_use]
pub fn resolve(source: &SourceFile, qualified: &TypeLoc) -> Option<Relocation> {
    let TypeLocKind::Qualified { quals, inner } = &qualified.kind else {
        return None;
    };
    let base = inner.range;
    if !source.is_valid_range(base) || base.is_empty() || source.is_macro_location(base.start) {
        return None;
    }
    let group = scan_qualifiers(source, base.start, *quals)?;
    Some(Relocation {
        insert_at: insertion_point(source, base),
        group,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classify::Qualifier;
    use crate::frontend::ast::Qualifiers;
    use crate::frontend::source::ByteRange;

    fn const_record(start: usize, end: usize) -> TypeLoc {
        let quals: Qualifiers = [Qualifier::Const].into_iter().collect();
        TypeLoc::new(
            TypeLocKind::Record { name: "T".into() },
            ByteRange::new(start, end),
        )
        .qualified(quals)
    }

    #[test]
    fn test_resolves_template_base() {
        let text = "const std::vector<int> v;";
        let file = SourceFile::from_text("a.cpp", text).unwrap();
        let relocation = resolve(&file, &const_record(6, 22)).unwrap();
        assert_eq!(relocation.insert_at, 22);
        assert_eq!(relocation.group.removals.as_slice(), &[ByteRange::new(0, 6)]);
    }

    #[test]
    fn test_unqualified_location_is_rejected() {
        let file = SourceFile::from_text("a.cpp", "int x;").unwrap();
        let plain = TypeLoc::new(TypeLocKind::Builtin, ByteRange::new(0, 3));
        assert!(resolve(&file, &plain).is_none());
    }
}
