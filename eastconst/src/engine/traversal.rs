//! Walking a type-location tree.

use tracing::debug;

use super::emitter::Relocation;
use super::scan::scan_dangling;
use super::{spelling, structural, EastConstEngine, Finding};
use crate::frontend::ast::{TypeLoc, TypeLocKind};
use crate::frontend::source::SourceFile;

const RELOCATION_MESSAGE: &str = "move qualifier east of the declarator";

/// True when qualifiers on `tl` are already written east by declarator
/// syntax, as in `int* const`.
fn is_east_by_syntax(tl: &TypeLoc) -> bool {
    match &tl.kind {
        TypeLocKind::Attributed { modified } => is_east_by_syntax(modified),
        _ => tl.is_declarator(),
    }
}

/// True for deduced nodes whose qualifiers the structure drops.
fn has_dangling_qualifiers(tl: &TypeLoc) -> bool {
    tl.is_reference_type()
        && matches!(
            tl.kind,
            TypeLocKind::Decltype { .. }
                | TypeLocKind::Auto
                | TypeLocKind::DeducedTemplateSpecialization { .. }
        )
}

impl EastConstEngine<'_> {
    /// Visits `tl` and every location along its chain.
    pub(crate) fn process_type_loc(&mut self, source: &SourceFile, tl: &TypeLoc) {
        for node in tl.chain() {
            match &node.kind {
                TypeLocKind::Qualified { .. } => self.process_qualified(source, node),
                TypeLocKind::TemplateSpecialization { args, .. } => {
                    for arg in args {
                        if let Some(ty) = &arg.ty {
                            self.process_type_loc(source, ty);
                        }
                    }
                }
                TypeLocKind::FunctionProto { params, .. } => {
                    for param in params {
                        self.process_decl(source, param);
                    }
                }
                _ => {}
            }
            if has_dangling_qualifiers(node) {
                self.process_dangling(source, node);
            }
        }
    }

    fn process_qualified(&mut self, source: &SourceFile, qualified: &TypeLoc) {
        let TypeLocKind::Qualified { inner, .. } = &qualified.kind else {
            return;
        };
        if is_east_by_syntax(inner) {
            return;
        }

        let relocation = if spelling::needs_spelling_fallback(source, qualified) {
            spelling::resolve(source, qualified)
        } else {
            structural::resolve(source, qualified).or_else(|| {
                if !self.config.quiet {
                    debug!(
                        offset = qualified.range.start,
                        kind = inner.kind_name(),
                        "structural resolution failed, scanning spelling"
                    );
                }
                spelling::resolve(source, qualified)
            })
        };

        match relocation {
            Some(relocation) => self.record(source, &relocation),
            None => {
                if !self.config.quiet {
                    debug!(
                        offset = qualified.range.start,
                        kind = inner.kind_name(),
                        "no west qualifier to relocate"
                    );
                }
            }
        }
    }

    fn process_dangling(&mut self, source: &SourceFile, node: &TypeLoc) {
        if let Some(group) = scan_dangling(source, node.range.start) {
            let relocation = Relocation {
                group,
                insert_at: node.range.end,
            };
            self.record(source, &relocation);
        }
    }

    fn record(&mut self, source: &SourceFile, relocation: &Relocation) {
        let Some(start) = relocation.group.start() else {
            return;
        };
        if source.is_suppressed(start) {
            return;
        }
        if self.emitter.emit(source, relocation) {
            self.findings.push(Finding {
                file: source.path().display().to_string(),
                line: source.line_of(start),
                column: source.column_of(start),
                qualifiers: relocation.group.qualifiers.to_vec(),
                message: RELOCATION_MESSAGE.to_owned(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::source::ByteRange;

    fn at(kind: TypeLocKind) -> TypeLoc {
        TypeLoc::new(kind, ByteRange::new(0, 1))
    }

    #[test]
    fn test_attributed_pointer_is_east() {
        let pointer = at(TypeLocKind::Pointer {
            pointee: Box::new(at(TypeLocKind::Builtin)),
        });
        let attributed = at(TypeLocKind::Attributed {
            modified: Box::new(pointer),
        });
        assert!(is_east_by_syntax(&attributed));
        assert!(!is_east_by_syntax(&at(TypeLocKind::Builtin)));
    }

    #[test]
    fn test_only_reference_decltype_dangles() {
        assert!(has_dangling_qualifiers(&at(TypeLocKind::Decltype { is_reference: true })));
        assert!(!has_dangling_qualifiers(&at(TypeLocKind::Decltype { is_reference: false })));
        assert!(!has_dangling_qualifiers(&at(TypeLocKind::Auto)));
    }
}
