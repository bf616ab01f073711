//! Choosing which parts of a declaration to walk.

use tracing::trace;

use super::EastConstEngine;
use crate::frontend::ast::{Decl, DeclKind, TypeLocKind};
use crate::frontend::source::SourceFile;

/// True when `decl` was written by the user in the file being transformed.
pub(crate) fn is_user_written(source: &SourceFile, decl: &Decl) -> bool {
    source.is_in_main_file(decl.location)
        && !source.is_macro_location(decl.location)
        && !source.is_in_system_header()
        && !source.is_suppressed(decl.location)
}

impl EastConstEngine<'_> {
    /// Walks the type locations of one declaration.
    pub(crate) fn process_decl(&mut self, source: &SourceFile, decl: &Decl) {
        if !is_user_written(source, decl) {
            trace!(offset = decl.location, "skipping declaration outside user code");
            return;
        }
        match &decl.kind {
            DeclKind::ClassTemplateSpecialization { args } => {
                for ty in args.iter().filter_map(|arg| arg.ty.as_ref()) {
                    self.process_type_loc(source, ty);
                }
            }
            DeclKind::Function {
                is_definition: false,
            } => {
                let Some(ty) = &decl.ty else { return };
                match ty.as_function().map(|f| &f.kind) {
                    Some(TypeLocKind::FunctionProto { ret, params }) => {
                        if let Some(ret) = ret {
                            self.process_type_loc(source, ret);
                        }
                        for param in params {
                            self.process_decl(source, param);
                        }
                    }
                    _ => self.process_type_loc(source, ty),
                }
            }
            _ => {
                if let Some(ty) = &decl.ty {
                    self.process_type_loc(source, ty);
                }
            }
        }
    }
}
