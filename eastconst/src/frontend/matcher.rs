//! Declaration matching.
//!
//! A [`MatchFinder`] holds the declaration kinds a client is interested in
//! and hands every matching declaration of a translation unit to a
//! [`MatchCallback`].

use rustc_hash::FxHashSet;

use super::ast::{Decl, DeclKind, TranslationUnit};
use super::source::SourceFile;

/// A declaration kind a callback can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclInterest {
    /// Variables, excluding function parameters.
    Var,
    /// Non-static data members.
    Field,
    /// Functions, methods and lambdas.
    Function,
    /// `typedef` names.
    Typedef,
    /// `using` aliases.
    Alias,
    /// Non-type template parameters.
    NonTypeTemplateParm,
    /// Explicit and partial class-template specializations.
    ClassTemplateSpecialization,
}

impl DeclInterest {
    /// The interest `decl` falls under. Parameters have none of their own;
    /// they are reached through their function.
    #[must_use]
    pub const fn of(decl: &Decl) -> Option<Self> {
        match decl.kind {
            DeclKind::Var => Some(Self::Var),
            DeclKind::Param => None,
            DeclKind::Field => Some(Self::Field),
            DeclKind::Function { .. } => Some(Self::Function),
            DeclKind::Typedef => Some(Self::Typedef),
            DeclKind::Alias => Some(Self::Alias),
            DeclKind::NonTypeTemplateParm => Some(Self::NonTypeTemplateParm),
            DeclKind::ClassTemplateSpecialization { .. } => Some(Self::ClassTemplateSpecialization),
        }
    }
}

/// One matched declaration and the file it belongs to.
#[derive(Debug, Clone, Copy)]
pub struct MatchResult<'a> {
    /// The declaration.
    pub decl: &'a Decl,
    /// File the declaration was parsed from.
    pub source: &'a SourceFile,
    /// The interest that matched.
    pub interest: DeclInterest,
}

/// Receives matched declarations.
pub trait MatchCallback {
    /// Called once per matched declaration, in source order.
    fn run(&mut self, result: &MatchResult<'_>);
}

/// Dispatches declarations to a callback by kind.
#[derive(Debug, Default)]
pub struct MatchFinder {
    interests: FxHashSet<DeclInterest>,
}

impl MatchFinder {
    /// Creates a finder with no interests.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to `interest`.
    pub fn add_matcher(&mut self, interest: DeclInterest) {
        self.interests.insert(interest);
    }

    /// True when `interest` is subscribed.
    #[must_use]
    pub fn matches(&self, interest: DeclInterest) -> bool {
        self.interests.contains(&interest)
    }

    /// Runs `callback` over every subscribed declaration of `tu`. Returns
    /// the number of callback invocations.
    pub fn match_translation_unit(
        &self,
        source: &SourceFile,
        tu: &TranslationUnit,
        callback: &mut dyn MatchCallback,
    ) -> usize {
        let mut matched = 0;
        for decl in &tu.decls {
            let Some(interest) = DeclInterest::of(decl) else {
                continue;
            };
            if !self.matches(interest) {
                continue;
            }
            callback.run(&MatchResult {
                decl,
                source,
                interest,
            });
            matched += 1;
        }
        matched
    }
}

/// Subscribes `finder` to every declaration kind whose type may carry a
/// west qualifier.
pub fn register_east_const_matchers(finder: &mut MatchFinder) {
    for interest in [
        DeclInterest::Var,
        DeclInterest::Field,
        DeclInterest::Function,
        DeclInterest::Typedef,
        DeclInterest::Alias,
        DeclInterest::NonTypeTemplateParm,
        DeclInterest::ClassTemplateSpecialization,
    ] {
        finder.add_matcher(interest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Collect(Vec<DeclInterest>);

    impl MatchCallback for Collect {
        fn run(&mut self, result: &MatchResult<'_>) {
            self.0.push(result.interest);
        }
    }

    fn decl(kind: DeclKind) -> Decl {
        Decl {
            kind,
            name: None,
            location: 0,
            ty: None,
        }
    }

    #[test]
    fn test_parameters_are_not_matched_directly() {
        let source = SourceFile::from_text("a.cpp", "").unwrap();
        let tu = TranslationUnit {
            decls: vec![
                decl(DeclKind::Var),
                decl(DeclKind::Param),
                decl(DeclKind::Function {
                    is_definition: true,
                }),
            ],
        };
        let mut finder = MatchFinder::new();
        register_east_const_matchers(&mut finder);
        let mut seen = Collect(Vec::new());
        assert_eq!(finder.match_translation_unit(&source, &tu, &mut seen), 2);
        assert_eq!(seen.0, vec![DeclInterest::Var, DeclInterest::Function]);
    }

    #[test]
    fn test_unsubscribed_kinds_are_skipped() {
        let source = SourceFile::from_text("a.cpp", "").unwrap();
        let tu = TranslationUnit {
            decls: vec![decl(DeclKind::Typedef), decl(DeclKind::Field)],
        };
        let mut finder = MatchFinder::new();
        finder.add_matcher(DeclInterest::Field);
        let mut seen = Collect(Vec::new());
        finder.match_translation_unit(&source, &tu, &mut seen);
        assert_eq!(seen.0, vec![DeclInterest::Field]);
    }
}
