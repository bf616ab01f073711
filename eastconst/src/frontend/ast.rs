//! Declarations and source-annotated type locations.
//!
//! `TypeLoc` mirrors how a compiler front end annotates types with source
//! positions: every structural category is one variant, and
//! [`TypeLoc::next`] yields the immediately nested location so a walker can
//! follow a declarator from the outside in.

use compact_str::CompactString;

use super::source::ByteRange;
use crate::engine::classify::Qualifier;

/// A set of cv/restrict qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers(u8);

impl Qualifiers {
    const CONST: u8 = 1;
    const VOLATILE: u8 = 2;
    const RESTRICT: u8 = 4;

    /// The empty set.
    #[must_use]
    pub const fn none() -> Self {
        Self(0)
    }

    const fn bit(q: Qualifier) -> u8 {
        match q {
            Qualifier::Const => Self::CONST,
            Qualifier::Volatile => Self::VOLATILE,
            Qualifier::Restrict => Self::RESTRICT,
        }
    }

    /// Adds `q`.
    pub fn add(&mut self, q: Qualifier) {
        self.0 |= Self::bit(q);
    }

    /// Removes `q`.
    pub fn remove(&mut self, q: Qualifier) {
        self.0 &= !Self::bit(q);
    }

    /// True when `q` is present.
    #[must_use]
    pub const fn has(self, q: Qualifier) -> bool {
        self.0 & Self::bit(q) != 0
    }

    /// True when no qualifier is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Qualifier> for Qualifiers {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        let mut quals = Self::none();
        for q in iter {
            quals.add(q);
        }
        quals
    }
}

/// One template argument as written.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateArgLoc {
    /// The argument's own type location, when it is a type.
    pub ty: Option<TypeLoc>,
    /// Source range of the argument.
    pub range: ByteRange,
}

/// Structural category of a type location.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeLocKind {
    /// cv/restrict applied to `inner`. Shares the range of `inner`.
    Qualified {
        /// Qualifiers local to this node.
        quals: Qualifiers,
        /// The unqualified type.
        inner: Box<TypeLoc>,
    },
    /// `int`, `unsigned long`, `void`, ...
    Builtin,
    /// A class, struct, union or enum name (possibly scope-qualified).
    Record {
        /// Spelled name.
        name: CompactString,
    },
    /// A name introduced by `typedef` or `using` in this file.
    Typedef {
        /// Spelled name.
        name: CompactString,
    },
    /// `struct X`, `enum E`, `typename T::type`.
    Elaborated {
        /// The type after the keyword.
        named: Box<TypeLoc>,
    },
    /// `name<args...>`.
    TemplateSpecialization {
        /// Spelled template name.
        name: CompactString,
        /// Arguments as written.
        args: Vec<TemplateArgLoc>,
    },
    /// `auto` or `decltype(auto)`.
    Auto,
    /// A class template name used without arguments (deduced).
    DeducedTemplateSpecialization {
        /// Spelled template name.
        name: CompactString,
    },
    /// `decltype(expr)`.
    Decltype {
        /// Whether the denoted type is a reference.
        is_reference: bool,
    },
    /// A template type parameter of an enclosing template.
    TemplateTypeParm {
        /// Parameter name.
        name: CompactString,
    },
    /// The class's own name used inside its body.
    InjectedClassName {
        /// Class name.
        name: CompactString,
    },
    /// A name introduced by `using typename Base::name;`.
    UnresolvedUsing {
        /// Spelled name.
        name: CompactString,
    },
    /// A dependent member such as `T::value_type` not prefixed by `typename`.
    DependentName,
    /// A type produced by a function-like macro invocation.
    MacroExpanded,
    /// `T*`.
    Pointer {
        /// Pointee.
        pointee: Box<TypeLoc>,
    },
    /// `T&`.
    LValueReference {
        /// Referenced type.
        pointee: Box<TypeLoc>,
    },
    /// `T&&`.
    RValueReference {
        /// Referenced type.
        pointee: Box<TypeLoc>,
    },
    /// `T C::*`.
    MemberPointer {
        /// Member type.
        pointee: Box<TypeLoc>,
    },
    /// `( ... )` in a declarator.
    Paren {
        /// Enclosed type.
        inner: Box<TypeLoc>,
    },
    /// `T[N]`.
    Array {
        /// Element type.
        element: Box<TypeLoc>,
    },
    /// A function type with its parameters.
    FunctionProto {
        /// Return type (the trailing one when present).
        ret: Option<Box<TypeLoc>>,
        /// Parameter declarations.
        params: Vec<Decl>,
    },
    /// A type with an attribute attached.
    Attributed {
        /// Type the attribute modifies.
        modified: Box<TypeLoc>,
    },
}

/// A type as written in the source, with its token-exact range.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeLoc {
    /// Structural category.
    pub kind: TypeLocKind,
    /// From the first token's start to the last token's end.
    pub range: ByteRange,
}

impl TypeLoc {
    /// Creates a type location.
    #[must_use]
    pub const fn new(kind: TypeLocKind, range: ByteRange) -> Self {
        Self { kind, range }
    }

    /// Wraps `self` in `quals`, or returns it unchanged when `quals` is empty.
    #[must_use]
    pub fn qualified(self, quals: Qualifiers) -> Self {
        if quals.is_empty() {
            return self;
        }
        let range = self.range;
        Self::new(
            TypeLocKind::Qualified {
                quals,
                inner: Box::new(self),
            },
            range,
        )
    }

    /// The immediately nested type location, if any.
    #[must_use]
    pub fn next(&self) -> Option<&Self> {
        match &self.kind {
            TypeLocKind::Qualified { inner, .. } | TypeLocKind::Paren { inner } => Some(inner),
            TypeLocKind::Elaborated { named } => Some(named),
            TypeLocKind::Pointer { pointee }
            | TypeLocKind::LValueReference { pointee }
            | TypeLocKind::RValueReference { pointee }
            | TypeLocKind::MemberPointer { pointee } => Some(pointee),
            TypeLocKind::Array { element } => Some(element),
            TypeLocKind::FunctionProto { ret, .. } => ret.as_deref(),
            TypeLocKind::Attributed { modified } => Some(modified),
            _ => None,
        }
    }

    /// Iterates over this location and every nested one along the chain.
    pub fn chain(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |tl| tl.next())
    }

    /// The location with local qualifiers stripped.
    #[must_use]
    pub fn unqualified(&self) -> &Self {
        match &self.kind {
            TypeLocKind::Qualified { inner, .. } => inner.unqualified(),
            _ => self,
        }
    }

    /// The function prototype behind any parentheses.
    #[must_use]
    pub fn as_function(&self) -> Option<&Self> {
        match &self.kind {
            TypeLocKind::FunctionProto { .. } => Some(self),
            TypeLocKind::Paren { inner } | TypeLocKind::Attributed { modified: inner } => {
                inner.as_function()
            }
            _ => None,
        }
    }

    /// True when the denoted type is a reference type.
    #[must_use]
    pub const fn is_reference_type(&self) -> bool {
        match &self.kind {
            TypeLocKind::LValueReference { .. } | TypeLocKind::RValueReference { .. } => true,
            TypeLocKind::Decltype { is_reference } => *is_reference,
            _ => false,
        }
    }

    /// True for pointer, reference, member-pointer, function, paren and array
    /// locations, whose qualifiers are already east by declarator syntax.
    #[must_use]
    pub const fn is_declarator(&self) -> bool {
        matches!(
            self.kind,
            TypeLocKind::Pointer { .. }
                | TypeLocKind::LValueReference { .. }
                | TypeLocKind::RValueReference { .. }
                | TypeLocKind::MemberPointer { .. }
                | TypeLocKind::FunctionProto { .. }
                | TypeLocKind::Paren { .. }
                | TypeLocKind::Array { .. }
        )
    }

    /// Short name of the variant, for logs.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self.kind {
            TypeLocKind::Qualified { .. } => "Qualified",
            TypeLocKind::Builtin => "Builtin",
            TypeLocKind::Record { .. } => "Record",
            TypeLocKind::Typedef { .. } => "Typedef",
            TypeLocKind::Elaborated { .. } => "Elaborated",
            TypeLocKind::TemplateSpecialization { .. } => "TemplateSpecialization",
            TypeLocKind::Auto => "Auto",
            TypeLocKind::DeducedTemplateSpecialization { .. } => "DeducedTemplateSpecialization",
            TypeLocKind::Decltype { .. } => "Decltype",
            TypeLocKind::TemplateTypeParm { .. } => "TemplateTypeParm",
            TypeLocKind::InjectedClassName { .. } => "InjectedClassName",
            TypeLocKind::UnresolvedUsing { .. } => "UnresolvedUsing",
            TypeLocKind::DependentName => "DependentName",
            TypeLocKind::MacroExpanded => "MacroExpanded",
            TypeLocKind::Pointer { .. } => "Pointer",
            TypeLocKind::LValueReference { .. } => "LValueReference",
            TypeLocKind::RValueReference { .. } => "RValueReference",
            TypeLocKind::MemberPointer { .. } => "MemberPointer",
            TypeLocKind::Paren { .. } => "Paren",
            TypeLocKind::Array { .. } => "Array",
            TypeLocKind::FunctionProto { .. } => "FunctionProto",
            TypeLocKind::Attributed { .. } => "Attributed",
        }
    }
}

/// What kind of entity a declaration introduces.
#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Variable (namespace, local, static member, structured binding, catch
    /// parameter).
    Var,
    /// Function parameter.
    Param,
    /// Non-static data member.
    Field,
    /// Function, method, constructor, operator or lambda call operator.
    Function {
        /// True when a body follows.
        is_definition: bool,
    },
    /// `typedef`.
    Typedef,
    /// `using X = ...;`.
    Alias,
    /// `template <int N>` parameter.
    NonTypeTemplateParm,
    /// Explicit or partial class-template specialization.
    ClassTemplateSpecialization {
        /// Template arguments as written.
        args: Vec<TemplateArgLoc>,
    },
}

/// One declared entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Decl {
    /// Entity kind.
    pub kind: DeclKind,
    /// Declared name, when it has one.
    pub name: Option<CompactString>,
    /// Location of the name, or of the declarator when unnamed.
    pub location: usize,
    /// Declared type, when the entity has one.
    pub ty: Option<TypeLoc>,
}

impl Decl {
    /// Parameters of a function declaration.
    #[must_use]
    pub fn params(&self) -> &[Self] {
        match self.ty.as_ref().and_then(TypeLoc::as_function) {
            Some(TypeLoc {
                kind: TypeLocKind::FunctionProto { params, .. },
                ..
            }) => params,
            _ => &[],
        }
    }
}

/// All declarations found in one file, in source order.
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    /// Top-level and nested declarations, flattened.
    pub decls: Vec<Decl>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(start: usize, end: usize) -> TypeLoc {
        TypeLoc::new(TypeLocKind::Builtin, ByteRange::new(start, end))
    }

    #[test]
    fn test_qualified_shares_inner_range() {
        let quals: Qualifiers = [Qualifier::Const].into_iter().collect();
        let tl = leaf(6, 9).qualified(quals);
        assert_eq!(tl.range, ByteRange::new(6, 9));
        assert_eq!(tl.unqualified().kind_name(), "Builtin");
    }

    #[test]
    fn test_empty_qualifiers_do_not_wrap() {
        let tl = leaf(0, 3).qualified(Qualifiers::none());
        assert_eq!(tl.kind_name(), "Builtin");
    }

    #[test]
    fn test_chain_walks_pointee() {
        let quals: Qualifiers = [Qualifier::Const].into_iter().collect();
        let pointer = TypeLoc::new(
            TypeLocKind::Pointer {
                pointee: Box::new(leaf(6, 10).qualified(quals)),
            },
            ByteRange::new(6, 11),
        );
        let kinds: Vec<&str> = pointer.chain().map(TypeLoc::kind_name).collect();
        assert_eq!(kinds, vec!["Pointer", "Qualified", "Builtin"]);
    }

    #[test]
    fn test_reference_decltype() {
        let tl = TypeLoc::new(
            TypeLocKind::Decltype { is_reference: true },
            ByteRange::new(0, 18),
        );
        assert!(tl.is_reference_type());
        assert!(!tl.is_declarator());
    }

    #[test]
    fn test_qualifier_set_operations() {
        let mut quals: Qualifiers = [Qualifier::Const, Qualifier::Volatile].into_iter().collect();
        assert!(quals.has(Qualifier::Volatile));
        quals.remove(Qualifier::Volatile);
        assert!(!quals.has(Qualifier::Volatile));
        assert!(quals.has(Qualifier::Const));
        assert!(!quals.has(Qualifier::Restrict));
    }
}
