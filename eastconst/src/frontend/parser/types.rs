//! Type specifiers, declarators and template argument lists mapped onto
//! [`TypeLoc`].

use compact_str::CompactString;
use tree_sitter::Node;

use super::DeclBuilder;
use crate::engine::classify::{qualifier_of, IGNORABLE_SPECIFIERS};
use crate::frontend::ast::{Decl, DeclKind, Qualifiers, TemplateArgLoc, TypeLoc, TypeLocKind};
use crate::frontend::cst::{child_of_kind, node_range};
use crate::frontend::source::ByteRange;

const NULLABILITY: &[&str] = &["_Nonnull", "_Nullable", "_Null_unspecified", "_Nullable_result"];

const PARAMETER_KINDS: &[&str] = &[
    "parameter_declaration",
    "optional_parameter_declaration",
    "variadic_parameter_declaration",
];

/// Qualifiers and base type read off the specifier children of a node.
#[derive(Debug, Clone, Default)]
pub(super) struct DeclSpec {
    /// Unqualified base type, `None` for constructors and conversions.
    pub(super) base: Option<TypeLoc>,
    pub(super) quals: Qualifiers,
    pub(super) is_static: bool,
}

impl DeclSpec {
    /// The base with its qualifiers attached.
    ///
    /// Qualifiers on a reference-typed base are meaningless and are left off
    /// the tree; the rewriter finds them again from the text.
    pub(super) fn qualified_base(&self) -> Option<TypeLoc> {
        let base = self.base.clone()?;
        if base.is_reference_type() {
            Some(base)
        } else {
            Some(base.qualified(self.quals))
        }
    }
}

/// A declarator applied to its base type.
#[derive(Debug)]
pub(super) struct Declared {
    pub(super) name: Option<CompactString>,
    /// Start of the name, or of the declarator when unnamed.
    pub(super) location: usize,
    pub(super) ty: Option<TypeLoc>,
}

/// The node naming the entity: the last component of a qualified or
/// template name.
pub(super) fn last_name_node(node: Node<'_>) -> Node<'_> {
    match node.kind() {
        "qualified_identifier" | "template_type" | "template_function" | "template_method" => {
            node.child_by_field_name("name").map_or(node, last_name_node)
        }
        _ => node,
    }
}

fn is_declarator_kind(kind: &str) -> bool {
    kind.ends_with("declarator")
        || matches!(
            kind,
            "identifier"
                | "field_identifier"
                | "type_identifier"
                | "qualified_identifier"
                | "template_function"
                | "template_method"
                | "destructor_name"
                | "operator_name"
                | "operator_cast"
        )
}

fn first_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut cursor = node.walk();
    let found = node
        .named_children(&mut cursor)
        .find(|c| is_declarator_kind(c.kind()));
    found
}

impl DeclBuilder<'_> {
    /// Reads the `type` field and the qualifier and storage-class children of
    /// a declaration, parameter, range-for or type descriptor.
    pub(super) fn decl_spec(&self, holder: Node<'_>) -> DeclSpec {
        let mut spec = DeclSpec::default();
        let mut cursor = holder.walk();
        for child in holder.children(&mut cursor) {
            match child.kind() {
                "type_qualifier" => {
                    if let Some(q) = qualifier_of(self.text(child)) {
                        spec.quals.add(q);
                    }
                }
                "storage_class_specifier" if self.text(child) == "static" => spec.is_static = true,
                _ => {}
            }
        }
        spec.base = holder
            .child_by_field_name("type")
            .and_then(|ty| self.base_type(ty));
        spec
    }

    fn base_type(&self, node: Node<'_>) -> Option<TypeLoc> {
        let kind = match node.kind() {
            "primitive_type" if self.text(node) == "auto" => TypeLocKind::Auto,
            "primitive_type" | "sized_type_specifier" => TypeLocKind::Builtin,
            "auto" | "placeholder_type_specifier" => TypeLocKind::Auto,
            "decltype" => decltype_kind(node),
            "type_identifier" => return self.named_type(node),
            "qualified_identifier" | "template_type" => self.classify(node),
            "dependent_type" => {
                let mut cursor = node.walk();
                let named = node.named_children(&mut cursor).last()?;
                let inner = match named.kind() {
                    "type_identifier" => self.named_type(named)?,
                    _ => TypeLoc::new(self.classify(named), node_range(named)),
                };
                TypeLocKind::Elaborated {
                    named: Box::new(inner),
                }
            }
            "struct_specifier" | "class_specifier" | "union_specifier" | "enum_specifier" => {
                let (name, range) = match node.child_by_field_name("name") {
                    Some(name) => (
                        CompactString::from(self.text(last_name_node(name))),
                        node_range(name),
                    ),
                    None => (CompactString::default(), ByteRange::empty(node.start_byte())),
                };
                TypeLocKind::Elaborated {
                    named: Box::new(TypeLoc::new(TypeLocKind::Record { name }, range)),
                }
            }
            _ => return None,
        };
        Some(TypeLoc::new(kind, node_range(node)))
    }

    /// A plain identifier in type position, which may be a macro.
    fn named_type(&self, node: Node<'_>) -> Option<TypeLoc> {
        let name = self.text(node);
        let macros = self.source.macros();
        if macros.is_function_like(name) {
            let range = self
                .source
                .macro_region_at(node.start_byte())
                .unwrap_or_else(|| node_range(node));
            return Some(TypeLoc::new(TypeLocKind::MacroExpanded, range));
        }
        // A macro standing for a specifier, an attribute or nothing leaves
        // the real type to the tokens that follow, which did not parse.
        if macros.is_defined(name)
            && macros.single_word_body(name).is_none_or(|body| {
                qualifier_of(body).is_some() || IGNORABLE_SPECIFIERS.contains(&body)
            })
        {
            return None;
        }
        let kind = self.classify_name(&[CompactString::from(name)], None);
        Some(TypeLoc::new(kind, node_range(node)))
    }

    fn classify(&self, node: Node<'_>) -> TypeLocKind {
        let mut parts = Vec::new();
        let args = self.name_parts(node, &mut parts);
        self.classify_name(&parts, args)
    }

    /// Collects the components of a possibly qualified name, returning the
    /// template arguments of its last component.
    pub(super) fn name_parts(
        &self,
        node: Node<'_>,
        parts: &mut Vec<CompactString>,
    ) -> Option<Vec<TemplateArgLoc>> {
        match node.kind() {
            "qualified_identifier" => {
                if let Some(scope) = node.child_by_field_name("scope") {
                    self.name_parts(scope, parts);
                }
                node.child_by_field_name("name")
                    .and_then(|name| self.name_parts(name, parts))
            }
            "template_type" | "template_function" | "template_method" => {
                if let Some(name) = node.child_by_field_name("name") {
                    parts.push(CompactString::from(self.text(name)));
                }
                node.child_by_field_name("arguments")
                    .map(|args| self.template_args(args))
            }
            "dependent_name" => {
                let mut cursor = node.walk();
                let last = node.named_children(&mut cursor).last();
                last.and_then(|last| self.name_parts(last, parts))
            }
            _ => {
                parts.push(CompactString::from(self.text(node)));
                None
            }
        }
    }

    fn classify_name(
        &self,
        components: &[CompactString],
        args: Option<Vec<TemplateArgLoc>>,
    ) -> TypeLocKind {
        let Some(last) = components.last().cloned() else {
            return TypeLocKind::DependentName;
        };
        if components.len() > 1 {
            if self.is_template_param(&components[0]) {
                return TypeLocKind::DependentName;
            }
            return match args {
                Some(args) => TypeLocKind::TemplateSpecialization { name: last, args },
                None => TypeLocKind::Record { name: last },
            };
        }
        match args {
            Some(args) => TypeLocKind::TemplateSpecialization { name: last, args },
            None if self.is_template_param(&last) => TypeLocKind::TemplateTypeParm { name: last },
            None if self.in_class_named(&last) => TypeLocKind::InjectedClassName { name: last },
            None if self.unresolved_usings.contains(&last) => {
                TypeLocKind::UnresolvedUsing { name: last }
            }
            None if self.class_templates.contains(&last) => {
                TypeLocKind::DeducedTemplateSpecialization { name: last }
            }
            None if self.typedef_names.contains(&last) => TypeLocKind::Typedef { name: last },
            None => TypeLocKind::Record { name: last },
        }
    }

    /// Arguments of a `template_argument_list`. Only arguments the grammar
    /// reads as types carry a type location.
    pub(super) fn template_args(&self, list: Node<'_>) -> Vec<TemplateArgLoc> {
        let mut cursor = list.walk();
        let args = list
            .named_children(&mut cursor)
            .filter(|arg| arg.kind() != "comment")
            .map(|arg| TemplateArgLoc {
                ty: if arg.kind() == "type_descriptor" {
                    self.type_descriptor(arg)
                } else {
                    None
                },
                range: node_range(arg),
            })
            .collect();
        args
    }

    /// A type-id: qualifiers, a type and an optional abstract declarator.
    pub(super) fn type_descriptor(&self, node: Node<'_>) -> Option<TypeLoc> {
        if node.has_error() {
            return None;
        }
        let base = self.decl_spec(node).qualified_base();
        match node.child_by_field_name("declarator") {
            Some(declarator) => self.apply_declarator(declarator, base).ty,
            None => base,
        }
    }

    /// Builds the declared type from `current` outward in, following the
    /// declarator down to the declared name.
    pub(super) fn apply_declarator(&self, node: Node<'_>, current: Option<TypeLoc>) -> Declared {
        match node.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => {
                let ty = current.map(|pointee| self.pointer(node, pointee));
                self.apply_inner(node, node.child_by_field_name("declarator"), ty)
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                let ty = current.map(|pointee| reference(node, pointee));
                self.apply_inner(node, first_declarator(node), ty)
            }
            "array_declarator" | "abstract_array_declarator" => {
                let ty = current.map(|element| {
                    let range = ByteRange::new(element.range.start, node.end_byte());
                    TypeLoc::new(
                        TypeLocKind::Array {
                            element: Box::new(element),
                        },
                        range,
                    )
                });
                self.apply_inner(node, node.child_by_field_name("declarator"), ty)
            }
            "function_declarator" | "abstract_function_declarator" => {
                let list = node.child_by_field_name("parameters");
                let params = self.parameters(list);
                let ret = self.trailing_return(node).or(current);
                let params_start = list.map_or(node.start_byte(), |l| l.start_byte());
                let begin = ret
                    .as_ref()
                    .map_or(params_start, |r| r.range.start.min(params_start));
                let ty = TypeLoc::new(
                    TypeLocKind::FunctionProto {
                        ret: ret.map(Box::new),
                        params,
                    },
                    ByteRange::new(begin, node.end_byte()),
                );
                self.apply_inner(node, node.child_by_field_name("declarator"), Some(ty))
            }
            "parenthesized_declarator" | "abstract_parenthesized_declarator" => {
                let ty = current.map(|inner| {
                    let range = inner.range;
                    TypeLoc::new(
                        TypeLocKind::Paren {
                            inner: Box::new(inner),
                        },
                        range,
                    )
                });
                self.apply_inner(node, first_declarator(node), ty)
            }
            "attributed_declarator" | "init_declarator" => {
                let inner = node
                    .child_by_field_name("declarator")
                    .or_else(|| first_declarator(node));
                self.apply_inner(node, inner, current)
            }
            "variadic_declarator" => Declared {
                name: child_of_kind(node, "identifier").map(|id| CompactString::from(self.text(id))),
                location: node.start_byte(),
                ty: current,
            },
            "structured_binding_declarator" => Declared {
                name: None,
                location: node.start_byte(),
                ty: current,
            },
            // Conversion functions: the converted-to type is not rewritten.
            "operator_cast" => Declared {
                name: Some(CompactString::from("operator")),
                location: node.start_byte(),
                ty: None,
            },
            _ => {
                let name = last_name_node(node);
                Declared {
                    name: Some(CompactString::from(self.text(name))),
                    location: name.start_byte(),
                    ty: current,
                }
            }
        }
    }

    fn apply_inner(&self, outer: Node<'_>, inner: Option<Node<'_>>, ty: Option<TypeLoc>) -> Declared {
        match inner {
            Some(inner) => self.apply_declarator(inner, ty),
            None => Declared {
                name: None,
                location: outer.start_byte(),
                ty,
            },
        }
    }

    /// `*` with the qualifiers after it. A scope before the star makes it a
    /// pointer to member.
    fn pointer(&self, node: Node<'_>, pointee: TypeLoc) -> TypeLoc {
        let mut quals = Qualifiers::none();
        let mut attributed = false;
        let mut star: Option<Node<'_>> = None;
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "*" if star.is_none() => star = Some(child),
                "type_qualifier" | "ms_pointer_modifier" if star.is_some() => {
                    let text = self.text(child);
                    if NULLABILITY.contains(&text) {
                        attributed = true;
                    } else if let Some(q) = qualifier_of(text) {
                        quals.add(q);
                    }
                }
                _ => {}
            }
        }
        let op = star.map_or_else(|| ByteRange::empty(node.start_byte()), node_range);
        let scoped = self
            .source
            .slice(ByteRange::new(node.start_byte(), op.start))
            .contains("::");
        let range = ByteRange::new(pointee.range.start, op.end);
        let pointee = Box::new(pointee);
        let kind = if scoped {
            TypeLocKind::MemberPointer { pointee }
        } else {
            TypeLocKind::Pointer { pointee }
        };
        let mut ty = TypeLoc::new(kind, range);
        if attributed {
            ty = TypeLoc::new(
                TypeLocKind::Attributed {
                    modified: Box::new(ty),
                },
                range,
            );
        }
        ty.qualified(quals)
    }

    pub(super) fn parameters(&self, list: Option<Node<'_>>) -> Vec<Decl> {
        let Some(list) = list else {
            return Vec::new();
        };
        let mut cursor = list.walk();
        let params = list
            .named_children(&mut cursor)
            .filter(|p| PARAMETER_KINDS.contains(&p.kind()))
            .filter_map(|p| self.parameter(p, DeclKind::Param))
            .collect();
        params
    }

    /// One parameter. `(void)` declares none.
    pub(super) fn parameter(&self, node: Node<'_>, kind: DeclKind) -> Option<Decl> {
        if node.has_error() || self.text(node).trim() == "void" {
            return None;
        }
        let base = self.decl_spec(node).qualified_base()?;
        let declared = match node.child_by_field_name("declarator") {
            Some(declarator) => self.apply_declarator(declarator, Some(base)),
            None => Declared {
                name: None,
                location: node.start_byte(),
                ty: Some(base),
            },
        };
        let location = if declared.name.is_some() {
            declared.location
        } else {
            node.start_byte()
        };
        Some(Decl {
            kind,
            name: declared.name,
            location,
            ty: declared.ty,
        })
    }

    /// The type after `->` on a function or lambda declarator.
    pub(super) fn trailing_return(&self, declarator: Node<'_>) -> Option<TypeLoc> {
        let trailing = child_of_kind(declarator, "trailing_return_type")?;
        let descriptor = child_of_kind(trailing, "type_descriptor")?;
        self.type_descriptor(descriptor)
    }
}

fn decltype_kind(node: Node<'_>) -> TypeLocKind {
    let mut cursor = node.walk();
    let operand = node.named_children(&mut cursor).next();
    match operand.map(|n| n.kind()) {
        Some("auto") => TypeLocKind::Auto,
        Some("parenthesized_expression") => TypeLocKind::Decltype { is_reference: true },
        _ => TypeLocKind::Decltype {
            is_reference: false,
        },
    }
}

fn reference(node: Node<'_>, pointee: TypeLoc) -> TypeLoc {
    let mut cursor = node.walk();
    let op = node.children(&mut cursor).next();
    let op_end = op.map_or(node.start_byte(), |op| op.end_byte());
    let range = ByteRange::new(pointee.range.start, op_end);
    let pointee = Box::new(pointee);
    let kind = if op.is_some_and(|op| op.kind() == "&&") {
        TypeLocKind::RValueReference { pointee }
    } else {
        TypeLocKind::LValueReference { pointee }
    };
    TypeLoc::new(kind, range)
}
