//! Declarations read off the tree-sitter syntax tree.
//!
//! Tree-sitter gives a concrete tree for every file, errors included. This
//! layer walks it in source order, keeps just enough scope to classify type
//! names, and turns each declaration it meets into a [`Decl`] whose
//! [`TypeLoc`](super::ast::TypeLoc) carries token-exact ranges. Nodes in
//! compiled-out regions are skipped, and a declarator broken by a syntax
//! error keeps only its qualified base type.

mod types;

use compact_str::CompactString;
use rustc_hash::FxHashSet;
use tree_sitter::Node;

use self::types::{last_name_node, DeclSpec, Declared};
use super::ast::{Decl, DeclKind, TranslationUnit, TypeLoc, TypeLocKind};
use super::cst::{child_of_kind, node_text};
use super::source::{ByteRange, SourceFile};
use crate::constants::STD_CONCEPTS;

/// Collects every declaration in `source`.
#[must_use]
pub fn parse(source: &SourceFile) -> TranslationUnit {
    let mut builder = DeclBuilder::new(source);
    builder.visit(source.root());
    TranslationUnit {
        decls: builder.decls,
    }
}

/// How the declarators of a declaration node are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Site {
    /// Namespace, block, condition or friend declaration.
    Plain,
    /// Class member declaration.
    Member,
    /// `typedef`.
    Typedef,
}

#[derive(Debug, Default)]
struct Scope {
    template_params: FxHashSet<CompactString>,
    class_name: Option<CompactString>,
}

struct DeclBuilder<'s> {
    source: &'s SourceFile,
    decls: Vec<Decl>,
    scopes: Vec<Scope>,
    typedef_names: FxHashSet<CompactString>,
    class_templates: FxHashSet<CompactString>,
    concepts: FxHashSet<CompactString>,
    unresolved_usings: FxHashSet<CompactString>,
}

fn is_record_kind(kind: &str) -> bool {
    matches!(
        kind,
        "struct_specifier" | "class_specifier" | "union_specifier" | "enum_specifier"
    )
}

impl<'s> DeclBuilder<'s> {
    fn new(source: &'s SourceFile) -> Self {
        Self {
            source,
            decls: Vec::new(),
            scopes: Vec::new(),
            typedef_names: FxHashSet::default(),
            class_templates: FxHashSet::default(),
            concepts: FxHashSet::default(),
            unresolved_usings: FxHashSet::default(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        let source: &'s SourceFile = self.source;
        node_text(node, source.text())
    }

    // ----- scopes -----------------------------------------------------------

    fn is_template_param(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|s| s.template_params.contains(name))
    }

    fn in_class_named(&self, name: &str) -> bool {
        self.scopes
            .iter()
            .any(|s| s.class_name.as_deref() == Some(name))
    }

    fn add_template_param(&mut self, name: CompactString) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.template_params.insert(name);
        }
    }

    // ----- walk -------------------------------------------------------------

    fn visit(&mut self, node: Node<'_>) {
        if self.source.is_inactive(node.start_byte()) {
            return;
        }
        match node.kind() {
            "declaration" => self.visit_declaration(node, Site::Plain),
            "field_declaration" => self.visit_declaration(node, Site::Member),
            "type_definition" => self.visit_declaration(node, Site::Typedef),
            "alias_declaration" => self.visit_alias(node),
            "function_definition" => self.visit_function_definition(node),
            "template_declaration" => self.visit_template(node),
            "lambda_expression" => self.visit_lambda(node),
            "for_range_loop" => self.visit_range_for(node),
            "catch_clause" => self.visit_catch(node),
            "using_declaration" => self.visit_using(node),
            "concept_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.concepts.insert(CompactString::from(self.text(name)));
                }
            }
            kind if is_record_kind(kind) => self.visit_record(node, false),
            "comment" | "template_instantiation" | "preproc_def" | "preproc_function_def"
            | "preproc_include" | "preproc_call" => {}
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn visit_declaration(&mut self, node: Node<'_>, site: Site) {
        if let Some(ty) = node.child_by_field_name("type") {
            if is_record_kind(ty.kind()) {
                self.visit(ty);
            }
        }
        let spec = self.decl_spec(node);
        let mut cursor = node.walk();
        let declarators: Vec<Node<'_>> = node
            .children_by_field_name("declarator", &mut cursor)
            .collect();
        let mut recovered = false;
        for declarator in declarators {
            let (target, value) = if declarator.kind() == "init_declarator" {
                (
                    declarator.child_by_field_name("declarator"),
                    declarator.child_by_field_name("value"),
                )
            } else {
                (Some(declarator), None)
            };
            match target {
                Some(target) if !target.has_error() => {
                    let declared = self.apply_declarator(target, spec.qualified_base());
                    self.push_declared(declared, &spec, site);
                }
                _ if !recovered => {
                    recovered = true;
                    self.push_recovered(&spec);
                }
                _ => {}
            }
            if let Some(value) = value {
                self.visit(value);
            }
        }
        for field in ["value", "default_value"] {
            if let Some(value) = node.child_by_field_name(field) {
                self.visit(value);
            }
        }
    }

    fn push_declared(&mut self, declared: Declared, spec: &DeclSpec, site: Site) {
        let Some(ty) = declared.ty else {
            return;
        };
        let kind = match site {
            Site::Typedef => {
                if let Some(name) = &declared.name {
                    self.typedef_names.insert(name.clone());
                }
                DeclKind::Typedef
            }
            _ if ty.as_function().is_some() => DeclKind::Function {
                is_definition: false,
            },
            Site::Member if !spec.is_static => DeclKind::Field,
            _ => DeclKind::Var,
        };
        self.decls.push(Decl {
            kind,
            name: declared.name,
            location: declared.location,
            ty: Some(ty),
        });
    }

    /// Keeps the qualified base of a declaration whose declarator did not
    /// parse, so west qualifiers in front of a well-formed type still move.
    fn push_recovered(&mut self, spec: &DeclSpec) {
        if spec.quals.is_empty() {
            return;
        }
        let Some(base) = spec.qualified_base() else {
            return;
        };
        self.decls.push(Decl {
            kind: DeclKind::Var,
            name: None,
            location: base.range.start,
            ty: Some(base),
        });
    }

    fn visit_alias(&mut self, node: Node<'_>) {
        let Some(name) = node.child_by_field_name("name") else {
            return;
        };
        let ty = node
            .child_by_field_name("type")
            .and_then(|ty| self.type_descriptor(ty));
        let alias = CompactString::from(self.text(name));
        self.typedef_names.insert(alias.clone());
        if let Some(ty) = ty {
            self.decls.push(Decl {
                kind: DeclKind::Alias,
                name: Some(alias),
                location: name.start_byte(),
                ty: Some(ty),
            });
        }
    }

    fn visit_function_definition(&mut self, node: Node<'_>) {
        let spec = self.decl_spec(node);
        let declarator = node.child_by_field_name("declarator");
        match declarator {
            Some(declarator) if !declarator.has_error() => {
                let declared = self.apply_declarator(declarator, spec.qualified_base());
                if let Some(ty) = declared.ty.filter(|ty| ty.as_function().is_some()) {
                    self.decls.push(Decl {
                        kind: DeclKind::Function {
                            is_definition: true,
                        },
                        name: declared.name,
                        location: declared.location,
                        ty: Some(ty),
                    });
                }
            }
            _ => self.push_recovered(&spec),
        }
        // Member initializers and the body.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) != declarator {
                self.visit(child);
            }
        }
    }

    fn visit_template(&mut self, node: Node<'_>) {
        self.scopes.push(Scope::default());
        let params = node.child_by_field_name("parameters");
        if let Some(params) = params {
            self.template_parameters(params);
        }
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if Some(child) == params || self.source.is_inactive(child.start_byte()) {
                continue;
            }
            if is_record_kind(child.kind()) {
                self.visit_record(child, true);
            } else {
                self.visit(child);
            }
        }
        self.scopes.pop();
    }

    /// Adds type parameter names to the innermost scope and records non-type
    /// parameters as declarations.
    fn template_parameters(&mut self, list: Node<'_>) {
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            match param.kind() {
                "parameter_declaration"
                | "optional_parameter_declaration"
                | "variadic_parameter_declaration" => {
                    if let Some(name) = self.constrained_parameter(param) {
                        self.add_template_param(name);
                    } else if let Some(decl) = self.parameter(param, DeclKind::NonTypeTemplateParm)
                    {
                        self.decls.push(decl);
                    }
                }
                "type_parameter_declaration"
                | "optional_type_parameter_declaration"
                | "variadic_type_parameter_declaration"
                | "template_template_parameter_declaration" => {
                    if let Some(name) = self.type_parameter_name(param) {
                        self.add_template_param(name);
                    }
                }
                _ => {}
            }
        }
    }

    fn type_parameter_name(&self, node: Node<'_>) -> Option<CompactString> {
        if let Some(name) = node.child_by_field_name("name") {
            return Some(CompactString::from(self.text(name)));
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.named_children(&mut cursor).collect();
        children.into_iter().rev().find_map(|child| match child.kind() {
            "type_identifier" => Some(CompactString::from(self.text(child))),
            kind if kind.ends_with("type_parameter_declaration") => {
                self.type_parameter_name(child)
            }
            _ => None,
        })
    }

    /// `Concept T`: a type parameter constrained by a known concept.
    fn constrained_parameter(&self, param: Node<'_>) -> Option<CompactString> {
        let ty = param.child_by_field_name("type")?;
        let mut parts = Vec::new();
        self.name_parts(ty, &mut parts);
        let concept = parts.last()?;
        if !self.concepts.contains(concept) && !STD_CONCEPTS.contains(&concept.as_str()) {
            return None;
        }
        let declarator = param.child_by_field_name("declarator")?;
        self.apply_declarator(declarator, None).name
    }

    fn visit_record(&mut self, node: Node<'_>, templated: bool) {
        let is_enum = node.kind() == "enum_specifier";
        let body = node.child_by_field_name("body");
        let mut class_name = None;
        if let Some(name) = node.child_by_field_name("name").filter(|_| !is_enum) {
            let mut parts = Vec::new();
            let args = self.name_parts(name, &mut parts);
            if let Some(last) = parts.pop() {
                match args {
                    Some(args) if templated || body.is_some() => {
                        self.decls.push(Decl {
                            kind: DeclKind::ClassTemplateSpecialization { args },
                            name: Some(last.clone()),
                            location: last_name_node(name).start_byte(),
                            ty: None,
                        });
                    }
                    None if templated => {
                        self.class_templates.insert(last.clone());
                    }
                    _ => {}
                }
                class_name = Some(last);
            }
        }
        let Some(body) = body.filter(|_| !is_enum) else {
            return;
        };
        self.scopes.push(Scope {
            template_params: FxHashSet::default(),
            class_name,
        });
        self.visit_children(body);
        self.scopes.pop();
    }

    /// A lambda is recorded as the definition of its call operator.
    fn visit_lambda(&mut self, node: Node<'_>) {
        let template_params = child_of_kind(node, "template_parameter_list");
        if let Some(params) = template_params {
            self.scopes.push(Scope::default());
            self.template_parameters(params);
        }
        let declarator = node.child_by_field_name("declarator");
        if declarator.is_none_or(|d| !d.has_error()) {
            let (params, ret, end) = match declarator {
                Some(d) => (
                    self.parameters(d.child_by_field_name("parameters")),
                    self.trailing_return(d),
                    d.end_byte(),
                ),
                None => (
                    Vec::new(),
                    None,
                    node.child_by_field_name("captures")
                        .map_or(node.start_byte(), |c| c.end_byte()),
                ),
            };
            let ty = TypeLoc::new(
                TypeLocKind::FunctionProto {
                    ret: ret.map(Box::new),
                    params,
                },
                ByteRange::new(node.start_byte(), end),
            );
            self.decls.push(Decl {
                kind: DeclKind::Function {
                    is_definition: true,
                },
                name: None,
                location: node.start_byte(),
                ty: Some(ty),
            });
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        if template_params.is_some() {
            self.scopes.pop();
        }
    }

    fn visit_range_for(&mut self, node: Node<'_>) {
        let spec = self.decl_spec(node);
        if let Some(declarator) = node.child_by_field_name("declarator") {
            if declarator.has_error() {
                self.push_recovered(&spec);
            } else {
                let declared = self.apply_declarator(declarator, spec.qualified_base());
                self.push_declared(declared, &spec, Site::Plain);
            }
        }
        for field in ["initializer", "right", "body"] {
            if let Some(child) = node.child_by_field_name(field) {
                self.visit(child);
            }
        }
    }

    fn visit_catch(&mut self, node: Node<'_>) {
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            let decls: Vec<Decl> = params
                .named_children(&mut cursor)
                .filter(|p| p.kind() == "parameter_declaration")
                .filter_map(|p| self.parameter(p, DeclKind::Var))
                .collect();
            self.decls.extend(decls);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
    }

    /// `using typename Base::name;` names a type nothing here can resolve.
    fn visit_using(&mut self, node: Node<'_>) {
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
        if !children.iter().any(|c| c.kind() == "typename") {
            return;
        }
        if let Some(name) = children.iter().rev().find(|c| c.is_named()) {
            let last = CompactString::from(self.text(last_name_node(*name)));
            self.unresolved_usings.insert(last);
        }
    }
}
