//! Directive scan: macro table, conditional regions and macro provenance.
//!
//! Nothing is expanded. The scan only answers the questions the rewriter
//! needs: which byte regions are compiled out, which were written inside or
//! produced by a macro, and which identifiers name macros.

use compact_str::CompactString;
use rustc_hash::FxHashMap;
use tracing::debug;
use tree_sitter::Node;

use super::cst::{child_of_kind, node_text, CstParser};
use super::source::ByteRange;
use super::tokens::{Token, TokenKind};

/// Value of `__cplusplus` seen by conditionals.
const CPLUSPLUS_VERSION: &str = "201703L";

/// Nesting limit when a conditional names a macro whose body names another.
const MAX_MACRO_DEPTH: usize = 16;

/// Bodies that make an object-like macro behave like an attribute.
const ATTRIBUTE_LIKE_PREFIXES: &[&str] = &[
    "__attribute__",
    "__declspec",
    "[[",
    "alignas",
    "__forceinline",
];

/// A single `#define`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    /// True for `NAME(args)` macros.
    pub function_like: bool,
    /// Replacement list, trimmed.
    pub body: String,
}

/// Macros visible in one file.
#[derive(Debug, Clone, Default)]
pub struct MacroTable {
    defs: FxHashMap<CompactString, MacroDef>,
}

impl MacroTable {
    /// Builds a table from `NAME` or `NAME=VALUE` strings.
    #[must_use]
    pub fn with_defines(defines: &[String]) -> Self {
        let mut table = Self::default();
        table.define("__cplusplus", false, CPLUSPLUS_VERSION);
        for define in defines {
            let (name, value) = define.split_once('=').unwrap_or((define.as_str(), "1"));
            table.define(name.trim(), false, value.trim());
        }
        table
    }

    /// Adds or replaces a macro.
    pub fn define(&mut self, name: &str, function_like: bool, body: &str) {
        self.defs.insert(
            CompactString::from(name),
            MacroDef {
                function_like,
                body: body.trim().to_owned(),
            },
        );
    }

    /// Removes a macro.
    pub fn undefine(&mut self, name: &str) {
        self.defs.remove(name);
    }

    /// Looks up a macro by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MacroDef> {
        self.defs.get(name)
    }

    /// True when `name` is a defined macro.
    #[must_use]
    pub fn is_defined(&self, name: &str) -> bool {
        self.defs.contains_key(name)
    }

    /// True when `name` is a function-like macro.
    #[must_use]
    pub fn is_function_like(&self, name: &str) -> bool {
        self.get(name).is_some_and(|m| m.function_like)
    }

    /// True for object-like macros that expand to nothing or to an attribute.
    #[must_use]
    pub fn is_attribute_like(&self, name: &str) -> bool {
        self.get(name).is_some_and(|m| {
            !m.function_like
                && (m.body.is_empty()
                    || ATTRIBUTE_LIKE_PREFIXES
                        .iter()
                        .any(|prefix| m.body.starts_with(prefix)))
        })
    }

    /// Returns the body of an object-like macro that expands to one identifier.
    #[must_use]
    pub fn single_word_body(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(|m| {
            let is_word = !m.body.is_empty()
                && m
                    .body
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_');
            (!m.function_like && is_word).then_some(m.body.as_str())
        })
    }
}

/// Result of scanning one file's directives.
#[derive(Debug, Clone, Default)]
pub struct Preprocessed {
    /// Macros defined by the end of the file (plus predefined ones).
    pub macros: MacroTable,
    /// Regions removed by false conditionals, sorted.
    pub inactive: Vec<ByteRange>,
    /// Directive lines and macro invocations, sorted.
    pub macro_regions: Vec<ByteRange>,
}

#[derive(Debug, Clone, Copy)]
struct CondFrame {
    parent_active: bool,
    taken: bool,
    active: bool,
}

/// Scans `tokens` (the full token list of `source`) for directives.
///
/// `parser` is reused to evaluate `#if` and `#elif` conditions.
#[must_use]
pub fn scan(
    source: &str,
    tokens: &[Token],
    defines: &[String],
    parser: &mut CstParser,
) -> Preprocessed {
    let mut conditions = Conditions { parser };
    let mut macros = MacroTable::with_defines(defines);
    let mut stack: Vec<CondFrame> = Vec::new();
    let mut inactive = Vec::new();
    let mut macro_regions = Vec::new();
    let mut inactive_start: Option<usize> = None;

    for tok in tokens.iter().filter(|t| t.kind == TokenKind::Directive) {
        let text = directive_text(source, tok, tokens);
        let (name, rest) = split_directive(&text);
        let active = stack.last().is_none_or(|f| f.active);
        match name {
            "if" | "ifdef" | "ifndef" => {
                let value = active && conditions.holds(name, rest, &macros);
                stack.push(CondFrame {
                    parent_active: active,
                    taken: value,
                    active: value,
                });
            }
            "elif" | "elifdef" | "elifndef" => {
                if let Some(frame) = stack.last_mut() {
                    if frame.taken {
                        frame.active = false;
                    } else {
                        let value =
                            frame.parent_active && conditions.holds(&name[2..], rest, &macros);
                        frame.active = value;
                        frame.taken = value;
                    }
                }
            }
            "else" => {
                if let Some(frame) = stack.last_mut() {
                    frame.active = frame.parent_active && !frame.taken;
                    frame.taken = true;
                }
            }
            "endif" => {
                stack.pop();
            }
            "define" if active => {
                macro_regions.push(tok.range());
                if let Some((macro_name, function_like, body)) = parse_define(rest) {
                    macros.define(&macro_name, function_like, &body);
                }
            }
            "undef" if active => {
                macros.undefine(rest.trim());
            }
            "define" => macro_regions.push(tok.range()),
            _ => {}
        }

        let now_active = stack.last().is_none_or(|f| f.active);
        match (now_active, inactive_start) {
            (false, None) => inactive_start = Some(tok.end),
            (true, Some(start)) => {
                inactive.push(ByteRange::new(start, tok.start));
                inactive_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = inactive_start {
        inactive.push(ByteRange::new(start, source.len()));
    }

    collect_invocations(source, tokens, &macros, &inactive, &mut macro_regions);
    macro_regions.sort_by_key(|r| r.start);

    Preprocessed {
        macros,
        inactive,
        macro_regions,
    }
}

/// Records every use of a known macro in active code.
fn collect_invocations(
    source: &str,
    tokens: &[Token],
    macros: &MacroTable,
    inactive: &[ByteRange],
    regions: &mut Vec<ByteRange>,
) {
    let code: Vec<&Token> = tokens
        .iter()
        .filter(|t| !t.is_trivia() && !inactive.iter().any(|r| r.contains(t.start)))
        .collect();
    let mut i = 0;
    while i < code.len() {
        let tok = code[i];
        i += 1;
        if tok.kind != TokenKind::Ident {
            continue;
        }
        let Some(def) = macros.get(tok.text(source)) else {
            continue;
        };
        if !def.function_like {
            regions.push(tok.range());
            continue;
        }
        if code.get(i).is_none_or(|t| t.text(source) != "(") {
            continue;
        }
        let mut depth = 0usize;
        let mut j = i;
        while j < code.len() {
            match code[j].text(source) {
                "(" => depth += 1,
                ")" => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            j += 1;
        }
        let end = code.get(j).map_or(source.len(), |t| t.end);
        regions.push(ByteRange::new(tok.start, end));
        i = j + 1;
    }
}

/// Splits `# name rest` into the directive name and the raw remaining text.
fn split_directive(text: &str) -> (&str, &str) {
    let body = text.trim_start();
    let body = body.strip_prefix('#').unwrap_or(body).trim_start();
    let (name, rest) = leading_word(body);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return ("", "");
    }
    (name, rest)
}

/// Splits an identifier off the front of `text`.
fn leading_word(text: &str) -> (&str, &str) {
    let len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    text.split_at(len)
}

/// Directive text with comments blanked and line continuations joined.
fn directive_text(source: &str, directive: &Token, tokens: &[Token]) -> String {
    let mut out = String::with_capacity(directive.end - directive.start);
    let mut last = directive.start;
    let first = tokens.partition_point(|t| t.start <= directive.start);
    for comment in tokens[first..]
        .iter()
        .take_while(|t| t.start < directive.end)
        .filter(|t| t.kind == TokenKind::Comment)
    {
        out.push_str(&source[last..comment.start]);
        out.push(' ');
        last = comment.end.min(directive.end);
    }
    out.push_str(&source[last..directive.end]);
    out.replace("\\\r\n", " ").replace("\\\n", " ")
}

/// Parses `NAME(params) body` or `NAME body`.
///
/// A macro is function-like only when `(` directly follows the name.
fn parse_define(rest: &str) -> Option<(String, bool, String)> {
    let (name, after) = leading_word(rest.trim_start());
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    if let Some(params) = after.strip_prefix('(') {
        let close = params.find(')')?;
        let body = params[close + 1..].trim().to_owned();
        return Some((name.to_owned(), true, body));
    }
    Some((name.to_owned(), false, after.trim().to_owned()))
}

/// Evaluates `#if` style conditions by parsing them with the C++ grammar.
///
/// Identifiers that name object-like macros are replaced by their bodies,
/// everything else unknown is 0. `__has_include` and friends are unknown.
struct Conditions<'a> {
    parser: &'a mut CstParser,
}

impl Conditions<'_> {
    fn holds(&mut self, keyword: &str, rest: &str, macros: &MacroTable) -> bool {
        match keyword {
            "ifdef" => macros.is_defined(leading_word(rest.trim_start()).0),
            "ifndef" => !macros.is_defined(leading_word(rest.trim_start()).0),
            _ => self.eval_text(rest, macros, 0) != 0,
        }
    }

    fn eval_text(&mut self, expr: &str, macros: &MacroTable, depth: usize) -> i64 {
        if depth > MAX_MACRO_DEPTH || expr.trim().is_empty() {
            return 0;
        }
        let wrapped = format!("#if {expr}\n#endif\n");
        let tree = match self.parser.parse(&wrapped) {
            Ok(tree) => tree,
            Err(err) => {
                debug!(%err, condition = expr, "unparsable conditional");
                return 0;
            }
        };
        let Some(condition) = child_of_kind(tree.root(), "preproc_if")
            .and_then(|directive| directive.child_by_field_name("condition"))
        else {
            return 0;
        };
        self.eval_node(condition, &wrapped, macros, depth)
    }

    fn eval_node(&mut self, node: Node<'_>, text: &str, macros: &MacroTable, depth: usize) -> i64 {
        match node.kind() {
            "number_literal" => parse_int(node_text(node, text)).unwrap_or(0),
            "char_literal" => char_value(node_text(node, text)),
            "true" => 1,
            "identifier" => match node_text(node, text) {
                "true" => 1,
                name => match macros.get(name) {
                    Some(def) if !def.function_like => {
                        let body = def.body.clone();
                        self.eval_text(&body, macros, depth + 1)
                    }
                    _ => 0,
                },
            },
            "preproc_defined" => child_of_kind(node, "identifier")
                .map_or(0, |name| i64::from(macros.is_defined(node_text(name, text)))),
            "parenthesized_expression" => {
                let mut cursor = node.walk();
                let inner = node.named_children(&mut cursor).next();
                inner.map_or(0, |inner| self.eval_node(inner, text, macros, depth))
            }
            "unary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map_or("", |op| node_text(op, text));
                let value = node
                    .child_by_field_name("argument")
                    .map_or(0, |arg| self.eval_node(arg, text, macros, depth));
                match op {
                    "!" => i64::from(value == 0),
                    "-" => value.wrapping_neg(),
                    "~" => !value,
                    _ => value,
                }
            }
            "binary_expression" => {
                let op = node
                    .child_by_field_name("operator")
                    .map_or("", |op| node_text(op, text));
                let lhs = node
                    .child_by_field_name("left")
                    .map_or(0, |left| self.eval_node(left, text, macros, depth));
                let rhs = node
                    .child_by_field_name("right")
                    .map_or(0, |right| self.eval_node(right, text, macros, depth));
                apply_binary(op, lhs, rhs)
            }
            "conditional_expression" => {
                let branch = |field: &str| node.child_by_field_name(field);
                let cond = branch("condition").map_or(0, |c| self.eval_node(c, text, macros, depth));
                let chosen = if cond != 0 { branch("consequence") } else { branch("alternative") };
                chosen.map_or(0, |c| self.eval_node(c, text, macros, depth))
            }
            _ => 0,
        }
    }
}

fn char_value(text: &str) -> i64 {
    let inner = text
        .trim_start_matches(['u', 'U', 'L', '8'])
        .trim_matches('\'');
    match inner.as_bytes() {
        [c] => i64::from(*c),
        [b'\\', b'0'] => 0,
        [b'\\', b'n'] => 10,
        [b'\\', b't'] => 9,
        _ => 0,
    }
}

fn apply_binary(op: &str, lhs: i64, rhs: i64) -> i64 {
    match op {
        "||" => i64::from(lhs != 0 || rhs != 0),
        "&&" => i64::from(lhs != 0 && rhs != 0),
        "|" => lhs | rhs,
        "^" => lhs ^ rhs,
        "&" => lhs & rhs,
        "==" => i64::from(lhs == rhs),
        "!=" => i64::from(lhs != rhs),
        "<" => i64::from(lhs < rhs),
        ">" => i64::from(lhs > rhs),
        "<=" => i64::from(lhs <= rhs),
        ">=" => i64::from(lhs >= rhs),
        "<<" => lhs.wrapping_shl(u32::try_from(rhs).unwrap_or(0)),
        ">>" => lhs.wrapping_shr(u32::try_from(rhs).unwrap_or(0)),
        "+" => lhs.wrapping_add(rhs),
        "-" => lhs.wrapping_sub(rhs),
        "*" => lhs.wrapping_mul(rhs),
        "/" => lhs.checked_div(rhs).unwrap_or(0),
        "%" => lhs.checked_rem(rhs).unwrap_or(0),
        _ => 0,
    }
}

fn parse_int(text: &str) -> Option<i64> {
    let digits: String = text
        .trim_end_matches(['u', 'U', 'l', 'L'])
        .chars()
        .filter(|c| *c != '\'')
        .collect();
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let lower = digits.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::tokens::collect_tokens;

    fn run_with(source: &str, defines: &[String]) -> Preprocessed {
        let mut parser = CstParser::new().unwrap();
        let tree = parser.parse(source).unwrap();
        let tokens = collect_tokens(&tree, source);
        scan(source, &tokens, defines, &mut parser)
    }

    fn run(source: &str) -> Preprocessed {
        run_with(source, &[])
    }

    fn inactive_text(source: &str) -> Vec<String> {
        run(source)
            .inactive
            .iter()
            .map(|r| source[r.start..r.end].trim().to_owned())
            .collect()
    }

    #[test]
    fn test_if_zero_is_inactive() {
        let source = "#if 0\nconst int a = 1;\n#endif\nconst int b = 2;\n";
        assert_eq!(inactive_text(source), vec!["const int a = 1;"]);
    }

    #[test]
    fn test_else_branch_of_taken_if() {
        let source = "#if 1\nconst int a;\n#else\nconst int b;\n#endif\n";
        assert_eq!(inactive_text(source), vec!["const int b;"]);
    }

    #[test]
    fn test_header_guard_stays_active() {
        let source = "#ifndef FOO_H\n#define FOO_H\nconst int a;\n#endif\n";
        assert!(run(source).inactive.is_empty());
    }

    #[test]
    fn test_elif_chain() {
        let source = "#if 0\nA\n#elif 1\nB\n#else\nC\n#endif\n";
        assert_eq!(inactive_text(source), vec!["A", "C"]);
    }

    #[test]
    fn test_nested_conditionals_inside_inactive() {
        let source = "#if 0\n#if 1\nA\n#endif\nB\n#endif\nC\n";
        let pre = run(source);
        assert_eq!(pre.inactive.len(), 1);
        assert!(source[pre.inactive[0].start..pre.inactive[0].end].contains('B'));
    }

    #[test]
    fn test_expression_evaluation() {
        let source = "#define LEVEL 3\n#if defined(LEVEL) && LEVEL >= 2 && __cplusplus > 201100L\nA\n#else\nB\n#endif\n";
        assert_eq!(inactive_text(source), vec!["B"]);
    }

    #[test]
    fn test_unknown_identifier_is_zero() {
        let source = "#if SOME_FEATURE\nA\n#endif\n";
        assert_eq!(inactive_text(source), vec!["A"]);
    }

    #[test]
    fn test_user_defines() {
        let source = "#ifdef WITH_EXTRAS\nA\n#endif\n";
        let pre = run_with(source, &["WITH_EXTRAS".to_owned()]);
        assert!(pre.inactive.is_empty());
    }

    #[test]
    fn test_macro_table_and_invocations() {
        let source = "#define DECL(name) const int name = 42;\n#define EXPORT\nDECL(x)\nEXPORT int y;\n";
        let pre = run(source);
        assert!(pre.macros.is_function_like("DECL"));
        assert!(pre.macros.is_attribute_like("EXPORT"));
        let regions: Vec<&str> = pre
            .macro_regions
            .iter()
            .map(|r| &source[r.start..r.end])
            .collect();
        assert!(regions.contains(&"DECL(x)"));
        assert!(regions.contains(&"EXPORT"));
        assert!(regions.iter().any(|r| r.starts_with("#define DECL")));
    }

    #[test]
    fn test_function_like_name_without_call_is_not_invocation() {
        let source = "#define F(x) x\nint F;\n";
        let pre = run(source);
        assert_eq!(pre.macro_regions.len(), 1);
    }

    #[test]
    fn test_single_word_body() {
        let mut table = MacroTable::default();
        table.define("CONSTEXPR", false, "constexpr");
        table.define("PAIR", false, "a b");
        assert_eq!(table.single_word_body("CONSTEXPR"), Some("constexpr"));
        assert_eq!(table.single_word_body("PAIR"), None);
    }

    #[test]
    fn test_conditions_with_comments_and_continuations() {
        let source = "#if defined(A) /* off */ || \\\n    (1 + 2) * 3 == 9\nA\n#endif\n#if !1 // never\nB\n#endif\n";
        assert_eq!(inactive_text(source), vec!["B"]);
    }

    #[test]
    fn test_macro_chain_in_condition() {
        let source = "#define BASE 2\n#define LEVEL BASE\n#if LEVEL == 2 && !defined NOPE\nA\n#else\nB\n#endif\n";
        assert_eq!(inactive_text(source), vec!["B"]);
    }

    #[test]
    fn test_has_include_is_unknown() {
        let source = "#if __has_include(<optional>)\nA\n#endif\n";
        assert_eq!(inactive_text(source), vec!["A"]);
    }

    #[test]
    fn test_parse_define_forms() {
        assert_eq!(
            parse_define(" DECL(name) const int name;"),
            Some(("DECL".to_owned(), true, "const int name;".to_owned()))
        );
        assert_eq!(
            parse_define("SPACED (x) x"),
            Some(("SPACED".to_owned(), false, "(x) x".to_owned()))
        );
        assert_eq!(parse_define("1BAD"), None);
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int("0x1F"), Some(31));
        assert_eq!(parse_int("010"), Some(8));
        assert_eq!(parse_int("201703L"), Some(201_703));
        assert_eq!(parse_int("abc"), None);
    }
}
