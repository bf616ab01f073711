//! Where a relocated qualifier goes.

use crate::frontend::source::{ByteRange, SourceFile};
use crate::frontend::tokens::TokenKind;

/// Offset right after the base type spelled in `base`.
///
/// A `>` met at angle depth zero closes a template argument list opened
/// outside the range; the qualifier goes in front of it. Angles inside
/// parentheses are expressions and are not counted. A `>>` token counts as
/// two closers.
#[must_use]
pub fn insertion_point(source: &SourceFile, base: ByteRange) -> usize {
    let mut angle_depth = 0usize;
    let mut paren_depth = 0usize;
    let window = source.tokens()[source.token_index_at(base.start)..]
        .iter()
        .take_while(|t| t.end <= base.end)
        .filter(|t| t.kind == TokenKind::Punct);
    for tok in window {
        match tok.text(source.text()) {
            "(" | "[" => paren_depth += 1,
            ")" | "]" => paren_depth = paren_depth.saturating_sub(1),
            "<" if paren_depth == 0 => angle_depth += 1,
            ">" if paren_depth == 0 => {
                if angle_depth == 0 {
                    return tok.start;
                }
                angle_depth -= 1;
            }
            ">>" if paren_depth == 0 => match angle_depth {
                0 => return tok.start,
                1 => return tok.start + 1,
                _ => angle_depth -= 2,
            },
            _ => {}
        }
    }
    base.end
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(text: &str, start: usize, end: usize) -> usize {
        let file = SourceFile::from_text("a.cpp", text).unwrap();
        insertion_point(&file, ByteRange::new(start, end))
    }

    #[test]
    fn test_plain_base() {
        assert_eq!(point("int x;", 0, 3), 3);
    }

    #[test]
    fn test_balanced_template() {
        let text = "std::vector<int> v;";
        assert_eq!(point(text, 0, 16), 16);
    }

    #[test]
    fn test_stray_closer() {
        let text = "X<int> v;";
        assert_eq!(point(text, 2, 6), 5);
    }

    #[test]
    fn test_nested_template_argument() {
        let text = "std::map<int, std::vector<int>> m;";
        let inner = text.find("std::vector").unwrap();
        assert_eq!(point(text, inner, text.find(" m").unwrap()), text.find(">>").unwrap() + 1);
    }

    #[test]
    fn test_comparison_inside_parens() {
        let text = "A<(1 > 2)> a;";
        assert_eq!(point(text, 0, 10), 10);
    }
}
