use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Name of the per-project configuration file.
pub const CONFIG_FILENAME: &str = ".eastconst.toml";

/// How far back, in bytes, a qualifier scan may look from its anchor.
pub const MAX_QUALIFIER_LOOKBEHIND: usize = 2048;

/// Bytes of spelling inspected after a qualified type's start when deciding
/// whether its structure can be trusted.
pub const SPELLING_LOOKAHEAD: usize = 96;

/// Depth limit when unwrapping sugar around an unqualified type.
pub const MAX_UNWRAP_STEPS: usize = 32;

/// File extensions treated as C or C++ sources and headers.
pub const DEFAULT_EXTENSIONS: &[&str] = &[
    "c", "cc", "cpp", "cxx", "c++", "h", "hh", "hpp", "hxx", "h++", "ipp", "tpp", "inl",
];

/// Standard-library concepts recognised in constrained template parameters.
pub const STD_CONCEPTS: &[&str] = &[
    "same_as",
    "derived_from",
    "convertible_to",
    "common_reference_with",
    "common_with",
    "integral",
    "signed_integral",
    "unsigned_integral",
    "floating_point",
    "assignable_from",
    "swappable",
    "destructible",
    "constructible_from",
    "default_initializable",
    "move_constructible",
    "copy_constructible",
    "equality_comparable",
    "totally_ordered",
    "movable",
    "copyable",
    "semiregular",
    "regular",
    "invocable",
    "regular_invocable",
    "predicate",
    "relation",
    "input_iterator",
    "forward_iterator",
    "random_access_iterator",
    "range",
];

/// Regex for suppression comments.
///
/// Matches `NOLINT`, `NOLINTNEXTLINE` (group `next`), an optional check list
/// in parentheses (group `checks`) and `eastconst: ignore`.
///
/// # Panics
///
/// Panics if the regex pattern is invalid.
pub fn get_suppression_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::expect_used)]
    RE.get_or_init(|| {
        Regex::new(r"NOLINT(?P<next>NEXTLINE)?(?:\((?P<checks>[^)]*)\))?|(?i:eastconst:\s*ignore)")
            .expect("Invalid suppression regex pattern")
    })
}

/// Set of folders to exclude by default.
pub fn get_default_exclude_folders() -> &'static FxHashSet<&'static str> {
    static SET: OnceLock<FxHashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| {
        let mut s = FxHashSet::default();
        s.insert(".git");
        s.insert(".cache");
        s.insert("build");
        s.insert("out");
        s.insert("target");
        s.insert("node_modules");
        s.insert("third_party");
        s.insert("cmake-build-debug");
        s.insert("cmake-build-release");
        s.insert("CMakeFiles");
        s
    })
}

pub use get_default_exclude_folders as DEFAULT_EXCLUDE_FOLDERS;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_groups() {
        let re = get_suppression_re();
        let caps = re.captures("// NOLINTNEXTLINE(east-const)").unwrap();
        assert!(caps.name("next").is_some());
        assert_eq!(caps.name("checks").map(|m| m.as_str()), Some("east-const"));

        let caps = re.captures("// NOLINT").unwrap();
        assert!(caps.name("next").is_none());
        assert!(caps.name("checks").is_none());

        assert!(re.is_match("/* eastconst: ignore */"));
        assert!(!re.is_match("// nothing to see"));
    }
}
