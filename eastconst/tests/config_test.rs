//! Tests for `.eastconst.toml` discovery and how it shapes a run.
#![allow(clippy::unwrap_used)]

use eastconst::config::Config;
use eastconst::entry_point::run_with_args_to;
use std::fs;
use tempfile::TempDir;

fn run(args: &[&str]) -> (i32, String) {
    colored::control::set_override(false);
    let mut out = Vec::new();
    let code = run_with_args_to(args.iter().map(|&s| s.to_owned()).collect(), &mut out).unwrap();
    (code, String::from_utf8(out).unwrap())
}

#[test]
fn test_config_found_from_nested_source_file() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".eastconst.toml"),
        "[eastconst]\ndefines = [\"FEATURE\"]\nextensions = [\"cpp\"]\n",
    )
    .unwrap();
    let nested = dir.path().join("src").join("core");
    fs::create_dir_all(&nested).unwrap();
    let file = nested.join("core.cpp");
    fs::write(&file, "int x;").unwrap();

    let config = Config::load_from_path(&file);
    assert_eq!(config.eastconst.defines, Some(vec!["FEATURE".to_owned()]));
    assert_eq!(
        config.config_file_path,
        Some(dir.path().join(".eastconst.toml"))
    );
}

#[test]
fn test_config_defines_reach_the_preprocessor() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".eastconst.toml"),
        "[eastconst]\ndefines = [\"FEATURE\"]\n",
    )
    .unwrap();
    let file = dir.path().join("a.cpp");
    fs::write(&file, "#ifdef FEATURE\nconst int on = 1;\n#endif\n").unwrap();

    let (code, _) = run(&["--quiet", "--fix", dir.path().to_str().unwrap()]);
    assert_eq!(code, 0);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "#ifdef FEATURE\nint const on = 1;\n#endif\n"
    );
}

#[test]
fn test_config_extensions_filter_directory_walk() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".eastconst.toml"),
        "[eastconst]\nextensions = [\"hpp\"]\n",
    )
    .unwrap();
    fs::write(dir.path().join("a.hpp"), "const int a = 1;\n").unwrap();
    fs::write(dir.path().join("b.cpp"), "const int b = 1;\n").unwrap();

    let (_, out) = run(&["--json", dir.path().to_str().unwrap()]);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["summary"]["files_processed"], 1);
    assert!(value["files"][0]["file"].as_str().unwrap().ends_with("a.hpp"));
}

#[test]
fn test_config_exclude_folders() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".eastconst.toml"),
        "[eastconst]\nexclude_folders = [\"generated\"]\n",
    )
    .unwrap();
    fs::create_dir_all(dir.path().join("generated")).unwrap();
    fs::write(dir.path().join("generated/g.cpp"), "const int g = 1;\n").unwrap();
    fs::write(dir.path().join("main.cpp"), "int main() {}\n").unwrap();

    let (_, out) = run(&["--json", dir.path().to_str().unwrap()]);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["summary"]["files_processed"], 1);
    assert_eq!(value["summary"]["total_findings"], 0);
}

#[test]
fn test_config_fail_on_findings() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join(".eastconst.toml"),
        "[eastconst]\nfail_on_findings = true\nquiet = true\n",
    )
    .unwrap();
    fs::write(dir.path().join("a.cpp"), "const int a = 1;\n").unwrap();

    let (code, out) = run(&[dir.path().to_str().unwrap()]);
    assert_eq!(code, 1);
    // Quiet output has no header box.
    assert!(!out.contains("╔"));
}

#[test]
fn test_broken_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".eastconst.toml"), "[eastconst\n").unwrap();
    fs::write(dir.path().join("a.cpp"), "const int a = 1;\n").unwrap();

    let (code, out) = run(&["--json", dir.path().to_str().unwrap()]);
    assert_eq!(code, 0);
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["summary"]["total_findings"], 1);
}
