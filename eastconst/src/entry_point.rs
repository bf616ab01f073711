use crate::cli::Cli;
use crate::commands::{run_rewrite, RewriteOptions, RewriteReport};
use crate::config::Config;
use crate::engine::EngineConfig;
use crate::frontend::source::SourceOptions;
use crate::output;
use crate::utils::collect_cpp_files;
use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings after merging `.eastconst.toml` with command-line flags.
#[derive(Debug, Clone, Default)]
#[allow(clippy::struct_excessive_bools)]
struct Settings {
    quiet: bool,
    verbose: bool,
    fail_on_findings: bool,
    exclude_folders: Vec<String>,
    include_folders: Vec<String>,
    extensions: Vec<String>,
    source_options: SourceOptions,
}

impl Settings {
    fn merge(cli: &Cli, config: &Config) -> Self {
        let file = &config.eastconst;

        let mut exclude_folders = file.exclude_folders.clone().unwrap_or_default();
        exclude_folders.extend(cli.exclude_folders.iter().cloned());
        let mut include_folders = file.include_folders.clone().unwrap_or_default();
        include_folders.extend(cli.include_folders.iter().cloned());

        let extensions = if cli.extensions.is_empty() {
            file.extensions_or_default()
        } else {
            cli.extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_owned())
                .collect()
        };

        let mut source_options = file.source_options();
        source_options.defines.extend(cli.defines.iter().cloned());
        source_options
            .system_paths
            .extend(cli.system_paths.iter().cloned());

        // --quiet and --verbose on the command line win over the file.
        let (quiet, verbose) = if cli.output.quiet || cli.output.verbose {
            (cli.output.quiet, cli.output.verbose)
        } else {
            let quiet = file.quiet.unwrap_or(false);
            (quiet, !quiet && file.verbose.unwrap_or(false))
        };

        Self {
            quiet,
            verbose,
            fail_on_findings: cli.output.fail_on_findings || file.fail_on_findings.unwrap_or(false),
            exclude_folders,
            include_folders,
            extensions,
            source_options,
        }
    }
}

/// Installs the stderr `tracing` subscriber. `RUST_LOG` overrides the level.
fn init_tracing(quiet: bool, verbose: bool) {
    let level = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn,eastconst::commands=info"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // A subscriber may already be installed when running in-process (tests, embedding).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Expands the requested paths into the list of files to process.
///
/// Explicit files are always kept; directories are walked.
fn collect_files(paths: &[PathBuf], settings: &Settings) -> (Vec<PathBuf>, usize) {
    let mut files = Vec::new();
    let mut dir_count = 0;
    for path in paths {
        if path.is_dir() {
            let (found, dirs) = collect_cpp_files(
                path,
                &settings.exclude_folders,
                &settings.include_folders,
                &settings.extensions,
                settings.verbose,
            );
            files.extend(found);
            dir_count += dirs;
        } else {
            files.push(path.clone());
        }
    }
    files.sort();
    files.dedup();
    (files, dir_count)
}

/// Number of findings that are still in the tree after this run.
fn remaining_findings(report: &RewriteReport) -> usize {
    report
        .files
        .iter()
        .filter(|f| !f.fixed)
        .map(|f| f.findings.len())
        .sum()
}

/// Run eastconst with the given arguments.
///
/// # Errors
///
/// Returns an error if writing the report fails.
pub fn run_with_args(args: Vec<String>) -> Result<i32> {
    run_with_args_to(args, &mut std::io::stdout())
}

/// Run eastconst with the given arguments, writing output to the specified writer.
///
/// This is the testable version of `run_with_args` that allows output capture.
///
/// # Errors
///
/// Returns an error if writing the report fails.
pub fn run_with_args_to<W: std::io::Write>(args: Vec<String>, writer: &mut W) -> Result<i32> {
    let mut program_args = vec!["eastconst".to_owned()];
    program_args.extend(args);
    let cli = match Cli::try_parse_from(program_args) {
        Ok(c) => c,
        Err(e) => match e.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                write!(writer, "{e}")?;
                writer.flush()?;
                return Ok(0);
            }
            _ => {
                eprint!("{e}");
                return Ok(1);
            }
        },
    };

    let paths = cli.paths.resolve();
    let config_path = paths.first().map_or(Path::new("."), PathBuf::as_path);
    let config = Config::load_from_path(config_path);
    let settings = Settings::merge(&cli, &config);

    init_tracing(settings.quiet, settings.verbose);

    for path in &paths {
        if !path.exists() {
            eprintln!(
                "Error: The file or directory '{}' does not exist.",
                path.display()
            );
            return Ok(1);
        }
    }

    let json = cli.output.json;
    if settings.verbose && !json {
        eprintln!("[VERBOSE] eastconst v{}", env!("CARGO_PKG_VERSION"));
        eprintln!("[VERBOSE] Using {} threads", rayon::current_num_threads());
        if let Some(path) = &config.config_file_path {
            eprintln!("[VERBOSE] Config: {}", path.display());
        }
        output::print_exclusion_list(&mut std::io::stderr(), &settings.exclude_folders)?;
        eprintln!();
    }

    let (files, dir_count) = collect_files(&paths, &settings);
    debug!(files = files.len(), dirs = dir_count, "collected sources");

    let options = RewriteOptions {
        fix: cli.fix,
        source_options: settings.source_options.clone(),
        engine: EngineConfig {
            quiet: settings.quiet,
        },
        root: cli.paths.root.clone(),
    };

    let progress = (!json && !settings.quiet && !files.is_empty())
        .then(|| output::create_progress_bar(files.len() as u64));
    let report = run_rewrite(&files, &options, progress.as_ref());
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    } else if settings.quiet {
        output::print_report_quiet(writer, &report)?;
    } else {
        output::print_report(writer, &report)?;
    }

    if !report.errors.is_empty() {
        return Ok(1);
    }
    if settings.fail_on_findings && remaining_findings(&report) > 0 {
        return Ok(1);
    }
    Ok(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn run(args: &[&str]) -> (i32, String) {
        colored::control::set_override(false);
        let mut out = Vec::new();
        let code = run_with_args_to(args.iter().map(|&s| s.to_owned()).collect(), &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_help_exits_zero() {
        let (code, out) = run(&["--help"]);
        assert_eq!(code, 0);
        assert!(out.contains("--fix"));
    }

    #[test]
    fn test_unknown_flag_exits_one() {
        let (code, _) = run(&["--no-such-flag"]);
        assert_eq!(code, 1);
    }

    #[test]
    fn test_missing_path_exits_one() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let (code, _) = run(&[missing.to_str().unwrap()]);
        assert_eq!(code, 1);
    }

    #[test]
    fn test_fail_on_findings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.cpp");
        std::fs::write(&path, "const int x = 1;\n").unwrap();
        let file = path.to_str().unwrap();

        let (code, _) = run(&["--quiet", file]);
        assert_eq!(code, 0);
        let (code, out) = run(&["--quiet", "--fail-on-findings", file]);
        assert_eq!(code, 1);
        assert!(out.contains(":1:1: move qualifier east of the declarator [const]"));
    }

    #[test]
    fn test_fix_clears_remaining_findings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.cpp");
        std::fs::write(&path, "const int x = 1;\n").unwrap();

        let (code, _) = run(&["--quiet", "--fix", "--fail-on-findings", path.to_str().unwrap()]);
        assert_eq!(code, 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "int const x = 1;\n");
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("a.hpp"), "const char* name();\n").unwrap();

        let (code, out) = run(&["--json", dir.path().to_str().unwrap()]);
        assert_eq!(code, 0);
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["summary"]["total_findings"], 1);
        assert_eq!(value["files"][0]["findings"][0]["qualifiers"][0], "const");
    }
}
