use clap::{Args, Parser};
use std::path::PathBuf;

/// Help text for configuration file options, shown at the bottom of --help.
const CONFIG_HELP: &str = "\
CONFIGURATION FILE (.eastconst.toml):
  Create this file in your project root to set defaults.

  [eastconst]
  # Preprocessing
  defines = [\"USE_FOO\", \"LEVEL=2\"]   # Same as -D
  system_paths = [\"/opt/sdk/include\"] # Never rewritten

  # Path filters
  exclude_folders = [\"generated\", \"third_party\"]
  include_folders = [\"vendor/ours\"]  # Force-include these
  extensions = [\"cpp\", \"hpp\"]        # Default: all C/C++ extensions

  # Output and CI/CD
  quiet = false
  verbose = false
  fail_on_findings = true    # Exit 1 if west qualifiers remain

SUPPRESSION:
  A line ending in `// NOLINT`, `// NOLINT(east-const)` or `// eastconst: ignore`
  is left untouched, as is the line after `// NOLINTNEXTLINE`.
";

/// Options for output formatting and verbosity.
#[derive(Args, Debug, Default, Clone)]
#[allow(clippy::struct_excessive_bools)] // CLI flags are legitimately booleans
pub struct OutputOptions {
    /// Output raw JSON.
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output for debugging (logs every resolution step).
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Quiet mode: suppress informational logging and the findings table.
    #[arg(short, long)]
    pub quiet: bool,

    /// Exit with code 1 if any west qualifier is found (or was fixed).
    #[arg(long)]
    pub fail_on_findings: bool,
}

/// Shared path arguments (mutually exclusive paths/root).
#[derive(Args, Debug, Default, Clone)]
pub struct PathArgs {
    /// Paths to rewrite (files or directories).
    /// When no paths are provided, defaults to the current directory.
    /// Cannot be used with --root.
    #[arg(conflicts_with = "root")]
    pub paths: Vec<PathBuf>,

    /// Project root to process.
    /// Use this instead of positional paths when running from a different directory.
    /// Written files must stay inside this directory.
    #[arg(long, conflicts_with = "paths")]
    pub root: Option<PathBuf>,
}

impl PathArgs {
    /// The paths to process: the root, the positional paths, or `.`.
    #[must_use]
    pub fn resolve(&self) -> Vec<PathBuf> {
        if let Some(root) = &self.root {
            vec![root.clone()]
        } else if self.paths.is_empty() {
            vec![PathBuf::from(".")]
        } else {
            self.paths.clone()
        }
    }
}

/// Command line interface configuration using `clap`.
/// This struct defines the arguments and flags accepted by the program.
#[derive(Parser, Debug)]
#[command(
    name = "eastconst",
    author,
    version,
    about = "eastconst - Move C++ const/volatile/restrict qualifiers east of the type they modify",
    long_about = None,
    after_help = CONFIG_HELP
)]
pub struct Cli {
    /// Global path options (paths vs root).
    #[command(flatten)]
    pub paths: PathArgs,

    /// Output formatting options.
    #[command(flatten)]
    pub output: OutputOptions,

    /// Rewrite files in place instead of only reporting.
    #[arg(long)]
    pub fix: bool,

    /// Define a macro for conditional compilation (`NAME` or `NAME=VALUE`).
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]")]
    pub defines: Vec<String>,

    /// Directory whose files are treated as system headers (never rewritten).
    #[arg(long = "system-path", value_name = "DIR")]
    pub system_paths: Vec<PathBuf>,

    /// Folders to exclude from processing.
    #[arg(long, alias = "exclude-folder")]
    pub exclude_folders: Vec<String>,

    /// Folders to force-include (overrides default exclusions).
    #[arg(long, alias = "include-folder")]
    pub include_folders: Vec<String>,

    /// File extensions to process, comma separated (default: all C/C++ extensions).
    #[arg(long, value_delimiter = ',')]
    pub extensions: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_current_directory() {
        let cli = Cli::try_parse_from(["eastconst"]).unwrap();
        assert_eq!(cli.paths.resolve(), vec![PathBuf::from(".")]);
        assert!(!cli.fix);
    }

    #[test]
    fn test_defines_and_extensions() {
        let cli = Cli::try_parse_from([
            "eastconst",
            "-D",
            "FOO",
            "--define",
            "LEVEL=2",
            "--extensions",
            "cpp,hpp",
            "src",
        ])
        .unwrap();
        assert_eq!(cli.defines, vec!["FOO", "LEVEL=2"]);
        assert_eq!(cli.extensions, vec!["cpp", "hpp"]);
        assert_eq!(cli.paths.resolve(), vec![PathBuf::from("src")]);
    }

    #[test]
    fn test_root_conflicts_with_paths() {
        assert!(Cli::try_parse_from(["eastconst", "--root", "a", "b"]).is_err());
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["eastconst", "--quiet", "--verbose"]).is_err());
    }
}
