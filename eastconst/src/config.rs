use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::constants::{CONFIG_FILENAME, DEFAULT_EXTENSIONS};
use crate::frontend::source::SourceOptions;

#[derive(Debug, Deserialize, Default, Clone)]
/// Top-level configuration struct.
pub struct Config {
    #[serde(default)]
    /// The main configuration section for eastconst.
    pub eastconst: EastConstConfig,
    /// The path to the configuration file this was loaded from.
    /// Set during `load_from_path`, `None` if using defaults or programmatic config.
    #[serde(skip)]
    pub config_file_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
/// Configuration options for eastconst.
pub struct EastConstConfig {
    /// List of folders to exclude.
    pub exclude_folders: Option<Vec<String>>,
    /// List of folders to include even when excluded by default.
    pub include_folders: Option<Vec<String>>,
    /// File extensions to process, without the leading dot.
    pub extensions: Option<Vec<String>>,
    /// Macro definitions, `NAME` or `NAME=VALUE`.
    pub defines: Option<Vec<String>>,
    /// Directories whose files count as system headers and are never rewritten.
    pub system_paths: Option<Vec<PathBuf>>,
    /// Exit with code 1 when west qualifiers remain.
    pub fail_on_findings: Option<bool>,
    /// Suppress informational logging.
    pub quiet: Option<bool>,
    /// Enable debug logging.
    pub verbose: Option<bool>,
}

impl EastConstConfig {
    /// Extensions to process: the configured list or the defaults.
    #[must_use]
    pub fn extensions_or_default(&self) -> Vec<String> {
        self.extensions.clone().unwrap_or_else(|| {
            DEFAULT_EXTENSIONS.iter().map(|&s| s.to_owned()).collect()
        })
    }

    /// Preprocessing options derived from `defines` and `system_paths`.
    #[must_use]
    pub fn source_options(&self) -> SourceOptions {
        SourceOptions {
            defines: self.defines.clone().unwrap_or_default(),
            system_paths: self.system_paths.clone().unwrap_or_default(),
        }
    }
}

impl Config {
    /// Loads configuration from the current directory or its ancestors.
    #[must_use]
    pub fn load() -> Self {
        Self::load_from_path(Path::new("."))
    }

    /// Loads configuration starting from a specific path and traversing up.
    ///
    /// A file that cannot be read or parsed is reported and defaults are used.
    #[must_use]
    pub fn load_from_path(path: &Path) -> Self {
        let mut current = path.to_path_buf();
        if current.is_file() {
            current.pop();
        }

        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return match Self::read(&candidate) {
                    Ok(config) => config,
                    Err(e) => {
                        warn!("Ignoring {}: {e}", candidate.display());
                        Config::default()
                    }
                };
            }
            if !current.pop() {
                break;
            }
        }

        Config::default()
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let mut config = toml::from_str::<Config>(&content)?;
        config.config_file_path = Some(path.to_path_buf());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_load_from_path_no_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from_path(dir.path());
        assert!(config.eastconst.defines.is_none());
        assert!(config.config_file_path.is_none());
        assert_eq!(config.eastconst.extensions_or_default().len(), DEFAULT_EXTENSIONS.len());
    }

    #[test]
    fn test_load_from_path_eastconst_toml() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[eastconst]
defines = ["USE_FOO", "LEVEL=2"]
extensions = ["cpp", "h"]
fail_on_findings = true
"#
        )
        .unwrap();

        let config = Config::load_from_path(dir.path());
        assert_eq!(
            config.eastconst.defines,
            Some(vec!["USE_FOO".to_owned(), "LEVEL=2".to_owned()])
        );
        assert_eq!(config.eastconst.extensions_or_default(), vec!["cpp", "h"]);
        assert_eq!(config.eastconst.fail_on_findings, Some(true));
        assert_eq!(
            config.config_file_path,
            Some(dir.path().join(CONFIG_FILENAME))
        );
    }

    #[test]
    fn test_load_from_path_traverses_up() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("src").join("lib");
        std::fs::create_dir_all(&nested).unwrap();

        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[eastconst]
system_paths = ["/opt/sdk/include"]
"#
        )
        .unwrap();

        let config = Config::load_from_path(&nested);
        let options = config.eastconst.source_options();
        assert_eq!(options.system_paths, vec![PathBuf::from("/opt/sdk/include")]);
    }

    #[test]
    fn test_load_from_file_path() {
        let dir = TempDir::new().unwrap();
        let mut file = std::fs::File::create(dir.path().join(CONFIG_FILENAME)).unwrap();
        writeln!(
            file,
            r#"[eastconst]
exclude_folders = ["generated"]
"#
        )
        .unwrap();

        let source = dir.path().join("widget.cpp");
        std::fs::write(&source, "const int x = 1;").unwrap();

        let config = Config::load_from_path(&source);
        assert_eq!(
            config.eastconst.exclude_folders,
            Some(vec!["generated".to_owned()])
        );
    }

    #[test]
    fn test_invalid_config_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "[eastconst]\nquiet = \"loud\"\n",
        )
        .unwrap();

        let config = Config::load_from_path(dir.path());
        assert!(config.eastconst.quiet.is_none());
        assert!(config.config_file_path.is_none());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let parsed = toml::from_str::<Config>("[eastconst]\nconfidence = 60\n");
        assert!(parsed.is_err());
    }
}
