//! The rewrite command: run the engine over a set of files and report or
//! apply the result.

use std::fs;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::engine::{rewrite_source, EngineConfig, Finding};
use crate::fix::RewriteError;
use crate::frontend::source::SourceOptions;
use crate::utils::{normalize_display_path, validate_path_within_root};

/// Options for one rewrite run.
#[derive(Debug, Clone, Default)]
pub struct RewriteOptions {
    /// Write rewritten files back instead of only reporting.
    pub fix: bool,
    /// Preprocessing options shared by every file.
    pub source_options: SourceOptions,
    /// Engine settings shared by every file.
    pub engine: EngineConfig,
    /// When set, files outside this directory are never written.
    pub root: Option<PathBuf>,
}

/// Per-file failure. Other files are still processed.
#[derive(Debug, Error)]
pub enum FileError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// File path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The file could not be parsed or its edits could not be applied.
    #[error("failed to rewrite {path}: {source}")]
    Rewrite {
        /// File path.
        path: String,
        /// Underlying error.
        source: RewriteError,
    },
    /// The file lies outside the configured root.
    #[error("refusing to write {path}: {reason}")]
    OutsideRoot {
        /// File path.
        path: String,
        /// Why the path was rejected.
        reason: String,
    },
}

/// Result for one file.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    /// Display path of the file.
    pub file: String,
    /// Relocations found (and applied, in fix mode).
    pub findings: Vec<Finding>,
    /// True when the file was written back.
    pub fixed: bool,
    #[serde(skip)]
    path: PathBuf,
    #[serde(skip)]
    rewritten: Option<String>,
}

/// Totals for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteSummary {
    /// Files read and parsed.
    pub files_processed: usize,
    /// Files with at least one finding.
    pub files_with_findings: usize,
    /// Files written back.
    pub files_fixed: usize,
    /// Total relocations.
    pub total_findings: usize,
    /// Files that failed.
    pub errors: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RewriteReport {
    /// Files with findings, sorted by path.
    pub files: Vec<FileReport>,
    /// One message per failed file.
    pub errors: Vec<String>,
    /// Totals.
    pub summary: RewriteSummary,
}

impl RewriteReport {
    /// True when any relocation was found.
    #[must_use]
    pub fn has_findings(&self) -> bool {
        self.summary.total_findings > 0
    }

    /// All findings across files.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.files.iter().flat_map(|f| f.findings.iter())
    }
}

/// Runs the engine over one file without writing anything.
///
/// # Errors
///
/// Returns a [`FileError`] when the file cannot be read or its edits cannot
/// be applied.
pub fn process_file(path: &Path, options: &RewriteOptions) -> Result<FileReport, FileError> {
    let shown = normalize_display_path(path);
    let text = fs::read_to_string(path).map_err(|source| FileError::Read {
        path: shown.clone(),
        source,
    })?;
    let outcome = rewrite_source(path, &text, &options.source_options, options.engine)
        .map_err(|source| FileError::Rewrite {
            path: shown.clone(),
            source,
        })?;
    debug!(file = %shown, findings = outcome.findings.len(), "processed");
    let rewritten = (outcome.text != text).then_some(outcome.text);
    Ok(FileReport {
        file: shown,
        findings: outcome.findings,
        fixed: false,
        path: path.to_path_buf(),
        rewritten,
    })
}

fn write_back(report: &mut FileReport, options: &RewriteOptions) -> Result<(), FileError> {
    let Some(text) = report.rewritten.take() else {
        return Ok(());
    };
    let target = match &options.root {
        Some(root) => validate_path_within_root(&report.path, root).map_err(|e| {
            FileError::OutsideRoot {
                path: report.file.clone(),
                reason: e.to_string(),
            }
        })?,
        None => report.path.clone(),
    };
    fs::write(&target, text).map_err(|source| FileError::Write {
        path: report.file.clone(),
        source,
    })?;
    report.fixed = true;
    Ok(())
}

/// Processes `files` in parallel and, in fix mode, writes the results back.
///
/// Each file is an independent run with its own engine. Failures are
/// collected in the report and never stop other files.
pub fn run_rewrite(
    files: &[PathBuf],
    options: &RewriteOptions,
    progress: Option<&ProgressBar>,
) -> RewriteReport {
    let results: Vec<Result<FileReport, FileError>> = files
        .par_iter()
        .map(|path| {
            let result = process_file(path, options);
            if let Some(pb) = progress {
                pb.inc(1);
            }
            result
        })
        .collect();

    let mut report = RewriteReport::default();
    for result in results {
        match result {
            Ok(file) => {
                report.summary.files_processed += 1;
                if !file.findings.is_empty() {
                    report.files.push(file);
                }
            }
            Err(e) => {
                warn!("{e}");
                report.errors.push(e.to_string());
            }
        }
    }

    if options.fix {
        let pending = report.files.iter().filter(|f| f.rewritten.is_some()).count();
        if pending > 0 {
            info!("Applying fixes to {pending} files");
        }
        for file in &mut report.files {
            match write_back(file, options) {
                Ok(()) if file.fixed => info!("Fixed {}", file.file),
                Ok(()) => {}
                Err(e) => {
                    warn!("{e}");
                    report.errors.push(e.to_string());
                }
            }
        }
    }

    report.files.sort_by(|a, b| a.file.cmp(&b.file));
    report.summary.files_with_findings = report.files.len();
    report.summary.files_fixed = report.files.iter().filter(|f| f.fixed).count();
    report.summary.total_findings = report.files.iter().map(|f| f.findings.len()).sum();
    report.summary.errors = report.errors.len();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn options(fix: bool) -> RewriteOptions {
        RewriteOptions {
            fix,
            engine: EngineConfig { quiet: true },
            ..RewriteOptions::default()
        }
    }

    #[test]
    fn test_report_only_leaves_file_untouched() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("a.cpp");
        fs::write(&path, "const int x = 1;\n")?;

        let report = run_rewrite(&[path.clone()], &options(false), None);
        assert_eq!(report.summary.total_findings, 1);
        assert_eq!(report.summary.files_fixed, 0);
        assert_eq!(fs::read_to_string(&path)?, "const int x = 1;\n");
        Ok(())
    }

    #[test]
    fn test_fix_writes_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("a.cpp");
        fs::write(&path, "const int x = 1;\n")?;

        let report = run_rewrite(&[path.clone()], &options(true), None);
        assert_eq!(report.summary.files_fixed, 1);
        assert_eq!(fs::read_to_string(&path)?, "int const x = 1;\n");
        Ok(())
    }

    #[test]
    fn test_missing_file_is_reported_not_fatal() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let good = dir.path().join("good.cpp");
        fs::write(&good, "const char* p;\n")?;
        let missing = dir.path().join("missing.cpp");

        let report = run_rewrite(&[missing, good], &options(false), None);
        assert_eq!(report.summary.errors, 1);
        assert_eq!(report.summary.files_processed, 1);
        assert_eq!(report.summary.total_findings, 1);
        Ok(())
    }
}
