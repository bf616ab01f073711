//! Path utilities for eastconst.
//!
//! This module consolidates all path-related logic for:
//! - Cross-platform path normalization
//! - Path traversal validation
//! - Source file discovery with gitignore support

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::constants::DEFAULT_EXCLUDE_FOLDERS;

/// Normalizes a path for CLI display.
///
/// - Converts backslashes to forward slashes (for cross-platform consistency)
/// - Strips leading "./" or ".\" prefix (for cleaner output)
///
/// # Examples
/// ```
/// use std::path::Path;
/// use eastconst::utils::normalize_display_path;
///
/// assert_eq!(normalize_display_path(Path::new(".\\src\\widget.cpp")), "src/widget.cpp");
/// assert_eq!(normalize_display_path(Path::new("./include/widget.h")), "include/widget.h");
/// ```
#[must_use]
pub fn normalize_display_path(path: &Path) -> String {
    let s = path.to_string_lossy();
    // Strip Windows extended path prefix if present
    let clean = s.trim_start_matches(r"\\?\");
    let normalized = clean.replace('\\', "/");
    normalized
        .strip_prefix("./")
        .unwrap_or(&normalized)
        .to_owned()
}

/// Checks if a name matches any exclusion pattern.
/// Supports exact matching and wildcard patterns starting with `*.`.
#[must_use]
pub fn is_excluded(name: &str, excludes: &[String]) -> bool {
    for exclude in excludes {
        if exclude.starts_with("*.") {
            if name.ends_with(&exclude[1..]) {
                return true;
            }
        } else if name == exclude {
            return true;
        }
    }
    false
}

/// Validates that a path is contained within an allowed root directory.
///
/// # Errors
///
/// Returns an error if the path or root cannot be canonicalized,
/// or if the path lies outside the root.
pub fn validate_path_within_root(path: &Path, root: &Path) -> anyhow::Result<PathBuf> {
    let canonical_path = path
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("Failed to resolve path {}: {}", path.display(), e))?;
    let canonical_root = root
        .canonicalize()
        .map_err(|e| anyhow::anyhow!("Failed to resolve root {}: {}", root.display(), e))?;

    if canonical_path.starts_with(&canonical_root) {
        Ok(canonical_path)
    } else {
        anyhow::bail!(
            "Path traversal detected: {} is outside of {}",
            path.display(),
            root.display()
        )
    }
}

/// True when `path` has one of `extensions` (compared case-insensitively,
/// without the leading dot).
#[must_use]
pub fn has_cpp_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
}

/// Collects C and C++ files from a directory with gitignore support.
///
/// Uses the `ignore` crate to respect .gitignore, .git/info/exclude, and global gitignore
/// IN ADDITION to the default exclusions (build, target, `third_party`, etc.).
///
/// # Arguments
/// * `root` - Root directory to search
/// * `exclude` - Additional user-specified exclusion patterns
/// * `include` - Folders to force-include (overrides excludes)
/// * `extensions` - File extensions to collect
/// * `verbose` - Whether to log walk errors
///
/// # Returns
/// Tuple of (sorted source files found, directory count)
#[must_use]
pub fn collect_cpp_files(
    root: &Path,
    exclude: &[String],
    include: &[String],
    extensions: &[String],
    verbose: bool,
) -> (Vec<PathBuf>, usize) {
    use ignore::WalkBuilder;

    let default_excludes = DEFAULT_EXCLUDE_FOLDERS().iter().map(|&s| s.to_owned());
    let mut all_excludes: Vec<String> = exclude.iter().cloned().chain(default_excludes).collect();

    // Remove force-included folders from exclusion list
    all_excludes.retain(|ex| !include.iter().any(|inc| ex == inc));

    let root_for_filter = root.to_path_buf();

    // Skip excluded directories at traversal time instead of filtering their files later.
    let walker = WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            if entry.path() == root_for_filter {
                return true;
            }
            if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
                return true;
            }
            entry
                .file_name()
                .to_str()
                .is_none_or(|name| !is_excluded(name, &all_excludes))
        })
        .build();

    let mut files = Vec::new();
    let mut dir_count = 0;

    for result in walker {
        match result {
            Ok(entry) => {
                let path = entry.path();
                if entry.file_type().is_some_and(|ft| ft.is_dir()) {
                    if path != root {
                        dir_count += 1;
                    }
                    continue;
                }
                if has_cpp_extension(path, extensions) {
                    files.push(path.to_path_buf());
                }
            }
            Err(e) => {
                if verbose {
                    warn!("Walk error: {e}");
                }
            }
        }
    }

    files.sort();
    (files, dir_count)
}
