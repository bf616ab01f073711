use crate::commands::RewriteReport;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io::Write;
use std::time::Duration;

/// Print the exclusion list in styled format.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_exclusion_list(writer: &mut impl Write, folders: &[String]) -> std::io::Result<()> {
    if folders.is_empty() {
        let defaults = crate::constants::DEFAULT_EXCLUDE_FOLDERS();
        let mut sorted_defaults: Vec<&str> = defaults.iter().copied().collect();
        sorted_defaults.sort_unstable();
        let list = sorted_defaults.join(", ");
        writeln!(
            writer,
            "{} {}",
            "[OK] Using default exclusions only:".green(),
            list.dimmed()
        )?;
    } else {
        let list = folders
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(writer, "{} {}", "Excluding:".yellow().bold(), list)?;
    }
    Ok(())
}

/// Create a progress bar with file count.
///
/// In test mode, returns a hidden progress bar to avoid polluting test output.
#[must_use]
pub fn create_progress_bar(total_files: u64) -> ProgressBar {
    if cfg!(test) {
        return ProgressBar::hidden();
    }

    let pb =
        ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::stderr_with_hz(20));
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message("rewriting...");
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.tick(); // Force initial draw
    pb
}

/// Print the main header with box-drawing characters.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_header(writer: &mut impl Write, fixed: bool) -> std::io::Result<()> {
    let title = if fixed {
        "║  East Const Fixes Applied              ║"
    } else {
        "║  East Const Results                    ║"
    };
    writeln!(writer)?;
    writeln!(
        writer,
        "{}",
        "╔════════════════════════════════════════╗".cyan()
    )?;
    writeln!(writer, "{}", title.cyan().bold())?;
    writeln!(
        writer,
        "{}",
        "╚════════════════════════════════════════╝".cyan()
    )?;
    writeln!(writer)?;
    Ok(())
}

/// Print one `file:line:col: message [qualifiers]` line per finding.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_finding_lines(writer: &mut impl Write, report: &RewriteReport) -> std::io::Result<()> {
    for file in &report.files {
        for finding in &file.findings {
            let qualifiers = finding
                .qualifiers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(
                writer,
                "{}:{}:{}: {} [{}]",
                file.file.bold(),
                finding.line,
                finding.column,
                finding.message,
                qualifiers.yellow()
            )?;
        }
    }
    Ok(())
}

/// Helper to create a styled table
fn create_table(headers: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers);
    table
}

/// Print a per-file table of finding counts.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_file_table(writer: &mut impl Write, report: &RewriteReport) -> std::io::Result<()> {
    if report.files.is_empty() {
        return Ok(());
    }

    let mut table = create_table(vec!["File", "Findings", "Status"]);
    for file in &report.files {
        let (status, color) = if file.fixed {
            ("fixed", Color::Green)
        } else {
            ("west const", Color::Yellow)
        };
        table.add_row(vec![
            Cell::new(&file.file).add_attribute(Attribute::Bold),
            Cell::new(file.findings.len()),
            Cell::new(status).fg(color),
        ]);
    }
    writeln!(writer, "{table}")?;
    Ok(())
}

/// Print per-file errors.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_errors(writer: &mut impl Write, errors: &[String]) -> std::io::Result<()> {
    if errors.is_empty() {
        return Ok(());
    }
    writeln!(writer, "\n{}", "Errors".bold().underline())?;
    for e in errors {
        writeln!(writer, "  {} {}", "✗".red(), e)?;
    }
    Ok(())
}

/// Print the one-line summary.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_summary(writer: &mut impl Write, report: &RewriteReport) -> std::io::Result<()> {
    let s = &report.summary;
    let findings = if s.total_findings == 0 {
        s.total_findings.to_string().green()
    } else {
        s.total_findings.to_string().red().bold()
    };
    writeln!(
        writer,
        "\n[SUMMARY] {} west qualifiers in {} of {} files, {} fixed, {} errors",
        findings, s.files_with_findings, s.files_processed, s.files_fixed, s.errors
    )
}

/// Print the full report.
///
/// # Errors
///
/// Returns an error if writing to the writer fails.
pub fn print_report(writer: &mut impl Write, report: &RewriteReport) -> std::io::Result<()> {
    let fixed = report.summary.files_fixed > 0;
    print_header(writer, fixed)?;

    if !report.has_findings() && report.errors.is_empty() {
        writeln!(writer, "{}", "✓ All clean! Every qualifier is east.".green())?;
        return print_summary(writer, report);
    }

    print_finding_lines(writer, report)?;
    writeln!(writer)?;
    print_file_table(writer, report)?;
    print_errors(writer, &report.errors)?;
    print_summary(writer, report)
}

/// Print a quiet report (no detailed tables) for CI/CD mode.
///
/// # Errors
///
/// Returns an error if writing to the output fails.
pub fn print_report_quiet(writer: &mut impl Write, report: &RewriteReport) -> std::io::Result<()> {
    print_finding_lines(writer, report)?;
    print_summary(writer, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{run_rewrite, RewriteOptions};
    use crate::engine::EngineConfig;
    use tempfile::TempDir;

    fn report_for(text: &str) -> RewriteReport {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.cpp");
        std::fs::write(&path, text).unwrap();
        let options = RewriteOptions {
            engine: EngineConfig { quiet: true },
            ..RewriteOptions::default()
        };
        run_rewrite(&[path], &options, None)
    }

    fn render(f: impl Fn(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        colored::control::set_override(false);
        let mut out = Vec::new();
        f(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_finding_lines() {
        let report = report_for("int a;\nconst volatile int b = 0;\n");
        let text = render(|w| print_finding_lines(w, &report));
        assert!(text.contains(":2:1: move qualifier east of the declarator [const volatile]"));
    }

    #[test]
    fn test_clean_report() {
        let report = report_for("int const a = 0;\n");
        let text = render(|w| print_report(w, &report));
        assert!(text.contains("All clean"));
        assert!(text.contains("[SUMMARY] 0 west qualifiers in 0 of 1 files"));
    }

    #[test]
    fn test_quiet_report_has_no_table() {
        let report = report_for("const int a = 0;\n");
        let text = render(|w| print_report_quiet(w, &report));
        assert!(!text.contains("╔"));
        assert!(text.contains("[SUMMARY] 1 west qualifiers in 1 of 1 files"));
    }
}
