//! Output formatting and styling module.
//!
//! Centralizes all terminal output: colored status lines, the progress bar
//! of the move phase, and the end-of-run summary.

use crate::archive::ExpansionReport;
use crate::file_category::CategoryTable;
use crate::report::MoveReport;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};

/// Manages all CLI output with consistent styling.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with an X mark.
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Creates a progress bar counting directories of the move phase.
    ///
    /// Stays invisible when stderr is not a terminal.
    pub fn create_progress_bar() -> ProgressBar {
        let pb = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("█▓░"));
        }
        pb.set_message("directories");
        pb
    }

    /// Formats an extension list the way the summary shows it.
    ///
    /// # Example
    ///
    /// ```
    /// use foldersort::output::OutputFormatter;
    ///
    /// let exts = vec!["ZIP".to_string(), "GZ".to_string(), "".to_string()];
    /// assert_eq!(OutputFormatter::format_extensions(&exts), "[ZIP, GZ, '']");
    /// ```
    pub fn format_extensions(extensions: &[String]) -> String {
        let items: Vec<String> = extensions
            .iter()
            .map(|ext| {
                if ext.is_empty() {
                    "''".to_string()
                } else {
                    ext.clone()
                }
            })
            .collect();
        format!("[{}]", items.join(", "))
    }

    /// Prints the end-of-run summary.
    ///
    /// Lists, for every category that received files, its extension set and
    /// the names moved into it, then the failures of each stage.
    pub fn summary(
        root: &Path,
        moves: &MoveReport,
        table: &CategoryTable,
        expansion: &ExpansionReport,
        pruned: &[PathBuf],
    ) {
        Self::success(&format!("Files at {} sorted successfully", root.display()));

        if moves.total_moved() > 0 {
            Self::header("Files moved to new folders based on extensions:");
        }
        for category in moves.categories() {
            println!(
                "{} {}:",
                category.dir_name().bold(),
                Self::format_extensions(&table.extensions(category))
            );
            if let Some(names) = moves.files(category) {
                let names: Vec<&str> = names.iter().map(String::as_str).collect();
                println!("  {}\n", names.join(", "));
            }
        }

        if !expansion.expanded.is_empty() {
            Self::info(&format!("Archives unpacked: {}", expansion.expanded.len()));
        }
        if !pruned.is_empty() {
            Self::info(&format!("Empty folders deleted: {}", pruned.len()));
        }

        let failed = moves.failures().len() + expansion.failures.len();
        if failed > 0 {
            Self::header("Problems");
            for failure in moves.failures() {
                Self::error(&format!(
                    "could not move {}: {}",
                    failure.path.display(),
                    failure.reason
                ));
            }
            for (path, reason) in &expansion.failures {
                Self::error(&format!("could not unpack {}: {}", path.display(), reason));
            }
            Self::warning(&format!(
                "{} item{} left in place, see above",
                failed,
                if failed == 1 { "" } else { "s" }
            ));
        }
    }
}
