//! Run results: what was moved, what failed, and the JSON run report.

use crate::archive::ExpansionReport;
use crate::file_category::{Category, CategoryTable};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

/// A file that could not be moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MoveFailure {
    /// The source path of the file.
    pub path: PathBuf,
    /// Human-readable reason.
    pub reason: String,
}

/// Per-category names of moved files, plus the local bookkeeping of one
/// directory task.
///
/// A name appears at most once per category. When several sources land on
/// the same destination name, the last move wins on disk and the report
/// keeps a single entry.
#[derive(Debug, Clone, Default)]
pub struct MoveReport {
    moved: BTreeMap<Category, BTreeSet<String>>,
    unknown_extensions: Vec<String>,
    failures: Vec<MoveFailure>,
}

impl MoveReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a moved file. Returns false if the name was already recorded.
    pub fn record(&mut self, category: Category, name: impl Into<String>) -> bool {
        self.moved.entry(category).or_default().insert(name.into())
    }

    /// Records an extension first seen as unknown by this task.
    pub fn record_unknown_extension(&mut self, extension: &str) {
        if !self.unknown_extensions.iter().any(|e| e == extension) {
            self.unknown_extensions.push(extension.to_string());
        }
    }

    /// Records a file that could not be moved.
    pub fn record_failure(&mut self, path: PathBuf, reason: impl Into<String>) {
        self.failures.push(MoveFailure {
            path,
            reason: reason.into(),
        });
    }

    /// Folds another report into this one, deduplicating names per category.
    pub fn merge(&mut self, other: MoveReport) {
        for (category, names) in other.moved {
            self.moved.entry(category).or_default().extend(names);
        }
        for ext in &other.unknown_extensions {
            self.record_unknown_extension(ext);
        }
        self.failures.extend(other.failures);
    }

    /// Names moved into `category`, if any.
    pub fn files(&self, category: Category) -> Option<&BTreeSet<String>> {
        self.moved.get(&category).filter(|names| !names.is_empty())
    }

    /// Categories with at least one moved file, in table order.
    pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL
            .into_iter()
            .filter(|c| self.files(*c).is_some())
    }

    /// Total distinct names across all categories.
    pub fn total_moved(&self) -> usize {
        self.moved.values().map(BTreeSet::len).sum()
    }

    /// Extensions newly seen as unknown, in first-seen order.
    pub fn unknown_extensions(&self) -> &[String] {
        &self.unknown_extensions
    }

    /// Files that failed to move.
    pub fn failures(&self) -> &[MoveFailure] {
        &self.failures
    }
}

/// One category block of the JSON report.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub extensions: Vec<String>,
    pub files: Vec<String>,
}

/// Serializable record of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// RFC 3339 timestamp of when the report was built.
    pub timestamp: String,
    pub root: PathBuf,
    pub categories: Vec<CategoryReport>,
    pub move_failures: Vec<MoveFailure>,
    pub archives_expanded: Vec<PathBuf>,
    pub archive_failures: Vec<MoveFailure>,
    pub pruned_directories: Vec<PathBuf>,
}

impl RunReport {
    /// Builds the report from the results of each stage.
    pub fn build(
        root: &Path,
        moves: &MoveReport,
        table: &CategoryTable,
        expansion: &ExpansionReport,
        pruned: &[PathBuf],
    ) -> Self {
        let categories = moves
            .categories()
            .map(|category| CategoryReport {
                category,
                extensions: table.extensions(category),
                files: moves
                    .files(category)
                    .map(|names| names.iter().cloned().collect())
                    .unwrap_or_default(),
            })
            .collect();

        Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            root: root.to_path_buf(),
            categories,
            move_failures: moves.failures().to_vec(),
            archives_expanded: expansion.expanded.clone(),
            archive_failures: expansion
                .failures
                .iter()
                .map(|(path, reason)| MoveFailure {
                    path: path.clone(),
                    reason: reason.clone(),
                })
                .collect(),
            pruned_directories: pruned.to_vec(),
        }
    }

    /// Writes the report as pretty-printed JSON.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}
