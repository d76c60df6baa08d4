//! Moving files from a directory tree into category folders at its root.
//!
//! Sorting runs in two steps. The tree is walked first, pruning hidden
//! directories and any directory named after a category, and the non-hidden
//! files of every visited directory are collected into a [`DirectoryBatch`].
//! Then one task per batch runs on a bounded worker pool; each task moves its
//! files and returns a local [`MoveReport`], merged into the global report as
//! it finishes. `sort_files` returns only after every task is done.

use crate::config::CompiledFilters;
use crate::file_category::{Category, CategoryTable};
use crate::report::MoveReport;
use crate::transliterate::normalize;
use indicatif::ProgressBar;
use parking_lot::Mutex;
use rayon::ThreadPool;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Errors that abort a sorting run.
#[derive(Debug, Error)]
pub enum OrganizeError {
    /// The root path does not exist or is not a directory.
    #[error("{} is not a folder", path.display())]
    InvalidInput { path: PathBuf },
    /// Failed to create a category directory.
    #[error("Failed to create directory {}: {source}", path.display())]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The worker pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
    /// Failed to write the JSON run report.
    #[error("Failed to write report {}: {source}", path.display())]
    ReportWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Result type for file organization operations.
pub type OrganizeResult<T> = Result<T, OrganizeError>;

/// A file to be sorted, with the parts of its name the sorter needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Full path of the source file.
    pub path: PathBuf,
    /// Text after the last dot, upper-cased; empty if the name has no dot.
    pub extension: String,
    /// Text before the first dot (the whole name if there is none).
    pub stem: String,
    /// Text after the last dot, case as-is.
    original_extension: Option<String>,
}

impl FileEntry {
    /// Splits `name` (a file inside `dir`) into stem and extension.
    ///
    /// `path` always keeps the name exactly as given. A name that is not
    /// valid UTF-8 is read lossily for the stem and extension only.
    ///
    /// # Examples
    ///
    /// ```
    /// use foldersort::file_organizer::FileEntry;
    /// use std::path::Path;
    ///
    /// let entry = FileEntry::new(Path::new("/in"), "фото.JPG");
    /// assert_eq!(entry.extension, "JPG");
    /// assert_eq!(entry.destination_name(), "foto.JPG");
    ///
    /// let entry = FileEntry::new(Path::new("/in"), "backup.tar.gz");
    /// assert_eq!(entry.destination_name(), "backup.gz");
    /// ```
    pub fn new(dir: &Path, name: impl AsRef<OsStr>) -> Self {
        let path = dir.join(name.as_ref());
        let name = name.as_ref().to_string_lossy();
        match (name.split_once('.'), name.rsplit_once('.')) {
            (Some((stem, _)), Some((_, ext))) => Self {
                path,
                extension: ext.to_uppercase(),
                stem: stem.to_string(),
                original_extension: Some(ext.to_string()),
            },
            _ => Self {
                path,
                extension: String::new(),
                stem: name.to_string(),
                original_extension: None,
            },
        }
    }

    /// The name the file gets in its category folder: the transliterated
    /// stem, plus the original extension if there was one.
    pub fn destination_name(&self) -> String {
        match &self.original_extension {
            Some(ext) => format!("{}.{}", normalize(&self.stem), ext),
            None => normalize(&self.stem),
        }
    }
}

/// The files of one directory, queued as one mover task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryBatch {
    pub dir: PathBuf,
    pub files: Vec<OsString>,
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Walk predicate: descend into everything except hidden and category folders.
fn should_descend(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    !is_hidden(entry) && !Category::is_category_dir(&entry.file_name().to_string_lossy())
}

/// Collects the sortable files of every directory under `root`.
///
/// Hidden files, symlinks to directories and files matched by `filters` are
/// left out. Directories
/// without sortable files produce no batch.
pub fn collect_batches(root: &Path, filters: &CompiledFilters) -> Vec<DirectoryBatch> {
    let mut batches: BTreeMap<PathBuf, Vec<OsString>> = BTreeMap::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(should_descend);

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_dir() || is_hidden(&entry) {
            continue;
        }
        // Not followed, so a link to a directory arrives here as a non-directory
        if entry.path_is_symlink() && entry.path().is_dir() {
            debug!(path = %entry.path().display(), "skipping directory symlink");
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if filters.is_excluded(relative) {
            debug!(path = %entry.path().display(), "excluded by filter");
            continue;
        }

        let Some(dir) = entry.path().parent() else {
            continue;
        };
        batches
            .entry(dir.to_path_buf())
            .or_default()
            .push(entry.file_name().to_os_string());
    }

    batches
        .into_iter()
        .map(|(dir, files)| DirectoryBatch { dir, files })
        .collect()
}

/// Moves `source` to `destination`, replacing any existing file.
///
/// Falls back to copy-and-delete when a plain rename crosses devices.
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    match fs::rename(source, destination) {
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            fs::copy(source, destination)?;
            fs::remove_file(source)
        }
        other => other,
    }
}

/// Sorts the given files of one directory into the category folders under
/// `destination_root`.
///
/// The category folders must already exist. A destination name that already
/// exists is overwritten. Failures are recorded in the returned report and
/// never stop the remaining files.
pub fn process_directory(
    dir: &Path,
    files: &[OsString],
    table: &CategoryTable,
    destination_root: &Path,
) -> MoveReport {
    let mut report = MoveReport::new();

    for name in files {
        let entry = FileEntry::new(dir, name);
        let (category, is_new_unknown) = table.classify(&entry.extension);
        if is_new_unknown {
            report.record_unknown_extension(&entry.extension);
        }

        let destination_name = entry.destination_name();
        let destination = destination_root
            .join(category.dir_name())
            .join(&destination_name);

        match move_file(&entry.path, &destination) {
            Ok(()) => {
                debug!(
                    from = %entry.path.display(),
                    to = %destination.display(),
                    "moved"
                );
                report.record(category, destination_name);
            }
            Err(e) => {
                warn!(path = %entry.path.display(), error = %e, "failed to move file");
                report.record_failure(entry.path.clone(), e.to_string());
            }
        }
    }

    report
}

/// Creates one folder per category under `root`. Existing folders are fine.
pub fn create_category_dirs(root: &Path) -> OrganizeResult<()> {
    for category in Category::ALL {
        let path = root.join(category.dir_name());
        fs::create_dir_all(&path)
            .map_err(|source| OrganizeError::DirectoryCreationFailed { path, source })?;
    }
    Ok(())
}

/// Sorts a whole directory tree.
pub struct FileOrganizer<'a> {
    pool: &'a ThreadPool,
    filters: &'a CompiledFilters,
    progress: ProgressBar,
}

impl<'a> FileOrganizer<'a> {
    /// Creates an organizer running its tasks on `pool`.
    pub fn new(pool: &'a ThreadPool, filters: &'a CompiledFilters) -> Self {
        Self {
            pool,
            filters,
            progress: ProgressBar::hidden(),
        }
    }

    /// Reports per-directory progress on `progress`.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Sorts every file under `root` into the category folders at `root`.
    ///
    /// Fails before touching the filesystem if `root` is not a directory.
    /// New unknown extensions found by the tasks are added to `table` once
    /// all tasks have finished.
    pub fn sort_files(&self, root: &Path, table: &mut CategoryTable) -> OrganizeResult<MoveReport> {
        if !root.is_dir() {
            return Err(OrganizeError::InvalidInput {
                path: root.to_path_buf(),
            });
        }

        create_category_dirs(root)?;

        let batches = collect_batches(root, self.filters);
        info!(directories = batches.len(), "sorting files");
        self.progress.set_length(batches.len() as u64);

        let global = Mutex::new(MoveReport::new());
        let snapshot: &CategoryTable = table;
        self.pool.install(|| {
            batches.par_iter().for_each(|batch| {
                let local = process_directory(&batch.dir, &batch.files, snapshot, root);
                global.lock().merge(local);
                self.progress.inc(1);
            });
        });
        self.progress.finish_and_clear();

        let report = global.into_inner();
        table.absorb_unknown(report.unknown_extensions());
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn pool() -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(4)
            .build()
            .expect("Failed to build pool")
    }

    #[test]
    fn test_file_entry_without_dot() {
        let entry = FileEntry::new(Path::new("/x"), "Makefile");
        assert_eq!(entry.extension, "");
        assert_eq!(entry.stem, "Makefile");
        assert_eq!(entry.destination_name(), "Makefile");
    }

    #[test]
    fn test_file_entry_keeps_extension_case_and_drops_inner_parts() {
        let entry = FileEntry::new(Path::new("/x"), "отчёт.v2.Docx");
        assert_eq!(entry.extension, "DOCX");
        assert_eq!(entry.stem, "отчёт");
        assert_eq!(entry.destination_name(), "otchet.Docx");
        assert_eq!(entry.path, Path::new("/x/отчёт.v2.Docx"));
    }

    #[test]
    fn test_file_entry_trailing_dot() {
        let entry = FileEntry::new(Path::new("/x"), "draft.");
        assert_eq!(entry.extension, "");
        assert_eq!(entry.destination_name(), "draft.");
    }

    #[test]
    fn test_process_directory_moves_and_reports() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        create_category_dirs(root).unwrap();
        fs::write(root.join("фото.JPG"), "img").unwrap();
        fs::write(root.join("notes.xyz"), "?").unwrap();

        let table = CategoryTable::new();
        let files = vec![OsString::from("фото.JPG"), OsString::from("notes.xyz")];
        let report = process_directory(root, &files, &table, root);

        assert!(root.join("images/foto.JPG").is_file());
        assert!(root.join("unknown/notes.xyz").is_file());
        assert!(!root.join("фото.JPG").exists());
        assert!(report.files(Category::Images).unwrap().contains("foto.JPG"));
        assert_eq!(report.unknown_extensions(), ["XYZ".to_string()]);
        assert!(report.failures().is_empty());
    }

    #[test]
    fn test_process_directory_records_missing_file_as_failure() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        create_category_dirs(root).unwrap();
        fs::write(root.join("real.txt"), "x").unwrap();

        let files = vec![OsString::from("ghost.txt"), OsString::from("real.txt")];
        let report = process_directory(root, &files, &CategoryTable::new(), root);

        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].path, root.join("ghost.txt"));
        assert!(root.join("documents/real.txt").is_file());
    }

    #[test]
    fn test_collect_batches_skips_hidden_and_category_dirs() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        fs::create_dir_all(root.join("sub/images")).unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::create_dir_all(root.join("documents")).unwrap();
        fs::write(root.join("a.txt"), "").unwrap();
        fs::write(root.join(".hidden.txt"), "").unwrap();
        fs::write(root.join("sub/b.png"), "").unwrap();
        fs::write(root.join("sub/images/c.png"), "").unwrap();
        fs::write(root.join(".git/config"), "").unwrap();
        fs::write(root.join("documents/d.txt"), "").unwrap();

        let batches = collect_batches(root, &CompiledFilters::default());

        assert_eq!(
            batches,
            vec![
                DirectoryBatch {
                    dir: root.to_path_buf(),
                    files: vec![OsString::from("a.txt")],
                },
                DirectoryBatch {
                    dir: root.join("sub"),
                    files: vec![OsString::from("b.png")],
                },
            ]
        );
    }

    #[test]
    fn test_sort_files_rejects_non_directory_without_changes() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let file = temp_dir.path().join("plain.txt");
        fs::write(&file, "x").unwrap();

        let pool = pool();
        let filters = CompiledFilters::default();
        let organizer = FileOrganizer::new(&pool, &filters);
        let mut table = CategoryTable::new();

        let result = organizer.sort_files(&file, &mut table);
        assert!(matches!(result, Err(OrganizeError::InvalidInput { .. })));

        let result = organizer.sort_files(&temp_dir.path().join("missing"), &mut table);
        assert!(matches!(result, Err(OrganizeError::InvalidInput { .. })));
        assert!(!temp_dir.path().join("images").exists());
    }

    #[test]
    fn test_sort_files_dedupes_unknown_extensions_across_tasks() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        for i in 0..10 {
            let dir = root.join(format!("d{i}"));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join(format!("n{i}.xyz")), "x").unwrap();
        }

        let pool = pool();
        let filters = CompiledFilters::default();
        let mut table = CategoryTable::new();
        let report = FileOrganizer::new(&pool, &filters)
            .sort_files(root, &mut table)
            .unwrap();

        assert_eq!(table.extensions(Category::Unknown), vec!["XYZ"]);
        assert_eq!(report.files(Category::Unknown).unwrap().len(), 10);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_name_is_moved() {
        use std::os::unix::ffi::OsStrExt;

        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path();
        // "фото.txt" in CP1251
        let name = OsStr::from_bytes(b"\xF4\xEE\xF2\xEE.txt");
        fs::write(root.join(name), "legacy").unwrap();

        let pool = pool();
        let filters = CompiledFilters::default();
        let mut table = CategoryTable::new();
        let report = FileOrganizer::new(&pool, &filters)
            .sort_files(root, &mut table)
            .unwrap();

        assert!(report.failures().is_empty());
        assert!(!root.join(name).exists());
        let sorted: Vec<_> = fs::read_dir(root.join("documents"))
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(sorted.len(), 1);
        assert_eq!(fs::read_to_string(&sorted[0]).unwrap(), "legacy");
        assert_eq!(report.files(Category::Documents).unwrap().len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlinks_are_not_moved() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let outside = TempDir::new().expect("Failed to create temp directory");
        fs::write(outside.path().join("inside.txt"), "x").unwrap();
        let root = temp_dir.path();
        let link = root.join("мои_ссылки");
        std::os::unix::fs::symlink(outside.path(), &link).unwrap();
        fs::write(root.join("plain.txt"), "y").unwrap();

        let batches = collect_batches(root, &CompiledFilters::default());
        assert_eq!(
            batches,
            vec![DirectoryBatch {
                dir: root.to_path_buf(),
                files: vec![OsString::from("plain.txt")],
            }]
        );

        let pool = pool();
        let filters = CompiledFilters::default();
        let report = FileOrganizer::new(&pool, &filters)
            .sort_files(root, &mut CategoryTable::new())
            .unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(report.files(Category::Unknown).is_none());
        assert!(outside.path().join("inside.txt").is_file());
        assert!(root.join("documents/plain.txt").is_file());
    }
}
