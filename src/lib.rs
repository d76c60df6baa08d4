//! foldersort - sort a folder tree into category subfolders
//!
//! This library classifies files by extension, transliterates Cyrillic file
//! names to ASCII, moves files into category folders at the root of the tree,
//! unpacks the archives it collected and removes folders left empty.

pub mod archive;
pub mod cleanup;
pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod output;
pub mod report;
pub mod transliterate;

pub use archive::{ExpansionReport, ExtractionError, expand_archives};
pub use cleanup::prune_empty_directories;
pub use config::{CompiledFilters, Config, ConfigError, RunSettings};
pub use file_category::{Category, CategoryTable, classify};
pub use file_organizer::{FileEntry, FileOrganizer, OrganizeError, process_directory};
pub use report::{MoveReport, RunReport};
pub use transliterate::{Transliterator, normalize};

pub use cli::{Cli, RunOptions, RunSummary, organize, run_cli};
