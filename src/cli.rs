//! Command-line interface module for foldersort.
//!
//! This module handles:
//! - Argument parsing (clap) and the interactive path prompt
//! - Merging the configuration file with command-line overrides
//! - The staged sorting pipeline and its summary

use crate::archive::{ExpansionReport, expand_archives};
use crate::cleanup::prune_empty_directories;
use crate::config::{CompiledFilters, Config, RunSettings};
use crate::file_category::{Category, CategoryTable};
use crate::file_organizer::{FileOrganizer, OrganizeError, OrganizeResult};
use crate::output::OutputFormatter;
use crate::report::{MoveReport, RunReport};
use anyhow::Context;
use clap::Parser;
use indicatif::ProgressBar;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Sort a folder into category subfolders, transliterating Cyrillic names,
/// unpacking archives and deleting folders left empty.
#[derive(Debug, Parser)]
#[command(name = "foldersort", version, about)]
pub struct Cli {
    /// Folder to sort. Prompted for when omitted.
    pub path: Option<PathBuf>,

    /// Configuration file (default: ./.foldersortrc.toml, then ~/.config/foldersort/config.toml).
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Worker threads per phase (0 = one per CPU).
    #[arg(short = 'j', long)]
    pub threads: Option<usize>,

    /// Leave archives packed.
    #[arg(long)]
    pub no_extract: bool,

    /// Keep empty folders.
    #[arg(long)]
    pub no_prune: bool,

    /// Write a JSON report of the run to FILE.
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// More log output (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// Everything a sorting run needs besides the root path.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub settings: RunSettings,
    pub filters: CompiledFilters,
    /// Show a progress bar during the move phase.
    pub progress: bool,
}

impl RunOptions {
    /// Builds options from a loaded configuration and command-line overrides.
    pub fn from_config(config: &Config, cli: &Cli) -> anyhow::Result<Self> {
        let mut settings = config.run.clone();
        if let Some(threads) = cli.threads {
            settings.threads = threads;
        }
        if cli.no_extract {
            settings.extract_archives = false;
        }
        if cli.no_prune {
            settings.prune_empty = false;
        }
        let filters = config
            .filters
            .compile()
            .context("Error compiling filters")?;
        Ok(Self {
            settings,
            filters,
            progress: true,
        })
    }
}

/// Results of every stage of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub root: PathBuf,
    pub moves: MoveReport,
    pub table: CategoryTable,
    pub expansion: ExpansionReport,
    pub pruned: Vec<PathBuf>,
}

impl RunSummary {
    /// Builds the serializable report of this run.
    pub fn to_report(&self) -> RunReport {
        RunReport::build(
            &self.root,
            &self.moves,
            &self.table,
            &self.expansion,
            &self.pruned,
        )
    }
}

/// Runs the whole pipeline on `root`.
///
/// Stages run strictly one after another:
/// 1. create the category folders and move every file (concurrent)
/// 2. unpack everything under `archives` (concurrent)
/// 3. delete folders left empty (sequential, children first)
///
/// Returns `OrganizeError::InvalidInput` before any change if `root` is not a
/// directory. Any later failure is recorded in the summary instead.
pub fn organize(root: &Path, options: &RunOptions) -> OrganizeResult<RunSummary> {
    if !root.is_dir() {
        return Err(OrganizeError::InvalidInput {
            path: root.to_path_buf(),
        });
    }

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.settings.threads)
        .thread_name(|i| format!("foldersort-{i}"))
        .build()?;

    let progress = if options.progress {
        OutputFormatter::create_progress_bar()
    } else {
        ProgressBar::hidden()
    };

    let mut table = CategoryTable::new();
    let moves = FileOrganizer::new(&pool, &options.filters)
        .with_progress(progress)
        .sort_files(root, &mut table)?;
    info!(moved = moves.total_moved(), failed = moves.failures().len(), "move phase done");

    let expansion = if options.settings.extract_archives {
        expand_archives(&root.join(Category::Archives.dir_name()), &pool)
    } else {
        ExpansionReport::default()
    };

    let pruned = if options.settings.prune_empty {
        prune_empty_directories(root)
    } else {
        Vec::new()
    };

    Ok(RunSummary {
        root: root.to_path_buf(),
        moves,
        table,
        expansion,
        pruned,
    })
}

/// Asks for the folder path on stdin.
pub fn prompt_for_path<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> io::Result<PathBuf> {
    write!(output, "Enter the folder path: ")?;
    output.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(PathBuf::from(line.trim_end_matches(['\r', '\n'])))
}

/// Runs the CLI application.
///
/// Returns `Ok(false)` when the path is not a folder; nothing is changed in
/// that case.
pub fn run_cli(cli: Cli) -> anyhow::Result<bool> {
    let root = match &cli.path {
        Some(path) => path.clone(),
        None => {
            let stdin = io::stdin();
            prompt_for_path(&mut stdin.lock(), &mut io::stdout())
                .context("Error reading folder path")?
        }
    };

    let config = Config::load(cli.config.as_deref()).context("Error loading configuration")?;
    let options = RunOptions::from_config(&config, &cli)?;

    let summary = match organize(&root, &options) {
        Ok(summary) => summary,
        Err(e @ OrganizeError::InvalidInput { .. }) => {
            OutputFormatter::error(&e.to_string());
            return Ok(false);
        }
        Err(e) => return Err(e.into()),
    };

    OutputFormatter::summary(
        &summary.root,
        &summary.moves,
        &summary.table,
        &summary.expansion,
        &summary.pruned,
    );

    if let Some(report_path) = &cli.report {
        summary
            .to_report()
            .save(report_path)
            .map_err(|source| OrganizeError::ReportWriteFailed {
                path: report_path.clone(),
                source,
            })?;
        OutputFormatter::info(&format!("Report written to {}", report_path.display()));
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "foldersort",
            "/data",
            "-j",
            "3",
            "--no-extract",
            "--report",
            "out.json",
            "-vv",
        ])
        .unwrap();
        assert_eq!(cli.path, Some(PathBuf::from("/data")));
        assert_eq!(cli.threads, Some(3));
        assert!(cli.no_extract);
        assert!(!cli.no_prune);
        assert_eq!(cli.report, Some(PathBuf::from("out.json")));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_cli_path_is_optional() {
        let cli = Cli::try_parse_from(["foldersort"]).unwrap();
        assert!(cli.path.is_none());
    }

    #[test]
    fn test_cli_overrides_config() {
        let config = Config::parse("[run]\nthreads = 8\nprune_empty = true\n").unwrap();
        let cli = Cli::try_parse_from(["foldersort", "-j", "2", "--no-prune"]).unwrap();
        let options = RunOptions::from_config(&config, &cli).unwrap();
        assert_eq!(options.settings.threads, 2);
        assert!(!options.settings.prune_empty);
        assert!(options.settings.extract_archives);
    }

    #[test]
    fn test_prompt_reads_one_line() {
        let mut input = io::Cursor::new("/home/user/Загрузки\nignored\n");
        let mut output = Vec::new();
        let path = prompt_for_path(&mut input, &mut output).unwrap();
        assert_eq!(path, PathBuf::from("/home/user/Загрузки"));
        assert_eq!(String::from_utf8(output).unwrap(), "Enter the folder path: ");
    }

    #[test]
    fn test_organize_rejects_missing_root() {
        let result = organize(Path::new("/no/such/folder"), &RunOptions::default());
        assert!(matches!(result, Err(OrganizeError::InvalidInput { .. })));
    }
}
