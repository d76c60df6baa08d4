//! Archive expansion for the `archives` folder.
//!
//! Every file found (recursively) under the archives folder is unpacked into
//! `archives/<stem>`, where the stem is the file name up to its first dot, so
//! `backup.tar.gz` unpacks into `archives/backup`. The archive is deleted only
//! after a successful extraction; failures are logged and the file stays.

use rayon::ThreadPool;
use rayon::prelude::*;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Errors raised while unpacking a single archive.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file name does not name a format we can unpack.
    #[error("unsupported archive format: {}", path.display())]
    UnsupportedFormat { path: PathBuf },
    /// Reading the archive or writing its contents failed.
    #[error("I/O error extracting {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The ZIP container is invalid or corrupt.
    #[error("invalid or corrupt ZIP {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

/// Archive formats recognized by file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Infers the format from the file name (case-insensitive).
    ///
    /// A bare `.gz` that is not a tarball is not supported.
    pub fn from_path(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Some(Self::TarGz)
        } else if name.ends_with(".tar") {
            Some(Self::Tar)
        } else if name.ends_with(".zip") {
            Some(Self::Zip)
        } else {
            None
        }
    }
}

/// Outcome of the expansion stage.
#[derive(Debug, Clone, Default)]
pub struct ExpansionReport {
    /// Archives unpacked and removed.
    pub expanded: Vec<PathBuf>,
    /// Archives left in place, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

/// Returns the extraction folder for an archive: `archives_folder/<stem>`.
///
/// The stem is everything before the first dot of the file name.
pub fn target_folder(archive_path: &Path, archives_folder: &Path) -> PathBuf {
    let name = archive_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default();
    archives_folder.join(stem)
}

/// Unpacks one archive into `destination`, creating it if needed.
///
/// A ZIP container is validated before `destination` is created. If the
/// extraction fails and `destination` did not exist before, it is removed
/// again, so a failed archive leaves nothing behind.
///
/// Returns the number of files written.
pub fn extract_archive(archive_path: &Path, destination: &Path) -> Result<usize, ExtractionError> {
    let format = ArchiveFormat::from_path(archive_path).ok_or_else(|| {
        ExtractionError::UnsupportedFormat {
            path: archive_path.to_path_buf(),
        }
    })?;

    let io_err = |source: io::Error| ExtractionError::Io {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = File::open(archive_path).map_err(io_err)?;
    let created = !destination.exists();

    let result = match format {
        ArchiveFormat::Zip => {
            let archive = zip::ZipArchive::new(file).map_err(|source| ExtractionError::Zip {
                path: archive_path.to_path_buf(),
                source,
            })?;
            fs::create_dir_all(destination).map_err(io_err)?;
            extract_zip(archive_path, archive, destination)
        }
        ArchiveFormat::Tar => {
            fs::create_dir_all(destination).map_err(io_err)?;
            extract_tar(file, destination).map_err(io_err)
        }
        ArchiveFormat::TarGz => {
            fs::create_dir_all(destination).map_err(io_err)?;
            extract_tar(flate2::read::GzDecoder::new(file), destination).map_err(io_err)
        }
    };

    if result.is_err()
        && created
        && let Err(e) = fs::remove_dir_all(destination)
    {
        debug!(path = %destination.display(), error = %e, "could not remove partial extraction");
    }
    result
}

fn extract_zip(
    archive_path: &Path,
    mut archive: zip::ZipArchive<File>,
    destination: &Path,
) -> Result<usize, ExtractionError> {
    let zip_err = |source: zip::result::ZipError| ExtractionError::Zip {
        path: archive_path.to_path_buf(),
        source,
    };
    let io_err = |source: io::Error| ExtractionError::Io {
        path: archive_path.to_path_buf(),
        source,
    };

    let mut count = 0;
    for i in 0..archive.len() {
        let mut entry = archive.by_index(i).map_err(zip_err)?;
        let Some(entry_path) = entry.enclosed_name() else {
            warn!(entry = entry.name(), "skipping zip entry with unsafe path");
            continue;
        };
        let output_path = destination.join(entry_path);

        if entry.is_dir() {
            fs::create_dir_all(&output_path).map_err(io_err)?;
        } else {
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
            let mut outfile = File::create(&output_path).map_err(io_err)?;
            io::copy(&mut entry, &mut outfile).map_err(io_err)?;
            count += 1;
        }
    }
    Ok(count)
}

fn extract_tar<R: io::Read>(reader: R, destination: &Path) -> io::Result<usize> {
    let mut archive = tar::Archive::new(reader);
    let mut count = 0;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let is_file = entry.header().entry_type().is_file();
        // unpack_in refuses paths escaping the destination and returns false
        if entry.unpack_in(destination)? && is_file {
            count += 1;
        }
    }
    Ok(count)
}

/// Lists every file under the archives folder, recursively.
pub fn find_archives(archives_folder: &Path) -> Vec<PathBuf> {
    WalkDir::new(archives_folder)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .collect()
}

/// Unpacks every archive under `archives_folder` on `pool` and waits for all
/// of them to finish.
pub fn expand_archives(archives_folder: &Path, pool: &ThreadPool) -> ExpansionReport {
    let mut report = ExpansionReport::default();
    if !archives_folder.is_dir() {
        return report;
    }

    let archives = find_archives(archives_folder);
    info!(count = archives.len(), "expanding archives");

    let results: Vec<(PathBuf, Result<PathBuf, String>)> = pool.install(|| {
        archives
            .into_par_iter()
            .map(|archive| {
                let outcome = expand_one(&archive, archives_folder);
                (archive, outcome)
            })
            .collect()
    });

    for (archive, outcome) in results {
        match outcome {
            Ok(_) => report.expanded.push(archive),
            Err(reason) => report.failures.push((archive, reason)),
        }
    }
    report
}

fn expand_one(archive: &Path, archives_folder: &Path) -> Result<PathBuf, String> {
    let target = target_folder(archive, archives_folder);
    match extract_archive(archive, &target) {
        Ok(count) => {
            info!(
                archive = %archive.display(),
                target = %target.display(),
                files = count,
                "archive unpacked"
            );
            if let Err(e) = fs::remove_file(archive) {
                warn!(archive = %archive.display(), error = %e, "could not delete unpacked archive");
            }
            Ok(target)
        }
        Err(e) => {
            warn!("extraction failed: {e}");
            debug!(archive = %archive.display(), "archive left in place");
            Err(e.to_string())
        }
    }
}
