//! Zip backup of a mail folder, taken before any mailbox is rewritten.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::error::{DedupError, Result};

/// Archive every file under `source` into
/// `<output_dir>/<prefix>_<YYYYmmdd_HH_MM_SS>.zip`.
///
/// Entries are named by their path relative to `source`, with `/`
/// separators. `level` is clamped to 1..=9. If `output_dir` lies inside
/// `source` it is left out of the archive. A partially written archive is
/// removed on failure.
pub fn backup_folder(
    source: &Path,
    output_dir: &Path,
    prefix: &str,
    level: u8,
) -> Result<PathBuf> {
    if !source.is_dir() {
        return Err(DedupError::Backup(format!(
            "{} is not a directory",
            source.display()
        )));
    }
    std::fs::create_dir_all(output_dir).map_err(|e| DedupError::io(output_dir, e))?;

    let archive = archive_path(output_dir, prefix);
    info!(
        source = %source.display(),
        archive = %archive.display(),
        "Creating backup"
    );

    match write_archive(source, output_dir, &archive, level.clamp(1, 9)) {
        Ok(files) => {
            info!(files, archive = %archive.display(), "Backup created");
            Ok(archive)
        }
        Err(e) => {
            let _ = std::fs::remove_file(&archive);
            Err(e)
        }
    }
}

fn write_archive(source: &Path, output_dir: &Path, archive: &Path, level: u8) -> Result<usize> {
    let file = File::create(archive).map_err(|e| DedupError::io(archive, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = |large: bool| {
        SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .compression_level(Some(i64::from(level)))
            .large_file(large)
    };

    // Canonical paths, so `..` and links cannot hide the output directory.
    let skip_dir = output_dir.canonicalize().ok();
    let mut files = 0usize;

    let walker = WalkDir::new(source).sort_by_file_name().into_iter();
    let not_output = |e: &walkdir::DirEntry| {
        skip_dir.is_none()
            || !e.file_type().is_dir()
            || e.path().canonicalize().ok() != skip_dir
    };
    for entry in walker.filter_entry(not_output) {
        let entry = entry.map_err(|e| DedupError::Backup(e.to_string()))?;
        let path = entry.path();
        // Same rule as the scanner: linked files are archived, linked
        // directories are not followed.
        let is_file = entry.file_type().is_file()
            || (entry.path_is_symlink() && path.is_file());
        if !is_file {
            continue;
        }
        let name = entry_name(source, path)?;
        let large = std::fs::metadata(path)
            .map(|m| m.len() >= u64::from(u32::MAX))
            .unwrap_or(false);

        debug!(entry = %name, "Adding to backup");
        zip.start_file(name, options(large))?;
        let mut input = File::open(path).map_err(|e| DedupError::io(path, e))?;
        std::io::copy(&mut input, &mut zip).map_err(|e| DedupError::io(path, e))?;
        files += 1;
    }

    zip.finish()?;
    Ok(files)
}

/// Relative, `/`-separated archive entry name.
fn entry_name(source: &Path, path: &Path) -> Result<String> {
    let rel = path
        .strip_prefix(source)
        .map_err(|_| DedupError::InvalidPath(path.display().to_string()))?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Timestamped archive path that does not exist yet.
fn archive_path(output_dir: &Path, prefix: &str) -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H_%M_%S");
    let mut candidate = output_dir.join(format!("{prefix}_{stamp}.zip"));
    let mut n = 1;
    while candidate.exists() {
        candidate = output_dir.join(format!("{prefix}_{stamp}_{n}.zip"));
        n += 1;
    }
    candidate
}
