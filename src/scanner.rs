//! MBOX discovery: walk a folder tree and keep the files that look like MBOX.
//!
//! Classification is a heuristic over files of unknown type: a file is an
//! MBOX when one of its first ten lines starts with `From `. Files that
//! cannot be opened or read are skipped, never reported as errors.
//!
//! Symbolic links to directories are not followed, so link cycles cannot
//! make the walk loop. Links to files are classified like regular files.
//! Depth is bounded only by the filesystem.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{DedupError, Result};

/// Number of leading lines inspected per candidate file.
const SNIFF_LINES: usize = 10;

/// Longest line read while sniffing; binary files rarely contain newlines.
const MAX_SNIFF_LINE: u64 = 64 * 1024;

/// Mail client summary/index files.
const INDEX_EXTENSION: &str = "msf";

/// Platform housekeeping file that is never a mailbox.
const HOUSEKEEPING_FILE: &str = "desktop.ini";

/// Outcome of sniffing one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Mbox,
    NotMbox,
    /// Could not be opened or read; treated like `NotMbox` by the scanner.
    Unreadable,
}

/// Folder scanner configuration.
#[derive(Debug, Clone, Default)]
pub struct MboxScanner {
    /// Skip files whose name or directory contains "trash".
    pub exclude_trash: bool,
}

impl MboxScanner {
    pub fn new(exclude_trash: bool) -> Self {
        Self { exclude_trash }
    }

    /// Recursively collect MBOX files under `root`.
    ///
    /// Directories are visited top-down; entries within a directory are
    /// sorted by name. Returned paths are absolute.
    pub fn scan(&self, root: &Path) -> Result<Vec<PathBuf>> {
        if !root.is_dir() {
            return Err(DedupError::InvalidPath(format!(
                "{} is not a directory",
                root.display()
            )));
        }
        let root = std::path::absolute(root).map_err(|e| DedupError::io(root, e))?;

        let mut found = Vec::new();
        for entry in WalkDir::new(&root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            // Links to files are scanned; links to directories are not followed.
            let is_file = entry.file_type().is_file()
                || (entry.path_is_symlink() && entry.path().is_file());
            if !is_file {
                continue;
            }

            let path = entry.path();
            if !self.is_candidate(path) {
                continue;
            }

            match classify(path) {
                Classification::Mbox => {
                    debug!(path = %path.display(), "Found MBOX");
                    found.push(path.to_path_buf());
                }
                Classification::NotMbox => {}
                Classification::Unreadable => {
                    debug!(path = %path.display(), "Skipping unreadable file");
                }
            }
        }

        info!(root = %root.display(), count = found.len(), "Scan complete");
        Ok(found)
    }

    /// Name-based filters, applied before the file is opened.
    fn is_candidate(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
            return false;
        };

        if name.starts_with('.') || name.eq_ignore_ascii_case(HOUSEKEEPING_FILE) {
            return false;
        }
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(INDEX_EXTENSION))
        {
            return false;
        }

        if self.exclude_trash {
            let dir = path
                .parent()
                .map(|p| p.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if name.to_lowercase().contains("trash") || dir.contains("trash") {
                return false;
            }
        }

        true
    }
}

/// Convenience wrapper around [`MboxScanner::scan`].
pub fn scan(root: &Path, exclude_trash: bool) -> Result<Vec<PathBuf>> {
    MboxScanner::new(exclude_trash).scan(root)
}

/// Decide whether a file looks like an MBOX.
///
/// Reads at most [`SNIFF_LINES`] lines, decoding lossily, and stops at the
/// first line that begins with `From `.
pub fn classify(path: &Path) -> Classification {
    let Ok(file) = File::open(path) else {
        return Classification::Unreadable;
    };
    let mut reader = BufReader::new(file);
    let mut line = Vec::with_capacity(256);

    for _ in 0..SNIFF_LINES {
        line.clear();
        match reader.by_ref().take(MAX_SNIFF_LINE).read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                if String::from_utf8_lossy(&line).starts_with("From ") {
                    return Classification::Mbox;
                }
                // Capped read: the rest of this line is not a new line.
                if !line.ends_with(b"\n") && reader.skip_until(b'\n').is_err() {
                    return Classification::Unreadable;
                }
            }
            Err(_) => return Classification::Unreadable,
        }
    }

    Classification::NotMbox
}
