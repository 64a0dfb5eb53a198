//! Durable, atomic rewrite of an MBOX file.
//!
//! New content is staged in a temporary file in the target's directory,
//! flushed and synced, then renamed over the target. Until the rename the
//! original file is never touched; if staging fails the temporary file is
//! removed (on drop) and the error is returned.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{DedupError, Result};
use crate::model::message::MboxMessage;

/// Replaces the full message set of an MBOX file.
pub trait MailboxWriter {
    /// Write `messages`, in order, as the new content of `path`.
    fn write_all(&self, path: &Path, messages: &[&MboxMessage]) -> Result<()>;
}

/// Temp-file + rename writer used in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomicMboxWriter;

impl MailboxWriter for AtomicMboxWriter {
    fn write_all(&self, path: &Path, messages: &[&MboxMessage]) -> Result<()> {
        replace_atomically(path, |out| write_messages(out, messages))?;
        debug!(
            path = %path.display(),
            count = messages.len(),
            "Rewrote MBOX"
        );
        Ok(())
    }
}

/// Serialize messages in MBOX framing: separator line, content, blank line.
pub fn write_messages(out: &mut dyn Write, messages: &[&MboxMessage]) -> std::io::Result<()> {
    for msg in messages {
        let eol = msg.line_ending();
        out.write_all(&msg.separator)?;
        out.write_all(&msg.content)?;
        if !msg.content.is_empty() && !msg.content.ends_with(b"\n") {
            out.write_all(eol)?;
        }
        out.write_all(eol)?;
    }
    Ok(())
}

/// Stage new content for `target` through `fill`, then swap it into place.
///
/// The temporary file lives next to `target` so the final rename never
/// crosses a filesystem boundary. The original file's permissions are
/// carried over. A symlinked `target` is resolved first, so the link
/// stays in place and the file it points to is replaced.
pub fn replace_atomically<F>(target: &Path, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> std::io::Result<()>,
{
    let resolved;
    let target = if fs::symlink_metadata(target).is_ok_and(|m| m.file_type().is_symlink()) {
        resolved = fs::canonicalize(target).map_err(|e| DedupError::io(target, e))?;
        resolved.as_path()
    } else {
        target
    };

    let dir = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let name = target
        .file_name()
        .ok_or_else(|| DedupError::InvalidPath(target.display().to_string()))?
        .to_string_lossy();

    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{name}."))
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| DedupError::io(dir, e))?;
    let tmp_path = tmp.path().to_path_buf();

    {
        let mut out = BufWriter::new(tmp.as_file_mut());
        fill(&mut out).map_err(|e| DedupError::io(&tmp_path, e))?;
        out.flush().map_err(|e| DedupError::io(&tmp_path, e))?;
    }

    if let Ok(meta) = fs::metadata(target) {
        if let Err(e) = fs::set_permissions(&tmp_path, meta.permissions()) {
            warn!(path = %tmp_path.display(), error = %e, "Could not copy permissions");
        }
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| DedupError::io(&tmp_path, e))?;

    tmp.persist(target)
        .map_err(|e| DedupError::io(target, e.error))?;

    sync_dir(dir);
    Ok(())
}

/// Make the rename itself durable. Best effort; not all platforms allow it.
#[cfg(unix)]
fn sync_dir(dir: &Path) {
    if let Err(e) = fs::File::open(dir).and_then(|d| d.sync_all()) {
        debug!(path = %dir.display(), error = %e, "Directory sync failed");
    }
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) {}
