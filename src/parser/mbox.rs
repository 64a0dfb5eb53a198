//! Streaming MBOX splitter.
//!
//! Reads MBOX files line-by-line with a large buffer and hands every
//! message chunk to a callback. Tolerant of malformed input.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::{DedupError, Result};

/// Size of the internal read buffer (1 MB for fast sequential reads on modern SSDs).
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Streaming MBOX parser.
///
/// Every line beginning with `From ` starts a new message. The parser is
/// tolerant of:
///
/// - Mixed `\n` and `\r\n` line endings
/// - `From ` lines not preceded by a blank line (kept as body, logs a warning)
/// - Body lines such as `From Bob: thanks` that lack the separator shape
/// - Truncated messages at EOF
/// - NUL bytes and other binary content in the body
/// - UTF-8 BOM at the start of the file
///
/// Chunks are passed through byte for byte, so concatenating them
/// reproduces the file exactly.
pub struct MboxParser {
    path: PathBuf,
    file_size: u64,
}

impl MboxParser {
    /// Create a parser for the given MBOX file.
    ///
    /// Verifies that the file exists and is readable, but does NOT validate
    /// that it is actually an MBOX.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DedupError::FileNotFound(path.clone())
            } else {
                DedupError::io(&path, e)
            }
        })?;
        if metadata.is_dir() {
            return Err(DedupError::InvalidMbox(path));
        }
        Ok(Self {
            path,
            file_size: metadata.len(),
        })
    }

    /// Total size of the underlying file in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// Parse the full MBOX, calling `message_callback` for each message found.
    ///
    /// The callback receives `(offset, raw_bytes)` where `raw_bytes` starts
    /// with the separator line, and returns `true` to continue or `false`
    /// to abort early.
    ///
    /// Returns the number of messages delivered. The file handle is closed
    /// before this returns.
    pub fn parse(&self, message_callback: &mut dyn FnMut(u64, &[u8]) -> bool) -> Result<u64> {
        if self.file_size == 0 {
            return Ok(0);
        }

        let file = File::open(&self.path).map_err(|e| DedupError::io(&self.path, e))?;
        let mut reader = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut count: u64 = 0;
        let mut current_offset: u64 = 0;
        let mut message_buf: Vec<u8> = Vec::with_capacity(64 * 1024);
        let mut message_start: u64 = 0;
        let mut prev_line_was_empty = true;
        let mut first_line = true;

        // Reusable line buffer
        let mut line_buf: Vec<u8> = Vec::with_capacity(4096);

        loop {
            line_buf.clear();
            let line_len = {
                let buf = reader
                    .fill_buf()
                    .map_err(|e| DedupError::io(&self.path, e))?;
                if buf.is_empty() {
                    break; // EOF
                }
                let consume_len = match memchr_newline(buf) {
                    Some(pos) => pos + 1,
                    None => buf.len(),
                };
                line_buf.extend_from_slice(&buf[..consume_len]);
                reader.consume(consume_len);
                consume_len as u64
            };

            // A line longer than the buffer arrives in pieces; only a piece
            // that starts a line may be a separator.
            let starts_line = message_buf.is_empty() || message_buf.ends_with(b"\n");

            let is_from_line = starts_line && is_mbox_separator(&line_buf);

            if is_from_line && (first_line || prev_line_was_empty) {
                if !message_buf.is_empty() {
                    if !message_callback(message_start, &message_buf) {
                        return Ok(count);
                    }
                    count += 1;
                }
                message_start = current_offset;
                message_buf.clear();
            } else if is_from_line {
                // Unescaped body line; splitting here would cut the message.
                warn!(
                    path = %self.path.display(),
                    offset = current_offset,
                    "'From ' line without preceding blank line kept as body"
                );
            }
            message_buf.extend_from_slice(&line_buf);

            prev_line_was_empty = is_blank_line(&line_buf);
            first_line = false;
            current_offset += line_len;
        }

        // Flush last message
        if !message_buf.is_empty() && message_callback(message_start, &message_buf) {
            count += 1;
        }

        Ok(count)
    }
}

/// Fast newline search (equivalent to memchr for `\n`).
#[inline]
fn memchr_newline(buf: &[u8]) -> Option<usize> {
    buf.iter().position(|&b| b == b'\n')
}

/// Check whether a line has the MBOX separator shape:
/// `From <sender> <asctime date>`, e.g.
/// `From user@example.com Thu Jan 01 00:00:00 2024`.
///
/// The date must carry a `hh:mm[:ss]` time and a four-digit year; other
/// fields (weekday, month, zone) are not checked.
pub fn is_mbox_separator(line: &[u8]) -> bool {
    // Skip BOM if present at very start
    let line = if line.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &line[3..]
    } else {
        line
    };
    let Some(rest) = line.strip_prefix(b"From ") else {
        return false;
    };

    let rest = String::from_utf8_lossy(rest);
    let mut fields = rest.split_whitespace();
    let Some(sender) = fields.next() else {
        return false;
    };
    if sender.ends_with(':') {
        return false;
    }

    let mut has_time = false;
    let mut has_year = false;
    for field in fields {
        has_time |= is_time_field(field);
        has_year |= field.len() == 4 && field.bytes().all(|b| b.is_ascii_digit());
    }
    has_time && has_year
}

/// `hh:mm` or `hh:mm:ss`.
fn is_time_field(field: &str) -> bool {
    let parts: Vec<&str> = field.split(':').collect();
    (2..=3).contains(&parts.len())
        && parts
            .iter()
            .enumerate()
            .all(|(i, p)| (1..=2).contains(&p.len()) && (i == 0 || p.len() == 2))
        && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()))
}

/// Check whether a line is blank (empty or only whitespace / CR / LF).
fn is_blank_line(line: &[u8]) -> bool {
    line.iter()
        .all(|&b| b == b'\n' || b == b'\r' || b == b' ' || b == b'\t')
}
