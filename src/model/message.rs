//! In-memory representation of one MBOX message.

use crate::parser::header::HeaderMap;
use crate::parser::mbox::is_mbox_separator;

/// Header lookup by case-insensitive name.
///
/// Absent headers read as the empty string; callers never see an error.
pub trait HeaderLookup {
    /// Value of the first header named `name`, or `""`.
    fn header(&self, name: &str) -> &str;
}

/// A single message loaded from an MBOX file.
///
/// `content` holds the RFC 5322 message (headers and body) exactly as it
/// appears on disk, without the `From ` separator line and without the
/// blank line that separates it from the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MboxMessage {
    /// The `From ` separator line, including its line ending.
    pub separator: Vec<u8>,
    /// Raw message bytes (headers + body).
    pub content: Vec<u8>,
    /// Parsed header fields.
    pub headers: HeaderMap,
    /// Sequential index within the MBOX (0, 1, 2, …).
    pub sequence: u64,
    /// Byte offset of the separator line inside the MBOX file.
    pub offset: u64,
}

impl MboxMessage {
    /// Split one raw MBOX chunk (as produced by the parser) into its parts.
    ///
    /// A chunk that does not begin with `From ` (stray text before the first
    /// separator) keeps an empty separator.
    pub fn from_raw(raw: &[u8], offset: u64, sequence: u64) -> Self {
        let (separator, rest) = split_separator(raw);
        let content = strip_trailing_blank_line(rest);
        Self {
            separator: separator.to_vec(),
            headers: HeaderMap::parse(content),
            content: content.to_vec(),
            sequence,
            offset,
        }
    }

    /// Line ending used by this message (`\r\n` or `\n`).
    pub fn line_ending(&self) -> &'static [u8] {
        if self.separator.ends_with(b"\r\n") || self.content.ends_with(b"\r\n") {
            b"\r\n"
        } else {
            b"\n"
        }
    }
}

impl HeaderLookup for MboxMessage {
    fn header(&self, name: &str) -> &str {
        self.headers.header(name)
    }
}

fn split_separator(raw: &[u8]) -> (&[u8], &[u8]) {
    let body = if raw.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &raw[3..]
    } else {
        raw
    };
    if !is_mbox_separator(body) {
        return (&[], raw);
    }
    match body.iter().position(|&b| b == b'\n') {
        Some(pos) => (&body[..=pos], &body[pos + 1..]),
        None => (body, &[]),
    }
}

/// Drop the final blank line, which belongs to the MBOX framing.
fn strip_trailing_blank_line(data: &[u8]) -> &[u8] {
    if let Some(rest) = data.strip_suffix(b"\r\n\r\n") {
        &data[..rest.len() + 2]
    } else if let Some(rest) = data.strip_suffix(b"\n\n") {
        &data[..rest.len() + 1]
    } else if data == b"\n" || data == b"\r\n" {
        &[]
    } else {
        data
    }
}
