//! RFC 5322 header parsing: byte decoding, folding, and case-insensitive lookup.

use crate::model::message::HeaderLookup;

/// Unfolded header fields of one message, in their original order.
///
/// Names are stored lowercased; values are kept as written (no RFC 2047
/// decoding) so that fingerprints reflect the bytes on disk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMap {
    fields: Vec<(String, String)>,
}

impl HeaderMap {
    /// Parse the header block at the start of `message` (everything before
    /// the first blank line). Lines that are neither a field nor a
    /// continuation are skipped.
    pub fn parse(message: &[u8]) -> Self {
        let block = header_block(message);
        let text = decode_header_bytes(block);
        Self {
            fields: unfold_headers(&text),
        }
    }

    /// Number of header fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no header field was found.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl HeaderLookup for HeaderMap {
    fn header(&self, name: &str) -> &str {
        self.fields
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .unwrap_or("")
    }
}

/// Slice off the header block: up to (not including) the first blank line.
fn header_block(message: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < message.len() {
        let end = message[start..]
            .iter()
            .position(|&b| b == b'\n')
            .map(|p| start + p + 1)
            .unwrap_or(message.len());
        let line = &message[start..end];
        if line == b"\n" || line == b"\r\n" {
            return &message[..start];
        }
        start = end;
    }
    message
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
pub fn decode_header_bytes(bytes: &[u8]) -> String {
    // Strip BOM if present
    let bytes = if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &bytes[3..]
    } else {
        bytes
    };

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            // Field names never contain spaces.
            if name.is_empty() || name.contains(' ') {
                continue;
            }
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfold_headers() {
        let text = "Subject: A long\n  subject line\nFrom: a@b.c\n";
        let h = unfold_headers(text);
        assert_eq!(h.len(), 2);
        assert_eq!(h[0], ("subject".into(), "A long subject line".into()));
        assert_eq!(h[1], ("from".into(), "a@b.c".into()));
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let map = HeaderMap::parse(b"Message-ID: <1@x>\nSUBJECT: Hi\n\nbody\n");
        assert_eq!(map.header("message-id"), "<1@x>");
        assert_eq!(map.header("Subject"), "Hi");
        assert_eq!(map.header("MESSAGE-id"), "<1@x>");
    }

    #[test]
    fn test_missing_header_is_empty() {
        let map = HeaderMap::parse(b"Subject: Hi\n\n");
        assert_eq!(map.header("from"), "");
    }

    #[test]
    fn test_body_is_not_parsed_as_headers() {
        let map = HeaderMap::parse(b"Subject: Hi\r\n\r\nFrom: not-a-header\r\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.header("from"), "");
    }

    #[test]
    fn test_decode_latin1_fallback() {
        let bytes = b"Subject: caf\xe9\n";
        assert_eq!(decode_header_bytes(bytes), "Subject: café\n");
    }

    #[test]
    fn test_first_value_wins() {
        let map = HeaderMap::parse(b"Received: one\nReceived: two\n\n");
        assert_eq!(map.header("received"), "one");
    }
}
