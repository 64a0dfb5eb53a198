//! MIME body extraction for fingerprinting.

use mail_parser::{MessageParser, MimeHeaders, PartType};

/// Result of looking for a message's plain-text body.
///
/// Decoding problems are not errors here: the caller fingerprints with
/// whatever text is available, or with an empty body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyText {
    /// Decoded body text.
    Extracted(String),
    /// The message could not be parsed, or has no plain-text part.
    Degraded,
}

impl BodyText {
    /// The extracted text, or `""` when degraded.
    pub fn as_str(&self) -> &str {
        match self {
            BodyText::Extracted(text) => text,
            BodyText::Degraded => "",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, BodyText::Degraded)
    }
}

/// Extract the body text of a raw message (headers + body, no `From ` line).
///
/// - multipart: the first `text/plain` part in document order
/// - single part: the whole decoded payload, whatever its content type
pub fn first_plain_text(message: &[u8]) -> BodyText {
    let Some(parsed) = MessageParser::default().parse(message) else {
        return BodyText::Degraded;
    };

    let root = parsed.root_part();
    if !matches!(root.body, PartType::Multipart(_)) {
        return decode_part(root.contents());
    }

    parsed
        .parts
        .iter()
        .filter(|part| !matches!(part.body, PartType::Multipart(_)))
        .find(|part| is_text_plain(*part))
        .map(|part| decode_part(part.contents()))
        .unwrap_or(BodyText::Degraded)
}

/// Parts without a `Content-Type` header default to `text/plain`.
fn is_text_plain(part: &mail_parser::MessagePart<'_>) -> bool {
    match part.content_type() {
        Some(ct) => {
            ct.ctype().eq_ignore_ascii_case("text")
                && ct
                    .subtype()
                    .map(|s| s.eq_ignore_ascii_case("plain"))
                    .unwrap_or(false)
        }
        None => true,
    }
}

fn decode_part(bytes: &[u8]) -> BodyText {
    BodyText::Extracted(String::from_utf8_lossy(bytes).into_owned())
}
