//! Message fingerprints: comparison keys under selectable strictness.
//!
//! | Policy          | Key                                                   |
//! |-----------------|-------------------------------------------------------|
//! | `simple`        | normalized `message-id|subject|from`                  |
//! | `header-body`   | simple key, `|`, normalized first N body characters   |
//! | `hashed-header` | MD5 hex of the simple key                             |
//! | `strict`        | MD5 hex of the raw message with CRLF folded to LF     |
//!
//! `strict` is the default and the only policy that never merges two
//! byte-wise different messages.

use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

use crate::model::message::{HeaderLookup, MboxMessage};
use crate::normalize::normalize;
use crate::parser::mime;

/// Default number of body characters used by the header+body policy.
pub const DEFAULT_BODY_CHARS: usize = 80;

/// A derived comparison key for one message.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Produces a comparison key from a message. Infallible by contract.
pub trait Fingerprinter {
    fn fingerprint(&self, message: &MboxMessage) -> Fingerprint;
}

/// Header-only key: `message-id|subject|from`, normalized.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplePolicy;

impl Fingerprinter for SimplePolicy {
    fn fingerprint(&self, message: &MboxMessage) -> Fingerprint {
        Fingerprint(header_key(message))
    }
}

/// Header key plus a normalized prefix of the plain-text body.
#[derive(Debug, Clone, Copy)]
pub struct HeaderBodyPolicy {
    pub body_chars: usize,
}

impl Default for HeaderBodyPolicy {
    fn default() -> Self {
        Self {
            body_chars: DEFAULT_BODY_CHARS,
        }
    }
}

impl Fingerprinter for HeaderBodyPolicy {
    fn fingerprint(&self, message: &MboxMessage) -> Fingerprint {
        let body = mime::first_plain_text(&message.content);
        if body.is_degraded() {
            tracing::trace!(
                offset = message.offset,
                "No plain-text body, fingerprinting headers only"
            );
        }
        let prefix: String = body.as_str().chars().take(self.body_chars).collect();
        Fingerprint(format!("{}|{}", header_key(message), normalize(&prefix)))
    }
}

/// MD5 of the header key.
#[derive(Debug, Clone, Copy, Default)]
pub struct HashedHeaderPolicy;

impl Fingerprinter for HashedHeaderPolicy {
    fn fingerprint(&self, message: &MboxMessage) -> Fingerprint {
        Fingerprint(md5_hex(header_key(message).as_bytes()))
    }
}

/// MD5 of the full raw message with CRLF line endings folded to LF.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrictPolicy;

impl Fingerprinter for StrictPolicy {
    fn fingerprint(&self, message: &MboxMessage) -> Fingerprint {
        let mut hasher = Md5::new();
        let content = &message.content;
        let mut start = 0;
        // Feed the digest segment by segment, dropping the CR of each CRLF.
        for (i, pair) in content.windows(2).enumerate() {
            if pair == b"\r\n" {
                hasher.update(&content[start..i]);
                start = i + 1;
            }
        }
        hasher.update(&content[start..]);
        Fingerprint(format!("{:x}", hasher.finalize()))
    }
}

/// Selectable policy, as named in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum FingerprintPolicy {
    Simple,
    HeaderBody,
    HashedHeader,
    #[default]
    Strict,
}

impl FingerprintPolicy {
    /// Build the fingerprinter for this policy.
    pub fn fingerprinter(self, body_chars: usize) -> Box<dyn Fingerprinter> {
        match self {
            FingerprintPolicy::Simple => Box::new(SimplePolicy),
            FingerprintPolicy::HeaderBody => Box::new(HeaderBodyPolicy { body_chars }),
            FingerprintPolicy::HashedHeader => Box::new(HashedHeaderPolicy),
            FingerprintPolicy::Strict => Box::new(StrictPolicy),
        }
    }
}

impl fmt::Display for FingerprintPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FingerprintPolicy::Simple => "simple",
            FingerprintPolicy::HeaderBody => "header-body",
            FingerprintPolicy::HashedHeader => "hashed-header",
            FingerprintPolicy::Strict => "strict",
        };
        f.write_str(name)
    }
}

fn header_key(message: &impl HeaderLookup) -> String {
    normalize(&format!(
        "{}|{}|{}",
        message.header("message-id"),
        message.header("subject"),
        message.header("from")
    ))
}

fn md5_hex(bytes: &[u8]) -> String {
    format!("{:x}", Md5::digest(bytes))
}
