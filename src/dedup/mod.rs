//! Duplicate removal: single-mailbox processing and batch orchestration.
//!
//! Everything here runs synchronously on the caller's thread, one MBOX at a
//! time. Each file is loaded, fingerprinted, filtered, and (only when
//! something was dropped) rewritten before the next file is opened.

pub mod batch;
pub mod processor;

pub use batch::{BatchRunner, NoProgress, ProgressSink};
pub use processor::{retain_first, Deduplicator};

use crate::config::Config;
use crate::fingerprint::{FingerprintPolicy, DEFAULT_BODY_CHARS};
use crate::scanner::MboxScanner;

/// Settings shared by the scanner, the processor and the batch runner.
///
/// Built once by the caller and passed in explicitly; nothing in the
/// library reads configuration on its own.
#[derive(Debug, Clone)]
pub struct DedupContext {
    pub policy: FingerprintPolicy,
    /// Body prefix length for [`FingerprintPolicy::HeaderBody`].
    pub body_chars: usize,
    pub exclude_trash: bool,
    /// Record failing mailboxes and go on, instead of stopping the batch.
    pub continue_on_error: bool,
}

impl Default for DedupContext {
    fn default() -> Self {
        Self {
            policy: FingerprintPolicy::Strict,
            body_chars: DEFAULT_BODY_CHARS,
            exclude_trash: true,
            continue_on_error: false,
        }
    }
}

impl DedupContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            policy: config.dedup.policy,
            body_chars: config.dedup.body_chars,
            exclude_trash: config.scan.exclude_trash,
            continue_on_error: config.dedup.continue_on_error,
        }
    }

    /// Scanner configured for this run.
    pub fn scanner(&self) -> MboxScanner {
        MboxScanner::new(self.exclude_trash)
    }
}
