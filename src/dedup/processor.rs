//! Deduplication of a single MBOX file.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use crate::dedup::DedupContext;
use crate::error::Result;
use crate::fingerprint::Fingerprinter;
use crate::model::message::MboxMessage;
use crate::model::report::MboxReport;
use crate::store::reader::MboxStore;
use crate::store::writer::{AtomicMboxWriter, MailboxWriter};

/// Removes later duplicates from one mailbox at a time.
pub struct Deduplicator<W: MailboxWriter = AtomicMboxWriter> {
    fingerprinter: Box<dyn Fingerprinter>,
    writer: W,
}

impl Deduplicator<AtomicMboxWriter> {
    /// Processor that rewrites files with [`AtomicMboxWriter`].
    pub fn new(ctx: &DedupContext) -> Self {
        Self::with_writer(ctx, AtomicMboxWriter)
    }
}

impl<W: MailboxWriter> Deduplicator<W> {
    pub fn with_writer(ctx: &DedupContext, writer: W) -> Self {
        Self {
            fingerprinter: ctx.policy.fingerprinter(ctx.body_chars),
            writer,
        }
    }

    /// Deduplicate the MBOX at `path` in place.
    ///
    /// The first message with a given fingerprint is kept, later ones are
    /// dropped. The file is rewritten only when at least one message was
    /// dropped; otherwise it is left untouched and the report message is
    /// empty. Load and write failures are returned to the caller.
    pub fn process_one(&self, path: &Path) -> Result<MboxReport> {
        // The store owns its data and holds no file handle past this point.
        let store = MboxStore::load(path)?;
        let (retained, deleted) = retain_first(&store.messages, self.fingerprinter.as_ref());

        let mut report = MboxReport {
            path: path.to_path_buf(),
            messages_before: store.len(),
            deleted,
            message: String::new(),
        };

        if deleted == 0 {
            debug!(
                path = %path.display(),
                messages = store.len(),
                "No duplicates"
            );
            return Ok(report);
        }

        self.writer.write_all(path, &retained)?;

        report.message = format!(
            "Deleted {deleted} duplicate messages from mbox {}",
            path.display()
        );
        info!("{}", report.message);
        Ok(report)
    }
}

/// Keep the first message of every fingerprint, in original order.
///
/// Returns the retained messages and the number dropped.
pub fn retain_first<'a>(
    messages: &'a [MboxMessage],
    fingerprinter: &dyn Fingerprinter,
) -> (Vec<&'a MboxMessage>, usize) {
    let mut seen = HashSet::with_capacity(messages.len());
    let mut retained = Vec::with_capacity(messages.len());
    let mut deleted = 0;

    for message in messages {
        if seen.insert(fingerprinter.fingerprint(message)) {
            retained.push(message);
        } else {
            deleted += 1;
        }
    }

    (retained, deleted)
}
