//! Runs the deduplicator over every discovered mailbox.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::dedup::processor::Deduplicator;
use crate::dedup::DedupContext;
use crate::error::Result;
use crate::model::report::{BatchReport, FailedMbox};
use crate::store::writer::{AtomicMboxWriter, MailboxWriter};

/// Receives progress between mailboxes.
///
/// `report` gets a percentage in `0..=100` that never decreases.
/// `is_cancelled` is polled before each mailbox; returning `true` stops the
/// batch with the work done so far left on disk.
pub trait ProgressSink {
    fn report(&mut self, percent: u8);

    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Sink that ignores progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _percent: u8) {}
}

/// Sequential batch over a list of MBOX paths.
pub struct BatchRunner<W: MailboxWriter = AtomicMboxWriter> {
    dedup: Deduplicator<W>,
    continue_on_error: bool,
    start_percent: u8,
}

impl BatchRunner<AtomicMboxWriter> {
    pub fn new(ctx: &DedupContext) -> Self {
        Self::with_deduplicator(ctx, Deduplicator::new(ctx))
    }
}

impl<W: MailboxWriter> BatchRunner<W> {
    pub fn with_deduplicator(ctx: &DedupContext, dedup: Deduplicator<W>) -> Self {
        Self {
            dedup,
            continue_on_error: ctx.continue_on_error,
            start_percent: 0,
        }
    }

    /// Progress already consumed by earlier steps (e.g. the backup).
    /// The batch spreads the remainder evenly over the mailboxes.
    pub fn starting_at(mut self, percent: u8) -> Self {
        self.start_percent = percent.min(100);
        self
    }

    /// Deduplicate every path, in the given order.
    ///
    /// Every mailbox advances progress by the same share of what remains,
    /// regardless of file size. A failing mailbox stops the batch and its
    /// error is returned, unless `continue_on_error` is set, in which case it
    /// is recorded in [`BatchReport::failed`].
    pub fn process_all(
        &self,
        paths: &[PathBuf],
        sink: &mut dyn ProgressSink,
    ) -> Result<BatchReport> {
        let mut batch = BatchReport::default();
        if paths.is_empty() {
            info!("No mailboxes to process");
            return Ok(batch);
        }

        let step = (100 - self.start_percent as usize) / paths.len();
        let mut percent = self.start_percent as usize;

        for path in paths {
            if sink.is_cancelled() {
                let done = batch.reports.len() + batch.failed.len();
                warn!(remaining = paths.len() - done, "Batch cancelled");
                batch.cancelled = true;
                break;
            }

            match self.dedup.process_one(path) {
                Ok(report) => {
                    batch.total_deleted += report.deleted;
                    batch.reports.push(report);
                }
                Err(e) if self.continue_on_error => {
                    warn!(path = %path.display(), error = %e, "Failed to process mailbox");
                    batch.failed.push(FailedMbox {
                        path: path.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }

            percent += step;
            sink.report(percent.min(100) as u8);
        }

        info!(
            total_deleted = batch.total_deleted,
            mailboxes = batch.reports.len(),
            failed = batch.failed.len(),
            "Total duplicate messages deleted across all mailboxes: {}",
            batch.total_deleted
        );
        Ok(batch)
    }
}
