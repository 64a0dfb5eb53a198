//! Loads an entire MBOX into memory.

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::model::message::MboxMessage;
use crate::parser::mbox::MboxParser;

/// All messages of one MBOX file, in file order.
///
/// The file handle is released as soon as loading finishes, so the same
/// path can be replaced afterwards.
#[derive(Debug, Clone)]
pub struct MboxStore {
    pub messages: Vec<MboxMessage>,
}

impl MboxStore {
    /// Read and split the whole file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let parser = MboxParser::new(path)?;

        let mut messages = Vec::new();
        let mut sequence: u64 = 0;
        parser.parse(&mut |offset, raw| {
            messages.push(MboxMessage::from_raw(raw, offset, sequence));
            sequence += 1;
            true
        })?;

        debug!(
            path = %path.display(),
            count = messages.len(),
            bytes = parser.file_size(),
            "Loaded MBOX into memory"
        );

        Ok(Self { messages })
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
