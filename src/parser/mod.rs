//! Email parsing: MBOX splitting, header lookup, and MIME body extraction.

pub mod header;
pub mod mbox;
pub mod mime;
