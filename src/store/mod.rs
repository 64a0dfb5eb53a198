//! MBOX storage: whole-file loading and atomic rewriting.

pub mod reader;
pub mod writer;
