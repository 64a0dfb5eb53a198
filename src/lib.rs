//! `mboxdedup`: remove duplicate messages from MBOX mail folders.
//!
//! This crate provides the core library: MBOX discovery, message
//! fingerprinting, first-occurrence-wins duplicate removal, and atomic
//! rewriting of mailbox files, plus the backup and mail-client checks a
//! front end runs beforehand.

pub mod backup;
pub mod config;
pub mod dedup;
pub mod error;
pub mod fingerprint;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod process_check;
pub mod scanner;
pub mod store;
