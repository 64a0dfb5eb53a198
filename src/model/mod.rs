//! Core data model types: loaded messages and processing reports.

pub mod message;
pub mod report;
