//! mockexam-core: Question evaluation, attempt aggregation, and question banks.
//!
//! This crate defines the data model and the pure scoring rules that the
//! rest of mockexam builds on, plus the bank parser, report persistence, and
//! configuration loading around them.

pub mod aggregate;
pub mod config;
pub mod engine;
pub mod error;
pub mod evaluate;
pub mod legacy;
pub mod model;
pub mod parser;
pub mod report;
