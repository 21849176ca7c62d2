//! `emlex`: extract attachments from many `.eml` files at once.
//!
//! This crate provides the core library: resolving input patterns,
//! extracting attachments and header metadata from each message, naming
//! destination folders, and writing everything under a run-scoped output
//! root with a bounded pool of workers.

pub mod batch;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod naming;
pub mod parser;
pub mod resolve;
