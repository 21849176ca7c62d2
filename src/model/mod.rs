//! Core data model types: extracted messages, attachments, and recipients.

pub mod address;
pub mod attachment;
pub mod message;
