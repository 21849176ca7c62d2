//! Message parsing: the `.eml` extractor and raw header helpers.

pub mod eml;
pub mod header;
