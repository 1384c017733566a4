//! File I/O for the emissions processing pipeline: inventory parsing,
//! speciation/temporal reference tables, and output writing.

pub mod parse;
pub mod read;
pub mod write;
