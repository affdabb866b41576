//! Sequence container parsing.
//!
//! A sequence is an IFF `FORM` of type `AVFS` holding an `AVTL` chunk
//! (function table followed by instruction records, little-endian words) and
//! an optional `TEXT` string table.

pub mod iff;
mod program;
mod text;

pub use program::{Instruction, Program, Records, MAX_FUNCTIONS, RECORD_HEADER};
pub use text::TextTable;
